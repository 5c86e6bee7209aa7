use scraper::{ElementRef, Html};
use tracing::debug;

use super::{SheetParser, child_elements, normalized_text};
use crate::model::{AnswerOption, AnswerPair};

const MAX_ANSWER_ROW_SCAN: usize = 6;
const OPTION_ROW_COUNT: usize = 4;
const MAX_MENU_ANCESTOR_LEVELS: usize = 4;
const RIGHT_ANSWER_CLASS: &str = "rightans";
const CHOSEN_OPTION_LABEL: &str = "Chosen Option";
const ANSWER_MARKER: &str = "Ans";

impl SheetParser {
    pub(super) fn extract_structured_pairs(&self, document: &Html) -> Vec<AnswerPair> {
        let mut pairs = Vec::new();
        let mut skipped = 0usize;

        for cell in document.select(&self.cell) {
            if !self.is_question_cell(cell) {
                continue;
            }

            match self.extract_question(cell) {
                Some(pair) => pairs.push(pair),
                None => {
                    skipped += 1;
                    debug!(question = %normalized_text(cell), "skipped question block without a detectable answer");
                }
            }
        }

        if skipped > 0 {
            debug!(
                skipped,
                extracted = pairs.len(),
                "question blocks skipped"
            );
        }

        pairs
    }

    fn is_question_cell(&self, cell: ElementRef<'_>) -> bool {
        self.question_number.is_match(&normalized_text(cell))
    }

    fn extract_question(&self, question_cell: ElementRef<'_>) -> Option<AnswerPair> {
        let question_row = parent_element(question_cell).filter(|row| is_named(*row, "tr"))?;
        let answer_row = self.find_answer_row(question_row)?;
        let correct_answer = self.extract_correct_option(answer_row)?;

        let chosen = nearest_ancestor(question_row, "table")
            .and_then(|table| self.find_menu_table(table))
            .map(|menu| self.extract_chosen_option(menu))
            .unwrap_or(AnswerOption::Unmarked);

        Some(AnswerPair {
            chosen,
            correct_answer,
        })
    }

    /// The row labelled "Ans" follows the question row, possibly after a few rows of
    /// bold-styled question text.
    fn find_answer_row<'a>(&self, question_row: ElementRef<'a>) -> Option<ElementRef<'a>> {
        for row in following_rows(question_row).take(MAX_ANSWER_ROW_SCAN) {
            if row_cells(row).any(|cell| is_answer_marker(&normalized_text(cell))) {
                return Some(row);
            }

            if !row_cells(row).any(has_bold_class) {
                return None;
            }
        }

        None
    }

    fn extract_correct_option(&self, answer_row: ElementRef<'_>) -> Option<AnswerOption> {
        let option_rows = std::iter::once(answer_row)
            .chain(following_rows(answer_row))
            .take(OPTION_ROW_COUNT);

        for (position, row) in option_rows.enumerate() {
            let Some(option_cell) = row_cells(row).nth(1) else {
                continue;
            };
            if !self.is_right_answer_cell(option_cell) {
                continue;
            }

            let option = AnswerOption::from_index_text(&normalized_text(option_cell));
            if option.is_unmarked() {
                return Some(AnswerOption::from_index(Some(position as u32 + 1)));
            }
            return Some(option);
        }

        None
    }

    fn is_right_answer_cell(&self, cell: ElementRef<'_>) -> bool {
        let flagged_by_class = cell
            .value()
            .classes()
            .any(|class| class.eq_ignore_ascii_case(RIGHT_ANSWER_CLASS));
        if flagged_by_class {
            return true;
        }

        cell.select(&self.image).any(|image| {
            image
                .value()
                .attr("src")
                .map(|src| src.to_ascii_lowercase().contains("tick"))
                .unwrap_or(false)
        })
    }

    /// Looks through following siblings of the question table, then of its ancestors,
    /// for the status table. Stops as soon as the next question block is reached.
    fn find_menu_table<'a>(&self, question_table: ElementRef<'a>) -> Option<ElementRef<'a>> {
        let mut anchor = question_table;

        for _ in 0..MAX_MENU_ANCESTOR_LEVELS {
            for sibling in anchor.next_siblings().filter_map(ElementRef::wrap) {
                if self.menu_table.matches(&sibling) {
                    return Some(sibling);
                }
                if sibling.select(&self.cell).any(|cell| self.is_question_cell(cell)) {
                    return None;
                }
                if let Some(nested) = sibling.select(&self.menu_table).next() {
                    return Some(nested);
                }
            }

            anchor = parent_element(anchor)?;
        }

        None
    }

    fn extract_chosen_option(&self, menu_table: ElementRef<'_>) -> AnswerOption {
        let Some(last_row) = menu_table.select(&self.row).last() else {
            return AnswerOption::Unmarked;
        };

        let mut cells = row_cells(last_row);
        let is_chosen_row = cells
            .next()
            .map(|label| normalized_text(label).contains(CHOSEN_OPTION_LABEL))
            .unwrap_or(false);
        if !is_chosen_row {
            return AnswerOption::Unmarked;
        }

        cells
            .next()
            .map(|value| AnswerOption::from_index_text(&normalized_text(value)))
            .unwrap_or(AnswerOption::Unmarked)
    }
}

/// A cell starting with the word "Ans" (`Ans`, `Ans:`, `Ans.`, `Ans 1.`), but not `Answer`.
fn is_answer_marker(text: &str) -> bool {
    text.trim_start()
        .strip_prefix(ANSWER_MARKER)
        .is_some_and(|rest| !rest.starts_with(|ch: char| ch.is_alphanumeric() || ch == '_'))
}

fn has_bold_class(cell: ElementRef<'_>) -> bool {
    cell.value()
        .classes()
        .any(|class| class.eq_ignore_ascii_case("bold"))
}

fn is_named(element: ElementRef<'_>, name: &str) -> bool {
    element.value().name().eq_ignore_ascii_case(name)
}

fn parent_element(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.parent().and_then(ElementRef::wrap)
}

fn nearest_ancestor<'a>(element: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| is_named(*ancestor, name))
}

fn following_rows<'a>(row: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    row.next_siblings()
        .filter_map(ElementRef::wrap)
        .filter(|sibling| is_named(*sibling, "tr"))
}

fn row_cells<'a>(row: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    child_elements(row).filter(|cell| is_named(*cell, "td") || is_named(*cell, "th"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_marker_accepts_punctuated_labels() {
        for label in ["Ans", "Ans:", "Ans.", "Ans -", "Ans 1.", " Ans :"] {
            assert!(is_answer_marker(label), "{label:?}");
        }
    }

    #[test]
    fn answer_marker_rejects_longer_words() {
        for label in ["Answer", "Answered", "Ans2", "", "Chosen Option : Ans"] {
            assert!(!is_answer_marker(label), "{label:?}");
        }
    }
}
