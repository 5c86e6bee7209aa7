use scraper::{Html, Node};

use super::{SheetParser, collapse_whitespace};
use crate::model::{AnswerOption, AnswerPair};

const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

impl SheetParser {
    /// Only consulted when the structured pass found nothing, so no pair is counted twice.
    pub(super) fn extract_text_fallback_pairs(&self, document: &Html) -> Vec<AnswerPair> {
        let text = visible_text(document);
        self.scan_answer_text(&text)
    }

    pub(super) fn scan_answer_text(&self, text: &str) -> Vec<AnswerPair> {
        self.fallback_answer
            .captures_iter(text)
            .filter_map(|captures| {
                let chosen = captures.get(1)?.as_str();
                let correct = captures.get(2)?.as_str();
                Some(AnswerPair {
                    chosen: AnswerOption::from_label(chosen),
                    correct_answer: AnswerOption::from_label(correct),
                })
            })
            .collect()
    }
}

fn visible_text(document: &Html) -> String {
    let mut fragments = Vec::<&str>::new();

    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|element| HIDDEN_ELEMENTS.contains(&element.name()))
                .unwrap_or(false)
        });
        if !hidden {
            fragments.push(text);
        }
    }

    collapse_whitespace(&fragments.join(" "))
}
