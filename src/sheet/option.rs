use std::fmt;

use crate::model::AnswerOption;

impl AnswerOption {
    /// Maps a 1-based option index to its letter. Anything outside 1..=4 is `Unmarked`.
    pub fn from_index(index: Option<u32>) -> Self {
        match index {
            Some(1) => AnswerOption::A,
            Some(2) => AnswerOption::B,
            Some(3) => AnswerOption::C,
            Some(4) => AnswerOption::D,
            _ => AnswerOption::Unmarked,
        }
    }

    /// Reads the leading digits of `text` (e.g. `"2"` or `"3. Delhi"`) as an option index.
    pub fn from_index_text(text: &str) -> Self {
        Self::from_index(leading_number(text))
    }

    /// Parses a rendered answer such as `"b"`, `" C "`, `"--"` or `"Not Attempted"`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "A" => AnswerOption::A,
            "B" => AnswerOption::B,
            "C" => AnswerOption::C,
            "D" => AnswerOption::D,
            _ => AnswerOption::Unmarked,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnswerOption::A => "A",
            AnswerOption::B => "B",
            AnswerOption::C => "C",
            AnswerOption::D => "D",
            AnswerOption::Unmarked => "--",
        }
    }

    pub fn is_unmarked(self) -> bool {
        self == AnswerOption::Unmarked
    }
}

impl fmt::Display for AnswerOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn leading_number(text: &str) -> Option<u32> {
    let trimmed = text.trim_start();
    let digits_end = trimmed
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map(|(idx, _)| idx)
        .unwrap_or(trimmed.len());

    trimmed[..digits_end].parse::<u32>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_index_maps_one_through_four_to_letters() {
        assert_eq!(AnswerOption::from_index(Some(1)), AnswerOption::A);
        assert_eq!(AnswerOption::from_index(Some(2)), AnswerOption::B);
        assert_eq!(AnswerOption::from_index(Some(3)), AnswerOption::C);
        assert_eq!(AnswerOption::from_index(Some(4)), AnswerOption::D);
    }

    #[test]
    fn from_index_degrades_to_unmarked() {
        assert_eq!(AnswerOption::from_index(None), AnswerOption::Unmarked);
        assert_eq!(AnswerOption::from_index(Some(0)), AnswerOption::Unmarked);
        assert_eq!(AnswerOption::from_index(Some(5)), AnswerOption::Unmarked);
    }

    #[test]
    fn unmarked_is_stable_under_remapping() {
        let once = AnswerOption::from_index_text("--");
        let twice = AnswerOption::from_index_text(once.as_str());
        assert_eq!(once, AnswerOption::Unmarked);
        assert_eq!(twice, AnswerOption::Unmarked);
        assert_eq!(AnswerOption::from_label(once.as_str()), AnswerOption::Unmarked);
    }

    #[test]
    fn from_index_text_reads_leading_digits_only() {
        assert_eq!(AnswerOption::from_index_text(" 3. Delhi"), AnswerOption::C);
        assert_eq!(AnswerOption::from_index_text("4"), AnswerOption::D);
        assert_eq!(AnswerOption::from_index_text("12"), AnswerOption::Unmarked);
        assert_eq!(AnswerOption::from_index_text("B"), AnswerOption::Unmarked);
        assert_eq!(AnswerOption::from_index_text(""), AnswerOption::Unmarked);
    }

    #[test]
    fn from_label_normalizes_case_and_whitespace() {
        assert_eq!(AnswerOption::from_label(" b "), AnswerOption::B);
        assert_eq!(AnswerOption::from_label("Not Attempted"), AnswerOption::Unmarked);
        assert_eq!(AnswerOption::from_label(""), AnswerOption::Unmarked);
    }

    #[test]
    fn display_renders_sentinel_as_double_dash() {
        assert_eq!(AnswerOption::Unmarked.to_string(), "--");
        assert_eq!(AnswerOption::A.to_string(), "A");
    }
}
