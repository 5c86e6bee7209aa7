use serde::{Deserialize, Serialize};

pub const IMPLICIT_SECTION_NAME: &str = "Overall";

/// One of the four printed options, or `Unmarked` when nothing was chosen or detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnswerOption {
    A,
    B,
    C,
    D,
    #[serde(rename = "--")]
    Unmarked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerPair {
    pub chosen: AnswerOption,
    pub correct_answer: AnswerOption,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub name: String,
    pub pairs: Vec<AnswerPair>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pairs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionPass {
    #[default]
    None,
    Structured,
    TextFallback,
}

impl ExtractionPass {
    pub fn as_str(self) -> &'static str {
        match self {
            ExtractionPass::None => "none",
            ExtractionPass::Structured => "structured",
            ExtractionPass::TextFallback => "text_fallback",
        }
    }
}

/// Sections in document order. When the sheet carries no section headers every pair
/// lands in `implicit`, which is never listed among `sections`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseResult {
    pub sections: Vec<Section>,
    pub implicit: Option<Section>,
    pub extraction: ExtractionPass,
}

impl ParseResult {
    pub fn pairs(&self) -> Vec<AnswerPair> {
        self.sections
            .iter()
            .chain(self.implicit.iter())
            .flat_map(|section| section.pairs.iter().copied())
            .collect()
    }

    pub fn pair_count(&self) -> usize {
        self.sections
            .iter()
            .chain(self.implicit.iter())
            .map(|section| section.pairs.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pair_count() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkingScheme {
    pub marks_per_correct: f64,
    pub negative_per_wrong: f64,
}

impl Default for MarkingScheme {
    fn default() -> Self {
        Self {
            marks_per_correct: 1.0,
            negative_per_wrong: 0.25,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSummary {
    pub correct: u32,
    pub wrong: u32,
    pub unattempted: u32,
    pub total_questions: u32,
    pub marks_per_correct: f64,
    pub negative_per_wrong: f64,
    pub total_marks: f64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionScore {
    pub name: String,
    #[serde(flatten)]
    pub summary: ScoreSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreReport {
    pub sections: Vec<SectionScore>,
    pub total: SectionScore,
    pub pairs: Vec<AnswerPair>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankEstimate {
    pub percentile: Option<f64>,
    pub estimated_rank: Option<u64>,
    pub sample_size: u64,
    pub total_candidates: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalScoreRecord {
    pub exam: String,
    pub document_sha256: String,
    pub total_marks: f64,
    pub correct: u32,
    pub wrong: u32,
    pub unattempted: u32,
    pub total_questions: u32,
    pub marks_per_correct: f64,
    pub negative_per_wrong: f64,
    pub recorded_at: String,
}

impl HistoricalScoreRecord {
    pub fn from_summary(
        exam: &str,
        document_sha256: &str,
        summary: &ScoreSummary,
        recorded_at: String,
    ) -> Self {
        Self {
            exam: exam.to_string(),
            document_sha256: document_sha256.to_string(),
            total_marks: summary.total_marks,
            correct: summary.correct,
            wrong: summary.wrong,
            unattempted: summary.unattempted,
            total_questions: summary.total_questions,
            marks_per_correct: summary.marks_per_correct,
            negative_per_wrong: summary.negative_per_wrong,
            recorded_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreRunOutput {
    pub exam: String,
    pub document_sha256: String,
    pub extraction: ExtractionPass,
    pub generated_at: String,
    #[serde(flatten)]
    pub report: ScoreReport,
    pub rank: RankEstimate,
    pub recorded: bool,
}
