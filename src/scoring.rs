use crate::model::{
    AnswerPair, IMPLICIT_SECTION_NAME, MarkingScheme, ParseResult, ScoreReport, ScoreSummary,
    SectionScore,
};
use crate::util::round2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Wrong,
    Unattempted,
}

pub fn classify(pair: &AnswerPair) -> Outcome {
    if pair.chosen.is_unmarked() {
        Outcome::Unattempted
    } else if pair.chosen == pair.correct_answer {
        Outcome::Correct
    } else {
        Outcome::Wrong
    }
}

pub fn compute_score(pairs: &[AnswerPair], scheme: &MarkingScheme) -> ScoreSummary {
    let mut correct = 0u32;
    let mut wrong = 0u32;
    let mut unattempted = 0u32;

    for pair in pairs {
        match classify(pair) {
            Outcome::Correct => correct += 1,
            Outcome::Wrong => wrong += 1,
            Outcome::Unattempted => unattempted += 1,
        }
    }

    let counted = correct + wrong + unattempted;
    let total_questions = if counted == 0 {
        pairs.len() as u32
    } else {
        counted
    };

    let total_marks = round2(
        f64::from(correct) * scheme.marks_per_correct
            - f64::from(wrong) * scheme.negative_per_wrong,
    );
    let accuracy = if total_questions == 0 {
        0.0
    } else {
        round2(f64::from(correct) / f64::from((correct + wrong).max(1)) * 100.0)
    };

    ScoreSummary {
        correct,
        wrong,
        unattempted,
        total_questions,
        marks_per_correct: scheme.marks_per_correct,
        negative_per_wrong: scheme.negative_per_wrong,
        total_marks,
        accuracy,
    }
}

/// Scores each listed section, then rescores the flattened pair list for the total.
/// The total never sums section totals, so it stays exact however pairs were split.
pub fn compute_section_scores(result: &ParseResult, scheme: &MarkingScheme) -> ScoreReport {
    let sections = result
        .sections
        .iter()
        .map(|section| SectionScore {
            name: section.name.clone(),
            summary: compute_score(&section.pairs, scheme),
        })
        .collect();

    let pairs = result.pairs();
    let total = SectionScore {
        name: IMPLICIT_SECTION_NAME.to_string(),
        summary: compute_score(&pairs, scheme),
    };

    ScoreReport {
        sections,
        total,
        pairs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerOption, Section};

    fn pair(chosen: AnswerOption, correct_answer: AnswerOption) -> AnswerPair {
        AnswerPair {
            chosen,
            correct_answer,
        }
    }

    #[test]
    fn empty_pairs_score_zero() {
        let summary = compute_score(&[], &MarkingScheme::default());
        assert_eq!(summary.correct, 0);
        assert_eq!(summary.wrong, 0);
        assert_eq!(summary.unattempted, 0);
        assert_eq!(summary.total_questions, 0);
        assert_eq!(summary.total_marks, 0.0);
        assert_eq!(summary.accuracy, 0.0);
    }

    #[test]
    fn default_marking_scores_one_of_each_outcome() {
        let pairs = [
            pair(AnswerOption::A, AnswerOption::A),
            pair(AnswerOption::B, AnswerOption::A),
            pair(AnswerOption::Unmarked, AnswerOption::A),
        ];

        let summary = compute_score(&pairs, &MarkingScheme::default());

        assert_eq!(summary.correct, 1);
        assert_eq!(summary.wrong, 1);
        assert_eq!(summary.unattempted, 1);
        assert_eq!(summary.total_questions, 3);
        assert_eq!(summary.total_marks, 0.75);
        assert_eq!(summary.accuracy, 50.0);
        assert_eq!(summary.marks_per_correct, 1.0);
        assert_eq!(summary.negative_per_wrong, 0.25);
    }

    #[test]
    fn custom_scheme_can_go_negative() {
        let scheme = MarkingScheme {
            marks_per_correct: 2.0,
            negative_per_wrong: 0.5,
        };
        let pairs = [
            pair(AnswerOption::C, AnswerOption::D),
            pair(AnswerOption::C, AnswerOption::D),
            pair(AnswerOption::C, AnswerOption::D),
            pair(AnswerOption::D, AnswerOption::D),
            pair(AnswerOption::D, AnswerOption::C),
            pair(AnswerOption::D, AnswerOption::A),
            pair(AnswerOption::D, AnswerOption::B),
            pair(AnswerOption::A, AnswerOption::B),
        ];

        let summary = compute_score(&pairs, &scheme);
        assert_eq!(summary.correct, 1);
        assert_eq!(summary.wrong, 7);
        assert_eq!(summary.total_marks, -1.5);
        assert_eq!(summary.accuracy, 12.5);
    }

    #[test]
    fn accuracy_rounds_to_two_places() {
        let pairs = [
            pair(AnswerOption::A, AnswerOption::A),
            pair(AnswerOption::B, AnswerOption::A),
            pair(AnswerOption::C, AnswerOption::A),
        ];

        let summary = compute_score(&pairs, &MarkingScheme::default());
        assert_eq!(summary.accuracy, 33.33);
        assert_eq!(summary.total_marks, 0.5);
    }

    #[test]
    fn all_unattempted_has_zero_accuracy() {
        let pairs = [
            pair(AnswerOption::Unmarked, AnswerOption::A),
            pair(AnswerOption::Unmarked, AnswerOption::B),
        ];

        let summary = compute_score(&pairs, &MarkingScheme::default());
        assert_eq!(summary.unattempted, 2);
        assert_eq!(summary.total_questions, 2);
        assert_eq!(summary.accuracy, 0.0);
        assert_eq!(summary.total_marks, 0.0);
    }

    #[test]
    fn every_pair_lands_in_exactly_one_outcome() {
        let options = [
            AnswerOption::A,
            AnswerOption::B,
            AnswerOption::C,
            AnswerOption::D,
            AnswerOption::Unmarked,
        ];
        let pairs = options
            .iter()
            .flat_map(|chosen| options.iter().map(move |correct| pair(*chosen, *correct)))
            .collect::<Vec<AnswerPair>>();

        let summary = compute_score(&pairs, &MarkingScheme::default());
        assert_eq!(
            summary.correct + summary.wrong + summary.unattempted,
            summary.total_questions
        );
        assert_eq!(summary.total_questions as usize, pairs.len());
        assert_eq!(summary.unattempted, 5);
        assert_eq!(summary.correct, 4);
        assert_eq!(summary.wrong, 16);
    }

    #[test]
    fn section_scores_conserve_question_count_and_rescore_total() {
        let result = ParseResult {
            sections: vec![
                Section {
                    name: "Reasoning".to_string(),
                    pairs: vec![
                        pair(AnswerOption::A, AnswerOption::A),
                        pair(AnswerOption::B, AnswerOption::C),
                    ],
                },
                Section {
                    name: "Awareness".to_string(),
                    pairs: vec![
                        pair(AnswerOption::D, AnswerOption::D),
                        pair(AnswerOption::Unmarked, AnswerOption::C),
                        pair(AnswerOption::A, AnswerOption::B),
                    ],
                },
            ],
            ..ParseResult::default()
        };

        let report = compute_section_scores(&result, &MarkingScheme::default());

        assert_eq!(report.sections.len(), 2);
        let section_questions = report
            .sections
            .iter()
            .map(|section| section.summary.total_questions)
            .sum::<u32>();
        assert_eq!(section_questions, report.total.summary.total_questions);
        assert_eq!(report.total.name, IMPLICIT_SECTION_NAME);
        assert_eq!(report.total.summary.correct, 2);
        assert_eq!(report.total.summary.wrong, 2);
        assert_eq!(report.total.summary.total_marks, 1.5);
        assert_eq!(report.pairs.len(), 5);
    }

    #[test]
    fn implicit_section_feeds_total_but_is_not_listed() {
        let result = ParseResult {
            implicit: Some(Section {
                name: IMPLICIT_SECTION_NAME.to_string(),
                pairs: vec![pair(AnswerOption::B, AnswerOption::B)],
            }),
            ..ParseResult::default()
        };

        let report = compute_section_scores(&result, &MarkingScheme::default());
        assert!(report.sections.is_empty());
        assert_eq!(report.total.summary.correct, 1);
        assert_eq!(report.total.summary.total_marks, 1.0);
    }
}
