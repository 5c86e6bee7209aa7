use anyhow::Result;
use tracing::warn;

use crate::model::{HistoricalScoreRecord, RankEstimate};
use crate::util::round2;

/// Read/append view over previously computed totals.
pub trait ScoreCorpus {
    fn count(&self) -> Result<u64>;

    fn count_less_than(&self, total_marks: f64) -> Result<u64>;

    fn append(&mut self, record: &HistoricalScoreRecord) -> Result<()>;

    /// Total already stored for `document_sha256`, if that sheet was recorded before.
    fn recorded_total(&self, document_sha256: &str) -> Result<Option<f64>>;

    /// Both counts used by one estimate, leaving out the earlier record of
    /// `exclude_document` so a resubmitted sheet is not ranked against itself.
    /// Stores that can read them atomically should.
    fn snapshot(&self, total_marks: f64, exclude_document: Option<&str>) -> Result<(u64, u64)> {
        let mut count = self.count()?;
        let mut less = self.count_less_than(total_marks)?;

        let previous = match exclude_document {
            Some(document) => self.recorded_total(document)?,
            None => None,
        };
        if let Some(previous) = previous {
            count = count.saturating_sub(1);
            if previous < total_marks {
                less = less.saturating_sub(1);
            }
        }

        Ok((count, less))
    }
}

impl RankEstimate {
    pub fn unranked(total_candidates: u64) -> Self {
        Self {
            percentile: None,
            estimated_rank: None,
            sample_size: 0,
            total_candidates,
        }
    }
}

/// Percentile of `new_total` within the corpus, scaled to a pool of `total_candidates`.
///
/// An empty or unreadable corpus gives no percentile and no rank. When `document_sha256`
/// names a sheet already in the corpus, its earlier record is not part of the sample.
pub fn estimate_rank<C>(
    new_total: f64,
    document_sha256: Option<&str>,
    corpus: &C,
    total_candidates: u64,
) -> RankEstimate
where
    C: ScoreCorpus + ?Sized,
{
    let unranked = RankEstimate::unranked(total_candidates);

    let (sample_size, less_count) = match corpus.snapshot(new_total, document_sha256) {
        Ok(counts) => counts,
        Err(err) => {
            warn!(error = %err, "score corpus unavailable, skipping rank estimate");
            return unranked;
        }
    };

    if sample_size == 0 {
        return unranked;
    }

    let less_count = less_count.min(sample_size);
    let percentile = round2(less_count as f64 / sample_size as f64 * 100.0);
    let above_share = 1.0 - percentile / 100.0;
    let scaled_rank = (above_share * total_candidates as f64 + 0.5).floor().max(0.0) as u64;

    RankEstimate {
        percentile: Some(percentile),
        estimated_rank: Some(scaled_rank.max(1)),
        sample_size,
        total_candidates,
    }
}

#[cfg(test)]
mod tests {
    use anyhow::bail;

    use super::*;

    #[derive(Default)]
    struct MemoryCorpus {
        records: Vec<(String, f64)>,
    }

    impl ScoreCorpus for MemoryCorpus {
        fn count(&self) -> Result<u64> {
            Ok(self.records.len() as u64)
        }

        fn count_less_than(&self, total_marks: f64) -> Result<u64> {
            Ok(self
                .records
                .iter()
                .filter(|(_, value)| *value < total_marks)
                .count() as u64)
        }

        fn append(&mut self, record: &HistoricalScoreRecord) -> Result<()> {
            self.records
                .retain(|(document, _)| *document != record.document_sha256);
            self.records
                .push((record.document_sha256.clone(), record.total_marks));
            Ok(())
        }

        fn recorded_total(&self, document_sha256: &str) -> Result<Option<f64>> {
            Ok(self
                .records
                .iter()
                .find(|(document, _)| document == document_sha256)
                .map(|(_, total)| *total))
        }
    }

    struct BrokenCorpus;

    impl ScoreCorpus for BrokenCorpus {
        fn count(&self) -> Result<u64> {
            bail!("database is locked")
        }

        fn count_less_than(&self, _total_marks: f64) -> Result<u64> {
            bail!("database is locked")
        }

        fn append(&mut self, _record: &HistoricalScoreRecord) -> Result<()> {
            bail!("database is locked")
        }

        fn recorded_total(&self, _document_sha256: &str) -> Result<Option<f64>> {
            bail!("database is locked")
        }
    }

    fn corpus(totals: &[f64]) -> MemoryCorpus {
        MemoryCorpus {
            records: totals
                .iter()
                .enumerate()
                .map(|(index, total)| (format!("earlier-{index}"), *total))
                .collect(),
        }
    }

    fn record(document_sha256: &str, total_marks: f64) -> HistoricalScoreRecord {
        HistoricalScoreRecord {
            exam: "default".to_string(),
            document_sha256: document_sha256.to_string(),
            total_marks,
            correct: 0,
            wrong: 0,
            unattempted: 0,
            total_questions: 0,
            marks_per_correct: 1.0,
            negative_per_wrong: 0.25,
            recorded_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn empty_corpus_has_no_percentile_or_rank() {
        let estimate = estimate_rank(42.0, None, &MemoryCorpus::default(), 1000);
        assert_eq!(estimate.percentile, None);
        assert_eq!(estimate.estimated_rank, None);
        assert_eq!(estimate.sample_size, 0);
        assert_eq!(estimate.total_candidates, 1000);
    }

    #[test]
    fn middle_of_sample_ranks_halfway() {
        let estimate = estimate_rank(10.0, None, &corpus(&[5.0, 8.0, 12.0, 15.0]), 1000);
        assert_eq!(estimate.sample_size, 4);
        assert_eq!(estimate.percentile, Some(50.0));
        assert_eq!(estimate.estimated_rank, Some(500));
    }

    #[test]
    fn equal_totals_are_not_counted_below() {
        let estimate = estimate_rank(8.0, None, &corpus(&[8.0, 8.0, 3.0]), 300);
        assert_eq!(estimate.percentile, Some(33.33));
        assert_eq!(estimate.estimated_rank, Some(200));
    }

    #[test]
    fn top_score_is_clamped_to_rank_one() {
        let estimate = estimate_rank(99.0, None, &corpus(&[1.0, 2.0, 3.0]), 50_000);
        assert_eq!(estimate.percentile, Some(100.0));
        assert_eq!(estimate.estimated_rank, Some(1));
    }

    #[test]
    fn lowest_score_ranks_last() {
        let estimate = estimate_rank(0.0, None, &corpus(&[1.0, 2.0]), 800);
        assert_eq!(estimate.percentile, Some(0.0));
        assert_eq!(estimate.estimated_rank, Some(800));
    }

    #[test]
    fn unreadable_corpus_degrades_to_unranked() {
        let estimate = estimate_rank(10.0, None, &BrokenCorpus, 1000);
        assert_eq!(estimate.sample_size, 0);
        assert_eq!(estimate.percentile, None);
        assert_eq!(estimate.estimated_rank, None);
    }

    #[test]
    fn estimate_reads_corpus_as_of_call_time() {
        let mut memory = corpus(&[5.0, 15.0]);
        let before = estimate_rank(10.0, None, &memory, 100);

        memory.append(&record("newcomer", 10.0)).expect("append");
        let after = estimate_rank(10.0, None, &memory, 100);

        assert_eq!(before.sample_size, 2);
        assert_eq!(before.percentile, Some(50.0));
        assert_eq!(after.sample_size, 3);
        assert_eq!(after.percentile, Some(33.33));
    }

    #[test]
    fn resubmitted_sheet_is_not_ranked_against_itself() {
        let mut memory = corpus(&[5.0, 15.0]);
        let first = estimate_rank(10.0, Some("sheet"), &memory, 1000);
        memory.append(&record("sheet", 10.0)).expect("append");

        let second = estimate_rank(10.0, Some("sheet"), &memory, 1000);

        assert_eq!(second.sample_size, first.sample_size);
        assert_eq!(second.percentile, Some(50.0));
        assert_eq!(second.estimated_rank, first.estimated_rank);
    }

    #[test]
    fn excluded_sheet_with_lower_old_total_leaves_both_counts() {
        let mut memory = corpus(&[5.0, 15.0]);
        memory.append(&record("sheet", 3.0)).expect("append");

        let estimate = estimate_rank(10.0, Some("sheet"), &memory, 1000);

        assert_eq!(estimate.sample_size, 2);
        assert_eq!(estimate.percentile, Some(50.0));
    }
}
