use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::cli::ScoreArgs;
use crate::config::{resolve_db_path, resolve_marking_scheme, validate_total_candidates};
use crate::model::{
    ExtractionPass, HistoricalScoreRecord, MarkingScheme, RankEstimate, ScoreReport,
    ScoreRunOutput, SectionScore,
};
use crate::rank::{ScoreCorpus, estimate_rank};
use crate::scoring::compute_section_scores;
use crate::sheet::SheetParser;
use crate::store::SqliteScoreStore;
use crate::util::{now_utc_string, read_input_text, sha256_text, write_json_pretty};

pub fn run(args: ScoreArgs) -> Result<()> {
    let scheme = resolve_marking_scheme(
        args.marks_per_correct,
        args.negative_per_wrong,
        args.scheme_path.as_deref(),
    )?;
    let total_candidates = validate_total_candidates(args.total_candidates)?;

    let html = read_input_text(&args.input)?;
    let document_sha256 = sha256_text(&html);
    let source = args.input.display().to_string();

    info!(
        input = %source,
        exam = %args.exam,
        bytes = html.len(),
        "scoring response sheet"
    );

    let parser = SheetParser::new()?;
    let sheet = score_sheet(&parser, &html, &source, &scheme)?;

    let db_path = resolve_db_path(&args.cache_root, args.db_path.as_deref());
    let mut store = open_store(&db_path, &args.exam);
    let corpus = store
        .as_mut()
        .map(|store| store as &mut dyn ScoreCorpus);
    let (rank, recorded) = rank_and_record(
        corpus,
        &args.exam,
        &document_sha256,
        &sheet.report.total,
        total_candidates,
        !args.no_record,
    );

    let output = ScoreRunOutput {
        exam: args.exam.clone(),
        document_sha256,
        extraction: sheet.extraction,
        generated_at: now_utc_string(),
        report: sheet.report,
        rank,
        recorded,
    };

    if let Some(report_path) = &args.report_path {
        write_json_pretty(report_path, &output)?;
        info!(path = %report_path.display(), "wrote score report");
    }

    if args.json {
        write_json_response(&output)
    } else {
        write_text_response(&output)
    }
}

struct ScoredSheet {
    extraction: ExtractionPass,
    report: ScoreReport,
}

/// Parses and scores one sheet. A sheet with no answer pairs is an error for the caller.
fn score_sheet(
    parser: &SheetParser,
    html: &str,
    source: &str,
    scheme: &MarkingScheme,
) -> Result<ScoredSheet> {
    let parsed = parser.parse(html);
    if parsed.is_empty() {
        bail!("no answer pairs detected in {source}");
    }

    let report = compute_section_scores(&parsed, scheme);

    info!(
        extraction = parsed.extraction.as_str(),
        sections = report.sections.len(),
        questions = report.total.summary.total_questions,
        total_marks = report.total.summary.total_marks,
        "computed score"
    );

    Ok(ScoredSheet {
        extraction: parsed.extraction,
        report,
    })
}

fn open_store(db_path: &Path, exam: &str) -> Option<SqliteScoreStore> {
    match SqliteScoreStore::open(db_path, exam) {
        Ok(store) => Some(store),
        Err(err) => {
            warn!(path = %db_path.display(), error = %err, "score store unavailable");
            None
        }
    }
}

/// Estimates against the corpus as it was before this sheet, then records the sheet.
/// Without a corpus the estimate is unranked and nothing is recorded.
fn rank_and_record(
    corpus: Option<&mut dyn ScoreCorpus>,
    exam: &str,
    document_sha256: &str,
    total: &SectionScore,
    total_candidates: u64,
    record: bool,
) -> (RankEstimate, bool) {
    let Some(corpus) = corpus else {
        return (RankEstimate::unranked(total_candidates), false);
    };

    let rank = estimate_rank(
        total.summary.total_marks,
        Some(document_sha256),
        &*corpus,
        total_candidates,
    );
    let recorded = record && record_score(corpus, exam, document_sha256, total);

    (rank, recorded)
}

fn record_score(
    corpus: &mut dyn ScoreCorpus,
    exam: &str,
    document_sha256: &str,
    total: &SectionScore,
) -> bool {
    match corpus.recorded_total(document_sha256) {
        Ok(Some(previous)) => info!(exam, previous, "sheet already recorded, replacing its entry"),
        Ok(None) => {}
        Err(err) => warn!(error = %err, "failed to check for an existing record"),
    }

    let record = HistoricalScoreRecord::from_summary(
        exam,
        document_sha256,
        &total.summary,
        now_utc_string(),
    );

    match corpus.append(&record) {
        Ok(()) => true,
        Err(err) => {
            warn!(error = %err, "failed to record score");
            false
        }
    }
}

fn write_json_response(output: &ScoreRunOutput) -> Result<()> {
    let mut out = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut out, output)
        .context("failed to serialize score json output")?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

fn write_text_response(output: &ScoreRunOutput) -> Result<()> {
    let mut out = io::BufWriter::new(io::stdout().lock());

    writeln!(out, "Exam: {}", output.exam)?;
    writeln!(
        out,
        "Extraction: {} sha256={}",
        output.extraction.as_str(),
        output.document_sha256
    )?;
    writeln!(
        out,
        "Marking: +{} per correct, -{} per wrong",
        output.report.total.summary.marks_per_correct,
        output.report.total.summary.negative_per_wrong
    )?;
    writeln!(
        out,
        "{:<32} {:>7} {:>5} {:>11} {:>9} {:>8} {:>8}",
        "Section", "Correct", "Wrong", "Unattempted", "Questions", "Marks", "Accuracy"
    )?;

    for section in &output.report.sections {
        write_section_line(&mut out, section)?;
    }
    write_section_line(&mut out, &output.report.total)?;

    match (output.rank.percentile, output.rank.estimated_rank) {
        (Some(percentile), Some(rank)) => writeln!(
            out,
            "Percentile: {percentile:.2} (sample {}) estimated rank: {rank} of {}",
            output.rank.sample_size, output.rank.total_candidates
        )?,
        _ => writeln!(out, "Percentile: n/a (no earlier scores for this exam)")?,
    }
    writeln!(out, "Recorded: {}", if output.recorded { "yes" } else { "no" })?;

    out.flush()?;
    Ok(())
}

fn write_section_line(out: &mut impl Write, section: &SectionScore) -> Result<()> {
    let summary = &section.summary;
    writeln!(
        out,
        "{:<32} {:>7} {:>5} {:>11} {:>9} {:>8.2} {:>7.2}%",
        truncate_name(&section.name, 32),
        summary.correct,
        summary.wrong,
        summary.unattempted,
        summary.total_questions,
        summary.total_marks,
        summary.accuracy
    )?;
    Ok(())
}

fn truncate_name(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        return name.to_string();
    }
    let mut truncated = name.chars().take(width.saturating_sub(1)).collect::<String>();
    truncated.push('~');
    truncated
}
