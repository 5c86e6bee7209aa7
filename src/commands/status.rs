use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::config::resolve_db_path;
use crate::store::SqliteScoreStore;

pub fn run(args: StatusArgs) -> Result<()> {
    let db_path = resolve_db_path(&args.cache_root, args.db_path.as_deref());

    info!(cache_root = %args.cache_root.display(), "status requested");

    if !db_path.exists() {
        warn!(path = %db_path.display(), "score store missing");
        return Ok(());
    }

    let store = SqliteScoreStore::open(&db_path, &args.exam)?;
    let summary = store.summary()?;
    let exams = store.exams()?;

    info!(
        path = %db_path.display(),
        exam = %summary.exam,
        records = summary.records,
        exams = exams.len(),
        "score store status"
    );

    let mut out = io::BufWriter::new(io::stdout().lock());
    if args.json {
        let value = serde_json::json!({
            "db_path": db_path.display().to_string(),
            "summary": summary,
            "exams": exams
                .iter()
                .map(|(exam, records)| serde_json::json!({ "exam": exam, "records": records }))
                .collect::<Vec<_>>(),
        });
        serde_json::to_writer_pretty(&mut out, &value)
            .context("failed to serialize status json output")?;
        writeln!(out)?;
    } else {
        writeln!(out, "Store: {}", db_path.display())?;
        writeln!(out, "Exam: {} ({} records)", summary.exam, summary.records)?;
        if let (Some(min), Some(max), Some(mean)) = (
            summary.min_total_marks,
            summary.max_total_marks,
            summary.mean_total_marks,
        ) {
            writeln!(out, "Total marks: min={min:.2} max={max:.2} mean={mean:.2}")?;
        }
        if let Some(last) = &summary.last_recorded_at {
            writeln!(out, "Last recorded: {last}")?;
        }
        for (exam, records) in &exams {
            writeln!(out, "\t{exam}\t{records}")?;
        }
    }
    out.flush()?;

    Ok(())
}
