use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use tracing::debug;

use crate::model::HistoricalScoreRecord;
use crate::rank::ScoreCorpus;
use crate::util::{ensure_directory, now_utc_string};

const DB_SCHEMA_VERSION: &str = "0.1.0";

#[derive(Debug, Clone, Serialize)]
pub struct CorpusSummary {
    pub exam: String,
    pub records: u64,
    pub min_total_marks: Option<f64>,
    pub max_total_marks: Option<f64>,
    pub mean_total_marks: Option<f64>,
    pub last_recorded_at: Option<String>,
}

/// Historical totals for one exam, backed by a local SQLite file.
pub struct SqliteScoreStore {
    connection: Connection,
    exam: String,
}

impl SqliteScoreStore {
    pub fn open(db_path: &Path, exam: &str) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            ensure_directory(parent)?;
        }

        let connection = Connection::open(db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?;
        configure_connection(&connection)?;
        Self::with_connection(connection, exam)
    }

    #[cfg(test)]
    pub fn open_in_memory(exam: &str) -> Result<Self> {
        let connection =
            Connection::open_in_memory().context("failed to open in-memory database")?;
        Self::with_connection(connection, exam)
    }

    fn with_connection(connection: Connection, exam: &str) -> Result<Self> {
        ensure_schema(&connection)?;
        Ok(Self {
            connection,
            exam: exam.to_string(),
        })
    }

    pub fn summary(&self) -> Result<CorpusSummary> {
        let (records, min_total_marks, max_total_marks, mean_total_marks, last_recorded_at) = self
            .connection
            .query_row(
                "
                SELECT COUNT(*), MIN(total_marks), MAX(total_marks), AVG(total_marks), MAX(recorded_at)
                FROM score_records
                WHERE exam = ?1
                ",
                [&self.exam],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Option<f64>>(1)?,
                        row.get::<_, Option<f64>>(2)?,
                        row.get::<_, Option<f64>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                    ))
                },
            )
            .context("failed to summarize score records")?;

        Ok(CorpusSummary {
            exam: self.exam.clone(),
            records: records.max(0) as u64,
            min_total_marks,
            max_total_marks,
            mean_total_marks,
            last_recorded_at,
        })
    }

    pub fn exams(&self) -> Result<Vec<(String, u64)>> {
        let mut statement = self.connection.prepare(
            "SELECT exam, COUNT(*) FROM score_records GROUP BY exam ORDER BY exam ASC",
        )?;

        let mut rows = statement.query([])?;
        let mut out = Vec::<(String, u64)>::new();
        while let Some(row) = rows.next()? {
            let count: i64 = row.get(1)?;
            out.push((row.get(0)?, count.max(0) as u64));
        }

        Ok(out)
    }
}

impl ScoreCorpus for SqliteScoreStore {
    fn count(&self) -> Result<u64> {
        let count: i64 = self
            .connection
            .query_row(
                "SELECT COUNT(*) FROM score_records WHERE exam = ?1",
                [&self.exam],
                |row| row.get(0),
            )
            .context("failed to count score records")?;
        Ok(count.max(0) as u64)
    }

    fn count_less_than(&self, total_marks: f64) -> Result<u64> {
        let count: i64 = self
            .connection
            .query_row(
                "SELECT COUNT(*) FROM score_records WHERE exam = ?1 AND total_marks < ?2",
                params![self.exam, total_marks],
                |row| row.get(0),
            )
            .context("failed to count lower score records")?;
        Ok(count.max(0) as u64)
    }

    /// Replaces any earlier record of the same document so resubmissions stay single.
    fn append(&mut self, record: &HistoricalScoreRecord) -> Result<()> {
        self.connection
            .execute(
                "
                INSERT INTO score_records(
                  exam, document_sha256, total_marks, correct, wrong, unattempted,
                  total_questions, marks_per_correct, negative_per_wrong, recorded_at
                )
                VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ON CONFLICT(exam, document_sha256) DO UPDATE SET
                  total_marks=excluded.total_marks,
                  correct=excluded.correct,
                  wrong=excluded.wrong,
                  unattempted=excluded.unattempted,
                  total_questions=excluded.total_questions,
                  marks_per_correct=excluded.marks_per_correct,
                  negative_per_wrong=excluded.negative_per_wrong,
                  recorded_at=excluded.recorded_at
                ",
                params![
                    record.exam,
                    record.document_sha256,
                    record.total_marks,
                    record.correct,
                    record.wrong,
                    record.unattempted,
                    record.total_questions,
                    record.marks_per_correct,
                    record.negative_per_wrong,
                    record.recorded_at,
                ],
            )
            .context("failed to append score record")?;

        debug!(exam = %record.exam, total_marks = record.total_marks, "appended score record");
        Ok(())
    }

    fn recorded_total(&self, document_sha256: &str) -> Result<Option<f64>> {
        self.connection
            .query_row(
                "SELECT total_marks FROM score_records WHERE exam = ?1 AND document_sha256 = ?2",
                params![self.exam, document_sha256],
                |row| row.get(0),
            )
            .optional()
            .context("failed to look up score record")
    }

    fn snapshot(&self, total_marks: f64, exclude_document: Option<&str>) -> Result<(u64, u64)> {
        let (count, less): (i64, i64) = self
            .connection
            .query_row(
                "
                SELECT COUNT(*), COALESCE(SUM(CASE WHEN total_marks < ?2 THEN 1 ELSE 0 END), 0)
                FROM score_records
                WHERE exam = ?1 AND (?3 IS NULL OR document_sha256 <> ?3)
                ",
                params![self.exam, total_marks, exclude_document],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .context("failed to read score corpus snapshot")?;

        Ok((count.max(0) as u64, less.max(0) as u64))
    }
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    Ok(())
}

fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS metadata (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS score_records (
              record_id INTEGER PRIMARY KEY AUTOINCREMENT,
              exam TEXT NOT NULL,
              document_sha256 TEXT NOT NULL,
              total_marks REAL NOT NULL,
              correct INTEGER NOT NULL,
              wrong INTEGER NOT NULL,
              unattempted INTEGER NOT NULL,
              total_questions INTEGER NOT NULL,
              marks_per_correct REAL NOT NULL,
              negative_per_wrong REAL NOT NULL,
              recorded_at TEXT NOT NULL,
              UNIQUE(exam, document_sha256)
            );

            CREATE INDEX IF NOT EXISTS idx_score_records_exam_total ON score_records(exam, total_marks);
            ",
        )
        .context("failed to initialize score store schema")?;

    let now = now_utc_string();
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [DB_SCHEMA_VERSION],
    )?;
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_updated_at', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [now],
    )?;

    Ok(())
}
