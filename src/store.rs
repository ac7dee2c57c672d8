//! Local SQLite snapshot of annotation submissions.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params, params_from_iter};
use tracing::debug;

use crate::model::{DimensionEvaluation, Submission};
use crate::util::sha256_fields;

pub const DB_SCHEMA_VERSION: &str = "0.1.0";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertStats {
    pub submissions: usize,
    pub evaluations: usize,
}

pub fn open_store(db_path: &Path) -> Result<Connection> {
    let connection = Connection::open(db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    configure_connection(&connection)?;
    ensure_schema(&connection)?;
    Ok(connection)
}

pub fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    connection
        .pragma_update(None, "foreign_keys", "ON")
        .context("failed to enable foreign_keys")?;
    Ok(())
}

pub fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS metadata (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS submissions (
              submission_id TEXT PRIMARY KEY,
              questionnaire_id TEXT NOT NULL,
              question_id TEXT NOT NULL,
              annotator_id TEXT NOT NULL,
              submitted_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_submissions_questionnaire
              ON submissions(questionnaire_id);

            CREATE TABLE IF NOT EXISTS dimension_evaluations (
              submission_id TEXT NOT NULL,
              dimension_id TEXT NOT NULL,
              winner TEXT NOT NULL DEFAULT '',
              notes TEXT,
              order_index INTEGER NOT NULL DEFAULT 0,
              PRIMARY KEY(submission_id, dimension_id),
              FOREIGN KEY(submission_id) REFERENCES submissions(submission_id) ON DELETE CASCADE
            );
            ",
        )
        .context("failed to create submission schema")?;

    connection.execute(
        "
        INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
        ON CONFLICT(key) DO UPDATE SET value=excluded.value
        ",
        params![DB_SCHEMA_VERSION],
    )?;

    Ok(())
}

/// Stable id for submissions exported without one.
pub fn submission_key(submission: &Submission) -> String {
    if let Some(id) = submission.submission_id.as_deref().filter(|id| !id.is_empty()) {
        return id.to_string();
    }
    let submitted_at = submission.submitted_at.to_rfc3339();
    sha256_fields(&[
        &submission.questionnaire_id,
        &submission.question_id,
        &submission.annotator_id,
        &submitted_at,
    ])
}

/// Inserts or replaces submissions in one transaction. A replaced submission
/// loses evaluations that are absent from the new copy.
pub fn upsert_submissions(
    connection: &mut Connection,
    submissions: &[Submission],
) -> Result<UpsertStats> {
    let tx = connection.transaction()?;
    let mut stats = UpsertStats::default();

    {
        let mut upsert_submission = tx.prepare(
            "
            INSERT INTO submissions(submission_id, questionnaire_id, question_id, annotator_id, submitted_at)
            VALUES(?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(submission_id) DO UPDATE SET
              questionnaire_id=excluded.questionnaire_id,
              question_id=excluded.question_id,
              annotator_id=excluded.annotator_id,
              submitted_at=excluded.submitted_at
            ",
        )?;
        let mut clear_evaluations =
            tx.prepare("DELETE FROM dimension_evaluations WHERE submission_id = ?1")?;
        let mut insert_evaluation = tx.prepare(
            "
            INSERT INTO dimension_evaluations(submission_id, dimension_id, winner, notes, order_index)
            VALUES(?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(submission_id, dimension_id) DO UPDATE SET
              winner=excluded.winner,
              notes=excluded.notes,
              order_index=excluded.order_index
            ",
        )?;

        for submission in submissions {
            let submission_id = submission_key(submission);
            upsert_submission.execute(params![
                submission_id,
                submission.questionnaire_id,
                submission.question_id,
                submission.annotator_id,
                submission.submitted_at,
            ])?;
            clear_evaluations.execute(params![submission_id])?;

            for (order_index, evaluation) in submission.dimension_evaluations.iter().enumerate() {
                insert_evaluation.execute(params![
                    submission_id,
                    evaluation.dimension_id,
                    evaluation.winner,
                    evaluation.notes,
                    order_index as i64,
                ])?;
                stats.evaluations += 1;
            }
            stats.submissions += 1;
        }
    }

    tx.commit().context("failed to commit submission upsert")?;
    debug!(
        submissions = stats.submissions,
        evaluations = stats.evaluations,
        "upserted submissions"
    );
    Ok(stats)
}

/// Loads a snapshot ordered by submission time, optionally limited to some questionnaires.
pub fn load_submissions(
    connection: &Connection,
    questionnaire_ids: &[String],
) -> Result<Vec<Submission>> {
    let filter = if questionnaire_ids.is_empty() {
        String::new()
    } else {
        let placeholders = (1..=questionnaire_ids.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!("WHERE questionnaire_id IN ({placeholders})")
    };
    let mut statement = connection.prepare(&format!(
        "
        SELECT submission_id, questionnaire_id, question_id, annotator_id, submitted_at
        FROM submissions
        {filter}
        ORDER BY submitted_at ASC, submission_id ASC
        "
    ))?;

    let mut rows = statement.query(params_from_iter(questionnaire_ids.iter()))?;
    let mut out = Vec::<Submission>::new();
    while let Some(row) = rows.next()? {
        let submitted_at: DateTime<Utc> = row.get(4)?;
        out.push(Submission {
            submission_id: Some(row.get(0)?),
            questionnaire_id: row.get(1)?,
            question_id: row.get(2)?,
            annotator_id: row.get(3)?,
            submitted_at,
            dimension_evaluations: Vec::new(),
        });
    }

    let mut evaluations = connection.prepare(
        "
        SELECT dimension_id, winner, notes
        FROM dimension_evaluations
        WHERE submission_id = ?1
        ORDER BY order_index ASC, dimension_id ASC
        ",
    )?;
    for submission in &mut out {
        let submission_id = submission.submission_id.clone().unwrap_or_default();
        let mut rows = evaluations.query(params![submission_id])?;
        while let Some(row) = rows.next()? {
            submission.dimension_evaluations.push(DimensionEvaluation {
                dimension_id: row.get(0)?,
                winner: row.get(1)?,
                notes: row.get(2)?,
            });
        }
    }

    Ok(out)
}

pub fn count_rows(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}
