use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{info, warn};

use raterkappa::model::{IngestCounts, IngestPaths, IngestRunManifest, Submission, SubmissionFile};
use raterkappa::store::{DB_SCHEMA_VERSION, count_rows, open_store, upsert_submissions};
use raterkappa::util::{
    ensure_directory, now_utc_string, read_json, sha256_file, utc_compact_string,
    write_json_pretty,
};

use crate::cli::IngestArgs;

pub const DB_FILENAME: &str = "raterkappa.sqlite";
pub const INGEST_MANIFEST_PREFIX: &str = "ingest_run_";

pub fn run(args: IngestArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("ingest-{}", utc_compact_string(started_ts));

    let cache_root = args.cache_root.clone();
    let manifest_dir = cache_root.join("manifests");
    ensure_directory(&manifest_dir)?;

    let manifest_path = args.manifest_path.clone().unwrap_or_else(|| {
        manifest_dir.join(format!(
            "{INGEST_MANIFEST_PREFIX}{}.json",
            utc_compact_string(started_ts)
        ))
    });
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| cache_root.join(DB_FILENAME));

    info!(
        input = %args.input.display(),
        db_path = %db_path.display(),
        run_id = %run_id,
        "starting ingest"
    );

    let source_sha256 = sha256_file(&args.input)?;
    let submissions = read_submissions(&args.input)?;
    let warnings = collect_warnings(&submissions);
    for warning in &warnings {
        warn!(warning = %warning, "submission export warning");
    }

    let mut connection = open_store(&db_path)?;
    let upserted = upsert_submissions(&mut connection, &submissions)?;

    let counts = IngestCounts {
        submissions_read: submissions.len(),
        submissions_upserted: upserted.submissions,
        evaluations_upserted: upserted.evaluations,
        submissions_total: count_rows(&connection, "SELECT COUNT(*) FROM submissions")?,
        evaluations_total: count_rows(&connection, "SELECT COUNT(*) FROM dimension_evaluations")?,
        questionnaires_total: count_rows(
            &connection,
            "SELECT COUNT(DISTINCT questionnaire_id) FROM submissions",
        )?,
    };

    let manifest = IngestRunManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        db_schema_version: DB_SCHEMA_VERSION.to_string(),
        status: "completed".to_string(),
        started_at,
        updated_at: now_utc_string(),
        command: std::env::args().collect::<Vec<_>>().join(" "),
        source_sha256,
        paths: IngestPaths {
            cache_root: cache_root.display().to_string(),
            manifest_dir: manifest_dir.display().to_string(),
            input_path: args.input.display().to_string(),
            db_path: db_path.display().to_string(),
        },
        counts,
        warnings,
    };

    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote ingest manifest");
    info!(
        run_id = %run_id,
        submissions = manifest.counts.submissions_upserted,
        evaluations = manifest.counts.evaluations_upserted,
        submissions_total = manifest.counts.submissions_total,
        questionnaires_total = manifest.counts.questionnaires_total,
        "ingest completed"
    );

    Ok(())
}

pub fn read_submissions(path: &Path) -> Result<Vec<Submission>> {
    if !path.exists() {
        bail!("submission export not found: {}", path.display());
    }
    let file: SubmissionFile = read_json(path)
        .with_context(|| format!("failed to load submissions from {}", path.display()))?;
    Ok(file.into_submissions())
}

/// Data-quality notes for the manifest. None of these block ingest; blank and
/// unknown winners are kept in the store and filtered at analysis time.
pub fn collect_warnings(submissions: &[Submission]) -> Vec<String> {
    let mut warnings = Vec::new();

    let without_evaluations = submissions
        .iter()
        .filter(|submission| submission.dimension_evaluations.is_empty())
        .count();
    if without_evaluations > 0 {
        warnings.push(format!(
            "{without_evaluations} submission(s) carry no dimension evaluations"
        ));
    }

    let blank_winners = submissions
        .iter()
        .flat_map(|submission| submission.dimension_evaluations.iter())
        .filter(|evaluation| evaluation.winner.trim().is_empty())
        .count();
    if blank_winners > 0 {
        warnings.push(format!("{blank_winners} evaluation(s) have no winner"));
    }

    let unknown_winners = submissions
        .iter()
        .flat_map(|submission| submission.dimension_evaluations.iter())
        .filter(|evaluation| {
            !evaluation.winner.trim().is_empty() && evaluation.parsed_winner().is_none()
        })
        .count();
    if unknown_winners > 0 {
        warnings.push(format!(
            "{unknown_winners} evaluation(s) have a winner other than A, B or tie"
        ));
    }

    warnings
}
