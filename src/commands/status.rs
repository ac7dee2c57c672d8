use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use raterkappa::model::IngestRunSnapshot;
use raterkappa::store::count_rows;
use raterkappa::util::read_json;

use crate::cli::StatusArgs;
use crate::commands::ingest::{DB_FILENAME, INGEST_MANIFEST_PREFIX};

pub fn run(args: StatusArgs) -> Result<()> {
    let manifest_dir = args.cache_root.join("manifests");
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| args.cache_root.join(DB_FILENAME));

    info!(cache_root = %args.cache_root.display(), "status requested");

    match latest_ingest_manifest(&manifest_dir)? {
        Some(path) => {
            let snapshot: IngestRunSnapshot = read_json(&path)?;
            info!(
                path = %path.display(),
                run_id = %snapshot.run_id.unwrap_or_default(),
                status = %snapshot.status.unwrap_or_default(),
                updated_at = %snapshot.updated_at.unwrap_or_default(),
                source_sha256 = %snapshot.source_sha256.unwrap_or_default(),
                submissions_read = snapshot.counts.submissions_read,
                submissions_total = snapshot.counts.submissions_total,
                "loaded latest ingest manifest"
            );
        }
        None => warn!(path = %manifest_dir.display(), "no ingest manifest found"),
    }

    if db_path.exists() {
        let conn = Connection::open(&db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?;
        let submissions = count_rows(&conn, "SELECT COUNT(*) FROM submissions").unwrap_or(0);
        let evaluations =
            count_rows(&conn, "SELECT COUNT(*) FROM dimension_evaluations").unwrap_or(0);
        let questionnaires = count_rows(
            &conn,
            "SELECT COUNT(DISTINCT questionnaire_id) FROM submissions",
        )
        .unwrap_or(0);
        let annotators =
            count_rows(&conn, "SELECT COUNT(DISTINCT annotator_id) FROM submissions").unwrap_or(0);

        info!(
            path = %db_path.display(),
            submissions,
            evaluations,
            questionnaires,
            annotators,
            "database status"
        );
    } else {
        warn!(path = %db_path.display(), "database file missing");
    }

    Ok(())
}

/// Manifest names embed a compact UTC timestamp, so the lexicographic maximum is the newest.
fn latest_ingest_manifest(manifest_dir: &Path) -> Result<Option<PathBuf>> {
    if !manifest_dir.exists() {
        return Ok(None);
    }

    let mut latest: Option<PathBuf> = None;
    for entry in fs::read_dir(manifest_dir)
        .with_context(|| format!("failed to list {}", manifest_dir.display()))?
    {
        let path = entry?.path();
        let is_manifest = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| {
                name.starts_with(INGEST_MANIFEST_PREFIX) && name.ends_with(".json")
            });
        if is_manifest && latest.as_ref().is_none_or(|current| path > *current) {
            latest = Some(path);
        }
    }

    Ok(latest)
}
