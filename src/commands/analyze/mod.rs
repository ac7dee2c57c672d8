use std::io::{self, Write};

use anyhow::{Context, Result, bail};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use raterkappa::analytics::{AnalyticsReport, build_report};
use raterkappa::model::Submission;
use raterkappa::store::{load_submissions, open_store};
use raterkappa::util::{now_utc_string, write_json_pretty};

use crate::cli::AnalyzeArgs;
use crate::commands::ingest::{DB_FILENAME, read_submissions};

mod output;

use self::output::*;

pub fn run(args: AnalyzeArgs) -> Result<()> {
    let config = args.analytics_config();
    config.validate()?;

    let submissions = load_snapshot(&args)?;
    let seed = args.seed.unwrap_or_else(rand::random::<u64>);
    info!(
        seed,
        seeded_by_caller = args.seed.is_some(),
        policy = args.policy.as_str(),
        target_raters = config.target_raters,
        granularity = config.granularity.as_str(),
        submissions = submissions.len(),
        "starting analysis"
    );

    let mut rng = StdRng::seed_from_u64(seed);
    let report = build_report(
        &submissions,
        &args.dimensions,
        &config,
        seed,
        now_utc_string(),
        &mut rng,
    );

    if let Some(path) = &args.report_path {
        write_json_pretty(path, &report)?;
        info!(path = %path.display(), "wrote analytics report");
    }

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        write_json_report(&mut output, &report)?;
    } else {
        write_text_report(&mut output, &report)?;
    }
    output.flush()?;

    info!(
        aggregates = report.agreement.len(),
        skipped = report.skipped.len(),
        dimensions = report.dimensions.len(),
        "analysis completed"
    );
    Ok(())
}

fn load_snapshot(args: &AnalyzeArgs) -> Result<Vec<Submission>> {
    if let Some(input) = &args.input {
        let mut submissions = read_submissions(input)?;
        if !args.questionnaires.is_empty() {
            submissions
                .retain(|submission| args.questionnaires.contains(&submission.questionnaire_id));
        }
        info!(
            input = %input.display(),
            submissions = submissions.len(),
            "loaded submission export"
        );
        return Ok(submissions);
    }

    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| args.cache_root.join(DB_FILENAME));
    if !db_path.exists() {
        bail!(
            "database not found at {}; run `raterkappa ingest` first or pass --input",
            db_path.display()
        );
    }

    let connection = open_store(&db_path)?;
    let submissions = load_submissions(&connection, &args.questionnaires)
        .with_context(|| format!("failed to load submissions from {}", db_path.display()))?;
    info!(
        db_path = %db_path.display(),
        submissions = submissions.len(),
        "loaded submission snapshot"
    );
    Ok(submissions)
}

fn write_json_report<W: Write>(output: &mut W, report: &AnalyticsReport) -> Result<()> {
    serde_json::to_writer_pretty(&mut *output, report)
        .context("failed to serialize analytics json output")?;
    writeln!(output)?;
    Ok(())
}
