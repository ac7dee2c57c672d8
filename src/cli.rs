use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use raterkappa::analytics::{AnalyticsConfig, DEFAULT_TARGET_RATERS, Granularity, PolicyKind};

#[derive(Parser, Debug)]
#[command(
    name = "raterkappa",
    version,
    about = "Inter-rater agreement analytics for pairwise annotation questionnaires"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Ingest(IngestArgs),
    Analyze(AnalyzeArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    #[arg(long, default_value = ".cache/raterkappa")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ReconcileMode {
    Clone,
    DropIncomplete,
}

impl ReconcileMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clone => "clone",
            Self::DropIncomplete => "drop-incomplete",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum GranularityMode {
    Questionnaire,
    Dimension,
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    #[arg(long, default_value = ".cache/raterkappa")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    /// Read submissions from a JSON export instead of the database.
    #[arg(long)]
    pub input: Option<PathBuf>,

    #[arg(long = "questionnaire")]
    pub questionnaires: Vec<String>,

    #[arg(long = "dimension")]
    pub dimensions: Vec<String>,

    #[arg(long, default_value_t = DEFAULT_TARGET_RATERS)]
    pub target_raters: usize,

    #[arg(long, value_enum, default_value_t = ReconcileMode::Clone)]
    pub policy: ReconcileMode,

    #[arg(long, value_enum, default_value_t = GranularityMode::Questionnaire)]
    pub granularity: GranularityMode,

    /// Seed for roster sampling; drawn at random and logged when omitted.
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long)]
    pub report_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

impl AnalyzeArgs {
    pub fn analytics_config(&self) -> AnalyticsConfig {
        AnalyticsConfig {
            target_raters: self.target_raters,
            policy: match self.policy {
                ReconcileMode::Clone => PolicyKind::CloneRaters,
                ReconcileMode::DropIncomplete => PolicyKind::DropIncompleteSubjects,
            },
            granularity: match self.granularity {
                GranularityMode::Questionnaire => Granularity::Questionnaire,
                GranularityMode::Dimension => Granularity::Dimension,
            },
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/raterkappa")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,
}
