use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Winner {
    A,
    B,
    #[serde(rename = "tie")]
    Tie,
}

impl Winner {
    /// Accepts the three category labels exactly as the annotation form stores them.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "A" => Some(Self::A),
            "B" => Some(Self::B),
            "tie" => Some(Self::Tie),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::Tie => "tie",
        }
    }

    /// Column of this category in a rating matrix.
    pub fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::Tie => 2,
        }
    }

    pub fn swapped(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
            Self::Tie => Self::Tie,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionEvaluation {
    pub dimension_id: String,
    #[serde(default)]
    pub winner: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl DimensionEvaluation {
    pub fn parsed_winner(&self) -> Option<Winner> {
        Winner::parse(&self.winner)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<String>,
    pub questionnaire_id: String,
    pub question_id: String,
    pub annotator_id: String,
    pub submitted_at: DateTime<Utc>,
    #[serde(default, alias = "evaluations")]
    pub dimension_evaluations: Vec<DimensionEvaluation>,
}

impl Submission {
    pub fn evaluation(&self, dimension_id: &str) -> Option<&DimensionEvaluation> {
        self.dimension_evaluations
            .iter()
            .find(|evaluation| evaluation.dimension_id == dimension_id)
    }
}

/// Accepted layouts of a submissions export: a bare array or a wrapper object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SubmissionFile {
    Wrapped { submissions: Vec<Submission> },
    Bare(Vec<Submission>),
}

impl SubmissionFile {
    pub fn into_submissions(self) -> Vec<Submission> {
        match self {
            Self::Wrapped { submissions } => submissions,
            Self::Bare(submissions) => submissions,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestPaths {
    pub cache_root: String,
    pub manifest_dir: String,
    pub input_path: String,
    pub db_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IngestCounts {
    pub submissions_read: usize,
    pub submissions_upserted: usize,
    pub evaluations_upserted: usize,
    pub submissions_total: i64,
    pub evaluations_total: i64,
    pub questionnaires_total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub db_schema_version: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub source_sha256: String,
    pub paths: IngestPaths,
    pub counts: IngestCounts,
    pub warnings: Vec<String>,
}

/// Subset of the ingest manifest that `status` reads back.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestRunSnapshot {
    pub run_id: Option<String>,
    pub status: Option<String>,
    pub updated_at: Option<String>,
    pub source_sha256: Option<String>,
    #[serde(default)]
    pub counts: IngestCounts,
}
