use super::*;

/// Dimension id reported for aggregates computed over a whole questionnaire.
pub const QUESTIONNAIRE_OVERALL: &str = "questionnaire_overall";

/// Three raters per questionnaire is the annotation protocol the platform was built for.
pub const DEFAULT_TARGET_RATERS: usize = 3;

/// Upper bound on the reconciled roster; cloning grows every subject to this size.
pub const MAX_TARGET_RATERS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rating {
    pub questionnaire_id: String,
    pub question_id: String,
    pub dimension_id: String,
    pub annotator_id: String,
    pub winner: Winner,
}

impl Rating {
    pub fn subject_key(&self) -> SubjectKey {
        SubjectKey {
            question_id: self.question_id.clone(),
            dimension_id: self.dimension_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectKey {
    pub question_id: String,
    pub dimension_id: String,
}

/// One independent kappa computation: a questionnaire, optionally narrowed to a dimension.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupKey {
    pub questionnaire_id: String,
    pub dimension_id: String,
}

impl GroupKey {
    pub fn overall(questionnaire_id: impl Into<String>) -> Self {
        Self {
            questionnaire_id: questionnaire_id.into(),
            dimension_id: QUESTIONNAIRE_OVERALL.to_string(),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Granularity {
    #[default]
    Questionnaire,
    Dimension,
}

impl Granularity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Questionnaire => "questionnaire",
            Self::Dimension => "dimension",
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum PolicyKind {
    #[default]
    CloneRaters,
    DropIncompleteSubjects,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsConfig {
    pub target_raters: usize,
    pub policy: PolicyKind,
    pub granularity: Granularity,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            target_raters: DEFAULT_TARGET_RATERS,
            policy: PolicyKind::default(),
            granularity: Granularity::default(),
        }
    }
}

impl AnalyticsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.target_raters < 2 {
            bail!(
                "target rater count must be at least 2 for fleiss kappa, got {}",
                self.target_raters
            );
        }
        if self.target_raters > MAX_TARGET_RATERS {
            bail!(
                "target rater count must be at most {MAX_TARGET_RATERS}, got {}",
                self.target_raters
            );
        }
        Ok(())
    }

    pub fn policy(&self) -> Box<dyn ReconciliationPolicy> {
        match self.policy {
            PolicyKind::CloneRaters => Box::new(CloneRaters::new(self.target_raters)),
            PolicyKind::DropIncompleteSubjects => {
                Box::new(DropIncompleteSubjects::new(self.target_raters))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryTotals {
    #[serde(rename = "A")]
    pub a: u64,
    #[serde(rename = "B")]
    pub b: u64,
    pub tie: u64,
}

impl CategoryTotals {
    pub fn from_winners<I: IntoIterator<Item = Winner>>(winners: I) -> Self {
        let mut totals = Self::default();
        for winner in winners {
            totals.add(winner);
        }
        totals
    }

    pub fn add(&mut self, winner: Winner) {
        match winner {
            Winner::A => self.a += 1,
            Winner::B => self.b += 1,
            Winner::Tie => self.tie += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.a + self.b + self.tie
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregateError {
    #[error("questionnaire {questionnaire_id} has no raters")]
    NoRaters { questionnaire_id: String },
    #[error("questionnaire {questionnaire_id} has {found} raters, policy needs {target}")]
    InsufficientRaters {
        questionnaire_id: String,
        found: usize,
        target: usize,
    },
    #[error("questionnaire {questionnaire_id} has no complete subjects left")]
    NoSubjects { questionnaire_id: String },
    #[error("questionnaire {questionnaire_id}: {source}")]
    Kappa {
        questionnaire_id: String,
        #[source]
        source: KappaError,
    },
}
