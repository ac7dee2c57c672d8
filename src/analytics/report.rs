use super::*;

pub const REPORT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionKappaScore {
    pub questionnaire_id: String,
    pub kappa: f64,
    pub subjects: usize,
    pub raters: u64,
    pub categories: CategoryTotals,
}

/// Per-group record consumed by the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgreementRecord {
    pub questionnaire_id: String,
    pub dimension_id: String,
    pub fleiss_kappa: f64,
    pub kappa_interpretation: AgreementLevel,
    pub agreement_label: DisplayAgreement,
    pub preference_strength: u32,
    pub avg_kappa_per_question: f64,
    pub question_kappa_scores: Vec<QuestionKappaScore>,
    pub policy: String,
    pub roster: Vec<String>,
    pub subject_count: usize,
    pub synthetic: bool,
    pub reconciliation: ReconciliationStats,
}

impl From<&QuestionnaireAggregate> for AgreementRecord {
    fn from(aggregate: &QuestionnaireAggregate) -> Self {
        Self {
            questionnaire_id: aggregate.key.questionnaire_id.clone(),
            dimension_id: aggregate.key.dimension_id.clone(),
            fleiss_kappa: aggregate.kappa.kappa,
            kappa_interpretation: aggregate.kappa.interpretation,
            agreement_label: aggregate.kappa.display,
            preference_strength: aggregate.preference_strength,
            avg_kappa_per_question: aggregate.kappa.kappa,
            question_kappa_scores: vec![QuestionKappaScore {
                questionnaire_id: aggregate.key.questionnaire_id.clone(),
                kappa: aggregate.kappa.kappa,
                subjects: aggregate.kappa.subjects,
                raters: aggregate.kappa.raters,
                categories: aggregate.kappa.categories,
            }],
            policy: aggregate.policy.clone(),
            roster: aggregate.roster.clone(),
            subject_count: aggregate.subject_count,
            synthetic: aggregate.reconciliation.is_synthetic(),
            reconciliation: aggregate.reconciliation.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSettings {
    pub seed: u64,
    pub policy: String,
    pub target_raters: usize,
    pub granularity: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub report_version: u32,
    pub generated_at: String,
    pub settings: RunSettings,
    pub submissions: usize,
    pub ratings: usize,
    pub agreement: Vec<AgreementRecord>,
    pub skipped: Vec<SkippedGroup>,
    pub dimensions: Vec<DimensionAnalysis>,
    pub dimension_agreement: DimensionAgreementMatrix,
}

/// Builds the full report for one snapshot. `seed` is recorded only; sampling
/// draws from `rng`, which the caller is expected to have seeded with it.
pub fn build_report(
    submissions: &[Submission],
    dimension_filter: &[String],
    config: &AnalyticsConfig,
    seed: u64,
    generated_at: String,
    rng: &mut dyn RngCore,
) -> AnalyticsReport {
    let ratings = ratings_from_submissions(submissions);
    let outcome = aggregate_all(&ratings, config, rng);

    let dimension_ids = if dimension_filter.is_empty() {
        dimension_ids(submissions)
    } else {
        dimension_filter.to_vec()
    };

    AnalyticsReport {
        report_version: REPORT_VERSION,
        generated_at,
        settings: RunSettings {
            seed,
            policy: config.policy().name().to_string(),
            target_raters: config.target_raters,
            granularity: config.granularity.as_str().to_string(),
        },
        submissions: submissions.len(),
        ratings: ratings.len(),
        agreement: outcome.aggregates.iter().map(AgreementRecord::from).collect(),
        skipped: outcome.skipped,
        dimensions: analyze_dimensions(&dimension_ids, submissions),
        dimension_agreement: dimension_agreement_matrix(&dimension_ids, submissions),
    }
}
