use super::*;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KappaResult {
    pub kappa: f64,
    pub interpretation: AgreementLevel,
    pub display: DisplayAgreement,
    pub raters: u64,
    pub subjects: usize,
    pub categories: CategoryTotals,
    pub observed_agreement: f64,
    pub expected_agreement: f64,
}

impl KappaResult {
    fn from_details(details: &KappaDetails, categories: CategoryTotals) -> Self {
        let interpretation = interpret_kappa(details.kappa);
        Self {
            kappa: details.kappa,
            interpretation,
            display: interpretation.display(details.kappa),
            raters: details.raters,
            subjects: details.subjects,
            categories,
            observed_agreement: details.observed_agreement,
            expected_agreement: details.expected_agreement,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireAggregate {
    pub key: GroupKey,
    pub policy: String,
    pub roster: Vec<String>,
    pub subject_count: usize,
    pub kappa: KappaResult,
    pub preference_strength: u32,
    pub reconciliation: ReconciliationStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedGroup {
    pub key: GroupKey,
    pub reason: String,
}

/// Result of a whole run. Empty `aggregates` means "no data", not failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateOutcome {
    pub aggregates: Vec<QuestionnaireAggregate>,
    pub skipped: Vec<SkippedGroup>,
}

pub fn aggregate_questionnaire(
    key: &GroupKey,
    ratings: &[Rating],
    policy: &dyn ReconciliationPolicy,
    rng: &mut dyn RngCore,
) -> Result<QuestionnaireAggregate, AggregateError> {
    let reconciled = policy.reconcile(key, ratings, rng)?;
    aggregate_reconciled(&reconciled, policy.name())
}

pub fn aggregate_reconciled(
    reconciled: &ReconciledGroup,
    policy_name: &str,
) -> Result<QuestionnaireAggregate, AggregateError> {
    let matrix = reconciled.matrix();
    let details = fleiss_kappa_detailed(&matrix).map_err(|source| AggregateError::Kappa {
        questionnaire_id: reconciled.key.questionnaire_id.clone(),
        source,
    })?;
    let totals = reconciled.category_totals();

    debug!(
        questionnaire_id = %reconciled.key.questionnaire_id,
        dimension_id = %reconciled.key.dimension_id,
        subjects = details.subjects,
        raters = details.raters,
        kappa = details.kappa,
        "computed fleiss kappa"
    );

    Ok(QuestionnaireAggregate {
        key: reconciled.key.clone(),
        policy: policy_name.to_string(),
        roster: reconciled.roster.clone(),
        subject_count: matrix.len(),
        kappa: KappaResult::from_details(&details, totals),
        preference_strength: preference_strength(&totals),
        reconciliation: reconciled.stats.clone(),
    })
}

/// Runs every group independently. A group that cannot be reconciled or whose
/// matrix is rejected is logged and listed in `skipped`; the rest still run.
pub fn aggregate_all(
    ratings: &[Rating],
    config: &AnalyticsConfig,
    rng: &mut dyn RngCore,
) -> AggregateOutcome {
    let policy = config.policy();
    let mut outcome = AggregateOutcome::default();

    for (key, group) in group_ratings(ratings, config.granularity) {
        match aggregate_questionnaire(&key, &group, policy.as_ref(), rng) {
            Ok(aggregate) => outcome.aggregates.push(aggregate),
            Err(err) => {
                warn!(
                    questionnaire_id = %key.questionnaire_id,
                    dimension_id = %key.dimension_id,
                    error = %err,
                    "skipping group"
                );
                outcome.skipped.push(SkippedGroup {
                    key,
                    reason: err.to_string(),
                });
            }
        }
    }

    info!(
        policy = policy.name(),
        target_raters = policy.target_raters(),
        granularity = config.granularity.as_str(),
        aggregates = outcome.aggregates.len(),
        skipped = outcome.skipped.len(),
        "aggregation complete"
    );

    outcome
}

/// Absolute percentage-point gap between A and B shares, rounded.
pub fn preference_strength(totals: &CategoryTotals) -> u32 {
    let total = totals.total();
    if total == 0 {
        return 0;
    }
    let pct_a = totals.a as f64 * 100.0 / total as f64;
    let pct_b = totals.b as f64 * 100.0 / total as f64;
    (pct_a - pct_b).abs().round() as u32
}
