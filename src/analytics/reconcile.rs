use super::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyntheticRater {
    pub rater_id: String,
    pub cloned_from: String,
}

/// What a policy changed to reach the fixed rater count. A non-empty record means
/// part of the reported agreement is manufactured, not observed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationStats {
    pub observed_raters: usize,
    pub sampled_out_raters: Vec<String>,
    pub synthetic_raters: Vec<SyntheticRater>,
    pub cloned_judgments: usize,
    pub filled_judgments: usize,
    pub dropped_subjects: usize,
}

impl ReconciliationStats {
    pub fn is_synthetic(&self) -> bool {
        !self.synthetic_raters.is_empty() || self.cloned_judgments > 0 || self.filled_judgments > 0
    }
}

/// A group after reconciliation: every subject holds exactly one judgment per
/// roster rater, aligned with `roster`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledGroup {
    pub key: GroupKey,
    pub roster: Vec<String>,
    pub subjects: BTreeMap<SubjectKey, Vec<Winner>>,
    pub stats: ReconciliationStats,
}

impl ReconciledGroup {
    /// Rows follow subject key order, columns are `[A, B, tie]`.
    pub fn matrix(&self) -> Vec<[u32; 3]> {
        self.subjects
            .values()
            .map(|judgments| {
                let mut row = [0_u32; 3];
                for winner in judgments {
                    row[winner.index()] += 1;
                }
                row
            })
            .collect()
    }

    pub fn category_totals(&self) -> CategoryTotals {
        CategoryTotals::from_winners(self.subjects.values().flatten().copied())
    }

    pub fn to_ratings(&self) -> Vec<Rating> {
        let mut ratings = Vec::with_capacity(self.subjects.len() * self.roster.len());
        for (subject, judgments) in &self.subjects {
            for (annotator_id, winner) in self.roster.iter().zip(judgments) {
                ratings.push(Rating {
                    questionnaire_id: self.key.questionnaire_id.clone(),
                    question_id: subject.question_id.clone(),
                    dimension_id: subject.dimension_id.clone(),
                    annotator_id: annotator_id.clone(),
                    winner: *winner,
                });
            }
        }
        ratings
    }
}

/// Strategy that turns a group's irregular ratings into a fixed-shape rater set.
pub trait ReconciliationPolicy {
    fn name(&self) -> &'static str;

    fn target_raters(&self) -> usize;

    fn reconcile(
        &self,
        key: &GroupKey,
        ratings: &[Rating],
        rng: &mut dyn RngCore,
    ) -> Result<ReconciledGroup, AggregateError>;
}

/// Reaches the target rater count by sampling surplus raters away and cloning
/// existing raters when too few took part. Subjects a roster rater skipped get
/// the judgment of the subject's first record.
///
/// Cloning inflates agreement on sparse data. Every synthetic identity and
/// judgment is logged and counted in [`ReconciliationStats`].
#[derive(Debug, Clone)]
pub struct CloneRaters {
    target_raters: usize,
}

impl CloneRaters {
    pub fn new(target_raters: usize) -> Self {
        Self { target_raters }
    }
}

impl ReconciliationPolicy for CloneRaters {
    fn name(&self) -> &'static str {
        "clone_raters"
    }

    fn target_raters(&self) -> usize {
        self.target_raters
    }

    fn reconcile(
        &self,
        key: &GroupKey,
        ratings: &[Rating],
        rng: &mut dyn RngCore,
    ) -> Result<ReconciledGroup, AggregateError> {
        let observed = distinct_raters(ratings);
        if observed.is_empty() {
            return Err(AggregateError::NoRaters {
                questionnaire_id: key.questionnaire_id.clone(),
            });
        }

        let mut stats = ReconciliationStats {
            observed_raters: observed.len(),
            ..ReconciliationStats::default()
        };
        let (mut roster, sampled_out) = sample_roster(key, &observed, self.target_raters, rng);
        stats.sampled_out_raters = sampled_out;

        let real_raters = roster.clone();
        let mut clone_sources = HashMap::<String, String>::new();
        let mut copy_seq = 1_usize;
        while roster.len() < self.target_raters {
            let source = &real_raters[(roster.len() - real_raters.len()) % real_raters.len()];
            let mut rater_id = format!("{source}_copy_{copy_seq}");
            while observed.contains(&rater_id) || roster.contains(&rater_id) {
                copy_seq += 1;
                rater_id = format!("{source}_copy_{copy_seq}");
            }
            copy_seq += 1;

            clone_sources.insert(rater_id.clone(), source.clone());
            stats.synthetic_raters.push(SyntheticRater {
                rater_id: rater_id.clone(),
                cloned_from: source.clone(),
            });
            roster.push(rater_id);
        }

        if !stats.synthetic_raters.is_empty() {
            warn!(
                questionnaire_id = %key.questionnaire_id,
                dimension_id = %key.dimension_id,
                observed_raters = observed.len(),
                target_raters = self.target_raters,
                synthetic_raters = stats.synthetic_raters.len(),
                "cloned rater identities to reach target rater count"
            );
        }

        let mut subjects = BTreeMap::<SubjectKey, Vec<Winner>>::new();
        for (subject, records) in group_subjects(ratings) {
            let judgments = roster
                .iter()
                .map(|rater_id| {
                    if let Some(winner) = judgment_of(&records, rater_id) {
                        return winner;
                    }
                    if let Some(winner) = clone_sources
                        .get(rater_id)
                        .and_then(|source| judgment_of(&records, source))
                    {
                        stats.cloned_judgments += 1;
                        return winner;
                    }
                    stats.filled_judgments += 1;
                    first_judgment(&records, &real_raters)
                })
                .collect();
            subjects.insert(subject, judgments);
        }

        if stats.filled_judgments > 0 {
            info!(
                questionnaire_id = %key.questionnaire_id,
                dimension_id = %key.dimension_id,
                filled_judgments = stats.filled_judgments,
                subjects = subjects.len(),
                "filled missing judgments from each subject's first record"
            );
        }

        Ok(ReconciledGroup {
            key: key.clone(),
            roster,
            subjects,
            stats,
        })
    }
}

/// Never fabricates judgments: groups short of the target are rejected and
/// subjects missing any roster rater are dropped.
#[derive(Debug, Clone)]
pub struct DropIncompleteSubjects {
    target_raters: usize,
}

impl DropIncompleteSubjects {
    pub fn new(target_raters: usize) -> Self {
        Self { target_raters }
    }
}

impl ReconciliationPolicy for DropIncompleteSubjects {
    fn name(&self) -> &'static str {
        "drop_incomplete_subjects"
    }

    fn target_raters(&self) -> usize {
        self.target_raters
    }

    fn reconcile(
        &self,
        key: &GroupKey,
        ratings: &[Rating],
        rng: &mut dyn RngCore,
    ) -> Result<ReconciledGroup, AggregateError> {
        let observed = distinct_raters(ratings);
        if observed.is_empty() {
            return Err(AggregateError::NoRaters {
                questionnaire_id: key.questionnaire_id.clone(),
            });
        }
        if observed.len() < self.target_raters {
            return Err(AggregateError::InsufficientRaters {
                questionnaire_id: key.questionnaire_id.clone(),
                found: observed.len(),
                target: self.target_raters,
            });
        }

        let (roster, sampled_out) = sample_roster(key, &observed, self.target_raters, rng);
        let mut stats = ReconciliationStats {
            observed_raters: observed.len(),
            sampled_out_raters: sampled_out,
            ..ReconciliationStats::default()
        };

        let mut subjects = BTreeMap::<SubjectKey, Vec<Winner>>::new();
        for (subject, records) in group_subjects(ratings) {
            let judgments = roster
                .iter()
                .map(|rater_id| judgment_of(&records, rater_id))
                .collect::<Option<Vec<_>>>();
            match judgments {
                Some(judgments) => {
                    subjects.insert(subject, judgments);
                }
                None => stats.dropped_subjects += 1,
            }
        }

        if stats.dropped_subjects > 0 {
            info!(
                questionnaire_id = %key.questionnaire_id,
                dimension_id = %key.dimension_id,
                dropped_subjects = stats.dropped_subjects,
                kept_subjects = subjects.len(),
                "dropped subjects missing a roster rater"
            );
        }
        if subjects.is_empty() {
            return Err(AggregateError::NoSubjects {
                questionnaire_id: key.questionnaire_id.clone(),
            });
        }

        Ok(ReconciledGroup {
            key: key.clone(),
            roster,
            subjects,
            stats,
        })
    }
}

/// Picks `target` raters uniformly without replacement when more took part.
/// Returns `(roster, sampled_out)`, both sorted.
pub fn sample_roster(
    key: &GroupKey,
    observed: &[String],
    target: usize,
    rng: &mut dyn RngCore,
) -> (Vec<String>, Vec<String>) {
    if observed.len() <= target {
        return (observed.to_vec(), Vec::new());
    }

    let mut roster = observed
        .choose_multiple(rng, target)
        .cloned()
        .collect::<Vec<_>>();
    roster.sort();
    let sampled_out = observed
        .iter()
        .filter(|rater_id| !roster.contains(*rater_id))
        .cloned()
        .collect::<Vec<_>>();

    info!(
        questionnaire_id = %key.questionnaire_id,
        dimension_id = %key.dimension_id,
        observed_raters = observed.len(),
        target_raters = target,
        sampled_out = ?sampled_out,
        "sampled rater roster down to target rater count"
    );

    (roster, sampled_out)
}

fn judgment_of(records: &[(String, Winner)], rater_id: &str) -> Option<Winner> {
    records
        .iter()
        .find(|(annotator_id, _)| annotator_id == rater_id)
        .map(|(_, winner)| *winner)
}

fn first_judgment(records: &[(String, Winner)], roster: &[String]) -> Winner {
    records
        .iter()
        .find(|(annotator_id, _)| roster.contains(annotator_id))
        .or_else(|| records.first())
        .map(|(_, winner)| *winner)
        .unwrap_or(Winner::Tie)
}
