use super::*;

type RatingSlot = (String, String, String, String);

/// Flattens submissions into ratings.
///
/// Evaluations without a recognized winner are dropped. When an annotator rated
/// the same subject more than once, the latest `submitted_at` wins (input order
/// breaks ties) and the rating keeps the position of its first appearance.
pub fn ratings_from_submissions(submissions: &[Submission]) -> Vec<Rating> {
    let mut slots = HashMap::<RatingSlot, usize>::new();
    let mut out = Vec::<(DateTime<Utc>, Rating)>::new();
    let mut discarded = 0_usize;
    let mut superseded = 0_usize;

    for submission in submissions {
        for evaluation in &submission.dimension_evaluations {
            let Some(winner) = evaluation.parsed_winner() else {
                discarded += 1;
                continue;
            };

            let rating = Rating {
                questionnaire_id: submission.questionnaire_id.clone(),
                question_id: submission.question_id.clone(),
                dimension_id: evaluation.dimension_id.clone(),
                annotator_id: submission.annotator_id.clone(),
                winner,
            };
            let slot = (
                rating.questionnaire_id.clone(),
                rating.question_id.clone(),
                rating.dimension_id.clone(),
                rating.annotator_id.clone(),
            );

            match slots.get(&slot) {
                Some(&index) => {
                    superseded += 1;
                    if submission.submitted_at >= out[index].0 {
                        out[index] = (submission.submitted_at, rating);
                    }
                }
                None => {
                    slots.insert(slot, out.len());
                    out.push((submission.submitted_at, rating));
                }
            }
        }
    }

    if discarded > 0 || superseded > 0 {
        debug!(
            discarded_evaluations = discarded,
            superseded_ratings = superseded,
            kept_ratings = out.len(),
            "normalized submission evaluations into ratings"
        );
    }

    out.into_iter().map(|(_, rating)| rating).collect()
}

/// Partitions ratings into independent kappa groups. Ratings never cross
/// questionnaires; at dimension granularity they never cross dimensions either.
pub fn group_ratings(
    ratings: &[Rating],
    granularity: Granularity,
) -> BTreeMap<GroupKey, Vec<Rating>> {
    let mut groups = BTreeMap::<GroupKey, Vec<Rating>>::new();
    for rating in ratings {
        let key = match granularity {
            Granularity::Questionnaire => GroupKey::overall(rating.questionnaire_id.clone()),
            Granularity::Dimension => GroupKey {
                questionnaire_id: rating.questionnaire_id.clone(),
                dimension_id: rating.dimension_id.clone(),
            },
        };
        groups.entry(key).or_default().push(rating.clone());
    }
    groups
}

/// Per-subject records in input order, as `(annotator_id, winner)` pairs.
pub fn group_subjects(ratings: &[Rating]) -> BTreeMap<SubjectKey, Vec<(String, Winner)>> {
    let mut subjects = BTreeMap::<SubjectKey, Vec<(String, Winner)>>::new();
    for rating in ratings {
        subjects
            .entry(rating.subject_key())
            .or_default()
            .push((rating.annotator_id.clone(), rating.winner));
    }
    subjects
}

pub fn distinct_raters(ratings: &[Rating]) -> Vec<String> {
    ratings
        .iter()
        .map(|rating| rating.annotator_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
