use chrono::TimeZone;
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::*;
use crate::kappa::fleiss_kappa;
use crate::model::DimensionEvaluation;

fn rating(
    questionnaire: &str,
    question: &str,
    dimension: &str,
    annotator: &str,
    winner: Winner,
) -> Rating {
    Rating {
        questionnaire_id: questionnaire.to_string(),
        question_id: question.to_string(),
        dimension_id: dimension.to_string(),
        annotator_id: annotator.to_string(),
        winner,
    }
}

fn submission(
    questionnaire: &str,
    question: &str,
    annotator: &str,
    minute: u32,
    evaluations: &[(&str, &str, Option<&str>)],
) -> Submission {
    Submission {
        submission_id: None,
        questionnaire_id: questionnaire.to_string(),
        question_id: question.to_string(),
        annotator_id: annotator.to_string(),
        submitted_at: Utc
            .with_ymd_and_hms(2026, 3, 1, 12, minute, 0)
            .single()
            .expect("valid timestamp"),
        dimension_evaluations: evaluations
            .iter()
            .map(|(dimension, winner, notes)| DimensionEvaluation {
                dimension_id: dimension.to_string(),
                winner: winner.to_string(),
                notes: notes.map(str::to_string),
            })
            .collect(),
    }
}

fn seeded() -> StdRng {
    StdRng::seed_from_u64(7)
}

fn row_sums(matrix: &[[u32; 3]]) -> Vec<u32> {
    matrix.iter().map(|row| row.iter().sum()).collect()
}

#[test]
fn unanimous_subjects_aggregate_to_perfect_agreement() {
    let ratings = vec![
        rating("q1", "s1", "overall", "r1", Winner::A),
        rating("q1", "s1", "overall", "r2", Winner::A),
        rating("q1", "s1", "overall", "r3", Winner::A),
        rating("q1", "s2", "overall", "r1", Winner::B),
        rating("q1", "s2", "overall", "r2", Winner::B),
        rating("q1", "s2", "overall", "r3", Winner::B),
    ];
    let key = GroupKey::overall("q1");
    let policy = CloneRaters::new(DEFAULT_TARGET_RATERS);

    let reconciled = policy
        .reconcile(&key, &ratings, &mut seeded())
        .expect("three raters reconcile");
    assert_eq!(reconciled.matrix(), vec![[3, 0, 0], [0, 3, 0]]);

    let aggregate =
        aggregate_questionnaire(&key, &ratings, &policy, &mut seeded()).expect("aggregate");
    assert!((aggregate.kappa.kappa - 1.0).abs() < 1e-9);
    assert_eq!(aggregate.kappa.interpretation, AgreementLevel::AlmostPerfect);
    assert_eq!(aggregate.kappa.display, DisplayAgreement::High);
    assert_eq!(aggregate.subject_count, 2);
    assert_eq!(aggregate.roster, vec!["r1", "r2", "r3"]);
    assert_eq!(aggregate.preference_strength, 0);
    assert!(!aggregate.reconciliation.is_synthetic());
}

#[test]
fn evenly_split_subjects_aggregate_to_low_agreement() {
    let mut ratings = Vec::new();
    for subject in ["s1", "s2", "s3"] {
        ratings.push(rating("q1", subject, "overall", "r1", Winner::A));
        ratings.push(rating("q1", subject, "overall", "r2", Winner::B));
        ratings.push(rating("q1", subject, "overall", "r3", Winner::Tie));
    }

    let aggregate = aggregate_questionnaire(
        &GroupKey::overall("q1"),
        &ratings,
        &CloneRaters::new(3),
        &mut seeded(),
    )
    .expect("aggregate");

    assert!(aggregate.kappa.kappa <= 0.0);
    assert_eq!(aggregate.kappa.interpretation, AgreementLevel::Poor);
    assert_eq!(aggregate.kappa.display, DisplayAgreement::Low);
    assert_eq!(aggregate.kappa.categories, CategoryTotals { a: 3, b: 3, tie: 3 });
}

#[test]
fn two_raters_are_padded_with_one_cloned_identity() {
    let ratings = vec![
        rating("q1", "s1", "overall", "r1", Winner::A),
        rating("q1", "s1", "overall", "r2", Winner::A),
        rating("q1", "s2", "overall", "r1", Winner::A),
        rating("q1", "s2", "overall", "r2", Winner::B),
    ];

    let reconciled = CloneRaters::new(3)
        .reconcile(&GroupKey::overall("q1"), &ratings, &mut seeded())
        .expect("reconcile");

    assert_eq!(reconciled.roster, vec!["r1", "r2", "r1_copy_1"]);
    assert_eq!(
        reconciled.stats.synthetic_raters,
        vec![SyntheticRater {
            rater_id: "r1_copy_1".to_string(),
            cloned_from: "r1".to_string(),
        }]
    );
    assert_eq!(reconciled.stats.cloned_judgments, 2);
    assert_eq!(reconciled.stats.filled_judgments, 0);

    let matrix = reconciled.matrix();
    assert_eq!(matrix, vec![[3, 0, 0], [2, 1, 0]]);
    assert!(row_sums(&matrix).iter().all(|sum| *sum == 3));
    assert!(fleiss_kappa(&matrix).is_ok());
}

#[test]
fn missing_judgments_copy_the_subject_first_record() {
    let ratings = vec![
        rating("q1", "s1", "overall", "r1", Winner::A),
        rating("q1", "s1", "overall", "r2", Winner::B),
        rating("q1", "s1", "overall", "r3", Winner::B),
        rating("q1", "s2", "overall", "r2", Winner::Tie),
        rating("q1", "s2", "overall", "r3", Winner::B),
    ];

    let reconciled = CloneRaters::new(3)
        .reconcile(&GroupKey::overall("q1"), &ratings, &mut seeded())
        .expect("reconcile");

    assert_eq!(reconciled.stats.filled_judgments, 1);
    assert!(reconciled.stats.synthetic_raters.is_empty());
    // s2 lacked r1; r2's tie is the subject's first record.
    assert_eq!(reconciled.matrix(), vec![[1, 2, 0], [0, 1, 2]]);
}

#[test]
fn surplus_raters_are_sampled_reproducibly_with_a_seed() {
    let mut ratings = Vec::new();
    for annotator in ["r1", "r2", "r3", "r4", "r5"] {
        ratings.push(rating("q1", "s1", "overall", annotator, Winner::A));
        ratings.push(rating("q1", "s2", "overall", annotator, Winner::B));
    }
    let policy = CloneRaters::new(3);
    let key = GroupKey::overall("q1");

    let first = policy
        .reconcile(&key, &ratings, &mut StdRng::seed_from_u64(42))
        .expect("reconcile");
    let second = policy
        .reconcile(&key, &ratings, &mut StdRng::seed_from_u64(42))
        .expect("reconcile");

    assert_eq!(first, second);
    assert_eq!(first.roster.len(), 3);
    assert_eq!(first.stats.sampled_out_raters.len(), 2);
    assert_eq!(first.stats.observed_raters, 5);
    for rater in &first.stats.sampled_out_raters {
        assert!(!first.roster.contains(rater));
    }
    assert!(row_sums(&first.matrix()).iter().all(|sum| *sum == 3));
}

#[test]
fn reconciling_a_reconciled_group_is_a_no_op() {
    let ratings = vec![
        rating("q1", "s1", "overall", "r1", Winner::A),
        rating("q1", "s1", "overall", "r2", Winner::B),
        rating("q1", "s2", "overall", "r2", Winner::Tie),
        rating("q1", "s3", "overall", "r1", Winner::B),
    ];
    let policy = CloneRaters::new(3);
    let key = GroupKey::overall("q1");

    let once = policy
        .reconcile(&key, &ratings, &mut seeded())
        .expect("reconcile");
    let twice = policy
        .reconcile(&key, &once.to_ratings(), &mut seeded())
        .expect("reconcile again");

    assert_eq!(once.matrix(), twice.matrix());
    assert!(!twice.stats.is_synthetic());
    assert!(twice.stats.sampled_out_raters.is_empty());
}

#[test]
fn zero_rater_groups_are_rejected_by_both_policies() {
    let key = GroupKey::overall("empty");
    let err = CloneRaters::new(3)
        .reconcile(&key, &[], &mut seeded())
        .expect_err("no raters");
    assert_eq!(
        err,
        AggregateError::NoRaters {
            questionnaire_id: "empty".to_string()
        }
    );
    assert!(
        DropIncompleteSubjects::new(3)
            .reconcile(&key, &[], &mut seeded())
            .is_err()
    );
}

#[test]
fn drop_incomplete_policy_never_synthesizes() {
    let ratings = vec![
        rating("q1", "s1", "overall", "r1", Winner::A),
        rating("q1", "s1", "overall", "r2", Winner::A),
        rating("q1", "s1", "overall", "r3", Winner::B),
        rating("q1", "s2", "overall", "r1", Winner::B),
        rating("q1", "s2", "overall", "r2", Winner::B),
    ];
    let key = GroupKey::overall("q1");

    let reconciled = DropIncompleteSubjects::new(3)
        .reconcile(&key, &ratings, &mut seeded())
        .expect("reconcile");
    assert_eq!(reconciled.matrix(), vec![[2, 1, 0]]);
    assert_eq!(reconciled.stats.dropped_subjects, 1);
    assert!(!reconciled.stats.is_synthetic());

    let sparse = &ratings[..2];
    let err = DropIncompleteSubjects::new(3)
        .reconcile(&key, sparse, &mut seeded())
        .expect_err("two raters are not enough");
    assert_eq!(
        err,
        AggregateError::InsufficientRaters {
            questionnaire_id: "q1".to_string(),
            found: 2,
            target: 3,
        }
    );
}

#[test]
fn preference_strength_ignores_label_orientation() {
    let ratings = vec![
        rating("q1", "s1", "overall", "r1", Winner::A),
        rating("q1", "s1", "overall", "r2", Winner::A),
        rating("q1", "s1", "overall", "r3", Winner::B),
        rating("q1", "s2", "overall", "r1", Winner::A),
        rating("q1", "s2", "overall", "r2", Winner::Tie),
        rating("q1", "s2", "overall", "r3", Winner::A),
    ];
    let totals = CategoryTotals::from_winners(ratings.iter().map(|r| r.winner));
    let swapped = CategoryTotals::from_winners(ratings.iter().map(|r| r.winner.swapped()));

    // A = 4/6, B = 1/6
    assert_eq!(preference_strength(&totals), 50);
    assert_eq!(preference_strength(&totals), preference_strength(&swapped));
    assert_eq!(preference_strength(&CategoryTotals::default()), 0);
}

#[test]
fn preference_strength_uses_reconciled_ratings() {
    let ratings = vec![
        rating("q1", "s1", "overall", "r1", Winner::A),
        rating("q1", "s1", "overall", "r2", Winner::B),
    ];
    let aggregate = aggregate_questionnaire(
        &GroupKey::overall("q1"),
        &ratings,
        &CloneRaters::new(3),
        &mut seeded(),
    )
    .expect("aggregate");

    // r1 is cloned, so the reconciled set is A, B, A.
    assert_eq!(aggregate.kappa.categories, CategoryTotals { a: 2, b: 1, tie: 0 });
    assert_eq!(aggregate.preference_strength, 33);
}

#[test]
fn aggregate_all_keeps_questionnaires_apart_and_reports_skips() {
    let ratings = vec![
        rating("q1", "s1", "overall", "r1", Winner::A),
        rating("q1", "s1", "overall", "r2", Winner::A),
        rating("q1", "s1", "overall", "r3", Winner::A),
        rating("q1", "s2", "overall", "r1", Winner::B),
        rating("q1", "s2", "overall", "r2", Winner::B),
        rating("q1", "s2", "overall", "r3", Winner::B),
        rating("q2", "s1", "overall", "x1", Winner::A),
    ];
    let config = AnalyticsConfig {
        policy: PolicyKind::DropIncompleteSubjects,
        ..AnalyticsConfig::default()
    };

    let outcome = aggregate_all(&ratings, &config, &mut seeded());
    assert_eq!(outcome.aggregates.len(), 1);
    assert_eq!(outcome.aggregates[0].key, GroupKey::overall("q1"));
    assert_eq!(outcome.aggregates[0].kappa.raters, 3);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].key.questionnaire_id, "q2");

    let empty = aggregate_all(&[], &AnalyticsConfig::default(), &mut seeded());
    assert!(empty.aggregates.is_empty());
    assert!(empty.skipped.is_empty());
}

#[test]
fn kappa_rejections_are_skipped_per_group() {
    let ratings = vec![
        rating("q1", "s1", "overall", "r1", Winner::A),
        rating("q1", "s1", "overall", "r2", Winner::A),
        rating("q2", "s1", "overall", "x1", Winner::B),
        rating("q2", "s1", "overall", "x2", Winner::A),
    ];
    let config = AnalyticsConfig {
        target_raters: 1,
        ..AnalyticsConfig::default()
    };

    let outcome = aggregate_all(&ratings, &config, &mut seeded());
    assert!(outcome.aggregates.is_empty());
    assert_eq!(outcome.skipped.len(), 2);
    for skipped in &outcome.skipped {
        assert!(
            skipped.reason.contains("at least 2 raters"),
            "unexpected reason {}",
            skipped.reason
        );
    }

    let err = aggregate_questionnaire(
        &GroupKey::overall("q1"),
        &ratings[..2],
        &CloneRaters::new(1),
        &mut seeded(),
    )
    .expect_err("one rater per subject");
    assert!(matches!(
        err,
        AggregateError::Kappa {
            source: KappaError::TooFewRaters { raters: 1 },
            ..
        }
    ));

    let healthy = aggregate_all(&ratings, &AnalyticsConfig::default(), &mut seeded());
    assert_eq!(healthy.aggregates.len(), 2);
    assert!(healthy.skipped.is_empty());
}

#[test]
fn target_rater_count_is_bounded_both_ways() {
    let config = |target_raters| AnalyticsConfig {
        target_raters,
        ..AnalyticsConfig::default()
    };
    assert!(config(1).validate().is_err());
    assert!(config(2).validate().is_ok());
    assert!(config(MAX_TARGET_RATERS).validate().is_ok());
    let err = config(MAX_TARGET_RATERS + 1).validate().expect_err("too many raters");
    assert!(err.to_string().contains("at most"));
}

#[test]
fn dimension_granularity_splits_each_questionnaire_by_dimension() {
    let mut ratings = Vec::new();
    for annotator in ["r1", "r2", "r3"] {
        ratings.push(rating("q1", "s1", "layout", annotator, Winner::A));
        ratings.push(rating("q1", "s1", "content", annotator, Winner::B));
    }
    let config = AnalyticsConfig {
        granularity: Granularity::Dimension,
        ..AnalyticsConfig::default()
    };

    let outcome = aggregate_all(&ratings, &config, &mut seeded());
    let dimensions = outcome
        .aggregates
        .iter()
        .map(|aggregate| aggregate.key.dimension_id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(dimensions, vec!["content", "layout"]);
    assert!(outcome.aggregates.iter().all(|a| a.subject_count == 1));
}

#[test]
fn ratings_drop_invalid_winners_and_keep_latest_resubmission() {
    let submissions = vec![
        submission("q1", "s1", "r1", 0, &[("layout", "A", None), ("content", "", None)]),
        submission("q1", "s1", "r2", 1, &[("layout", "maybe", None)]),
        submission("q1", "s1", "r1", 5, &[("layout", "B", None)]),
        submission("q1", "s1", "r3", 2, &[("layout", "tie", None)]),
    ];

    let ratings = ratings_from_submissions(&submissions);
    assert_eq!(
        ratings,
        vec![
            rating("q1", "s1", "layout", "r1", Winner::B),
            rating("q1", "s1", "layout", "r3", Winner::Tie),
        ]
    );
}

#[test]
fn older_resubmission_does_not_override_newer_rating() {
    let submissions = vec![
        submission("q1", "s1", "r1", 9, &[("layout", "A", None)]),
        submission("q1", "s1", "r1", 3, &[("layout", "B", None)]),
    ];
    let ratings = ratings_from_submissions(&submissions);
    assert_eq!(ratings, vec![rating("q1", "s1", "layout", "r1", Winner::A)]);
}

#[test]
fn dimension_tally_reports_rounded_percentages() {
    let mut submissions = Vec::new();
    let winners = ["A", "A", "A", "A", "A", "A", "B", "B", "B", "tie"];
    for (index, winner) in winners.iter().enumerate() {
        submissions.push(submission(
            "q1",
            &format!("s{index}"),
            "r1",
            index as u32,
            &[("layout", *winner, None)],
        ));
    }
    submissions.push(submission("q1", "s99", "r1", 30, &[("content", "A", None)]));

    let analysis = analyze_dimension("layout", &submissions);
    assert_eq!(analysis.evaluations, 10);
    assert_eq!(
        analysis.winner_percentages,
        WinnerPercentages {
            a: 60,
            b: 30,
            tie: 10,
            empty: 0,
        }
    );
    assert_eq!(analysis.notes, NoteSummary::default());
}

#[test]
fn dimension_tally_counts_empty_winners_and_summarizes_notes() {
    let submissions = vec![
        submission("q1", "s1", "r1", 0, &[("layout", "A", Some("Cleaner layout, better spacing"))]),
        submission("q1", "s2", "r1", 1, &[("layout", "", Some("  "))]),
        submission("q1", "s3", "r1", 2, &[("layout", "B", Some("Layout feels cramped"))]),
    ];

    let analysis = analyze_dimension("layout", &submissions);
    assert_eq!(analysis.winner_counts.empty, 1);
    assert_eq!(analysis.winner_percentages.a, 33);
    assert_eq!(analysis.winner_percentages.empty, 33);
    assert_eq!(analysis.notes.notes_count, 2);
    assert!((analysis.notes.average_length - 25.0).abs() < 1e-9);
    assert_eq!(analysis.notes.keywords[0].word, "layout");
    assert_eq!(analysis.notes.keywords[0].count, 2);
    assert!(analysis.notes.keywords.len() <= 5);
    assert!(analysis.notes.keywords.iter().all(|k| k.word.chars().count() > 3));

    let missing = analyze_dimension("unknown", &submissions);
    assert_eq!(missing.evaluations, 0);
    assert_eq!(missing.winner_percentages, WinnerPercentages::default());
}

#[test]
fn agreement_matrix_counts_only_co_evaluated_submissions() {
    let submissions = vec![
        submission("q1", "s1", "r1", 0, &[("layout", "A", None), ("content", "A", None)]),
        submission("q1", "s2", "r1", 1, &[("layout", "B", None), ("content", "A", None)]),
        submission("q1", "s3", "r1", 2, &[("layout", "tie", None), ("content", "", None)]),
        submission("q1", "s4", "r1", 3, &[("speed", "A", None)]),
    ];
    let dimensions = dimension_ids(&submissions);
    assert_eq!(dimensions, vec!["content", "layout", "speed"]);

    let matrix = dimension_agreement_matrix(&dimensions, &submissions);
    assert_eq!(matrix.rate("layout", "layout"), Some(1.0));
    assert_eq!(matrix.rate("layout", "content"), Some(0.5));
    assert_eq!(matrix.rate("content", "layout"), Some(0.5));
    assert_eq!(matrix.rate("layout", "speed"), Some(0.0));
    assert_eq!(matrix.rate("layout", "missing"), None);
    assert_eq!(matrix.co_evaluated[1][0], 2);
}

#[test]
fn report_exposes_dashboard_contract() {
    let mut submissions = Vec::new();
    for (index, annotator) in ["r1", "r2", "r3"].iter().enumerate() {
        submissions.push(submission(
            "q1",
            "s1",
            annotator,
            index as u32,
            &[("layout", "A", None), ("content", "B", None)],
        ));
    }

    let report = build_report(
        &submissions,
        &[],
        &AnalyticsConfig::default(),
        7,
        "2026-03-01T12:00:00Z".to_string(),
        &mut seeded(),
    );

    assert_eq!(report.ratings, 6);
    assert_eq!(report.agreement.len(), 1);
    let record = &report.agreement[0];
    assert_eq!(record.dimension_id, QUESTIONNAIRE_OVERALL);
    assert_eq!(record.fleiss_kappa, record.avg_kappa_per_question);
    assert_eq!(record.question_kappa_scores.len(), 1);
    assert_eq!(report.settings.policy, "clone_raters");
    assert_eq!(report.dimensions.len(), 2);

    let json = serde_json::to_value(&report).expect("report serializes");
    let record_json = &json["agreement"][0];
    assert_eq!(record_json["dimensionId"], "questionnaire_overall");
    assert_eq!(record_json["kappaInterpretation"], "almost_perfect");
    assert_eq!(record_json["agreementLabel"], "high agreement");
    assert_eq!(record_json["preferenceStrength"], 0);
    assert_eq!(record_json["questionKappaScores"][0]["categories"]["A"], 3);
    assert_eq!(json["dimensions"][1]["winnerPercentages"]["A"], 100);
}
