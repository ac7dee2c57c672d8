//! Fleiss' Kappa over a subject x category count matrix.
//!
//! Cell `[i][j]` holds the number of raters that put subject `i` into category `j`.
//! Every row has to sum to the same rater count `n`; the functions here reject
//! malformed matrices instead of patching them.

use serde::Serialize;

const DEGENERATE_TOLERANCE: f64 = 1e-12;
const HIGH_DISPLAY_FLOOR: f64 = 0.8;
const MODERATE_DISPLAY_FLOOR: f64 = 0.6;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KappaError {
    #[error("rating matrix has no subjects")]
    EmptyMatrix,
    #[error("rating matrix has no categories")]
    NoCategories,
    #[error("subject {subject} has {actual} categories, expected {expected}")]
    RaggedRow {
        subject: usize,
        expected: usize,
        actual: usize,
    },
    #[error("subject {subject} has rater total {actual}, expected {expected}")]
    InconsistentRaterCount {
        subject: usize,
        expected: u64,
        actual: u64,
    },
    #[error("fleiss kappa needs at least 2 raters per subject, found {raters}")]
    TooFewRaters { raters: u64 },
    #[error("category totals overflow at subject {subject}")]
    CountOverflow { subject: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KappaDetails {
    pub kappa: f64,
    pub observed_agreement: f64,
    pub expected_agreement: f64,
    pub category_proportions: Vec<f64>,
    pub category_totals: Vec<u64>,
    pub subjects: usize,
    pub raters: u64,
    pub categories: usize,
}

/// Fine-grained Landis & Koch scale. This is the canonical interpretation; the
/// display scale is derived from it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementLevel {
    Poor,
    Slight,
    Fair,
    Moderate,
    Substantial,
    AlmostPerfect,
}

impl AgreementLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Poor => "poor",
            Self::Slight => "slight",
            Self::Fair => "fair",
            Self::Moderate => "moderate",
            Self::Substantial => "substantial",
            Self::AlmostPerfect => "almost_perfect",
        }
    }

    /// Coarse label for a kappa already placed in this bucket. The display scale
    /// is closed below at 0.6 and 0.8, so the shared boundary values move up one
    /// display step.
    pub fn display(self, kappa: f64) -> DisplayAgreement {
        match self {
            Self::AlmostPerfect => DisplayAgreement::High,
            Self::Substantial if kappa >= HIGH_DISPLAY_FLOOR => DisplayAgreement::High,
            Self::Substantial => DisplayAgreement::Moderate,
            Self::Moderate if kappa >= MODERATE_DISPLAY_FLOOR => DisplayAgreement::Moderate,
            Self::Poor | Self::Slight | Self::Fair | Self::Moderate => DisplayAgreement::Low,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
pub enum DisplayAgreement {
    #[serde(rename = "low agreement")]
    Low,
    #[serde(rename = "moderate agreement")]
    Moderate,
    #[serde(rename = "high agreement")]
    High,
}

impl DisplayAgreement {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low agreement",
            Self::Moderate => "moderate agreement",
            Self::High => "high agreement",
        }
    }
}

pub fn interpret_kappa(kappa: f64) -> AgreementLevel {
    if kappa.is_nan() || kappa < 0.0 {
        AgreementLevel::Poor
    } else if kappa <= 0.2 {
        AgreementLevel::Slight
    } else if kappa <= 0.4 {
        AgreementLevel::Fair
    } else if kappa <= 0.6 {
        AgreementLevel::Moderate
    } else if kappa <= 0.8 {
        AgreementLevel::Substantial
    } else {
        AgreementLevel::AlmostPerfect
    }
}

pub fn display_agreement(kappa: f64) -> DisplayAgreement {
    interpret_kappa(kappa).display(kappa)
}

pub fn fleiss_kappa<R: AsRef<[u32]>>(matrix: &[R]) -> Result<f64, KappaError> {
    fleiss_kappa_detailed(matrix).map(|details| details.kappa)
}

pub fn fleiss_kappa_detailed<R: AsRef<[u32]>>(matrix: &[R]) -> Result<KappaDetails, KappaError> {
    let (categories, raters) = validate_matrix(matrix)?;
    let subjects = matrix.len();
    let pair_count = raters as f64 * (raters - 1) as f64;

    let mut category_totals = vec![0_u64; categories];
    let mut observed_sum = 0.0_f64;
    for (subject, row) in matrix.iter().enumerate() {
        let mut squares = 0_u128;
        for (index, &count) in row.as_ref().iter().enumerate() {
            let count = u64::from(count);
            squares += u128::from(count) * u128::from(count);
            category_totals[index] = category_totals[index]
                .checked_add(count)
                .ok_or(KappaError::CountOverflow { subject })?;
        }
        observed_sum += (squares - u128::from(raters)) as f64 / pair_count;
    }

    let observed_agreement = observed_sum / subjects as f64;
    let assignments = subjects as f64 * raters as f64;
    let category_proportions = category_totals
        .iter()
        .map(|&total| total as f64 / assignments)
        .collect::<Vec<_>>();
    let expected_agreement = category_proportions
        .iter()
        .map(|proportion| proportion * proportion)
        .sum::<f64>();

    let kappa = if (1.0 - expected_agreement).abs() <= DEGENERATE_TOLERANCE {
        1.0
    } else {
        (observed_agreement - expected_agreement) / (1.0 - expected_agreement)
    };

    Ok(KappaDetails {
        kappa: kappa.clamp(-1.0, 1.0),
        observed_agreement,
        expected_agreement,
        category_proportions,
        category_totals,
        subjects,
        raters,
        categories,
    })
}

fn validate_matrix<R: AsRef<[u32]>>(matrix: &[R]) -> Result<(usize, u64), KappaError> {
    let first = matrix.first().ok_or(KappaError::EmptyMatrix)?.as_ref();
    let categories = first.len();
    if categories == 0 {
        return Err(KappaError::NoCategories);
    }
    let raters = row_sum(first);

    for (subject, row) in matrix.iter().enumerate() {
        let row = row.as_ref();
        if row.len() != categories {
            return Err(KappaError::RaggedRow {
                subject,
                expected: categories,
                actual: row.len(),
            });
        }
        let actual = row_sum(row);
        if actual != raters {
            return Err(KappaError::InconsistentRaterCount {
                subject,
                expected: raters,
                actual,
            });
        }
    }

    if raters < 2 {
        return Err(KappaError::TooFewRaters { raters });
    }

    Ok((categories, raters))
}

fn row_sum(row: &[u32]) -> u64 {
    row.iter().map(|&count| u64::from(count)).sum()
}
