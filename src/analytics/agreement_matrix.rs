use super::*;

/// How often two dimensions picked the same winner on the same submission.
/// This is a co-occurrence rate, not a correlation coefficient and not kappa.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionAgreementMatrix {
    pub dimensions: Vec<String>,
    pub rates: Vec<Vec<f64>>,
    pub co_evaluated: Vec<Vec<usize>>,
}

impl DimensionAgreementMatrix {
    pub fn rate(&self, left: &str, right: &str) -> Option<f64> {
        let row = self.dimensions.iter().position(|id| id == left)?;
        let column = self.dimensions.iter().position(|id| id == right)?;
        Some(self.rates[row][column])
    }
}

/// Diagonal is 1 by definition; pairs never evaluated together are 0.
pub fn dimension_agreement_matrix(
    dimension_ids: &[String],
    submissions: &[Submission],
) -> DimensionAgreementMatrix {
    let size = dimension_ids.len();
    let mut rates = vec![vec![0.0_f64; size]; size];
    let mut co_evaluated = vec![vec![0_usize; size]; size];

    let winners = submissions
        .iter()
        .map(|submission| {
            dimension_ids
                .iter()
                .map(|dimension_id| {
                    submission
                        .evaluation(dimension_id)
                        .and_then(|evaluation| evaluation.parsed_winner())
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    for row in 0..size {
        for column in 0..size {
            if row == column {
                rates[row][column] = 1.0;
                co_evaluated[row][column] = winners.iter().filter(|w| w[row].is_some()).count();
                continue;
            }

            let mut both = 0_usize;
            let mut matched = 0_usize;
            for submission_winners in &winners {
                let pair = (submission_winners[row], submission_winners[column]);
                if let (Some(left), Some(right)) = pair {
                    both += 1;
                    if left == right {
                        matched += 1;
                    }
                }
            }
            co_evaluated[row][column] = both;
            if both > 0 {
                rates[row][column] = matched as f64 / both as f64;
            }
        }
    }

    DimensionAgreementMatrix {
        dimensions: dimension_ids.to_vec(),
        rates,
        co_evaluated,
    }
}
