//! Rating aggregation: turns raw submissions into reconciled rating matrices,
//! per-questionnaire kappa aggregates, per-dimension tallies and the pairwise
//! dimension agreement matrix.
//!
//! Everything in here is a pure transform over an in-memory snapshot. The only
//! source of non-determinism is roster sampling, which always goes through the
//! `RngCore` handed in by the caller.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::LazyLock;

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use rand::RngCore;
use rand::seq::SliceRandom;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::kappa::{
    AgreementLevel, DisplayAgreement, KappaDetails, KappaError, fleiss_kappa_detailed,
    interpret_kappa,
};
use crate::model::{Submission, Winner};

mod agreement_matrix;
mod dimensions;
mod grouping;
mod questionnaire;
mod reconcile;
mod report;
#[cfg(test)]
mod tests;
mod types;

pub use self::agreement_matrix::*;
pub use self::dimensions::*;
pub use self::grouping::*;
pub use self::questionnaire::*;
pub use self::reconcile::*;
pub use self::report::*;
pub use self::types::*;
