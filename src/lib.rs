//! Inter-rater agreement analytics for pairwise annotation questionnaires.
//!
//! [`kappa`] holds the numeric core (Fleiss' Kappa and its interpretation
//! scales). [`analytics`] reconciles raw submissions into fixed-shape rating
//! matrices and builds the per-questionnaire, per-dimension report. [`store`]
//! keeps a local SQLite snapshot of submissions for the CLI.

pub mod analytics;
pub mod kappa;
pub mod model;
pub mod store;
pub mod util;
