// Pedantic clippy configuration for ML/math codebase
// These are acceptable in numerical/ML code:
#![allow(clippy::cast_precision_loss)] // usize→f64 intentional in scoring
#![allow(clippy::cast_possible_truncation)] // usize→u32 in position maps
#![allow(clippy::many_single_char_names)] // x, y, r, n standard in math
#![allow(clippy::similar_names)] // related variables like `row`/`rows`
#![allow(clippy::module_name_repetitions)] // AnalysisError in error.rs is fine
// Documentation pedantic - acceptable for research code:
#![allow(clippy::doc_markdown)] // backticks for every technical term is excessive
#![allow(clippy::missing_errors_doc)] // # Errors section for every Result fn
#![allow(clippy::missing_panics_doc)] // # Panics section for every panic
// Method style pedantic:
#![allow(clippy::must_use_candidate)] // #[must_use] on every pure fn is excessive
#![allow(clippy::return_self_not_must_use)] // #[must_use] on Self returns
#![allow(clippy::needless_pass_by_value)] // value params for API flexibility
#![allow(clippy::cast_sign_loss)] // f64→usize when value is known positive

//! numap-rs: unit-wise mapping between DNN activations and responses
//!
//! Relates per-unit activation of a deep network's intermediate layers
//! to an external response signal (brain imaging measurements or
//! behavioral scores) through cross-validated encoding/decoding models
//! and closed-form correlation scans.
//!
//! ## Architecture
//!
//! - `axis`: iteration-axis partitioning of 4-D activation tensors
//! - `folds`: deterministic k-fold cross-validation plans
//! - `metrics`: explained variance, Pearson r, accuracy, significance
//! - `models`: pluggable linfa predictors (linear, lasso, logistic, GLM)
//! - `scorer`: per-unit univariate/multivariate scoring engine
//! - `config`: analysis configuration with up-front validation
//! - `driver`: prediction driver for encoding and decoding runs
//! - `correlation`: closed-form correlation driver
//! - `assemble`: tabular and volumetric result assembly (1-based positions)
//! - `activations`: in-memory activation bank with mask selection
//! - `response`: response matrix and volumetric spatial index
//! - `mask`: layer/channel/row/column unit selection
//! - `error`: the fatal error taxonomy

pub mod activations;
pub mod assemble;
pub mod axis;
pub mod config;
pub mod correlation;
pub mod driver;
pub mod error;
pub mod folds;
pub mod mask;
pub mod metrics;
pub mod models;
pub mod response;
pub mod scorer;

pub use activations::ActivationBank;
pub use assemble::{tabular, volume, TabularScores, VolumeScores};
pub use axis::{locate, partition, Coord, IterationAxis, LayerShape};
pub use config::{
    AnalysisConfig, DecodeFeatures, Direction, Granularity, ModelRetention,
};
pub use correlation::CorrelationDriver;
pub use driver::{LayerResult, PredictionDriver};
pub use error::AnalysisError;
pub use folds::{FoldPlan, FoldSplit};
pub use mask::{LayerSelection, UnitMask};
pub use models::{FittedModel, ModelFamily, ModelSpec};
pub use response::{ResponseMatrix, VolumeIndex, Voxel};
pub use scorer::{correlation_scan, ScoreRecord, UnitScorer};
