//! Analysis configuration
//!
//! `AnalysisConfig` carries the full semantic surface the CLI layer maps
//! onto: prediction direction, granularity, iteration axis, model
//! family, fold count, optional shuffle seed, model retention, and the
//! decode feature policy. `validate` rejects unsupported combinations
//! before any data is touched.

use serde::{Deserialize, Serialize};

use crate::axis::IterationAxis;
use crate::error::AnalysisError;
use crate::models::{ModelFamily, ModelSpec};

/// Which array plays the features and which the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// DNN activation predicts response measurements.
    Encode,
    /// Response measurements predict DNN activation.
    Decode,
}

/// Whether a unit is scanned element by element or fit as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Granularity {
    /// Score each element independently, report only the best.
    Univariate,
    /// Use all elements jointly; one score per unit, no position.
    Multivariate,
}

/// How decoding assembles its feature matrix from the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecodeFeatures {
    /// The whole response matrix as one feature block (one output column).
    Joint,
    /// Each measurement column separately (one output column per
    /// measurement).
    PerMeasurement,
}

/// Which training set the retained per-unit model is fit on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelRetention {
    /// The last cross-validation fold's training set.
    LastFold,
    /// A refit on the full stimulus set.
    RefitFull,
}

/// Configuration for one prediction-driver run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub direction: Direction,
    pub granularity: Granularity,
    pub axis: IterationAxis,
    pub model: ModelSpec,
    /// Cross-validation fold count, at least 2.
    pub folds: usize,
    /// When set, stimulus order is shuffled once with this seed before
    /// fold assignment. The default is deterministic contiguous folds.
    pub shuffle_seed: Option<u64>,
    pub retention: ModelRetention,
    pub decode_features: DecodeFeatures,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            direction: Direction::Encode,
            granularity: Granularity::Univariate,
            axis: IterationAxis::Channel,
            model: ModelSpec::new(ModelFamily::Linear),
            folds: 3,
            shuffle_seed: None,
            retention: ModelRetention::LastFold,
            decode_features: DecodeFeatures::Joint,
        }
    }
}

impl AnalysisConfig {
    /// Reject unsupported option combinations up front.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.folds < 2 {
            return Err(AnalysisError::config(format!(
                "cross-validation needs at least 2 folds, got {}",
                self.folds
            )));
        }
        match (self.direction, self.model.family) {
            (Direction::Encode, ModelFamily::Glm) => {
                return Err(AnalysisError::config(
                    "the general linear model is a decoding family; use linear or lasso \
                     for encoding",
                ));
            }
            (Direction::Decode, ModelFamily::Logistic) => {
                return Err(AnalysisError::config(
                    "logistic classification predicts a response label and is only \
                     available for encoding",
                ));
            }
            _ => {}
        }
        if self.direction == Direction::Decode
            && self.granularity == Granularity::Multivariate
            && self.model.family != ModelFamily::Glm
        {
            return Err(AnalysisError::config(
                "multivariate decoding predicts every element of a unit and requires \
                 the general linear model",
            ));
        }
        Ok(())
    }
}
