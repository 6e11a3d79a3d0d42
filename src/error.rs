//! Error taxonomy for the analysis engine
//!
//! Fatal errors abort the affected layer before or during computation and
//! carry enough context (layer name, unit, measurement) to reproduce the
//! failure. Degenerate unit/measurement cells are deliberately *not*
//! errors: the scorer substitutes score 0 with no position and the driver
//! logs the substitution, so a bundle is always either fully populated or
//! not returned at all.

use thiserror::Error;

/// Errors raised by the analysis engine.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Array dimensions are incompatible with the requested computation:
    /// stimulus counts disagree, an axis has zero length, or an index
    /// falls outside the tensor it addresses.
    #[error("shape mismatch: {context}")]
    ShapeMismatch {
        /// What was compared and where it went wrong
        context: String,
    },

    /// The cross-validation fold count exceeds the available stimuli.
    /// Folds are never silently reduced to fit.
    #[error("{folds}-fold cross-validation needs at least {folds} stimuli, got {stimuli}")]
    InsufficientSamples {
        /// Stimuli available in the run
        stimuli: usize,
        /// Folds requested by the configuration
        folds: usize,
    },

    /// The configuration combines options the engine does not support.
    /// Raised at validation time, before any data is touched.
    #[error("unsupported configuration: {reason}")]
    UnsupportedConfiguration {
        /// Which combination was rejected and why
        reason: String,
    },
}

impl AnalysisError {
    pub(crate) fn shape(context: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            context: context.into(),
        }
    }

    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Self::UnsupportedConfiguration {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AnalysisError::shape("expected 10 stimuli, got 8");
        assert_eq!(
            err.to_string(),
            "shape mismatch: expected 10 stimuli, got 8"
        );

        let err = AnalysisError::InsufficientSamples {
            stimuli: 3,
            folds: 5,
        };
        assert!(err.to_string().contains("5-fold"));
        assert!(err.to_string().contains("got 3"));

        let err = AnalysisError::config("fold count must be at least 2");
        assert!(err.to_string().starts_with("unsupported configuration"));
    }
}
