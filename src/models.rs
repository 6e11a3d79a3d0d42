//! Pluggable predictive models over linfa
//!
//! Wraps the linfa estimators the scorer can cross-validate: ordinary
//! least squares, lasso (elastic net at l1_ratio 1), binary logistic
//! classification, and the general linear model used for multivariate
//! decoding. A `ModelSpec` is the immutable fit recipe; a `FittedModel`
//! is one trained predictor, returned to the caller and never cached or
//! shared across units.

use linfa::prelude::*;
use linfa_elasticnet::ElasticNet;
use linfa_linear::{FittedLinearRegression, LinearRegression};
use linfa_logistic::{FittedLogisticRegression, LogisticRegression};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// The model families the engine can cross-validate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelFamily {
    /// Ordinary least-squares regression, scored by explained variance.
    Linear,
    /// L1-regularized (lasso) regression, scored by explained variance.
    Lasso,
    /// Binary logistic classification, scored by accuracy. Encoding only.
    Logistic,
    /// General linear model: multi-output least squares, fit one target
    /// column at a time. Decoding only.
    Glm,
}

/// Fit recipe shared by every unit computation in a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub family: ModelFamily,
    /// Regularization strength for the lasso family.
    pub lasso_penalty: f64,
    /// Iteration cap for the logistic solver.
    pub logistic_max_iterations: u64,
}

impl ModelSpec {
    pub fn new(family: ModelFamily) -> Self {
        Self {
            family,
            lasso_penalty: 0.1,
            logistic_max_iterations: 100,
        }
    }

    /// Whether this family predicts class labels rather than a
    /// continuous value.
    pub fn is_classifier(&self) -> bool {
        self.family == ModelFamily::Logistic
    }

    /// Train one predictor on a (sample × feature) matrix and a target
    /// column.
    ///
    /// A failure here (for example a single-class logistic training set
    /// in one fold) is not part of the fatal error taxonomy; the scorer
    /// treats it as degeneracy of the affected cell.
    pub fn fit(
        &self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
    ) -> Result<FittedModel, FitFailure> {
        match self.family {
            // the GLM decomposes into per-column least squares
            ModelFamily::Linear | ModelFamily::Glm => {
                let dataset = Dataset::new(x.to_owned(), y.to_owned());
                LinearRegression::default()
                    .fit(&dataset)
                    .map(FittedModel::Linear)
                    .map_err(|e| FitFailure(e.to_string()))
            }
            ModelFamily::Lasso => {
                let dataset = Dataset::new(x.to_owned(), y.to_owned());
                ElasticNet::params()
                    .penalty(self.lasso_penalty)
                    .l1_ratio(1.0)
                    .fit(&dataset)
                    .map(FittedModel::Lasso)
                    .map_err(|e| FitFailure(e.to_string()))
            }
            ModelFamily::Logistic => {
                let labels: Array1<usize> = y.mapv(|v| v.round().max(0.0) as usize);
                let dataset = Dataset::new(x.to_owned(), labels);
                LogisticRegression::default()
                    .max_iterations(self.logistic_max_iterations)
                    .fit(&dataset)
                    .map(FittedModel::Logistic)
                    .map_err(|e| FitFailure(e.to_string()))
            }
        }
    }
}

/// A model-fit failure on one training set.
#[derive(Debug, Clone)]
pub struct FitFailure(pub String);

/// One trained predictor, attached to a unit in the result bundle.
pub enum FittedModel {
    Linear(FittedLinearRegression<f64>),
    Lasso(ElasticNet<f64>),
    Logistic(FittedLogisticRegression<f64, usize>),
}

impl FittedModel {
    /// Predict one value per row of `x`. Class labels come back as their
    /// numeric value so regression and classification share a signature.
    pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        match self {
            FittedModel::Linear(m) => m.predict(x),
            FittedModel::Lasso(m) => m.predict(x),
            FittedModel::Logistic(m) => m.predict(x).mapv(|label| label as f64),
        }
    }

    pub fn family_name(&self) -> &'static str {
        match self {
            FittedModel::Linear(_) => "linear",
            FittedModel::Lasso(_) => "lasso",
            FittedModel::Logistic(_) => "logistic",
        }
    }
}

impl std::fmt::Debug for FittedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FittedModel({})", self.family_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn test_linear_fit_recovers_line() {
        let x =
            Array2::from_shape_fn((8, 1), |(i, _)| i as f64);
        let y = array![1.0, 3.0, 5.0, 7.0, 9.0, 11.0, 13.0, 15.0];

        let spec = ModelSpec::new(ModelFamily::Linear);
        let model = spec.fit(x.view(), y.view()).unwrap();
        let pred = model.predict(&x);

        for (p, t) in pred.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-8, "predicted {p}, wanted {t}");
        }
    }

    #[test]
    fn test_glm_behaves_as_least_squares_per_column() {
        let x = Array2::from_shape_fn((6, 2), |(i, j)| (i * (j + 1)) as f64);
        let y = array![0.0, 2.0, 4.0, 6.0, 8.0, 10.0];

        let glm = ModelSpec::new(ModelFamily::Glm)
            .fit(x.view(), y.view())
            .unwrap();
        let ols = ModelSpec::new(ModelFamily::Linear)
            .fit(x.view(), y.view())
            .unwrap();

        let pg = glm.predict(&x);
        let po = ols.predict(&x);
        for (a, b) in pg.iter().zip(po.iter()) {
            assert!((a - b).abs() < 1e-10);
        }
    }

    #[test]
    fn test_logistic_fit_separable() {
        let x = Array2::from_shape_fn((10, 1), |(i, _)| if i < 5 { -1.0 } else { 1.0 });
        let y = array![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0];

        let spec = ModelSpec::new(ModelFamily::Logistic);
        let model = spec.fit(x.view(), y.view()).unwrap();
        let pred = model.predict(&x);

        for (p, t) in pred.iter().zip(y.iter()) {
            assert!((p - t).abs() < 0.5);
        }
    }

    #[test]
    fn test_classifier_flag() {
        assert!(ModelSpec::new(ModelFamily::Logistic).is_classifier());
        assert!(!ModelSpec::new(ModelFamily::Linear).is_classifier());
        assert!(!ModelSpec::new(ModelFamily::Lasso).is_classifier());
        assert!(!ModelSpec::new(ModelFamily::Glm).is_classifier());
    }
}
