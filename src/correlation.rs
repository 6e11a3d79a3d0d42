//! Correlation driver
//!
//! Representational-similarity-style scan: the same layer × unit ×
//! measurement iteration as the prediction driver, but every cell is the
//! closed-form squared Pearson correlation of the best element, computed
//! over the full sample. Always univariate, no folds, no fitted models.

use ndarray::{Array2, ArrayView4, Axis};
use tracing::{debug, info, warn};

use crate::activations::ActivationBank;
use crate::axis::{self, IterationAxis, LayerShape};
use crate::driver::LayerResult;
use crate::error::AnalysisError;
use crate::response::ResponseMatrix;
use crate::scorer::{correlation_scan, ScoreRecord};

/// Closed-form correlation scan over an activation bank.
pub struct CorrelationDriver {
    axis: IterationAxis,
}

impl CorrelationDriver {
    pub fn new(axis: IterationAxis) -> Self {
        Self { axis }
    }

    pub fn axis(&self) -> IterationAxis {
        self.axis
    }

    /// Scan every layer of the bank against the response, in bank order.
    pub fn run(
        &self,
        bank: &ActivationBank,
        response: &ResponseMatrix,
    ) -> Result<Vec<LayerResult>, AnalysisError> {
        info!(
            "correlation run: {:?} over {} layers, {} measurements",
            self.axis,
            bank.n_layers(),
            response.n_measurements()
        );

        let mut results = Vec::with_capacity(bank.n_layers());
        for (name, acts) in bank.iter() {
            results.push(self.run_layer(name, acts, response)?);
        }
        Ok(results)
    }

    /// Scan one layer.
    pub fn run_layer(
        &self,
        name: &str,
        acts: ArrayView4<'_, f64>,
        response: &ResponseMatrix,
    ) -> Result<LayerResult, AnalysisError> {
        let n_stim = acts.shape()[0];
        if n_stim != response.n_stimuli() {
            return Err(AnalysisError::shape(format!(
                "layer {name:?} covers {n_stim} stimuli, response covers {}",
                response.n_stimuli()
            )));
        }

        let parts = axis::partition(acts, self.axis)?;
        let shape = LayerShape::new(acts.shape()[1], acts.shape()[2], acts.shape()[3]);
        let n_units = shape.unit_count(self.axis);
        let n_measurements = response.n_measurements();

        debug!(
            "layer {name:?}: {n_units} units x {n_measurements} measurements, \
             {} elements each",
            shape.element_count(self.axis)
        );

        let mut cells = Vec::with_capacity(n_units * n_measurements);
        for unit in 0..n_units {
            let unit_view = parts.index_axis(Axis(1), unit);
            for measurement in 0..n_measurements {
                let outcome = correlation_scan(unit_view, response.column(measurement));
                if outcome.degenerate {
                    warn!(
                        "layer {name:?} unit {unit} measurement {measurement}: \
                         undefined correlation, substituting 0"
                    );
                }
                let position = match outcome.best_element {
                    Some(element) => Some(axis::locate(self.axis, shape, unit, element)?),
                    None => None,
                };
                cells.push(ScoreRecord {
                    score: outcome.score,
                    position,
                });
            }
        }

        let cells = Array2::from_shape_vec((n_units, n_measurements), cells)
            .map_err(|e| AnalysisError::shape(format!("layer {name:?}: {e}")))?;
        let models = (0..n_units).map(|_| None).collect();

        Ok(LayerResult {
            layer: name.to_string(),
            axis: self.axis,
            shape,
            univariate: true,
            cells,
            models,
        })
    }
}
