//! Prediction driver: encoding and decoding runs
//!
//! One driver handles both directions; the configuration decides which
//! array plays the features and which the target. Per layer it checks
//! shapes and fold feasibility, partitions the activation tensor, walks
//! every unit × measurement block through the scorer, and assembles a
//! fully-populated `LayerResult` bundle. A degenerate cell is logged and
//! substituted, never fatal; a fatal error aborts the layer with no
//! partial bundle.

use ndarray::{s, Array2, ArrayView2, ArrayView4, Axis};
use tracing::{debug, info, warn};

use crate::activations::ActivationBank;
use crate::axis::{self, IterationAxis, LayerShape};
use crate::config::{AnalysisConfig, DecodeFeatures, Direction, Granularity};
use crate::error::AnalysisError;
use crate::folds::FoldPlan;
use crate::models::FittedModel;
use crate::response::ResponseMatrix;
use crate::scorer::{ScoreRecord, UnitOutcome, UnitScorer};

/// Per-layer result bundle.
///
/// `cells` is (unit × measurement block); `models` holds one retained
/// predictor per unit, trained for that unit's last evaluated block, or
/// `None` where nothing could be fit.
#[derive(Debug)]
pub struct LayerResult {
    pub layer: String,
    pub axis: IterationAxis,
    pub shape: LayerShape,
    /// True when cells carry per-element positions.
    pub univariate: bool,
    pub cells: Array2<ScoreRecord>,
    pub models: Vec<Option<FittedModel>>,
}

impl LayerResult {
    pub fn n_units(&self) -> usize {
        self.cells.nrows()
    }

    pub fn n_measurements(&self) -> usize {
        self.cells.ncols()
    }

    /// The scores alone, same (unit × measurement) layout as `cells`.
    pub fn score_matrix(&self) -> Array2<f64> {
        self.cells.mapv(|record| record.score)
    }

    /// Best-scoring unit for one measurement block, first index on ties.
    pub fn best_unit(&self, measurement: usize) -> Option<(usize, ScoreRecord)> {
        let column = self.cells.index_axis(Axis(1), measurement);
        let mut best: Option<(usize, ScoreRecord)> = None;
        for (unit, record) in column.iter().enumerate() {
            match best {
                Some((_, held)) if record.score <= held.score => {}
                _ => best = Some((unit, *record)),
            }
        }
        best
    }
}

/// Cross-validated encoding/decoding over an activation bank.
pub struct PredictionDriver {
    config: AnalysisConfig,
}

impl PredictionDriver {
    /// Validates the configuration before any data is touched.
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run every layer of the bank against the response, in bank order.
    pub fn run(
        &self,
        bank: &ActivationBank,
        response: &ResponseMatrix,
    ) -> Result<Vec<LayerResult>, AnalysisError> {
        info!(
            "prediction run: {:?} {:?} over {} layers, {} measurements",
            self.config.direction,
            self.config.granularity,
            bank.n_layers(),
            response.n_measurements()
        );

        let mut results = Vec::with_capacity(bank.n_layers());
        for (name, acts) in bank.iter() {
            results.push(self.run_layer(name, acts, response)?);
        }
        Ok(results)
    }

    /// Run one layer. Fatal errors carry the layer name.
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
        if self.config.model.is_classifier() {
            validate_class_labels(response)?;
        }

        let folds = FoldPlan::new(n_stim, self.config.folds, self.config.shuffle_seed)?;
        let parts = axis::partition(acts, self.config.axis)?;
        let shape = LayerShape::new(acts.shape()[1], acts.shape()[2], acts.shape()[3]);
        let scorer = UnitScorer::new(&self.config.model, &folds);

        let n_units = shape.unit_count(self.config.axis);
        let n_blocks = match self.config.direction {
            Direction::Encode => response.n_measurements(),
            Direction::Decode => match self.config.decode_features {
                DecodeFeatures::Joint => 1,
                DecodeFeatures::PerMeasurement => response.n_measurements(),
            },
        };

        debug!(
            "layer {name:?}: {n_units} units x {n_blocks} blocks, {} elements each",
            shape.element_count(self.config.axis)
        );

        let mut cells = Vec::with_capacity(n_units * n_blocks);
        let mut models = Vec::with_capacity(n_units);
        for unit in 0..n_units {
            let unit_view = parts.index_axis(Axis(1), unit);
            let mut last: Option<(usize, UnitOutcome)> = None;

            for block in 0..n_blocks {
                let outcome = self.score_cell(&scorer, unit_view, response, block);
                if outcome.degenerate {
                    warn!(
                        "layer {name:?} unit {unit} measurement {block}: undefined \
                         score, substituting 0"
                    );
                }
                let position = match outcome.best_element {
                    Some(element) => {
                        Some(axis::locate(self.config.axis, shape, unit, element)?)
                    }
                    None => None,
                };
                cells.push(ScoreRecord {
                    score: outcome.score,
                    position,
                });
                last = Some((block, outcome));
            }

            models.push(self.retain_model(&scorer, unit_view, response, last));
        }

        let cells = Array2::from_shape_vec((n_units, n_blocks), cells)
            .map_err(|e| AnalysisError::shape(format!("layer {name:?}: {e}")))?;

        Ok(LayerResult {
            layer: name.to_string(),
            axis: self.config.axis,
            shape,
            univariate: self.config.granularity == Granularity::Univariate,
            cells,
            models,
        })
    }

    fn score_cell(
        &self,
        scorer: &UnitScorer<'_>,
        unit: ArrayView2<'_, f64>,
        response: &ResponseMatrix,
        block: usize,
    ) -> UnitOutcome {
        match (self.config.direction, self.config.granularity) {
            (Direction::Encode, Granularity::Univariate) => {
                scorer.encode_univariate(unit, response.column(block))
            }
            (Direction::Encode, Granularity::Multivariate) => {
                scorer.encode_multivariate(unit, response.column(block))
            }
            (Direction::Decode, Granularity::Univariate) => {
                scorer.decode_univariate(self.decode_block(response, block), unit)
            }
            (Direction::Decode, Granularity::Multivariate) => {
                scorer.decode_multivariate(self.decode_block(response, block), unit)
            }
        }
    }

    /// The feature matrix decoding uses for one measurement block.
    fn decode_block<'r>(
        &self,
        response: &'r ResponseMatrix,
        block: usize,
    ) -> ArrayView2<'r, f64> {
        match self.config.decode_features {
            DecodeFeatures::Joint => response.data(),
            DecodeFeatures::PerMeasurement => response.data().slice_move(s![.., block..=block]),
        }
    }

    /// Fit the predictor kept in the bundle for one unit, from its last
    /// evaluated block.
    fn retain_model(
        &self,
        scorer: &UnitScorer<'_>,
        unit: ArrayView2<'_, f64>,
        response: &ResponseMatrix,
        last: Option<(usize, UnitOutcome)>,
    ) -> Option<FittedModel> {
        let (block, outcome) = last?;
        let retention = self.config.retention;
        match (self.config.direction, self.config.granularity) {
            (Direction::Encode, Granularity::Univariate) => {
                let element = outcome.best_element?;
                scorer.fit_retained(
                    unit.slice(s![.., element..=element]),
                    response.column(block),
                    retention,
                )
            }
            (Direction::Encode, Granularity::Multivariate) => {
                scorer.fit_retained(unit, response.column(block), retention)
            }
            (Direction::Decode, Granularity::Univariate) => {
                let element = outcome.best_element?;
                scorer.fit_retained(
                    self.decode_block(response, block),
                    unit.index_axis(Axis(1), element),
                    retention,
                )
            }
            (Direction::Decode, Granularity::Multivariate) => {
                // GLM decomposes per column; the stored fit is the final
                // element's.
                scorer.fit_retained(
                    self.decode_block(response, block),
                    unit.index_axis(Axis(1), unit.ncols() - 1),
                    retention,
                )
            }
        }
    }
}

/// Classification targets must be non-negative integers with exactly
/// two classes per measurement.
fn validate_class_labels(response: &ResponseMatrix) -> Result<(), AnalysisError> {
    for (index, name) in response.names().iter().enumerate() {
        let mut labels: Vec<i64> = Vec::new();
        for &value in response.column(index) {
            let rounded = value.round();
            if !value.is_finite() || (value - rounded).abs() > 1e-6 || rounded < 0.0 {
                return Err(AnalysisError::config(format!(
                    "measurement {name:?}: classification needs non-negative integer \
                     labels, got {value}"
                )));
            }
            let label = rounded as i64;
            if !labels.contains(&label) {
                labels.push(label);
            }
        }
        if labels.len() != 2 {
            return Err(AnalysisError::config(format!(
                "measurement {name:?}: classification needs exactly 2 classes, got {}",
                labels.len()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelRetention;
    use crate::models::{ModelFamily, ModelSpec};
    use ndarray::{Array1, Array4};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn response_tracking(target: &Array1<f64>) -> ResponseMatrix {
        let n = target.len();
        let data = Array2::from_shape_fn((n, 2), |(i, j)| {
            if j == 0 {
                target[i]
            } else {
                (i % 3) as f64
            }
        });
        ResponseMatrix::new(data, vec!["tracked".to_string(), "other".to_string()]).unwrap()
    }

    fn planted_bank(target: &Array1<f64>, seed: u64) -> ActivationBank {
        let n = target.len();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut acts = Array4::from_shape_fn((n, 3, 2, 2), |_| rng.gen_range(-1.0..1.0));
        // channel 1, row 1, column 0 copies the target
        for i in 0..n {
            acts[(i, 1, 1, 0)] = target[i];
        }
        let mut bank = ActivationBank::new();
        bank.push("conv", acts).unwrap();
        bank
    }

    #[test]
    fn test_encode_univariate_bundle() {
        let target: Array1<f64> = (0..12).map(|i| i as f64 * 0.7 - 2.0).collect();
        let bank = planted_bank(&target, 17);
        let response = response_tracking(&target);

        let driver = PredictionDriver::new(AnalysisConfig {
            folds: 2,
            ..Default::default()
        })
        .unwrap();
        let results = driver.run(&bank, &response).unwrap();
        assert_eq!(results.len(), 1);

        let layer = &results[0];
        assert_eq!(layer.n_units(), 3);
        assert_eq!(layer.n_measurements(), 2);
        assert!(layer.univariate);
        assert_eq!(layer.models.len(), 3);

        // the planted channel wins the tracked measurement
        let (best_unit, record) = layer.best_unit(0).unwrap();
        assert_eq!(best_unit, 1);
        assert!(record.score > 0.99);
        let coord = record.position.unwrap();
        assert_eq!((coord.channel, coord.row, coord.column), (1, 1, 0));
    }

    #[test]
    fn test_decode_joint_single_block() {
        let target: Array1<f64> = (0..12).map(|i| (i as f64).cos()).collect();
        let bank = planted_bank(&target, 23);
        let response = response_tracking(&target);

        let driver = PredictionDriver::new(AnalysisConfig {
            direction: Direction::Decode,
            granularity: Granularity::Multivariate,
            model: ModelSpec::new(ModelFamily::Glm),
            folds: 3,
            retention: ModelRetention::RefitFull,
            ..Default::default()
        })
        .unwrap();
        let layer = driver
            .run_layer("conv", bank.get("conv").unwrap(), &response)
            .unwrap();

        assert_eq!(layer.n_measurements(), 1);
        assert!(!layer.univariate);
        assert!(layer.cells.iter().all(|r| r.position.is_none()));
    }

    #[test]
    fn test_stimulus_mismatch_is_fatal() {
        let target: Array1<f64> = (0..12).map(|i| i as f64).collect();
        let bank = planted_bank(&target, 3);
        let short: Array1<f64> = (0..10).map(|i| i as f64).collect();
        let response = response_tracking(&short);

        let driver = PredictionDriver::new(AnalysisConfig::default()).unwrap();
        let err = driver.run(&bank, &response).unwrap_err();
        assert!(matches!(err, AnalysisError::ShapeMismatch { .. }));
        assert!(err.to_string().contains("conv"));
    }

    #[test]
    fn test_too_many_folds_is_fatal() {
        let target: Array1<f64> = (0..4).map(|i| i as f64).collect();
        let bank = planted_bank(&target, 3);
        let response = response_tracking(&target);

        let driver = PredictionDriver::new(AnalysisConfig {
            folds: 5,
            ..Default::default()
        })
        .unwrap();
        assert!(matches!(
            driver.run(&bank, &response),
            Err(AnalysisError::InsufficientSamples { .. })
        ));
    }

    #[test]
    fn test_classification_label_validation() {
        let labels: Array1<f64> = (0..12).map(|i| f64::from(u8::from(i % 2 == 0))).collect();
        let bank = planted_bank(&labels, 31);

        let driver = PredictionDriver::new(AnalysisConfig {
            model: ModelSpec::new(ModelFamily::Logistic),
            folds: 2,
            ..Default::default()
        })
        .unwrap();

        // continuous values are not labels
        let continuous =
            ResponseMatrix::new(Array2::from_shape_fn((12, 1), |(i, _)| i as f64 * 0.3), vec![
                "score".to_string(),
            ])
            .unwrap();
        assert!(matches!(
            driver.run(&bank, &continuous),
            Err(AnalysisError::UnsupportedConfiguration { .. })
        ));

        // proper binary labels pass
        let binary = ResponseMatrix::new(
            Array2::from_shape_fn((12, 1), |(i, _)| f64::from(u8::from(i % 2 == 0))),
            vec!["class".to_string()],
        )
        .unwrap();
        assert!(driver.run(&bank, &binary).is_ok());
    }
}
