//! Per-unit scoring engine
//!
//! Scores one analysis unit (a stimulus × element matrix) against one
//! measurement block: cross-validated predictive scores in both
//! directions and at both granularities, or the closed-form squared
//! correlation used by the correlation driver.
//!
//! Score ties between elements always resolve to the lowest element
//! index. Undefined scores (zero-variance targets, failed fits, NaN
//! correlations) make the cell degenerate: score 0 with no position,
//! never a propagated NaN. The scorer reads shared arrays only through
//! views and never mutates them.

use ndarray::{s, Axis, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::axis::Coord;
use crate::config::ModelRetention;
use crate::folds::FoldPlan;
use crate::models::{FittedModel, ModelSpec};
use crate::metrics;

/// One scored (unit, measurement) cell of a result bundle.
///
/// `position` is the 0-based coordinate of the best element; it is
/// `None` for multivariate granularity and for degenerate cells. The
/// 1-based external convention is applied at assembly, never here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub score: f64,
    pub position: Option<Coord>,
}

/// Raw outcome of scoring one unit, before coordinate recovery.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitOutcome {
    pub score: f64,
    /// Flat index of the best element within the unit; `None` for
    /// multivariate granularity and degenerate cells.
    pub best_element: Option<usize>,
    /// True when the score 0 substitution was applied.
    pub degenerate: bool,
}

impl UnitOutcome {
    fn degenerate() -> Self {
        Self {
            score: 0.0,
            best_element: None,
            degenerate: true,
        }
    }
}

/// Cross-validated scorer for one driver run.
///
/// Borrows the run's immutable model recipe and fold plan, so every
/// unit/measurement cell sees identical fold membership.
pub struct UnitScorer<'a> {
    spec: &'a ModelSpec,
    folds: &'a FoldPlan,
}

impl<'a> UnitScorer<'a> {
    pub fn new(spec: &'a ModelSpec, folds: &'a FoldPlan) -> Self {
        Self { spec, folds }
    }

    /// Encoding, univariate: fit each element alone as a single-feature
    /// predictor of the target; report the best element.
    pub fn encode_univariate(
        &self,
        unit: ArrayView2<'_, f64>,
        target: ArrayView1<'_, f64>,
    ) -> UnitOutcome {
        let scores = (0..unit.ncols())
            .map(|e| self.cv_score(unit.slice(s![.., e..=e]), target));
        best_of(scores)
    }

    /// Encoding, multivariate: all elements jointly as the feature
    /// matrix; one score, no position.
    pub fn encode_multivariate(
        &self,
        unit: ArrayView2<'_, f64>,
        target: ArrayView1<'_, f64>,
    ) -> UnitOutcome {
        match self.cv_score(unit, target) {
            Some(score) => UnitOutcome {
                score,
                best_element: None,
                degenerate: false,
            },
            None => UnitOutcome::degenerate(),
        }
    }

    /// Decoding, univariate: the response block predicts each element in
    /// turn; report the best-predicted element.
    pub fn decode_univariate(
        &self,
        features: ArrayView2<'_, f64>,
        unit: ArrayView2<'_, f64>,
    ) -> UnitOutcome {
        let scores = (0..unit.ncols())
            .map(|e| self.cv_score(features, unit.index_axis(Axis(1), e)));
        best_of(scores)
    }

    /// Decoding, multivariate: the general linear model predicts every
    /// element; the cell score is the uniform mean of per-element CV
    /// scores (multi-output least squares decomposes per column).
    pub fn decode_multivariate(
        &self,
        features: ArrayView2<'_, f64>,
        unit: ArrayView2<'_, f64>,
    ) -> UnitOutcome {
        let mut sum = 0.0;
        for e in 0..unit.ncols() {
            match self.cv_score(features, unit.index_axis(Axis(1), e)) {
                Some(score) => sum += score,
                None => return UnitOutcome::degenerate(),
            }
        }
        UnitOutcome {
            score: sum / unit.ncols() as f64,
            best_element: None,
            degenerate: false,
        }
    }

    /// Train the predictor retained in the result bundle for one unit.
    ///
    /// `None` on fit failure; the driver logs the gap.
    pub fn fit_retained(
        &self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        retention: ModelRetention,
    ) -> Option<FittedModel> {
        match retention {
            ModelRetention::RefitFull => self.spec.fit(x, y).ok(),
            ModelRetention::LastFold => {
                let last = self.folds.splits().last()?;
                let train_x = x.select(Axis(0), &last.train);
                let train_y = y.select(Axis(0), &last.train);
                self.spec.fit(train_x.view(), train_y.view()).ok()
            }
        }
    }

    /// Mean held-out score over the fold plan for one feature matrix and
    /// one target column. `None` when any fold fails to fit or scores
    /// undefined.
    fn cv_score(&self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Option<f64> {
        let mut sum = 0.0;
        for split in self.folds.splits() {
            let train_x = x.select(Axis(0), &split.train);
            let train_y = y.select(Axis(0), &split.train);
            let test_x = x.select(Axis(0), &split.test);
            let test_y = y.select(Axis(0), &split.test);

            let model = self.spec.fit(train_x.view(), train_y.view()).ok()?;
            let pred = model.predict(&test_x);

            let score = if self.spec.is_classifier() {
                metrics::accuracy(test_y.view(), pred.view())?
            } else {
                metrics::explained_variance(test_y.view(), pred.view())?
            };
            if !score.is_finite() {
                return None;
            }
            sum += score;
        }
        Some(sum / self.folds.len() as f64)
    }
}

/// Correlation-mode scan of one unit against one measurement vector:
/// squared Pearson correlation per element over the full sample, best
/// element reported. No folds, no model.
pub fn correlation_scan(
    unit: ArrayView2<'_, f64>,
    target: ArrayView1<'_, f64>,
) -> UnitOutcome {
    let scores = (0..unit.ncols()).map(|e| {
        metrics::pearson_r(unit.index_axis(Axis(1), e), target).map(|r| r * r)
    });
    best_of(scores)
}

/// Max/argmax over per-element scores with first-index tie-break.
/// Elements whose score is undefined or non-finite are excluded; a unit
/// with no scorable element is degenerate.
fn best_of(scores: impl Iterator<Item = Option<f64>>) -> UnitOutcome {
    let mut best: Option<(usize, f64)> = None;
    for (index, score) in scores.enumerate() {
        let Some(score) = score else { continue };
        if !score.is_finite() {
            continue;
        }
        // strict comparison keeps the lowest index on exact ties
        match best {
            Some((_, held)) if score <= held => {}
            _ => best = Some((index, score)),
        }
    }
    match best {
        Some((index, score)) => UnitOutcome {
            score,
            best_element: Some(index),
            degenerate: false,
        },
        None => UnitOutcome::degenerate(),
    }
}
