//! Closed-form scoring metrics
//!
//! Explained variance for regression, accuracy for classification,
//! Pearson correlation for the correlation drivers, and a Student-t
//! significance level for a correlation at a given sample size.
//!
//! Undefined values (zero-variance inputs, too few samples) are reported
//! as `None` rather than NaN so callers can apply the explicit
//! degenerate-cell substitution instead of propagating NaN silently.

use ndarray::ArrayView1;
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Fraction of target variance accounted for by the predictions:
/// `1 - Var(y - pred) / Var(y)`.
///
/// Returns `None` when the target has zero variance or either input
/// contains non-finite values.
pub fn explained_variance(target: ArrayView1<'_, f64>, pred: ArrayView1<'_, f64>) -> Option<f64> {
    if target.len() != pred.len() || target.is_empty() {
        return None;
    }
    if target.iter().chain(pred.iter()).any(|v| !v.is_finite()) {
        return None;
    }

    let target_var = variance(target);
    if target_var <= f64::EPSILON {
        return None;
    }

    let n = target.len() as f64;
    let residual: Vec<f64> = target
        .iter()
        .zip(pred.iter())
        .map(|(y, p)| y - p)
        .collect();
    let residual_mean = residual.iter().sum::<f64>() / n;
    let residual_var = residual
        .iter()
        .map(|r| (r - residual_mean).powi(2))
        .sum::<f64>()
        / n;

    Some(1.0 - residual_var / target_var)
}

/// Pearson correlation coefficient between two stimulus vectors.
///
/// Returns `None` when either vector has zero variance, the lengths
/// disagree, or any value is non-finite.
pub fn pearson_r(x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return None;
    }

    let n = x.len() as f64;
    let mean_x = x.sum() / n;
    let mean_y = y.sum() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (&xi, &yi) in x.iter().zip(y.iter()) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x <= f64::EPSILON || var_y <= f64::EPSILON {
        return None;
    }

    let r = cov / (var_x.sqrt() * var_y.sqrt());
    // rounding can push a perfect correlation a hair past 1
    Some(r.clamp(-1.0, 1.0))
}

/// Fraction of predicted class labels matching the true labels.
///
/// Both sides are rounded to the nearest integer before comparison.
pub fn accuracy(truth: ArrayView1<'_, f64>, pred: ArrayView1<'_, f64>) -> Option<f64> {
    if truth.len() != pred.len() || truth.is_empty() {
        return None;
    }
    let correct = truth
        .iter()
        .zip(pred.iter())
        .filter(|(t, p)| {
            t.is_finite() && p.is_finite() && (t.round() - p.round()).abs() < 0.5
        })
        .count();
    Some(correct as f64 / truth.len() as f64)
}

/// Two-sided p-value for a Pearson correlation `r` observed over `n`
/// samples, via the t-distribution with `n - 2` degrees of freedom.
pub fn correlation_p_value(r: f64, n: usize) -> f64 {
    if n < 3 || !r.is_finite() {
        return 1.0;
    }
    let df = (n - 2) as f64;
    let denom = 1.0 - r * r;
    if denom <= f64::EPSILON {
        return 0.0;
    }
    let t = r.abs() * (df / denom).sqrt();
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => 2.0 * (1.0 - dist.cdf(t)),
        Err(_) => 1.0,
    }
}

fn variance(v: ArrayView1<'_, f64>) -> f64 {
    let n = v.len() as f64;
    let mean = v.sum() / n;
    v.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n
}
