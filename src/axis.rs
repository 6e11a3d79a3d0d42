//! Iteration-axis partitioning of 4-D activation tensors
//!
//! Collapses a (stimulus, channel, row, column) activation array into the
//! canonical (stimulus, unit, element) form that every scorer iterates,
//! and recovers original coordinates from flat indices. Flattening is
//! row-major throughout: under `Channel` an element index decomposes as
//! (flat / n_col, flat % n_col), and under `RowCol` the *unit* index
//! decomposes the same way while elements are channels.

use ndarray::{Array3, ArrayView4};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// How a 4-D activation tensor splits into independent analysis units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IterationAxis {
    /// One unit spanning the whole layer; elements are the flattened
    /// (channel, row, column) positions.
    Whole,
    /// One unit per channel; elements are the flattened (row, column)
    /// positions of that channel.
    Channel,
    /// One unit per (row, column) position; elements are the channels at
    /// that position.
    RowCol,
}

/// Channel/row/column extent of one layer's activation tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerShape {
    pub channels: usize,
    pub rows: usize,
    pub columns: usize,
}

impl LayerShape {
    pub fn new(channels: usize, rows: usize, columns: usize) -> Self {
        Self {
            channels,
            rows,
            columns,
        }
    }

    /// Number of independent units under the given axis policy.
    pub fn unit_count(&self, axis: IterationAxis) -> usize {
        match axis {
            IterationAxis::Whole => 1,
            IterationAxis::Channel => self.channels,
            IterationAxis::RowCol => self.rows * self.columns,
        }
    }

    /// Number of scalar elements inside each unit. For every policy,
    /// `unit_count * element_count` equals channels × rows × columns.
    pub fn element_count(&self, axis: IterationAxis) -> usize {
        match axis {
            IterationAxis::Whole => self.channels * self.rows * self.columns,
            IterationAxis::Channel => self.rows * self.columns,
            IterationAxis::RowCol => self.channels,
        }
    }
}

/// A 0-based (channel, row, column) coordinate inside one layer.
///
/// The 1-based external convention is applied at assembly, never here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coord {
    pub channel: usize,
    pub row: usize,
    pub column: usize,
}

/// Collapse a (stimulus, channel, row, column) tensor into the canonical
/// (stimulus, unit, element) array for the given axis policy.
///
/// The result is an owned standard-layout copy; `RowCol` requires an axis
/// permutation so a shared view cannot be returned uniformly.
pub fn partition(
    acts: ArrayView4<'_, f64>,
    axis: IterationAxis,
) -> Result<Array3<f64>, AnalysisError> {
    let (n_stim, n_chn, n_row, n_col) = acts.dim();
    if n_stim == 0 || n_chn == 0 || n_row == 0 || n_col == 0 {
        return Err(AnalysisError::shape(format!(
            "activation tensor has a zero-length axis: ({n_stim}, {n_chn}, {n_row}, {n_col})"
        )));
    }

    let reshape_err = |what: &str| {
        AnalysisError::shape(format!(
            "cannot collapse ({n_stim}, {n_chn}, {n_row}, {n_col}) into {what}"
        ))
    };

    match axis {
        IterationAxis::Whole => acts
            .to_owned()
            .into_shape((n_stim, 1, n_chn * n_row * n_col))
            .map_err(|_| reshape_err("(stimulus, 1, channel*row*column)")),
        IterationAxis::Channel => acts
            .to_owned()
            .into_shape((n_stim, n_chn, n_row * n_col))
            .map_err(|_| reshape_err("(stimulus, channel, row*column)")),
        IterationAxis::RowCol => {
            // Bring channels innermost so each (row, col) unit owns a
            // contiguous run of channel elements.
            let permuted = acts.permuted_axes([0, 2, 3, 1]);
            permuted
                .as_standard_layout()
                .into_owned()
                .into_shape((n_stim, n_row * n_col, n_chn))
                .map_err(|_| reshape_err("(stimulus, row*column, channel)"))
        }
    }
}

/// Recover the 0-based layer coordinate addressed by a (unit, element)
/// pair under the given axis policy.
///
/// Under `RowCol` the row and column derive from the unit index, not the
/// element index.
pub fn locate(
    axis: IterationAxis,
    shape: LayerShape,
    unit: usize,
    element: usize,
) -> Result<Coord, AnalysisError> {
    let n_units = shape.unit_count(axis);
    let n_elements = shape.element_count(axis);
    if unit >= n_units || element >= n_elements {
        return Err(AnalysisError::shape(format!(
            "(unit {unit}, element {element}) outside {n_units} units x {n_elements} elements \
             for {axis:?} over ({}, {}, {})",
            shape.channels, shape.rows, shape.columns
        )));
    }

    let coord = match axis {
        IterationAxis::Whole => {
            let per_channel = shape.rows * shape.columns;
            let rest = element % per_channel;
            Coord {
                channel: element / per_channel,
                row: rest / shape.columns,
                column: rest % shape.columns,
            }
        }
        IterationAxis::Channel => Coord {
            channel: unit,
            row: element / shape.columns,
            column: element % shape.columns,
        },
        IterationAxis::RowCol => Coord {
            channel: element,
            row: unit / shape.columns,
            column: unit % shape.columns,
        },
    };
    Ok(coord)
}
