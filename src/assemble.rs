//! Result assembly
//!
//! Splits a layer's structured score cells into the externally-facing
//! arrays: tabular form indexed by measurement name, or volumetric form
//! scattered through a `VolumeIndex`. Positions leave this module as
//! 1-based integers with `0` as the "no position" sentinel; that
//! conversion happens here and only here.

use ndarray::{Array2, Array4};
use serde::Serialize;

use crate::driver::LayerResult;
use crate::error::AnalysisError;
use crate::response::VolumeIndex;

/// Scores and positions indexed by measurement name.
#[derive(Debug, Clone, Serialize)]
pub struct TabularScores {
    pub layer: String,
    pub measurements: Vec<String>,
    /// (unit × measurement) scores.
    pub score: Array2<f64>,
    /// 1-based best-element channels; 0 where no position exists.
    /// Present for univariate bundles only.
    pub channel: Option<Array2<u32>>,
    pub row: Option<Array2<u32>>,
    pub column: Option<Array2<u32>>,
}

/// Scores and positions scattered back into volume space, one volume
/// per unit: arrays are (unit, x, y, z). Background voxels hold NaN in
/// the score volume and 0 in the position volumes.
#[derive(Debug, Clone)]
pub struct VolumeScores {
    pub layer: String,
    pub score: Array4<f64>,
    pub channel: Option<Array4<u32>>,
    pub row: Option<Array4<u32>>,
    pub column: Option<Array4<u32>>,
}

/// Assemble a bundle into tabular form, one column per measurement name.
pub fn tabular(
    result: &LayerResult,
    measurements: &[String],
) -> Result<TabularScores, AnalysisError> {
    if measurements.len() != result.n_measurements() {
        return Err(AnalysisError::shape(format!(
            "layer {:?}: {} measurement names for {} result columns",
            result.layer,
            measurements.len(),
            result.n_measurements()
        )));
    }

    let score = result.score_matrix();
    let (channel, row, column) = if result.univariate {
        let positions = |pick: fn(usize, usize, usize) -> usize| {
            result.cells.map(|record| match record.position {
                Some(c) => pick(c.channel, c.row, c.column) as u32 + 1,
                None => 0,
            })
        };
        (
            Some(positions(|c, _, _| c)),
            Some(positions(|_, r, _| r)),
            Some(positions(|_, _, col| col)),
        )
    } else {
        (None, None, None)
    };

    Ok(TabularScores {
        layer: result.layer.clone(),
        measurements: measurements.to_vec(),
        score,
        channel,
        row,
        column,
    })
}

/// Assemble a bundle into volume form through the response's spatial
/// index.
pub fn volume(
    result: &LayerResult,
    index: &VolumeIndex,
) -> Result<VolumeScores, AnalysisError> {
    if index.n_measurements() != result.n_measurements() {
        return Err(AnalysisError::shape(format!(
            "layer {:?}: volume index maps {} measurements, result has {}",
            result.layer,
            index.n_measurements(),
            result.n_measurements()
        )));
    }

    let n_units = result.n_units();
    let (nx, ny, nz) = index.shape();

    let mut score = Array4::from_elem((n_units, nx, ny, nz), f64::NAN);
    let mut channel = result
        .univariate
        .then(|| Array4::<u32>::zeros((n_units, nx, ny, nz)));
    let mut row = result
        .univariate
        .then(|| Array4::<u32>::zeros((n_units, nx, ny, nz)));
    let mut column = result
        .univariate
        .then(|| Array4::<u32>::zeros((n_units, nx, ny, nz)));

    for unit in 0..n_units {
        for (measurement, voxel) in index.voxels().iter().enumerate() {
            let record = result.cells[(unit, measurement)];
            let at = (unit, voxel.x, voxel.y, voxel.z);
            score[at] = record.score;
            if let Some(coord) = record.position {
                if let Some(channel) = channel.as_mut() {
                    channel[at] = coord.channel as u32 + 1;
                }
                if let Some(row) = row.as_mut() {
                    row[at] = coord.row as u32 + 1;
                }
                if let Some(column) = column.as_mut() {
                    column[at] = coord.column as u32 + 1;
                }
            }
        }
    }

    Ok(VolumeScores {
        layer: result.layer.clone(),
        score,
        channel,
        row,
        column,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::{Coord, IterationAxis, LayerShape};
    use crate::response::Voxel;
    use crate::scorer::ScoreRecord;
    use ndarray::Array2;

    fn bundle(univariate: bool) -> LayerResult {
        let cells = Array2::from_shape_fn((2, 2), |(unit, measurement)| ScoreRecord {
            score: (unit * 10 + measurement) as f64 / 10.0,
            position: (univariate && !(unit == 1 && measurement == 1)).then_some(Coord {
                channel: unit,
                row: measurement,
                column: 2,
            }),
        });
        LayerResult {
            layer: "conv".to_string(),
            axis: IterationAxis::Channel,
            shape: LayerShape::new(2, 3, 3),
            univariate,
            cells,
            models: vec![None, None],
        }
    }

    fn names() -> Vec<String> {
        vec!["ffa".to_string(), "ofa".to_string()]
    }

    #[test]
    fn test_tabular_one_based_positions() {
        let table = tabular(&bundle(true), &names()).unwrap();

        assert_eq!(table.score[(1, 0)], 1.0);
        let channel = table.channel.unwrap();
        let row = table.row.unwrap();
        let column = table.column.unwrap();

        // 0-based (0, 0, 2) reports as (1, 1, 3)
        assert_eq!(channel[(0, 0)], 1);
        assert_eq!(row[(0, 0)], 1);
        assert_eq!(column[(0, 0)], 3);

        // degenerate cell keeps the 0 sentinel
        assert_eq!(channel[(1, 1)], 0);
        assert_eq!(row[(1, 1)], 0);
    }

    #[test]
    fn test_tabular_multivariate_has_no_positions() {
        let table = tabular(&bundle(false), &names()).unwrap();
        assert!(table.channel.is_none());
        assert!(table.row.is_none());
        assert!(table.column.is_none());
    }

    #[test]
    fn test_tabular_name_count_checked() {
        assert!(tabular(&bundle(true), &["only".to_string()]).is_err());
    }

    #[test]
    fn test_volume_scatter() {
        let index = VolumeIndex::new(
            (3, 2, 2),
            vec![Voxel { x: 0, y: 1, z: 0 }, Voxel { x: 2, y: 0, z: 1 }],
        )
        .unwrap();

        let scattered = volume(&bundle(true), &index).unwrap();
        assert_eq!(scattered.score.dim(), (2, 3, 2, 2));

        // measurement 0 of unit 1 lands at its voxel
        assert_eq!(scattered.score[(1, 0, 1, 0)], 1.0);
        // background stays NaN
        assert!(scattered.score[(0, 1, 1, 1)].is_nan());

        let channel = scattered.channel.unwrap();
        assert_eq!(channel[(1, 0, 1, 0)], 2);
        // degenerate cell scatters the 0 sentinel
        assert_eq!(channel[(1, 2, 0, 1)], 0);
    }

    #[test]
    fn test_volume_measurement_count_checked() {
        let index =
            VolumeIndex::new((2, 2, 2), vec![Voxel { x: 0, y: 0, z: 0 }]).unwrap();
        assert!(volume(&bundle(true), &index).is_err());
    }
}
