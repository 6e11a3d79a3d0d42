//! Response matrix and volumetric spatial index
//!
//! `ResponseMatrix` holds the (stimulus × measurement) array with named
//! columns; selection is explicit and preserves the caller's order, no
//! column is dropped or reordered implicitly. `VolumeIndex` maps each
//! measurement column to a voxel coordinate so the assembler can scatter
//! scores back into volume space. Whatever container the data came from
//! (ROI table, NIfTI volume, behavior CSV) is resolved by the I/O layer
//! before it reaches these types.

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// External response signal: one column per measurement.
#[derive(Debug, Clone)]
pub struct ResponseMatrix {
    data: Array2<f64>,
    names: Vec<String>,
}

impl ResponseMatrix {
    /// Wrap a (stimulus × measurement) array with one name per column.
    pub fn new(data: Array2<f64>, names: Vec<String>) -> Result<Self, AnalysisError> {
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(AnalysisError::shape(format!(
                "response matrix has a zero-length axis: ({}, {})",
                data.nrows(),
                data.ncols()
            )));
        }
        if names.len() != data.ncols() {
            return Err(AnalysisError::shape(format!(
                "{} measurement names for {} columns",
                names.len(),
                data.ncols()
            )));
        }
        Ok(Self { data, names })
    }

    pub fn n_stimuli(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_measurements(&self) -> usize {
        self.data.ncols()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn data(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    /// One measurement's stimulus vector.
    pub fn column(&self, index: usize) -> ArrayView1<'_, f64> {
        self.data.index_axis(Axis(1), index)
    }

    /// Restrict to the named measurements, in the order given.
    pub fn select(&self, names: &[String]) -> Result<Self, AnalysisError> {
        let mut indices = Vec::with_capacity(names.len());
        for name in names {
            let index = self
                .names
                .iter()
                .position(|n| n == name)
                .ok_or_else(|| {
                    AnalysisError::shape(format!("unknown measurement {name:?}"))
                })?;
            indices.push(index);
        }
        Self::new(self.data.select(Axis(1), &indices), names.to_vec())
    }
}

/// Voxel coordinate of one measurement within a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voxel {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

/// Mapping from measurement columns back to volume space, supplied by
/// the mask-handling I/O layer as an opaque lookup.
#[derive(Debug, Clone)]
pub struct VolumeIndex {
    shape: (usize, usize, usize),
    voxels: Vec<Voxel>,
}

impl VolumeIndex {
    /// One voxel per measurement column; every coordinate must lie
    /// inside `shape`.
    pub fn new(
        shape: (usize, usize, usize),
        voxels: Vec<Voxel>,
    ) -> Result<Self, AnalysisError> {
        let (nx, ny, nz) = shape;
        for (index, v) in voxels.iter().enumerate() {
            if v.x >= nx || v.y >= ny || v.z >= nz {
                return Err(AnalysisError::shape(format!(
                    "voxel ({}, {}, {}) of measurement {index} outside volume \
                     ({nx}, {ny}, {nz})",
                    v.x, v.y, v.z
                )));
            }
        }
        Ok(Self { shape, voxels })
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        self.shape
    }

    pub fn n_measurements(&self) -> usize {
        self.voxels.len()
    }

    pub fn voxels(&self) -> &[Voxel] {
        &self.voxels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sample() -> ResponseMatrix {
        let data = array![[1.0, 4.0, 7.0], [2.0, 5.0, 8.0], [3.0, 6.0, 9.0]];
        ResponseMatrix::new(
            data,
            vec!["v1".to_string(), "ofa".to_string(), "ffa".to_string()],
        )
        .unwrap()
    }

    #[test]
    fn test_dimensions_and_columns() {
        let resp = sample();
        assert_eq!(resp.n_stimuli(), 3);
        assert_eq!(resp.n_measurements(), 3);
        assert_eq!(resp.column(1).to_vec(), vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_select_preserves_caller_order() {
        let resp = sample();
        let sub = resp
            .select(&["ffa".to_string(), "v1".to_string()])
            .unwrap();
        assert_eq!(sub.names(), &["ffa".to_string(), "v1".to_string()]);
        assert_eq!(sub.column(0).to_vec(), vec![7.0, 8.0, 9.0]);
        assert_eq!(sub.column(1).to_vec(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_select_unknown_name() {
        let resp = sample();
        assert!(resp.select(&["sts".to_string()]).is_err());
    }

    #[test]
    fn test_name_count_must_match() {
        let data = array![[1.0, 2.0], [3.0, 4.0]];
        assert!(ResponseMatrix::new(data, vec!["only".to_string()]).is_err());
    }

    #[test]
    fn test_volume_index_bounds() {
        let inside = vec![Voxel { x: 0, y: 1, z: 2 }, Voxel { x: 3, y: 0, z: 0 }];
        let index = VolumeIndex::new((4, 2, 3), inside).unwrap();
        assert_eq!(index.n_measurements(), 2);

        let outside = vec![Voxel { x: 4, y: 0, z: 0 }];
        assert!(VolumeIndex::new((4, 2, 3), outside).is_err());
    }
}
