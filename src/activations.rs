//! In-memory activation bank
//!
//! Ordered, named store of per-layer 4-D activation tensors
//! (stimulus, channel, row, column). Every layer must cover the same
//! stimuli. Subset selection through a `UnitMask` produces a new bank,
//! so the drivers always receive already-selected arrays; the 1-based
//! mask numbers become 0-based indices here and nowhere else.

use ndarray::{Array4, ArrayView4, Axis};

use crate::error::AnalysisError;
use crate::mask::UnitMask;

/// Named per-layer activation tensors for one stimulus set.
#[derive(Debug, Clone, Default)]
pub struct ActivationBank {
    layers: Vec<(String, Array4<f64>)>,
}

impl ActivationBank {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    pub fn with_capacity(n_layers: usize) -> Self {
        Self {
            layers: Vec::with_capacity(n_layers),
        }
    }

    /// Add a layer's tensor. Stimulus count must match the layers
    /// already in the bank, and the name must be new.
    pub fn push(
        &mut self,
        name: impl Into<String>,
        acts: Array4<f64>,
    ) -> Result<(), AnalysisError> {
        let name = name.into();
        if self.layers.iter().any(|(n, _)| *n == name) {
            return Err(AnalysisError::shape(format!(
                "layer {name:?} is already in the bank"
            )));
        }
        if let Some(expected) = self.n_stimuli() {
            let got = acts.shape()[0];
            if got != expected {
                return Err(AnalysisError::shape(format!(
                    "layer {name:?} covers {got} stimuli, bank covers {expected}"
                )));
            }
        }
        self.layers.push((name, acts));
        Ok(())
    }

    pub fn n_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Stimulus count shared by every layer; `None` for an empty bank.
    pub fn n_stimuli(&self) -> Option<usize> {
        self.layers.first().map(|(_, acts)| acts.shape()[0])
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|(name, _)| name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<ArrayView4<'_, f64>> {
        self.layers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, acts)| acts.view())
    }

    /// Iterate layers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ArrayView4<'_, f64>)> {
        self.layers
            .iter()
            .map(|(name, acts)| (name.as_str(), acts.view()))
    }

    /// Restrict to the mask's layers and per-layer channel/row/column
    /// subsets, in mask order.
    pub fn select(&self, mask: &UnitMask) -> Result<Self, AnalysisError> {
        let mut selected = Self::with_capacity(mask.layers().len());
        for selection in mask.layers() {
            let acts = self.get(&selection.layer).ok_or_else(|| {
                AnalysisError::shape(format!(
                    "mask names layer {:?}, which is not in the bank",
                    selection.layer
                ))
            })?;

            let mut sub = acts.to_owned();
            for (axis, numbers, extent) in [
                (Axis(1), &selection.channels, acts.shape()[1]),
                (Axis(2), &selection.rows, acts.shape()[2]),
                (Axis(3), &selection.columns, acts.shape()[3]),
            ] {
                if numbers.is_empty() {
                    continue;
                }
                let indices = to_zero_based(&selection.layer, numbers, extent)?;
                sub = sub.select(axis, &indices);
            }
            selected.push(selection.layer.clone(), sub)?;
        }
        Ok(selected)
    }
}

/// Convert validated 1-based mask numbers into 0-based indices,
/// checking them against the axis extent.
fn to_zero_based(
    layer: &str,
    numbers: &[usize],
    extent: usize,
) -> Result<Vec<usize>, AnalysisError> {
    numbers
        .iter()
        .map(|&number| {
            if number == 0 || number > extent {
                Err(AnalysisError::shape(format!(
                    "layer {layer:?}: mask number {number} outside 1..={extent}"
                )))
            } else {
                Ok(number - 1)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::{LayerSelection, UnitMask};
    use ndarray::Array4;

    fn bank() -> ActivationBank {
        let mut bank = ActivationBank::new();
        bank.push(
            "conv1",
            Array4::from_shape_fn((4, 3, 2, 2), |(s, c, r, col)| {
                (s * 1000 + c * 100 + r * 10 + col) as f64
            }),
        )
        .unwrap();
        bank.push("fc", Array4::zeros((4, 8, 1, 1))).unwrap();
        bank
    }

    #[test]
    fn test_push_and_lookup() {
        let bank = bank();
        assert_eq!(bank.n_layers(), 2);
        assert_eq!(bank.n_stimuli(), Some(4));
        assert_eq!(bank.get("conv1").unwrap().dim(), (4, 3, 2, 2));
        assert!(bank.get("conv9").is_none());
    }

    #[test]
    fn test_stimulus_count_enforced() {
        let mut bank = bank();
        let err = bank.push("late", Array4::zeros((5, 2, 1, 1)));
        assert!(err.is_err());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut bank = bank();
        assert!(bank.push("conv1", Array4::zeros((4, 1, 1, 1))).is_err());
    }

    #[test]
    fn test_select_channels() {
        let bank = bank();
        let mask = UnitMask::new(vec![LayerSelection::with_channels("conv1", vec![3, 1])])
            .unwrap();

        let sub = bank.select(&mask).unwrap();
        assert_eq!(sub.n_layers(), 1);
        let acts = sub.get("conv1").unwrap();
        assert_eq!(acts.dim(), (4, 2, 2, 2));
        // channel order follows the mask: channel 3 first, then 1
        assert_eq!(acts[(0, 0, 0, 0)], 200.0);
        assert_eq!(acts[(0, 1, 0, 0)], 0.0);
    }

    #[test]
    fn test_select_rows_and_columns() {
        let bank = bank();
        let mask = UnitMask::new(vec![LayerSelection {
            layer: "conv1".to_string(),
            channels: vec![],
            rows: vec![2],
            columns: vec![1],
        }])
        .unwrap();

        let acts = bank.select(&mask).unwrap();
        let conv1 = acts.get("conv1").unwrap();
        assert_eq!(conv1.dim(), (4, 3, 1, 1));
        assert_eq!(conv1[(0, 1, 0, 0)], 110.0);
    }

    #[test]
    fn test_select_out_of_range() {
        let bank = bank();
        let mask =
            UnitMask::new(vec![LayerSelection::with_channels("conv1", vec![4])]).unwrap();
        assert!(bank.select(&mask).is_err());
    }

    #[test]
    fn test_select_missing_layer() {
        let bank = bank();
        let mask = UnitMask::new(vec![LayerSelection::whole("conv9")]).unwrap();
        assert!(bank.select(&mask).is_err());
    }
}
