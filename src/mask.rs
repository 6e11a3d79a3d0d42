//! Unit selection mask
//!
//! A `UnitMask` names which layers take part in an analysis and,
//! per layer, which channels/rows/columns. Numbers are 1-based on this
//! external surface, matching the convention of reported positions; the
//! single 1-based → 0-based conversion happens inside
//! `ActivationBank::select`. Parsing mask files is the I/O layer's job.

use crate::error::AnalysisError;

/// Subset of one layer. Empty number lists keep the full axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSelection {
    pub layer: String,
    /// 1-based channel numbers, empty = all channels.
    pub channels: Vec<usize>,
    /// 1-based row numbers, empty = all rows.
    pub rows: Vec<usize>,
    /// 1-based column numbers, empty = all columns.
    pub columns: Vec<usize>,
}

impl LayerSelection {
    /// Keep the named layer in full.
    pub fn whole(layer: impl Into<String>) -> Self {
        Self {
            layer: layer.into(),
            channels: Vec::new(),
            rows: Vec::new(),
            columns: Vec::new(),
        }
    }

    /// Keep the named layer restricted to the given 1-based channels.
    pub fn with_channels(layer: impl Into<String>, channels: Vec<usize>) -> Self {
        Self {
            layer: layer.into(),
            channels,
            rows: Vec::new(),
            columns: Vec::new(),
        }
    }
}

/// Ordered layer subsets for one analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitMask {
    layers: Vec<LayerSelection>,
}

impl UnitMask {
    pub fn new(layers: Vec<LayerSelection>) -> Result<Self, AnalysisError> {
        if layers.is_empty() {
            return Err(AnalysisError::config("mask selects no layers"));
        }
        for selection in &layers {
            for number in selection
                .channels
                .iter()
                .chain(&selection.rows)
                .chain(&selection.columns)
            {
                if *number == 0 {
                    return Err(AnalysisError::config(format!(
                        "mask numbers are 1-based; layer {:?} lists a 0",
                        selection.layer
                    )));
                }
            }
        }
        Ok(Self { layers })
    }

    /// Combine a layer list with an optional channel list.
    ///
    /// With one layer, the whole channel list applies to it. With
    /// several layers, the channel list must be absent (every layer
    /// complete) or have one channel per layer, zipped positionally.
    pub fn from_layers(
        layers: &[String],
        channels: Option<&[usize]>,
    ) -> Result<Self, AnalysisError> {
        if layers.is_empty() {
            return Err(AnalysisError::config("mask selects no layers"));
        }

        let selections = match channels {
            None => layers
                .iter()
                .map(LayerSelection::whole)
                .collect(),
            Some(channels) if layers.len() == 1 => {
                vec![LayerSelection::with_channels(
                    &layers[0],
                    channels.to_vec(),
                )]
            }
            Some(channels) if channels.len() == layers.len() => layers
                .iter()
                .zip(channels.iter())
                .map(|(layer, &channel)| LayerSelection::with_channels(layer, vec![channel]))
                .collect(),
            Some(channels) => {
                return Err(AnalysisError::config(format!(
                    "{} channel numbers cannot be combined with {} layers; \
                     give none, or one per layer",
                    channels.len(),
                    layers.len()
                )));
            }
        };
        Self::new(selections)
    }

    pub fn layers(&self) -> &[LayerSelection] {
        &self.layers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_empty_layer_list_rejected() {
        assert!(UnitMask::from_layers(&[], None).is_err());
        assert!(UnitMask::new(vec![]).is_err());
    }

    #[test]
    fn test_single_layer_takes_whole_channel_list() {
        let mask = UnitMask::from_layers(&names(&["conv5"]), Some(&[1, 3, 8])).unwrap();
        assert_eq!(mask.layers().len(), 1);
        assert_eq!(mask.layers()[0].channels, vec![1, 3, 8]);
    }

    #[test]
    fn test_multiple_layers_zip_one_channel_each() {
        let mask =
            UnitMask::from_layers(&names(&["conv3", "conv5", "fc8"]), Some(&[2, 4, 6])).unwrap();
        assert_eq!(mask.layers()[0].channels, vec![2]);
        assert_eq!(mask.layers()[1].channels, vec![4]);
        assert_eq!(mask.layers()[2].channels, vec![6]);
    }

    #[test]
    fn test_multiple_layers_without_channels_keep_all() {
        let mask = UnitMask::from_layers(&names(&["conv3", "fc8"]), None).unwrap();
        assert!(mask.layers().iter().all(|l| l.channels.is_empty()));
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let err = UnitMask::from_layers(&names(&["conv3", "fc8"]), Some(&[1, 2, 3]));
        assert!(matches!(
            err,
            Err(AnalysisError::UnsupportedConfiguration { .. })
        ));
    }

    #[test]
    fn test_zero_is_not_a_valid_number() {
        assert!(UnitMask::from_layers(&names(&["conv1"]), Some(&[0])).is_err());
    }
}
