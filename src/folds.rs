//! Deterministic cross-validation folds
//!
//! Stimulus indices are split into k contiguous folds by default, with
//! the first `n % k` folds taking one extra index, so re-running an
//! analysis reproduces identical fold membership everywhere. Shuffling is
//! opt-in through an explicit seed and is just as reproducible. A plan is
//! generated once per run and shared read-only by every unit computation,
//! which is what makes scores comparable across units.

use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::AnalysisError;

/// One train/test partition of stimulus indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// The complete fold assignment for a run.
#[derive(Debug, Clone)]
pub struct FoldPlan {
    splits: Vec<FoldSplit>,
    n_stimuli: usize,
}

impl FoldPlan {
    /// Partition `n_stimuli` indices into `folds` train/test splits.
    ///
    /// Without a seed the assignment is contiguous in stimulus order;
    /// with a seed the index order is shuffled once before splitting.
    pub fn new(
        n_stimuli: usize,
        folds: usize,
        shuffle_seed: Option<u64>,
    ) -> Result<Self, AnalysisError> {
        if folds < 2 {
            return Err(AnalysisError::config(format!(
                "cross-validation needs at least 2 folds, got {folds}"
            )));
        }
        if n_stimuli < folds {
            return Err(AnalysisError::InsufficientSamples {
                stimuli: n_stimuli,
                folds,
            });
        }

        let mut order: Vec<usize> = (0..n_stimuli).collect();
        if let Some(seed) = shuffle_seed {
            let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
            order.shuffle(&mut rng);
        }

        let base = n_stimuli / folds;
        let extra = n_stimuli % folds;
        let mut splits = Vec::with_capacity(folds);
        let mut start = 0;
        for fold in 0..folds {
            let size = base + usize::from(fold < extra);
            let test = order[start..start + size].to_vec();
            let train = order[..start]
                .iter()
                .chain(order[start + size..].iter())
                .copied()
                .collect();
            splits.push(FoldSplit { train, test });
            start += size;
        }

        Ok(Self { splits, n_stimuli })
    }

    pub fn splits(&self) -> &[FoldSplit] {
        &self.splits
    }

    /// Number of folds in the plan.
    pub fn len(&self) -> usize {
        self.splits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.splits.is_empty()
    }

    pub fn n_stimuli(&self) -> usize {
        self.n_stimuli
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contiguous_sizes() {
        let plan = FoldPlan::new(10, 3, None).unwrap();
        let sizes: Vec<usize> = plan.splits().iter().map(|s| s.test.len()).collect();
        assert_eq!(sizes, vec![4, 3, 3]);

        // first fold tests the leading indices, untouched order
        assert_eq!(plan.splits()[0].test, vec![0, 1, 2, 3]);
        assert_eq!(plan.splits()[1].test, vec![4, 5, 6]);
        assert_eq!(plan.splits()[2].test, vec![7, 8, 9]);
    }

    #[test]
    fn test_folds_are_disjoint_and_exhaustive() {
        let plan = FoldPlan::new(11, 4, Some(7)).unwrap();
        let mut seen = vec![false; 11];
        for split in plan.splits() {
            for &i in &split.test {
                assert!(!seen[i], "index {i} tested twice");
                seen[i] = true;
            }
            // train is the complement of test
            assert_eq!(split.train.len() + split.test.len(), 11);
            for &i in &split.train {
                assert!(!split.test.contains(&i));
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_same_seed_same_plan() {
        let a = FoldPlan::new(20, 5, Some(42)).unwrap();
        let b = FoldPlan::new(20, 5, Some(42)).unwrap();
        assert_eq!(a.splits(), b.splits());
    }

    #[test]
    fn test_too_few_stimuli() {
        let err = FoldPlan::new(3, 5, None).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::InsufficientSamples {
                stimuli: 3,
                folds: 5
            }
        ));
    }

    #[test]
    fn test_single_fold_rejected() {
        assert!(FoldPlan::new(10, 1, None).is_err());
    }
}
