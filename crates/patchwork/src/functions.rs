//! Grouping functions driving a patchwork model.
//!
//! A [PatchworkFunctions] implementation tells how raw features are assigned
//! to groups, where two groups meet, and which existing group should answer a
//! query whose natural group was not seen at training time.

use crate::errors::{PatchworkError, Result};
use linfa::Float;
use ndarray::{Array2, ArrayView1};
use std::fmt;
use std::sync::Arc;

/// Capability bundle required by the patchwork algorithm
pub trait PatchworkFunctions<F: Float>: Clone + fmt::Debug + Send + Sync {
    /// Group identifier
    type Key: Ord + Clone + fmt::Debug + Send + Sync;

    /// Group of a raw feature
    fn group(&self, x: &ArrayView1<F>) -> Self::Key;

    /// Locations, as rows of a (n, nx) matrix, where the processes of groups
    /// `lhs` and `rhs` are constrained to agree. May be empty when the groups
    /// do not touch.
    fn boundary(&self, lhs: &Self::Key, rhs: &Self::Key) -> Array2<F>;

    /// Boundary locations between `lhs` and `rhs` knowing the existing `groups`.
    /// Defaults to [PatchworkFunctions::boundary].
    fn boundary_among(
        &self,
        _groups: &[Self::Key],
        lhs: &Self::Key,
        rhs: &Self::Key,
    ) -> Array2<F> {
        self.boundary(lhs, rhs)
    }

    /// Existing group answering for `query`. Expected to return `query`
    /// itself when it belongs to `groups`.
    fn nearest_group(&self, groups: &[Self::Key], query: &Self::Key) -> Self::Key;

    /// Structural check run once when the model parameters are checked
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

type GroupFn<F, K> = Arc<dyn Fn(&ArrayView1<F>) -> K + Send + Sync>;
type BoundaryFn<F, K> = Arc<dyn Fn(&K, &K) -> Array2<F> + Send + Sync>;
type NearestGroupFn<K> = Arc<dyn Fn(&[K], &K) -> K + Send + Sync>;

/// Grouping functions given as closures, see [FnPatchworkBuilder]
pub struct FnPatchworkFunctions<F, K> {
    group: GroupFn<F, K>,
    boundary: BoundaryFn<F, K>,
    nearest_group: NearestGroupFn<K>,
}

impl<F, K> Clone for FnPatchworkFunctions<F, K> {
    fn clone(&self) -> Self {
        FnPatchworkFunctions {
            group: Arc::clone(&self.group),
            boundary: Arc::clone(&self.boundary),
            nearest_group: Arc::clone(&self.nearest_group),
        }
    }
}

impl<F, K> fmt::Debug for FnPatchworkFunctions<F, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPatchworkFunctions").finish_non_exhaustive()
    }
}

impl<F: Float, K> FnPatchworkFunctions<F, K> {
    /// Start assembling a closure bundle
    pub fn builder() -> FnPatchworkBuilder<F, K> {
        FnPatchworkBuilder::default()
    }
}

impl<F, K> PatchworkFunctions<F> for FnPatchworkFunctions<F, K>
where
    F: Float,
    K: Ord + Clone + fmt::Debug + Send + Sync,
{
    type Key = K;

    fn group(&self, x: &ArrayView1<F>) -> K {
        (self.group)(x)
    }

    fn boundary(&self, lhs: &K, rhs: &K) -> Array2<F> {
        (self.boundary)(lhs, rhs)
    }

    fn nearest_group(&self, groups: &[K], query: &K) -> K {
        (self.nearest_group)(groups, query)
    }
}

/// Builder of [FnPatchworkFunctions], every closure is required
pub struct FnPatchworkBuilder<F, K> {
    group: Option<GroupFn<F, K>>,
    boundary: Option<BoundaryFn<F, K>>,
    nearest_group: Option<NearestGroupFn<K>>,
}

impl<F, K> Default for FnPatchworkBuilder<F, K> {
    fn default() -> Self {
        FnPatchworkBuilder {
            group: None,
            boundary: None,
            nearest_group: None,
        }
    }
}

impl<F: Float, K> FnPatchworkBuilder<F, K> {
    /// Set the group assignment of raw features
    pub fn group(mut self, f: impl Fn(&ArrayView1<F>) -> K + Send + Sync + 'static) -> Self {
        self.group = Some(Arc::new(f));
        self
    }

    /// Set the boundary locations between two groups
    pub fn boundary(mut self, f: impl Fn(&K, &K) -> Array2<F> + Send + Sync + 'static) -> Self {
        self.boundary = Some(Arc::new(f));
        self
    }

    /// Set the lookup of the existing group answering for an unseen one
    pub fn nearest_group(mut self, f: impl Fn(&[K], &K) -> K + Send + Sync + 'static) -> Self {
        self.nearest_group = Some(Arc::new(f));
        self
    }

    /// Assemble the bundle
    ///
    /// # Errors
    ///
    /// [PatchworkError::ConfigurationError] naming the first missing closure
    pub fn build(self) -> Result<FnPatchworkFunctions<F, K>> {
        let missing = |name: &str| {
            PatchworkError::ConfigurationError(format!(
                "grouping function `{name}` is not defined"
            ))
        };
        Ok(FnPatchworkFunctions {
            group: self.group.ok_or_else(|| missing("group"))?,
            boundary: self.boundary.ok_or_else(|| missing("boundary"))?,
            nearest_group: self.nearest_group.ok_or_else(|| missing("nearest_group"))?,
        })
    }
}

/// Grouping of one dimensional features by intervals delimited by sorted cuts.
///
/// With cuts `c_0 < c_1 < ... < c_{m-1}` the feature `x` belongs to group `i`
/// where `i` is the number of cuts lower or equal to `x[0]`. Adjacent groups
/// `i` and `i + 1` meet at `c_i`. Groups `i < j` separated by intervals with no
/// existing group meet in the middle of the gap, at `(c_i + c_{j-1}) / 2`.
/// Pairs with an existing group in between do not touch.
#[derive(Clone, Debug, PartialEq)]
pub struct IntervalFunctions<F: Float> {
    cuts: Vec<F>,
}

impl<F: Float> IntervalFunctions<F> {
    /// Constructor
    pub fn new(cuts: Vec<F>) -> Self {
        IntervalFunctions { cuts }
    }

    /// Cut points
    pub fn cuts(&self) -> &[F] {
        &self.cuts
    }
}

impl<F: Float> PatchworkFunctions<F> for IntervalFunctions<F> {
    type Key = usize;

    fn group(&self, x: &ArrayView1<F>) -> usize {
        self.cuts.iter().filter(|&&c| c <= x[0]).count()
    }

    fn boundary(&self, lhs: &usize, rhs: &usize) -> Array2<F> {
        let (lo, hi) = if lhs < rhs { (*lhs, *rhs) } else { (*rhs, *lhs) };
        if lo < hi && hi <= self.cuts.len() {
            let middle = (self.cuts[lo] + self.cuts[hi - 1]) / F::cast(2.);
            Array2::from_elem((1, 1), middle)
        } else {
            Array2::zeros((0, 1))
        }
    }

    fn boundary_among(&self, groups: &[usize], lhs: &usize, rhs: &usize) -> Array2<F> {
        let (lo, hi) = if lhs < rhs { (*lhs, *rhs) } else { (*rhs, *lhs) };
        if groups.iter().any(|g| lo < *g && *g < hi) {
            Array2::zeros((0, 1))
        } else {
            self.boundary(lhs, rhs)
        }
    }

    fn nearest_group(&self, groups: &[usize], query: &usize) -> usize {
        if groups.contains(query) {
            return *query;
        }
        groups
            .iter()
            .copied()
            .min_by_key(|g| g.abs_diff(*query))
            .unwrap_or(*query)
    }

    fn validate(&self) -> Result<()> {
        if self.cuts.iter().any(|c| !c.is_finite()) {
            return Err(PatchworkError::ConfigurationError(
                "interval cuts should be finite".to_string(),
            ));
        }
        if self.cuts.windows(2).any(|w| w[0] >= w[1]) {
            return Err(PatchworkError::ConfigurationError(
                "interval cuts should be strictly increasing".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fn_patchwork_builder() {
        let functions = FnPatchworkFunctions::<f64, bool>::builder()
            .group(|x| x[0] >= 0.)
            .boundary(|_, _| array![[0.]])
            .nearest_group(|_, q| *q)
            .build()
            .unwrap();
        assert!(functions.group(&array![1.].view()));
        assert!(!functions.group(&array![-1.].view()));
        assert_eq!(functions.boundary(&false, &true), array![[0.]]);
        assert_eq!(
            functions.boundary_among(&[false, true], &false, &true),
            array![[0.]]
        );
        assert!(functions.nearest_group(&[false, true], &true));
        assert!(functions.validate().is_ok());

        let cloned = functions.clone();
        assert!(cloned.group(&array![2.].view()));
    }

    #[test]
    fn test_fn_patchwork_builder_missing_function() {
        let result = FnPatchworkFunctions::<f64, bool>::builder()
            .group(|x| x[0] >= 0.)
            .nearest_group(|_, q| *q)
            .build();
        match result {
            Err(PatchworkError::ConfigurationError(msg)) => assert!(msg.contains("boundary")),
            other => panic!("expected configuration error, got {other:?}"),
        }
        assert!(FnPatchworkFunctions::<f64, i32>::builder().build().is_err());
    }

    #[test]
    fn test_interval_functions() {
        let functions = IntervalFunctions::new(vec![-0.5, 0.5]);
        assert!(functions.validate().is_ok());
        assert_eq!(functions.group(&array![-1.].view()), 0);
        assert_eq!(functions.group(&array![-0.5].view()), 1);
        assert_eq!(functions.group(&array![0.2].view()), 1);
        assert_eq!(functions.group(&array![3.].view()), 2);

        assert_eq!(functions.boundary(&0, &1), array![[-0.5]]);
        assert_eq!(functions.boundary(&2, &1), array![[0.5]]);
        assert_eq!(functions.boundary(&0, &2), array![[0.]]);
        assert_eq!(functions.boundary(&1, &1).dim(), (0, 1));
        assert_eq!(functions.boundary(&2, &3).dim(), (0, 1));

        // group 1 separates 0 and 2 only when it exists
        assert_eq!(functions.boundary_among(&[0, 1, 2], &0, &2).dim(), (0, 1));
        assert_eq!(functions.boundary_among(&[0, 2], &0, &2), array![[0.]]);
        assert_eq!(functions.boundary_among(&[0, 1, 2], &1, &2), array![[0.5]]);

        assert_eq!(functions.nearest_group(&[0, 2], &2), 2);
        assert_eq!(functions.nearest_group(&[0, 2], &1), 0);
        assert_eq!(functions.nearest_group(&[0, 3], &2), 3);
        assert_eq!(functions.nearest_group(&[], &2), 2);

        assert!(IntervalFunctions::new(vec![0.5, -0.5]).validate().is_err());
        assert!(IntervalFunctions::new(vec![0., f64::NAN]).validate().is_err());
    }
}
