//! Features tagged with the group(s) they belong to.
//!
//! * a [GroupFeature] observes the process of a single group,
//! * a [BoundaryFeature] observes the difference `f_lhs(x) - f_rhs(x)` between
//!   the processes of two groups at the same location,
//! * a [PatchworkFeature] is any of them or an untagged raw feature.

use crate::errors::{PatchworkError, Result};
use crate::grouped::Grouped;
use linfa::Float;
use ndarray::{Array1, ArrayBase, Data, Ix2};
use std::fmt::Debug;

/// A raw feature attached to the process of group `key`
#[derive(Clone, Debug, PartialEq)]
pub struct GroupFeature<K, F: Float> {
    /// Group of the process
    pub key: K,
    /// Location
    pub feature: Array1<F>,
}

impl<K, F: Float> GroupFeature<K, F> {
    /// Constructor
    pub fn new(key: K, feature: Array1<F>) -> Self {
        GroupFeature { key, feature }
    }
}

/// Pseudo observation of `f_lhs(feature) - f_rhs(feature)`
#[derive(Clone, Debug, PartialEq)]
pub struct BoundaryFeature<K, F: Float> {
    lhs: K,
    rhs: K,
    feature: Array1<F>,
}

impl<K: PartialEq + Debug + Clone, F: Float> BoundaryFeature<K, F> {
    /// Constructor
    ///
    /// # Errors
    ///
    /// [PatchworkError::PreconditionError] if both sides are the same group
    pub fn new(lhs: K, rhs: K, feature: Array1<F>) -> Result<Self> {
        if lhs == rhs {
            return Err(PatchworkError::PreconditionError(format!(
                "boundary between group {lhs:?} and itself"
            )));
        }
        Ok(BoundaryFeature { lhs, rhs, feature })
    }

    /// The same location observing `f_rhs - f_lhs`
    pub fn reversed(&self) -> Self {
        BoundaryFeature {
            lhs: self.rhs.clone(),
            rhs: self.lhs.clone(),
            feature: self.feature.clone(),
        }
    }
}

impl<K, F: Float> BoundaryFeature<K, F> {
    /// Group counted positively
    pub fn lhs(&self) -> &K {
        &self.lhs
    }

    /// Group counted negatively
    pub fn rhs(&self) -> &K {
        &self.rhs
    }

    /// Location
    pub fn feature(&self) -> &Array1<F> {
        &self.feature
    }
}

/// Any feature the patchwork covariance can be evaluated on
#[derive(Clone, Debug, PartialEq)]
pub enum PatchworkFeature<K, F: Float> {
    /// Untagged location, only comparable with another raw feature
    Raw(Array1<F>),
    /// Observation of one group
    Group(GroupFeature<K, F>),
    /// Observation of the difference between two groups
    Boundary(BoundaryFeature<K, F>),
}

impl<K, F: Float> From<GroupFeature<K, F>> for PatchworkFeature<K, F> {
    fn from(feature: GroupFeature<K, F>) -> Self {
        PatchworkFeature::Group(feature)
    }
}

impl<K, F: Float> From<BoundaryFeature<K, F>> for PatchworkFeature<K, F> {
    fn from(feature: BoundaryFeature<K, F>) -> Self {
        PatchworkFeature::Boundary(feature)
    }
}

impl<K, F: Float> From<Array1<F>> for PatchworkFeature<K, F> {
    fn from(feature: Array1<F>) -> Self {
        PatchworkFeature::Raw(feature)
    }
}

/// Tag every row of `rows` with group `key`
pub fn as_group_features<K: Clone, F: Float>(
    key: &K,
    rows: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Vec<PatchworkFeature<K, F>> {
    rows.rows()
        .into_iter()
        .map(|r| PatchworkFeature::Group(GroupFeature::new(key.clone(), r.to_owned())))
        .collect()
}

/// Tag the rows of every group with its key, groups are concatenated in key order
pub fn as_group_features_from<K: Ord + Clone, F: Float, S: Data<Elem = F>>(
    grouped: &Grouped<K, ArrayBase<S, Ix2>>,
) -> Vec<PatchworkFeature<K, F>> {
    grouped
        .iter()
        .flat_map(|(key, rows)| as_group_features(key, rows))
        .collect()
}

/// Build one boundary feature between `lhs` and `rhs` per row of `rows`
///
/// # Errors
///
/// [PatchworkError::PreconditionError] if `lhs == rhs`
pub fn as_boundary_features<K: PartialEq + Debug + Clone, F: Float>(
    lhs: &K,
    rhs: &K,
    rows: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Result<Vec<PatchworkFeature<K, F>>> {
    rows.rows()
        .into_iter()
        .map(|r| {
            BoundaryFeature::new(lhs.clone(), rhs.clone(), r.to_owned())
                .map(PatchworkFeature::Boundary)
        })
        .collect()
}
