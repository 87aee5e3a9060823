//! Ordered per-group containers.
//!
//! A [Grouped] value maps each group key to a value and always iterates in
//! ascending key order. Every aggregation over groups in this crate relies on
//! that canonical order to produce reproducible results.

use crate::errors::{PatchworkError, Result};
use linfa::{DatasetBase, Float};
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, Axis, Data, Ix1, Ix2};
use rayon::prelude::*;
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// An ordered map from group key to value
#[derive(Clone, Debug, PartialEq)]
pub struct Grouped<K: Ord, V> {
    groups: BTreeMap<K, V>,
}

impl<K: Ord, V> Default for Grouped<K, V> {
    fn default() -> Self {
        Grouped {
            groups: BTreeMap::new(),
        }
    }
}

impl<K: Ord, V> Grouped<K, V> {
    /// An empty container
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value for the given key, returning the previous value if any
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.groups.insert(key, value)
    }

    /// Value of the given key if present
    pub fn get(&self, key: &K) -> Option<&V> {
        self.groups.get(key)
    }

    /// Mutable value of the given key if present
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.groups.get_mut(key)
    }

    /// Value of the given key
    ///
    /// # Errors
    ///
    /// [PatchworkError::PreconditionError] if the key is absent
    pub fn at(&self, key: &K) -> Result<&V>
    where
        K: Debug,
    {
        self.groups.get(key).ok_or_else(|| {
            PatchworkError::PreconditionError(format!("no group with key {key:?}"))
        })
    }

    /// Whether the key is present
    pub fn contains_key(&self, key: &K) -> bool {
        self.groups.contains_key(key)
    }

    /// Keys in ascending order
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.groups.keys().cloned().collect()
    }

    /// Values in ascending key order
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.groups.values()
    }

    /// Number of groups
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether there is no group
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Iterate over (key, value) pairs in ascending key order
    pub fn iter(&self) -> btree_map::Iter<'_, K, V> {
        self.groups.iter()
    }

    /// Whether both containers hold exactly the same keys
    pub fn same_keys<W>(&self, other: &Grouped<K, W>) -> bool {
        self.len() == other.len() && self.groups.keys().eq(other.groups.keys())
    }

    /// Map every value given its key, groups are processed in parallel.
    pub fn apply<'a, W, G>(&'a self, f: G) -> Grouped<K, W>
    where
        K: Clone + Send + Sync,
        V: Sync,
        W: Send,
        G: Fn(&'a K, &'a V) -> W + Sync + Send,
    {
        let groups = self
            .groups
            .par_iter()
            .map(|(k, v)| (k.clone(), f(k, v)))
            .collect::<BTreeMap<_, _>>();
        Grouped { groups }
    }

    /// Fallible version of [Grouped::apply], the first error met is returned.
    pub fn try_apply<'a, W, E, G>(&'a self, f: G) -> std::result::Result<Grouped<K, W>, E>
    where
        K: Clone + Send + Sync,
        V: Sync,
        W: Send,
        E: Send,
        G: Fn(&'a K, &'a V) -> std::result::Result<W, E> + Sync + Send,
    {
        let groups = self
            .groups
            .par_iter()
            .map(|(k, v)| f(k, v).map(|w| (k.clone(), w)))
            .collect::<std::result::Result<BTreeMap<_, _>, E>>()?;
        Ok(Grouped { groups })
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for Grouped<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Grouped {
            groups: iter.into_iter().collect(),
        }
    }
}

impl<K: Ord, V> IntoIterator for Grouped<K, V> {
    type Item = (K, V);
    type IntoIter = btree_map::IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_iter()
    }
}

impl<'a, K: Ord, V> IntoIterator for &'a Grouped<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = btree_map::Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

/// Row indices of `x` per group key, in ascending row order within each group
pub fn group_indices<F: Float, K: Ord>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    grouper: impl Fn(&ArrayView1<F>) -> K,
) -> Grouped<K, Vec<usize>> {
    let mut indices: Grouped<K, Vec<usize>> = Grouped::new();
    for (i, row) in x.rows().into_iter().enumerate() {
        let key = grouper(&row);
        match indices.get_mut(&key) {
            Some(rows) => rows.push(i),
            None => {
                indices.insert(key, vec![i]);
            }
        }
    }
    indices
}

/// Partition `(x, y)` rows into one dataset per group key.
/// Every row lands in exactly one group and row order is kept within a group.
///
/// # Errors
///
/// [PatchworkError::PreconditionError] if `x` and `y` lengths differ
pub fn group_by<F: Float, K: Ord>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    y: &ArrayBase<impl Data<Elem = F>, Ix1>,
    grouper: impl Fn(&ArrayView1<F>) -> K,
) -> Result<Grouped<K, DatasetBase<Array2<F>, Array1<F>>>> {
    if x.nrows() != y.len() {
        return Err(PatchworkError::PreconditionError(format!(
            "{} features for {} targets",
            x.nrows(),
            y.len()
        )));
    }
    let datasets = group_indices(x, grouper)
        .into_iter()
        .map(|(key, rows)| {
            let ds = DatasetBase::new(x.select(Axis(0), &rows), y.select(Axis(0), &rows));
            (key, ds)
        })
        .collect();
    Ok(datasets)
}
