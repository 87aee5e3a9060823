//! Algebra on block matrices partitioned by group.
//!
//! A block diagonal matrix `A` and a block column `B` are both stored as one
//! dense block per group key. Per-key products and solves are computed in
//! parallel, reductions sum the per-key terms in ascending key order.

use crate::errors::{PatchworkError, Result};
use crate::grouped::Grouped;
use linfa::Float;
use ndarray::Array2;
use patchbox_gp::Ldlt;
use rayon::prelude::*;
use std::fmt::Debug;

/// Something able to solve `A x = rhs` for a fixed block `A`
pub trait BlockSolver<F: Float>: Sync {
    /// Solve the system for every column of `rhs`
    fn solve_block(&self, rhs: &Array2<F>) -> Result<Array2<F>>;
}

impl<F: Float> BlockSolver<F> for Ldlt<F> {
    fn solve_block(&self, rhs: &Array2<F>) -> Result<Array2<F>> {
        Ok(self.solve(rhs)?)
    }
}

impl<F: Float, T: BlockSolver<F>> BlockSolver<F> for &T {
    fn solve_block(&self, rhs: &Array2<F>) -> Result<Array2<F>> {
        (**self).solve_block(rhs)
    }
}

fn check_keys<K: Ord + Debug + Clone, A, B>(
    lhs: &Grouped<K, A>,
    rhs: &Grouped<K, B>,
) -> Result<()> {
    if lhs.is_empty() {
        return Err(PatchworkError::PreconditionError(
            "block operation on an empty set of groups".to_string(),
        ));
    }
    if !lhs.same_keys(rhs) {
        return Err(PatchworkError::ShapeMismatch(format!(
            "block operands with different groups {:?} and {:?}",
            lhs.keys(),
            rhs.keys()
        )));
    }
    Ok(())
}

/// Sum over groups of `f(key, lhs[key], rhs[key])`.
///
/// # Errors
///
/// * [PatchworkError::PreconditionError] when there is no group,
/// * [PatchworkError::ShapeMismatch] when key sets differ or per key terms
///   have different shapes.
pub fn block_accumulate<K, A, B, F, G>(
    lhs: &Grouped<K, A>,
    rhs: &Grouped<K, B>,
    f: G,
) -> Result<Array2<F>>
where
    K: Ord + Debug + Clone + Sync,
    A: Sync,
    B: Sync,
    F: Float,
    G: Fn(&K, &A, &B) -> Result<Array2<F>> + Sync,
{
    check_keys(lhs, rhs)?;
    let blocks: Vec<(&K, &A, &B)> = lhs
        .iter()
        .zip(rhs.values())
        .map(|((k, a), b)| (k, a, b))
        .collect();
    let terms = blocks
        .par_iter()
        .map(|(k, a, b)| f(k, a, b))
        .collect::<Result<Vec<_>>>()?;

    let mut terms = terms.into_iter();
    let mut acc = terms.next().unwrap_or_else(|| Array2::zeros((0, 0)));
    for term in terms {
        if term.dim() != acc.dim() {
            return Err(PatchworkError::ShapeMismatch(format!(
                "cannot accumulate a {:?} block into a {:?} sum",
                term.dim(),
                acc.dim()
            )));
        }
        acc += &term;
    }
    Ok(acc)
}

/// `sum_k lhs[k] . rhs[k]`
pub fn block_product<K, F>(
    lhs: &Grouped<K, Array2<F>>,
    rhs: &Grouped<K, Array2<F>>,
) -> Result<Array2<F>>
where
    K: Ord + Debug + Clone + Sync,
    F: Float,
{
    block_accumulate(lhs, rhs, |k, x, y| {
        if x.ncols() != y.nrows() {
            return Err(PatchworkError::ShapeMismatch(format!(
                "group {:?}: cannot multiply {:?} by {:?}",
                k,
                x.dim(),
                y.dim()
            )));
        }
        Ok(x.dot(y))
    })
}

/// `sum_k lhs[k]^t . rhs[k]`
pub fn block_inner_product<K, F>(
    lhs: &Grouped<K, Array2<F>>,
    rhs: &Grouped<K, Array2<F>>,
) -> Result<Array2<F>>
where
    K: Ord + Debug + Clone + Sync,
    F: Float,
{
    block_accumulate(lhs, rhs, |k, x, y| {
        if x.nrows() != y.nrows() {
            return Err(PatchworkError::ShapeMismatch(format!(
                "group {:?}: cannot multiply transposed {:?} by {:?}",
                k,
                x.dim(),
                y.dim()
            )));
        }
        Ok(x.t().dot(y))
    })
}

/// Per key `lhs[k] . rhs[k]` without reduction
pub fn block_diagonal_product<K, F>(
    lhs: &Grouped<K, Array2<F>>,
    rhs: &Grouped<K, Array2<F>>,
) -> Result<Grouped<K, Array2<F>>>
where
    K: Ord + Debug + Clone + Send + Sync,
    F: Float,
{
    check_keys(lhs, rhs)?;
    rhs.try_apply(|k, y| {
        let x = lhs.at(k)?;
        if x.ncols() != y.nrows() {
            return Err(PatchworkError::ShapeMismatch(format!(
                "group {:?}: cannot multiply {:?} by {:?}",
                k,
                x.dim(),
                y.dim()
            )));
        }
        Ok(x.dot(y))
    })
}

/// Per key `solvers[k]^-1 . rhs[k]`
pub fn block_solve<K, F, S>(
    solvers: &Grouped<K, S>,
    rhs: &Grouped<K, Array2<F>>,
) -> Result<Grouped<K, Array2<F>>>
where
    K: Ord + Debug + Clone + Send + Sync,
    F: Float,
    S: BlockSolver<F>,
{
    check_keys(solvers, rhs)?;
    rhs.try_apply(|k, y| solvers.at(k)?.solve_block(y))
}
