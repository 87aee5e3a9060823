use crate::errors::{PatchworkError, Result};
use crate::features::{as_boundary_features, PatchworkFeature};
use crate::functions::PatchworkFunctions;
use linfa::Float;

use log::trace;

/// Boundary features between every pair of distinct groups.
///
/// For each pair `keys[i] < keys[j]`, the locations given by
/// `functions.boundary_among(keys, keys[i], keys[j])` are tagged with `lhs = keys[i]` and
/// `rhs = keys[j]`, pairs are concatenated in lexicographic `(i, j)` order.
///
/// # Errors
///
/// * [PatchworkError::ShapeMismatch] if a boundary location has not `nx` components,
/// * [PatchworkError::PreconditionError] if there are several groups but
///   no boundary location at all.
pub fn build_boundary_features<F: Float, P: PatchworkFunctions<F>>(
    functions: &P,
    keys: &[P::Key],
    nx: usize,
) -> Result<Vec<PatchworkFeature<P::Key, F>>> {
    let mut features = Vec::new();
    for (i, lhs) in keys.iter().enumerate() {
        for rhs in keys.iter().skip(i + 1) {
            let locations = functions.boundary_among(keys, lhs, rhs);
            if locations.nrows() > 0 && locations.ncols() != nx {
                return Err(PatchworkError::ShapeMismatch(format!(
                    "boundary between {:?} and {:?} has {} components, expected {}",
                    lhs,
                    rhs,
                    locations.ncols(),
                    nx
                )));
            }
            trace!("{} boundary points between {lhs:?} and {rhs:?}", locations.nrows());
            features.extend(as_boundary_features(lhs, rhs, &locations)?);
        }
    }
    if features.is_empty() && keys.len() > 1 {
        return Err(PatchworkError::PreconditionError(format!(
            "no boundary between any pair of the {} groups",
            keys.len()
        )));
    }
    Ok(features)
}
