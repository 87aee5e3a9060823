//! Covariance between tagged features.
//!
//! Given the covariance function `k` shared by the independent per-group
//! processes, the covariance of two observations follows from which groups
//! they observe:
//!
//! | x \ y              | Group(ky)                    | Boundary(yl, yr)                                  |
//! |--------------------|------------------------------|---------------------------------------------------|
//! | Group(kx)          | `k` if kx == ky, else `0`    | `k` if kx == yl, `-k` if kx == yr, else `0`       |
//! | Boundary(xl, xr)   | symmetric                    | `([xl==yl] - [xl==yr] - [xr==yl] + [xr==yr]) k`   |
//!
//! Two raw features fall back to `k`; a raw feature cannot be compared with a
//! tagged one.

use crate::errors::{PatchworkError, Result};
use crate::features::{BoundaryFeature, PatchworkFeature};
use linfa::Float;
use ndarray::{Array1, Array2};
use patchbox_gp::CovarianceFunction;
use rayon::prelude::*;

fn indicator<K: PartialEq>(a: &K, b: &K) -> i32 {
    i32::from(a == b)
}

/// Sign of the covariance between the process of group `key` and a boundary
fn group_boundary_sign<K: PartialEq, F: Float>(key: &K, b: &BoundaryFeature<K, F>) -> i32 {
    indicator(key, b.lhs()) - indicator(key, b.rhs())
}

/// Sign of the covariance between two boundaries
fn boundary_boundary_sign<K: PartialEq, F: Float>(
    x: &BoundaryFeature<K, F>,
    y: &BoundaryFeature<K, F>,
) -> i32 {
    indicator(x.lhs(), y.lhs()) - indicator(x.lhs(), y.rhs()) - indicator(x.rhs(), y.lhs())
        + indicator(x.rhs(), y.rhs())
}

fn signed<F: Float, Cov: CovarianceFunction<F>>(
    sign: i32,
    cov: &Cov,
    x: &Array1<F>,
    y: &Array1<F>,
) -> F {
    if sign == 0 {
        F::zero()
    } else {
        F::cast(sign) * cov.call(x, y)
    }
}

/// Covariance between two tagged features
///
/// # Errors
///
/// [PatchworkError::PreconditionError] when a raw feature is paired with a tagged one
pub fn patchwork_covariance<K: PartialEq, F: Float, Cov: CovarianceFunction<F>>(
    cov: &Cov,
    x: &PatchworkFeature<K, F>,
    y: &PatchworkFeature<K, F>,
) -> Result<F> {
    use PatchworkFeature::*;
    match (x, y) {
        (Raw(a), Raw(b)) => Ok(cov.call(a, b)),
        (Group(a), Group(b)) => Ok(signed(
            indicator(&a.key, &b.key),
            cov,
            &a.feature,
            &b.feature,
        )),
        (Group(g), Boundary(b)) => Ok(signed(
            group_boundary_sign(&g.key, b),
            cov,
            &g.feature,
            b.feature(),
        )),
        (Boundary(b), Group(g)) => Ok(signed(
            group_boundary_sign(&g.key, b),
            cov,
            b.feature(),
            &g.feature,
        )),
        (Boundary(a), Boundary(b)) => Ok(signed(
            boundary_boundary_sign(a, b),
            cov,
            a.feature(),
            b.feature(),
        )),
        (Raw(_), _) | (_, Raw(_)) => Err(PatchworkError::PreconditionError(
            "covariance between a raw feature and a group tagged feature is undefined".to_string(),
        )),
    }
}

/// Covariance matrix between two lists of tagged features, rows are computed in parallel
pub fn patchwork_covariance_matrix<K, F, Cov>(
    cov: &Cov,
    xs: &[PatchworkFeature<K, F>],
    ys: &[PatchworkFeature<K, F>],
) -> Result<Array2<F>>
where
    K: PartialEq + Sync,
    F: Float,
    Cov: CovarianceFunction<F>,
{
    let rows = xs
        .par_iter()
        .map(|x| {
            ys.iter()
                .map(|y| patchwork_covariance(cov, x, y))
                .collect::<Result<Vec<F>>>()
        })
        .collect::<Result<Vec<Vec<F>>>>()?;
    let values = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((xs.len(), ys.len()), values)
        .map_err(|e| PatchworkError::ShapeMismatch(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{as_boundary_features, GroupFeature};
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use patchbox_gp::SquaredExponential;

    fn group(key: i32, x: f64) -> PatchworkFeature<i32, f64> {
        GroupFeature::new(key, array![x]).into()
    }

    fn boundary(lhs: i32, rhs: i32, x: f64) -> PatchworkFeature<i32, f64> {
        BoundaryFeature::new(lhs, rhs, array![x]).unwrap().into()
    }

    #[test]
    fn test_dispatch_table() {
        let cov = SquaredExponential::new(1., 1.);
        let k = cov.call(&array![0.2], &array![0.7]);
        let eval = |x: PatchworkFeature<i32, f64>, y: PatchworkFeature<i32, f64>| {
            patchwork_covariance(&cov, &x, &y).unwrap()
        };

        // group x group
        assert_abs_diff_eq!(eval(group(0, 0.2), group(0, 0.7)), k);
        assert_abs_diff_eq!(eval(group(0, 0.2), group(1, 0.7)), 0.);
        // group x boundary
        assert_abs_diff_eq!(eval(group(0, 0.2), boundary(0, 1, 0.7)), k);
        assert_abs_diff_eq!(eval(group(1, 0.2), boundary(0, 1, 0.7)), -k);
        assert_abs_diff_eq!(eval(group(2, 0.2), boundary(0, 1, 0.7)), 0.);
        assert_abs_diff_eq!(eval(boundary(0, 1, 0.7), group(1, 0.2)), -k);
        // boundary x boundary
        assert_abs_diff_eq!(eval(boundary(0, 1, 0.2), boundary(0, 1, 0.7)), 2. * k);
        assert_abs_diff_eq!(eval(boundary(0, 1, 0.2), boundary(0, 2, 0.7)), k);
        assert_abs_diff_eq!(eval(boundary(0, 2, 0.2), boundary(1, 2, 0.7)), k);
        assert_abs_diff_eq!(eval(boundary(0, 1, 0.2), boundary(1, 2, 0.7)), -k);
        assert_abs_diff_eq!(eval(boundary(1, 2, 0.2), boundary(0, 1, 0.7)), -k);
        assert_abs_diff_eq!(eval(boundary(0, 1, 0.2), boundary(1, 0, 0.7)), -2. * k);
        assert_abs_diff_eq!(eval(boundary(0, 1, 0.2), boundary(2, 3, 0.7)), 0.);
        // raw x raw
        assert_abs_diff_eq!(
            eval(PatchworkFeature::Raw(array![0.2]), PatchworkFeature::Raw(array![0.7])),
            k
        );
    }

    #[test]
    fn test_dispatch_is_symmetric() {
        let cov = SquaredExponential::new(0.5, 2.);
        let features = vec![
            group(0, 0.1),
            group(1, -0.3),
            group(2, 0.8),
            boundary(0, 1, 0.),
            boundary(1, 2, 0.5),
            boundary(2, 0, 0.2),
        ];
        let c = patchwork_covariance_matrix(&cov, &features, &features).unwrap();
        assert_abs_diff_eq!(c, c.t(), epsilon = 1e-15);
    }

    #[test]
    fn test_boundary_antisymmetry() {
        let cov = SquaredExponential::new(0.5, 1.);
        let others = vec![
            group(0, 0.3),
            group(1, -0.2),
            boundary(0, 1, 0.4),
            boundary(1, 2, -0.1),
        ];
        let forward = as_boundary_features(&0, &1, &array![[0.1], [0.6]]).unwrap();
        let backward = as_boundary_features(&1, &0, &array![[0.1], [0.6]]).unwrap();
        let c_forward = patchwork_covariance_matrix(&cov, &forward, &others).unwrap();
        let c_backward = patchwork_covariance_matrix(&cov, &backward, &others).unwrap();
        assert_abs_diff_eq!(c_forward, -c_backward, epsilon = 1e-15);
    }

    #[test]
    fn test_raw_mixed_with_tagged_is_invalid() {
        let cov = SquaredExponential::new(1., 1.);
        let raw = PatchworkFeature::Raw(Array1::from_elem(1, 0.));
        assert!(matches!(
            patchwork_covariance(&cov, &raw, &group(0, 0.)),
            Err(PatchworkError::PreconditionError(_))
        ));
        assert!(matches!(
            patchwork_covariance(&cov, &boundary(0, 1, 0.), &raw),
            Err(PatchworkError::PreconditionError(_))
        ));
        assert!(patchwork_covariance_matrix(&cov, &[raw], &[group(0, 0.)]).is_err());
    }
}
