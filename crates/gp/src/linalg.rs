//! Symmetric indefinite factorization used to solve covariance systems.
//!
//! Covariance matrices built from boundary pseudo-observations are only
//! guaranteed to be symmetric semi-definite. Systems are factorized with an
//! unpivoted `L D L^t` first, and with a Bunch-Kaufman `P A P^t = L B L^t`
//! (1x1 and 2x2 diagonal blocks) when a pivot of the former vanishes.

use crate::errors::{GpError, Result};
use faer::diag::DiagRef;
use faer::linalg::solvers::{Lblt as FaerLblt, Ldlt as FaerLdlt, Solve};
use faer::{Mat, MatRef, Side};
use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2};
use num_traits::ToPrimitive;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

enum SymmetricFactor {
    Empty,
    Ldlt(FaerLdlt<f64>),
    Lblt(FaerLblt<f64>),
}

/// Factorization of a square symmetric matrix, computed in double precision.
#[derive(Clone)]
pub struct Ldlt<F: Float> {
    factor: Arc<SymmetricFactor>,
    dim: usize,
    phantom: PhantomData<F>,
}

impl<F: Float> fmt::Debug for Ldlt<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match *self.factor {
            SymmetricFactor::Empty => "empty",
            SymmetricFactor::Ldlt(_) => "ldlt",
            SymmetricFactor::Lblt(_) => "lblt",
        };
        f.debug_struct("Ldlt")
            .field("dim", &self.dim)
            .field("kind", &kind)
            .finish()
    }
}

fn to_faer<F: Float>(a: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Mat<f64> {
    Mat::from_fn(a.nrows(), a.ncols(), |i, j| {
        a[[i, j]].to_f64().unwrap_or(f64::NAN)
    })
}

fn from_faer<F: Float>(m: MatRef<'_, f64>) -> Array2<F> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| F::cast(m[(i, j)]))
}

fn diag_to_vec(diag: DiagRef<'_, f64>) -> Vec<f64> {
    let mat = diag.column_vector().as_mat();
    (0..mat.nrows()).map(|i| mat[(i, 0)]).collect()
}

/// First vanishing pivot of `D`
fn singular_pivot(d: &[f64], tol: f64) -> Option<(usize, f64)> {
    d.iter()
        .enumerate()
        .find(|(_, v)| !v.is_finite() || v.abs() <= tol)
        .map(|(k, &v)| (k, v))
}

/// First vanishing pivot of a block diagonal `B` given its diagonal and sub-diagonal
fn singular_block(diag: &[f64], subdiag: &[f64], tol: f64) -> Option<(usize, f64)> {
    let n = diag.len();
    let mut k = 0;
    while k < n {
        if k + 1 < n && subdiag[k] != 0. {
            let (a, b, c) = (diag[k], subdiag[k], diag[k + 1]);
            let half_trace = (a + c) / 2.;
            let root = (half_trace * half_trace - (a * c - b * b)).max(0.).sqrt();
            // eigenvalues are half_trace +/- root
            let smallest = (half_trace.abs() - root).abs();
            if !smallest.is_finite() || smallest <= tol {
                return Some((k + 1, smallest));
            }
            k += 2;
        } else {
            if !diag[k].is_finite() || diag[k].abs() <= tol {
                return Some((k, diag[k]));
            }
            k += 1;
        }
    }
    None
}

impl<F: Float> Ldlt<F> {
    /// Factorize the symmetric matrix `a`, only its lower triangle is read.
    ///
    /// # Errors
    ///
    /// * [GpError::ShapeMismatch] when `a` is not square,
    /// * [GpError::SingularMatrix] when a pivot vanishes relatively to the largest diagonal
    ///   element or is not finite.
    pub fn new(a: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Ldlt<F>> {
        if a.nrows() != a.ncols() {
            return Err(GpError::ShapeMismatch(format!(
                "LDLt requires a square matrix, got {:?}",
                a.dim()
            )));
        }
        let n = a.nrows();
        if n == 0 {
            return Ok(Ldlt {
                factor: Arc::new(SymmetricFactor::Empty),
                dim: 0,
                phantom: PhantomData,
            });
        }

        let mat = to_faer(a);
        let scale = (0..n).fold(0f64, |acc, i| acc.max(mat[(i, i)].abs()));
        let tol = scale * f64::EPSILON * n as f64;

        let factor = match FaerLdlt::new(mat.as_ref(), Side::Lower) {
            Ok(ldlt) if singular_pivot(&diag_to_vec(ldlt.D()), tol).is_none() => {
                SymmetricFactor::Ldlt(ldlt)
            }
            _ => {
                let lblt = FaerLblt::new(mat.as_ref(), Side::Lower);
                let diag = diag_to_vec(lblt.B_diag());
                let subdiag = diag_to_vec(lblt.B_subdiag());
                if let Some((pivot, value)) = singular_block(&diag, &subdiag, tol) {
                    return Err(GpError::SingularMatrix { pivot, value });
                }
                SymmetricFactor::Lblt(lblt)
            }
        };

        Ok(Ldlt {
            factor: Arc::new(factor),
            dim: n,
            phantom: PhantomData,
        })
    }

    /// Size of the factorized matrix
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Whether the Bunch-Kaufman fallback was needed
    pub fn is_pivoted(&self) -> bool {
        matches!(*self.factor, SymmetricFactor::Lblt(_))
    }

    /// Solve `A x = b` for every column of `b`
    pub fn solve(&self, b: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        if b.nrows() != self.dim {
            return Err(GpError::ShapeMismatch(format!(
                "LDLt of size {} cannot solve a right hand side with {} rows",
                self.dim,
                b.nrows()
            )));
        }
        let rhs = to_faer(b);
        let x = match &*self.factor {
            SymmetricFactor::Empty => return Ok(Array2::zeros(b.raw_dim())),
            SymmetricFactor::Ldlt(ldlt) => ldlt.solve(rhs.as_ref()),
            SymmetricFactor::Lblt(lblt) => lblt.solve(rhs.as_ref()),
        };
        Ok(from_faer(x.as_ref()))
    }

    /// Solve `A x = b` for a single right hand side
    pub fn solve_vec(&self, b: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Result<Array1<F>> {
        let x = self.solve(&b.view().insert_axis(Axis(1)))?;
        Ok(x.column(0).to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array};
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use rand_xoshiro::Xoshiro256Plus;

    #[test]
    fn test_ldlt_spd_solve() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let m = Array::random_using((6, 6), Uniform::new(-1., 1.), &mut rng);
        let a = m.dot(&m.t()) + Array2::<f64>::eye(6);
        let b = Array::random_using((6, 2), Uniform::new(-1., 1.), &mut rng);

        let ldlt = Ldlt::new(&a).expect("LDLt factorization");
        assert!(!ldlt.is_pivoted());
        let x = ldlt.solve(&b).expect("LDLt solve");
        assert_abs_diff_eq!(a.dot(&x), b, epsilon = 1e-10);
    }

    #[test]
    fn test_ldlt_indefinite_solve() {
        let a = array![[1., 2., 0.], [2., -3., 1.], [0., 1., 4.]];
        let b = array![1., -1., 2.];
        let ldlt = Ldlt::new(&a).expect("LDLt factorization");
        let x = ldlt.solve_vec(&b).expect("LDLt solve");
        assert_abs_diff_eq!(a.dot(&x), b, epsilon = 1e-12);
    }

    #[test]
    fn test_ldlt_zero_diagonal_needs_pivoting() {
        let a = array![[0., 1., 0.], [1., 2., 0.], [0., 0., 3.]];
        let b = array![[1.], [0.], [3.]];
        let ldlt = Ldlt::new(&a).expect("LDLt factorization");
        assert!(ldlt.is_pivoted());
        assert_abs_diff_eq!(a.dot(&ldlt.solve(&b).unwrap()), b, epsilon = 1e-12);
    }

    #[test]
    fn test_ldlt_singular() {
        let a = array![[1., 1.], [1., 1.]];
        assert!(matches!(
            Ldlt::new(&a),
            Err(GpError::SingularMatrix { .. })
        ));
        assert!(matches!(
            Ldlt::new(&Array2::<f64>::zeros((3, 3))),
            Err(GpError::SingularMatrix { .. })
        ));
        // rank deficient semi-definite matrix
        let v = array![[1., 2., 3.]];
        assert!(Ldlt::new(&v.t().dot(&v)).is_err());
    }

    #[test]
    fn test_ldlt_shape_errors() {
        assert!(matches!(
            Ldlt::new(&Array2::<f64>::zeros((2, 3))),
            Err(GpError::ShapeMismatch(_))
        ));
        let ldlt = Ldlt::new(&Array2::<f64>::eye(2)).unwrap();
        assert!(matches!(
            ldlt.solve(&Array2::<f64>::zeros((3, 1))),
            Err(GpError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_ldlt_empty() {
        let ldlt = Ldlt::new(&Array2::<f64>::zeros((0, 0))).unwrap();
        assert_eq!(ldlt.dim(), 0);
        assert_eq!(ldlt.solve(&Array2::<f64>::zeros((0, 2))).unwrap().dim(), (0, 2));
    }

    #[test]
    fn test_ldlt_single_precision() {
        let a = array![[4f32, 1.], [1., 3.]];
        let b = array![1f32, 2.];
        let x = Ldlt::new(&a).unwrap().solve_vec(&b).unwrap();
        assert_abs_diff_eq!(a.dot(&x), b, epsilon = 1e-5);
    }
}
