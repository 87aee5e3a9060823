use crate::covariance_functions::CovarianceFunction;
use linfa::Float;
use ndarray::{Array2, ArrayBase, Axis, Data, Ix1, Ix2, Zip};

/// Euclidean distance between two points given as 1d arrays
/// *Panics* if x and y have not the same number of components
pub fn euclidean_distance<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix1>,
    y: &ArrayBase<impl Data<Elem = F>, Ix1>,
) -> F {
    assert!(x.len() == y.len());
    Zip::from(x)
        .and(y)
        .fold(F::zero(), |acc, &a, &b| acc + (a - b) * (a - b))
        .sqrt()
}

/// Computes the covariance matrix `k(x_i, y_j)` of shape (nrows(x), nrows(y)),
/// rows are computed in parallel.
/// *Panics* if x and y have not the same column numbers
pub fn covariance_matrix<F: Float, Cov: CovarianceFunction<F>>(
    cov: &Cov,
    x: &ArrayBase<impl Data<Elem = F> + Sync, Ix2>,
    y: &ArrayBase<impl Data<Elem = F> + Sync, Ix2>,
) -> Array2<F> {
    assert!(x.ncols() == y.ncols());
    let mut result = Array2::zeros((x.nrows(), y.nrows()));
    Zip::from(result.axis_iter_mut(Axis(0)))
        .and(x.rows())
        .par_for_each(|mut row, xi| {
            Zip::from(&mut row)
                .and(y.rows())
                .for_each(|r, yj| *r = cov.call(&xi, &yj));
        });
    result
}

/// Computes the symmetric covariance matrix `k(x_i, x_j)` of the given points
pub fn symmetric_covariance_matrix<F: Float, Cov: CovarianceFunction<F>>(
    cov: &Cov,
    x: &ArrayBase<impl Data<Elem = F> + Sync, Ix2>,
) -> Array2<F> {
    covariance_matrix(cov, x, x)
}
