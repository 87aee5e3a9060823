use crate::covariance_functions::CovarianceFunction;
use crate::distribution::{JointDistribution, MarginalDistribution};
use crate::errors::{GpError, Result};
use crate::linalg::Ldlt;
use crate::parameters::{GpParams, GpValidParams};
use crate::utils::{covariance_matrix, symmetric_covariance_matrix};

use linfa::prelude::{DatasetBase, Fit, Float, PredictInplace};
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2, Zip};

use log::debug;
use std::fmt;
use std::time::Instant;

/// A zero mean gaussian process regressor conditioned on noisy observations.
///
/// Given training features `X`, targets `y`, a covariance function `k` and a
/// nugget `s2` (the observation noise variance), the fitted model caches
/// the factorization of `K = k(X, X) + s2 * I` and the information vector
/// `K^-1 y`. The posterior at query features `Q` is:
///
/// * mean: `k(Q, X) K^-1 y`
/// * covariance: `k(Q, Q) - k(Q, X) K^-1 k(X, Q)`
///
/// # Example
///
/// ```no_run
/// use patchbox_gp::{GaussianProcess, SquaredExponential};
/// use linfa::prelude::*;
/// use ndarray::{arr2, Array, Array1, Array2, Axis};
///
/// // one-dimensional test function to approximate
/// fn xsinx(x: &Array2<f64>) -> Array1<f64> {
///     ((x - 3.5) * ((x - 3.5) / std::f64::consts::PI).mapv(|v| v.sin())).remove_axis(Axis(1))
/// }
///
/// // training data
/// let xt = arr2(&[[0.0], [5.0], [10.0], [15.0], [18.0], [20.0], [25.0]]);
/// let yt = xsinx(&xt);
///
/// // GP with squared exponential covariance function
/// let gp = GaussianProcess::<f64, _>::params(SquaredExponential::new(4., 10.))
///     .nugget(1e-8)
///     .fit(&Dataset::new(xt, yt))
///     .expect("GP fitted");
///
/// // predict values and variances
/// let xtest = Array::linspace(0., 25., 26).insert_axis(Axis(1));
/// let ypred = gp.predict(&xtest).expect("GP prediction");
/// let yvariances = gp.predict_var(&xtest).expect("GP prediction");
/// ```
#[derive(Debug, Clone)]
pub struct GaussianProcess<F: Float, Cov: CovarianceFunction<F>> {
    /// Training inputs
    train_features: Array2<F>,
    /// Training outputs
    train_targets: Array1<F>,
    /// Factorization of the training covariance `k(X, X) + nugget * I`
    train_covariance: Ldlt<F>,
    /// Solution of the linear equation system : `K x = y`
    information: Array1<F>,
    /// Parameters used to fit this model
    params: GpValidParams<F, Cov>,
}

impl<F: Float, Cov: CovarianceFunction<F>> fmt::Display for GaussianProcess<F, Cov> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "GP(cov={}, nugget={}, n_train={})",
            self.params.cov,
            self.params.nugget,
            self.train_features.nrows()
        )
    }
}

impl<F: Float, Cov: CovarianceFunction<F>> GaussianProcess<F, Cov> {
    /// Gp parameters contructor
    pub fn params(cov: Cov) -> GpParams<F, Cov> {
        GpParams::new(cov)
    }

    fn check_features(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<()> {
        if x.ncols() != self.train_features.ncols() {
            return Err(GpError::ShapeMismatch(format!(
                "expected features with {} components, got {}",
                self.train_features.ncols(),
                x.ncols()
            )));
        }
        Ok(())
    }

    /// Predict output values at n given `x` points of nx components specified as a (n, nx) matrix.
    /// Returns n scalar output values as a vector (n,).
    pub fn predict(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array1<F>> {
        self.check_features(x)?;
        let k_qt = covariance_matrix(&self.params.cov, &x.view(), &self.train_features);
        Ok(k_qt.dot(&self.information))
    }

    /// Predict variance values at n given `x` points of nx components specified as a (n, nx) matrix.
    /// Returns n variance values as (n,) column vector.
    pub fn predict_var(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array1<F>> {
        self.check_features(x)?;
        let k_qt = covariance_matrix(&self.params.cov, &x.view(), &self.train_features);
        self.compute_variances(x, &k_qt)
    }

    /// Predict both output values and variance at n given `x` points of nx components
    pub fn predict_valvar(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<(Array1<F>, Array1<F>)> {
        self.check_features(x)?;
        let k_qt = covariance_matrix(&self.params.cov, &x.view(), &self.train_features);
        let values = k_qt.dot(&self.information);
        let variances = self.compute_variances(x, &k_qt)?;
        Ok((values, variances))
    }

    /// Predict the joint posterior distribution (mean and dense covariance) at `x` points
    pub fn predict_joint(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<JointDistribution<F>> {
        self.check_features(x)?;
        let x = x.view();
        let k_qt = covariance_matrix(&self.params.cov, &x, &self.train_features);
        let mean = k_qt.dot(&self.information);
        let explained = k_qt.dot(&self.train_covariance.solve(&k_qt.t())?);
        let covariance = symmetric_covariance_matrix(&self.params.cov, &x) - explained;
        JointDistribution::with_covariance(mean, covariance)
    }

    /// Predict the marginal posterior distribution (mean and variances) at `x` points
    pub fn predict_marginal(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<MarginalDistribution<F>> {
        let (mean, variances) = self.predict_valvar(x)?;
        MarginalDistribution::with_covariance(mean, variances)
    }

    fn compute_variances(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        k_qt: &Array2<F>,
    ) -> Result<Array1<F>> {
        let weights = self.train_covariance.solve(&k_qt.t())?;
        let explained = (k_qt * &weights.t()).sum_axis(Axis(1));
        let mut variances = Array1::zeros(x.nrows());
        Zip::from(&mut variances)
            .and(x.rows())
            .and(&explained)
            .for_each(|v, xi, &e| {
                let prior = self.params.cov.call(&xi, &xi);
                // Posterior variance might be slightly negative depending on
                // machine precision: set to zero in that case
                *v = if prior - e < F::zero() {
                    F::zero()
                } else {
                    prior - e
                };
            });
        Ok(variances)
    }

    /// Training inputs as a (n, nx) matrix
    pub fn train_features(&self) -> &Array2<F> {
        &self.train_features
    }

    /// Training outputs as a (n,) vector
    pub fn train_targets(&self) -> &Array1<F> {
        &self.train_targets
    }

    /// Cached factorization of the training covariance including the nugget
    pub fn train_covariance(&self) -> &Ldlt<F> {
        &self.train_covariance
    }

    /// Information vector `K^-1 y`
    pub fn information(&self) -> &Array1<F> {
        &self.information
    }

    /// Covariance function of the prior
    pub fn covariance_function(&self) -> &Cov {
        &self.params.cov
    }

    /// Observation noise variance used at training
    pub fn nugget(&self) -> F {
        self.params.nugget
    }

    /// Number of training points
    pub fn n_train(&self) -> usize {
        self.train_features.nrows()
    }

    /// Retrieve input and output dimensions
    pub fn dims(&self) -> (usize, usize) {
        (self.train_features.ncols(), 1)
    }
}

impl<F, D, Cov> PredictInplace<ArrayBase<D, Ix2>, Array1<F>> for GaussianProcess<F, Cov>
where
    F: Float,
    D: Data<Elem = F>,
    Cov: CovarianceFunction<F>,
{
    fn predict_inplace(&self, x: &ArrayBase<D, Ix2>, y: &mut Array1<F>) {
        assert_eq!(
            x.nrows(),
            y.len(),
            "The number of data points must match the number of output targets."
        );

        let values = self.predict(x).expect("GP Prediction");
        *y = values;
    }

    fn default_target(&self, x: &ArrayBase<D, Ix2>) -> Array1<F> {
        Array1::zeros((x.nrows(),))
    }
}

impl<F: Float, Cov: CovarianceFunction<F>, D: Data<Elem = F>>
    Fit<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>, GpError> for GpValidParams<F, Cov>
{
    type Object = GaussianProcess<F, Cov>;

    /// Condition the zero mean prior on the training data
    fn fit(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>>,
    ) -> Result<Self::Object> {
        let x = dataset.records().to_owned();
        let y = dataset.targets().to_owned();

        if x.nrows() == 0 {
            return Err(GpError::InvalidValueError(
                "cannot fit a GP without training data".to_string(),
            ));
        }
        if x.nrows() != y.len() {
            return Err(GpError::ShapeMismatch(format!(
                "{} training features for {} targets",
                x.nrows(),
                y.len()
            )));
        }

        let now = Instant::now();
        let mut k = symmetric_covariance_matrix(&self.cov, &x);
        k.diag_mut().mapv_inplace(|v| v + self.nugget);
        let train_covariance = Ldlt::new(&k)?;
        let information = train_covariance.solve_vec(&y)?;
        debug!(
            "GP fitted on {} points in {:?}ms (pivoted: {})",
            x.nrows(),
            now.elapsed().as_millis(),
            train_covariance.is_pivoted()
        );

        Ok(GaussianProcess {
            train_features: x,
            train_targets: y,
            train_covariance,
            information,
            params: self.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::covariance_functions::*;
    use approx::assert_abs_diff_eq;
    use linfa::prelude::Dataset;
    use linfa::ParamGuard;
    use ndarray::{array, Array};
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use paste::paste;
    use rand_xoshiro::Xoshiro256Plus;

    fn xsinx(x: &Array2<f64>) -> Array1<f64> {
        ((x - 3.5) * ((x - 3.5) / std::f64::consts::PI).mapv(|v| v.sin())).remove_axis(Axis(1))
    }

    macro_rules! test_gp {
        ($cov:ident) => {
            paste! {
                #[test]
                fn [<test_gp_ $cov:snake>]() {
                    let xt = array![[0.0], [5.0], [10.0], [15.0], [18.0], [20.0], [25.0]];
                    let yt = xsinx(&xt);
                    let gp = GaussianProcess::<f64, _>::params($cov::new(5., 10.))
                        .nugget(1e-10)
                        .fit(&Dataset::new(xt.clone(), yt.clone()))
                        .expect("GP fit error");

                    // interpolation at training points
                    let yvals = gp.predict(&xt).expect("prediction error");
                    assert_abs_diff_eq!(yvals, yt, epsilon = 1e-4);
                    let yvars = gp.predict_var(&xt).expect("prediction error");
                    assert_abs_diff_eq!(yvars, Array1::<f64>::zeros(7), epsilon = 1e-4);

                    // uncertainty away from training points
                    let xv = array![[2.5], [12.5]];
                    let yvars = gp.predict_var(&xv).expect("prediction error");
                    assert!(yvars.iter().all(|&v| v > 1e-6 && v < 100.));
                }
            }
        };
    }

    test_gp!(SquaredExponential);
    test_gp!(Exponential);
    test_gp!(Matern32);
    test_gp!(Matern52);

    #[test]
    fn test_joint_and_marginal_agree() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let xt = Array::random_using((10, 2), Uniform::new(-1., 1.), &mut rng);
        let yt = xt.column(0).mapv(f64::sin) + xt.column(1).mapv(|v| v * v);
        let xv = Array::random_using((4, 2), Uniform::new(-1., 1.), &mut rng);

        let gp = GpParams::new(Matern52::new(0.8, 1.))
            .nugget(1e-4)
            .check()
            .unwrap()
            .fit(&Dataset::new(xt, yt))
            .expect("GP fit error");

        let joint = gp.predict_joint(&xv).expect("joint prediction");
        let marginal = gp.predict_marginal(&xv).expect("marginal prediction");
        let (values, variances) = gp.predict_valvar(&xv).expect("prediction");

        assert_abs_diff_eq!(joint.mean, values, epsilon = 1e-12);
        assert_abs_diff_eq!(marginal.mean, values, epsilon = 1e-12);
        let cov = joint.covariance.unwrap();
        assert_abs_diff_eq!(cov, cov.t(), epsilon = 1e-10);
        assert_abs_diff_eq!(cov.diag(), variances, epsilon = 1e-10);
        assert_abs_diff_eq!(marginal.covariance.unwrap(), variances, epsilon = 1e-12);
    }

    #[test]
    fn test_information_solves_training_system() {
        let xt = array![[0.], [0.5], [1.2]];
        let yt = array![1., -1., 2.];
        let gp = GaussianProcess::<f64, _>::params(Exponential::new(1., 1.))
            .nugget(0.1)
            .fit(&Dataset::new(xt.clone(), yt.clone()))
            .expect("GP fit error");

        let mut k = symmetric_covariance_matrix(gp.covariance_function(), &xt);
        k.diag_mut().mapv_inplace(|v| v + 0.1);
        assert_abs_diff_eq!(k.dot(gp.information()), yt, epsilon = 1e-12);
        assert_eq!(gp.train_targets(), &yt);
        assert_eq!(gp.dims(), (1, 1));
        assert_eq!(gp.n_train(), 3);
    }

    #[test]
    fn test_predict_inplace() {
        let xt = array![[0.], [1.]];
        let yt = array![1., 2.];
        let gp = GaussianProcess::<f64, _>::params(SquaredExponential::default())
            .fit(&Dataset::new(xt, yt))
            .expect("GP fit error");
        let xv = array![[0.5]];
        let mut y = gp.default_target(&xv);
        gp.predict_inplace(&xv, &mut y);
        assert_abs_diff_eq!(y, gp.predict(&xv).unwrap());
    }

    #[test]
    fn test_gp_errors() {
        let params = GaussianProcess::<f64, _>::params(Constant::new(1.)).nugget(0.);
        let xt = array![[0.], [1.]];
        let yt = array![1., 2.];
        // a constant covariance has rank one
        assert!(matches!(
            params.fit(&Dataset::new(xt.clone(), yt.clone())),
            Err(GpError::SingularMatrix { .. })
        ));

        let gp = GaussianProcess::<f64, _>::params(Exponential::default())
            .fit(&Dataset::new(xt, yt))
            .expect("GP fit error");
        assert!(matches!(
            gp.predict(&array![[0., 1.]]),
            Err(GpError::ShapeMismatch(_))
        ));

        let empty = Dataset::new(Array2::<f64>::zeros((0, 1)), Array1::zeros(0));
        assert!(GaussianProcess::<f64, _>::params(Exponential::default())
            .fit(&empty)
            .is_err());
    }

    #[test]
    fn test_display() {
        let gp = GaussianProcess::<f64, _>::params(Exponential::new(1., 1.))
            .nugget(0.5)
            .fit(&Dataset::new(array![[0.]], array![1.]))
            .expect("GP fit error");
        assert_eq!(
            gp.to_string(),
            "GP(cov=Exponential(length_scale=1, sigma=1), nugget=0.5, n_train=1)"
        );
    }
}
