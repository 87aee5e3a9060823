use crate::block::{block_inner_product, block_solve};
use crate::boundary::build_boundary_features;
use crate::dispatch::patchwork_covariance_matrix;
use crate::errors::{PatchworkError, Result};
use crate::features::{as_group_features, PatchworkFeature};
use crate::functions::PatchworkFunctions;
use crate::grouped::{group_by, group_indices, Grouped};
use crate::parameters::{PatchworkParams, PatchworkValidParams};

use linfa::prelude::{Fit, PredictInplace};
use linfa::{DatasetBase, Float, ParamGuard};
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2};
use patchbox_gp::{
    CovarianceFunction, GaussianProcess, GpError, JointDistribution, Ldlt, MarginalDistribution,
};

use log::{debug, info};
use std::fmt;
use std::time::Instant;

/// Patchwork Kriging model.
///
/// Training data are partitioned by the grouping functions and an independent
/// zero mean [GaussianProcess] is fitted on every group. At prediction time
/// the group processes are stitched together by conditioning them to agree
/// (`f_lhs(b) - f_rhs(b) = 0`) at boundary locations `b` between every pair
/// of groups, resulting in a globally consistent joint posterior.
///
/// With `D` the group tagged training features, `B` the boundary features and
/// `Q` the group tagged queries, prediction relies on the block diagonal
/// training covariance `C_dd` (one cached factorization per group) and on the
/// Schur complement `S_bb = C_bb - C_db^t C_dd^-1 C_db`:
///
/// * mean: `cross^t . solve(y)`,
/// * covariance: `C_qq - C_qb C_bb^-1 C_bq - cross^t . solve(cross)`,
///
/// where `cross = C_dq - C_db C_bb^-1 C_bq` and
/// `solve(r) = C_dd^-1 r + C_dd^-1 C_db S_bb^-1 C_db^t C_dd^-1 r`.
///
/// Reference:
///
/// Park, Chiwoo, and Daniel Apley. [Patchwork Kriging for Large-scale Gaussian Process Regression](https://arxiv.org/abs/1701.06655)
/// Journal of Machine Learning Research 19.7 (2018): 1-43.
///
/// # Example
///
/// ```no_run
/// use patchbox_gp::SquaredExponential;
/// use patchbox_patchwork::{IntervalFunctions, PatchworkGaussianProcess};
/// use linfa::prelude::*;
/// use ndarray::{Array, Axis};
///
/// let xt = Array::linspace(-1., 1., 20).insert_axis(Axis(1));
/// let yt = xt.column(0).mapv(|v: f64| (3. * v).sin());
///
/// // two groups, x < 0 and x >= 0, meeting at 0
/// let model = PatchworkGaussianProcess::params(
///     SquaredExponential::new(0.4, 1.),
///     IntervalFunctions::new(vec![0.]),
/// )
/// .nugget(1e-6)
/// .fit(&Dataset::new(xt, yt))
/// .expect("Patchwork GP fitted");
///
/// let xtest = Array::linspace(-1., 1., 50).insert_axis(Axis(1));
/// let prediction = model.predict_joint(&xtest).expect("Patchwork GP prediction");
/// ```
#[derive(Clone, Debug)]
pub struct PatchworkGaussianProcess<
    F: Float,
    Cov: CovarianceFunction<F>,
    P: PatchworkFunctions<F>,
> {
    /// One GP per group
    fit_models: Grouped<P::Key, GaussianProcess<F, Cov>>,
    /// Parameters used to fit this model
    params: PatchworkValidParams<F, Cov, P>,
}

fn numerical_error(system: &str, err: GpError) -> PatchworkError {
    match err {
        GpError::SingularMatrix { .. } => {
            PatchworkError::NumericalError(format!("cannot factorize {system}: {err}"))
        }
        err => err.into(),
    }
}

impl<F: Float, Cov: CovarianceFunction<F>, P: PatchworkFunctions<F>> fmt::Display
    for PatchworkGaussianProcess<F, Cov, P>
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "PatchworkGP(groups={}, cov={}, nugget={})",
            self.fit_models.len(),
            self.params.cov,
            self.params.nugget
        )
    }
}

impl<F: Float, Cov: CovarianceFunction<F>, P: PatchworkFunctions<F>>
    PatchworkGaussianProcess<F, Cov, P>
{
    /// Patchwork GP parameters contructor
    pub fn params(cov: Cov, functions: P) -> PatchworkParams<F, Cov, P> {
        PatchworkParams::new(cov, functions)
    }

    /// Build a model from already fitted group GPs
    ///
    /// # Errors
    ///
    /// * [PatchworkError::PreconditionError] if there is no group,
    /// * [PatchworkError::ShapeMismatch] if groups have different input dimensions.
    pub fn from_fit_models(
        params: PatchworkValidParams<F, Cov, P>,
        fit_models: Grouped<P::Key, GaussianProcess<F, Cov>>,
    ) -> Result<Self> {
        let dims: Vec<(usize, usize)> = fit_models.values().map(|gp| gp.dims()).collect();
        let mut dims = dims.into_iter();
        match dims.next() {
            None => {
                return Err(PatchworkError::PreconditionError(
                    "a patchwork model requires at least one group".to_string(),
                ))
            }
            Some(first) => {
                if dims.any(|d| d != first) {
                    return Err(PatchworkError::ShapeMismatch(
                        "group GPs trained on inputs of different dimensions".to_string(),
                    ));
                }
            }
        }
        Ok(PatchworkGaussianProcess { fit_models, params })
    }

    /// Predict the joint posterior at `x` points given as a (n, nx) matrix,
    /// rows of the distribution are in the order of the given points.
    pub fn predict_joint(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<JointDistribution<F>> {
        let (dist, order) = self.predict_joint_by_group(x)?;
        let mut inverse = vec![0; order.len()];
        for (pos, &i) in order.iter().enumerate() {
            inverse[i] = pos;
        }
        Ok(dist.subset(&inverse))
    }

    /// Predict output values at n given `x` points of nx components specified as a (n, nx) matrix.
    /// Returns n scalar output values as a vector (n,).
    pub fn predict(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array1<F>> {
        Ok(self.predict_joint(x)?.mean)
    }

    /// Predict variance values at n given `x` points of nx components specified as a (n, nx) matrix.
    /// Returns n variance values as (n,) column vector.
    pub fn predict_var(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array1<F>> {
        let marginal = self.predict_marginal(x)?;
        Ok(marginal
            .covariance
            .unwrap_or_else(|| Array1::zeros(marginal.mean.len())))
    }

    /// Predict the marginal posterior (mean and variances) at `x` points
    pub fn predict_marginal(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<MarginalDistribution<F>> {
        Ok(self.predict_joint(x)?.marginal())
    }

    /// Predict the joint posterior at `x` points given as a (n, nx) matrix.
    ///
    /// Points are routed to their nearest existing group and the rows of the
    /// returned distribution are ordered by group key, then by position within
    /// the group. The second member gives for each row the index of the
    /// corresponding point in `x`.
    ///
    /// # Errors
    ///
    /// * [PatchworkError::ShapeMismatch] if `x` has not the training input dimension
    ///   or a boundary has not the training input dimension,
    /// * [PatchworkError::ConfigurationError] if a point is routed to an unknown group,
    /// * [PatchworkError::PreconditionError] if no boundary joins the groups,
    /// * [PatchworkError::NumericalError] if a coupling system cannot be factorized.
    pub fn predict_joint_by_group(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<(JointDistribution<F>, Vec<usize>)> {
        let nx = self.dims().0;
        if x.ncols() != nx {
            return Err(PatchworkError::ShapeMismatch(format!(
                "expected points with {} components, got {}",
                nx,
                x.ncols()
            )));
        }
        if x.nrows() == 0 {
            let empty = JointDistribution::with_covariance(Array1::zeros(0), Array2::zeros((0, 0)))?;
            return Ok((empty, vec![]));
        }

        let cov = &self.params.cov;
        let functions = &self.params.functions;
        let keys = self.fit_models.keys();

        let routed = self.route(x)?;
        let order: Vec<usize> = routed.values().flatten().copied().collect();

        if let (1, Some(gp)) = (keys.len(), self.fit_models.values().next()) {
            debug!("Single group, no boundary");
            let dist = gp.predict_joint(&x.select(Axis(0), &order))?;
            return Ok((dist, order));
        }

        let now = Instant::now();
        let boundary = build_boundary_features(functions, &keys, nx)?;
        debug!(
            "{} groups coupled by {} boundary points",
            keys.len(),
            boundary.len()
        );

        let c_bb = patchwork_covariance_matrix(cov, &boundary, &boundary)?;
        let c_bb_ldlt = Ldlt::new(&c_bb).map_err(|e| numerical_error("C_bb", e))?;

        let c_dd = self.fit_models.apply(|_, gp| gp.train_covariance());
        let c_db = self.fit_models.try_apply(|key, gp| {
            let features = as_group_features(key, gp.train_features());
            patchwork_covariance_matrix(cov, &features, &boundary)
        })?;

        let c_dd_inv_c_db = block_solve(&c_dd, &c_db)?;
        let s_bb = &c_bb - &block_inner_product(&c_db, &c_dd_inv_c_db)?;
        let s_bb_ldlt = Ldlt::new(&s_bb).map_err(|e| numerical_error("S_bb", e))?;

        let solve = |rhs: &Grouped<P::Key, Array2<F>>| -> Result<Grouped<P::Key, Array2<F>>> {
            let c_dd_inv_rhs = block_solve(&c_dd, rhs)?;
            let s_bb_inv_rhs = s_bb_ldlt.solve(&block_inner_product(&c_db, &c_dd_inv_rhs)?)?;
            c_dd_inv_rhs.try_apply(|key, v| -> Result<Array2<F>> {
                Ok(v + &c_dd_inv_c_db.at(key)?.dot(&s_bb_inv_rhs))
            })
        };

        let targets = self
            .fit_models
            .apply(|_, gp| gp.train_targets().to_owned().insert_axis(Axis(1)));
        let information = solve(&targets)?;

        let queries: Vec<PatchworkFeature<P::Key, F>> = routed
            .iter()
            .flat_map(|(key, rows)| as_group_features(key, &x.select(Axis(0), rows)))
            .collect();
        let c_qb = patchwork_covariance_matrix(cov, &queries, &boundary)?;
        let c_bb_inv_c_bq = c_bb_ldlt.solve(&c_qb.t())?;

        let cross = self.fit_models.try_apply(|key, gp| -> Result<Array2<F>> {
            let features = as_group_features(key, gp.train_features());
            let c_dq = patchwork_covariance_matrix(cov, &features, &queries)?;
            Ok(c_dq - c_db.at(key)?.dot(&c_bb_inv_c_bq))
        })?;

        let mean = block_inner_product(&cross, &information)?.column(0).to_owned();
        let c_qq = patchwork_covariance_matrix(cov, &queries, &queries)?;
        let covariance =
            c_qq - c_qb.dot(&c_bb_inv_c_bq) - block_inner_product(&cross, &solve(&cross)?)?;
        debug!(
            "Patchwork prediction of {} points in {:?}ms",
            queries.len(),
            now.elapsed().as_millis()
        );

        Ok((JointDistribution::with_covariance(mean, covariance)?, order))
    }

    /// Row indices of `x` per nearest existing group
    fn route(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Grouped<P::Key, Vec<usize>>> {
        let functions = &self.params.functions;
        let keys = self.fit_models.keys();
        let mut routed: Grouped<P::Key, Vec<usize>> = Grouped::new();
        for (key, rows) in group_indices(x, |row| functions.group(row)) {
            let nearest = functions.nearest_group(&keys, &key);
            if !self.fit_models.contains_key(&nearest) {
                return Err(PatchworkError::ConfigurationError(format!(
                    "points of group {key:?} routed to unknown group {nearest:?}"
                )));
            }
            match routed.get_mut(&nearest) {
                Some(indices) => {
                    indices.extend(rows);
                    indices.sort_unstable();
                }
                None => {
                    routed.insert(nearest, rows);
                }
            }
        }
        Ok(routed)
    }

    /// Fitted GP of every group
    pub fn fit_models(&self) -> &Grouped<P::Key, GaussianProcess<F, Cov>> {
        &self.fit_models
    }

    /// Parameters used to fit this model
    pub fn params_used(&self) -> &PatchworkValidParams<F, Cov, P> {
        &self.params
    }

    /// Keys of the groups seen at training
    pub fn keys(&self) -> Vec<P::Key> {
        self.fit_models.keys()
    }

    /// Retrieve input and output dimensions
    pub fn dims(&self) -> (usize, usize) {
        self.fit_models
            .values()
            .next()
            .map(|gp| gp.dims())
            .unwrap_or((0, 1))
    }
}

impl<F, D, Cov, P> PredictInplace<ArrayBase<D, Ix2>, Array1<F>>
    for PatchworkGaussianProcess<F, Cov, P>
where
    F: Float,
    D: Data<Elem = F>,
    Cov: CovarianceFunction<F>,
    P: PatchworkFunctions<F>,
{
    fn predict_inplace(&self, x: &ArrayBase<D, Ix2>, y: &mut Array1<F>) {
        assert_eq!(
            x.nrows(),
            y.len(),
            "The number of data points must match the number of output targets."
        );

        let values = self.predict(x).expect("Patchwork GP Prediction");
        *y = values;
    }

    fn default_target(&self, x: &ArrayBase<D, Ix2>) -> Array1<F> {
        Array1::zeros((x.nrows(),))
    }
}

impl<F, Cov, P, D> Fit<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>, PatchworkError>
    for PatchworkValidParams<F, Cov, P>
where
    F: Float,
    Cov: CovarianceFunction<F>,
    P: PatchworkFunctions<F>,
    D: Data<Elem = F>,
{
    type Object = PatchworkGaussianProcess<F, Cov, P>;

    /// Fit one GP per group, groups are fitted in parallel
    fn fit(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>>,
    ) -> Result<Self::Object> {
        let x = dataset.records();
        let y = dataset.targets();
        if x.nrows() == 0 {
            return Err(PatchworkError::PreconditionError(
                "cannot fit a patchwork GP without training data".to_string(),
            ));
        }

        let now = Instant::now();
        let groups = group_by(x, y, |row| self.functions.group(row))?;
        info!(
            "Patchwork GP training on {} points split in {} groups",
            x.nrows(),
            groups.len()
        );

        let gp_params = self.gp_params().check()?;
        let fit_models = groups.try_apply(|key, dataset| {
            debug!("Train group {:?} on {} points", key, dataset.records().nrows());
            gp_params.fit(dataset).map_err(|e| {
                numerical_error(&format!("training covariance of group {key:?}"), e)
            })
        })?;
        debug!("elapsed training = {:?}ms", now.elapsed().as_millis());

        PatchworkGaussianProcess::from_fit_models(self.clone(), fit_models)
    }
}
