use crate::errors::{PatchworkError, Result};
use crate::functions::PatchworkFunctions;
use linfa::{Float, ParamGuard};
use patchbox_gp::{CovarianceFunction, GpParams};

/// A set of validated Patchwork GP parameters.
#[derive(Clone, Debug)]
pub struct PatchworkValidParams<F: Float, Cov: CovarianceFunction<F>, P: PatchworkFunctions<F>> {
    /// Covariance function shared by every group process
    pub(crate) cov: Cov,
    /// Grouping functions
    pub(crate) functions: P,
    /// Observation noise variance of each group GP
    pub(crate) nugget: F,
}

impl<F: Float, Cov: CovarianceFunction<F>, P: PatchworkFunctions<F>>
    PatchworkValidParams<F, Cov, P>
{
    /// Get covariance function
    pub fn cov(&self) -> &Cov {
        &self.cov
    }

    /// Get grouping functions
    pub fn functions(&self) -> &P {
        &self.functions
    }

    /// Get nugget of the group GPs
    pub fn nugget(&self) -> F {
        self.nugget
    }

    /// Parameters of the GP fitted on each group
    pub fn gp_params(&self) -> GpParams<F, Cov> {
        GpParams::new(self.cov.clone()).nugget(self.nugget)
    }
}

#[derive(Clone, Debug)]
/// The set of hyperparameters that can be specified for the execution of
/// the [Patchwork GP algorithm](struct.PatchworkGaussianProcess.html).
pub struct PatchworkParams<F: Float, Cov: CovarianceFunction<F>, P: PatchworkFunctions<F>>(
    PatchworkValidParams<F, Cov, P>,
);

impl<F: Float, Cov: CovarianceFunction<F>, P: PatchworkFunctions<F>> PatchworkParams<F, Cov, P> {
    /// A constructor for Patchwork GP parameters given a covariance function
    /// and grouping functions
    pub fn new(cov: Cov, functions: P) -> PatchworkParams<F, Cov, P> {
        Self(PatchworkValidParams {
            cov,
            functions,
            nugget: F::cast(100.0) * F::epsilon(),
        })
    }

    /// Set covariance function.
    pub fn cov(mut self, cov: Cov) -> Self {
        self.0.cov = cov;
        self
    }

    /// Set grouping functions.
    pub fn functions(mut self, functions: P) -> Self {
        self.0.functions = functions;
        self
    }

    /// Set nugget of the group GPs.
    ///
    /// Nugget is the observation noise variance, it also improves numerical stability
    pub fn nugget(mut self, nugget: F) -> Self {
        self.0.nugget = nugget;
        self
    }
}

impl<F: Float, Cov: CovarianceFunction<F>, P: PatchworkFunctions<F>>
    From<PatchworkValidParams<F, Cov, P>> for PatchworkParams<F, Cov, P>
{
    fn from(valid: PatchworkValidParams<F, Cov, P>) -> Self {
        PatchworkParams(valid)
    }
}

impl<F: Float, Cov: CovarianceFunction<F>, P: PatchworkFunctions<F>> ParamGuard
    for PatchworkParams<F, Cov, P>
{
    type Checked = PatchworkValidParams<F, Cov, P>;
    type Error = PatchworkError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        self.0.functions.validate()?;
        let nugget = self.0.nugget;
        if !nugget.is_finite() || nugget < F::zero() {
            return Err(PatchworkError::ConfigurationError(format!(
                "`nugget` should be a finite non negative value, got {}",
                nugget
            )));
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::IntervalFunctions;
    use patchbox_gp::Exponential;

    #[test]
    fn test_patchwork_params_check() {
        let params =
            PatchworkParams::new(Exponential::new(1., 1.), IntervalFunctions::new(vec![0.]))
                .nugget(1e-4);
        let valid = params.check_ref().unwrap();
        assert_eq!(valid.nugget(), 1e-4);
        assert_eq!(valid.gp_params().check().unwrap().nugget(), 1e-4);
        assert_eq!(valid.functions().cuts(), &[0.][..]);

        let params = params.nugget(-1.);
        assert!(matches!(
            params.check(),
            Err(PatchworkError::ConfigurationError(_))
        ));

        let params =
            PatchworkParams::new(Exponential::new(1., 1.), IntervalFunctions::new(vec![1., 0.]));
        assert!(matches!(
            params.check(),
            Err(PatchworkError::ConfigurationError(_))
        ));
    }
}
