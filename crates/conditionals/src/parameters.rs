use crate::errors::{CondError, Result};
use linfa::{Float, ParamGuard};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Default jitter added to the diagonal of reference covariance matrices
/// before their cholesky factorization
pub const DEFAULT_JITTER: f64 = 1e-6;

/// Decomposition used to get the square root of a predictive covariance matrix
/// when sampling the conditional
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum SamplingMethod {
    /// Cholesky decomposition of the jittered covariance matrix
    Cholesky,
    /// Eigenvalues decomposition, negative eigenvalues being clipped to zero
    #[default]
    EigenValues,
}

/// A set of validated conditional parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(serialize = "F: Serialize", deserialize = "F: Deserialize<'de>"))
)]
pub struct ConditionalValidParams<F: Float> {
    /// Return the covariance between predicted points
    pub(crate) full_cov: bool,
    /// Return the covariance between outputs
    pub(crate) full_output_cov: bool,
    /// Function values are given in whitened representation
    pub(crate) white: bool,
    /// Diagonal regularization of reference covariance matrices
    pub(crate) jitter: F,
    /// Square root decomposition used when sampling
    pub(crate) sampling: SamplingMethod,
    /// Random generator seed used when sampling
    pub(crate) seed: Option<u64>,
}

impl<F: Float> Default for ConditionalValidParams<F> {
    fn default() -> ConditionalValidParams<F> {
        ConditionalValidParams {
            full_cov: false,
            full_output_cov: false,
            white: false,
            jitter: F::cast(DEFAULT_JITTER),
            sampling: SamplingMethod::default(),
            seed: None,
        }
    }
}

impl<F: Float> ConditionalValidParams<F> {
    /// Whether the covariance between predicted points is returned
    pub fn full_cov(&self) -> bool {
        self.full_cov
    }

    /// Whether the covariance between outputs is returned
    pub fn full_output_cov(&self) -> bool {
        self.full_output_cov
    }

    /// Whether function values are whitened
    pub fn white(&self) -> bool {
        self.white
    }

    /// Get jitter value
    pub fn jitter(&self) -> F {
        self.jitter
    }

    /// Get sampling method
    pub fn sampling(&self) -> SamplingMethod {
        self.sampling
    }

    /// Get seed
    pub fn seed(&self) -> Option<&u64> {
        self.seed.as_ref()
    }
}

#[derive(Clone, Debug, PartialEq)]
/// The set of options that can be specified when computing a GP [conditional](fn@crate::conditional).
pub struct ConditionalParams<F: Float>(ConditionalValidParams<F>);

impl<F: Float> Default for ConditionalParams<F> {
    fn default() -> ConditionalParams<F> {
        ConditionalParams(ConditionalValidParams::default())
    }
}

impl<F: Float> ConditionalParams<F> {
    /// A constructor for conditional parameters with default values:
    /// marginal variances, independent outputs, non whitened function values
    /// and [DEFAULT_JITTER].
    pub fn new() -> ConditionalParams<F> {
        Self::default()
    }

    /// A constructor for conditional parameters from validated parameters
    pub fn new_from_valid(params: &ConditionalValidParams<F>) -> Self {
        Self(params.clone())
    }

    /// Request the full covariance matrix between predicted points
    pub fn full_cov(mut self, full_cov: bool) -> Self {
        self.0.full_cov = full_cov;
        self
    }

    /// Request the covariance between outputs.
    ///
    /// As outputs are modeled by independent GPs sharing a single output kernel,
    /// cross-output covariances are zero.
    pub fn full_output_cov(mut self, full_output_cov: bool) -> Self {
        self.0.full_output_cov = full_output_cov;
        self
    }

    /// Function values are given in the whitened representation `f = L v`
    /// where `L` is the cholesky factor of the reference covariance matrix
    pub fn white(mut self, white: bool) -> Self {
        self.0.white = white;
        self
    }

    /// Set jitter value.
    ///
    /// Jitter is added to the diagonal of reference covariance matrices
    /// to ensure their positive definiteness
    pub fn jitter(mut self, jitter: F) -> Self {
        self.0.jitter = jitter;
        self
    }

    /// Set the decomposition used to sample the conditional
    pub fn sampling(mut self, sampling: SamplingMethod) -> Self {
        self.0.sampling = sampling;
        self
    }

    /// Set random generator seed used to sample the conditional
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.0.seed = seed;
        self
    }
}

impl<F: Float> From<ConditionalValidParams<F>> for ConditionalParams<F> {
    fn from(valid: ConditionalValidParams<F>) -> Self {
        ConditionalParams(valid)
    }
}

impl<F: Float> ParamGuard for ConditionalParams<F> {
    type Checked = ConditionalValidParams<F>;
    type Error = CondError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        let jitter = self.0.jitter;
        if !jitter.is_finite() || jitter < F::zero() {
            return Err(CondError::InvalidValueError(format!(
                "`jitter` should be a finite non negative value, got {jitter}"
            )));
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
