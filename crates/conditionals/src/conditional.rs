use crate::base::{base_conditional, QSqrt};
use crate::errors::{CondError, Result};
use crate::expansion::{expand_independent_outputs, Variance};
use crate::features::InducingFeature;
use crate::kernels::Kernel;
use crate::parameters::ConditionalValidParams;
use crate::utils::jitter_eye;
use linfa::Float;
use ndarray::{Array2, ArrayBase, ArrayView2, Data, Ix2};

use log::debug;

/// What the GP is conditioned on
pub enum Source<'a, F: Float, K: Kernel<F>> {
    /// Function values observed at reference inputs `x` (M, nx)
    Data(ArrayView2<'a, F>),
    /// Inducing variables of a sparse GP
    Inducing(&'a dyn InducingFeature<F, K>),
}

impl<'a, F: Float, K: Kernel<F>> Clone for Source<'a, F, K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, F: Float, K: Kernel<F>> Copy for Source<'a, F, K> {}

impl<'a, F: Float, K: Kernel<F>> Source<'a, F, K> {
    /// Number of reference points M
    pub fn len(&self) -> usize {
        match self {
            Source::Data(x) => x.nrows(),
            Source::Inducing(feature) => feature.len(),
        }
    }

    /// Whether there is no reference point
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of components of the input space
    pub fn input_dim(&self) -> usize {
        match self {
            Source::Data(x) => x.ncols(),
            Source::Inducing(feature) => feature.input_dim(),
        }
    }
}

/// Conditional of a GP with kernel `kernel` at `xnew` (N, nx) given function values
/// `f` (M, R) attached to the M reference points of `source`.
///
/// Returns the predictive mean (N, R) and the predictive variance with the layout
/// requested by `params` (see [Variance]).
///
/// With [Source::Inducing], the reference covariance is the feature `Kuu` jittered by the feature
/// itself, and variances are expanded to the output covariance layouts as outputs are independent.
/// With [Source::Data], the reference covariance is `k(x, x) + jitter * I` and only
/// [Variance::Diag] or [Variance::Full] layouts are available.
///
/// # Errors
///
/// * [CondError::ShapeError] when `xnew`, `source`, `kernel`, `f` or `q_sqrt` dimensions are not consistent
/// * [CondError::NumericalError] when the reference covariance is not positive definite
/// * [CondError::UnsupportedCombination] when `full_output_cov` is requested with [Source::Data]
pub fn conditional<F: Float, K: Kernel<F>>(
    xnew: &ArrayBase<impl Data<Elem = F>, Ix2>,
    source: Source<'_, F, K>,
    kernel: &K,
    f: &ArrayBase<impl Data<Elem = F>, Ix2>,
    q_sqrt: Option<&QSqrt<F>>,
    params: &ConditionalValidParams<F>,
) -> Result<(Array2<F>, Variance<F>)> {
    match source {
        Source::Data(x) => conditional_from_data(xnew, &x, kernel, f, q_sqrt, params),
        Source::Inducing(feature) => {
            conditional_from_features(xnew, feature, kernel, f, q_sqrt, params)
        }
    }
}

fn check_input_dim<F: Float, K: Kernel<F>>(nx_ref: usize, nx: usize, kernel: &K) -> Result<()> {
    if nx_ref != nx {
        return Err(CondError::ShapeError(format!(
            "reference points have {nx_ref} components, prediction points have {nx}"
        )));
    }
    kernel.check_input_dim(nx)
}

/// Conditional given inducing variables `feature`
pub fn conditional_from_features<F, K, Z>(
    xnew: &ArrayBase<impl Data<Elem = F>, Ix2>,
    feature: &Z,
    kernel: &K,
    f: &ArrayBase<impl Data<Elem = F>, Ix2>,
    q_sqrt: Option<&QSqrt<F>>,
    params: &ConditionalValidParams<F>,
) -> Result<(Array2<F>, Variance<F>)>
where
    F: Float,
    K: Kernel<F>,
    Z: InducingFeature<F, K> + ?Sized,
{
    debug!("Conditional: Inducing Feature - Kernel");
    check_input_dim(feature.input_dim(), xnew.ncols(), kernel)?;

    let kmm = feature.kuu(kernel, params.jitter());
    let kmn = feature.kuf(kernel, &xnew.view());
    let knn = kernel.covariance(xnew, !params.full_cov());

    let (fmean, fvar) = base_conditional(
        &kmn,
        &kmm,
        &knn,
        f,
        params.full_cov(),
        q_sqrt,
        params.white(),
    )?;
    let fvar = expand_independent_outputs(fvar, params.full_cov(), params.full_output_cov())?;
    Ok((fmean, fvar))
}

/// Conditional given function values at reference inputs `x` (M, nx)
pub fn conditional_from_data<F: Float, K: Kernel<F>>(
    xnew: &ArrayBase<impl Data<Elem = F>, Ix2>,
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    kernel: &K,
    f: &ArrayBase<impl Data<Elem = F>, Ix2>,
    q_sqrt: Option<&QSqrt<F>>,
    params: &ConditionalValidParams<F>,
) -> Result<(Array2<F>, Variance<F>)> {
    debug!("Conditional: Kernel");
    if params.full_output_cov() {
        return Err(CondError::UnsupportedCombination(
            "covariance between outputs is not available when conditioning on data".to_string(),
        ));
    }
    check_input_dim(x.ncols(), xnew.ncols(), kernel)?;

    let kmm = kernel.k(x, x) + jitter_eye(x.nrows(), params.jitter());
    let kmn = kernel.k(x, xnew);
    let knn = kernel.covariance(xnew, !params.full_cov());

    base_conditional(
        &kmn,
        &kmm,
        &knn,
        f,
        params.full_cov(),
        q_sqrt,
        params.white(),
    )
}
