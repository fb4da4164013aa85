//! Sampling of GP conditionals.
//!
//! Samples are drawn from the gaussian predictive distribution returned by [conditional].
//! When the covariance between predicted points is available, the square root of each output
//! covariance matrix is computed either by cholesky or eigenvalues decomposition
//! (see [SamplingMethod]). The later one is the default as cholesky decomposition suffers
//! from ill-conditioned matrices when the number of points increases.
use crate::base::QSqrt;
use crate::conditional::{conditional, Source};
use crate::errors::{CondError, Result};
use crate::expansion::Variance;
use crate::kernels::Kernel;
use crate::parameters::{ConditionalValidParams, SamplingMethod};
use crate::utils::jitter_eye;
use linfa::Float;
use linfa_linalg::{cholesky::*, eigh::*};
use ndarray::{s, Array, Array2, Array3, ArrayBase, ArrayView2, Axis, Data, Ix2};
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256Plus;

use log::debug;
use rayon::prelude::*;

/// Square root `C` (N, N) of the covariance matrix `cov` such that `cov = C C^T`
fn covariance_sqrt<F: Float>(
    cov: &ArrayView2<F>,
    method: SamplingMethod,
    jitter: F,
) -> Result<Array2<F>> {
    match method {
        SamplingMethod::Cholesky => {
            let cov = cov + &jitter_eye(cov.nrows(), jitter);
            let c = cov.cholesky().map_err(|err| {
                CondError::NumericalError(format!(
                    "predictive covariance cholesky factorization failed ({err}), \
                     try eigenvalues sampling method"
                ))
            })?;
            if c.diag().iter().any(|v| !v.is_finite() || *v <= F::zero()) {
                return Err(CondError::NumericalError(
                    "predictive covariance is not positive definite, \
                     try eigenvalues sampling method"
                        .to_string(),
                ));
            }
            Ok(c)
        }
        SamplingMethod::EigenValues => {
            let (vals, vecs) = cov.to_owned().eigh_into()?;
            // Clip negative eigenvalues due to round-off errors
            let sqrt_vals = vals.mapv(|v| if v > F::zero() { v.sqrt() } else { F::zero() });
            Ok(vecs * &sqrt_vals)
        }
    }
}

/// Draw `n_samples` samples of the conditional of a GP at `xnew` (N, nx).
///
/// Arguments are the ones of [conditional], the sampling method and the random generator seed
/// being taken from `params`. Returns samples (n_samples, N, R) along with
/// the predictive mean (N, R) and variance used to draw them.
///
/// # Errors
///
/// Errors of [conditional] and
/// * [CondError::UnsupportedCombination] when `full_output_cov` is requested
/// * [CondError::NumericalError] when the predictive covariance can not be factorized
pub fn sample_conditional<F: Float, K: Kernel<F>>(
    xnew: &ArrayBase<impl Data<Elem = F>, Ix2>,
    source: Source<'_, F, K>,
    kernel: &K,
    f: &ArrayBase<impl Data<Elem = F>, Ix2>,
    q_sqrt: Option<&QSqrt<F>>,
    n_samples: usize,
    params: &ConditionalValidParams<F>,
) -> Result<(Array3<F>, Array2<F>, Variance<F>)> {
    if params.full_output_cov() {
        return Err(CondError::UnsupportedCombination(
            "sampling with covariance between outputs is not available".to_string(),
        ));
    }
    let (mean, var) = conditional(xnew, source, kernel, f, q_sqrt, params)?;
    let (n, r) = mean.dim();
    debug!(
        "Sample conditional: {n_samples} samples, N={n}, R={r}, method={:?}",
        params.sampling()
    );

    let mut rng = match params.seed() {
        Some(seed) => Xoshiro256Plus::seed_from_u64(*seed),
        None => Xoshiro256Plus::from_entropy(),
    };
    let eps: Array3<f64> = Array::random_using((n_samples, n, r), StandardNormal, &mut rng);
    let eps = eps.mapv(|v| F::cast(v));

    let samples = match &var {
        Variance::Diag(v) => {
            let std = v.mapv(|v| if v > F::zero() { v.sqrt() } else { F::zero() });
            eps * &std + &mean
        }
        Variance::Full(cov) => {
            let sqrts = (0..r)
                .into_par_iter()
                .map(|i| {
                    let cov_i = cov.index_axis(Axis(0), i);
                    covariance_sqrt(&cov_i, params.sampling(), params.jitter())
                })
                .collect::<Result<Vec<_>>>()?;
            let mut samples = Array3::zeros((n_samples, n, r));
            for (i, c) in sqrts.iter().enumerate() {
                // (N, n_samples) trajectories of output i
                let traj = c.dot(&eps.slice(s![.., .., i]).t());
                let traj = traj + &mean.column(i).insert_axis(Axis(1));
                samples.slice_mut(s![.., .., i]).assign(&traj.t());
            }
            samples
        }
        _ => {
            return Err(CondError::UnsupportedCombination(
                "sampling with covariance between outputs is not available".to_string(),
            ))
        }
    };

    Ok((samples, mean, var))
}
