use crate::errors::{CondError, Result};
use crate::expansion::Variance;
use crate::kernels::KernelCov;
use crate::utils::lower_triangle;
use linfa::Float;
use linfa_linalg::{cholesky::*, triangular::*};
use ndarray::{Array2, Array3, ArrayBase, Axis, Data, Ix2, Ix3};
use ndarray_einsum_beta::*;

use log::debug;
use rayon::prelude::*;

/// Square root representation of the gaussian uncertainty over function values `f` (M, R)
#[derive(Clone, Debug, PartialEq)]
pub enum QSqrt<F: Float> {
    /// Independent standard deviations (M, R)
    PerOutputStdDev(Array2<F>),
    /// Lower triangular cholesky factor of the covariance of each output (R, M, M).
    /// Only the lower triangle of each factor is used.
    PerOutputCholesky(Array3<F>),
}

impl<F: Float> QSqrt<F> {
    /// Number of reference points M
    pub fn num_points(&self) -> usize {
        match self {
            QSqrt::PerOutputStdDev(q) => q.nrows(),
            QSqrt::PerOutputCholesky(q) => q.dim().1,
        }
    }

    /// Number of outputs R
    pub fn num_outputs(&self) -> usize {
        match self {
            QSqrt::PerOutputStdDev(q) => q.ncols(),
            QSqrt::PerOutputCholesky(q) => q.dim().0,
        }
    }
}

fn check_shapes<F: Float>(
    kmn: &ArrayBase<impl Data<Elem = F>, Ix2>,
    kmm: &ArrayBase<impl Data<Elem = F>, Ix2>,
    knn: &KernelCov<F>,
    f: &ArrayBase<impl Data<Elem = F>, Ix2>,
    full_cov: bool,
    q_sqrt: Option<&QSqrt<F>>,
) -> Result<()> {
    let (m, n) = kmn.dim();
    if kmm.nrows() != kmm.ncols() {
        return Err(CondError::ShapeError(format!(
            "Kmm should be a square matrix, got {:?}",
            kmm.dim()
        )));
    }
    if kmm.nrows() != m {
        return Err(CondError::ShapeError(format!(
            "Kmm {:?} and Kmn {:?} do not share the same number of reference points",
            kmm.dim(),
            kmn.dim()
        )));
    }
    match knn {
        KernelCov::Diag(d) => {
            if full_cov {
                return Err(CondError::ShapeError(
                    "full covariance requested but Knn is given as a diagonal".to_string(),
                ));
            }
            if d.len() != n {
                return Err(CondError::ShapeError(format!(
                    "Knn diagonal should have {n} values, got {}",
                    d.len()
                )));
            }
        }
        KernelCov::Full(k) => {
            if k.dim() != (n, n) {
                return Err(CondError::ShapeError(format!(
                    "Knn should be a ({n}, {n}) matrix, got {:?}",
                    k.dim()
                )));
            }
        }
    }
    if f.nrows() != m {
        return Err(CondError::ShapeError(format!(
            "f should have {m} rows as Kmm {:?}, got {:?}",
            kmm.dim(),
            f.dim()
        )));
    }
    if let Some(q) = q_sqrt {
        let r = f.ncols();
        let consistent = match q {
            QSqrt::PerOutputStdDev(q) => q.dim() == (m, r),
            QSqrt::PerOutputCholesky(q) => q.dim() == (r, m, m),
        };
        if !consistent {
            return Err(CondError::ShapeError(format!(
                "q_sqrt should describe {m} points and {r} outputs, got {} points and {} outputs",
                q.num_points(),
                q.num_outputs()
            )));
        }
    }
    Ok(())
}

/// Lower cholesky factor of `kmm`, every pivot has to be strictly positive
fn cholesky_factor<F: Float>(kmm: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
    let lm = kmm.cholesky().map_err(|err| {
        CondError::NumericalError(format!(
            "Kmm cholesky factorization failed ({err}), try to increase jitter"
        ))
    })?;
    if lm.diag().iter().any(|v| !v.is_finite() || *v <= F::zero()) {
        return Err(CondError::NumericalError(
            "Kmm is not positive definite, try to increase jitter".to_string(),
        ));
    }
    Ok(lm)
}

/// Project q_sqrt through `a` (M, N): returns `LTA` (R, M, N) where `LTA[r] = Lq_r^T a`
fn project_q_sqrt<F: Float>(a: &Array2<F>, q_sqrt: &QSqrt<F>) -> Result<Array3<F>> {
    match q_sqrt {
        QSqrt::PerOutputStdDev(q) => einsum("mn,mr->rmn", &[a, q])
            .map_err(|err| CondError::ShapeError(err.to_string()))?
            .into_dimensionality::<Ix3>()
            .map_err(|err| CondError::ShapeError(err.to_string())),
        QSqrt::PerOutputCholesky(lq) => {
            let (r, m, _) = lq.dim();
            let blocks: Vec<Array2<F>> = (0..r)
                .into_par_iter()
                .map(|i| lower_triangle(&lq.index_axis(Axis(0), i)).t().dot(a))
                .collect();
            let mut lta = Array3::zeros((r, m, a.ncols()));
            for (mut lta_r, block) in lta.outer_iter_mut().zip(blocks) {
                lta_r.assign(&block);
            }
            Ok(lta)
        }
    }
}

/// Gaussian conditioning of a GP at N new points given its values `f` (M, R)
/// at M reference points.
///
/// Given the covariances `kmn` (M, N), `kmm` (M, M) and `knn` (N or (N, N)), computes
/// the mean (N, R) and variance of R independent GPs conditioned on `f`:
///
/// `mean = Kmn^T Kmm^-1 f`
/// `var  = Knn - Kmn^T Kmm^-1 Kmn`
///
/// `f` may be uncertain with `q_sqrt` as the square root of its covariance. When `white` is true,
/// `f` is the whitened variable `v` such that `f = L v` with `Kmm = L L^T`, and `q_sqrt`
/// the square root of the covariance of `v`.
///
/// Inversions are done by cholesky factorization of `kmm` and triangular solves.
/// The returned variance is [Variance::Full] (R, N, N) when `full_cov` is true,
/// otherwise [Variance::Diag] (N, R).
///
/// # Errors
///
/// * [CondError::ShapeError] when dimensions are not consistent, checked before any factorization
/// * [CondError::NumericalError] when `kmm` is not positive definite (no jitter is added here)
pub fn base_conditional<F: Float>(
    kmn: &ArrayBase<impl Data<Elem = F>, Ix2>,
    kmm: &ArrayBase<impl Data<Elem = F>, Ix2>,
    knn: &KernelCov<F>,
    f: &ArrayBase<impl Data<Elem = F>, Ix2>,
    full_cov: bool,
    q_sqrt: Option<&QSqrt<F>>,
    white: bool,
) -> Result<(Array2<F>, Variance<F>)> {
    check_shapes(kmn, kmm, knn, f, full_cov, q_sqrt)?;
    let (m, n) = kmn.dim();
    let r = f.ncols();
    debug!("Base conditional: M={m}, N={n}, R={r}, full_cov={full_cov}, white={white}");

    // Compute (lower) Cholesky decomposition: Kmm = L L^T
    let lm = cholesky_factor(kmm)?;

    // Compute A = L^-1 Kmn
    let a = lm.solve_triangular(kmn, UPLO::Lower)?;

    // Compute the variance of the conditional without uncertainty on f
    let base_var = match knn {
        KernelCov::Full(k) if full_cov => KernelCov::Full(k - &a.t().dot(&a)),
        _ => KernelCov::Diag(knn.diag() - a.mapv(|v| v * v).sum_axis(Axis(0))),
    };

    // A = L^-T L^-1 Kmn = Kmm^-1 Kmn when f is not whitened
    let a = if white {
        a
    } else {
        lm.t().solve_triangular(&a, UPLO::Upper)?
    };

    let fmean = a.t().dot(f);

    let lta = q_sqrt.map(|q| project_q_sqrt(&a, q)).transpose()?;

    let fvar = match base_var {
        KernelCov::Full(base) => {
            // broadcasted to every outputs
            let mut fvar = Array3::from_shape_fn((r, n, n), |(_, i, j)| base[[i, j]]);
            if let Some(lta) = lta {
                let terms: Vec<Array2<F>> = (0..r)
                    .into_par_iter()
                    .map(|i| {
                        let lta_r = lta.index_axis(Axis(0), i);
                        lta_r.t().dot(&lta_r)
                    })
                    .collect();
                for (mut fvar_r, term) in fvar.outer_iter_mut().zip(terms) {
                    fvar_r += &term;
                }
            }
            Variance::Full(fvar)
        }
        KernelCov::Diag(base) => {
            let mut fvar = Array2::from_shape_fn((n, r), |(i, _)| base[i]);
            if let Some(lta) = lta {
                // (R, N) variances transposed to (N, R)
                let q_var = lta.mapv(|v| v * v).sum_axis(Axis(1));
                fvar += &q_var.t();
            }
            Variance::Diag(fvar)
        }
    };

    Ok((fmean, fvar))
}
