//! Predictive variances layouts and their expansion to output covariances
//! when outputs are modeled by independent GPs.
use crate::errors::{CondError, Result};
use linfa::Float;
use ndarray::{Array2, Array3, Array4, ArrayD};

/// Predictive (co)variance of a GP conditional with N points and R outputs
#[derive(Clone, Debug, PartialEq)]
pub enum Variance<F: Float> {
    /// Marginal variances (N, R)
    Diag(Array2<F>),
    /// Covariance between points for each output (R, N, N)
    Full(Array3<F>),
    /// Covariance between outputs for each point (N, R, R)
    FullOutput(Array3<F>),
    /// Joint covariance between points and outputs (N, R, N, R)
    FullJoint(Array4<F>),
}

impl<F: Float> Variance<F> {
    /// Shape of the underlying array
    pub fn shape(&self) -> &[usize] {
        match self {
            Variance::Diag(v) => v.shape(),
            Variance::Full(v) => v.shape(),
            Variance::FullOutput(v) => v.shape(),
            Variance::FullJoint(v) => v.shape(),
        }
    }

    /// Marginal variances (N, R) extracted from any layout
    pub fn marginals(&self) -> Array2<F> {
        match self {
            Variance::Diag(v) => v.to_owned(),
            Variance::Full(v) => {
                let (r, n, _) = v.dim();
                Array2::from_shape_fn((n, r), |(i, j)| v[[j, i, i]])
            }
            Variance::FullOutput(v) => {
                let (n, r, _) = v.dim();
                Array2::from_shape_fn((n, r), |(i, j)| v[[i, j, j]])
            }
            Variance::FullJoint(v) => {
                let (n, r, _, _) = v.dim();
                Array2::from_shape_fn((n, r), |(i, j)| v[[i, j, i, j]])
            }
        }
    }

    /// Convert into a dynamic dimensional array
    pub fn into_dyn(self) -> ArrayD<F> {
        match self {
            Variance::Diag(v) => v.into_dyn(),
            Variance::Full(v) => v.into_dyn(),
            Variance::FullOutput(v) => v.into_dyn(),
            Variance::FullJoint(v) => v.into_dyn(),
        }
    }
}

/// Expand per output variances computed with a single output kernel into the layout
/// requested by `full_cov` and `full_output_cov`.
///
/// Outputs being independent, cross-output covariances are zero:
/// * `Diag` (N, R) stays unchanged or becomes `FullOutput` (N, R, R) with diagonal blocks,
/// * `Full` (R, N, N) stays unchanged or becomes `FullJoint` (N, R, N, R) block diagonal wrt outputs.
pub fn expand_independent_outputs<F: Float>(
    fvar: Variance<F>,
    full_cov: bool,
    full_output_cov: bool,
) -> Result<Variance<F>> {
    match (fvar, full_cov, full_output_cov) {
        (Variance::Diag(v), false, false) => Ok(Variance::Diag(v)),
        (Variance::Full(v), true, false) => Ok(Variance::Full(v)),
        (Variance::Diag(v), false, true) => {
            let (n, r) = v.dim();
            Ok(Variance::FullOutput(Array3::from_shape_fn(
                (n, r, r),
                |(i, j, k)| if j == k { v[[i, j]] } else { F::zero() },
            )))
        }
        (Variance::Full(v), true, true) => {
            let (r, n, _) = v.dim();
            Ok(Variance::FullJoint(Array4::from_shape_fn(
                (n, r, n, r),
                |(i, j, k, l)| if j == l { v[[j, i, k]] } else { F::zero() },
            )))
        }
        (fvar, full_cov, _) => Err(CondError::ShapeError(format!(
            "per output variance of shape {:?} can not be expanded with full_cov={full_cov}",
            fvar.shape()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_expand_diag() {
        let v = array![[1., 2.], [3., 4.], [5., 6.]];
        let out = expand_independent_outputs(Variance::Diag(v.clone()), false, false).unwrap();
        assert_eq!(out, Variance::Diag(v.clone()));

        let out = expand_independent_outputs(Variance::Diag(v.clone()), false, true).unwrap();
        assert_eq!(out.shape(), &[3, 2, 2]);
        if let Variance::FullOutput(c) = &out {
            assert_eq!(c[[1, 0, 0]], 3.);
            assert_eq!(c[[1, 1, 1]], 4.);
            assert_eq!(c[[1, 0, 1]], 0.);
            assert_eq!(c[[2, 1, 0]], 0.);
        } else {
            panic!("FullOutput layout expected");
        }
        assert_abs_diff_eq!(out.marginals(), v);
    }

    #[test]
    fn test_expand_full() {
        // (R=2, N=2, N=2)
        let v = array![[[1., 0.5], [0.5, 2.]], [[3., -0.2], [-0.2, 4.]]];
        let out = expand_independent_outputs(Variance::Full(v.clone()), true, false).unwrap();
        assert_eq!(out, Variance::Full(v.clone()));

        let out = expand_independent_outputs(Variance::Full(v.clone()), true, true).unwrap();
        assert_eq!(out.shape(), &[2, 2, 2, 2]);
        if let Variance::FullJoint(c) = &out {
            // same output blocks
            assert_eq!(c[[0, 0, 1, 0]], 0.5);
            assert_eq!(c[[0, 1, 1, 1]], -0.2);
            assert_eq!(c[[1, 1, 1, 1]], 4.);
            // no cross outputs covariance
            assert_eq!(c[[0, 0, 0, 1]], 0.);
            assert_eq!(c[[1, 1, 0, 0]], 0.);
        } else {
            panic!("FullJoint layout expected");
        }
        assert_abs_diff_eq!(out.marginals(), array![[1., 3.], [2., 4.]]);
        assert_eq!(out.into_dyn().ndim(), 4);
    }

    #[test]
    fn test_expand_layout_mismatch() {
        let v = array![[1., 2.]];
        assert!(matches!(
            expand_independent_outputs(Variance::Diag(v), true, false),
            Err(CondError::ShapeError(_))
        ));
        let v = array![[[1.]]];
        assert!(matches!(
            expand_independent_outputs(Variance::Full(v), false, true),
            Err(CondError::ShapeError(_))
        ));
    }
}
