//! Inducing features summarizing a GP with M representative variables.
//!
//! An inducing feature provides the prior covariance `Kuu` (M, M) between its inducing
//! variables and the cross covariance `Kuf` (M, N) between inducing variables and
//! function values at N points, for a given kernel.
//!
//! * [InducingPoints] are function values at M locations `Z` and work with any [Kernel],
//! * [Multiscale] are inducing points blurred by a gaussian window and are available
//! for the squared exponential kernel only.
use crate::errors::{CondError, Result};
use crate::kernels::{Kernel, SquaredExponential};
use crate::utils::{jitter_eye, pairwise_differences};
use linfa::Float;
use ndarray::{Array1, Array2, ArrayView2, Axis, Zip};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// A trait for inducing variables of a GP with kernel `K`
pub trait InducingFeature<F: Float, K: Kernel<F>>: Send + Sync {
    /// Number of inducing variables M
    fn len(&self) -> usize;

    /// Whether there is no inducing variable
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of components of the input space
    fn input_dim(&self) -> usize;

    /// Covariance (M, M) between inducing variables with `jitter` added to its diagonal
    fn kuu(&self, kernel: &K, jitter: F) -> Array2<F>;

    /// Cross covariance (M, N) between inducing variables and function values at `xnew` (N, nx)
    fn kuf(&self, kernel: &K, xnew: &ArrayView2<F>) -> Array2<F>;
}

/// Inducing variables given as function values at M locations `z` (M, nx)
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(serialize = "F: Serialize", deserialize = "F: Deserialize<'de>"))
)]
pub struct InducingPoints<F: Float> {
    z: Array2<F>,
}

impl<F: Float> InducingPoints<F> {
    /// Constructor given locations as a (M, nx) matrix
    pub fn new(z: Array2<F>) -> Self {
        InducingPoints { z }
    }

    /// Inducing points locations
    pub fn z(&self) -> &Array2<F> {
        &self.z
    }
}

impl<F: Float, K: Kernel<F>> InducingFeature<F, K> for InducingPoints<F> {
    fn len(&self) -> usize {
        self.z.nrows()
    }

    fn input_dim(&self) -> usize {
        self.z.ncols()
    }

    fn kuu(&self, kernel: &K, jitter: F) -> Array2<F> {
        kernel.k(&self.z, &self.z) + jitter_eye(self.z.nrows(), jitter)
    }

    fn kuf(&self, kernel: &K, xnew: &ArrayView2<F>) -> Array2<F> {
        kernel.k(&self.z, xnew)
    }
}

/// Multi-scale inducing points: inducing locations `z` (M, nx) with their
/// gaussian window widths `scales` (M, nx)
///
/// Reference:
///
/// * Walder, C., Kim, K. I. & Schölkopf, B. Sparse multiscale gaussian process regression.
///   Proceedings of the 25th International Conference on Machine Learning (2008).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(serialize = "F: Serialize", deserialize = "F: Deserialize<'de>"))
)]
pub struct Multiscale<F: Float> {
    z: Array2<F>,
    scales: Array2<F>,
}

impl<F: Float> Multiscale<F> {
    /// Constructor given locations and window widths as (M, nx) matrices
    ///
    /// Returns [CondError::ShapeError] if `z` and `scales` shapes differ
    pub fn new(z: Array2<F>, scales: Array2<F>) -> Result<Self> {
        if z.dim() != scales.dim() {
            return Err(CondError::ShapeError(format!(
                "multiscale inducing points {:?} and scales {:?} should have the same shape",
                z.dim(),
                scales.dim()
            )));
        }
        Ok(Multiscale { z, scales })
    }

    /// Inducing points locations
    pub fn z(&self) -> &Array2<F> {
        &self.z
    }

    /// Inducing points window widths
    pub fn scales(&self) -> &Array2<F> {
        &self.scales
    }
}

impl<F: Float> InducingFeature<F, SquaredExponential<F>> for Multiscale<F> {
    fn len(&self) -> usize {
        self.z.nrows()
    }

    fn input_dim(&self) -> usize {
        self.z.ncols()
    }

    /// ```text
    ///                                  nx                                      nx
    /// Kuu_ij = variance * exp( - 1/2 sum (z_ik - z_jk)^2 / s_ijk^2 ) * prod l_k / s_ijk
    ///                                 k=1                                     k=1
    /// ```
    /// with `s_ijk^2 = (l_k + scales_ik)^2 + (l_k + scales_jk)^2 - l_k^2`
    fn kuu(&self, kernel: &SquaredExponential<F>, jitter: F) -> Array2<F> {
        let m = self.z.nrows();
        let l = kernel.lengthscales_for(self.z.ncols());
        let ls2 = (&self.scales + &l).mapv(|v| v * v);
        let l2 = l.mapv(|v| v * v);
        let variance = kernel.process_variance();

        let mut kuu = Array2::zeros((m, m));
        Zip::indexed(&mut kuu).for_each(|(i, j), kij| {
            let sc = (&ls2.row(i) + &ls2.row(j) - &l2).mapv(|v| v.sqrt());
            let d = ((&self.z.row(i) - &self.z.row(j)) / &sc)
                .mapv(|v| v * v)
                .sum();
            let prod = (&l / &sc).product();
            *kij = variance * F::exp(F::cast(-0.5) * d) * prod;
        });
        kuu + jitter_eye(m, jitter)
    }

    /// ```text
    ///                                   nx                                      nx
    /// Kuf_ij = variance * exp( - 1/2 sum (z_ik - x_jk)^2 / s_ik^2 ) * prod l_k / s_ik
    ///                                  k=1                                     k=1
    /// ```
    /// with `s_ik = l_k + scales_ik`
    fn kuf(&self, kernel: &SquaredExponential<F>, xnew: &ArrayView2<F>) -> Array2<F> {
        let (m, nx) = self.z.dim();
        let n = xnew.nrows();
        let l = kernel.lengthscales_for(nx);
        let sc = &self.scales + &l;
        let prods: Array1<F> = (&l / &sc).map_axis(Axis(1), |row| row.product());
        let variance = kernel.process_variance();

        // (M * N, nx) differences z_i - x_j at row i * N + j
        let diffs = pairwise_differences(&self.z, xnew);
        Array2::from_shape_fn((m, n), |(i, j)| {
            let d = (&diffs.row(i * n + j) / &sc.row(i)).mapv(|v| v * v).sum();
            variance * F::exp(F::cast(-0.5) * d) * prods[i]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::Matern32;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_inducing_points_covariances() {
        let kernel = Matern32::new(2., array![0.5]);
        let z = array![[0.], [0.5], [1.]];
        let feat = InducingPoints::new(z.clone());
        assert_eq!(InducingFeature::<f64, Matern32<f64>>::len(&feat), 3);
        assert_eq!(InducingFeature::<f64, Matern32<f64>>::input_dim(&feat), 1);

        let kuu = feat.kuu(&kernel, 1e-3);
        assert_abs_diff_eq!(kuu, kernel.k(&z, &z) + jitter_eye(3, 1e-3), epsilon = 1e-12);
        let xnew = array![[0.2], [0.7]];
        let kuf = feat.kuf(&kernel, &xnew.view());
        assert_eq!(kuf.dim(), (3, 2));
        assert_abs_diff_eq!(kuf, kernel.k(&z, &xnew), epsilon = 1e-12);
    }

    #[test]
    fn test_multiscale_with_null_scales_are_inducing_points() {
        let kernel = SquaredExponential::new(1.5, array![0.7, 1.3]);
        let z = array![[0., 0.], [0.5, -1.], [1., 2.], [-0.3, 0.4]];
        let xnew = array![[0.2, 0.1], [0.7, -0.5], [2., 1.]];
        let points = InducingPoints::new(z.clone());
        let multiscale = Multiscale::new(z, Array2::zeros((4, 2))).unwrap();
        assert_abs_diff_eq!(
            multiscale.kuu(&kernel, 1e-6),
            points.kuu(&kernel, 1e-6),
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            multiscale.kuf(&kernel, &xnew.view()),
            points.kuf(&kernel, &xnew.view()),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_multiscale_covariances() {
        let kernel = SquaredExponential::new(1., array![1.]);
        let feat = Multiscale::new(array![[0.], [1.]], array![[1.], [0.]]).unwrap();
        let kuu = feat.kuu(&kernel, 0.);
        // symmetric, blurred inducing point has a reduced variance
        assert_abs_diff_eq!(kuu[[0, 1]], kuu[[1, 0]], epsilon = 1e-12);
        // s^2 = 4 + 4 - 1 = 7
        assert_abs_diff_eq!(kuu[[0, 0]], 1. / 7f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(kuu[[1, 1]], 1., epsilon = 1e-12);

        let kuf = feat.kuf(&kernel, &array![[0.]].view());
        // s = 2 for the first inducing point
        assert_abs_diff_eq!(kuf[[0, 0]], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(kuf[[1, 0]], f64::exp(-0.5), epsilon = 1e-12);
    }

    #[test]
    fn test_multiscale_shape_mismatch() {
        let res = Multiscale::new(array![[0., 1.], [1., 2.]], Array2::<f64>::zeros((2, 1)));
        assert!(matches!(res, Err(CondError::ShapeError(_))));
        let feat = Multiscale::new(array![[0.], [1.]], array![[0.1], [0.2]]).unwrap();
        assert_eq!(feat.z(), &array![[0.], [1.]]);
        assert_eq!(feat.scales(), &array![[0.1], [0.2]]);
    }
}
