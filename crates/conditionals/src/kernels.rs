//! A module for stationary covariance kernels used to evaluate the GP prior covariances
//! `Kmm`, `Kmn` and `Knn` involved in conditionals.
//!
//! The following correlation models are implemented:
//! * squared exponential,
//! * absolute exponential,
//! * matern 3/2,
//! * matern 5/2.
//!
//! A kernel is built as a [Stationary] kernel which scales a correlation model by
//! a process variance and input lengthscales.

use crate::errors::{CondError, Result};
use crate::utils::pairwise_differences;
use linfa::Float;
use ndarray::{array, Array1, Array2, ArrayBase, Axis, Data, Ix2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prior covariance of a set of points either restricted to its diagonal
/// or given as a full matrix
#[derive(Clone, Debug, PartialEq)]
pub enum KernelCov<F: Float> {
    /// Diagonal variances (n,)
    Diag(Array1<F>),
    /// Full covariance matrix (n, n)
    Full(Array2<F>),
}

impl<F: Float> KernelCov<F> {
    /// Number of points the covariance is related to
    pub fn len(&self) -> usize {
        match self {
            KernelCov::Diag(d) => d.len(),
            KernelCov::Full(k) => k.nrows(),
        }
    }

    /// Whether the covariance is related to no point
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Diagonal variances whatever the representation
    pub fn diag(&self) -> Array1<F> {
        match self {
            KernelCov::Diag(d) => d.to_owned(),
            KernelCov::Full(k) => k.diag().to_owned(),
        }
    }
}

/// A trait for covariance functions `k(x, x')` evaluated on sets of points given as (n, nx) matrices
pub trait Kernel<F: Float>: Clone + fmt::Display + Send + Sync {
    /// Cross covariance matrix (nrows(x), nrows(y)) between x and y points
    fn k(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        y: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Array2<F>;

    /// Variances (nrows(x),) of x points
    fn k_diag(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F>;

    /// Check the kernel can be evaluated on points of `nx` components
    fn check_input_dim(&self, _nx: usize) -> Result<()> {
        Ok(())
    }

    /// Covariance of x points, restricted to variances when `diag` is true
    fn covariance(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>, diag: bool) -> KernelCov<F> {
        if diag {
            KernelCov::Diag(self.k_diag(x))
        } else {
            KernelCov::Full(self.k(x, x))
        }
    }
}

/// A trait for correlation models `r(d)` where `d` are differences between points
/// already scaled by the kernel lengthscales
pub trait CorrelationModel<F: Float>:
    Clone + Copy + Default + fmt::Display + Send + Sync
{
    /// Compute correlation values (n,) given (n, nx) scaled differences `d`
    fn value(&self, d: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F>;
}

/// Squared exponential correlation models
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct SquaredExponentialCorr();

impl<F: Float> CorrelationModel<F> for SquaredExponentialCorr {
    ///    nx
    /// exp( sum - d_j^2 / 2 )
    ///    j=1
    fn value(&self, d: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F> {
        d.mapv(|v| v * v)
            .sum_axis(Axis(1))
            .mapv(|v| F::exp(F::cast(-0.5) * v))
    }
}

impl fmt::Display for SquaredExponentialCorr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SquaredExponential")
    }
}

/// Absolute exponential correlation models
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct AbsoluteExponentialCorr();

impl<F: Float> CorrelationModel<F> for AbsoluteExponentialCorr {
    ///    nx
    /// exp( sum - |d_j| )
    ///    j=1
    fn value(&self, d: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F> {
        d.mapv(|v| v.abs()).sum_axis(Axis(1)).mapv(|v| F::exp(-v))
    }
}

impl fmt::Display for AbsoluteExponentialCorr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "AbsoluteExponential")
    }
}

/// Matern 3/2 correlation model
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Matern32Corr();

impl<F: Float> CorrelationModel<F> for Matern32Corr {
    ///   nx                                nx
    /// prod ( 1 + sqrt(3) * |d_j| ) exp( sum - sqrt(3) * |d_j| )
    ///   j=1                               j=1
    fn value(&self, d: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F> {
        let sqrt3 = F::cast(3.).sqrt();
        let abs_d = d.mapv(|v| v.abs());
        let a = abs_d
            .mapv(|v| F::one() + sqrt3 * v)
            .map_axis(Axis(1), |row| row.product());
        let b = abs_d.sum_axis(Axis(1)).mapv(|v| F::exp(-sqrt3 * v));
        a * b
    }
}

impl fmt::Display for Matern32Corr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Matern32")
    }
}

/// Matern 5/2 correlation model
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Matern52Corr();

impl<F: Float> CorrelationModel<F> for Matern52Corr {
    ///   nx                                              nx
    /// prod ( 1 + sqrt(5) * |d_j| + 5/3 * d_j^2 ) exp( sum - sqrt(5) * |d_j| )
    ///   j=1                                             j=1
    fn value(&self, d: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F> {
        let sqrt5 = F::cast(5.).sqrt();
        let div5_3 = F::cast(5. / 3.);
        let abs_d = d.mapv(|v| v.abs());
        let a = abs_d
            .mapv(|v| F::one() + sqrt5 * v + div5_3 * v * v)
            .map_axis(Axis(1), |row| row.product());
        let b = abs_d.sum_axis(Axis(1)).mapv(|v| F::exp(-sqrt5 * v));
        a * b
    }
}

impl fmt::Display for Matern52Corr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Matern52")
    }
}

/// Stationary kernel `k(x, x') = variance * r((x - x') / lengthscales)`
///
/// Lengthscales are given either as a single value shared by every input
/// component or as one value per component.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(
        serialize = "F: Serialize, Corr: Serialize",
        deserialize = "F: Deserialize<'de>, Corr: Deserialize<'de>"
    ))
)]
pub struct Stationary<F: Float, Corr: CorrelationModel<F>> {
    corr: Corr,
    variance: F,
    lengthscales: Array1<F>,
}

/// Squared exponential (aka RBF) kernel
pub type SquaredExponential<F> = Stationary<F, SquaredExponentialCorr>;
/// Absolute exponential kernel
pub type AbsoluteExponential<F> = Stationary<F, AbsoluteExponentialCorr>;
/// Matern 3/2 kernel
pub type Matern32<F> = Stationary<F, Matern32Corr>;
/// Matern 5/2 kernel
pub type Matern52<F> = Stationary<F, Matern52Corr>;

impl<F: Float, Corr: CorrelationModel<F>> Default for Stationary<F, Corr> {
    fn default() -> Self {
        Stationary {
            corr: Corr::default(),
            variance: F::one(),
            lengthscales: array![F::one()],
        }
    }
}

impl<F: Float, Corr: CorrelationModel<F>> Stationary<F, Corr> {
    /// Constructor given process variance and lengthscales
    pub fn new(variance: F, lengthscales: Array1<F>) -> Self {
        Stationary {
            corr: Corr::default(),
            variance,
            lengthscales,
        }
    }

    /// Set process variance
    pub fn variance(mut self, variance: F) -> Self {
        self.variance = variance;
        self
    }

    /// Set lengthscales
    pub fn lengthscales(mut self, lengthscales: Array1<F>) -> Self {
        self.lengthscales = lengthscales;
        self
    }

    /// Process variance
    pub fn process_variance(&self) -> F {
        self.variance
    }

    /// Correlation model
    pub fn corr(&self) -> &Corr {
        &self.corr
    }

    /// Lengthscales as given at construction
    pub fn lengthscale_values(&self) -> &Array1<F> {
        &self.lengthscales
    }

    /// Lengthscales (nx,) for points of `nx` components, a single lengthscale being repeated
    pub fn lengthscales_for(&self, nx: usize) -> Array1<F> {
        if self.lengthscales.len() == 1 {
            Array1::from_elem(nx, self.lengthscales[0])
        } else {
            self.lengthscales.to_owned()
        }
    }

    fn scaled(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        x / &self.lengthscales
    }
}

impl<F: Float, Corr: CorrelationModel<F>> Kernel<F> for Stationary<F, Corr> {
    fn k(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        y: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Array2<F> {
        let d = pairwise_differences(&self.scaled(x), &self.scaled(y));
        let r = self.corr.value(&d);
        let ny = y.nrows();
        Array2::from_shape_fn((x.nrows(), ny), |(i, j)| self.variance * r[i * ny + j])
    }

    fn k_diag(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F> {
        Array1::from_elem(x.nrows(), self.variance)
    }

    fn check_input_dim(&self, nx: usize) -> Result<()> {
        let nl = self.lengthscales.len();
        if nl == 1 || nl == nx {
            Ok(())
        } else {
            Err(CondError::ShapeError(format!(
                "kernel has {nl} lengthscales, points have {nx} components"
            )))
        }
    }
}

impl<F: Float, Corr: CorrelationModel<F>> fmt::Display for Stationary<F, Corr> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}(variance={}, lengthscales={})",
            self.corr, self.variance, self.lengthscales
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use paste::paste;

    #[test]
    fn test_squared_exponential_value() {
        let k = SquaredExponential::<f64>::default();
        let x = array![[0.], [1.]];
        let expected = array![[1., 0.6065306597126334], [0.6065306597126334, 1.]];
        assert_abs_diff_eq!(k.k(&x, &x), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_squared_exponential_scaling() {
        let k = SquaredExponential::new(2., array![2.]);
        let x = array![[0.]];
        let y = array![[1.], [0.]];
        assert_abs_diff_eq!(
            k.k(&x, &y),
            array![[1.764993805169191, 2.]],
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(k.k_diag(&y), array![2., 2.]);
    }

    #[test]
    fn test_unit_distance_values() {
        let x = array![[0.]];
        let y = array![[1.]];
        assert_abs_diff_eq!(
            AbsoluteExponential::<f64>::default().k(&x, &y)[[0, 0]],
            0.36787944117144233,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            Matern32::<f64>::default().k(&x, &y)[[0, 0]],
            0.4833577245965077,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            Matern52::<f64>::default().k(&x, &y)[[0, 0]],
            0.5239941088318203,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_check_input_dim() {
        let k = SquaredExponential::new(1., array![1., 2.]);
        assert!(k.check_input_dim(2).is_ok());
        assert!(matches!(
            k.check_input_dim(3),
            Err(CondError::ShapeError(_))
        ));
        assert!(SquaredExponential::<f64>::default()
            .check_input_dim(5)
            .is_ok());
        assert_eq!(
            SquaredExponential::<f64>::default().lengthscales_for(3),
            array![1., 1., 1.]
        );
        assert_eq!(k.lengthscales_for(2), array![1., 2.]);
        assert_eq!(k.lengthscale_values(), &array![1., 2.]);
    }

    #[test]
    fn test_stationary_builder() {
        let k = Matern32::<f64>::default()
            .variance(3.)
            .lengthscales(array![0.5, 4.]);
        assert_eq!(k.process_variance(), 3.);
        assert_eq!(k.lengthscale_values(), &array![0.5, 4.]);
        assert_eq!(k.corr(), &Matern32Corr());
        assert_eq!(k, Matern32::new(3., array![0.5, 4.]));
        assert_eq!(k.to_string(), "Matern32(variance=3, lengthscales=[0.5, 4])");
        assert_abs_diff_eq!(k.k_diag(&array![[0., 0.], [1., 1.]]), array![3., 3.]);
    }

    macro_rules! test_kernel {
        ($kernel:ident) => {
            paste! {
                #[test]
                fn [<test_ $kernel:snake _covariance>]() {
                    let k = $kernel::new(1.5, array![0.5, 2.]);
                    let x = array![[0., 0.], [0.3, -1.], [1.2, 0.4], [-0.7, 2.]];
                    let full = k.k(&x, &x);
                    // symmetric with variance on the diagonal
                    assert_abs_diff_eq!(full, full.t(), epsilon = 1e-12);
                    assert_abs_diff_eq!(full.diag(), k.k_diag(&x), epsilon = 1e-12);
                    match k.covariance(&x, true) {
                        KernelCov::Diag(d) => assert_abs_diff_eq!(d, k.k_diag(&x)),
                        KernelCov::Full(_) => panic!("diagonal covariance expected"),
                    }
                    let kcov = k.covariance(&x, false);
                    assert_eq!(kcov.len(), 4);
                    assert_abs_diff_eq!(kcov.diag(), array![1.5, 1.5, 1.5, 1.5]);
                    // correlation decreases with the distance
                    let y = array![[0., 0.], [0.1, 0.], [1., 0.]];
                    let r = k.k(&array![[0., 0.]], &y);
                    assert!(r[[0, 0]] > r[[0, 1]] && r[[0, 1]] > r[[0, 2]]);
                }
            }
        };
    }

    test_kernel!(SquaredExponential);
    test_kernel!(AbsoluteExponential);
    test_kernel!(Matern32);
    test_kernel!(Matern52);
}
