use linfa::Float;
use ndarray::{Array2, ArrayBase, Data, Ix2, Zip};

/// Computes differences between each row of x and each row of y
/// resulting in a 2d array of shape (nrows(x) * nrows(y), ncols(x)),
/// the difference between `x_i` and `y_j` being stored at row `i * nrows(y) + j`.
/// *Panics* if x and y have not the same column numbers
pub fn pairwise_differences<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    y: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Array2<F> {
    assert!(x.ncols() == y.ncols());
    let ny = y.nrows();
    Array2::from_shape_fn((x.nrows() * ny, x.ncols()), |(idx, k)| {
        x[[idx / ny, k]] - y[[idx % ny, k]]
    })
}

/// Diagonal (m, m) matrix `jitter * I` used to regularize a covariance matrix
/// before its cholesky factorization
pub fn jitter_eye<F: Float>(m: usize, jitter: F) -> Array2<F> {
    Array2::eye(m).mapv(|v: F| v * jitter)
}

/// Lower triangular part of a square matrix, the upper part being set to zero
pub(crate) fn lower_triangle<F: Float>(a: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
    let mut low = a.to_owned();
    Zip::indexed(&mut low).for_each(|(i, j), v| {
        if j > i {
            *v = F::zero();
        }
    });
    low
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_pairwise_differences() {
        let x = array![[-0.9486833], [-0.82219219]];
        let y = array![
            [-1.26491106],
            [-0.63245553],
            [0.],
            [0.63245553],
            [1.26491106]
        ];
        assert_abs_diff_eq!(
            &array![
                [0.31622777],
                [-0.31622777],
                [-0.9486833],
                [-1.58113883],
                [-2.21359436],
                [0.44271887],
                [-0.18973666],
                [-0.82219219],
                [-1.45464772],
                [-2.08710326]
            ],
            &pairwise_differences(&x, &y),
            epsilon = 1e-6
        )
    }

    #[test]
    fn test_pairwise_differences_rows_order() {
        let x = array![[1., 2.], [3., 4.]];
        let y = array![[0., 1.], [1., 0.], [2., 2.]];
        let d = pairwise_differences(&x, &y);
        assert_eq!(d.dim(), (6, 2));
        assert_eq!(d.row(1), array![0., 2.]);
        assert_eq!(d.row(5), array![1., 2.]);
    }

    #[test]
    fn test_jitter_eye() {
        let j = jitter_eye(3, 1e-6);
        assert_abs_diff_eq!(j.diag().sum(), 3e-6, epsilon = 1e-15);
        assert_eq!(j[[0, 1]], 0.);
        assert_eq!(j.dim(), (3, 3));
    }

    #[test]
    fn test_lower_triangle() {
        let a = array![[1., 2., 3.], [4., 5., 6.], [7., 8., 9.]];
        assert_eq!(
            array![[1., 0., 0.], [4., 5., 0.], [7., 8., 9.]],
            lower_triangle(&a)
        );
    }
}
