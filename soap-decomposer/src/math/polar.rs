use ndarray::{Array2, ArrayView2};

use crate::Error;

const MAX_ITERATIONS: usize = 500;

/// Get the orthogonal factor `U` of the polar decomposition `A = U P` of the
/// square non-singular matrix `A`. This is also `U = (A Aᵀ)^{-1/2} A`.
///
/// The factor is computed with the Newton-Schulz iteration `X <- 3/2 X - 1/2 X
/// Xᵀ X`, starting from `A` scaled by its Frobenius norm. Each iteration only
/// involves products with `A`, which stays accurate when `A Aᵀ` is too badly
/// conditioned to be inverted.
pub fn orthogonal_polar_factor(matrix: ArrayView2<'_, f64>) -> Result<Array2<f64>, Error> {
    assert_eq!(matrix.nrows(), matrix.ncols(), "expected a square matrix");
    let size = matrix.nrows();

    let norm = matrix.iter().map(|v| v * v).sum::<f64>().sqrt();
    if !(norm > 0.0 && norm.is_finite()) {
        return Err(Error::Configuration(format!(
            "can not orthonormalize a matrix with Frobenius norm {}", norm
        )));
    }

    let identity = Array2::<f64>::eye(size);
    let mut factor = matrix.mapv(|v| v / norm);
    for _ in 0..MAX_ITERATIONS {
        let gram = factor.t().dot(&factor);
        let deviation = (&gram - &identity).iter().fold(0.0, |max, v| f64::max(max, v.abs()));

        let next = 1.5 * &factor - 0.5 * factor.dot(&gram);
        factor = next;

        // convergence is quadratic at this point, one more step is enough
        if deviation < 1e-10 {
            return Ok(factor);
        }
    }

    return Err(Error::Configuration(format!(
        "failed to orthonormalize a {}x{} matrix, it is numerically singular",
        size, size
    )));
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    use super::*;

    #[test]
    fn rotation() {
        let (sin, cos) = f64::sin_cos(0.3);
        let rotation = array![[cos, -sin], [sin, cos]];

        let factor = orthogonal_polar_factor((3.5 * &rotation).view()).unwrap();
        assert_abs_diff_eq!(factor, rotation, epsilon = 1e-14);
    }

    #[test]
    fn symmetric_positive() {
        // the polar factor of a symmetric positive definite matrix is the identity
        let matrix = array![[2.0, 0.5, 0.1], [0.5, 1.0, 0.2], [0.1, 0.2, 0.3]];
        let factor = orthogonal_polar_factor(matrix.view()).unwrap();
        assert_abs_diff_eq!(factor, Array2::<f64>::eye(3), epsilon = 1e-13);
    }

    #[test]
    fn triangular() {
        let matrix = array![[1.0, 0.0, 0.0], [0.9, 0.1, 0.0], [0.8, 0.15, 0.01]];
        let factor = orthogonal_polar_factor(matrix.view()).unwrap();

        assert_abs_diff_eq!(factor.t().dot(&factor), Array2::<f64>::eye(3), epsilon = 1e-13);
        // U^T A = P is symmetric positive definite
        let positive = factor.t().dot(&matrix);
        assert_abs_diff_eq!(positive, positive.t(), epsilon = 1e-13);
        assert!((0..3).all(|i| positive[[i, i]] > 0.0));
    }

    #[test]
    fn singular() {
        let error = orthogonal_polar_factor(Array2::zeros((2, 2)).view()).unwrap_err();
        assert!(matches!(error, Error::Configuration(_)));

        let error = orthogonal_polar_factor(array![[1.0, f64::NAN], [0.0, 1.0]].view()).unwrap_err();
        assert!(matches!(error, Error::Configuration(_)));
    }
}
