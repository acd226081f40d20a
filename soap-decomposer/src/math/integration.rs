use ndarray::{Array1, ArrayView1};

use super::LegendrePolynomials;

/// Get the weights of the trapezoidal rule on the (possibly non-uniform)
/// `grid`, such that `∫ f ≈ Σ_i w_i f(x_i)`. Grids with less than two points
/// have zero weights.
pub fn trapezoid_weights(grid: ArrayView1<'_, f64>) -> Array1<f64> {
    let mut weights = Array1::zeros(grid.len());
    for i in 1..grid.len() {
        let half_step = 0.5 * (grid[i] - grid[i - 1]);
        weights[i - 1] += half_step;
        weights[i] += half_step;
    }
    return weights;
}

/// Integrate `values` sampled on `grid` with the trapezoidal rule
pub fn trapezoid(grid: ArrayView1<'_, f64>, values: ArrayView1<'_, f64>) -> f64 {
    assert_eq!(grid.len(), values.len());
    trapezoid_weights(grid).dot(&values)
}

/// Get the nodes and weights of the `n` points Gauss-Legendre quadrature on
/// `[-1, 1]`, which integrates exactly polynomials of degree up to `2n - 1`.
/// The nodes are the roots of `P_n`, found with Newton's method.
pub fn gauss_legendre(n: usize) -> (Vec<f64>, Vec<f64>) {
    assert!(n > 0, "Gauss-Legendre quadrature needs at least one point");

    let legendre = LegendrePolynomials::new(n);
    let mut polynomials = vec![0.0; n + 1];
    // value of P_n and of its derivative at x
    let mut evaluate = |x: f64| {
        legendre.compute(x, &mut polynomials);
        let derivative = n as f64 * (x * polynomials[n] - polynomials[n - 1]) / (x * x - 1.0);
        (polynomials[n], derivative)
    };

    let mut nodes = Vec::with_capacity(n);
    let mut weights = Vec::with_capacity(n);
    for i in 0..n {
        let mut x = f64::cos(std::f64::consts::PI * (i as f64 + 0.75) / (n as f64 + 0.5));
        for _ in 0..100 {
            let (value, derivative) = evaluate(x);
            let step = value / derivative;
            x -= step;
            if step.abs() < 1e-15 {
                break;
            }
        }

        let (_, derivative) = evaluate(x);
        nodes.push(x);
        weights.push(2.0 / ((1.0 - x * x) * derivative * derivative));
    }

    return (nodes, weights);
}

#[cfg(test)]
mod tests {
    use approx::{assert_relative_eq, assert_ulps_eq};
    use ndarray::{Array1, array};
    use super::*;

    #[test]
    fn linear_function() {
        let grid = Array1::linspace(0.0, 2.0, 11);
        let values = grid.mapv(|x| 3.0 * x + 1.0);
        assert_ulps_eq!(trapezoid(grid.view(), values.view()), 8.0, max_ulps = 10);
    }

    #[test]
    fn non_uniform() {
        let grid = array![0.0, 0.5, 2.0];
        let weights = trapezoid_weights(grid.view());
        assert_eq!(weights, array![0.25, 1.0, 0.75]);
    }

    #[test]
    fn degenerate() {
        assert_eq!(trapezoid_weights(array![3.0].view()), array![0.0]);
        assert_eq!(trapezoid(Array1::zeros(0).view(), Array1::zeros(0).view()), 0.0);
    }

    #[test]
    fn gauss_legendre_polynomials() {
        let (nodes, weights) = gauss_legendre(1);
        assert_eq!(nodes, [0.0]);
        assert_eq!(weights, [2.0]);

        let (nodes, weights) = gauss_legendre(3);
        assert_relative_eq!(nodes[0], -nodes[2], max_relative = 1e-14);
        assert_relative_eq!(nodes[0], f64::sqrt(0.6), max_relative = 1e-14);
        assert_relative_eq!(weights[1], 8.0 / 9.0, max_relative = 1e-14);

        for n in [4, 7, 12] {
            let (nodes, weights) = gauss_legendre(n);
            assert_relative_eq!(weights.iter().sum::<f64>(), 2.0, max_relative = 1e-13);

            // exact up to degree 2n - 1
            let degree = 2 * n - 2;
            let integral = nodes.iter().zip(&weights)
                .map(|(&x, &w)| w * x.powi(degree as i32))
                .sum::<f64>();
            assert_relative_eq!(integral, 2.0 / (degree as f64 + 1.0), max_relative = 1e-12);
        }
    }
}
