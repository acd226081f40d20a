use ndarray::Array2;

use crate::Error;
use crate::math::{gauss_legendre, orthogonal_polar_factor};

/// Orthonormal radial basis used by SOAP descriptors in QUIP, built from the
/// polynomials
///
/// `φ_α(r) = \sqrt{(2α + 5) / cutoff^(2α + 5)} (cutoff - r)^(α + 2)` for `1 <= α <= max_radial`
///
/// orthonormalized symmetrically: `g = S^{-1/2} φ` with `S` the overlap
/// matrix of the `φ_α` (see [`PolynomialRadialBasis::overlap`]).
///
/// `S` becomes numerically singular in double precision for `max_radial >
/// 9`, so it is never inverted directly. With `x = 1 - r / cutoff`, the same
/// functions are spanned by `h_n(r) = \sqrt{(2n + 7) / cutoff} x^3 P_n^(0,
/// 6)(2x - 1)`, with `P_n^(0, 6)` Jacobi polynomials evaluated through their
/// three-term recurrence relation. Writing `φ = L h` where `L` contains the
/// projections of `φ` on `h`, we have `S = L Lᵀ`, and `g = S^{-1/2} L h`. The
/// rotation `S^{-1/2} L` is the orthogonal factor of the polar decomposition
/// of `L`, which can be computed without forming `S`.
#[derive(Debug, Clone)]
pub struct PolynomialRadialBasis {
    max_radial: usize,
    cutoff: f64,
    /// `(a_n, b_n, c_n)` such that `P_n(t) = (a_n t + b_n) P_{n - 1}(t) - c_n P_{n - 2}(t)`
    recurrence: Vec<[f64; 3]>,
    /// `\sqrt{2n + 7}`
    normalization: Vec<f64>,
    /// rotation from the Jacobi functions `h_n` to the orthonormalized
    /// polynomials `g_n`
    rotation: Array2<f64>,
}

/// Exponent `β` of the `(1 + t)^β` Jacobi weight, coming from the `x^3`
/// prefactor shared by all functions of the basis
const JACOBI_BETA: f64 = 6.0;

impl PolynomialRadialBasis {
    pub fn new(max_radial: usize, cutoff: f64) -> Result<PolynomialRadialBasis, Error> {
        let beta = JACOBI_BETA;
        let mut recurrence = Vec::with_capacity(max_radial);
        // P_0 = 1, nothing to do for it
        recurrence.push([0.0, 0.0, 0.0]);
        for n in 1..max_radial {
            let n = n as f64;
            let two_n_beta = 2.0 * n + beta;
            let denominator = 2.0 * n * (n + beta) * (two_n_beta - 2.0);

            let a = (two_n_beta - 1.0) * two_n_beta * (two_n_beta - 2.0) / denominator;
            let b = -(two_n_beta - 1.0) * beta * beta / denominator;
            let c = 2.0 * (n - 1.0) * (n + beta - 1.0) * two_n_beta / denominator;
            recurrence.push([a, b, c]);
        }

        let normalization = (0..max_radial)
            .map(|n| f64::sqrt(2.0 * n as f64 + beta + 1.0))
            .collect();

        let mut basis = PolynomialRadialBasis {
            max_radial,
            cutoff,
            recurrence,
            normalization,
            rotation: Array2::eye(max_radial),
        };

        let projections = basis.projections();
        basis.rotation = orthogonal_polar_factor(projections.view()).map_err(|_| Error::Configuration(format!(
            "the radial basis can not be orthonormalized for max_radial = {}", max_radial
        )))?;

        return Ok(basis);
    }

    pub fn max_radial(&self) -> usize {
        self.max_radial
    }

    /// Get the overlap matrix `S_αβ = \sqrt{(2α + 5)(2β + 5)} / (α + β + 5)`
    /// of the non-orthonormalized polynomials, which does not depend on the
    /// cutoff. Rows and columns are indexed by `α - 1`.
    pub fn overlap(max_radial: usize) -> Array2<f64> {
        Array2::from_shape_fn((max_radial, max_radial), |(a, b)| {
            let alpha = a as f64 + 1.0;
            let beta = b as f64 + 1.0;
            f64::sqrt((2.0 * alpha + 5.0) * (2.0 * beta + 5.0)) / (alpha + beta + 5.0)
        })
    }

    /// Evaluate all the radial basis functions at `r`, storing `g_n(r)` in
    /// `values[n]`. All functions are zero at and beyond the cutoff.
    pub fn compute(&self, r: f64, values: &mut [f64]) {
        assert_eq!(values.len(), self.max_radial);

        if r >= self.cutoff {
            values.fill(0.0);
            return;
        }

        let mut jacobi = vec![0.0; self.max_radial];
        self.jacobi(1.0 - r / self.cutoff, &mut jacobi);

        let scale = 1.0 / self.cutoff.sqrt();
        for (value, rotation) in values.iter_mut().zip(self.rotation.outer_iter()) {
            *value = scale * rotation.iter().zip(&jacobi).map(|(a, b)| a * b).sum::<f64>();
        }
    }

    /// Evaluate `\sqrt{2n + 7} x^3 P_n^(0, 6)(2x - 1)`, i.e. the functions
    /// `h_n` for a cutoff of 1
    fn jacobi(&self, x: f64, values: &mut [f64]) {
        let t = 2.0 * x - 1.0;

        let mut previous = 0.0;
        let mut current = 1.0;
        for n in 0..self.max_radial {
            if n > 0 {
                let [a, b, c] = self.recurrence[n];
                let next = (a * t + b) * current - c * previous;
                previous = current;
                current = next;
            }
            values[n] = current;
        }

        let x3 = x * x * x;
        for (value, normalization) in values.iter_mut().zip(&self.normalization) {
            *value *= x3 * normalization;
        }
    }

    /// Compute `L_αn = ∫ φ_α h_n`, exactly with a Gauss-Legendre quadrature
    /// since both functions are polynomials. `L` is lower triangular.
    fn projections(&self) -> Array2<f64> {
        let n_max = self.max_radial;
        let (nodes, weights) = gauss_legendre(n_max + 4);

        let mut jacobi = vec![0.0; n_max];
        let mut projections = Array2::zeros((n_max, n_max));
        for (&node, &weight) in nodes.iter().zip(&weights) {
            // map [-1, 1] to x in [0, 1]
            let x = 0.5 * (node + 1.0);
            self.jacobi(x, &mut jacobi);

            for (a, mut row) in projections.outer_iter_mut().enumerate() {
                let alpha = a as f64 + 1.0;
                let polynomial = f64::sqrt(2.0 * alpha + 5.0) * x.powi(a as i32 + 3);
                for (projection, &h) in row.iter_mut().zip(&jacobi) {
                    *projection += 0.5 * weight * polynomial * h;
                }
            }
        }

        return projections;
    }
}
