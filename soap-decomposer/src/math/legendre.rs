/// Evaluate Legendre polynomials `P_l(x)` for all `0 <= l <= l_max` with
/// Bonnet's recursion formula:
///
/// `(l + 1) P_{l + 1}(x) = (2l + 1) x P_l(x) - l P_{l - 1}(x)`
#[derive(Debug, Clone)]
pub struct LegendrePolynomials {
    max_angular: usize,
    /// `(2l + 1) / (l + 1)` and `l / (l + 1)` for each step of the recursion
    coefficients: Vec<(f64, f64)>,
}

impl LegendrePolynomials {
    pub fn new(max_angular: usize) -> LegendrePolynomials {
        let coefficients = (0..max_angular).map(|l| {
            let l = l as f64;
            ((2.0 * l + 1.0) / (l + 1.0), l / (l + 1.0))
        }).collect();

        LegendrePolynomials {
            max_angular: max_angular,
            coefficients: coefficients,
        }
    }

    pub fn max_angular(&self) -> usize {
        self.max_angular
    }

    /// Compute all polynomials at `x`, storing `P_l(x)` in `values[l]`.
    /// `values` must contain exactly `max_angular + 1` elements.
    pub fn compute(&self, x: f64, values: &mut [f64]) {
        assert_eq!(values.len(), self.max_angular + 1);

        values[0] = 1.0;
        if self.max_angular == 0 {
            return;
        }
        values[1] = x;

        for (l, &(a, b)) in self.coefficients.iter().enumerate().skip(1) {
            values[l + 1] = a * x * values[l] - b * values[l - 1];
        }
    }
}
