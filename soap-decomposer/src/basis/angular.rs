use crate::math::LegendrePolynomials;

/// Angular basis used to reconstruct angular distributions from the power
/// spectrum. For each angular channel `l`, the weight at angle `θ` is given
/// by the addition theorem of spherical harmonics:
///
/// `\sum_m Y_l^m(\hat{u}) Y_l^m(\hat{v}) = (2l + 1) / (4π) P_l(cos θ)`
///
/// where `θ` is the angle between `\hat{u}` and `\hat{v}`.
#[derive(Debug, Clone)]
pub struct AngularBasis {
    legendre: LegendrePolynomials,
    /// `(2l + 1) / (4π)`
    prefactors: Vec<f64>,
}

impl AngularBasis {
    pub fn new(max_angular: usize) -> AngularBasis {
        let prefactors = (0..=max_angular)
            .map(|l| (2.0 * l as f64 + 1.0) / (4.0 * std::f64::consts::PI))
            .collect();

        AngularBasis {
            legendre: LegendrePolynomials::new(max_angular),
            prefactors: prefactors,
        }
    }

    pub fn max_angular(&self) -> usize {
        self.legendre.max_angular()
    }

    /// Evaluate the weights of all angular channels at `theta`, storing the
    /// value for channel `l` in `values[l]`.
    pub fn compute(&self, theta: f64, values: &mut [f64]) {
        self.legendre.compute(f64::cos(theta), values);
        for (value, prefactor) in values.iter_mut().zip(&self.prefactors) {
            *value *= prefactor;
        }
    }
}
