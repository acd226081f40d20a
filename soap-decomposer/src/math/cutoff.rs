use ndarray::{Array1, ArrayView1};

use crate::Error;

/// Shifted cosine switching function, used to smoothly bring atomic
/// contributions to zero at the edge of the environment:
///
/// `f(r) = 1/2 * (1 + cos(π (r - radius + width) / width))`
///
/// for `radius - width < r < radius`, 1 below this window and 0 above.
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CutoffFunction {
    /// Radius of the spherical cutoff
    pub radius: f64,
    /// Width of the transition region below `radius`
    pub width: f64,
}

impl CutoffFunction {
    /// Create a new cutoff function, checking that both `radius` and `width`
    /// are positive
    pub fn new(radius: f64, width: f64) -> Result<CutoffFunction, Error> {
        let cutoff = CutoffFunction { radius, width };
        cutoff.validate()?;
        return Ok(cutoff);
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.radius <= 0.0 || !self.radius.is_finite() {
            return Err(Error::Configuration(format!(
                "expected positive cutoff radius, got {}", self.radius
            )));
        }

        if self.width <= 0.0 || !self.width.is_finite() {
            return Err(Error::Configuration(format!(
                "expected positive width for shifted cosine cutoff function, got {}",
                self.width
            )));
        }
        return Ok(());
    }

    /// Evaluate the cutoff function at the distance `r`
    pub fn compute(&self, r: f64) -> f64 {
        if r <= (self.radius - self.width) {
            1.0
        } else if r >= self.radius {
            0.0
        } else {
            let s = std::f64::consts::PI * (r - self.radius + self.width) / self.width;
            0.5 * (1. + f64::cos(s))
        }
    }

    /// Evaluate the derivative of the cutoff function at the distance `r`
    pub fn derivative(&self, r: f64) -> f64 {
        if r <= (self.radius - self.width) || r >= self.radius {
            0.0
        } else {
            let s = std::f64::consts::PI * (r - self.radius + self.width) / self.width;
            return -0.5 * std::f64::consts::PI * f64::sin(s) / self.width;
        }
    }

    /// Evaluate the cutoff function on all points of `grid`
    pub fn compute_all(&self, grid: ArrayView1<'_, f64>) -> Array1<f64> {
        grid.mapv(|r| self.compute(r))
    }
}

/// Evaluate the shifted cosine cutoff function with the given `radius` and
/// transition `width` on every point of `grid`.
pub fn fcut(grid: &[f64], radius: f64, width: f64) -> Result<Array1<f64>, Error> {
    let cutoff = CutoffFunction::new(radius, width)?;
    return Ok(cutoff.compute_all(ArrayView1::from(grid)));
}
