use ndarray::Array1;

use crate::Error;

mod radial;
pub use self::radial::PolynomialRadialBasis;

mod angular;
pub use self::angular::AngularBasis;

/// Number of points in the grids used when none is given explicitly
pub const DEFAULT_GRID_POINTS: usize = 100;

/// Parameters of the SOAP expansion that produced a set of power spectrum
/// coefficients.
///
/// Each power spectrum is a tensor indexed by `(species pair, n1, n2, l)`
/// with `0 <= n1, n2 < max_radial` and `0 <= l <= max_angular`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct BasisParameters {
    /// Spherical cutoff radius of the atomic environments
    pub cutoff: f64,
    /// Maximal angular degree of the spherical harmonics
    pub max_angular: usize,
    /// Number of radial basis functions
    pub max_radial: usize,
}

impl BasisParameters {
    /// Parse the parameters from a JSON string and validate them
    pub fn from_json(json: &str) -> Result<BasisParameters, Error> {
        let parameters = serde_json::from_str::<BasisParameters>(json)?;
        parameters.validate()?;
        return Ok(parameters);
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.cutoff <= 0.0 || !self.cutoff.is_finite() {
            return Err(Error::Configuration(format!(
                "expected positive cutoff radius, got {}", self.cutoff
            )));
        }

        if self.max_radial < 1 {
            return Err(Error::Configuration(
                "expected at least one radial basis function, got max_radial = 0".into()
            ));
        }

        return Ok(());
    }

    /// Shape of the `(n1, n2, l)` part of power spectrum tensors created with
    /// these parameters
    pub fn features_shape(&self) -> [usize; 3] {
        [self.max_radial, self.max_radial, self.max_angular + 1]
    }
}

/// Basis definition used to invert power spectrum coefficients back into
/// radial and angular distribution functions.
///
/// A `Decomposer` is immutable, and is usually shared between many vectors
/// through an `Arc`. Two decomposers are equal iff they have exactly the same
/// parameters.
#[derive(Debug, Clone)]
pub struct Decomposer {
    parameters: BasisParameters,
    radial: PolynomialRadialBasis,
    angular: AngularBasis,
}

impl PartialEq for Decomposer {
    fn eq(&self, other: &Decomposer) -> bool {
        self.parameters == other.parameters
    }
}

impl Decomposer {
    pub fn new(parameters: BasisParameters) -> Result<Decomposer, Error> {
        parameters.validate()?;

        return Ok(Decomposer {
            parameters: parameters,
            radial: PolynomialRadialBasis::new(parameters.max_radial, parameters.cutoff)?,
            angular: AngularBasis::new(parameters.max_angular),
        });
    }

    pub fn parameters(&self) -> &BasisParameters {
        &self.parameters
    }

    pub fn cutoff(&self) -> f64 {
        self.parameters.cutoff
    }

    pub fn max_radial(&self) -> usize {
        self.parameters.max_radial
    }

    pub fn max_angular(&self) -> usize {
        self.parameters.max_angular
    }

    /// Evaluate the radial basis functions at `r`, `values` must contain
    /// `max_radial` elements
    pub fn radial(&self, r: f64, values: &mut [f64]) {
        self.radial.compute(r, values);
    }

    /// Evaluate the angular weights at `theta`, `values` must contain
    /// `max_angular + 1` elements
    pub fn angular(&self, theta: f64, values: &mut [f64]) {
        self.angular.compute(theta, values);
    }

    /// Default grid for radial distributions: evenly spaced points between 0
    /// and the cutoff
    pub fn default_radial_grid(&self) -> Array1<f64> {
        Array1::linspace(0.0, self.parameters.cutoff, DEFAULT_GRID_POINTS)
    }

    /// Default grid for angular distributions: evenly spaced points between 0
    /// and π
    pub fn default_angular_grid(&self) -> Array1<f64> {
        Array1::linspace(0.0, std::f64::consts::PI, DEFAULT_GRID_POINTS)
    }

    /// Check that a coefficient tensor with the given `shape` could have been
    /// produced with this basis
    pub fn check_shape(&self, shape: &[usize]) -> Result<(), Error> {
        let expected = self.parameters.features_shape();
        if shape.len() != 4 || shape[1..] != expected {
            return Err(Error::IncompatibleBasis(format!(
                "expected coefficients with shape [n_pairs, {}, {}, {}] for \
                max_radial = {} and max_angular = {}, got {:?}",
                expected[0], expected[1], expected[2],
                self.parameters.max_radial, self.parameters.max_angular, shape
            )));
        }

        if shape[0] == 0 {
            return Err(Error::IncompatibleBasis(
                "coefficients must contain at least one species pair".into()
            ));
        }

        return Ok(());
    }

    /// Check that `other` is compatible with this basis
    pub(crate) fn check_compatible(&self, other: &BasisParameters) -> Result<(), Error> {
        if &self.parameters != other {
            return Err(Error::IncompatibleBasis(format!(
                "can not mix data computed with {:?} and {:?}",
                self.parameters, other
            )));
        }
        return Ok(());
    }
}
