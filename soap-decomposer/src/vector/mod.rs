use std::path::Path;
use std::sync::{Arc, Mutex};

use ndarray::{Array1, Array2, Array4, ArrayView1, ArrayView4, Axis, s};

use crate::{BasisParameters, Decomposer, DistributionKind, Error};
use crate::math::trapezoid_weights;

mod cache;
pub use self::cache::DEFAULT_CACHE_CAPACITY;
use self::cache::{CacheKey, CurveKind, DistributionCache};

const VECTOR_FORMAT: &str = "soap-vector";

/// Power spectrum coefficients of a single atomic environment, together with
/// the basis used to compute them.
///
/// The coefficients are a 4-dimensional tensor indexed by `(species pair, n1,
/// n2, l)`, and are never modified after construction. Radial and angular
/// distribution functions computed from these coefficients are memoized in a
/// small least-recently used cache.
pub struct SoapVector {
    coefficients: Array4<f64>,
    decomposer: Arc<Decomposer>,
    cache: Mutex<DistributionCache>,
}

impl std::fmt::Debug for SoapVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoapVector")
            .field("parameters", self.decomposer.parameters())
            .field("shape", &self.coefficients.shape())
            .finish_non_exhaustive()
    }
}

impl Clone for SoapVector {
    fn clone(&self) -> SoapVector {
        let capacity = self.cache.lock().expect("mutex was poisoned").capacity();
        SoapVector {
            coefficients: self.coefficients.clone(),
            decomposer: Arc::clone(&self.decomposer),
            cache: Mutex::new(DistributionCache::new(capacity)),
        }
    }
}

impl PartialEq for SoapVector {
    fn eq(&self, other: &SoapVector) -> bool {
        self.strict_equals(other)
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct StoredVector {
    basis: BasisParameters,
    coefficients: Array4<f64>,
}

impl SoapVector {
    /// Create a new vector from the power spectrum `coefficients` computed
    /// with the basis of `decomposer`. All coefficients must be finite.
    pub fn new(coefficients: Array4<f64>, decomposer: Arc<Decomposer>) -> Result<SoapVector, Error> {
        decomposer.check_shape(coefficients.shape())?;

        if let Some((index, value)) = coefficients.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(Error::InvalidDomain(format!(
                "power spectrum coefficients must be finite, got {} at {:?}", value, index
            )));
        }

        return Ok(SoapVector {
            coefficients: coefficients,
            decomposer: decomposer,
            cache: Mutex::new(DistributionCache::new(DEFAULT_CACHE_CAPACITY)),
        });
    }

    /// Create a new vector with its own `Decomposer` for the given basis
    /// `parameters`
    pub fn with_parameters(coefficients: Array4<f64>, parameters: BasisParameters) -> Result<SoapVector, Error> {
        let decomposer = Decomposer::new(parameters)?;
        return SoapVector::new(coefficients, Arc::new(decomposer));
    }

    pub fn coefficients(&self) -> ArrayView4<'_, f64> {
        self.coefficients.view()
    }

    /// Get the decomposer shared by this vector
    pub fn decomposer(&self) -> &Arc<Decomposer> {
        &self.decomposer
    }

    pub fn parameters(&self) -> &BasisParameters {
        self.decomposer.parameters()
    }

    /// Set the maximal number of curves memoized by this vector
    pub fn set_cache_capacity(&self, capacity: usize) {
        self.cache.lock().expect("mutex was poisoned").set_capacity(capacity);
    }

    /// Compute the radial distribution function on the given `grid`:
    ///
    /// `ρ(r) = Σ_s Σ_{n1, n2} p[s, n1, n2, 0] g_n1(r) g_n2(r)`
    ///
    /// If `zero_mean` is true, the mean value of `ρ` over the grid (computed
    /// with trapezoidal weights) is subtracted from the result.
    pub fn rdf(&self, grid: ArrayView1<'_, f64>, zero_mean: bool) -> Result<Array1<f64>, Error> {
        DistributionKind::Radial.check_grid(grid)?;

        let key = CacheKey::new(CurveKind::Rdf { zero_mean }, grid);
        if let Some(values) = self.cache.lock().expect("mutex was poisoned").get(&key) {
            return Ok(values);
        }

        let values = self.compute_rdf(grid, zero_mean);
        self.cache.lock().expect("mutex was poisoned").insert(key, values.clone());
        return Ok(values);
    }

    /// Compute the angular distribution function on the given `grid`:
    ///
    /// `A(θ) = Σ_l (Σ_s Σ_n p[s, n, n, l]) (2l + 1) / 4π P_l(cos θ)`
    pub fn adf(&self, grid: ArrayView1<'_, f64>) -> Result<Array1<f64>, Error> {
        DistributionKind::Angular.check_grid(grid)?;

        let key = CacheKey::new(CurveKind::Adf, grid);
        if let Some(values) = self.cache.lock().expect("mutex was poisoned").get(&key) {
            return Ok(values);
        }

        let values = self.compute_adf(grid);
        self.cache.lock().expect("mutex was poisoned").insert(key, values.clone());
        return Ok(values);
    }

    fn compute_rdf(&self, grid: ArrayView1<'_, f64>, zero_mean: bool) -> Array1<f64> {
        // contract the species pairs once, only the l=0 channel contributes
        let radial_coefficients: Array2<f64> = self.coefficients
            .slice(s![.., .., .., 0])
            .sum_axis(Axis(0));

        let mut basis = vec![0.0; self.decomposer.max_radial()];
        let mut values = Array1::zeros(grid.len());
        for (value, &r) in values.iter_mut().zip(grid) {
            self.decomposer.radial(r, &mut basis);
            let basis = ArrayView1::from(&basis[..]);
            *value = basis.dot(&radial_coefficients.dot(&basis));
        }

        if zero_mean && !values.is_empty() {
            let weights = trapezoid_weights(grid);
            let total_weight = weights.sum();
            let mean = if total_weight == 0.0 {
                values.mean().unwrap_or(0.0)
            } else {
                values.dot(&weights) / total_weight
            };
            values -= mean;
        }

        return values;
    }

    fn compute_adf(&self, grid: ArrayView1<'_, f64>) -> Array1<f64> {
        let max_angular = self.decomposer.max_angular();

        let mut angular_coefficients = Array1::<f64>::zeros(max_angular + 1);
        for pair in self.coefficients.outer_iter() {
            for n in 0..self.decomposer.max_radial() {
                angular_coefficients += &pair.slice(s![n, n, ..]);
            }
        }

        let mut weights = vec![0.0; max_angular + 1];
        let mut values = Array1::zeros(grid.len());
        for (value, &theta) in values.iter_mut().zip(grid) {
            self.decomposer.angular(theta, &mut weights);
            *value = angular_coefficients.dot(&ArrayView1::from(&weights[..]));
        }

        return values;
    }

    /// Check if both vectors have the same basis and exactly the same
    /// coefficients
    pub fn strict_equals(&self, other: &SoapVector) -> bool {
        self.parameters() == other.parameters() && self.coefficients == other.coefficients
    }

    /// Check if both vectors have the same shape and if the maximal absolute
    /// difference between their coefficients is below `tolerance`. Comparing
    /// vectors computed with different bases is an error.
    pub fn approx_equals(&self, other: &SoapVector, tolerance: f64) -> Result<bool, Error> {
        if tolerance < 0.0 || !tolerance.is_finite() {
            return Err(Error::Configuration(format!(
                "expected a non-negative tolerance, got {}", tolerance
            )));
        }

        self.decomposer.check_compatible(other.parameters())?;
        if self.coefficients.shape() != other.coefficients.shape() {
            return Ok(false);
        }

        return Ok(self.coefficients.abs_diff_eq(&other.coefficients, tolerance));
    }

    /// Write this vector to the file at `path`. If the path ends with `.gz`,
    /// the file is compressed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let stored = StoredVector {
            basis: *self.parameters(),
            coefficients: self.coefficients.clone(),
        };
        return crate::io::write_json(path.as_ref(), VECTOR_FORMAT, &stored);
    }

    /// Load a vector previously written with [`SoapVector::save`]
    pub fn from_file(path: impl AsRef<Path>) -> Result<SoapVector, Error> {
        let path = path.as_ref();
        let stored: StoredVector = crate::io::read_json(path, VECTOR_FORMAT)?;
        stored.basis.validate().map_err(|e| Error::Persistence(format!(
            "invalid basis in '{}': {}", path.display(), e
        )))?;

        return SoapVector::with_parameters(stored.coefficients, stored.basis).map_err(|e| {
            Error::Persistence(format!("invalid coefficients in '{}': {}", path.display(), e))
        });
    }
}
