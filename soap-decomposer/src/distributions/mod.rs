use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use once_cell::sync::OnceCell;

use crate::{BasisParameters, Error};
use crate::math::trapezoid_weights;

mod unique;
pub use self::unique::{Representative, UniqueSet};

mod persistence;

/// Kind of distribution function stored in a `DistributionCollection`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DistributionKind {
    /// Radial distribution function, sampled on distances `r >= 0`
    Radial,
    /// Angular distribution function, sampled on angles `0 <= θ <= π`
    Angular,
}

impl DistributionKind {
    /// Check that all the points in `grid` are in the domain of this kind of
    /// distribution
    pub fn check_grid(&self, grid: ArrayView1<'_, f64>) -> Result<(), Error> {
        for (i, &x) in grid.iter().enumerate() {
            match self {
                DistributionKind::Radial => {
                    if !x.is_finite() || x < 0.0 {
                        return Err(Error::InvalidDomain(format!(
                            "radial grid must only contain finite, non-negative \
                            distances, got {} at position {}", x, i
                        )));
                    }
                }
                DistributionKind::Angular => {
                    if !x.is_finite() || !(0.0..=std::f64::consts::PI).contains(&x) {
                        return Err(Error::InvalidDomain(format!(
                            "angular grid must only contain angles between 0 and π, \
                            got {} at position {}", x, i
                        )));
                    }
                }
            }
        }
        return Ok(());
    }
}

/// Tolerances used when comparing distribution curves.
///
/// All tolerances are absolute, and must be positive.
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Tolerances {
    /// Two curves are considered the same distribution (and end up in the same
    /// equivalence class when computing unique curves) if the maximal absolute
    /// difference between their values is below this threshold
    pub dedup: f64,
    /// Maximal absolute difference between values for `approx_equals`
    pub values: f64,
    /// Maximal absolute difference between norms for `approx_equals`
    pub norm: f64,
}

impl Default for Tolerances {
    fn default() -> Tolerances {
        Tolerances {
            dedup: 1e-3,
            values: 1e-8,
            norm: 1e-10,
        }
    }
}

impl Tolerances {
    /// Parse tolerances from JSON, using the default value for any missing
    /// field
    pub fn from_json(json: &str) -> Result<Tolerances, Error> {
        let tolerances = serde_json::from_str::<Tolerances>(json)?;
        tolerances.validate()?;
        return Ok(tolerances);
    }

    pub fn validate(&self) -> Result<(), Error> {
        for (name, value) in [("dedup", self.dedup), ("values", self.values), ("norm", self.norm)] {
            if value <= 0.0 || !value.is_finite() {
                return Err(Error::Configuration(format!(
                    "expected positive {} tolerance, got {}", name, value
                )));
            }
        }
        return Ok(());
    }
}

/// Where a curve in a `DistributionCollection` comes from
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[derive(serde::Deserialize, serde::Serialize)]
pub struct Provenance {
    /// Position of the vector (or curve) this curve was computed from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<usize>,
    /// For refined collections, index of the matching representative in the
    /// reference collection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub representative: Option<usize>,
    /// For refined collections, distance to the matching representative
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

/// A single distribution curve, borrowed from a `DistributionCollection`
#[derive(Debug, Clone, Copy)]
pub struct Curve<'a> {
    pub grid: ArrayView1<'a, f64>,
    pub values: ArrayView1<'a, f64>,
    /// Trapezoidal integral of `values` over `grid`
    pub norm: f64,
    pub provenance: Option<&'a Provenance>,
}

/// An ordered collection of radial or angular distribution curves, all
/// sampled on the same grid.
///
/// Curves in the collection can be deduplicated with [`Self::unique`], compared
/// against the unique curves of another collection with [`Self::refine`] and
/// aggregated with [`Self::histogram`].
#[derive(Debug, Clone)]
pub struct DistributionCollection {
    kind: DistributionKind,
    basis: BasisParameters,
    tolerances: Tolerances,
    grid: Array1<f64>,
    values: Array2<f64>,
    norms: Array1<f64>,
    /// sum of the absolute trapezoidal weights of the grid
    grid_weight: f64,
    provenance: Option<Vec<Provenance>>,
    unique: OnceCell<UniqueSet>,
}

impl DistributionCollection {
    /// Create a new collection containing one curve for each row of `values`,
    /// sampled on `grid`. The curves are assumed to come from power spectra
    /// computed with the given `basis`.
    pub fn new(
        kind: DistributionKind,
        basis: BasisParameters,
        grid: Array1<f64>,
        values: Array2<f64>,
    ) -> Result<DistributionCollection, Error> {
        basis.validate()?;
        kind.check_grid(grid.view())?;

        if values.ncols() != grid.len() {
            return Err(Error::InvalidDomain(format!(
                "curves contain {} values, but the grid has {} points",
                values.ncols(), grid.len()
            )));
        }

        if let Some(position) = values.iter().position(|v| !v.is_finite()) {
            return Err(Error::InvalidDomain(format!(
                "curve {} contains non-finite values", position / grid.len()
            )));
        }

        let weights = trapezoid_weights(grid.view());
        let grid_weight = weights.iter().map(|w| w.abs()).sum();
        let norms = values.dot(&weights);

        return Ok(DistributionCollection {
            kind: kind,
            basis: basis,
            tolerances: Tolerances::default(),
            grid: grid,
            values: values,
            norms: norms,
            grid_weight: grid_weight,
            provenance: None,
            unique: OnceCell::new(),
        });
    }

    /// Use different tolerances for comparisons in this collection. This
    /// clears any previously computed set of unique curves.
    pub fn with_tolerances(mut self, tolerances: Tolerances) -> Result<DistributionCollection, Error> {
        tolerances.validate()?;
        if tolerances != self.tolerances {
            self.tolerances = tolerances;
            self.unique = OnceCell::new();
        }
        return Ok(self);
    }

    pub(crate) fn with_provenance(mut self, provenance: Vec<Provenance>) -> DistributionCollection {
        debug_assert_eq!(provenance.len(), self.len());
        self.provenance = Some(provenance);
        return self;
    }

    pub fn kind(&self) -> DistributionKind {
        self.kind
    }

    pub fn basis(&self) -> &BasisParameters {
        &self.basis
    }

    pub fn tolerances(&self) -> &Tolerances {
        &self.tolerances
    }

    /// Grid shared by all curves in this collection
    pub fn grid(&self) -> ArrayView1<'_, f64> {
        self.grid.view()
    }

    /// Values of all curves, one curve per row
    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    /// Norms of all curves
    pub fn norms(&self) -> ArrayView1<'_, f64> {
        self.norms.view()
    }

    pub fn provenance(&self) -> Option<&[Provenance]> {
        self.provenance.as_deref()
    }

    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the curve at position `index`
    pub fn curve(&self, index: usize) -> Result<Curve<'_>, Error> {
        if index >= self.len() {
            return Err(Error::Index { index: index, len: self.len() });
        }

        return Ok(Curve {
            grid: self.grid.view(),
            values: self.values.row(index),
            norm: self.norms[index],
            provenance: self.provenance.as_ref().map(|p| &p[index]),
        });
    }

    /// Iterate over all curves in order
    pub fn iter(&self) -> impl Iterator<Item = Curve<'_>> + '_ {
        (0..self.len()).map(move |i| Curve {
            grid: self.grid.view(),
            values: self.values.row(i),
            norm: self.norms[i],
            provenance: self.provenance.as_ref().map(|p| &p[i]),
        })
    }

    /// Create a new collection containing the curves at the given `indices`,
    /// in order
    pub fn select(&self, indices: &[usize]) -> Result<DistributionCollection, Error> {
        if let Some(&index) = indices.iter().find(|&&i| i >= self.len()) {
            return Err(Error::Index { index: index, len: self.len() });
        }

        let values = self.values.select(Axis(0), indices);
        let provenance = indices.iter().map(|&i| match &self.provenance {
            Some(provenance) => Provenance { source: Some(i), ..provenance[i] },
            None => Provenance { source: Some(i), ..Default::default() },
        }).collect();

        let collection = DistributionCollection::new(self.kind, self.basis, self.grid.clone(), values)?;
        let collection = collection.with_tolerances(self.tolerances)?;
        return Ok(collection.with_provenance(provenance));
    }

    /// Check if `self` and `other` contain exactly the same data (kind, basis,
    /// grid, values and norms), ignoring provenance and tolerances
    pub fn strict_equals(&self, other: &DistributionCollection) -> bool {
        self.kind == other.kind
            && self.basis == other.basis
            && self.grid == other.grid
            && self.values == other.values
            && self.norms == other.norms
    }

    /// Check if `self` and `other` contain the same curves in the same order,
    /// up to the `values` and `norm` tolerances of `self`
    pub fn approx_equals(&self, other: &DistributionCollection) -> bool {
        if self.kind != other.kind || self.len() != other.len() || self.grid.len() != other.grid.len() {
            return false;
        }

        let tolerances = &self.tolerances;
        let close = |a: &f64, b: &f64, epsilon: f64| approx::abs_diff_eq!(*a, *b, epsilon = epsilon);

        self.grid.iter().zip(&other.grid).all(|(a, b)| close(a, b, tolerances.values))
            && self.values.iter().zip(&other.values).all(|(a, b)| close(a, b, tolerances.values))
            && self.norms.iter().zip(&other.norms).all(|(a, b)| close(a, b, tolerances.norm))
    }

    /// Linearly interpolate all the curves on a new `grid`. The current grid
    /// must be increasing, and the new grid must be inside the range of the
    /// current one.
    pub fn resample(&self, grid: ArrayView1<'_, f64>) -> Result<DistributionCollection, Error> {
        self.kind.check_grid(grid)?;

        if self.grid.windows(2).into_iter().any(|w| w[1] <= w[0]) {
            return Err(Error::InvalidDomain(
                "can only resample curves sampled on a strictly increasing grid".into()
            ));
        }

        let (start, stop) = match (self.grid.first(), self.grid.last()) {
            (Some(&start), Some(&stop)) => (start, stop),
            _ => {
                return Err(Error::InvalidDomain("can not resample curves with an empty grid".into()));
            }
        };

        let mut values = Array2::zeros((self.len(), grid.len()));
        for (j, &x) in grid.iter().enumerate() {
            if x < start || x > stop {
                return Err(Error::InvalidDomain(format!(
                    "can not resample at {}, outside of the current grid range [{}, {}]",
                    x, start, stop
                )));
            }

            // first point of the current grid strictly above x
            let upper = self.grid.iter().position(|&g| g > x).unwrap_or(self.grid.len());
            if upper == self.grid.len() {
                values.column_mut(j).assign(&self.values.column(upper - 1));
                continue;
            }

            let lower = upper - 1;
            let t = (x - self.grid[lower]) / (self.grid[upper] - self.grid[lower]);
            let interpolated = &self.values.column(lower) * (1.0 - t) + &self.values.column(upper) * t;
            values.column_mut(j).assign(&interpolated);
        }

        let collection = DistributionCollection::new(self.kind, self.basis, grid.to_owned(), values)?;
        let mut collection = collection.with_tolerances(self.tolerances)?;
        collection.provenance = self.provenance.clone();
        return Ok(collection);
    }

    /// Check that curves in `self` and `other` can be compared with one another
    fn check_comparable(&self, other: &DistributionCollection) -> Result<(), Error> {
        if self.kind != other.kind {
            return Err(Error::IncompatibleBasis(format!(
                "can not compare {:?} and {:?} distributions", self.kind, other.kind
            )));
        }

        if self.basis != other.basis {
            return Err(Error::IncompatibleBasis(format!(
                "can not compare distributions computed with {:?} and {:?}",
                self.basis, other.basis
            )));
        }

        let aligned = self.grid.len() == other.grid.len() && self.grid.iter()
            .zip(&other.grid)
            .all(|(a, b)| approx::relative_eq!(*a, *b, epsilon = 1e-12, max_relative = 1e-12));

        if !aligned {
            return Err(Error::IncompatibleBasis(
                "distributions are sampled on different grids, use `resample` to align them".into()
            ));
        }

        return Ok(());
    }
}
