use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use ndarray::{Array1, Array2, Array4, Array5, ArrayView1, Axis};

use crate::{BasisParameters, Decomposer, Error, SoapVector};
use crate::{DistributionCollection, DistributionKind};
use crate::distributions::Provenance;

const COLLECTION_FORMAT: &str = "soap-vector-collection";

/// An ordered collection of `SoapVector`, all sharing the same `Decomposer`.
///
/// Slicing and selecting members of a collection creates a new collection
/// referencing the same decomposer and the same vectors, without copying the
/// coefficients.
#[derive(Debug, Clone)]
pub struct SoapVectorCollection {
    decomposer: Arc<Decomposer>,
    vectors: Vec<Arc<SoapVector>>,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct StoredCollection {
    basis: BasisParameters,
    coefficients: Vec<Array4<f64>>,
}

impl SoapVectorCollection {
    /// Create a new collection from a set of power spectrum `coefficients`,
    /// all computed with the same basis `parameters`.
    pub fn new(coefficients: Vec<Array4<f64>>, parameters: BasisParameters) -> Result<SoapVectorCollection, Error> {
        let decomposer = Arc::new(Decomposer::new(parameters)?);

        let mut vectors = Vec::with_capacity(coefficients.len());
        for (position, coefficients) in coefficients.into_iter().enumerate() {
            let vector = SoapVector::new(coefficients, Arc::clone(&decomposer)).map_err(|error| match error {
                Error::IncompatibleBasis(message) => Error::IncompatibleBasis(format!(
                    "vector at position {}: {}", position, message
                )),
                Error::InvalidDomain(message) => Error::InvalidDomain(format!(
                    "vector at position {}: {}", position, message
                )),
                error => error,
            })?;
            vectors.push(Arc::new(vector));
        }

        return Ok(SoapVectorCollection {
            decomposer: decomposer,
            vectors: vectors,
        });
    }

    /// Create a new collection from a 5-dimensional array, where the first
    /// axis runs over the different vectors
    pub fn from_stacked(coefficients: Array5<f64>, parameters: BasisParameters) -> Result<SoapVectorCollection, Error> {
        let coefficients = coefficients.axis_iter(Axis(0))
            .map(|vector| vector.to_owned())
            .collect();
        return SoapVectorCollection::new(coefficients, parameters);
    }

    /// Load a 5-dimensional coefficient array from a `.npy` file, see
    /// [`SoapVectorCollection::from_stacked`]
    pub fn from_npy(path: impl AsRef<Path>, parameters: BasisParameters) -> Result<SoapVectorCollection, Error> {
        let coefficients: Array5<f64> = crate::io::read_npy(path)?;
        return SoapVectorCollection::from_stacked(coefficients, parameters);
    }

    /// Create a collection from existing vectors. All vectors must have been
    /// computed with the same basis, and the collection must not be empty.
    pub fn from_vectors(vectors: Vec<Arc<SoapVector>>) -> Result<SoapVectorCollection, Error> {
        let decomposer = match vectors.first() {
            Some(vector) => Arc::clone(vector.decomposer()),
            None => {
                return Err(Error::Configuration(
                    "can not create a collection without vectors, use `new` to specify the basis".into()
                ));
            }
        };

        let mut shared = Vec::with_capacity(vectors.len());
        for (position, vector) in vectors.into_iter().enumerate() {
            decomposer.check_compatible(vector.parameters()).map_err(|error| {
                Error::IncompatibleBasis(format!("vector at position {}: {}", position, error))
            })?;

            if Arc::ptr_eq(vector.decomposer(), &decomposer) {
                shared.push(vector);
            } else {
                let coefficients = vector.coefficients().to_owned();
                shared.push(Arc::new(SoapVector::new(coefficients, Arc::clone(&decomposer))?));
            }
        }

        return Ok(SoapVectorCollection {
            decomposer: decomposer,
            vectors: shared,
        });
    }

    /// Get the decomposer shared by all vectors in this collection
    pub fn decomposer(&self) -> &Arc<Decomposer> {
        &self.decomposer
    }

    pub fn parameters(&self) -> &BasisParameters {
        self.decomposer.parameters()
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&Arc<SoapVector>, Error> {
        self.vectors.get(index).ok_or(Error::Index { index: index, len: self.len() })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<SoapVector>> + '_ {
        self.vectors.iter()
    }

    /// Get a new collection containing the vectors in `range`
    pub fn slice(&self, range: Range<usize>) -> Result<SoapVectorCollection, Error> {
        if range.end > self.len() {
            return Err(Error::Index { index: range.end, len: self.len() });
        }

        if range.start > range.end {
            return Err(Error::Index { index: range.start, len: self.len() });
        }

        return Ok(SoapVectorCollection {
            decomposer: Arc::clone(&self.decomposer),
            vectors: self.vectors[range].to_vec(),
        });
    }

    /// Get a new collection containing the vectors at `indices`, in order
    pub fn select(&self, indices: &[usize]) -> Result<SoapVectorCollection, Error> {
        let vectors = indices.iter()
            .map(|&i| self.get(i).map(Arc::clone))
            .collect::<Result<Vec<_>, _>>()?;

        return Ok(SoapVectorCollection {
            decomposer: Arc::clone(&self.decomposer),
            vectors: vectors,
        });
    }

    /// Sum the power spectra of all the vectors in this collection, giving a
    /// single descriptor for the whole structure (the averaged SOAP
    /// representation, up to a division by `len()`).
    ///
    /// All the vectors must contain the same number of species pairs.
    pub fn asr(&self) -> Result<Array4<f64>, Error> {
        let mut vectors = self.vectors.iter();
        let mut sum = match vectors.next() {
            Some(vector) => vector.coefficients().to_owned(),
            None => {
                return Err(Error::InvalidDomain(
                    "can not compute the ASR of an empty collection".into()
                ));
            }
        };

        for (position, vector) in vectors.enumerate() {
            let coefficients = vector.coefficients();
            if coefficients.shape() != sum.shape() {
                return Err(Error::IncompatibleBasis(format!(
                    "vector at position {} has shape {:?}, expected {:?}",
                    position + 1, coefficients.shape(), sum.shape()
                )));
            }
            sum += &coefficients;
        }

        return Ok(sum);
    }

    /// Compute the radial distribution function of all vectors in parallel.
    /// If `grid` is `None`, the decomposer default radial grid is used.
    #[time_graph::instrument(name = "SoapVectorCollection::rdfs")]
    pub fn rdfs(&self, grid: Option<ArrayView1<'_, f64>>, zero_mean: bool) -> Result<DistributionCollection, Error> {
        let grid = grid.map_or_else(|| self.decomposer.default_radial_grid(), |grid| grid.to_owned());
        DistributionKind::Radial.check_grid(grid.view())?;

        log::info!(
            "computing radial distributions for {} vectors on {} points",
            self.len(), grid.len()
        );

        let curves = crate::parallel::try_map(&self.vectors, |vector| vector.rdf(grid.view(), zero_mean))?;
        return self.distributions(DistributionKind::Radial, grid, curves);
    }

    /// Compute the angular distribution function of all vectors in parallel.
    /// If `grid` is `None`, the decomposer default angular grid is used.
    #[time_graph::instrument(name = "SoapVectorCollection::adfs")]
    pub fn adfs(&self, grid: Option<ArrayView1<'_, f64>>) -> Result<DistributionCollection, Error> {
        let grid = grid.map_or_else(|| self.decomposer.default_angular_grid(), |grid| grid.to_owned());
        DistributionKind::Angular.check_grid(grid.view())?;

        log::info!(
            "computing angular distributions for {} vectors on {} points",
            self.len(), grid.len()
        );

        let curves = crate::parallel::try_map(&self.vectors, |vector| vector.adf(grid.view()))?;
        return self.distributions(DistributionKind::Angular, grid, curves);
    }

    fn distributions(
        &self,
        kind: DistributionKind,
        grid: Array1<f64>,
        curves: Vec<Array1<f64>>,
    ) -> Result<DistributionCollection, Error> {
        let mut values = Array2::zeros((curves.len(), grid.len()));
        for (mut row, curve) in values.outer_iter_mut().zip(&curves) {
            row.assign(curve);
        }

        let provenance = (0..curves.len())
            .map(|i| Provenance { source: Some(i), ..Default::default() })
            .collect();

        let collection = DistributionCollection::new(kind, *self.parameters(), grid, values)?;
        return Ok(collection.with_provenance(provenance));
    }

    /// Write all the vectors in this collection to the file at `path`. If the
    /// path ends with `.gz`, the file is compressed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let stored = StoredCollection {
            basis: *self.parameters(),
            coefficients: self.vectors.iter().map(|v| v.coefficients().to_owned()).collect(),
        };
        return crate::io::write_json(path.as_ref(), COLLECTION_FORMAT, &stored);
    }

    /// Load a collection previously written with [`SoapVectorCollection::save`]
    pub fn from_file(path: impl AsRef<Path>) -> Result<SoapVectorCollection, Error> {
        let path = path.as_ref();
        let stored: StoredCollection = crate::io::read_json(path, COLLECTION_FORMAT)?;
        return SoapVectorCollection::new(stored.coefficients, stored.basis).map_err(|e| {
            Error::Persistence(format!("invalid data in '{}': {}", path.display(), e))
        });
    }
}
