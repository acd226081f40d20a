use std::path::Path;

use ndarray::{Array1, Array2};

use super::{DistributionCollection, DistributionKind, Provenance, Tolerances, UniqueSet};
use crate::{BasisParameters, Error};
use crate::io::{read_npy, write_npy};

const COLLECTION_FORMAT: &str = "distribution-collection";

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct StoredCollection {
    kind: DistributionKind,
    basis: BasisParameters,
    tolerances: Tolerances,
    grid: Array1<f64>,
    values: Array2<f64>,
    norms: Array1<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    provenance: Option<Vec<Provenance>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unique: Option<UniqueSet>,
}

impl DistributionCollection {
    /// Write this collection to the file at `path`. If `with_detail` is true,
    /// the provenance of the curves and the set of unique curves (computing it
    /// if needed) are stored as well. If the path ends with `.gz`, the file is
    /// compressed.
    pub fn save(&self, path: impl AsRef<Path>, with_detail: bool) -> Result<(), Error> {
        let (provenance, unique) = if with_detail {
            (self.provenance.clone(), Some(self.unique().clone()))
        } else {
            (None, None)
        };

        let stored = StoredCollection {
            kind: self.kind,
            basis: self.basis,
            tolerances: self.tolerances,
            grid: self.grid.clone(),
            values: self.values.clone(),
            norms: self.norms.clone(),
            provenance: provenance,
            unique: unique,
        };

        return crate::io::write_json(path.as_ref(), COLLECTION_FORMAT, &stored);
    }

    /// Load a collection previously written with [`DistributionCollection::save`]
    pub fn from_file(path: impl AsRef<Path>) -> Result<DistributionCollection, Error> {
        let path = path.as_ref();
        let stored: StoredCollection = crate::io::read_json(path, COLLECTION_FORMAT)?;
        let invalid = |message: String| Error::Persistence(format!("invalid data in '{}': {}", path.display(), message));

        let mut collection = DistributionCollection::new(stored.kind, stored.basis, stored.grid, stored.values)
            .and_then(|collection| collection.with_tolerances(stored.tolerances))
            .map_err(|e| invalid(e.to_string()))?;

        if stored.norms.len() != collection.len() {
            return Err(invalid(format!(
                "expected {} norms, got {}", collection.len(), stored.norms.len()
            )));
        }

        let epsilon = collection.tolerances.norm;
        for (i, (&expected, &computed)) in stored.norms.iter().zip(&collection.norms).enumerate() {
            if !approx::relative_eq!(expected, computed, epsilon = epsilon, max_relative = epsilon) {
                return Err(invalid(format!(
                    "stored norm of curve {} ({}) does not match its values ({})",
                    i, expected, computed
                )));
            }
        }

        if let Some(provenance) = stored.provenance {
            if provenance.len() != collection.len() {
                return Err(invalid(format!(
                    "expected {} provenance entries, got {}", collection.len(), provenance.len()
                )));
            }
            collection.provenance = Some(provenance);
        }

        if let Some(unique) = stored.unique {
            unique.validate(collection.len()).map_err(invalid)?;
            collection.set_unique(unique);
        }

        return Ok(collection);
    }

    /// Write the grid, values and norms of this collection to `grid.npy`,
    /// `values.npy` and `norms.npy` inside the directory at `path`, creating
    /// it if needed.
    pub fn save_npy(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;

        write_npy(path.join("grid.npy"), &self.grid)?;
        write_npy(path.join("values.npy"), &self.values)?;
        write_npy(path.join("norms.npy"), &self.norms)?;

        return Ok(());
    }

    /// Load curves from `grid.npy` and `values.npy` inside the directory at
    /// `path`. The norms are recomputed from the values.
    pub fn from_npy(
        path: impl AsRef<Path>,
        kind: DistributionKind,
        basis: BasisParameters,
    ) -> Result<DistributionCollection, Error> {
        let path = path.as_ref();
        let grid: Array1<f64> = read_npy(path.join("grid.npy"))?;
        let values: Array2<f64> = read_npy(path.join("values.npy"))?;

        return DistributionCollection::new(kind, basis, grid, values);
    }
}
