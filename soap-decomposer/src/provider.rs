use std::path::PathBuf;

use ndarray::{Array1, Array2, ArrayView2};

use crate::{BasisParameters, Error, SoapVectorCollection};
use crate::io::read_npy;

/// Distances closer than this are considered to belong to the same shell
const SHELL_MERGE_TOLERANCE: f64 = 1e-5;

/// A `StructureProvider` gives access to the reference crystal structures of
/// elements, and to the power spectra already computed for them.
pub trait StructureProvider: Send + Sync {
    /// Get the Cartesian positions of the atoms in the reference structure of
    /// `element`, as an array of shape `[n_atoms, 3]`
    fn positions(&self, element: &str) -> Result<Array2<f64>, Error>;

    /// Get at most `max_shells` neighbor shells distances (sorted, in the same
    /// unit as the positions) for `element`, considering only distances below
    /// `cutoff`
    fn shells(&self, element: &str, max_shells: usize, cutoff: f64) -> Result<Vec<f64>, Error> {
        let positions = self.positions(element)?;
        return distance_shells(positions.view(), cutoff, max_shells);
    }

    /// Get the power spectra of the atomic environments in the reference
    /// structure of `element`, computed with the given basis `parameters`
    fn coefficients(&self, element: &str, parameters: BasisParameters) -> Result<SoapVectorCollection, Error>;
}

/// Get the sorted list of distinct interatomic distances below `cutoff` in the
/// structure with the given `positions`, keeping at most `max_shells` of them.
/// Distances closer than 1e-5 are merged in a single shell.
pub fn distance_shells(positions: ArrayView2<'_, f64>, cutoff: f64, max_shells: usize) -> Result<Vec<f64>, Error> {
    if cutoff <= 0.0 || !cutoff.is_finite() {
        return Err(Error::Configuration(format!(
            "expected positive cutoff radius, got {}", cutoff
        )));
    }

    if positions.ncols() != 3 {
        return Err(Error::InvalidDomain(format!(
            "expected positions with 3 columns, got {}", positions.ncols()
        )));
    }

    if positions.iter().any(|x| !x.is_finite()) {
        return Err(Error::InvalidDomain("positions contain non-finite values".into()));
    }

    let mut distances = Vec::new();
    for (i, first) in positions.outer_iter().enumerate() {
        for second in positions.outer_iter().skip(i + 1) {
            let delta = &second - &first;
            let distance = delta.dot(&delta).sqrt();
            if distance > 0.0 && distance < cutoff {
                distances.push(distance);
            }
        }
    }
    distances.sort_by(f64::total_cmp);

    let mut shells: Vec<f64> = Vec::new();
    for distance in distances {
        match shells.last() {
            Some(&last) if distance - last < SHELL_MERGE_TOLERANCE => {}
            _ => shells.push(distance),
        }
    }

    shells.truncate(max_shells);
    return Ok(shells);
}

/// A `StructureProvider` reading data from `.npy` files in a directory.
///
/// For each element, the directory should contain `<element>.positions.npy`
/// (positions, shape `[n_atoms, 3]`) and `<element>.coefficients.npy` (power
/// spectra, shape `[n_atoms, n_pairs, max_radial, max_radial, max_angular +
/// 1]`). Shells are read from `<element>.shells.npy` if this file exists, and
/// computed from the positions otherwise.
#[derive(Debug, Clone)]
pub struct NpyStructureStore {
    root: PathBuf,
}

impl NpyStructureStore {
    pub fn new(root: impl Into<PathBuf>) -> NpyStructureStore {
        NpyStructureStore { root: root.into() }
    }

    fn path(&self, element: &str, kind: &str) -> PathBuf {
        self.root.join(format!("{}.{}.npy", element, kind))
    }
}

impl StructureProvider for NpyStructureStore {
    fn positions(&self, element: &str) -> Result<Array2<f64>, Error> {
        read_npy(self.path(element, "positions"))
    }

    fn shells(&self, element: &str, max_shells: usize, cutoff: f64) -> Result<Vec<f64>, Error> {
        let path = self.path(element, "shells");
        if !path.is_file() {
            let positions = self.positions(element)?;
            return distance_shells(positions.view(), cutoff, max_shells);
        }

        let shells: Array1<f64> = read_npy(path)?;
        let mut shells = shells.into_iter().filter(|&d| d < cutoff).collect::<Vec<_>>();
        shells.sort_by(f64::total_cmp);
        shells.truncate(max_shells);
        return Ok(shells);
    }

    fn coefficients(&self, element: &str, parameters: BasisParameters) -> Result<SoapVectorCollection, Error> {
        SoapVectorCollection::from_npy(self.path(element, "coefficients"), parameters)
    }
}
