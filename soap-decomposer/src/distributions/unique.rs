use indexmap::IndexMap;
use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;

use super::{DistributionCollection, Provenance};
use crate::Error;

/// Above this number of representatives, looking for a matching
/// representative is done in parallel
const PARALLEL_SEARCH: usize = 64;

/// A representative curve in a `UniqueSet`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Representative {
    /// The seed curve given to `DistributionCollection::unique_with_seed`
    Seed,
    /// The curve at this position in the collection
    Member(usize),
}

/// Partition of the curves of a collection in equivalence classes, each
/// class being identified by a representative curve.
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize)]
pub struct UniqueSet {
    /// representatives, in the order they were found
    representatives: Vec<Representative>,
    /// for each member of the collection, position of its representative in
    /// `representatives`
    assignments: Vec<usize>,
}

impl UniqueSet {
    /// Get all the representatives in this set, in order of first appearance
    pub fn representatives(&self) -> &[Representative] {
        &self.representatives
    }

    /// Get the positions of the representative members, excluding the seed
    pub fn indices(&self) -> Vec<usize> {
        self.representatives.iter().filter_map(|r| match r {
            Representative::Member(i) => Some(*i),
            Representative::Seed => None,
        }).collect()
    }

    /// Number of equivalence classes
    pub fn len(&self) -> usize {
        self.representatives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.representatives.is_empty()
    }

    /// Get the representative of the member at position `member`
    pub fn representative_of(&self, member: usize) -> Result<Representative, Error> {
        match self.assignments.get(member) {
            Some(&class) => Ok(self.representatives[class]),
            None => Err(Error::Index { index: member, len: self.assignments.len() }),
        }
    }

    /// Number of members in each equivalence class, in representative order
    pub fn counts(&self) -> Vec<(Representative, usize)> {
        let mut counts = vec![0; self.representatives.len()];
        for &class in &self.assignments {
            counts[class] += 1;
        }
        return self.representatives.iter().copied().zip(counts).collect();
    }

    /// Reorder the representatives by increasing `distances` (one per
    /// representative), keeping the current order for equal distances
    fn sorted_by(self, distances: &[f64]) -> UniqueSet {
        debug_assert_eq!(distances.len(), self.representatives.len());
        let mut order = (0..self.representatives.len()).collect::<Vec<_>>();
        order.sort_by(|&a, &b| distances[a].total_cmp(&distances[b]));

        let mut new_class = vec![0; order.len()];
        for (new, &old) in order.iter().enumerate() {
            new_class[old] = new;
        }

        return UniqueSet {
            representatives: order.iter().map(|&old| self.representatives[old]).collect(),
            assignments: self.assignments.iter().map(|&old| new_class[old]).collect(),
        };
    }

    /// Check that this set describes a valid partition of `n_members` curves
    pub(crate) fn validate(&self, n_members: usize) -> Result<(), String> {
        if self.assignments.len() != n_members {
            return Err(format!(
                "unique set has {} assignments for {} curves",
                self.assignments.len(), n_members
            ));
        }

        for (class, representative) in self.representatives.iter().enumerate() {
            match *representative {
                Representative::Member(i) => {
                    if i >= n_members {
                        return Err(format!("representative {} is out of range", i));
                    }
                    if self.assignments[i] != class {
                        return Err(format!("representative {} does not map to itself", i));
                    }
                }
                Representative::Seed => {
                    return Err("stored unique sets can not contain a seed".into());
                }
            }
        }

        if let Some(&class) = self.assignments.iter().find(|&&c| c >= self.representatives.len()) {
            return Err(format!("assignment to missing representative {}", class));
        }

        return Ok(());
    }
}

/// A curve with its norm
#[derive(Debug, Clone, Copy)]
struct CurveData<'a> {
    values: ArrayView1<'a, f64>,
    norm: f64,
}

/// Compare curves sampled on the same grid using the maximal absolute
/// difference between their values
struct Comparator {
    tolerance: f64,
    /// sum of absolute trapezoidal weights, bounding the norm difference for
    /// curves within `tolerance` of each other
    grid_weight: f64,
}

impl Comparator {
    /// Can `a` and `b` be within tolerance of each other, knowing only their
    /// norms?
    fn may_match(&self, a: &CurveData<'_>, b: &CurveData<'_>) -> bool {
        let bound = self.tolerance * self.grid_weight * (1.0 + 1e-8)
            + 4.0 * f64::EPSILON * (a.norm.abs() + b.norm.abs());
        return (a.norm - b.norm).abs() <= bound;
    }

    fn distance(a: &CurveData<'_>, b: &CurveData<'_>) -> f64 {
        a.values.iter()
            .zip(&b.values)
            .fold(0.0, |acc, (x, y)| f64::max(acc, (x - y).abs()))
    }

    /// Get the distance between the curves if it is below the tolerance
    fn matching_distance(&self, a: &CurveData<'_>, b: &CurveData<'_>) -> Option<f64> {
        if !self.may_match(a, b) {
            return None;
        }

        let distance = Comparator::distance(a, b);
        if distance < self.tolerance {
            Some(distance)
        } else {
            None
        }
    }

    /// Find the nearest of `candidates` to `curve`. If `within_tolerance`
    /// is true, only candidates below the tolerance are considered. Ties go to
    /// the earliest candidate.
    fn nearest(&self, curve: &CurveData<'_>, candidates: &[CurveData<'_>], within_tolerance: bool) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (i, candidate) in candidates.iter().enumerate() {
            let distance = if within_tolerance {
                match self.matching_distance(curve, candidate) {
                    Some(distance) => distance,
                    None => continue,
                }
            } else {
                Comparator::distance(curve, candidate)
            };

            match best {
                Some((_, best_distance)) if best_distance <= distance => {}
                _ => best = Some((i, distance)),
            }
        }
        return best;
    }
}

impl DistributionCollection {
    fn curve_data(&self, index: usize) -> CurveData<'_> {
        CurveData {
            values: self.values.row(index),
            norm: self.norms[index],
        }
    }

    fn comparator(&self) -> Comparator {
        Comparator {
            tolerance: self.tolerances.dedup,
            grid_weight: self.grid_weight,
        }
    }

    /// Get the set of unique curves in this collection, computing it on first
    /// use.
    ///
    /// Curves are visited in order, and a curve becomes a new representative
    /// if no existing representative is closer than the `dedup` tolerance: the
    /// first curve seen in each equivalence class is its representative. Every
    /// curve is then assigned to its nearest representative within the
    /// tolerance, ties going to the earliest representative.
    pub fn unique(&self) -> &UniqueSet {
        if let Some(unique) = self.unique.get() {
            return unique;
        }
        return crate::parallel::install(|| self.unique_in_current_pool());
    }

    /// Same as `unique`, running on the thread pool of the caller
    fn unique_in_current_pool(&self) -> &UniqueSet {
        self.unique.get_or_init(|| {
            let set = self.compute_unique(None);
            log::info!(
                "found {} unique {:?} distributions in a collection of {}",
                set.len(), self.kind, self.len()
            );
            set
        })
    }

    /// Get the set of unique curves in this collection, starting from a set of
    /// representatives containing only `seed`. The seed is only kept in the
    /// output if at least one curve is assigned to it. The result is not
    /// cached.
    ///
    /// Representatives are sorted by increasing distance to the seed, so the
    /// seed (if present) comes first; representatives at the same distance
    /// stay in the order they were found.
    pub fn unique_with_seed(&self, seed: ArrayView1<'_, f64>) -> Result<UniqueSet, Error> {
        if seed.len() != self.grid.len() {
            return Err(Error::InvalidDomain(format!(
                "seed curve contains {} values, but the grid has {} points",
                seed.len(), self.grid.len()
            )));
        }

        if seed.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidDomain("seed curve contains non-finite values".into()));
        }

        let norm = seed.dot(&crate::math::trapezoid_weights(self.grid.view()));
        let seed = CurveData { values: seed.reborrow(), norm: norm };
        let unique = crate::parallel::install(|| self.compute_unique(Some(seed)));

        let distances = unique.representatives.iter().map(|representative| match *representative {
            Representative::Seed => 0.0,
            Representative::Member(i) => Comparator::distance(&seed, &self.curve_data(i)),
        }).collect::<Vec<_>>();

        return Ok(unique.sorted_by(&distances));
    }

    /// Find the unique curves, running on the thread pool of the caller
    #[time_graph::instrument(name = "DistributionCollection::unique")]
    fn compute_unique<'a>(&'a self, seed: Option<CurveData<'a>>) -> UniqueSet {
        let comparator = self.comparator();

        let mut representatives = Vec::new();
        let mut curves = Vec::new();
        if let Some(seed) = seed {
            representatives.push(Representative::Seed);
            curves.push(seed);
        }

        for i in 0..self.len() {
            let curve = self.curve_data(i);
            let matches = |candidate: &CurveData| comparator.matching_distance(&curve, candidate).is_some();

            let found = if curves.len() > PARALLEL_SEARCH {
                curves.par_iter().any(matches)
            } else {
                curves.iter().any(matches)
            };

            if !found {
                representatives.push(Representative::Member(i));
                curves.push(curve);
            }
        }

        let mut assignments = (0..self.len()).into_par_iter().map(|i| {
            let class = representatives.iter().position(|&r| r == Representative::Member(i));
            if let Some(class) = class {
                return class;
            }

            let curve = self.curve_data(i);
            comparator.nearest(&curve, &curves, true)
                .or_else(|| comparator.nearest(&curve, &curves, false))
                .map_or(0, |(class, _)| class)
        }).collect::<Vec<_>>();

        if representatives.first() == Some(&Representative::Seed) && !assignments.contains(&0) {
            representatives.remove(0);
            for class in &mut assignments {
                *class -= 1;
            }
        }

        return UniqueSet {
            representatives: representatives,
            assignments: assignments,
        };
    }

    /// Create a new collection containing only the representative curves of
    /// this collection
    pub fn representatives(&self) -> Result<DistributionCollection, Error> {
        return self.select(&self.unique().indices());
    }

    /// Map every curve in this collection onto the nearest representative of
    /// the unique curves in `reference`.
    ///
    /// The output keeps the order of this collection, but contains the values
    /// of the matching representatives. If no representative is within the
    /// tolerance of a curve, the nearest one is still used and a warning is
    /// emitted.
    #[time_graph::instrument(name = "DistributionCollection::refine")]
    pub fn refine(&self, reference: &DistributionCollection) -> Result<DistributionCollection, Error> {
        self.check_comparable(reference)?;
        return crate::parallel::install(|| self.refine_in_current_pool(reference));
    }

    fn refine_in_current_pool(&self, reference: &DistributionCollection) -> Result<DistributionCollection, Error> {
        let indices = reference.unique_in_current_pool().indices();
        if indices.is_empty() && !self.is_empty() {
            return Err(Error::InvalidDomain(
                "can not refine a collection against an empty reference".into()
            ));
        }

        let candidates = indices.iter().map(|&i| reference.curve_data(i)).collect::<Vec<_>>();
        let comparator = self.comparator();

        let matches = (0..self.len()).into_par_iter().map(|i| {
            let curve = self.curve_data(i);
            match comparator.nearest(&curve, &candidates, true) {
                Some(found) => (found, true),
                None => (comparator.nearest(&curve, &candidates, false).unwrap_or((0, f64::NAN)), false),
            }
        }).collect::<Vec<_>>();

        let mut values = Array2::zeros((self.len(), self.grid.len()));
        let mut provenance = Vec::with_capacity(self.len());
        for (i, ((class, distance), within_tolerance)) in matches.into_iter().enumerate() {
            let representative = indices[class];
            if !within_tolerance {
                log::warn!(
                    "distribution {} is not within tolerance of any reference \
                    representative, using the nearest one ({}, at distance {})",
                    i, representative, distance
                );
            }

            values.row_mut(i).assign(&reference.values.row(representative));
            provenance.push(Provenance {
                source: Some(i),
                representative: Some(representative),
                distance: Some(distance),
            });
        }

        let refined = DistributionCollection::new(self.kind, self.basis, self.grid.clone(), values)?;
        let refined = refined.with_tolerances(self.tolerances)?;
        return Ok(refined.with_provenance(provenance));
    }

    /// Count the number of curves assigned to each representative, in the
    /// order representatives were found. The counts sum to `self.len()`.
    pub fn histogram(&self) -> IndexMap<usize, usize> {
        self.unique().counts().into_iter().filter_map(|(representative, count)| {
            match representative {
                Representative::Member(i) => Some((i, count)),
                Representative::Seed => None,
            }
        }).collect()
    }

    /// Fraction of the curves assigned to each representative, in the order
    /// representatives were found
    pub fn fingerprint(&self) -> IndexMap<usize, f64> {
        let len = self.len() as f64;
        self.histogram().into_iter()
            .map(|(representative, count)| (representative, count as f64 / len))
            .collect()
    }

    /// Store an already computed unique set
    pub(crate) fn set_unique(&mut self, unique: UniqueSet) {
        self.unique = once_cell::sync::OnceCell::with_value(unique);
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array1, Array2, array};

    use super::*;
    use crate::{BasisParameters, DistributionKind, Tolerances};

    fn basis() -> BasisParameters {
        BasisParameters { cutoff: 4.0, max_angular: 2, max_radial: 3 }
    }

    fn collection(values: Array2<f64>) -> DistributionCollection {
        let grid = Array1::linspace(0.0, 1.0, values.ncols());
        DistributionCollection::new(DistributionKind::Radial, basis(), grid, values).unwrap()
    }

    #[test]
    fn first_seen_wins() {
        let collection = collection(array![
            [1.0, 1.0, 1.0],
            [1.0005, 1.0, 1.0],
            [2.0, 2.0, 2.0],
            [0.9996, 1.0, 1.0],
            [2.0, 2.0, 2.0002],
        ]);

        let unique = collection.unique();
        assert_eq!(unique.indices(), vec![0, 2]);
        assert_eq!(unique.representative_of(1).unwrap(), Representative::Member(0));
        assert_eq!(unique.representative_of(3).unwrap(), Representative::Member(0));
        assert_eq!(unique.representative_of(4).unwrap(), Representative::Member(2));
        assert!(unique.representative_of(5).is_err());

        let histogram = collection.histogram();
        assert_eq!(histogram.get_index(0), Some((&0, &3)));
        assert_eq!(histogram.get_index(1), Some((&2, &2)));
        assert_eq!(histogram.values().sum::<usize>(), collection.len());

        let fingerprint = collection.fingerprint();
        assert_eq!(fingerprint[&0], 0.6);
        assert_eq!(fingerprint[&2], 0.4);
    }

    #[test]
    fn nearest_assignment() {
        // the third curve is within tolerance of both representatives, but
        // closer to the second one
        let collection = collection(array![[0.0], [0.0015], [0.0009]]);
        let unique = collection.unique();
        assert_eq!(unique.indices(), vec![0, 1]);
        assert_eq!(unique.representative_of(2).unwrap(), Representative::Member(1));

        // with equal distances, the earliest representative wins
        let collection = self::collection(array![[0.0], [0.0016], [0.0008]]);
        let unique = collection.unique();
        assert_eq!(unique.indices(), vec![0, 1]);
        assert_eq!(unique.representative_of(2).unwrap(), Representative::Member(0));
    }

    #[test]
    fn idempotent() {
        let values = Array2::from_shape_fn((40, 10), |(i, j)| ((i % 7) as f64) * 0.1 + (j as f64) * 1e-5);
        let collection = collection(values);
        assert_eq!(collection.unique().len(), 7);

        let representatives = collection.representatives().unwrap();
        assert_eq!(representatives.len(), 7);
        assert_eq!(representatives.unique().indices(), (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn many_representatives() {
        let values = Array2::from_shape_fn((300, 4), |(i, j)| ((i % 150) as f64) + j as f64);
        let collection = collection(values);
        let unique = collection.unique();
        assert_eq!(unique.len(), 150);
        for i in 150..300 {
            assert_eq!(unique.representative_of(i).unwrap(), Representative::Member(i - 150));
        }
    }

    #[test]
    fn tolerances() {
        let values = array![[0.0, 0.0], [0.05, 0.0], [0.5, 0.0]];
        let collection = collection(values);
        assert_eq!(collection.unique().len(), 3);

        let tolerances = Tolerances { dedup: 0.1, ..Default::default() };
        let collection = collection.with_tolerances(tolerances).unwrap();
        assert_eq!(collection.unique().indices(), vec![0, 2]);
    }

    #[test]
    fn seeded() {
        let collection = collection(array![[1.0, 1.0], [3.0, 3.0], [1.0, 1.0]]);

        let unique = collection.unique_with_seed(array![1.0, 1.0001].view()).unwrap();
        assert_eq!(unique.representatives(), &[Representative::Seed, Representative::Member(1)]);
        assert_eq!(unique.representative_of(0).unwrap(), Representative::Seed);
        assert_eq!(unique.counts(), vec![(Representative::Seed, 2), (Representative::Member(1), 1)]);

        // unused seeds are removed
        let unique = collection.unique_with_seed(array![8.0, 8.0].view()).unwrap();
        assert_eq!(unique.representatives(), &[Representative::Member(1), Representative::Member(0)]);
        assert_eq!(unique.representative_of(0).unwrap(), Representative::Member(0));
        assert_eq!(unique.representative_of(2).unwrap(), Representative::Member(0));
        assert_eq!(unique.counts(), vec![(Representative::Member(1), 1), (Representative::Member(0), 2)]);

        let error = collection.unique_with_seed(array![1.0].view()).unwrap_err();
        assert!(matches!(error, Error::InvalidDomain(_)));
    }

    #[test]
    fn seeded_order() {
        let collection = collection(array![
            [4.0, 4.0],
            [1.0, 1.5],
            [2.0, 2.0],
            [0.0, 0.0],
            [1.5, 1.0],
            [2.0, 2.0],
        ]);

        let unique = collection.unique_with_seed(array![0.0, 0.0005].view()).unwrap();
        assert_eq!(unique.representatives(), &[
            Representative::Seed,
            Representative::Member(1),
            Representative::Member(4),
            Representative::Member(2),
            Representative::Member(0),
        ]);
        assert_eq!(unique.representative_of(3).unwrap(), Representative::Seed);
        assert_eq!(unique.representative_of(5).unwrap(), Representative::Member(2));
        assert_eq!(
            unique.counts().iter().map(|&(_, count)| count).collect::<Vec<_>>(),
            vec![1, 1, 1, 2, 1]
        );

        // without seed, representatives are in order of appearance
        assert_eq!(collection.unique().indices(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn refine() {
        let reference = collection(array![[1.0, 1.0, 1.0], [2.0, 2.0, 2.0], [1.0002, 1.0, 1.0]]);
        let data = collection(array![[2.0003, 2.0, 2.0], [0.9999, 1.0, 1.0], [5.0, 5.0, 5.0]]);

        let refined = data.refine(&reference).unwrap();
        assert_eq!(refined.len(), 3);
        assert_eq!(refined.values(), array![[2.0, 2.0, 2.0], [1.0, 1.0, 1.0], [2.0, 2.0, 2.0]]);

        let provenance = refined.provenance().unwrap();
        assert_eq!(provenance[0].representative, Some(1));
        assert_eq!(provenance[1].representative, Some(0));
        assert_eq!(provenance[2].source, Some(2));
        assert_eq!(provenance[2].distance, Some(3.0));
    }

    #[test]
    fn refine_itself() {
        let values = Array2::from_shape_fn((25, 6), |(i, j)| ((i % 4) as f64) * 0.01 + (i as f64) * 1e-6 + j as f64);
        let collection = collection(values);

        let refined = collection.refine(&collection).unwrap();
        for i in 0..collection.len() {
            let representative = match collection.unique().representative_of(i).unwrap() {
                Representative::Member(r) => r,
                Representative::Seed => unreachable!(),
            };
            assert_eq!(refined.values().row(i), collection.values().row(representative));
        }
    }

    #[test]
    fn refine_incompatible() {
        let first = collection(array![[1.0, 1.0, 1.0]]);
        let second = collection(array![[1.0, 1.0]]);
        assert!(matches!(first.refine(&second), Err(Error::IncompatibleBasis(_))));

        let grid = Array1::linspace(0.0, 1.0, 3);
        let angular = DistributionCollection::new(
            DistributionKind::Angular, basis(), grid.clone(), array![[1.0, 1.0, 1.0]]
        ).unwrap();
        assert!(matches!(first.refine(&angular), Err(Error::IncompatibleBasis(_))));

        let other_basis = BasisParameters { max_radial: 4, ..basis() };
        let other = DistributionCollection::new(
            DistributionKind::Radial, other_basis, grid, array![[1.0, 1.0, 1.0]]
        ).unwrap();
        assert!(matches!(first.refine(&other), Err(Error::IncompatibleBasis(_))));
    }

    #[test]
    fn validate() {
        let collection = collection(array![[0.0], [1.0], [0.0]]);
        let unique = collection.unique().clone();
        assert!(unique.validate(3).is_ok());
        assert!(unique.validate(4).is_err());

        let broken = UniqueSet {
            representatives: vec![Representative::Member(0), Representative::Member(2)],
            assignments: vec![0, 1, 0],
        };
        assert!(broken.validate(3).is_err());
    }
}
