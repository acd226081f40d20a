use soap_decomposer::{configure_workers, current_workers, reset_workers, Error};
use soap_decomposer::{DistributionCollection, DistributionKind, SoapVectorCollection};

mod data;

// all the checks live in a single test, since the worker pool is shared by
// the whole process
#[test]
fn worker_pool() {
    assert!(matches!(configure_workers(0), Err(Error::Configuration(_))));

    let stacked = data::environments(data::parameters(), 40, 5, 1e-8);
    let collection = SoapVectorCollection::from_stacked(stacked, data::parameters()).unwrap();
    let reference = collection.clone().rdfs(None, true).unwrap();

    configure_workers(3).unwrap();
    assert_eq!(current_workers(), 3);

    // vectors keep their cache, use a fresh collection
    let stacked = data::environments(data::parameters(), 40, 5, 1e-8);
    let collection = SoapVectorCollection::from_stacked(stacked, data::parameters()).unwrap();
    let rdfs = collection.rdfs(None, true).unwrap();
    assert!(rdfs.strict_equals(&reference));
    assert_eq!(rdfs.unique(), reference.unique());

    configure_workers(1).unwrap();
    assert_eq!(current_workers(), 1);
    let adfs = collection.adfs(None).unwrap();
    assert_eq!(adfs.len(), 40);

    // reconfiguring the pool while a deduplication is running, with enough
    // representatives for the search to run in parallel
    let values = ndarray::Array2::from_shape_fn((600, 20), |(i, j)| ((i % 200) as f64) + 0.01 * j as f64);
    let grid = ndarray::Array1::linspace(0.0, data::parameters().cutoff, 20);
    for _ in 0..3 {
        let curves = DistributionCollection::new(
            DistributionKind::Radial, data::parameters(), grid.clone(), values.clone()
        ).unwrap();

        let reconfigure = std::thread::spawn(|| {
            for n_workers in [2, 4, 1, 3] {
                configure_workers(n_workers).unwrap();
            }
        });

        let unique = curves.unique();
        reconfigure.join().unwrap();

        assert_eq!(unique.indices(), (0..200).collect::<Vec<_>>());
        assert!(curves.histogram().values().all(|&count| count == 3));
    }

    reset_workers();
    assert_eq!(current_workers(), rayon::current_num_threads());

    let grid = ndarray::array![0.0, 1.0, -2.0];
    let error = collection.rdfs(Some(grid.view()), false).unwrap_err();
    assert!(matches!(error.root(), Error::InvalidDomain(_)));
}
