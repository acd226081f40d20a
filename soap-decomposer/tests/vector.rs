use std::sync::Arc;

use ndarray::{Array1, Array4, array};

use soap_decomposer::{BasisParameters, Decomposer, Error, SoapVector};

mod data;

fn vector() -> SoapVector {
    let mut generator = data::Generator::new(42);
    let coefficients = data::environment(data::parameters(), 1, 1e-3, &mut generator);
    SoapVector::with_parameters(coefficients, data::parameters()).unwrap()
}

#[test]
fn save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let vector = vector();

    let path = dir.path().join("vector.json");
    vector.save(&path).unwrap();
    let loaded = SoapVector::from_file(&path).unwrap();
    assert!(loaded.strict_equals(&vector));
    assert_eq!(loaded, vector);

    let grid = Array1::linspace(0.0, 6.0, 100);
    assert_eq!(loaded.rdf(grid.view(), false).unwrap(), vector.rdf(grid.view(), false).unwrap());
}

#[test]
fn deterministic() {
    let vector = vector();
    let grid = Array1::linspace(0.0, 6.0, 100);

    let first = vector.rdf(grid.view(), false).unwrap();
    let second = vector.rdf(grid.view(), false).unwrap();
    assert_eq!(first, second);

    // a vector with no cache gives the same values
    vector.set_cache_capacity(0);
    assert_eq!(vector.rdf(grid.view(), false).unwrap(), first);

    let angles = Array1::linspace(0.0, std::f64::consts::PI, 100);
    let first = vector.adf(angles.view()).unwrap();
    let second = vector.clone().adf(angles.view()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn non_negative_density() {
    // coefficients without noise have a positive semi-definite l=0 block
    let mut generator = data::Generator::new(3);
    let coefficients = data::environment(data::parameters(), 2, 0.0, &mut generator);
    let vector = SoapVector::with_parameters(coefficients, data::parameters()).unwrap();

    let rdf = vector.rdf(Array1::linspace(0.0, 7.0, 200).view(), false).unwrap();
    assert!(rdf.iter().all(|&v| v >= -1e-12));
    assert!(rdf.iter().any(|&v| v > 1e-3));
}

#[test]
fn invalid_domain() {
    let vector = vector();

    let error = vector.rdf(array![-1.0, 0.0, 1.0].view(), false).unwrap_err();
    assert!(matches!(error, Error::InvalidDomain(_)));

    let error = vector.adf(array![0.0, 4.0].view()).unwrap_err();
    assert!(matches!(error, Error::InvalidDomain(_)));
}

#[test]
fn incompatible_shape() {
    // coefficients computed with max_radial = 18, declared as 12
    let coefficients = Array4::zeros((3, 18, 18, 13));
    let parameters = BasisParameters { cutoff: 6.0, max_angular: 12, max_radial: 12 };

    let error = SoapVector::with_parameters(coefficients.clone(), parameters).unwrap_err();
    assert!(matches!(error, Error::IncompatibleBasis(_)));

    let parameters = BasisParameters { max_radial: 18, ..parameters };
    assert!(SoapVector::with_parameters(coefficients, parameters).is_ok());
}

#[test]
fn shared_decomposer() {
    let decomposer = Arc::new(Decomposer::new(data::parameters()).unwrap());
    let mut generator = data::Generator::new(7);

    let first = SoapVector::new(data::environment(data::parameters(), 0, 0.0, &mut generator), Arc::clone(&decomposer)).unwrap();
    let second = SoapVector::new(data::environment(data::parameters(), 0, 1e-9, &mut generator), Arc::clone(&decomposer)).unwrap();

    assert!(Arc::ptr_eq(first.decomposer(), second.decomposer()));
    assert!(!first.strict_equals(&second));
    assert!(first.approx_equals(&second, 1e-8).unwrap());
}
