use ndarray::{Array1, Array5};

use soap_decomposer::{BasisParameters, SoapVectorCollection};

use criterion::{Criterion, black_box, criterion_group, criterion_main};

/// Coefficients for `n_environments`, cycling through `n_classes` different
/// environments
fn environments(parameters: BasisParameters, n_environments: usize, n_classes: usize) -> Array5<f64> {
    let n_max = parameters.max_radial;
    let l_max = parameters.max_angular;
    Array5::from_shape_fn((n_environments, 1, n_max, n_max, l_max + 1), |(i, _, n1, n2, l)| {
        let class = (i % n_classes + 1) as f64;
        let radial = f64::cos(0.7 * class * (n1 + 1) as f64) * f64::cos(0.7 * class * (n2 + 1) as f64);
        radial / ((1 + n1) * (1 + n2) * (1 + l)) as f64
    })
}

fn rdfs(c: &mut Criterion) {
    let mut group = c.benchmark_group("radial distributions (per vector)");
    group.noise_threshold(0.05);

    for &max_radial in black_box(&[6, 12, 18]) {
        let parameters = BasisParameters { cutoff: 6.0, max_angular: 12, max_radial };
        let collection = SoapVectorCollection::from_stacked(environments(parameters, 64, 8), parameters).unwrap();
        let grid = Array1::linspace(0.0, 6.0, 100);

        // vectors memoize their distributions, disable this to measure the
        // actual computation
        for vector in collection.iter() {
            vector.set_cache_capacity(0);
        }

        group.bench_function(format!("n_max = {}", max_radial), |b| b.iter_custom(|repeat| {
            let start = std::time::Instant::now();
            for _ in 0..repeat {
                collection.rdfs(Some(grid.view()), false).unwrap();
            }
            start.elapsed() / collection.len() as u32
        }));
    }
}

fn unique(c: &mut Criterion) {
    let mut group = c.benchmark_group("unique distributions");
    group.noise_threshold(0.05);

    let parameters = BasisParameters { cutoff: 6.0, max_angular: 6, max_radial: 8 };
    for &n_classes in black_box(&[4, 32, 256]) {
        let collection = SoapVectorCollection::from_stacked(environments(parameters, 1024, n_classes), parameters).unwrap();
        let rdfs = collection.rdfs(None, false).unwrap();

        group.bench_function(format!("1024 curves, {} classes", n_classes), |b| b.iter(|| {
            // unique sets are cached, compute them on a fresh copy
            let rdfs = rdfs.select(&(0..rdfs.len()).collect::<Vec<_>>()).unwrap();
            black_box(rdfs.unique().len())
        }));
    }
}

criterion_group!(distributions, rdfs, unique);
criterion_main!(distributions);
