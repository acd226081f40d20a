#![allow(dead_code)]

use ndarray::{Array4, Array5};

use soap_decomposer::BasisParameters;

/// Basis parameters used for most tests
pub fn parameters() -> BasisParameters {
    BasisParameters { cutoff: 6.0, max_angular: 6, max_radial: 8 }
}

/// Small deterministic pseudo-random generator (xorshift64*), giving numbers
/// uniformly distributed in `[0, 1)`
pub struct Generator(u64);

impl Generator {
    pub fn new(seed: u64) -> Generator {
        Generator(seed.wrapping_mul(0x9E3779B97F4A7C15) | 1)
    }

    pub fn next(&mut self) -> f64 {
        self.0 ^= self.0 >> 12;
        self.0 ^= self.0 << 25;
        self.0 ^= self.0 >> 27;
        let value = self.0.wrapping_mul(0x2545F4914F6CDD1D);
        (value >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Power spectrum-like coefficients for an environment of the given `class`.
/// Environments of the same class differ by at most `noise` in each
/// coefficient.
///
/// The `l = 0` block is built as an outer product `a_n a_n'`, making the
/// corresponding radial distribution non-negative like a real density.
pub fn environment(parameters: BasisParameters, class: usize, noise: f64, generator: &mut Generator) -> Array4<f64> {
    let n_max = parameters.max_radial;
    let l_max = parameters.max_angular;

    let radial = (0..n_max)
        .map(|n| f64::cos(0.7 * (class + 1) as f64 * (n + 1) as f64) / (1.0 + n as f64))
        .collect::<Vec<_>>();

    Array4::from_shape_fn((2, n_max, n_max, l_max + 1), |(s, n1, n2, l)| {
        let angular = 1.0 / (1.0 + l as f64 + (class % 3) as f64 * l as f64);
        let species = 1.0 + 0.5 * s as f64;
        species * radial[n1] * radial[n2] * angular + noise * (generator.next() - 0.5)
    })
}

/// Stacked coefficients for `n_environments`, cycling through `n_classes`
/// different classes of environments
pub fn environments(parameters: BasisParameters, n_environments: usize, n_classes: usize, noise: f64) -> Array5<f64> {
    let mut generator = Generator::new(n_environments as u64);
    let n_max = parameters.max_radial;
    let l_max = parameters.max_angular;

    let mut stacked = Array5::zeros((n_environments, 2, n_max, n_max, l_max + 1));
    for (i, mut slice) in stacked.outer_iter_mut().enumerate() {
        slice.assign(&environment(parameters, i % n_classes, noise, &mut generator));
    }
    stacked
}
