mod cutoff;
pub use self::cutoff::{CutoffFunction, fcut};

mod legendre;
pub use self::legendre::LegendrePolynomials;

mod integration;
pub use self::integration::{trapezoid, trapezoid_weights, gauss_legendre};

mod polar;
pub use self::polar::orthogonal_polar_factor;
