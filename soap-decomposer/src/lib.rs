#![warn(clippy::all, clippy::pedantic)]

// disable some style lints
#![allow(clippy::needless_return, clippy::must_use_candidate, clippy::comparison_chain)]
#![allow(clippy::redundant_field_names, clippy::redundant_closure_for_method_calls)]
#![allow(clippy::unreadable_literal, clippy::option_if_let_else, clippy::range_plus_one)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc, clippy::module_name_repetitions)]

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap, clippy::cast_lossless, clippy::cast_sign_loss)]
#![allow(clippy::default_trait_access)]

// Tests lints
#![cfg_attr(test, allow(clippy::float_cmp))]

//! Decomposition of SOAP power spectrum vectors into radial and angular
//! distribution functions, and management of collections of such
//! distributions: deduplication, refinement against a reference set,
//! histograms and persistence.

mod errors;
pub use self::errors::Error;

pub mod math;
pub use self::math::{CutoffFunction, fcut};

mod basis;
pub use self::basis::{BasisParameters, Decomposer, DEFAULT_GRID_POINTS};
pub use self::basis::{AngularBasis, PolynomialRadialBasis};

mod parallel;
pub use self::parallel::{configure_workers, reset_workers, current_workers};

pub mod io;

mod vector;
pub use self::vector::{SoapVector, DEFAULT_CACHE_CAPACITY};

mod collection;
pub use self::collection::SoapVectorCollection;

pub mod distributions;
pub use self::distributions::{DistributionCollection, DistributionKind, Tolerances};

mod provider;
pub use self::provider::{StructureProvider, NpyStructureStore, distance_shells};
