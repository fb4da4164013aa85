//! This library implements [Gaussian Process](https://en.wikipedia.org/wiki/Gaussian_process) conditionals,
//! that is the predictive distribution of a GP at new points given function values at reference points.
//!
//! Reference points are either the training inputs of an exact GP or the inducing variables of a
//! sparse GP (SGP) which summarize a GP with M < N representative variables. Function values may be
//! uncertain, described by the square root of their gaussian covariance, and given in the whitened
//! representation used by variational sparse GPs.
//!
//! The main entry point is [conditional](fn@conditional) which dispatches on the conditioning [Source]
//! to the shared gaussian conditioning primitive [base_conditional]. Predictive variances are returned
//! as a [Variance] whose layout is driven by [ConditionalParams]. [sample_conditional] draws samples
//! from the resulting predictive distribution.
//!
//! Example:
//!
//! ```
//! use egobox_conditionals::{conditional, ConditionalParams, InducingPoints, Source, Variance};
//! use egobox_conditionals::kernels::SquaredExponential;
//! use linfa::ParamGuard;
//! use ndarray::array;
//!
//! let kernel = SquaredExponential::new(1., array![1.]);
//! let feature = InducingPoints::new(array![[0.], [1.]]);
//! let f = array![[1.], [2.]];
//! let params = ConditionalParams::new().full_cov(true).check().unwrap();
//!
//! let source: Source<f64, SquaredExponential<f64>> = Source::Inducing(&feature);
//! let (mean, var) = conditional(&array![[0.5], [2.]], source, &kernel, &f, None, &params).unwrap();
//! assert_eq!(mean.dim(), (2, 1));
//! assert!(matches!(var, Variance::Full(_)));
//! ```
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod base;
mod conditional;
mod errors;
mod expansion;
mod features;
pub mod kernels;
mod parameters;
mod sampling;
mod utils;

pub use base::*;
pub use conditional::*;
pub use errors::*;
pub use expansion::*;
pub use features::*;
pub use parameters::*;
pub use sampling::*;
pub use utils::{jitter_eye, pairwise_differences};
