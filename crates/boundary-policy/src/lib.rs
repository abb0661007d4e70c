//! IAM policy documents for the permission-boundary pipeline
//!
//! - [`document`] - statement and document types with IAM JSON rendering
//! - [`boundary`] - the permission boundary managed policy
//! - [`grants`] - grants for the pipeline role and application roles

#![deny(missing_docs)]

pub mod boundary;
pub mod document;
pub mod grants;

pub use boundary::BoundaryPolicy;
pub use document::{Conditions, Effect, PolicyDocument, PolicyStatement, Principal};
