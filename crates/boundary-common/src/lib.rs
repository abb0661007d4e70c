//! Common types for the permission-boundary pipeline: identity, naming,
//! qualifier derivation, errors and telemetry.

#![deny(missing_docs)]

pub mod error;
pub mod identity;
pub mod naming;
pub mod qualifier;
pub mod telemetry;
pub mod yaml;

pub use error::Error;
pub use identity::{AccountEnv, Identity};
pub use qualifier::Qualifier;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Default Configuration Constants
// =============================================================================

/// Default tenant when `TENANT` is unset
pub const DEFAULT_TENANT: &str = "openenterprise";

/// Default environment when `ENVIRONMENT` is unset
pub const DEFAULT_ENVIRONMENT: &str = "staging";

/// Default application when `APPLICATION` is unset
pub const DEFAULT_APPLICATION: &str = "superapp4000";

/// AWS partition used when building ARNs
pub const AWS_PARTITION: &str = "aws";

/// Regions the bounded pipeline may act in.
///
/// us-east-1 is required for CloudFront; eu-west-1 is the primary region.
pub const ALLOWED_REGIONS: [&str; 2] = ["us-east-1", "eu-west-1"];
