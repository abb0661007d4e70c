//! Bootstrap template generation and rewriting
//!
//! - [`template`] - the in-memory CloudFormation template
//! - [`generator`] - the toolkit collaborator (subprocess or fixture)
//! - [`trust`] - narrowing deployment role trust to the pipeline principal
//! - [`application`] - boundary attachment and parameter grants for application stacks

#![deny(missing_docs)]

pub mod application;
pub mod generator;
pub mod template;
pub mod trust;

pub use application::{attach_boundary, grant_parameter_access};
pub use generator::{
    scoped_bootstrap_template, CdkBootstrapGenerator, FixtureGenerator, TemplateGenerator,
};
pub use template::TemplateDocument;
pub use trust::{TrustRewriter, DEPLOYMENT_ROLES, EXECUTION_ROLE};
