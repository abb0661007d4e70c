//! Boundary attachment and parameter grants for application stacks

use serde_json::{json, Value};
use tracing::{debug, info};

use boundary_common::{AccountEnv, Identity, Result};
use boundary_policy::grants::application_parameters_statement;
use boundary_policy::PolicyDocument;

use crate::template::TemplateDocument;

/// CloudFormation type of the resources that receive the boundary
pub const ROLE_TYPE: &str = "AWS::IAM::Role";

/// Logical id of the policy granting roles read access to parameters
pub const PARAMETER_POLICY_ID: &str = "ApplicationParametersPolicy";

/// Set `PermissionsBoundary` on every IAM role in `doc`.
///
/// Returns the logical ids updated, in template order. A template without
/// roles is left alone and yields an empty list.
pub fn attach_boundary(doc: &mut TemplateDocument, boundary_arn: &str) -> Result<Vec<String>> {
    let roles = doc.resources_of_type(ROLE_TYPE);
    for logical_id in &roles {
        doc.set_property(logical_id, "PermissionsBoundary", Value::from(boundary_arn))?;
        debug!(resource = %logical_id, "permissions boundary attached");
    }
    info!(roles = roles.len(), boundary = %boundary_arn, "application roles bounded");
    Ok(roles)
}

/// Let `roles` read the application's SSM parameter subtree.
///
/// Adds one `AWS::IAM::Policy` attached to every listed role. Does nothing
/// when `roles` is empty.
pub fn grant_parameter_access(
    doc: &mut TemplateDocument,
    identity: &Identity,
    env: &AccountEnv,
    roles: &[String],
) {
    if roles.is_empty() {
        return;
    }
    let document = PolicyDocument::new(vec![application_parameters_statement(identity, env)]);
    let role_refs: Vec<Value> = roles.iter().map(|id| json!({ "Ref": id })).collect();
    doc.insert_resource(
        PARAMETER_POLICY_ID,
        json!({
            "Type": "AWS::IAM::Policy",
            "Properties": {
                "PolicyName": format!(
                    "{}-{}-{}-parameters",
                    identity.tenant, identity.environment, identity.application
                ),
                "PolicyDocument": document.to_value(),
                "Roles": role_refs,
            }
        }),
    );
    debug!(roles = roles.len(), "parameter read access granted");
}
