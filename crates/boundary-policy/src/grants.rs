//! Grants for principals that work inside the boundary

use serde_json::{json, Value};

use boundary_common::naming::{application_parameters_arn, BootstrapRole};
use boundary_common::{AccountEnv, Identity, Qualifier};

use crate::document::{PolicyDocument, PolicyStatement};

/// Policy letting the pipeline role assume the bootstrap roles and pass the
/// CloudFormation execution role.
pub fn pipeline_role_document(qualifier: &Qualifier, env: &AccountEnv) -> PolicyDocument {
    PolicyDocument::new(vec![
        PolicyStatement::allow("AssumeBootstrapRoles")
            .actions(["sts:AssumeRole"])
            .resources(
                BootstrapRole::ASSUMABLE
                    .iter()
                    .map(|role| role.arn(qualifier, env)),
            ),
        PolicyStatement::allow("PassExecutionRole")
            .actions(["iam:PassRole"])
            .resources([BootstrapRole::CfnExec.arn(qualifier, env)]),
    ])
}

/// `AWS::IAM::Policy` resource attaching [`pipeline_role_document`] to a role
pub fn pipeline_role_policy_resource(
    qualifier: &Qualifier,
    env: &AccountEnv,
    role_name: &str,
) -> Value {
    json!({
        "Type": "AWS::IAM::Policy",
        "Properties": {
            "PolicyName": format!("{}-pipeline-bootstrap-access", qualifier),
            "PolicyDocument": pipeline_role_document(qualifier, env).to_value(),
            "Roles": [role_name],
        }
    })
}

/// Read access to the application's SSM parameter subtree
pub fn application_parameters_statement(identity: &Identity, env: &AccountEnv) -> PolicyStatement {
    PolicyStatement::allow("PermitParamGet")
        .actions(["ssm:GetParametersByPath"])
        .resources([application_parameters_arn(identity, env)])
}
