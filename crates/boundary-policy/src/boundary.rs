//! Permission boundary for the CI/CD pipeline
//!
//! The boundary caps what any role created by the pipeline can ever do. It
//! grants a fixed set of serverless services inside the allowed regions, lets
//! the pipeline pass application roles to Lambda only, and makes role
//! creation conditional on the new role carrying this same boundary.
//!
//! The two Deny statements and the conditional role-upsert Allow are one
//! bundle: without the Denies a bounded principal could create a role, then
//! delete or rewrite the boundary and escape containment.

use serde_json::{json, Value};
use tracing::debug;

use boundary_common::naming::{application_role_pattern, boundary_policy_arn, boundary_policy_name};
use boundary_common::{Identity, Qualifier, ALLOWED_REGIONS};

use crate::document::{Effect, PolicyDocument, PolicyStatement};

/// Description attached to the boundary managed policy
pub const BOUNDARY_DESCRIPTION: &str =
    "Permission boundary to limit permissions of roles created by CI/CD user.";

/// Statement ids, in emission order
pub mod sid {
    /// IAM read-only and policy simulation
    pub const IAM_READ_ONLY: &str = "AllowIAMReadOnly";
    /// Wildcard-resource serverless services
    pub const SERVERLESS_SERVICES: &str = "AllowServerlessServices";
    /// CloudFormation stack lifecycle
    pub const CLOUDFORMATION_DEPLOYMENT: &str = "AllowCloudFormationDeployment";
    /// Template validation
    pub const VALIDATE_ANY_STACK: &str = "AllowValidationOfAnyStack";
    /// Passing application roles to Lambda
    pub const PASS_ROLE_TO_LAMBDA: &str = "AllowPassRoleToLambda";
    /// Deny edits to the boundary policy itself
    pub const DENY_BOUNDARY_ALTERATION: &str = "DenyPermissionsBoundaryAlteration";
    /// Deny stripping the boundary from a role
    pub const DENY_BOUNDARY_REMOVAL: &str = "DenyPermissionsBoundaryRemoval";
    /// Role upsert only while applying this boundary
    pub const UPSERT_ROLE_WITH_BOUNDARY: &str = "AllowUpsertRoleIfPermBoundaryIsBeingApplied";
    /// Role and policy tagging
    pub const TAGGING: &str = "AllowTagging";
    /// Role deletion and policy detachment
    pub const DELETE_ROLE: &str = "AllowDeleteRole";
}

const SERVERLESS_ACTIONS: [&str; 12] = [
    "apigateway:*",
    "dynamodb:*",
    "ec2:CreateNetworkInterface",
    "ec2:DeleteNetworkInterface",
    "ec2:Describe*",
    "kms:*",
    "lambda:*",
    "logs:*",
    "s3:*",
    "secretsmanager:*",
    "ssm:*",
    "xray:*",
];

const CLOUDFORMATION_ACTIONS: [&str; 10] = [
    "cloudformation:CreateStack",
    "cloudformation:DescribeStackEvents",
    "cloudformation:DescribeStackResources",
    "cloudformation:DescribeStackResource",
    "cloudformation:DescribeStacks",
    "cloudformation:GetTemplate",
    "cloudformation:ListStackResources",
    "cloudformation:UpdateStack",
    "cloudformation:ValidateTemplate",
    "cloudformation:DeleteStack",
];

const BOUNDARY_ALTERATION_ACTIONS: [&str; 4] = [
    "iam:CreatePolicyVersion",
    "iam:DeletePolicy",
    "iam:DeletePolicyVersion",
    "iam:SetDefaultPolicyVersion",
];

const ROLE_UPSERT_ACTIONS: [&str; 7] = [
    "iam:CreateRole",
    "iam:UpdateRole",
    "iam:AttachRolePolicy",
    "iam:PutRolePolicy",
    "iam:PutRolePermissionsBoundary",
    "iam:UpdateRoleDescription",
    "iam:UpdateAssumeRolePolicy",
];

/// Service roles may be passed to
const PASS_ROLE_SERVICE: &str = "lambda.amazonaws.com";

fn restrict_to_regions(statement: PolicyStatement) -> PolicyStatement {
    statement.condition(
        "StringEquals",
        "aws:RequestedRegion",
        json!(ALLOWED_REGIONS),
    )
}

/// The permission boundary managed policy
#[derive(Clone, Debug, PartialEq)]
pub struct BoundaryPolicy {
    /// Managed policy name
    pub name: String,
    /// Managed policy ARN
    pub arn: String,
    /// Policy document
    pub document: PolicyDocument,
}

impl BoundaryPolicy {
    /// Build the boundary for a qualifier and identity.
    ///
    /// Pure construction. Malformed identity strings give valid but
    /// meaningless resource patterns rather than an error.
    pub fn build(qualifier: &Qualifier, identity: &Identity, account: &str) -> Self {
        let name = boundary_policy_name(qualifier, account);
        let arn = boundary_policy_arn(qualifier, account);

        let mut statements = vec![
            PolicyStatement::allow(sid::IAM_READ_ONLY)
                .actions(["iam:Get*", "iam:List*", "iam:SimulatePrincipalPolicy"])
                .resources(["*"]),
            restrict_to_regions(
                PolicyStatement::allow(sid::SERVERLESS_SERVICES)
                    .actions(SERVERLESS_ACTIONS)
                    .resources(["*"]),
            ),
            restrict_to_regions(
                PolicyStatement::allow(sid::CLOUDFORMATION_DEPLOYMENT)
                    .actions(CLOUDFORMATION_ACTIONS)
                    .resources(["*"]),
            ),
            restrict_to_regions(
                PolicyStatement::allow(sid::VALIDATE_ANY_STACK)
                    .actions(["cloudformation:ValidateTemplate"])
                    .resources(["*"]),
            ),
            PolicyStatement::allow(sid::PASS_ROLE_TO_LAMBDA)
                .actions(["iam:PassRole"])
                .resources([application_role_pattern(identity, account)])
                .condition("StringEquals", "iam:PassedToService", PASS_ROLE_SERVICE),
        ];
        statements.extend(enforcement_bundle(&arn));
        statements.extend([
            PolicyStatement::allow(sid::TAGGING)
                .actions([
                    "iam:TagPolicy",
                    "iam:UntagPolicy",
                    "iam:TagRole",
                    "iam:UntagRole",
                ])
                .resources(["*"]),
            PolicyStatement::allow(sid::DELETE_ROLE)
                .actions([
                    "iam:DetachRolePolicy",
                    "iam:DeleteRolePolicy",
                    "iam:DeleteRole",
                ])
                .resources(["*"]),
        ]);

        debug!(
            qualifier = %qualifier,
            boundary = %arn,
            statements = statements.len(),
            "built permission boundary"
        );

        Self {
            name,
            arn,
            document: PolicyDocument::new(statements),
        }
    }

    /// Whether the enforcement bundle is intact.
    ///
    /// True when the conditional role-upsert Allow is absent, or present
    /// together with both Deny statements targeting this boundary.
    pub fn is_contained(&self) -> bool {
        let Some(upsert) = self.document.statement(sid::UPSERT_ROLE_WITH_BOUNDARY) else {
            return true;
        };
        let deny_alteration = self
            .document
            .statement(sid::DENY_BOUNDARY_ALTERATION)
            .is_some_and(|s| s.effect == Effect::Deny && s.resources == [self.arn.clone()]);
        let deny_removal = self
            .document
            .statement(sid::DENY_BOUNDARY_REMOVAL)
            .is_some_and(|s| s.effect == Effect::Deny);
        let upsert_bound = upsert.condition_value("StringEquals", "iam:PermissionsBoundary")
            == Some(&Value::String(self.arn.clone()));

        deny_alteration && deny_removal && upsert_bound
    }

    /// CloudFormation `AWS::IAM::ManagedPolicy` resource for this boundary
    pub fn to_resource(&self) -> Value {
        json!({
            "Type": "AWS::IAM::ManagedPolicy",
            "Properties": {
                "ManagedPolicyName": self.name,
                "Description": BOUNDARY_DESCRIPTION,
                "Path": "/",
                "PolicyDocument": self.document.to_value(),
            }
        })
    }
}

/// Deny-alteration, deny-removal and conditional role upsert.
///
/// Always returned together; callers must not emit a subset.
fn enforcement_bundle(boundary_arn: &str) -> [PolicyStatement; 3] {
    [
        PolicyStatement::deny(sid::DENY_BOUNDARY_ALTERATION)
            .actions(BOUNDARY_ALTERATION_ACTIONS)
            .resources([boundary_arn]),
        PolicyStatement::deny(sid::DENY_BOUNDARY_REMOVAL)
            .actions(["iam:DeleteRolePermissionsBoundary"])
            .resources(["*"]),
        PolicyStatement::allow(sid::UPSERT_ROLE_WITH_BOUNDARY)
            .actions(ROLE_UPSERT_ACTIONS)
            .resources(["*"])
            .condition("StringEquals", "iam:PermissionsBoundary", boundary_arn),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCOUNT: &str = "123456789012";

    fn acme() -> Identity {
        Identity::new("acme", "staging", "widgets")
    }

    fn build_for(identity: &Identity) -> BoundaryPolicy {
        BoundaryPolicy::build(&identity.qualifier(), identity, ACCOUNT)
    }

    #[test]
    fn statements_are_emitted_in_fixed_order() {
        let policy = build_for(&acme());
        let sids: Vec<_> = policy
            .document
            .statements
            .iter()
            .map(|s| s.sid.as_str())
            .collect();
        assert_eq!(
            sids,
            vec![
                sid::IAM_READ_ONLY,
                sid::SERVERLESS_SERVICES,
                sid::CLOUDFORMATION_DEPLOYMENT,
                sid::VALIDATE_ANY_STACK,
                sid::PASS_ROLE_TO_LAMBDA,
                sid::DENY_BOUNDARY_ALTERATION,
                sid::DENY_BOUNDARY_REMOVAL,
                sid::UPSERT_ROLE_WITH_BOUNDARY,
                sid::TAGGING,
                sid::DELETE_ROLE,
            ]
        );
    }

    #[test]
    fn name_and_arn_follow_qualifier() {
        let policy = build_for(&acme());
        assert_eq!(policy.name, "35e2023292-permissions-boundary-123456789012");
        assert_eq!(
            policy.arn,
            "arn:aws:iam::123456789012:policy/35e2023292-permissions-boundary-123456789012"
        );
    }

    #[test]
    fn deny_statements_present_for_any_identity() {
        for identity in [
            acme(),
            Identity::new("", "", ""),
            Identity::new("globex", "production", "billing"),
        ] {
            let policy = build_for(&identity);
            let denies: Vec<_> = policy
                .document
                .statements
                .iter()
                .filter(|s| s.effect == Effect::Deny)
                .map(|s| s.sid.as_str())
                .collect();
            assert_eq!(
                denies,
                vec![sid::DENY_BOUNDARY_ALTERATION, sid::DENY_BOUNDARY_REMOVAL]
            );
            assert!(policy.is_contained());
        }
    }

    #[test]
    fn upsert_condition_names_only_this_boundary() {
        let identity = acme();
        let policy = BoundaryPolicy::build(
            &Qualifier::from_raw("staging-app-hash"),
            &identity,
            ACCOUNT,
        );
        let other = boundary_policy_arn(&Qualifier::from_raw("other-hash"), ACCOUNT);

        let upsert = policy
            .document
            .statement(sid::UPSERT_ROLE_WITH_BOUNDARY)
            .expect("upsert statement should exist");
        assert_eq!(upsert.effect, Effect::Allow);
        let value = upsert
            .condition_value("StringEquals", "iam:PermissionsBoundary")
            .expect("boundary condition should exist");
        assert_eq!(
            value,
            &json!("arn:aws:iam::123456789012:policy/staging-app-hash-permissions-boundary-123456789012")
        );
        assert_ne!(value, &json!(other));
    }

    #[test]
    fn deny_alteration_targets_boundary_arn() {
        let policy = build_for(&acme());
        let deny = policy
            .document
            .statement(sid::DENY_BOUNDARY_ALTERATION)
            .unwrap();
        assert_eq!(deny.resources, vec![policy.arn.clone()]);
        assert_eq!(deny.actions.len(), 4);
    }

    #[test]
    fn regional_statements_carry_region_condition() {
        let policy = build_for(&acme());
        for id in [
            sid::SERVERLESS_SERVICES,
            sid::CLOUDFORMATION_DEPLOYMENT,
            sid::VALIDATE_ANY_STACK,
        ] {
            let statement = policy.document.statement(id).unwrap();
            assert_eq!(
                statement.condition_value("StringEquals", "aws:RequestedRegion"),
                Some(&json!(["us-east-1", "eu-west-1"])),
                "{id} should be region restricted"
            );
        }
        let read_only = policy.document.statement(sid::IAM_READ_ONLY).unwrap();
        assert!(read_only.conditions.is_empty());
    }

    #[test]
    fn pass_role_limited_to_lambda_and_application_roles() {
        let policy = build_for(&acme());
        let pass = policy.document.statement(sid::PASS_ROLE_TO_LAMBDA).unwrap();
        assert_eq!(
            pass.resources,
            vec!["arn:aws:iam::123456789012:role/AcmeStaging*"]
        );
        assert_eq!(
            pass.condition_value("StringEquals", "iam:PassedToService"),
            Some(&json!("lambda.amazonaws.com"))
        );
    }

    #[test]
    fn tampered_bundle_is_not_contained() {
        let mut policy = build_for(&acme());
        policy
            .document
            .statements
            .retain(|s| s.sid != sid::DENY_BOUNDARY_REMOVAL);
        assert!(!policy.is_contained());

        let mut policy = build_for(&acme());
        policy.arn = "arn:aws:iam::123456789012:policy/elsewhere".to_string();
        assert!(!policy.is_contained());
    }

    #[test]
    fn resource_renders_managed_policy() {
        let policy = build_for(&acme());
        let resource = policy.to_resource();
        assert_eq!(resource["Type"], "AWS::IAM::ManagedPolicy");
        assert_eq!(resource["Properties"]["ManagedPolicyName"], policy.name);
        assert_eq!(resource["Properties"]["Description"], BOUNDARY_DESCRIPTION);
        assert_eq!(
            resource["Properties"]["PolicyDocument"]["Statement"]
                .as_array()
                .unwrap()
                .len(),
            10
        );
    }

    #[test]
    fn build_is_deterministic() {
        assert_eq!(build_for(&acme()), build_for(&acme()));
    }
}
