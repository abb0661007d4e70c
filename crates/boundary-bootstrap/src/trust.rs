//! Trust rewriting for the bootstrap roles
//!
//! The toolkit's deployment roles trust the whole account. The rewrite swaps
//! that statement for one trusting only the pipeline principal and puts the
//! permission boundary on the CloudFormation execution role.
//!
//! Statements are found by what they grant, not where they sit: the toolkit
//! reorders `AssumeRolePolicyDocument.Statement` between versions. The
//! positions older toolkits used are kept on [`DeploymentRole`] and reported
//! in errors to help compare against a known-good layout.
//!
//! The rewrite is planned against the whole template before anything is
//! touched, so a failure leaves the document exactly as it was.

use serde_json::Value;
use tracing::{debug, info};

use boundary_common::{Error, Result};
use boundary_policy::{PolicyStatement, Principal};

use crate::template::TemplateDocument;

/// Logical id of the role CloudFormation deploys as
pub const EXECUTION_ROLE: &str = "CloudFormationExecutionRole";

/// Sid of the statement trusting the pipeline principal
pub const PIPELINE_TRUST_SID: &str = "AllowCodebuild";

const ASSUME_ROLE: &str = "sts:AssumeRole";

/// A bootstrap role whose trust is narrowed to the pipeline
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeploymentRole {
    /// Logical id in the bootstrap template
    pub logical_id: &'static str,
    /// Where older toolkits put the account-root statement
    pub legacy_root_index: usize,
    /// Where older toolkits expected the pipeline statement to land
    pub legacy_pipeline_index: usize,
}

/// Roles whose trust is rewritten, in rewrite order
pub const DEPLOYMENT_ROLES: [DeploymentRole; 4] = [
    DeploymentRole {
        logical_id: "FilePublishingRole",
        legacy_root_index: 0,
        legacy_pipeline_index: 2,
    },
    DeploymentRole {
        logical_id: "ImagePublishingRole",
        legacy_root_index: 0,
        legacy_pipeline_index: 2,
    },
    DeploymentRole {
        logical_id: "DeploymentActionRole",
        legacy_root_index: 0,
        legacy_pipeline_index: 2,
    },
    DeploymentRole {
        logical_id: "LookupRole",
        legacy_root_index: 0,
        legacy_pipeline_index: 3,
    },
];

/// What the rewrite will do to one role
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RoleAction {
    /// Drop the account-root statement at `index`, then install the
    /// pipeline statement unless it is already there
    Replace { index: usize, has_pipeline: bool },
    /// Rewritten by an earlier pass
    Unchanged,
}

/// Rewrites bootstrap role trust for one pipeline
#[derive(Clone, Debug)]
pub struct TrustRewriter {
    boundary_arn: String,
    pipeline_statement: Value,
}

impl TrustRewriter {
    /// Create a rewriter attaching `boundary_arn` and trusting
    /// `pipeline_principal_arn`
    pub fn new(boundary_arn: impl Into<String>, pipeline_principal_arn: impl Into<String>) -> Self {
        let pipeline_statement = PolicyStatement::allow(PIPELINE_TRUST_SID)
            .actions([ASSUME_ROLE])
            .principal(Principal::Aws(pipeline_principal_arn.into()))
            .to_value();
        Self {
            boundary_arn: boundary_arn.into(),
            pipeline_statement,
        }
    }

    /// The trust statement installed on every deployment role
    pub fn pipeline_statement(&self) -> &Value {
        &self.pipeline_statement
    }

    /// Rewrite `doc` in place and hand it back for chaining.
    ///
    /// Running it again on its own output changes nothing.
    ///
    /// # Errors
    /// Returns a shape mismatch, leaving `doc` untouched, if a role is
    /// missing or the account-root statement cannot be pinned down.
    pub fn rewrite<'a>(&self, doc: &'a mut TemplateDocument) -> Result<&'a mut TemplateDocument> {
        let plan = self.plan(doc)?;

        doc.set_property(
            EXECUTION_ROLE,
            "PermissionsBoundary",
            Value::from(self.boundary_arn.as_str()),
        )?;

        let mut rewritten = 0;
        for (role, action) in plan {
            let RoleAction::Replace { index, has_pipeline } = action else {
                debug!(resource = role.logical_id, "trust already narrowed");
                continue;
            };
            let statements = trust_statements_mut(doc, role.logical_id)?;
            statements.remove(index);
            if !has_pipeline {
                statements.push(self.pipeline_statement.clone());
            }
            debug!(resource = role.logical_id, removed = index, "trust narrowed to pipeline");
            rewritten += 1;
        }

        info!(
            rewritten,
            boundary = %self.boundary_arn,
            "bootstrap trust rewritten"
        );
        Ok(doc)
    }

    fn plan(&self, doc: &TemplateDocument) -> Result<Vec<(DeploymentRole, RoleAction)>> {
        if doc.resource(EXECUTION_ROLE).is_none() {
            return Err(Error::shape_mismatch(EXECUTION_ROLE, "resource not found in template"));
        }

        DEPLOYMENT_ROLES
            .iter()
            .map(|role| {
                let statements = trust_statements(doc, role.logical_id)?;
                let roots: Vec<usize> = statements
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| is_account_root_trust(s))
                    .map(|(i, _)| i)
                    .collect();
                let has_pipeline = statements.contains(&self.pipeline_statement);

                let action = match roots.as_slice() {
                    [index] => RoleAction::Replace {
                        index: *index,
                        has_pipeline,
                    },
                    [] if has_pipeline => RoleAction::Unchanged,
                    [] => {
                        return Err(Error::shape_mismatch_at(
                            role.logical_id,
                            role.legacy_root_index,
                            format!(
                                "no statement trusts the account root among {} \
                                 (legacy layout had it at index {}, pipeline at {})",
                                statements.len(),
                                role.legacy_root_index,
                                role.legacy_pipeline_index
                            ),
                        ))
                    }
                    [_, second, ..] => {
                        return Err(Error::shape_mismatch_at(
                            role.logical_id,
                            *second,
                            format!(
                                "{} statements trust the account root, expected one",
                                roots.len()
                            ),
                        ))
                    }
                };
                Ok((*role, action))
            })
            .collect()
    }

    /// Check a rewritten template.
    ///
    /// # Errors
    /// Returns a shape mismatch naming the first role that still trusts the
    /// account root, lacks the pipeline statement, or (for the execution
    /// role) carries a different boundary.
    pub fn verify(&self, doc: &TemplateDocument) -> Result<()> {
        let boundary = doc
            .resource(EXECUTION_ROLE)
            .and_then(|r| r.pointer("/Properties/PermissionsBoundary"))
            .and_then(Value::as_str);
        if boundary != Some(self.boundary_arn.as_str()) {
            return Err(Error::shape_mismatch(
                EXECUTION_ROLE,
                format!("permissions boundary is {:?}, expected {}", boundary, self.boundary_arn),
            ));
        }

        for role in &DEPLOYMENT_ROLES {
            let statements = trust_statements(doc, role.logical_id)?;
            if let Some(index) = statements.iter().position(is_account_root_trust) {
                return Err(Error::shape_mismatch_at(
                    role.logical_id,
                    index,
                    "role still trusts the account root",
                ));
            }
            if !statements.contains(&self.pipeline_statement) {
                return Err(Error::shape_mismatch(
                    role.logical_id,
                    "role does not trust the pipeline principal",
                ));
            }
        }
        Ok(())
    }
}

fn trust_statements<'a>(doc: &'a TemplateDocument, logical_id: &str) -> Result<&'a Vec<Value>> {
    let resource = doc
        .resource(logical_id)
        .ok_or_else(|| Error::shape_mismatch(logical_id, "resource not found in template"))?;
    resource
        .pointer("/Properties/AssumeRolePolicyDocument/Statement")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::shape_mismatch(logical_id, "role has no trust statement list"))
}

fn trust_statements_mut<'a>(
    doc: &'a mut TemplateDocument,
    logical_id: &str,
) -> Result<&'a mut Vec<Value>> {
    doc.resource_mut(logical_id)
        .and_then(|r| r.pointer_mut("/Properties/AssumeRolePolicyDocument/Statement"))
        .and_then(Value::as_array_mut)
        .ok_or_else(|| Error::shape_mismatch(logical_id, "role has no trust statement list"))
}

/// An `Allow sts:AssumeRole` statement whose AWS principal is the account root
fn is_account_root_trust(statement: &Value) -> bool {
    if statement.get("Effect").and_then(Value::as_str) != Some("Allow") {
        return false;
    }
    let assumes = match statement.get("Action") {
        Some(Value::String(action)) => action == ASSUME_ROLE,
        Some(Value::Array(actions)) => actions.iter().any(|a| a == ASSUME_ROLE),
        _ => false,
    };
    if !assumes {
        return false;
    }
    match statement.pointer("/Principal/AWS") {
        Some(Value::Array(principals)) => principals.iter().any(is_account_root),
        Some(principal) => is_account_root(principal),
        None => false,
    }
}

/// Recognizes the ways a template spells "this account"
fn is_account_root(principal: &Value) -> bool {
    match principal {
        Value::String(s) => {
            (s.len() == 12 && s.chars().all(|c| c.is_ascii_digit()))
                || (s.starts_with("arn:") && s.ends_with(":root"))
        }
        Value::Object(map) => {
            if let Some(reference) = map.get("Ref") {
                return reference == "AWS::AccountId";
            }
            if let Some(sub) = map.get("Fn::Sub") {
                let template = match sub {
                    Value::Array(parts) => parts.first(),
                    other => Some(other),
                };
                return template
                    .and_then(Value::as_str)
                    .is_some_and(|t| t.ends_with(":root"));
            }
            if let Some(join) = map.get("Fn::Join") {
                return join
                    .pointer("/1")
                    .and_then(Value::as_array)
                    .and_then(|parts| parts.last())
                    .and_then(Value::as_str)
                    .is_some_and(|last| last.ends_with(":root"));
            }
            false
        }
        _ => false,
    }
}
