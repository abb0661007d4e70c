//! Pipeline stack synthesis
//!
//! Runs the whole chain once: derive the qualifier, build the boundary,
//! generate and scope the bootstrap template, narrow its trust, then
//! assemble the pipeline stack around it. Any failure aborts the run before
//! a template exists, so callers never see a half-rewritten stack.

use serde_json::{json, Value};
use tracing::info;

use boundary_bootstrap::{scoped_bootstrap_template, TemplateDocument, TemplateGenerator, TrustRewriter};
use boundary_common::naming::{pipeline_stack_id, role_name_from_arn};
use boundary_common::{AccountEnv, Error, Identity, Qualifier, Result};
use boundary_policy::grants::pipeline_role_policy_resource;
use boundary_policy::BoundaryPolicy;

/// Logical id of the boundary managed policy in the pipeline stack
pub const BOUNDARY_RESOURCE_ID: &str = "PermissionsBoundary";

/// Logical id of the pipeline role's grant policy
pub const PIPELINE_POLICY_RESOURCE_ID: &str = "PipelineRolePolicy";

/// Output carrying the boundary ARN to the application stacks
pub const BOUNDARY_OUTPUT: &str = "PermissionsBoundaryArn";

/// NoEcho parameter carrying the source repository token
pub const GITHUB_TOKEN_PARAMETER: &str = "GithubToken";

/// Output naming the source repository (`<org>/<repo>`)
pub const SOURCE_REPOSITORY_OUTPUT: &str = "SourceRepository";

/// Output naming the tracked branch
pub const SOURCE_BRANCH_OUTPUT: &str = "SourceBranch";

/// GitHub repository the pipeline builds from
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceRepository {
    /// Owning organization or user
    pub org: String,
    /// Repository name
    pub repo: String,
    /// Branch the pipeline tracks
    pub branch: String,
}

impl SourceRepository {
    /// `<org>/<repo>`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.org, self.repo)
    }
}

/// Inputs for one synthesis run
#[derive(Clone, Debug)]
pub struct PipelineRequest {
    /// Who the pipeline belongs to
    pub identity: Identity,
    /// Target account and region
    pub env: AccountEnv,
    /// ARN of the role the pipeline runs as
    pub pipeline_role_arn: String,
    /// Repository the pipeline builds from
    pub source: SourceRepository,
}

/// A synthesized pipeline stack
#[derive(Clone, Debug)]
pub struct PipelineOutput {
    /// `<Tenant><Environment>PipelineStack`
    pub stack_id: String,
    /// Qualifier every resource is namespaced by
    pub qualifier: Qualifier,
    /// ARN of the boundary managed policy
    pub boundary_arn: String,
    /// The finished template
    pub template: TemplateDocument,
}

/// Synthesize the pipeline stack.
///
/// # Errors
/// Returns the first failure: a configuration error for a pipeline ARN that
/// is not a role, a generation error from the toolkit, or a shape mismatch
/// from the trust rewrite.
pub async fn run_pipeline<G: TemplateGenerator + ?Sized>(
    request: &PipelineRequest,
    generator: &G,
) -> Result<PipelineOutput> {
    let role_name = role_name_from_arn(&request.pipeline_role_arn).ok_or_else(|| {
        Error::configuration_for_field(
            "PIPELINE_ROLE_ARN",
            format!("'{}' is not an IAM role ARN", request.pipeline_role_arn),
        )
    })?;

    let qualifier = request.identity.qualifier();
    let boundary = BoundaryPolicy::build(&qualifier, &request.identity, &request.env.account);
    info!(
        qualifier = %qualifier,
        tenant = %request.identity.tenant,
        application = %request.identity.application,
        boundary = %boundary.name,
        "synthesizing pipeline stack"
    );

    let mut bootstrap = scoped_bootstrap_template(generator, &qualifier).await?;
    let rewriter = TrustRewriter::new(&boundary.arn, &request.pipeline_role_arn);
    rewriter.rewrite(&mut bootstrap)?;

    let mut template = TemplateDocument::empty();
    template.insert_resource(BOUNDARY_RESOURCE_ID, boundary.to_resource());
    template.insert_resource(
        PIPELINE_POLICY_RESOURCE_ID,
        pipeline_role_policy_resource(&qualifier, &request.env, role_name),
    );
    template.add_parameter(
        GITHUB_TOKEN_PARAMETER,
        json!({
            "Type": "String",
            "NoEcho": true,
            "Description": format!("Token for reading {}", request.source.full_name()),
        }),
    )?;
    template.include(bootstrap)?;
    template.add_output(
        BOUNDARY_OUTPUT,
        Value::from(boundary.arn.as_str()),
        Some("Permission boundary for roles created by the pipeline"),
    )?;
    template.add_output(
        SOURCE_REPOSITORY_OUTPUT,
        Value::from(request.source.full_name()),
        None,
    )?;
    template.add_output(
        SOURCE_BRANCH_OUTPUT,
        Value::from(request.source.branch.as_str()),
        None,
    )?;
    rewriter.verify(&template)?;
    if template.output(BOUNDARY_OUTPUT) != Some(&Value::from(boundary.arn.as_str())) {
        return Err(Error::shape_mismatch(
            BOUNDARY_OUTPUT,
            "boundary ARN output missing from the assembled stack",
        ));
    }

    let stack_id = pipeline_stack_id(&request.identity);
    info!(
        stack = %stack_id,
        source = %request.source.full_name(),
        resources = template.resource_count(),
        boundary = %boundary.arn,
        "pipeline stack synthesized"
    );

    Ok(PipelineOutput {
        stack_id,
        qualifier,
        boundary_arn: boundary.arn,
        template,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use boundary_bootstrap::FixtureGenerator;

    fn request() -> PipelineRequest {
        PipelineRequest {
            identity: Identity::new("acme", "staging", "widgets"),
            env: AccountEnv::new("123456789012", "eu-west-1").unwrap(),
            pipeline_role_arn: "arn:aws:iam::123456789012:role/AcmePipelineRole".to_string(),
            source: SourceRepository {
                org: "acme".to_string(),
                repo: "widgets-pipeline".to_string(),
                branch: "main".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn assembles_boundary_grants_and_bootstrap() {
        let output = run_pipeline(&request(), &FixtureGenerator::builtin())
            .await
            .unwrap();
        let template = &output.template;

        assert_eq!(output.stack_id, "AcmeStagingPipelineStack");
        assert_eq!(
            template.resource(BOUNDARY_RESOURCE_ID).unwrap()["Type"],
            "AWS::IAM::ManagedPolicy"
        );
        assert_eq!(
            template.resource(PIPELINE_POLICY_RESOURCE_ID).unwrap()["Properties"]["Roles"],
            json!(["AcmePipelineRole"])
        );
        assert_eq!(
            template.section("Parameters").unwrap()["Qualifier"]["Default"],
            "35e2023292"
        );
        assert_eq!(
            template.output(BOUNDARY_OUTPUT),
            Some(&json!(output.boundary_arn))
        );
        // Bootstrap outputs survive the include
        assert!(template.output("BucketName").is_some());
    }

    #[tokio::test]
    async fn rejects_non_role_principal_before_generating() {
        let mut request = request();
        request.pipeline_role_arn = "arn:aws:iam::123456789012:user/ci".to_string();
        let err = run_pipeline(&request, &FixtureGenerator::from_text("not: [valid"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[tokio::test]
    async fn template_without_qualifier_parameter_fails() {
        let generator = FixtureGenerator::from_text(
            r#"{"Resources": {"CloudFormationExecutionRole": {"Type": "AWS::IAM::Role"}}}"#,
        );
        let err = run_pipeline(&request(), &generator).await.unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[tokio::test]
    async fn bare_outputs_section_still_gets_boundary_output() {
        let fixture = FixtureGenerator::builtin()
            .generate(&Qualifier::from_raw("35e2023292"))
            .await
            .unwrap();
        let mut value = fixture.into_value();
        value["Outputs"] = Value::Null;
        let generator = FixtureGenerator::from_text(serde_json::to_string(&value).unwrap());

        let output = run_pipeline(&request(), &generator).await.unwrap();
        assert_eq!(
            output.template.output(BOUNDARY_OUTPUT),
            Some(&json!(output.boundary_arn))
        );
    }

    #[tokio::test]
    async fn non_mapping_outputs_section_fails() {
        let fixture = FixtureGenerator::builtin()
            .generate(&Qualifier::from_raw("35e2023292"))
            .await
            .unwrap();
        let mut value = fixture.into_value();
        value["Outputs"] = json!("none");
        let generator = FixtureGenerator::from_text(serde_json::to_string(&value).unwrap());

        let err = run_pipeline(&request(), &generator).await.unwrap_err();
        assert_eq!(err.resource(), Some("Outputs"));
    }

    #[tokio::test]
    async fn declares_token_parameter_and_source_outputs() {
        let output = run_pipeline(&request(), &FixtureGenerator::builtin())
            .await
            .unwrap();
        let template = &output.template;

        let token = &template.section("Parameters").unwrap()[GITHUB_TOKEN_PARAMETER];
        assert_eq!(token["Type"], "String");
        assert_eq!(token["NoEcho"], true);
        assert!(token.get("Default").is_none());
        assert_eq!(
            template.output(SOURCE_REPOSITORY_OUTPUT),
            Some(&json!("acme/widgets-pipeline"))
        );
        assert_eq!(template.output(SOURCE_BRANCH_OUTPUT), Some(&json!("main")));
    }
}
