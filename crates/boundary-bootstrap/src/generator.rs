//! Bootstrap template generation
//!
//! The provisioning toolkit is an external collaborator: [`TemplateGenerator`]
//! hides whether the template comes from a real `cdk bootstrap` subprocess or
//! from a fixture held in memory.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, info, warn};

use boundary_common::naming::toolkit_stack_name;
use boundary_common::{AccountEnv, Error, Qualifier, Result};

use crate::template::TemplateDocument;

/// Managed policy the toolkit attaches to the CloudFormation execution role
pub const EXECUTION_POLICY_ARN: &str = "arn:aws:iam::aws:policy/AdministratorAccess";

/// Template parameter carrying the qualifier
pub const QUALIFIER_PARAMETER: &str = "Qualifier";

/// Prefix of the scratch file holding the toolkit's output
const ARTIFACT_PREFIX: &str = "cdk-bootstrap-";

/// Bootstrap template as printed by `cdk bootstrap --show-template`
const BUILTIN_TEMPLATE: &str = include_str!("../fixtures/bootstrap-template.yaml");

/// Produces the baseline bootstrap template for a qualifier
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TemplateGenerator: Send + Sync {
    /// Generate the template. No retries: a failure aborts the run.
    async fn generate(&self, qualifier: &Qualifier) -> Result<TemplateDocument>;
}

/// Generate the bootstrap template for `qualifier` and default its
/// `Qualifier` parameter to it, as when the template is included into a
/// stack with that parameter passed.
///
/// # Errors
/// Propagates generation failures; returns a shape mismatch if the template
/// declares no `Qualifier` parameter.
pub async fn scoped_bootstrap_template<G: TemplateGenerator + ?Sized>(
    generator: &G,
    qualifier: &Qualifier,
) -> Result<TemplateDocument> {
    let mut doc = generator.generate(qualifier).await?;
    doc.set_parameter_default(QUALIFIER_PARAMETER, Value::from(qualifier.as_str()))?;
    debug!(
        qualifier = %qualifier,
        resources = doc.resource_count(),
        "bootstrap template scoped"
    );
    Ok(doc)
}

/// Generator that shells out to the CDK toolkit.
///
/// `--show-template` makes the toolkit print the template instead of
/// deploying it. The child is killed if the generating future is dropped,
/// so an outer timeout or Ctrl-C never leaves a stray toolkit process.
#[derive(Clone, Debug)]
pub struct CdkBootstrapGenerator {
    program: String,
    leading_args: Vec<String>,
    env: AccountEnv,
    scratch_dir: Option<PathBuf>,
}

impl CdkBootstrapGenerator {
    /// Create a generator running `command` against `env`.
    ///
    /// `command` may carry leading arguments (e.g. `"npx cdk"`).
    ///
    /// # Errors
    /// Returns a configuration error if `command` is blank.
    pub fn new(command: &str, env: AccountEnv) -> Result<Self> {
        let mut words = command.split_whitespace().map(str::to_string);
        let program = words
            .next()
            .ok_or_else(|| Error::configuration_for_field("CDK_BIN", "toolkit command is empty"))?;
        Ok(Self {
            program,
            leading_args: words.collect(),
            env,
            scratch_dir: None,
        })
    }

    /// Keep the captured toolkit output under `dir` instead of the system
    /// temp directory
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Arguments passed to the toolkit for `qualifier`
    pub fn command_args(&self, qualifier: &Qualifier) -> Vec<String> {
        let mut args = self.leading_args.clone();
        args.extend([
            "bootstrap".to_string(),
            "--qualifier".to_string(),
            qualifier.to_string(),
            format!("aws://{}/{}", self.env.account, self.env.region),
            "--require-approval".to_string(),
            "never".to_string(),
            format!("--toolkit-stack-name={}", toolkit_stack_name(qualifier)),
            format!("--cloudformation-execution-policies={}", EXECUTION_POLICY_ARN),
            "--show-template".to_string(),
        ]);
        args
    }

    fn command(&self, qualifier: &Qualifier) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.command_args(qualifier))
            .env("CDK_NEW_BOOTSTRAP", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl TemplateGenerator for CdkBootstrapGenerator {
    async fn generate(&self, qualifier: &Qualifier) -> Result<TemplateDocument> {
        info!(
            qualifier = %qualifier,
            account = %self.env.account,
            region = %self.env.region,
            program = %self.program,
            "generating bootstrap template"
        );

        let output = self.command(qualifier).output().await.map_err(|e| {
            warn!(program = %self.program, error = %e, "toolkit spawn failed");
            Error::generation(
                qualifier.as_str(),
                format!("failed to execute {}: {}", self.program, e),
            )
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(qualifier = %qualifier, status = %output.status, "toolkit failed");
            return Err(Error::generation(
                qualifier.as_str(),
                format!("{} exited with {}: {}", self.program, output.status, stderr.trim()),
            ));
        }

        // Dropping the handle removes the file on every path out of here.
        let artifact = write_artifact(self.scratch_dir.as_deref(), &output.stdout).await?;
        debug!(path = %artifact.path().display(), bytes = output.stdout.len(), "captured toolkit output");
        read_template(artifact.path(), qualifier).await
    }
}

async fn write_artifact(dir: Option<&Path>, contents: &[u8]) -> Result<tempfile::NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(ARTIFACT_PREFIX).suffix(".template");
    let file = match dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
    .map_err(|e| Error::io("create bootstrap template file", e))?;

    tokio::fs::write(file.path(), contents)
        .await
        .map_err(|e| Error::io(format!("write {}", file.path().display()), e))?;
    Ok(file)
}

async fn read_template(path: &Path, qualifier: &Qualifier) -> Result<TemplateDocument> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::io(format!("read {}", path.display()), e))?;
    TemplateDocument::parse(&text).map_err(|e| {
        Error::generation(
            qualifier.as_str(),
            format!("toolkit output is not a template: {}", e),
        )
    })
}

/// Generator serving a fixed template.
///
/// Used for offline synthesis and tests. The qualifier does not change the
/// text; callers set the `Qualifier` parameter default themselves.
#[derive(Clone, Debug)]
pub struct FixtureGenerator {
    text: String,
}

impl FixtureGenerator {
    /// The bundled CDK bootstrap template
    pub fn builtin() -> Self {
        Self::from_text(BUILTIN_TEMPLATE)
    }

    /// Serve the given JSON or YAML text
    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Serve a template read from `path`
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("read {}", path.display()), e))?;
        Ok(Self { text })
    }
}

impl Default for FixtureGenerator {
    fn default() -> Self {
        Self::builtin()
    }
}

#[async_trait]
impl TemplateGenerator for FixtureGenerator {
    async fn generate(&self, qualifier: &Qualifier) -> Result<TemplateDocument> {
        debug!(qualifier = %qualifier, "serving fixture bootstrap template");
        TemplateDocument::parse(&self.text).map_err(|e| {
            Error::generation(
                qualifier.as_str(),
                format!("fixture is not a template: {}", e),
            )
        })
    }
}
