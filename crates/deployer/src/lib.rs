//! Deployment targets for a generated site.

pub mod git;

pub use git::{GitDeployer, GitOutput, GitTransport, SystemGit};

use async_trait::async_trait;
use blog_kit_core::DeployError;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentResult {
    /// Where the site went, e.g. `git@github.com:owner/site.git (master)`
    pub target: String,
    /// False when the target already held exactly this output
    pub changed: bool,
}

#[async_trait]
pub trait Deployer: Send + Sync {
    fn name(&self) -> &str;

    /// Publish the contents of `output`
    async fn deploy(&self, output: &Path) -> Result<DeploymentResult, DeployError>;
}
