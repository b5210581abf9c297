use crate::error::{PublishError, PublishErrorKind};
use crate::stage::Stage;
use blog_kit_core::{SectionId, SiteConfig};
use blog_kit_deployer::{Deployer, DeploymentResult};
use blog_kit_generator::{
    OutputWriter, Plugin, Theme, apply_body_plugins, apply_output_plugins, render_site,
};
use blog_kit_loader::ContentLoader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// Directories one run reads from and writes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPaths {
    pub content: PathBuf,
    pub resources: PathBuf,
    pub output: PathBuf,
}

impl BuildPaths {
    /// Configured paths resolved against the site directory
    pub fn from_config<S: SectionId>(site_root: &Path, config: &SiteConfig<S>) -> Self {
        Self {
            content: site_root.join(&config.paths.content),
            resources: site_root.join(&config.paths.resources),
            output: site_root.join(&config.paths.output),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub items: usize,
    pub pages: usize,
    /// Rendered files plus copied resources
    pub files: usize,
    pub deployment: Option<DeploymentResult>,
    /// Every stage entered, in order
    pub stages: Vec<Stage>,
}

/// One publish run over a site.
///
/// Stages run strictly in sequence. The first failure moves the pipeline to
/// [`Stage::Failed`] and is returned with the stage it happened in; the
/// output directory is only replaced once everything before Writing
/// succeeded.
pub struct Pipeline<S: SectionId, T: Theme<S>> {
    config: Arc<SiteConfig<S>>,
    theme: T,
    paths: BuildPaths,
    plugins: Vec<Box<dyn Plugin>>,
    deployer: Option<Box<dyn Deployer>>,
    stage: Stage,
    history: Vec<Stage>,
}

impl<S: SectionId, T: Theme<S>> Pipeline<S, T> {
    pub fn new(config: Arc<SiteConfig<S>>, theme: T, paths: BuildPaths) -> Self {
        Self {
            config,
            theme,
            paths,
            plugins: Vec::new(),
            deployer: None,
            stage: Stage::Idle,
            history: vec![Stage::Idle],
        }
    }

    /// Plugins run in the order they are added
    pub fn with_plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    pub fn with_deployer(mut self, deployer: impl Deployer + 'static) -> Self {
        self.deployer = Some(Box::new(deployer));
        self
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn history(&self) -> &[Stage] {
        &self.history
    }

    pub fn paths(&self) -> &BuildPaths {
        &self.paths
    }

    fn advance(&mut self, next: Stage) -> Result<(), PublishError> {
        if !self.stage.can_advance_to(next) {
            return Err(PublishError::new(
                self.stage,
                PublishErrorKind::Transition {
                    from: self.stage,
                    to: next,
                },
            ));
        }
        info!(stage = %next, "stage");
        self.stage = next;
        self.history.push(next);
        Ok(())
    }

    /// Fail the run in the current stage if `result` is an error
    fn check<V, E>(&mut self, result: Result<V, E>) -> Result<V, PublishError>
    where
        E: Into<PublishErrorKind>,
    {
        result.map_err(|e| {
            let err = PublishError::new(self.stage, e);
            error!(stage = %self.stage, error = %err.kind, "publish failed");
            self.stage = Stage::Failed;
            self.history.push(Stage::Failed);
            err
        })
    }

    pub async fn run(&mut self) -> Result<PublishReport, PublishError> {
        self.advance(Stage::Loading)?;
        let loader = ContentLoader::new(&self.paths.content, self.config.metadata.clone());
        let mut content = self.check(loader.load())?;

        self.advance(Stage::Transforming)?;
        let transformed = apply_body_plugins(&self.plugins, &mut content);
        self.check(transformed)?;

        self.advance(Stage::Rendering)?;
        let rendered = render_site(&self.config, &content, &self.theme);
        let mut tree = self.check(rendered)?;
        let amended = apply_output_plugins(&self.plugins, &mut tree);
        self.check(amended)?;

        self.advance(Stage::Writing)?;
        let written = OutputWriter::new(&self.paths.output)
            .with_resources(&self.paths.resources)
            .write(&tree);
        let written = self.check(written)?;

        let deployment = match self.deployer.take() {
            Some(deployer) => {
                self.advance(Stage::Deploying)?;
                let deployed = deployer.deploy(&self.paths.output).await;
                self.deployer = Some(deployer);
                Some(self.check(deployed)?)
            }
            None => None,
        };

        self.advance(Stage::Done)?;
        Ok(PublishReport {
            items: content.item_count(),
            pages: tree.page_count(),
            files: written.files + written.resources,
            deployment,
            stages: self.history.clone(),
        })
    }
}
