use anyhow::{Context, Result};
use blog_kit_core::{BlogSection, SiteConfig, parse_site_toml};
use blog_kit_deployer::GitDeployer;
use blog_kit_generator::{BasicTheme, Favicon, Highlighter};
use blog_kit_publish::{BuildPaths, Pipeline};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Working clone used by the git deployer, relative to the site directory
const DEPLOY_WORKDIR: &str = ".blog-kit/deploy";

/// Build the site at `path` and optionally deploy it
pub async fn run(path: PathBuf, output: Option<PathBuf>, deploy: bool) -> Result<()> {
    println!("🔨 Publishing site...");

    if !path.is_dir() {
        anyhow::bail!("Site directory does not exist: {}", path.display());
    }

    let config_path = path.join("site.toml");
    if !config_path.exists() {
        anyhow::bail!("site.toml not found in {}", path.display());
    }
    let config: SiteConfig<BlogSection> =
        parse_site_toml(&config_path).context("Failed to parse site.toml")?;
    let config = Arc::new(config);

    let mut paths = BuildPaths::from_config(&path, &config);
    if let Some(output) = output {
        paths.output = output;
    }
    println!("   Site: {}", config.site.name);
    println!("   Source: {}", paths.content.display());
    println!("   Output: {}", paths.output.display());
    println!();

    let mut pipeline = build_pipeline(&path, config.clone(), paths, deploy)?;
    let report = pipeline.run().await?;

    println!();
    println!("✅ Publish complete!");
    println!("   Items: {}", report.items);
    println!("   Pages: {}", report.pages);
    println!("   Files: {}", report.files);
    if let Some(deployment) = report.deployment {
        if deployment.changed {
            println!("   🚀 Deployed to {}", deployment.target);
        } else {
            println!("   ✓ {} already up to date", deployment.target);
        }
    }
    Ok(())
}

fn build_pipeline(
    site_root: &Path,
    config: Arc<SiteConfig<BlogSection>>,
    paths: BuildPaths,
    deploy: bool,
) -> Result<Pipeline<BlogSection, BasicTheme>> {
    let mut pipeline = Pipeline::new(config.clone(), BasicTheme::new(), paths);

    let highlight = &config.plugins.highlight;
    if highlight.enabled {
        let highlighter =
            Highlighter::new(&highlight.theme).context("Failed to set up syntax highlighting")?;
        pipeline = pipeline.with_plugin(highlighter);
    }
    if let Some(favicon) = &config.plugins.favicon {
        pipeline = pipeline.with_plugin(Favicon::new(site_root.join(&favicon.source)));
    }

    if deploy {
        let target = config
            .deploy
            .as_ref()
            .context("--deploy needs a [deploy.github] or [deploy.git] section in site.toml")?;
        pipeline = pipeline.with_deployer(GitDeployer::from_target(
            target,
            site_root.join(DEPLOY_WORKDIR),
        ));
    }
    Ok(pipeline)
}
