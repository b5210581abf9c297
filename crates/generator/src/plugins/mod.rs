//! Transform plugins.
//!
//! A [`Plugin`] can rewrite markdown bodies before rendering and amend the
//! rendered [`OutputTree`] afterwards. Plugins run in registration order; the
//! first failure aborts the build.

mod favicon;
mod highlight;

pub use favicon::Favicon;
pub use highlight::Highlighter;

use crate::site::OutputTree;
use blog_kit_core::{Content, Intro, PluginError, SectionId};
use rayon::prelude::*;
use std::path::Path;
use tracing::debug;

const OUTPUT_TARGET: &str = "output tree";

pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Rewrite the markdown body of one item or intro
    fn transform_body(&self, _path: &Path, body: String) -> anyhow::Result<String> {
        Ok(body)
    }

    /// Amend the rendered site
    fn transform_output(&self, _tree: &mut OutputTree) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Run every plugin's body hook over all intros and items.
///
/// Bodies are processed in parallel. A body is only replaced once the whole
/// plugin chain succeeded on it; the reported error is the first in content
/// order.
pub fn apply_body_plugins<S: SectionId>(
    plugins: &[Box<dyn Plugin>],
    content: &mut Content<S>,
) -> Result<(), PluginError> {
    if plugins.is_empty() {
        return Ok(());
    }

    let mut bodies: Vec<(&Path, &mut String)> = Vec::new();
    if let Some(Intro { path, body, .. }) = content.intro.as_mut() {
        bodies.push((path.as_path(), body));
    }
    for section in content.sections.values_mut() {
        if let Some(Intro { path, body, .. }) = section.intro.as_mut() {
            bodies.push((path.as_path(), body));
        }
        for item in section.items.iter_mut() {
            bodies.push((item.path.as_path(), &mut item.body));
        }
    }

    let results: Vec<Result<(), PluginError>> = bodies
        .par_iter_mut()
        .map(|(path, body)| {
            let mut current = body.clone();
            for plugin in plugins {
                current = plugin
                    .transform_body(path, current)
                    .map_err(|e| plugin_error(plugin.as_ref(), path.display().to_string(), e))?;
            }
            **body = current;
            debug!(path = %path.display(), "transformed body");
            Ok(())
        })
        .collect();

    results.into_iter().collect()
}

pub fn apply_output_plugins(
    plugins: &[Box<dyn Plugin>],
    tree: &mut OutputTree,
) -> Result<(), PluginError> {
    for plugin in plugins {
        plugin
            .transform_output(tree)
            .map_err(|e| plugin_error(plugin.as_ref(), OUTPUT_TARGET.to_string(), e))?;
        debug!(plugin = plugin.name(), "transformed output");
    }
    Ok(())
}

fn plugin_error(plugin: &dyn Plugin, target: String, error: anyhow::Error) -> PluginError {
    PluginError {
        plugin: plugin.name().to_string(),
        target,
        reason: format!("{error:#}"),
    }
}
