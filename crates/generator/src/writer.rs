//! Writes an [`OutputTree`] to disk.
//!
//! Everything is staged in a temporary directory beside the output and then
//! swapped in with renames, so the output directory is either the complete
//! new site or exactly what was there before.

use crate::site::OutputTree;
use blog_kit_core::WriteError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::{Builder, TempDir};
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteReport {
    /// Files produced by rendering
    pub files: usize,
    /// Files copied from the resources directory
    pub resources: usize,
}

pub struct OutputWriter {
    output: PathBuf,
    resources: Option<PathBuf>,
}

impl OutputWriter {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            resources: None,
        }
    }

    /// Copy this directory verbatim into the output; missing is fine
    pub fn with_resources(mut self, resources: impl Into<PathBuf>) -> Self {
        self.resources = Some(resources.into());
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn write(&self, tree: &OutputTree) -> Result<WriteReport, WriteError> {
        let parent = match self.output.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|e| WriteError::new(&parent, e))?;

        let staging = temp_dir(&parent, ".blog-kit-staging")?;
        let site = staging.path().join("site");
        fs::create_dir(&site).map_err(|e| WriteError::new(&site, e))?;

        let resources = match &self.resources {
            Some(dir) if dir.is_dir() => copy_resources(dir, &site)?,
            _ => 0,
        };

        for (path, file) in tree.iter() {
            let dest = site.join(path);
            if let Some(dir) = dest.parent() {
                fs::create_dir_all(dir).map_err(|e| WriteError::new(dir, e))?;
            }
            fs::write(&dest, file.to_bytes()).map_err(|e| WriteError::new(path, e))?;
        }

        self.swap_into_place(&parent, &site)?;

        let report = WriteReport {
            files: tree.len(),
            resources,
        };
        info!(
            output = %self.output.display(),
            files = report.files,
            resources = report.resources,
            "output written"
        );
        Ok(report)
    }

    fn swap_into_place(&self, parent: &Path, staged: &Path) -> Result<(), WriteError> {
        if !self.output.exists() {
            return fs::rename(staged, &self.output).map_err(|e| WriteError::new(&self.output, e));
        }

        // The previous site is kept until the new one is in place
        let backup = temp_dir(parent, ".blog-kit-previous")?;
        let previous = backup.path().join("site");
        fs::rename(&self.output, &previous).map_err(|e| WriteError::new(&self.output, e))?;

        if let Err(e) = fs::rename(staged, &self.output) {
            if let Err(restore) = fs::rename(&previous, &self.output) {
                debug!(error = %restore, "failed to restore previous output");
            }
            return Err(WriteError::new(&self.output, e));
        }
        Ok(())
    }
}

fn temp_dir(parent: &Path, prefix: &str) -> Result<TempDir, WriteError> {
    Builder::new()
        .prefix(prefix)
        .tempdir_in(parent)
        .map_err(|e| WriteError::new(parent, e))
}

fn copy_resources(from: &Path, to: &Path) -> Result<usize, WriteError> {
    let mut copied = 0;
    for entry in WalkDir::new(from).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(from).to_path_buf();
            WriteError::new(path, io::Error::from(e))
        })?;
        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        if relative.as_os_str().is_empty() {
            continue;
        }
        let dest = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).map_err(|e| WriteError::new(&dest, e))?;
        } else {
            fs::copy(entry.path(), &dest).map_err(|e| WriteError::new(entry.path(), e))?;
            copied += 1;
        }
    }
    Ok(copied)
}
