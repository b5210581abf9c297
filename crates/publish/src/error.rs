use crate::stage::Stage;
use blog_kit_core::{DeployError, LoadError, PluginError, RenderError, WriteError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PublishErrorKind {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Plugin(#[from] PluginError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error(transparent)]
    Deploy(#[from] DeployError),
    #[error("cannot move from {from} to {to}")]
    Transition { from: Stage, to: Stage },
}

/// A failed publish run, naming the stage it failed in
#[derive(Error, Debug)]
#[error("{stage} failed: {kind}")]
pub struct PublishError {
    pub stage: Stage,
    pub kind: PublishErrorKind,
}

impl PublishError {
    pub fn new(stage: Stage, kind: impl Into<PublishErrorKind>) -> Self {
        Self {
            stage,
            kind: kind.into(),
        }
    }
}
