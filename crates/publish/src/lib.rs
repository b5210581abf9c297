//! The publish pipeline: load, transform, render, write and deploy a site.

mod error;
mod pipeline;
mod stage;

pub use error::{PublishError, PublishErrorKind};
pub use pipeline::{BuildPaths, Pipeline, PublishReport};
pub use stage::Stage;
