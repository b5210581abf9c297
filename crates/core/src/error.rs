use std::path::PathBuf;
use thiserror::Error;

/// Problems with `site.toml`
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        ConfigError::Invalid(msg.into())
    }
}

/// Why a content file could not be loaded
#[derive(Error, Debug)]
pub enum LoadErrorKind {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing metadata header (expected a '---' block at the top of the file)")]
    MissingHeader,

    #[error("malformed metadata: {0}")]
    MalformedMetadata(String),

    #[error("missing required metadata field '{0}'")]
    MissingField(String),

    #[error("invalid date '{0}', expected YYYY-MM-DD or YYYY-MM-DD HH:MM")]
    InvalidDate(String),

    #[error("section '{0}' is not declared")]
    UndeclaredSection(String),

    #[error("content must live inside a section directory")]
    OutsideSection,
}

/// A content file failed to load
#[derive(Error, Debug)]
#[error("{}: {kind}", path.display())]
pub struct LoadError {
    pub path: PathBuf,
    #[source]
    pub kind: LoadErrorKind,
}

impl LoadError {
    pub fn new(path: impl Into<PathBuf>, kind: LoadErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// A transform plugin failed on one target (an item path or the output tree)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("plugin '{plugin}' failed on {target}: {reason}")]
pub struct PluginError {
    pub plugin: String,
    pub target: String,
    pub reason: String,
}

/// The theme produced output that breaks the rendering contract
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{target}: {reason}")]
pub struct RenderError {
    pub target: String,
    pub reason: String,
}

impl RenderError {
    pub fn new(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            reason: reason.into(),
        }
    }
}

/// File-system failure while producing the output directory
#[derive(Error, Debug)]
#[error("{}: {source}", path.display())]
pub struct WriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl WriteError {
    pub fn new(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    /// Network hiccup worth one retry
    Transient,
    /// Rejected credentials or permissions
    Auth,
    Other,
}

/// Deployment transport or repository failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DeployError {
    pub kind: DeployErrorKind,
    pub message: String,
}

impl DeployError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: DeployErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self {
            kind: DeployErrorKind::Auth,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self {
            kind: DeployErrorKind::Other,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind == DeployErrorKind::Transient
    }
}
