use std::{fmt, io, path::PathBuf};
use thiserror::Error;

/// Failures while turning one page's source into HTML.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template '{0}' not found")]
    TemplateNotFound(String),
    #[error("markdown conversion failed: {0}")]
    Markdown(String),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),
}

#[derive(Debug, Error)]
pub enum BuildError {
    /// Malformed per-page config. Callers recover by falling back to defaults.
    #[error("failed to load page config {path}: {message}")]
    ConfigLoad { path: PathBuf, message: String },
    #[error(transparent)]
    Render(#[from] RenderError),
    /// `to` cannot be expressed relative to `from`. Recovered with an absolute fallback.
    #[error("cannot express {to} relative to {from}")]
    PathResolution { from: PathBuf, to: PathBuf },
    #[error("failed to copy assets from {path}: {source}")]
    AssetCopy {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid site config {path}: {message}")]
    SiteConfig { path: PathBuf, message: String },
}

impl BuildError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Position of a page in the assembly pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Discovered,
    ContentLoaded,
    LinksRewritten,
    BodyRendered,
    ContextBuilt,
    Emitted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Discovered => "discovery",
            Stage::ContentLoaded => "content loading",
            Stage::LinksRewritten => "link rewriting",
            Stage::BodyRendered => "body rendering",
            Stage::ContextBuilt => "context building",
            Stage::Emitted => "emitting",
        };
        f.write_str(name)
    }
}

/// A single page that could not be built. Collected, never fatal to the build.
#[derive(Debug, Error)]
#[error("failed to build {path} during {stage}: {source}")]
pub struct PageError {
    pub path: PathBuf,
    pub stage: Stage,
    #[source]
    pub source: BuildError,
}

impl PageError {
    pub fn new(path: impl Into<PathBuf>, stage: Stage, source: impl Into<BuildError>) -> Self {
        PageError {
            path: path.into(),
            stage,
            source: source.into(),
        }
    }
}
