//! Error taxonomy for the artifact build.
//!
//! Configuration and bundling failures abort the build before anything is
//! written. Plugin load failures are recovered by the coordinator and never
//! reach the caller as a `BuildError`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("unsupported framework '{0}' (expected one of: react, svelte, vue, vanilla)")]
    UnknownFramework(String),

    #[error("cannot read entry file {}: {source}", path.display())]
    ReadEntry {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid seed data in {}: {reason}", path.display())]
    InvalidSeedData { path: PathBuf, reason: String },

    #[error(transparent)]
    Bundle(#[from] BundleError),

    #[error("assembled artifact is not well-formed XML: {0}")]
    MalformedArtifact(String),

    #[error("cannot write artifact to {}: {source}", path.display())]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure reported by a bundler invocation.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("bundling failed: {message}")]
    Failed {
        message: String,
        stack: Option<String>,
    },

    #[error("cannot start bundler process '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{file}: {message}")]
    Parse { file: String, message: String },

    #[error("unexpected bundler response: {0}")]
    Protocol(String),

    #[error("invalid bundle configuration: {0}")]
    Config(String),
}

impl BundleError {
    /// Stack text captured from the bundler, when it reported one.
    pub fn stack(&self) -> Option<&str> {
        match self {
            Self::Failed { stack, .. } => stack.as_deref(),
            _ => None,
        }
    }
}

/// A framework compiler plugin could not be made available.
#[derive(Debug, Error)]
pub enum PluginLoadError {
    #[error("plugin package '{package}' is not installed near {}", searched_from.display())]
    NotInstalled {
        package: String,
        searched_from: PathBuf,
    },
}
