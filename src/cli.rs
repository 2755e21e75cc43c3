use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::error::BuildError;
use crate::framework::FrameworkVariant;
use crate::pipeline::DEFAULT_OUTPUT;

/// Package a bundled web application into a single SVG file
#[derive(Parser, Debug)]
#[command(name = "svgapp", version)]
#[command(about = "Package a web app into a self-contained SVG", long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Bundle an entry file and write the SVG artifact
    Build(BuildArgs),
}

#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Entry file: an HTML document or a script/component module
    pub entry: PathBuf,

    /// Where to write the artifact
    #[arg(default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Framework profile (react, svelte, vue, vanilla); inferred from the
    /// entry's extension when omitted
    #[arg(short, long, value_name = "NAME")]
    pub framework: Option<String>,

    /// JSON object embedded as the artifact's initial data
    #[arg(long, value_name = "FILE")]
    pub seed_data: Option<PathBuf>,

    /// Node.js executable used to drive esbuild
    #[arg(long, env = "SVGAPP_NODE", default_value = "node")]
    pub node: PathBuf,
}

impl BuildArgs {
    /// The explicitly requested framework, if any.
    pub fn framework_variant(&self) -> Result<Option<FrameworkVariant>, BuildError> {
        self.framework.as_deref().map(str::parse).transpose()
    }
}
