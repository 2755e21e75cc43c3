//! Bundler collaborator contract.
//!
//! The build never compiles application code itself. It hands a
//! [`BundleConfig`] to a [`Bundler`] and receives the compiled files back in
//! memory, in the order the bundler produced them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::BundleError;
use crate::framework::{FrameworkProfile, Loader, PluginSpec};

/// Something the bundler starts compiling from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EntryPoint {
    File {
        path: PathBuf,
    },
    /// Source held in memory; imports inside it resolve from `resolve_dir`.
    #[serde(rename_all = "camelCase")]
    Virtual {
        name: String,
        contents: String,
        resolve_dir: PathBuf,
    },
}

impl EntryPoint {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File { path: path.into() }
    }

    pub fn display_name(&self) -> String {
        match self {
            Self::File { path } => path.display().to_string(),
            Self::Virtual { name, .. } => name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Immediately-invoked function expression.
    Iife,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleConfig {
    pub entry_points: Vec<EntryPoint>,
    pub format: OutputFormat,
    pub platform: String,
    pub target: String,
    pub minify: bool,
    pub tree_shaking: bool,
    pub sourcemap: bool,
    pub legal_comments: String,
    pub loader: BTreeMap<String, Loader>,
    pub main_fields: Vec<String>,
    pub define: BTreeMap<String, String>,
    pub alias: BTreeMap<String, String>,
    pub plugins: Vec<PluginSpec>,
    /// Directory the bundler resolves packages from.
    pub working_dir: PathBuf,
}

impl BundleConfig {
    /// Baseline shared by every invocation: minified, tree-shaken IIFE for the
    /// browser, no source maps, no legal comments.
    pub fn base(entry_points: Vec<EntryPoint>, working_dir: &Path) -> Self {
        let mut define = BTreeMap::new();
        define.insert(
            "process.env.NODE_ENV".to_string(),
            "\"production\"".to_string(),
        );

        Self {
            entry_points,
            format: OutputFormat::Iife,
            platform: "browser".to_string(),
            target: "es2020".to_string(),
            minify: true,
            tree_shaking: true,
            sourcemap: false,
            legal_comments: "none".to_string(),
            loader: BTreeMap::new(),
            main_fields: vec!["browser".into(), "module".into(), "main".into()],
            define,
            alias: BTreeMap::new(),
            plugins: Vec::new(),
            working_dir: working_dir.to_path_buf(),
        }
    }

    /// Application configuration: baseline plus the framework's loaders,
    /// resolution fields, aliases and plugins.
    pub fn for_application(
        profile: &FrameworkProfile,
        entry_points: Vec<EntryPoint>,
        plugins: Vec<PluginSpec>,
        working_dir: &Path,
    ) -> Self {
        Self {
            loader: profile.bundler_loaders(),
            main_fields: profile.main_fields.clone(),
            alias: profile.alias.clone(),
            plugins,
            ..Self::base(entry_points, working_dir)
        }
    }
}

/// One compiled file returned by the bundler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFile {
    pub path: String,
    pub text: String,
}

impl OutputFile {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    /// Classification is by extension only.
    pub fn is_stylesheet(&self) -> bool {
        self.path.to_ascii_lowercase().ends_with(".css")
    }
}

pub trait Bundler: Send + Sync {
    fn bundle(&self, config: &BundleConfig) -> Result<Vec<OutputFile>, BundleError>;
}

/// Script and stylesheet text accumulated from bundler output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledOutput {
    pub js: String,
    pub css: String,
}

impl CompiledOutput {
    /// Concatenate outputs in the order given; stylesheets into `css`,
    /// everything else into `js`.
    pub fn from_outputs(outputs: &[OutputFile]) -> Self {
        let mut compiled = Self::default();
        for file in outputs {
            if file.is_stylesheet() {
                compiled.css.push_str(&file.text);
            } else {
                compiled.js.push_str(&file.text);
            }
        }
        compiled
    }
}
