//! Framework profiles.
//!
//! Each supported authoring style maps to a fixed bundler profile: which
//! loader handles which extension, which compiler plugins the bundler needs,
//! and how package entry fields are resolved. Profiles are registered once and
//! only ever looked up.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{BuildError, PluginLoadError};

// ═══════════════════════════════════════════════════════════════════════════════
// VARIANTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameworkVariant {
    /// Component-tree UI (JSX).
    React,
    /// Compiled-template UI.
    Svelte,
    /// Reactive-template UI.
    Vue,
    /// No framework.
    Vanilla,
}

impl FrameworkVariant {
    pub const ALL: [FrameworkVariant; 4] = [Self::React, Self::Svelte, Self::Vue, Self::Vanilla];

    pub fn name(self) -> &'static str {
        match self {
            Self::React => "react",
            Self::Svelte => "svelte",
            Self::Vue => "vue",
            Self::Vanilla => "vanilla",
        }
    }

    pub fn profile(self) -> &'static FrameworkProfile {
        match self {
            Self::React => &REACT_PROFILE,
            Self::Svelte => &SVELTE_PROFILE,
            Self::Vue => &VUE_PROFILE,
            Self::Vanilla => &VANILLA_PROFILE,
        }
    }
}

impl fmt::Display for FrameworkVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FrameworkVariant {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| BuildError::UnknownFramework(s.to_string()))
    }
}

/// Infer the framework from the entry file's extension.
/// Plain `.js`/`.ts` entries fall back to vanilla; callers override explicitly.
pub fn detect_framework(entry: &Path) -> FrameworkVariant {
    let ext = entry
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "svelte" => FrameworkVariant::Svelte,
        "vue" => FrameworkVariant::Vue,
        "tsx" | "jsx" => FrameworkVariant::React,
        _ => FrameworkVariant::Vanilla,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROFILES
// ═══════════════════════════════════════════════════════════════════════════════

/// How the bundler treats a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Loader {
    Js,
    Jsx,
    Ts,
    Tsx,
    Css,
    Text,
    Dataurl,
}

/// Binary assets are always inlined into the artifact as data URLs.
const INLINED_ASSET_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".woff", ".woff2", ".ttf", ".eot",
];

const DEFAULT_MAIN_FIELDS: &[&str] = &["browser", "module", "main"];

/// A compiler plugin resolved for the bundler process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginSpec {
    pub name: String,
    /// Module specifier handed to the bundler's `require`.
    pub module: String,
    #[serde(default)]
    pub options: serde_json::Value,
}

pub type PluginLoader = fn(&Path) -> Result<Vec<PluginSpec>, PluginLoadError>;

#[derive(Debug, Clone)]
pub struct FrameworkProfile {
    pub variant: FrameworkVariant,
    pub loaders: BTreeMap<String, Loader>,
    pub plugin_loader: Option<PluginLoader>,
    pub main_fields: Vec<String>,
    pub alias: BTreeMap<String, String>,
}

impl FrameworkProfile {
    fn new(
        variant: FrameworkVariant,
        loaders: &[(&str, Loader)],
        plugin_loader: Option<PluginLoader>,
        main_fields: &[&str],
    ) -> Self {
        Self {
            variant,
            loaders: loaders
                .iter()
                .map(|(ext, loader)| (ext.to_string(), *loader))
                .collect(),
            plugin_loader,
            main_fields: main_fields.iter().map(|f| f.to_string()).collect(),
            alias: BTreeMap::new(),
        }
    }

    /// Framework loaders merged with the asset-inlining loaders every build uses.
    pub fn bundler_loaders(&self) -> BTreeMap<String, Loader> {
        let mut loaders = self.loaders.clone();
        for ext in INLINED_ASSET_EXTENSIONS {
            loaders.insert(ext.to_string(), Loader::Dataurl);
        }
        loaders.insert(".css".to_string(), Loader::Css);
        loaders
    }

    /// Resolve the profile's compiler plugins, searching upward from `project_dir`.
    pub fn load_plugins(&self, project_dir: &Path) -> Result<Vec<PluginSpec>, PluginLoadError> {
        match self.plugin_loader {
            Some(load) => load(project_dir),
            None => Ok(Vec::new()),
        }
    }
}

lazy_static! {
    static ref REACT_PROFILE: FrameworkProfile = FrameworkProfile::new(
        FrameworkVariant::React,
        &[
            (".js", Loader::Jsx),
            (".ts", Loader::Tsx),
            (".tsx", Loader::Tsx),
            (".jsx", Loader::Jsx),
        ],
        None,
        DEFAULT_MAIN_FIELDS,
    );
    static ref SVELTE_PROFILE: FrameworkProfile = FrameworkProfile::new(
        FrameworkVariant::Svelte,
        &[(".js", Loader::Js), (".ts", Loader::Ts)],
        Some(load_svelte_plugins),
        &["svelte", "browser", "module", "main"],
    );
    static ref VUE_PROFILE: FrameworkProfile = FrameworkProfile::new(
        FrameworkVariant::Vue,
        &[(".js", Loader::Js), (".ts", Loader::Ts)],
        Some(load_vue_plugins),
        DEFAULT_MAIN_FIELDS,
    );
    static ref VANILLA_PROFILE: FrameworkProfile = FrameworkProfile::new(
        FrameworkVariant::Vanilla,
        &[
            (".js", Loader::Js),
            (".ts", Loader::Ts),
            (".html", Loader::Text),
            (".css", Loader::Css),
        ],
        None,
        DEFAULT_MAIN_FIELDS,
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// PLUGIN LOADERS
// ═══════════════════════════════════════════════════════════════════════════════

fn load_svelte_plugins(project_dir: &Path) -> Result<Vec<PluginSpec>, PluginLoadError> {
    let module = require_package(project_dir, "esbuild-svelte")?;
    Ok(vec![PluginSpec {
        name: "esbuild-svelte".to_string(),
        module,
        options: json!({ "compilerOptions": { "css": "injected" } }),
    }])
}

fn load_vue_plugins(project_dir: &Path) -> Result<Vec<PluginSpec>, PluginLoadError> {
    let module = require_package(project_dir, "esbuild-vue")?;
    Ok(vec![PluginSpec {
        name: "esbuild-vue".to_string(),
        module,
        options: serde_json::Value::Null,
    }])
}

fn require_package(project_dir: &Path, package: &str) -> Result<String, PluginLoadError> {
    find_node_package(project_dir, package)
        .map(|dir| dir.to_string_lossy().to_string())
        .ok_or_else(|| PluginLoadError::NotInstalled {
            package: package.to_string(),
            searched_from: project_dir.to_path_buf(),
        })
}

/// Node-style package lookup: `node_modules/<package>` in `start` or any ancestor.
pub fn find_node_package(start: &Path, package: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join("node_modules").join(package))
        .find(|candidate| candidate.join("package.json").is_file())
}
