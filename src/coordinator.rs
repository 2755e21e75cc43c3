//! Bundling coordination.
//!
//! Chooses the application's entry points, resolves the framework profile's
//! plugins, and runs the application bundle and the runtime bundle side by
//! side. Assembly only starts once both have succeeded.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::bundler::{BundleConfig, Bundler, CompiledOutput, EntryPoint};
use crate::decompose::{absolute_path, decompose, ExtractedHtmlDocument};
use crate::error::BuildError;
use crate::framework::{FrameworkProfile, FrameworkVariant};
use crate::runtime;

/// Name of the entry synthesized for inline-only HTML documents.
pub const INLINE_ENTRY_NAME: &str = "svgapp-inline-entry.js";

/// What to bundle, and what to carry around the bundler untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPlan {
    pub entry_points: Vec<EntryPoint>,
    pub inline_scripts: Vec<String>,
    pub inline_styles: Vec<String>,
    /// Body markup from an HTML entry; `None` for script entries.
    pub body_markup: Option<String>,
    /// No-framework HTML entry: application code waits for the DOM.
    pub html_document: bool,
    pub working_dir: PathBuf,
}

/// Result of both bundling invocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleOutputs {
    pub app: CompiledOutput,
    pub runtime: String,
}

pub fn is_html_entry(entry: &Path) -> bool {
    entry
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"))
}

/// Decide entry points for `entry`.
///
/// A no-framework HTML entry is decomposed and its external scripts and
/// stylesheets become the entry points. If it references none, a single
/// in-memory entry is synthesized that injects the body markup into `#root`.
/// Every other entry is bundled as-is.
///
/// Relative entries resolve against the process working directory, so the
/// plan only ever carries absolute paths.
pub fn plan_entries(entry: &Path, variant: FrameworkVariant) -> Result<EntryPlan, BuildError> {
    let entry = &absolute_path(entry).map_err(|source| BuildError::ReadEntry {
        path: entry.to_path_buf(),
        source,
    })?;
    let working_dir = entry
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"));

    if !(is_html_entry(entry) && variant == FrameworkVariant::Vanilla) {
        return Ok(EntryPlan {
            entry_points: vec![EntryPoint::file(entry)],
            inline_scripts: Vec::new(),
            inline_styles: Vec::new(),
            body_markup: None,
            html_document: false,
            working_dir,
        });
    }

    let doc = decompose(entry).map_err(|source| BuildError::ReadEntry {
        path: entry.to_path_buf(),
        source,
    })?;
    Ok(plan_from_document(doc, working_dir))
}

fn plan_from_document(doc: ExtractedHtmlDocument, working_dir: PathBuf) -> EntryPlan {
    let mut entry_points: Vec<EntryPoint> =
        doc.entry_points().into_iter().map(EntryPoint::file).collect();

    if entry_points.is_empty() {
        debug!(target: "coordinator", "no external references, synthesizing inline entry");
        entry_points.push(EntryPoint::Virtual {
            name: INLINE_ENTRY_NAME.to_string(),
            contents: body_injection_script(&doc.body_markup),
            resolve_dir: working_dir.clone(),
        });
    }

    EntryPlan {
        entry_points,
        inline_scripts: doc.inline_scripts,
        inline_styles: doc.inline_styles,
        body_markup: Some(doc.body_markup),
        html_document: true,
        working_dir,
    }
}

/// Fills `#root` with the trimmed body markup at load time.
fn body_injection_script(body_markup: &str) -> String {
    let markup = serde_json::to_string(body_markup.trim()).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        "(function () {{\n  var root = document.getElementById('root');\n  if (root) {{\n    root.innerHTML = {};\n  }}\n}})();\n",
        markup
    )
}

/// Run the application and runtime bundles concurrently and merge the
/// inline fragments into the application output.
///
/// A failing plugin loader degrades to an empty plugin set. A failing
/// bundler invocation fails the whole build.
pub fn bundle(
    plan: &EntryPlan,
    profile: &FrameworkProfile,
    app_bundler: &dyn Bundler,
    runtime_bundler: &dyn Bundler,
) -> Result<BundleOutputs, BuildError> {
    let plugins = match profile.load_plugins(&plan.working_dir) {
        Ok(plugins) => plugins,
        Err(e) => {
            warn!(
                target: "coordinator",
                framework = %profile.variant,
                "{}; continuing without framework plugins",
                e
            );
            Vec::new()
        }
    };

    let app_config = BundleConfig::for_application(
        profile,
        plan.entry_points.clone(),
        plugins,
        &plan.working_dir,
    );

    info!(
        target: "coordinator",
        framework = %profile.variant,
        entries = app_config.entry_points.len(),
        "bundling application and runtime"
    );

    let (app, runtime) = rayon::join(
        || app_bundler.bundle(&app_config),
        || runtime::compile(runtime_bundler),
    );
    let app_outputs = app?;
    let runtime = runtime?;

    let mut app = CompiledOutput::from_outputs(&app_outputs);
    if !plan.inline_scripts.is_empty() {
        app.js = format!("{}\n{}", plan.inline_scripts.join("\n"), app.js);
    }
    if !plan.inline_styles.is_empty() {
        app.css = format!("{}\n{}", plan.inline_styles.join("\n"), app.css);
    }

    Ok(BundleOutputs { app, runtime })
}
