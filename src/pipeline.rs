//! # Build Pipeline
//!
//! Entry validation → bundling → composition → validation → write.
//!
//! Nothing touches the output path until the artifact has been composed and
//! checked for well-formedness, so a failed build leaves any previous
//! artifact in place.

use serde_json::{Map, Value};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::bundler::Bundler;
use crate::coordinator;
use crate::error::BuildError;
use crate::framework::{detect_framework, FrameworkVariant};
use crate::native_bundler::NativeBundler;
use crate::template::{self, TemplateInput};

/// Output location used when none is given.
pub const DEFAULT_OUTPUT: &str = "dist/app.svg";

// ═══════════════════════════════════════════════════════════════════════════════
// REQUEST / REPORT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct BuildRequest {
    pub entry: PathBuf,
    pub output: PathBuf,
    pub framework: FrameworkVariant,
    /// Snapshot embedded as the artifact's initial data.
    pub seed_data: Value,
}

impl BuildRequest {
    /// Request for `entry` with the framework inferred from its extension.
    pub fn new(entry: impl Into<PathBuf>) -> Self {
        let entry = entry.into();
        let framework = detect_framework(&entry);
        Self {
            entry,
            output: PathBuf::from(DEFAULT_OUTPUT),
            framework,
            seed_data: Value::Object(Map::new()),
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_framework(mut self, framework: FrameworkVariant) -> Self {
        self.framework = framework;
        self
    }

    pub fn with_seed_data(mut self, seed_data: Value) -> Self {
        self.seed_data = seed_data;
        self
    }
}

/// Read a seed snapshot. The file must hold a single JSON object.
pub fn load_seed_data(path: &Path) -> Result<Value, BuildError> {
    let invalid = |reason: String| BuildError::InvalidSeedData {
        path: path.to_path_buf(),
        reason,
    };
    let text = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
    let value: Value = serde_json::from_str(&text).map_err(|e| invalid(e.to_string()))?;
    if !value.is_object() {
        return Err(invalid("expected a JSON object at the top level".to_string()));
    }
    Ok(value)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub output_path: PathBuf,
    pub size_bytes: u64,
}

impl BuildReport {
    pub fn size_kb(&self) -> f64 {
        self.size_bytes as f64 / 1024.0
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PIPELINE
// ═══════════════════════════════════════════════════════════════════════════════

pub struct Pipeline<'a> {
    app_bundler: &'a dyn Bundler,
    runtime_bundler: &'a dyn Bundler,
}

impl<'a> Pipeline<'a> {
    /// Application code goes through `app_bundler`; the runtime is compiled
    /// in-process.
    pub fn new(app_bundler: &'a dyn Bundler) -> Self {
        Self {
            app_bundler,
            runtime_bundler: &NativeBundler,
        }
    }

    pub fn with_runtime_bundler(mut self, runtime_bundler: &'a dyn Bundler) -> Self {
        self.runtime_bundler = runtime_bundler;
        self
    }

    /// Produce the artifact text without writing it.
    pub fn assemble(&self, request: &BuildRequest) -> Result<String, BuildError> {
        File::open(&request.entry).map_err(|source| BuildError::ReadEntry {
            path: request.entry.clone(),
            source,
        })?;

        let profile = request.framework.profile();
        let plan = coordinator::plan_entries(&request.entry, request.framework)?;
        let outputs = coordinator::bundle(&plan, profile, self.app_bundler, self.runtime_bundler)?;

        debug!(
            target: "pipeline",
            js = outputs.app.js.len(),
            css = outputs.app.css.len(),
            runtime = outputs.runtime.len(),
            "bundles ready"
        );

        let artifact = template::compose(&TemplateInput {
            js: &outputs.app.js,
            css: &outputs.app.css,
            body: plan.body_markup.as_deref(),
            runtime: &outputs.runtime,
            seed_data: &request.seed_data,
            defer_until_ready: plan.html_document,
        });

        validate_artifact(&artifact)?;
        Ok(artifact)
    }

    /// Assemble and write the artifact, creating parent directories.
    pub fn build(&self, request: &BuildRequest) -> Result<BuildReport, BuildError> {
        info!(
            target: "pipeline",
            entry = %request.entry.display(),
            framework = %request.framework,
            "building artifact"
        );

        let artifact = self.assemble(request)?;

        let write_err = |source| BuildError::WriteOutput {
            path: request.output.clone(),
            source,
        };
        if let Some(parent) = request.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(&request.output, &artifact).map_err(write_err)?;

        let report = BuildReport {
            output_path: request.output.clone(),
            size_bytes: artifact.len() as u64,
        };
        info!(
            target: "pipeline",
            output = %report.output_path.display(),
            bytes = report.size_bytes,
            "artifact written"
        );
        Ok(report)
    }
}

/// Reject artifacts a strict XML parser would refuse to load.
pub fn validate_artifact(artifact: &str) -> Result<(), BuildError> {
    roxmltree::Document::parse(artifact)
        .map(|_| ())
        .map_err(|e| BuildError::MalformedArtifact(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_defaults() {
        let req = BuildRequest::new("src/App.svelte");
        assert_eq!(req.framework, FrameworkVariant::Svelte);
        assert_eq!(req.output, PathBuf::from(DEFAULT_OUTPUT));
        assert_eq!(req.seed_data, json!({}));
    }

    #[test]
    fn test_request_overrides() {
        let req = BuildRequest::new("index.HTML")
            .with_framework(FrameworkVariant::React)
            .with_output("out/x.svg")
            .with_seed_data(json!({"a": 1}));
        assert_eq!(req.framework, FrameworkVariant::React);
        assert_eq!(req.output, PathBuf::from("out/x.svg"));
        assert_eq!(req.seed_data["a"], 1);
    }

    #[test]
    fn test_seed_data_must_be_object() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("seed.json");
        fs::write(&good, r#"{"todos": []}"#).unwrap();
        assert_eq!(load_seed_data(&good).unwrap(), json!({"todos": []}));

        let array = dir.path().join("array.json");
        fs::write(&array, "[1, 2]").unwrap();
        assert!(matches!(
            load_seed_data(&array),
            Err(BuildError::InvalidSeedData { .. })
        ));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{").unwrap();
        assert!(load_seed_data(&broken).is_err());

        assert!(load_seed_data(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_size_kb() {
        let report = BuildReport {
            output_path: PathBuf::from("a.svg"),
            size_bytes: 2048,
        };
        assert_eq!(format!("{:.2}", report.size_kb()), "2.00");
    }

    #[test]
    fn test_validate_rejects_html_entities() {
        assert!(validate_artifact("<svg xmlns=\"http://www.w3.org/2000/svg\"/>").is_ok());
        let err = validate_artifact("<svg><p>a&nbsp;b</p></svg>").unwrap_err();
        assert!(matches!(err, BuildError::MalformedArtifact(_)));
    }
}
