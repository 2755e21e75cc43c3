//! esbuild as the application bundler.
//!
//! The bundler runs in a Node.js process. A small driver script reads the
//! request from stdin, loads esbuild and any framework plugins from the
//! project's `node_modules`, and writes the in-memory output files back as
//! JSON on stdout.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, warn};

use crate::bundler::{BundleConfig, Bundler, EntryPoint, OutputFile, OutputFormat};
use crate::error::BundleError;
use crate::framework::{Loader, PluginSpec};

const DRIVER_JS: &str = include_str!("esbuild_driver.js");

/// Virtual output names; nothing is written to disk.
const VIRTUAL_OUTFILE: &str = "bundle.js";
const VIRTUAL_OUTDIR: &str = "dist-temp";

#[derive(Debug, Clone)]
pub struct EsbuildBundler {
    node: PathBuf,
}

impl EsbuildBundler {
    pub fn new(node: impl Into<PathBuf>) -> Self {
        Self { node: node.into() }
    }
}

impl Default for EsbuildBundler {
    fn default() -> Self {
        Self::new("node")
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DRIVER PROTOCOL
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
struct DriverRequest<'a> {
    options: EsbuildOptions<'a>,
    plugins: &'a [PluginSpec],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EsbuildOptions<'a> {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    entry_points: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stdin: Option<StdinOptions<'a>>,
    bundle: bool,
    write: bool,
    format: OutputFormat,
    platform: &'a str,
    target: &'a str,
    minify: bool,
    tree_shaking: bool,
    sourcemap: bool,
    keep_names: bool,
    legal_comments: &'a str,
    loader: &'a BTreeMap<String, Loader>,
    main_fields: &'a [String],
    define: &'a BTreeMap<String, String>,
    alias: &'a BTreeMap<String, String>,
    abs_working_dir: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    outfile: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    outdir: Option<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StdinOptions<'a> {
    contents: &'a str,
    resolve_dir: String,
    sourcefile: &'a str,
    loader: Loader,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriverResponse {
    ok: bool,
    #[serde(default)]
    output_files: Vec<OutputFile>,
    error: Option<DriverError>,
}

#[derive(Debug, Deserialize)]
struct DriverError {
    message: String,
    stack: Option<String>,
}

fn build_options(config: &BundleConfig) -> Result<EsbuildOptions<'_>, BundleError> {
    let mut entry_points = Vec::new();
    let mut stdin = None;

    for entry in &config.entry_points {
        match entry {
            EntryPoint::File { path } => entry_points.push(path.to_string_lossy().to_string()),
            EntryPoint::Virtual {
                name,
                contents,
                resolve_dir,
            } => {
                if stdin.is_some() {
                    return Err(BundleError::Config(
                        "esbuild accepts at most one in-memory entry point".to_string(),
                    ));
                }
                stdin = Some(StdinOptions {
                    contents,
                    resolve_dir: resolve_dir.to_string_lossy().to_string(),
                    sourcefile: name,
                    loader: Loader::Js,
                });
            }
        }
    }

    if stdin.is_some() && !entry_points.is_empty() {
        return Err(BundleError::Config(
            "in-memory entry point cannot be combined with file entry points".to_string(),
        ));
    }
    if stdin.is_none() && entry_points.is_empty() {
        return Err(BundleError::Config("no entry points".to_string()));
    }

    let multiple = entry_points.len() > 1;

    Ok(EsbuildOptions {
        entry_points,
        stdin,
        bundle: true,
        write: false,
        format: config.format,
        platform: &config.platform,
        target: &config.target,
        minify: config.minify,
        tree_shaking: config.tree_shaking,
        sourcemap: config.sourcemap,
        keep_names: false,
        legal_comments: &config.legal_comments,
        loader: &config.loader,
        main_fields: &config.main_fields,
        define: &config.define,
        alias: &config.alias,
        abs_working_dir: config.working_dir.to_string_lossy().to_string(),
        outfile: (!multiple).then_some(VIRTUAL_OUTFILE),
        outdir: multiple.then_some(VIRTUAL_OUTDIR),
    })
}

fn parse_response(stdout: &[u8], stderr: &str) -> Result<Vec<OutputFile>, BundleError> {
    let response: DriverResponse = serde_json::from_slice(stdout).map_err(|e| {
        let detail = stderr.trim();
        if detail.is_empty() {
            BundleError::Protocol(e.to_string())
        } else {
            BundleError::Protocol(format!("{} ({})", e, detail))
        }
    })?;

    if response.ok {
        return Ok(response.output_files);
    }

    let error = response.error.unwrap_or(DriverError {
        message: "bundler reported failure without a message".to_string(),
        stack: None,
    });
    Err(BundleError::Failed {
        message: error.message,
        stack: error.stack,
    })
}

impl Bundler for EsbuildBundler {
    fn bundle(&self, config: &BundleConfig) -> Result<Vec<OutputFile>, BundleError> {
        let request = DriverRequest {
            options: build_options(config)?,
            plugins: &config.plugins,
        };
        let payload =
            serde_json::to_vec(&request).map_err(|e| BundleError::Protocol(e.to_string()))?;

        debug!(
            target: "bundler",
            node = %self.node.display(),
            entries = config.entry_points.len(),
            plugins = config.plugins.len(),
            "invoking esbuild"
        );

        let mut child = Command::new(&self.node)
            .arg("-e")
            .arg(DRIVER_JS)
            .current_dir(existing_dir(&config.working_dir))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| BundleError::Spawn {
                program: self.node.display().to_string(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A write failure means the driver already exited; its output says why.
            if let Err(e) = stdin.write_all(&payload) {
                debug!(target: "bundler", "driver stdin closed early: {}", e);
            }
        }

        let output = child.wait_with_output().map_err(|source| BundleError::Spawn {
            program: self.node.display().to_string(),
            source,
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
            warn!(target: "bundler", "{}", line);
        }

        parse_response(&output.stdout, &stderr)
    }
}

fn existing_dir(dir: &Path) -> &Path {
    if dir.is_dir() {
        dir
    } else {
        Path::new(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::FrameworkVariant;

    fn config_with(entries: Vec<EntryPoint>) -> BundleConfig {
        BundleConfig::for_application(
            FrameworkVariant::Vanilla.profile(),
            entries,
            vec![],
            Path::new("/app"),
        )
    }

    #[test]
    fn test_single_entry_uses_outfile() {
        let config = config_with(vec![EntryPoint::file("/app/index.js")]);
        let options = serde_json::to_value(build_options(&config).unwrap()).unwrap();
        assert_eq!(options["entryPoints"][0], "/app/index.js");
        assert_eq!(options["outfile"], "bundle.js");
        assert!(options.get("outdir").is_none());
        assert_eq!(options["write"], false);
        assert_eq!(options["format"], "iife");
        assert_eq!(options["treeShaking"], true);
        assert_eq!(options["loader"][".png"], "dataurl");
    }

    #[test]
    fn test_multiple_entries_use_outdir() {
        let config = config_with(vec![
            EntryPoint::file("/app/a.js"),
            EntryPoint::file("/app/a.css"),
        ]);
        let options = serde_json::to_value(build_options(&config).unwrap()).unwrap();
        assert_eq!(options["outdir"], "dist-temp");
        assert!(options.get("outfile").is_none());
    }

    #[test]
    fn test_virtual_entry_goes_through_stdin() {
        let config = config_with(vec![EntryPoint::Virtual {
            name: "inline.js".to_string(),
            contents: "go()".to_string(),
            resolve_dir: PathBuf::from("/app"),
        }]);
        let options = serde_json::to_value(build_options(&config).unwrap()).unwrap();
        assert!(options.get("entryPoints").is_none());
        assert_eq!(options["stdin"]["contents"], "go()");
        assert_eq!(options["stdin"]["resolveDir"], "/app");
        assert_eq!(options["stdin"]["loader"], "js");
    }

    #[test]
    fn test_mixed_entries_rejected() {
        let config = config_with(vec![
            EntryPoint::file("/app/a.js"),
            EntryPoint::Virtual {
                name: "inline.js".to_string(),
                contents: String::new(),
                resolve_dir: PathBuf::from("/app"),
            },
        ]);
        assert!(matches!(
            build_options(&config),
            Err(BundleError::Config(_))
        ));
    }

    #[test]
    fn test_parse_success_response() {
        let stdout = br#"{"ok":true,"outputFiles":[{"path":"/app/bundle.js","text":"x()"}]}"#;
        let files = parse_response(stdout, "").unwrap();
        assert_eq!(files, vec![OutputFile::new("/app/bundle.js", "x()")]);
    }

    #[test]
    fn test_parse_failure_keeps_message_and_stack() {
        let stdout =
            br#"{"ok":false,"error":{"message":"Could not resolve \"nope\"","stack":"Error: at build"}}"#;
        let err = parse_response(stdout, "").unwrap_err();
        assert_eq!(err.stack(), Some("Error: at build"));
        assert!(err.to_string().contains("Could not resolve"));
    }

    #[test]
    fn test_parse_garbage_is_protocol_error() {
        let err = parse_response(b"", "node: not found").unwrap_err();
        match err {
            BundleError::Protocol(msg) => assert!(msg.contains("node: not found")),
            other => panic!("expected protocol error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_node_binary_is_spawn_error() {
        let bundler = EsbuildBundler::new("/nonexistent/bin/node-for-svgapp-tests");
        let config = config_with(vec![EntryPoint::file("/app/index.js")]);
        assert!(matches!(
            bundler.bundle(&config),
            Err(BundleError::Spawn { .. })
        ));
    }
}
