//! HTML entry decomposition.
//!
//! Splits an HTML entry document into the pieces the build consumes
//! separately: external script/stylesheet references (resolved against the
//! document's own directory), inline script and style bodies, and the body
//! markup. Matching is textual and assumes the entry is valid HTML.

use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

lazy_static! {
    static ref SCRIPT_REGEX: Regex =
        Regex::new(r"(?is)<script\b([^>]*)>(.*?)</script\s*>").unwrap();
    static ref STYLE_REGEX: Regex = Regex::new(r"(?is)<style\b[^>]*>(.*?)</style\s*>").unwrap();
    static ref LINK_REGEX: Regex =
        Regex::new(r#"(?i)<link\b[^>]*?\shref\s*=\s*["']([^"']+)["'][^>]*>"#).unwrap();
    static ref SRC_ATTR_REGEX: Regex =
        Regex::new(r#"(?i)(?:^|\s)src\s*=\s*["']([^"']+)["']"#).unwrap();
    static ref BODY_REGEX: Regex = Regex::new(r"(?is)<body\b[^>]*>(.*?)</body\s*>").unwrap();
}

const STYLESHEET_EXTENSIONS: &[&str] = &[".css"];

/// Everything the build needs from an HTML entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedHtmlDocument {
    pub external_scripts: Vec<PathBuf>,
    pub external_styles: Vec<PathBuf>,
    pub inline_scripts: Vec<String>,
    pub inline_styles: Vec<String>,
    pub body_markup: String,
}

impl ExtractedHtmlDocument {
    /// External references in bundler entry order: scripts, then stylesheets.
    pub fn entry_points(&self) -> Vec<PathBuf> {
        self.external_scripts
            .iter()
            .chain(self.external_styles.iter())
            .cloned()
            .collect()
    }
}

/// Read and decompose the HTML document at `path`.
///
/// Fails only when the file cannot be read. A document without `<body>`
/// yields an empty `body_markup`.
pub fn decompose(path: &Path) -> io::Result<ExtractedHtmlDocument> {
    let source = fs::read_to_string(path)?;
    let base_dir = absolute_dir_of(path)?;
    Ok(decompose_source(&source, &base_dir))
}

/// Decompose HTML text whose relative references resolve against `base_dir`.
pub fn decompose_source(source: &str, base_dir: &Path) -> ExtractedHtmlDocument {
    let mut doc = ExtractedHtmlDocument::default();

    for cap in SCRIPT_REGEX.captures_iter(source) {
        let attrs = cap.get(1).map_or("", |m| m.as_str());
        let content = cap.get(2).map_or("", |m| m.as_str()).trim();

        if let Some(src) = SRC_ATTR_REGEX.captures(attrs).and_then(|c| c.get(1)) {
            if let Some(resolved) = resolve_reference(base_dir, src.as_str()) {
                doc.external_scripts.push(resolved);
            }
        } else if !content.is_empty() {
            doc.inline_scripts.push(content.to_string());
        }
    }

    for cap in STYLE_REGEX.captures_iter(source) {
        let content = cap.get(1).map_or("", |m| m.as_str()).trim();
        if !content.is_empty() {
            doc.inline_styles.push(content.to_string());
        }
    }

    for cap in LINK_REGEX.captures_iter(source) {
        let href = cap.get(1).map_or("", |m| m.as_str());
        if is_stylesheet(href) {
            if let Some(resolved) = resolve_reference(base_dir, href) {
                doc.external_styles.push(resolved);
            }
        }
    }

    doc.body_markup = BODY_REGEX
        .captures(source)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    debug!(
        target: "decompose",
        scripts = doc.external_scripts.len(),
        styles = doc.external_styles.len(),
        inline_scripts = doc.inline_scripts.len(),
        inline_styles = doc.inline_styles.len(),
        "decomposed html entry"
    );

    doc
}

fn is_stylesheet(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    STYLESHEET_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Remote references cannot be bundled from disk and are left to the browser.
fn is_remote(reference: &str) -> bool {
    let lower = reference.to_ascii_lowercase();
    lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("//")
        || lower.starts_with("data:")
}

fn resolve_reference(base_dir: &Path, reference: &str) -> Option<PathBuf> {
    if is_remote(reference) {
        warn!(target: "decompose", reference, "skipping remote reference");
        return None;
    }
    Some(normalize_path(&base_dir.join(reference)))
}

fn absolute_dir_of(path: &Path) -> io::Result<PathBuf> {
    absolute_path(path.parent().unwrap_or_else(|| Path::new("")))
}

/// Resolve `path` against the process working directory when relative.
pub(crate) fn absolute_path(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(normalize_path(path))
    } else {
        Ok(normalize_path(&std::env::current_dir()?.join(path)))
    }
}

/// Lexically collapse `.` and `..` components without touching the filesystem.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
