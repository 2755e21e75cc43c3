//! Embedded runtime.
//!
//! The runtime executes inside the viewer, not here. It is shipped in the
//! binary as source and compiled once per build with a fixed,
//! framework-independent configuration. At load time it registers
//! `window.SVGApp` with:
//!
//! - `storage.get/set/remove/clear`: one JSON object per artifact file name in
//!   `localStorage`, under `dataStore_<file name>`. Missing keys and corrupt
//!   blobs read as `undefined`.
//! - `loadData()/saveData(obj)`: whole-namespace access, where `loadData`
//!   shallow-merges the snapshot embedded in the artifact under the persisted
//!   data.
//! - `router.hash/navigate/subscribe`: hash routing, `#/` when the hash is
//!   empty; `subscribe` returns an unsubscribe function.

use std::path::Path;

use crate::bundler::{BundleConfig, Bundler, CompiledOutput, EntryPoint};
use crate::error::BundleError;

pub const RUNTIME_SOURCE: &str = include_str!("runtime/svgapp-runtime.js");

pub const RUNTIME_ENTRY_NAME: &str = "svgapp-runtime.js";

/// Global the runtime registers itself under.
pub const RUNTIME_GLOBAL: &str = "SVGApp";

pub fn bundle_config() -> BundleConfig {
    BundleConfig::base(
        vec![EntryPoint::Virtual {
            name: RUNTIME_ENTRY_NAME.to_string(),
            contents: RUNTIME_SOURCE.to_string(),
            resolve_dir: Path::new(".").to_path_buf(),
        }],
        Path::new("."),
    )
}

/// Compile the runtime with `bundler`, returning its script text.
pub fn compile(bundler: &dyn Bundler) -> Result<String, BundleError> {
    let outputs = bundler.bundle(&bundle_config())?;
    Ok(CompiledOutput::from_outputs(&outputs).js)
}
