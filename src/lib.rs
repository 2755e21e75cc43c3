//! # svgapp
//!
//! Packages a bundled web application into one self-contained SVG document.
//! The artifact wraps an XHTML page in a `<foreignObject>` and inlines the
//! application's styles, its scripts, a small storage/routing runtime and a
//! JSON data snapshot. Opening the file in a browser runs the app with no
//! server and no external files.
//!
//! ## Build Flow
//!
//! 1. **Entry planning** (`coordinator`): script and component entries are
//!    bundled directly. No-framework HTML entries are decomposed into their
//!    external scripts, stylesheets, inline fragments and body markup.
//! 2. **Bundling** (`bundler`, `esbuild`, `native_bundler`): the application
//!    bundle and the runtime bundle are produced concurrently. Both must
//!    succeed before anything else happens.
//! 3. **Composition** (`template`, `normalize`): the body markup is made
//!    XML-compliant and every text payload is wrapped so the surrounding
//!    document stays well-formed.
//! 4. **Validation and write** (`pipeline`): the artifact is parsed as XML and
//!    only then written, with parent directories created as needed.
//!
//! ## Invariants
//!
//! - No artifact is written when any bundling step fails.
//! - The runtime script precedes all application scripts.
//! - Application code never contains a literal `</script` in the output.
//! - The runtime is framework-independent; only the application bundle uses
//!   the framework profile.

pub mod bundler;
pub mod cli;
pub mod coordinator;
pub mod decompose;
pub mod error;
pub mod esbuild;
pub mod framework;
pub mod logging;
pub mod native_bundler;
pub mod normalize;
pub mod pipeline;
pub mod runtime;
pub mod template;


pub use bundler::{BundleConfig, Bundler, CompiledOutput, EntryPoint, OutputFile};
pub use decompose::{decompose, ExtractedHtmlDocument};
pub use error::{BuildError, BundleError, PluginLoadError};
pub use esbuild::EsbuildBundler;
pub use framework::{detect_framework, FrameworkProfile, FrameworkVariant};
pub use native_bundler::NativeBundler;
pub use normalize::make_xml_compliant;
pub use pipeline::{load_seed_data, BuildReport, BuildRequest, Pipeline};
