//! In-process compiler for self-contained scripts.
//!
//! Handles entries that need no module resolution, such as the embedded
//! runtime: each script is parsed with oxc, re-emitted (minified when
//! requested) and wrapped according to the output format. Stylesheets pass
//! through untouched. Imports, TypeScript and JSX are rejected as parse
//! errors since nothing here resolves or lowers them.

use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_parser::Parser;
use oxc_span::SourceType;
use std::fs;
use tracing::debug;

use crate::bundler::{BundleConfig, Bundler, EntryPoint, OutputFile, OutputFormat};
use crate::error::BundleError;

#[derive(Debug, Clone, Copy, Default)]
pub struct NativeBundler;

impl Bundler for NativeBundler {
    fn bundle(&self, config: &BundleConfig) -> Result<Vec<OutputFile>, BundleError> {
        let mut outputs = Vec::with_capacity(config.entry_points.len());

        for entry in &config.entry_points {
            let name = entry.display_name();
            let source = match entry {
                EntryPoint::File { path } => {
                    fs::read_to_string(path).map_err(|e| BundleError::Parse {
                        file: name.clone(),
                        message: format!("cannot read source: {}", e),
                    })?
                }
                EntryPoint::Virtual { contents, .. } => contents.clone(),
            };

            let output = OutputFile::new(name.clone(), source);
            if output.is_stylesheet() {
                outputs.push(output);
                continue;
            }

            let code = compile_script(&name, &output.text, config.minify)?;
            let text = match config.format {
                OutputFormat::Iife => format!("(function(){{{}\n}})();\n", code.trim_end()),
            };
            debug!(target: "bundler", entry = %name, bytes = text.len(), "compiled natively");
            outputs.push(OutputFile::new(name, text));
        }

        Ok(outputs)
    }
}

/// Parse `source` as a classic script and print it back out.
pub fn compile_script(name: &str, source: &str, minify: bool) -> Result<String, BundleError> {
    let allocator = Allocator::default();
    let source_type = SourceType::default().with_module(false);

    let ret = Parser::new(&allocator, source, source_type).parse();
    if ret.panicked || !ret.errors.is_empty() {
        let message = if ret.errors.is_empty() {
            "parser aborted".to_string()
        } else {
            ret.errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ")
        };
        return Err(BundleError::Parse {
            file: name.to_string(),
            message,
        });
    }

    let options = if minify {
        CodegenOptions::minify()
    } else {
        CodegenOptions::default()
    };
    Ok(Codegen::new().with_options(options).build(&ret.program).code)
}
