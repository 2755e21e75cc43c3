use clap::Parser;
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use svgapp::cli::{BuildArgs, CliArgs, Commands};
use svgapp::{load_seed_data, logging, BuildError, BuildRequest, EsbuildBundler, Pipeline};

fn main() -> ExitCode {
    logging::init();

    let args = CliArgs::parse();
    let result = match args.command {
        Commands::Build(build) => run_build(build),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            if let BuildError::Bundle(bundle_err) = &err {
                if let Some(stack) = bundle_err.stack() {
                    eprintln!("{}", stack);
                }
            }
            ExitCode::FAILURE
        }
    }
}

fn run_build(args: BuildArgs) -> Result<(), BuildError> {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let mut request = BuildRequest::new(absolute(&cwd, &args.entry))
        .with_output(absolute(&cwd, &args.output));
    if let Some(framework) = args.framework_variant()? {
        request = request.with_framework(framework);
    }
    if let Some(seed) = &args.seed_data {
        request = request.with_seed_data(load_seed_data(&absolute(&cwd, seed))?);
    }

    let bundler = EsbuildBundler::new(args.node);
    let report = Pipeline::new(&bundler).build(&request)?;

    println!("Output: {}", report.output_path.display());
    println!("Size: {:.2} KB", report.size_kb());
    Ok(())
}

fn absolute(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}
