use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;

mod cli;

use cli::{Cli, Commands};
use fl_compiler::{CompilerOptions, compile_directory, compile_workflow};
use fl_core::{CompileError, format_error};
use fl_process::SystemRunner;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .try_init()
        .ok();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", format_error(&format!("{e:#}")));
            exit_code_for(&e)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Compile {
            paths,
            strict,
            no_emit,
            check,
            offline,
            minify,
        } => {
            let runner = SystemRunner;
            let mut options = CompilerOptions::new(&runner);
            options.strict = strict;
            options.no_emit = no_emit;
            options.check = check;
            options.offline = offline;
            options.minify = minify;
            options.build_info = build_info();

            let mut drifted = false;
            for path in &paths {
                let path = Path::new(path);
                if path.is_dir() {
                    for compiled in compile_directory(path, &options)? {
                        drifted |= compiled.drifted;
                    }
                } else {
                    drifted |= compile_workflow(path, &options)?.drifted;
                }
            }
            if check && drifted {
                eprintln!("{}", format_error("lock files are out of date; recompile"));
                return Ok(ExitCode::from(1));
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn build_info() -> Option<String> {
    let describe = env!("FLOWLOCK_GIT_DESCRIBE");
    if describe.is_empty() {
        None
    } else {
        Some(describe.to_string())
    }
}

/// 1 for validation errors, 2 for I/O or unexpected failures.
fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    if err.downcast_ref::<CompileError>().is_some()
        || format!("{err:#}").contains("workflow validation failed")
    {
        ExitCode::from(1)
    } else {
        ExitCode::from(2)
    }
}
