//! grpc-impl CLI entry point.
//!
//! Reports which gRPC Python backend (rust or cython) the selector resolves
//! to, how every preference would resolve, which QPS worker script to launch
//! and whether the rust backend should be built.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use grpc_impl_core::{
    describe, FixedPreference, MatrixRow, Selector, SelectorConfig, SelectorError,
};
use std::path::PathBuf;
use std::process::ExitCode;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(name = "grpc-impl")]
#[command(version = VERSION)]
#[command(about = "Inspect gRPC Python backend selection (rust vs cython)", long_about = None)]
struct Args {
    /// Selector config TOML file
    #[arg(short, long, env = "GRPC_IMPL_CONFIG")]
    config: Option<PathBuf>,

    /// Preference to use instead of the environment (rust, cython, auto)
    ///
    /// Example: --preference cython
    #[arg(short, long)]
    preference: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Show preference, availability and the active backend (default)
    Info {
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve every preference against the current availability
    Matrix,
    /// Print the QPS worker script for the active backend
    Worker,
    /// Report whether the rust backend should be built
    BuildCheck,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let config = match &args.config {
        Some(path) => SelectorConfig::from_file(path)
            .with_context(|| format!("loading selector config {}", path.display()))?,
        None => SelectorConfig::default(),
    };

    let mut selector = Selector::from_config(&config);
    if let Some(preference) = &args.preference {
        log::debug!("Using explicit preference {:?}", preference);
        selector = selector.with_source(FixedPreference::new(preference.clone()));
    }

    let command = args.command.unwrap_or(Commands::Info { json: false });
    match command {
        Commands::Info { json } => run_info(&selector, json),
        Commands::Matrix => {
            print!("{}", render_matrix(&selector.switching_matrix()));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Worker => match selector.active() {
            Ok(active) => {
                println!("{}", active.worker_script());
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => Ok(report_unavailable(&e)),
        },
        Commands::BuildCheck => {
            let should_build = config.build_gate().should_build_rust();
            println!("Should build Rust: {}", should_build);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_info(selector: &Selector, json: bool) -> Result<ExitCode> {
    let info = match selector.get_info() {
        Ok(info) => info,
        Err(e) => return Ok(report_unavailable(&e)),
    };

    if let Some(fallback) = info.fallback() {
        log::warn!("{}", fallback.warning());
    }

    if json {
        let rendered =
            serde_json::to_string_pretty(&info).context("serializing implementation info")?;
        println!("{}", rendered);
    } else {
        println!("{}", describe(&info));
    }
    Ok(ExitCode::SUCCESS)
}

fn report_unavailable(err: &SelectorError) -> ExitCode {
    println!("  ✗ No implementation available");
    eprintln!("{}", err.user_message());
    ExitCode::FAILURE
}

/// One line per preference: `<preference>: <active>[ (fallback)]` or an error.
fn render_matrix(rows: &[MatrixRow]) -> String {
    let mut out = String::from("Implementation switching:\n");
    for row in rows {
        let outcome = match &row.outcome {
            Ok(resolution) if resolution.is_fallback() => {
                format!("{} (fallback)", resolution.active)
            }
            Ok(resolution) => resolution.active.to_string(),
            Err(e) => format!("failed: {}", e),
        };
        out.push_str(&format!("  With {} preference: {}\n", row.preference, outcome));
    }
    out
}
