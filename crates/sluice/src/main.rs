// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sluice - a plugin-driven message pipeline daemon.
//!
//! This is the binary entry point. It loads the `[sluiced]` settings, builds
//! the pipeline from the remaining plugin sections, and runs it until a
//! signal or a plugin asks for shutdown.

mod signal;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use sluice_config::GlobalConfig;
use sluice_core::SluiceError;
use sluice_pipeline::Pipeline;
use sluice_plugin::{PluginRegistry, register_builtins};

/// Sluice - a plugin-driven message pipeline daemon.
#[derive(Parser, Debug)]
#[command(name = "sluice", version, about, long_about = None)]
struct Cli {
    /// Configuration file. Defaults to the first of ./sluice.toml,
    /// ~/.config/sluice/sluice.toml and /etc/sluice/sluice.toml.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Load the configuration and run the pipeline (the default).
    Run,
    /// Load the configuration, report any plugin errors, and exit.
    Check,
}

/// A failed pipeline load together with everything logged along the way.
#[derive(Debug)]
struct LoadReport {
    error: SluiceError,
    log: Vec<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let Some(path) = cli.config.or_else(sluice_config::default_config_path) else {
        eprintln!("sluice: no configuration file found, pass one with --config");
        std::process::exit(1);
    };

    let globals = match sluice_config::load_globals_from_path(&path) {
        Ok(globals) => globals,
        Err(errors) => {
            sluice_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&globals.log_level);

    let pipeline = match load_pipeline(&path, globals) {
        Ok(pipeline) => pipeline,
        Err(report) => {
            for line in &report.log {
                eprintln!("sluice: {line}");
            }
            eprintln!("sluice: {}", report.error);
            std::process::exit(1);
        }
    };

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Check => {
            for line in pipeline.log_messages() {
                println!("sluice: {line}");
            }
            println!(
                "sluice: {} OK ({} inputs, {} filters, {} outputs)",
                path.display(),
                pipeline.input_names().len(),
                pipeline.filter_names().len(),
                pipeline.output_names().len(),
            );
            pipeline.shutdown().await;
        }
        Commands::Run => {
            if let Err(err) = run(&pipeline).await {
                error!(error = %err, "pipeline failed to start");
                pipeline.shutdown().await;
                std::process::exit(1);
            }
        }
    }
}

/// Build a pipeline with the built-in plugins and load `path` into it.
fn load_pipeline(path: &Path, globals: GlobalConfig) -> Result<Arc<Pipeline>, LoadReport> {
    let mut registry = PluginRegistry::new();
    register_builtins(&mut registry);

    let pipeline = Pipeline::new(Arc::new(registry), globals);
    match pipeline.load_from_file(path) {
        Ok(()) => Ok(pipeline),
        Err(error) => Err(LoadReport {
            error,
            log: pipeline.log_messages(),
        }),
    }
}

/// Start every runner and block until a signal or a plugin requests shutdown.
async fn run(pipeline: &Arc<Pipeline>) -> Result<(), SluiceError> {
    pipeline.start()?;
    info!(
        inputs = pipeline.input_names().len(),
        filters = pipeline.filter_names().len(),
        outputs = pipeline.output_names().len(),
        "pipeline running"
    );

    let signals = signal::install_signal_handler();
    tokio::select! {
        _ = signals.cancelled() => {}
        _ = pipeline.shutdown_requested() => info!("shutdown requested by a plugin"),
    }

    pipeline.shutdown().await;
    info!("pipeline stopped");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sluice={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
