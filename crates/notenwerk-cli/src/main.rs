// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Notenwerk — cleans photographed sheet music and documents.
//
// Entry point. Initialises logging, resolves settings from config and flags,
// and runs the requested command.

mod batch;
mod options;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use notenwerk_core::human_errors::humanize_error;
use notenwerk_core::{AppConfig, NotenwerkError, Profile};

use batch::BatchOptions;
use options::SettingsArgs;

#[derive(Parser)]
#[command(name = "notenwerk")]
#[command(version, about = "Clean scanned or photographed pages into crisp, cropped PNGs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean one or more page images
    Process {
        /// Input image files
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory (default: next to each input)
        #[arg(short, long, value_name = "DIR")]
        out: Option<PathBuf>,

        /// JSON config file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        #[command(flatten)]
        settings: SettingsArgs,

        /// Skip the matching crop of the original
        #[arg(long)]
        no_original: bool,
    },

    /// Print default settings as JSON
    Defaults {
        #[arg(long, value_name = "PROFILE", default_value = "standard")]
        profile: Profile,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Commands::Process {
            inputs,
            out,
            config,
            settings,
            no_original,
        } => {
            let config = match config {
                Some(path) => match AppConfig::load(&path) {
                    Ok(config) => config,
                    Err(err) => return fail(&err),
                },
                None => AppConfig::default(),
            };
            let settings = match settings.resolve(&config) {
                Ok(settings) => settings,
                Err(err) => return fail(&err),
            };
            tracing::info!(inputs = inputs.len(), algorithm = %settings.algorithm, "Notenwerk starting");

            let options = BatchOptions {
                out_dir: out,
                write_original: config.write_original && !no_original,
            };
            let summary = batch::run(&inputs, &settings, &config, &options).await;
            if summary.all_succeeded() {
                ExitCode::SUCCESS
            } else {
                eprintln!(
                    "{} of {} inputs failed",
                    summary.failed.len(),
                    inputs.len()
                );
                ExitCode::FAILURE
            }
        }

        Commands::Defaults { profile } => match serde_json::to_string_pretty(&profile.settings()) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(err) => fail(&NotenwerkError::from(err)),
        },
    }
}

fn fail(err: &NotenwerkError) -> ExitCode {
    tracing::error!(error = %err, "cannot start");
    eprintln!("{}", humanize_error(err));
    ExitCode::FAILURE
}
