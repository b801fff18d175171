//! `vpos`: operator tool for a Cardlink VPOS merchant configuration.
//!
//! Checks a configuration file, prints the storefront payment summary,
//! computes IRIS reference codes, signs redirect requests, verifies redirect
//! callbacks and fetches the client-side card-encoding script.

#![allow(
    clippy::multiple_crate_versions,
    reason = "transitive dependencies from reqwest and x509-parser"
)]

mod commands;
mod observability;

use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};

use crate::{
    commands::{CallbackArgs, RedirectArgs, ReferenceArgs},
    observability::{LogFormat, init_observability},
};

/// Cardlink VPOS merchant tool.
#[derive(Parser, Debug)]
#[command(name = "vpos", version, about, long_about = None)]
struct Cli {
    /// Merchant configuration file.
    #[arg(long, short, env = "VPOS_CONFIG", default_value = "merchant.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load and validate the configuration, including key material.
    Check,

    /// Print the payment settings summary as JSON.
    Settings,

    /// Compute the RF reference code of an IRIS payment.
    Reference(ReferenceArgs),

    /// Sign an IRIS or PayPal redirect request.
    Redirect(RedirectArgs),

    /// Verify a redirect callback given as name=value pairs.
    Callback(CallbackArgs),

    /// Fetch the client-side card-encoding script.
    ClientScript,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_observability(LogFormat::from_env());

    let result = match cli.command {
        Commands::Check => commands::run_check(&cli.config),
        Commands::Settings => commands::run_settings(&cli.config),
        Commands::Reference(args) => commands::run_reference(&cli.config, &args),
        Commands::Redirect(args) => commands::run_redirect(&cli.config, &args),
        Commands::Callback(args) => commands::run_callback(&cli.config, &args),
        Commands::ClientScript => commands::run_client_script(&cli.config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(status = e.status_code(), "{e}");
            ExitCode::FAILURE
        }
    }
}
