// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Buildchat - build notifications and chat commands over instant messaging.
//!
//! This is the binary entry point.

mod check;
mod console;
mod fixtures;
mod shell;

use std::path::PathBuf;

use buildchat_config::model::BuildchatConfig;
use clap::{Parser, Subcommand};

/// Buildchat - build notifications and chat commands over instant messaging.
#[derive(Parser, Debug)]
#[command(name = "buildchat", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG lookup.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the configuration and print what it resolves to.
    Check {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// Talk to the command bot from the terminal, without an IM server.
    Shell {
        /// TOML file describing the jobs the bot can see.
        #[arg(long)]
        jobs: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            buildchat_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Check { plain }) => check::run_check(&config, plain),
        Some(Commands::Shell { jobs }) => {
            init_tracing(&config.general.log_level);
            shell::run_shell(config, jobs).await
        }
        None => {
            println!("buildchat: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn load_config(
    path: Option<&std::path::Path>,
) -> Result<BuildchatConfig, Vec<buildchat_config::ConfigError>> {
    match path {
        Some(path) => buildchat_config::load_and_validate_path(path),
        None => buildchat_config::load_and_validate(),
    }
}

/// Initialize the tracing subscriber. `RUST_LOG` takes precedence over the
/// configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("buildchat={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
