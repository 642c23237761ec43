//! king-console CLI: connections, schema and object pages as JSON on stdout.
//!
//! Settings from `conf/settings.yaml` and `.config/weaviate-king/settings.yaml`
//! (override the latter's directory with `--conf <dir>`).
//!
//! Logging: set `RUST_LOG=king_objects=debug` (or `info`, `warn`) to see logs on stderr.

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use king_objects::Resolution;
use tracing_subscriber::EnvFilter;

use king_console::{load_console_settings, set_config_home_override};

use crate::cli::Cli;
use crate::commands::Runtime;

const DEFAULT_LOG_FILTER: &str = "king_console=info,king_objects=info,king_transport=info";
const VERBOSE_LOG_FILTER: &str = "king_console=debug,king_objects=debug,king_transport=debug";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG overrides; --verbose => debug; else info. Stderr keeps stdout parseable.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose {
            VERBOSE_LOG_FILTER
        } else {
            DEFAULT_LOG_FILTER
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    if let Some(conf_dir) = cli.conf.clone() {
        set_config_home_override(conf_dir);
    }
    let settings = load_console_settings();

    let outcome = match Runtime::new(settings, cli.backend_url.clone()) {
        Ok(runtime) => commands::run(&runtime, cli.command).await,
        Err(error) => Err(error),
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::debug!(event = "console.command.failed", error = %error);
            let resolution = Resolution::Error(format!("{error:#}"));
            match serde_json::to_string(&resolution) {
                Ok(text) => println!("{text}"),
                Err(_) => eprintln!("{error:#}"),
            }
            ExitCode::FAILURE
        }
    }
}
