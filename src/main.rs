//! Transparent HTTP/1.1 reverse proxy.
//!
//! ```text
//!     client ──▶ net::listener ──▶ net::server ──spawn──▶ net::handler
//!                                                          │
//!                                      http::exchange ◀────┘
//!                                        │ parser
//!                                        │ writer
//!                                        ▼
//!                                      target (one socket per client)
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use transparent_proxy::config::load_config;
use transparent_proxy::lifecycle::startup;

#[derive(Parser)]
#[command(name = "transparent-proxy")]
#[command(about = "Transparent HTTP/1.1 reverse proxy for a single target", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    config: PathBuf,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}: {err}", cli.config.display());
            return ExitCode::from(2);
        }
    };

    if cli.check {
        println!("{}: configuration OK", cli.config.display());
        return ExitCode::SUCCESS;
    }

    match startup::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "Startup failed");
            eprintln!("transparent-proxy: {err}");
            ExitCode::FAILURE
        }
    }
}
