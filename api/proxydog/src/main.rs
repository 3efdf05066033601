/*!
# Introduction

proxydog registers a fleet of backend services with a reverse-proxy gateway, protects them and
the gateway's admin API with authentication plugins, provisions an admin consumer, and installs
TLS certificates.

When the admin consumer authenticates with a JWT, the token is printed to stdout.  The gateway
does not keep it, so it must be saved by the operator.
*/

use argh::FromArgs;
use log::{info, LevelFilter};
use proxydog::{BootstrapConfig, BootstrapOrchestrator};
use simplelog::{Config as LogConfig, SimpleLogger};
use snafu::ResultExt;
use std::path::PathBuf;
use std::process::ExitCode;

const DEFAULT_CONFIG_PATH: &str = "/etc/proxydog/config.toml";

/// Args defines the command line interface of proxydog
#[derive(FromArgs)]
#[argh(description = "bootstrap a reverse-proxy gateway through its admin API")]
struct Args {
    /// path to the TOML bootstrap configuration
    #[argh(option, default = "PathBuf::from(DEFAULT_CONFIG_PATH)")]
    config: PathBuf,

    /// log level: error, warn, info, debug, or trace
    #[argh(option, default = "LevelFilter::Info")]
    log_level: LevelFilter,
}

fn run(args: Args) -> Result<()> {
    // SimpleLogger will send errors to stderr and anything less to stdout.
    SimpleLogger::init(args.log_level, LogConfig::default()).context(error::LoggerSnafu)?;

    let config = BootstrapConfig::from_file(&args.config).context(error::BootstrapSnafu)?;
    info!(
        "Bootstrapping gateway at {} with {} services",
        config.gateway_admin_url(),
        config.services.len()
    );

    let mut orchestrator =
        BootstrapOrchestrator::from_config(&config).context(error::BootstrapSnafu)?;
    let report = orchestrator.run().context(error::BootstrapSnafu)?;

    if let Some(token) = report.admin_token {
        println!(
            "The JWT for consumer {} is: {}. Please keep the JWT for future use.",
            config.admin.username, token
        );
    }
    Ok(())
}

mod error {
    use snafu::Snafu;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    pub(super) enum Error {
        #[snafu(display("Logger setup error: {}", source))]
        Logger { source: log::SetLoggerError },

        #[snafu(display("{}", source))]
        Bootstrap { source: proxydog::Error },
    }
}

type Result<T> = std::result::Result<T, error::Error>;

fn main() -> ExitCode {
    let args: Args = argh::from_env();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
