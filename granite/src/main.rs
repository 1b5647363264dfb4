use clap::{Args, Parser};
use std::path::PathBuf;
use std::process::ExitCode;

mod config;
mod logging;
mod statsd;

#[derive(Parser)]
#[command(name = "granite", about = "Granite review services")]
enum CliCommand {
    /// Relay retry triggers to the review service
    RetryProxy(CliArgs),
}

#[derive(Args)]
struct CliArgs {
    #[arg(long)]
    config_file_path: PathBuf,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Logging(#[from] logging::LoggingError),
    #[error(transparent)]
    Metrics(#[from] statsd::MetricsError),
    #[error("config has no `{0}` section")]
    MissingSection(&'static str),
    #[error("could not start runtime: {0}")]
    Runtime(std::io::Error),
    #[error(transparent)]
    RetryProxy(#[from] retry_proxy::errors::RetryProxyError),
}

fn main() -> ExitCode {
    let cli = CliCommand::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Exiting");
            eprintln!("granite: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: CliCommand) -> Result<(), CliError> {
    match cli {
        CliCommand::RetryProxy(args) => {
            let config = config::Config::from_file(&args.config_file_path)?;
            let _sentry = logging::init(config.common.logging.as_ref())?;
            statsd::init(config.common.metrics.as_ref())?;

            let retry_proxy_config = config
                .retry_proxy
                .ok_or(CliError::MissingSection("retry_proxy"))?;

            tracing::info!("Starting retry proxy");
            let rt = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(CliError::Runtime)?;
            rt.block_on(retry_proxy::run(retry_proxy_config))?;
            Ok(())
        }
    }
}
