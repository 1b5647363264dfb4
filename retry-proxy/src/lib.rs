pub mod config;
pub mod errors;
mod headers;
mod metrics_defs;
pub mod relay;
mod relay_service;
pub mod status_notifier;
#[cfg(test)]
mod testutils;
mod utils;

use errors::RetryProxyError;
use relay::Relay;
use relay_service::RetryProxyService;
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use std::convert::Infallible;

pub use metrics_defs::ALL_METRICS;

pub async fn run(config: config::Config) -> Result<(), RetryProxyError> {
    config.validate()?;
    let remote_user_header = config.remote_user_header_name()?;

    let relay_config = config.resolve(config::process_env);
    let relay = Relay::new(relay_config.clone())?;
    tracing::info!(
        target_url = %relay.target_url(),
        status_api = ?relay_config.status_api,
        "Retry proxy initialised"
    );

    let proxy_task = run_http_service::<_, RetryProxyError>(
        &config.listener.host,
        config.listener.port,
        RetryProxyService::new(relay, remote_user_header),
    );
    let admin_task = run_http_service::<_, RetryProxyError>(
        &config.admin_listener.host,
        config.admin_listener.port,
        AdminService::<_, Infallible>::new(|| true),
    );

    tokio::try_join!(proxy_task, admin_task)?;
    Ok(())
}
