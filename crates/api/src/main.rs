use std::sync::Arc;

use anyhow::Context;

use credo_api::app::{self, services};
use credo_infra::CredentialConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    credo_observability::init();

    let settings = services::ServerSettings::from_env()?;
    let config = CredentialConfig::from_env().context("invalid credential configuration")?;
    let sweep_interval = config.sweep_interval;
    tracing::info!(?settings, ?config, "starting credo-api");

    let services = Arc::new(services::build_services(&settings, config).await?);
    let sweeper = services.sweeper.clone().spawn(sweep_interval);

    let app = app::build_app(services);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await?;

    sweeper.shutdown().await;
    Ok(())
}
