use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use ighd::api;
use ighd::build_entities;
use ighd::ApiError;
use ighd::Config;
use ighd::HubApi;
use ighd::HubClient;
use ighd::UpdateCoordinator;

/// Attempts before giving up on the initial hub connection.
const SETUP_ATTEMPTS: u32 = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse config file path from CLI or use default
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ighd.toml".to_string());

    // Load configuration
    let config = Config::from_file(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path))?;

    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::from(
            config.logging.level,
        ))
        .init();

    tracing::info!("ighd starting");
    tracing::info!("Loaded config from: {}", config_path);
    tracing::info!("Hub: {}:{}", config.hub.host, config.hub.port);

    let client = HubClient::new(&config.hub.host, config.hub.port, config.hub.token.clone())
        .context("failed to create hub client")?;
    let hub: Arc<dyn HubApi> = Arc::new(client);

    wait_for_hub(hub.as_ref()).await?;

    // A hub without scenarios can be observed but not controlled; say so
    // early instead of silently no-opping on every write.
    match hub.get_scenarios().await {
        Ok(scenarios) if scenarios.is_empty() => {
            tracing::warn!(
                "no scenarios configured on the hub; \
                 units cannot be controlled until '<unit> On'/'<unit> Off' scenarios exist"
            );
        }
        Ok(scenarios) => {
            tracing::info!("hub has {} scenarios configured", scenarios.len());
        }
        Err(e) => {
            tracing::warn!("could not list hub scenarios: {}", e);
        }
    }

    let coordinator = Arc::new(UpdateCoordinator::new(
        hub,
        Duration::from_secs(config.poll.scan_interval),
    ));

    coordinator
        .refresh()
        .await
        .context("initial hub refresh failed")?;

    let entities = Arc::new(build_entities(&coordinator));
    tracing::info!("serving {} entities", entities.len());

    // Start the poll loop
    let poll_task = tokio::spawn(coordinator.clone().run());

    // Start the daemon API
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let server = tokio::spawn(api::serve(config.api.bind.clone(), entities, shutdown_rx));

    // Wait for Ctrl+C
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received shutdown signal");
        }
        Err(e) => {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
    }

    poll_task.abort();
    let _ = shutdown_tx.send(());
    server.await.context("API server task panicked")??;

    tracing::info!("ighd shutdown complete");

    Ok(())
}

/// Probe the hub until it answers, with bounded backoff.
///
/// An auth failure is permanent: retrying with the same token cannot
/// succeed, so setup fails immediately instead.
async fn wait_for_hub(hub: &dyn HubApi) -> anyhow::Result<()> {
    let mut delay = Duration::from_secs(2);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match hub.get_home_data().await {
            Ok(_) => return Ok(()),
            Err(e @ ApiError::Auth) => {
                return Err(e).context("hub setup failed");
            }
            Err(e) if attempt >= SETUP_ATTEMPTS => {
                return Err(e).context("hub unreachable");
            }
            Err(e) => {
                tracing::warn!(
                    "hub not ready (attempt {}/{}): {}",
                    attempt,
                    SETUP_ATTEMPTS,
                    e
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }
    }
}
