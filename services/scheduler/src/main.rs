//! Mesos Scheduler Driver
//!
//! Standalone runner for a framework identity: restores its snapshot,
//! subscribes, reconciles the tasks it knows about, acknowledges their
//! updates, and hands back every offer it receives.
//!
//! ## Lifecycle
//!
//! - **Restore**: loads session and tasks from the snapshot file
//! - **Subscribe**: re-registers under the persisted framework id, if any
//! - **Drain**: declines each offer batch, then suppresses offers
//!
//! The process exits non-zero when the subscription ends; restarting it is
//! left to the supervisor.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use mesos_proto::Offer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mesos_scheduler::config::Config;
use mesos_scheduler::state::{SharedState, SnapshotFile};
use mesos_scheduler::{Dispatch, Driver, EventHandler, SchedulerClient};

/// Declines every offer and stops further offers.
struct DrainHandler {
    client: Arc<SchedulerClient>,
}

#[async_trait]
impl EventHandler for DrainHandler {
    async fn handle_offers(&self, offers: Vec<Offer>) -> Result<()> {
        let ids = offers.into_iter().map(|o| o.id).collect();
        self.client
            .decline(ids)
            .await
            .context("declining offers")?;
        self.client.suppress().await.context("suppressing offers")?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str())),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!(
        master = %config.master.base_url(),
        framework = %config.framework.name,
        state_file = %config.state_file.display(),
        "Starting Mesos scheduler driver"
    );

    let state = SharedState::open(
        config.framework.framework_info(),
        SnapshotFile::new(config.state_file.clone()),
    )
    .context("restoring framework state")?;
    let state = Arc::new(state);

    let client = Arc::new(SchedulerClient::new(&config.master, state)?);
    let handler = Arc::new(DrainHandler {
        client: Arc::clone(&client),
    });
    let driver = Driver::new(client, handler, config.policy);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            Ok(())
        }
        result = driver.run() => {
            let e = match result {
                Ok(()) => anyhow::anyhow!("subscription ended"),
                Err(e) if e.is_stream_failure() => {
                    warn!(error = %e, "Subscription lost; restart to re-subscribe");
                    e.into()
                }
                Err(e) => {
                    error!(error = %e, "Subscription failed");
                    e.into()
                }
            };
            Err(e)
        }
    }
}
