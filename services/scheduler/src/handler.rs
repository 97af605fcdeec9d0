//! Application callbacks invoked by the event router.

use async_trait::async_trait;
use mesos_proto::{Offer, Resource};

use crate::task::TaskSpec;

/// Placement and housekeeping supplied by the framework.
///
/// Every callback runs on the router's control path: the next event is not
/// read until it returns. Long-running work belongs on its own task.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Decides what to launch on a batch of offers.
    ///
    /// Every offer must be accepted or declined before returning.
    async fn handle_offers(&self, offers: Vec<Offer>) -> anyhow::Result<()>;

    /// Runs once per offers event, before [`EventHandler::handle_offers`].
    async fn restart_failed_containers(&self) {}

    /// Runs once per heartbeat.
    async fn heartbeat(&self) {}

    /// Resources to request when launching `spec`.
    fn default_resources(&self, spec: &TaskSpec) -> Vec<Resource> {
        crate::launch::default_resources(spec)
    }
}
