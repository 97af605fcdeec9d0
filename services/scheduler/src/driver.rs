//! The driver: subscribe, read, route.

use std::sync::Arc;

use mesos_proto::TaskId;
use tracing::{debug, info};

use crate::client::SchedulerClient;
use crate::dispatch::Dispatch;
use crate::error::{DriverError, Result};
use crate::handler::EventHandler;
use crate::policy::DriverPolicy;
use crate::router::EventRouter;
use crate::state::SharedState;

/// Runs one subscription against the master.
pub struct Driver {
    client: Arc<SchedulerClient>,
    router: EventRouter,
}

impl Driver {
    pub fn new(
        client: Arc<SchedulerClient>,
        handler: Arc<dyn EventHandler>,
        policy: DriverPolicy,
    ) -> Self {
        let state = client.state().clone();
        let router = EventRouter::new(client.clone(), state, handler, policy);
        Self { client, router }
    }

    pub fn client(&self) -> &Arc<SchedulerClient> {
        &self.client
    }

    pub fn state(&self) -> &Arc<SharedState> {
        self.router.state()
    }

    /// Subscribes and handles events until the subscription fails.
    ///
    /// Never returns `Ok`. Every error ends this subscription; whether to
    /// subscribe again is up to the caller, and a new subscription gets a
    /// new session token. The previous token is invalidated before
    /// subscribing and again when the subscription ends, so no call goes
    /// out on a dead session.
    pub async fn run(&self) -> Result<()> {
        self.state().clear_session_token().await;
        let result = self.subscribe_and_route().await;
        self.state().clear_session_token().await;
        result
    }

    async fn subscribe_and_route(&self) -> Result<()> {
        let mut subscription = self.client.subscribe().await?;
        let stream_id = subscription.stream_id;

        loop {
            let event = subscription.events.next_event().await?;
            debug!(kind = %event.kind(), "Event");

            if let Some(timeout) = self.router.route(event, &stream_id).await {
                debug!(timeout = ?timeout, "Heartbeat watchdog armed");
                subscription.events.set_idle_timeout(Some(timeout));
            }
        }
    }

    /// Asks the master to kill a task this framework knows about.
    ///
    /// The local record stays until the master reports the task killed.
    pub async fn kill_task(&self, task_id: &str) -> Result<()> {
        let record = self
            .state()
            .get(task_id)
            .await
            .ok_or_else(|| DriverError::TaskNotFound(task_id.to_string()))?;

        let agent_id = record.agent().cloned().ok_or_else(|| {
            DriverError::TaskNotFound(format!("{task_id} has no known agent"))
        })?;

        info!(task_id = %task_id, agent_id = %agent_id, "Kill requested");
        self.client.kill(TaskId::new(task_id), agent_id).await
    }
}
