//! Outbound call seam.
//!
//! [`Dispatch::send`] is the single transmission primitive; every other
//! call the driver makes is derived from it here. The HTTP implementation
//! lives in [`crate::client`]; [`RecordingDispatcher`] captures calls
//! in memory for tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use mesos_proto::{AgentId, Call, OfferId, Operation, ReconcileTask, TaskId, TaskInfo, TaskStatus};
use tracing::{debug, info};

use crate::error::{DriverError, Result};

/// Transmits calls to the master.
///
/// Calls are fire-and-forget: a returned error means the master did not
/// take the call, and nothing is retried on the caller's behalf.
#[async_trait]
pub trait Dispatch: Send + Sync {
    /// Sends one call with the current session's identity and token.
    async fn send(&self, call: Call) -> Result<()>;

    /// Lifts a previous suppression so offers flow again.
    async fn revive(&self) -> Result<()> {
        debug!("Reviving offers");
        self.send(Call::revive()).await
    }

    /// Stops offers once the framework has nothing left to place.
    async fn suppress(&self) -> Result<()> {
        info!("Suppressing offers");
        self.send(Call::suppress()).await
    }

    /// Hands offers back to the master. An empty list sends nothing.
    async fn decline(&self, offer_ids: Vec<OfferId>) -> Result<()> {
        if offer_ids.is_empty() {
            return Ok(());
        }
        debug!(offer_count = offer_ids.len(), "Declining offers");
        self.send(Call::decline(offer_ids)).await
    }

    /// Launches tasks on the given offers.
    async fn accept(&self, offer_ids: Vec<OfferId>, tasks: Vec<TaskInfo>) -> Result<()> {
        debug!(
            offer_count = offer_ids.len(),
            task_count = tasks.len(),
            "Accepting offers"
        );
        self.send(Call::accept(offer_ids, vec![Operation::launch(tasks)]))
            .await
    }

    /// Asks the master to terminate one task.
    async fn kill(&self, task_id: TaskId, agent_id: AgentId) -> Result<()> {
        info!(task_id = %task_id, agent_id = %agent_id, "Killing task");
        self.send(Call::kill(task_id, Some(agent_id))).await
    }

    /// Confirms receipt of a status update.
    ///
    /// Statuses without a delivery token need no acknowledgement and send
    /// nothing.
    async fn acknowledge(&self, status: &TaskStatus) -> Result<()> {
        match Call::acknowledge(status) {
            Some(call) => self.send(call).await,
            None => {
                debug!(task_id = %status.task_id, "Status carries no delivery token");
                Ok(())
            }
        }
    }

    /// Asks the master to report the true state of the given tasks.
    async fn reconcile(&self, tasks: Vec<ReconcileTask>) -> Result<()> {
        self.send(Call::reconcile(tasks)).await
    }
}

/// Dispatcher that records calls instead of sending them.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    calls: Mutex<Vec<Call>>,
    fail: AtomicBool,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent send fail as if the master rejected it.
    pub fn fail_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }

    /// Calls sent so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Calls sent so far, as wire kinds.
    pub fn kinds(&self) -> Vec<mesos_proto::CallType> {
        self.calls().iter().map(|c| c.kind).collect()
    }
}

#[async_trait]
impl Dispatch for RecordingDispatcher {
    async fn send(&self, call: Call) -> Result<()> {
        let kind = call.kind;
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
        if self.fail.load(Ordering::Relaxed) {
            return Err(DriverError::Rejected {
                call: kind,
                status: 503,
                body: "recording dispatcher set to fail".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesos_proto::{CallType, TaskState};

    #[tokio::test]
    async fn test_empty_decline_sends_nothing() {
        let dispatcher = RecordingDispatcher::new();
        dispatcher.decline(vec![]).await.unwrap();
        assert!(dispatcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_acknowledge_only_with_token() {
        let dispatcher = RecordingDispatcher::new();
        let mut status = TaskStatus::new("web_1", TaskState::Running);
        status.agent_id = Some(AgentId::new("agent-1"));

        dispatcher.acknowledge(&status).await.unwrap();
        assert!(dispatcher.calls().is_empty());

        status.uuid = Some("dG9rZW4=".to_string());
        dispatcher.acknowledge(&status).await.unwrap();
        assert_eq!(dispatcher.kinds(), vec![CallType::Acknowledge]);
    }

    #[tokio::test]
    async fn test_derived_calls() {
        let dispatcher = RecordingDispatcher::new();
        dispatcher.revive().await.unwrap();
        dispatcher.suppress().await.unwrap();
        dispatcher
            .kill(TaskId::new("web_1"), AgentId::new("agent-1"))
            .await
            .unwrap();
        dispatcher.reconcile(vec![]).await.unwrap();

        assert_eq!(
            dispatcher.kinds(),
            vec![
                CallType::Revive,
                CallType::Suppress,
                CallType::Kill,
                CallType::Reconcile
            ]
        );
        let kill = dispatcher.calls()[2].kill.clone().unwrap();
        assert_eq!(kill.agent_id, Some(AgentId::new("agent-1")));
    }

    #[tokio::test]
    async fn test_failing_dispatcher_still_records() {
        let dispatcher = RecordingDispatcher::new();
        dispatcher.fail_sends(true);

        let err = dispatcher.revive().await.unwrap_err();

        assert!(matches!(err, DriverError::Rejected { status: 503, .. }));
        assert_eq!(dispatcher.calls().len(), 1);
    }
}
