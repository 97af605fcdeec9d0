//! Event routing.
//!
//! One `match` over [`Event`] decides what each event does to local state
//! and which calls it triggers. Failures that leave the shared state intact
//! (a rejected acknowledge, a handler error) are logged here and never end
//! the stream.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mesos_proto::{Event, Offer, Subscribed, TaskStatus};
use tracing::{debug, error, info, warn};

use crate::dispatch::Dispatch;
use crate::handler::EventHandler;
use crate::policy::{DriverPolicy, ReconcilePolicy, RevivePolicy};
use crate::reconciler::Reconciler;
use crate::state::{SharedState, StatusOutcome};

/// Routes decoded events to state, calls and the application handler.
pub struct EventRouter {
    dispatcher: Arc<dyn Dispatch>,
    state: Arc<SharedState>,
    handler: Arc<dyn EventHandler>,
    reconciler: Reconciler,
    policy: DriverPolicy,
    /// Set once startup reconciliation has been sent.
    reconciled: AtomicBool,
}

impl EventRouter {
    pub fn new(
        dispatcher: Arc<dyn Dispatch>,
        state: Arc<SharedState>,
        handler: Arc<dyn EventHandler>,
        policy: DriverPolicy,
    ) -> Self {
        Self {
            reconciler: Reconciler::new(dispatcher.clone(), state.clone()),
            dispatcher,
            state,
            handler,
            policy,
            reconciled: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> &Arc<SharedState> {
        &self.state
    }

    pub fn policy(&self) -> &DriverPolicy {
        &self.policy
    }

    /// Handles one event from the subscription identified by `stream_id`.
    ///
    /// Returns the idle timeout to arm once a SUBSCRIBED event announces the
    /// master's heartbeat interval.
    pub async fn route(&self, event: Event, stream_id: &str) -> Option<Duration> {
        match event {
            Event::Subscribed(subscribed) => self.on_subscribed(subscribed, stream_id).await,
            Event::Update(status) => {
                self.on_update(status).await;
                None
            }
            Event::Offers(offers) => {
                self.on_offers(offers).await;
                None
            }
            Event::Heartbeat => {
                debug!("Heartbeat");
                self.handler.heartbeat().await;
                None
            }
            Event::Other { kind } => {
                debug!(kind = %kind, "Ignoring event");
                None
            }
        }
    }

    async fn on_subscribed(&self, subscribed: Subscribed, stream_id: &str) -> Option<Duration> {
        info!(
            framework_id = %subscribed.framework_id,
            heartbeat_interval_seconds = ?subscribed.heartbeat_interval_seconds,
            "Subscribed"
        );
        self.state
            .set_subscribed(subscribed.framework_id, stream_id.to_string())
            .await;

        if !self.reconciled.swap(true, Ordering::SeqCst) {
            self.reconcile().await;
        }

        self.policy
            .heartbeat_timeout(subscribed.heartbeat_interval_seconds)
    }

    async fn on_update(&self, status: TaskStatus) {
        let task_id = status.task_id.clone();
        let state = status.state;

        // Acknowledge only after the update is applied and persisted.
        let outcome = self.state.apply_status_update(status.clone()).await;
        match outcome {
            StatusOutcome::Pruned => info!(task_id = %task_id, state = %state, "Task ended"),
            StatusOutcome::Updated => debug!(task_id = %task_id, state = %state, "Task status"),
        }

        if self.policy.revive == RevivePolicy::OnStatusUpdate {
            if let Err(e) = self.dispatcher.revive().await {
                warn!(task_id = %task_id, error = %e, "Failed to revive offers");
            }
        }

        if let Err(e) = self.dispatcher.acknowledge(&status).await {
            error!(task_id = %task_id, error = %e, "Failed to acknowledge status update");
        }

        if self.policy.reconcile == ReconcilePolicy::OnStatusUpdate {
            self.reconcile().await;
        }
    }

    async fn on_offers(&self, offers: Vec<Offer>) {
        debug!(offer_count = offers.len(), "Received offers");
        self.handler.restart_failed_containers().await;
        if let Err(e) = self.handler.handle_offers(offers).await {
            error!(error = %e, "Offer handler failed");
        }
    }

    async fn reconcile(&self) {
        if let Err(e) = self.reconciler.reconcile().await {
            error!(error = %e, "Failed to request reconciliation");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use mesos_proto::{
        AgentId, CallType, FrameworkId, FrameworkInfo, OfferId, TaskState,
    };

    use crate::dispatch::RecordingDispatcher;

    #[derive(Default)]
    struct CountingHandler {
        offers: AtomicUsize,
        restarts: AtomicUsize,
        heartbeats: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl EventHandler for CountingHandler {
        async fn handle_offers(&self, offers: Vec<Offer>) -> anyhow::Result<()> {
            // Restart scan must already have run for this batch.
            assert_eq!(
                self.restarts.load(Ordering::SeqCst),
                self.offers.load(Ordering::SeqCst) + 1
            );
            self.offers.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("no placement for {} offers", offers.len());
            }
            Ok(())
        }

        async fn restart_failed_containers(&self) {
            self.restarts.fetch_add(1, Ordering::SeqCst);
        }

        async fn heartbeat(&self) {
            self.heartbeats.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Fixture {
        router: EventRouter,
        dispatcher: Arc<RecordingDispatcher>,
        handler: Arc<CountingHandler>,
        state: Arc<SharedState>,
    }

    fn fixture(policy: DriverPolicy, handler: CountingHandler) -> Fixture {
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let handler = Arc::new(handler);
        let state = Arc::new(SharedState::in_memory(FrameworkInfo::default()));
        let router = EventRouter::new(dispatcher.clone(), state.clone(), handler.clone(), policy);
        Fixture {
            router,
            dispatcher,
            handler,
            state,
        }
    }

    fn subscribed(interval: Option<f64>) -> Event {
        Event::Subscribed(Subscribed {
            framework_id: FrameworkId::new("fw-1"),
            heartbeat_interval_seconds: interval,
        })
    }

    fn update(id: &str, state: TaskState, uuid: Option<&str>) -> Event {
        let mut status = TaskStatus::new(id, state);
        status.agent_id = Some(AgentId::new("agent-1"));
        status.uuid = uuid.map(str::to_string);
        Event::Update(status)
    }

    #[tokio::test]
    async fn test_subscribed_sets_session_and_reconciles_once() {
        let f = fixture(DriverPolicy::default(), CountingHandler::default());

        let timeout = f.router.route(subscribed(Some(15.0)), "stream-1").await;
        assert_eq!(timeout, Some(Duration::from_secs(45)));

        let ctx = f.state.call_context().await;
        assert_eq!(ctx.framework_id, Some(FrameworkId::new("fw-1")));
        assert_eq!(ctx.stream_id.as_deref(), Some("stream-1"));

        f.router.route(subscribed(Some(15.0)), "stream-2").await;
        assert_eq!(f.dispatcher.kinds(), vec![CallType::Reconcile]);
        assert_eq!(
            f.state.call_context().await.stream_id.as_deref(),
            Some("stream-2")
        );
    }

    #[tokio::test]
    async fn test_update_applies_then_revives_and_acknowledges() {
        let f = fixture(DriverPolicy::default(), CountingHandler::default());

        f.router
            .route(update("web_1", TaskState::Running, Some("u-1")), "s")
            .await;

        assert_eq!(
            f.state.get("web_1").await.unwrap().status.unwrap().state,
            TaskState::Running
        );
        assert_eq!(
            f.dispatcher.kinds(),
            vec![CallType::Revive, CallType::Acknowledge]
        );
    }

    #[tokio::test]
    async fn test_terminal_update_prunes_and_still_acknowledges() {
        let f = fixture(DriverPolicy::default(), CountingHandler::default());

        f.router
            .route(update("web_1", TaskState::Running, None), "s")
            .await;
        f.router
            .route(update("web_1", TaskState::Killed, Some("u-2")), "s")
            .await;

        assert!(f.state.get("web_1").await.is_none());
        assert_eq!(
            f.dispatcher.kinds(),
            vec![CallType::Revive, CallType::Revive, CallType::Acknowledge]
        );
    }

    #[tokio::test]
    async fn test_update_policies() {
        let policy = DriverPolicy {
            revive: RevivePolicy::Never,
            reconcile: ReconcilePolicy::OnStatusUpdate,
            ..DriverPolicy::default()
        };
        let f = fixture(policy, CountingHandler::default());

        f.router
            .route(update("web_1", TaskState::Running, Some("u-1")), "s")
            .await;

        assert_eq!(
            f.dispatcher.kinds(),
            vec![CallType::Acknowledge, CallType::Reconcile]
        );
    }

    #[tokio::test]
    async fn test_failed_acknowledge_keeps_state() {
        let f = fixture(DriverPolicy::default(), CountingHandler::default());
        f.dispatcher.fail_sends(true);

        f.router
            .route(update("web_1", TaskState::Staging, Some("u-1")), "s")
            .await;

        assert!(f.state.get("web_1").await.is_some());
    }

    #[tokio::test]
    async fn test_offers_run_restart_scan_first() {
        let handler = CountingHandler {
            fail: true,
            ..CountingHandler::default()
        };
        let f = fixture(DriverPolicy::default(), handler);
        let offer = Offer {
            id: OfferId::new("o1"),
            framework_id: FrameworkId::new("fw-1"),
            agent_id: AgentId::new("agent-1"),
            hostname: "a1".to_string(),
            resources: Vec::new(),
        };

        f.router.route(Event::Offers(vec![offer.clone()]), "s").await;
        f.router.route(Event::Offers(vec![offer]), "s").await;

        assert_eq!(f.handler.restarts.load(Ordering::SeqCst), 2);
        assert_eq!(f.handler.offers.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_heartbeat_and_unknown_events() {
        let f = fixture(DriverPolicy::default(), CountingHandler::default());

        f.router.route(Event::Heartbeat, "s").await;
        f.router
            .route(
                Event::Other {
                    kind: "RESCIND".to_string(),
                },
                "s",
            )
            .await;

        assert_eq!(f.handler.heartbeats.load(Ordering::SeqCst), 1);
        assert!(f.dispatcher.calls().is_empty());
    }
}
