//! Reconciliation with the master's view of task state.
//!
//! The reconciler:
//! - Asks the master for the true state of every task with a known status
//! - Restores the task counter from the highest task number on record
//!
//! It never applies state itself. The master answers with ordinary status
//! updates, which flow through the event router like any other.

use std::sync::Arc;

use mesos_proto::ReconcileTask;
use tracing::{debug, info};

use crate::dispatch::Dispatch;
use crate::error::Result;
use crate::state::{SharedState, TaskStore};

/// Result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Tasks named in the reconcile call.
    pub tasks: usize,
    /// Task counter after the pass.
    pub task_counter: u64,
}

/// Sends reconcile calls derived from the local task store.
pub struct Reconciler {
    /// Outbound calls.
    dispatcher: Arc<dyn Dispatch>,

    /// Framework state.
    state: Arc<SharedState>,
}

impl Reconciler {
    /// Create a new reconciler.
    pub fn new(dispatcher: Arc<dyn Dispatch>, state: Arc<SharedState>) -> Self {
        Self { dispatcher, state }
    }

    /// Run one reconciliation pass.
    ///
    /// Exactly one RECONCILE call is sent. With no task statuses on record
    /// the call names no tasks, which asks the master for every task it
    /// knows about for this framework.
    pub async fn reconcile(&self) -> Result<ReconcileSummary> {
        let (targets, task_counter) = self
            .state
            .mutate(|s| {
                if let Some(highest) = highest_task_number(&s.tasks) {
                    s.session.task_counter = s.session.task_counter.max(highest);
                }
                (reconcile_targets(&s.tasks), s.session.task_counter)
            })
            .await;

        let summary = ReconcileSummary {
            tasks: targets.len(),
            task_counter,
        };
        debug!(
            task_ids = ?targets.iter().map(|t| t.task_id.as_str()).collect::<Vec<_>>(),
            "Reconcile targets"
        );

        self.dispatcher.reconcile(targets).await?;

        info!(
            task_count = summary.tasks,
            task_counter = summary.task_counter,
            "Requested reconciliation"
        );
        Ok(summary)
    }
}

/// Task/agent pairs for every record that has a status, in task order.
pub fn reconcile_targets(tasks: &TaskStore) -> Vec<ReconcileTask> {
    let mut targets: Vec<ReconcileTask> = tasks
        .records()
        .filter(|r| r.status.is_some())
        .map(|r| ReconcileTask {
            task_id: r.task_id.clone(),
            agent_id: r.agent().cloned(),
        })
        .collect();
    targets.sort_by(|a, b| a.task_id.as_str().cmp(b.task_id.as_str()));
    targets
}

/// Highest task number across all records, if any carries one.
pub fn highest_task_number(tasks: &TaskStore) -> Option<u64> {
    tasks
        .records()
        .filter_map(|r| task_number(r.task_id.as_str()))
        .max()
}

/// Numeric part of a task identifier.
///
/// Either the whole identifier is a number, or it ends in `_<number>` as
/// generated identifiers do.
pub fn task_number(task_id: &str) -> Option<u64> {
    if let Ok(n) = task_id.parse() {
        return Some(n);
    }
    task_id
        .rsplit_once('_')
        .and_then(|(_, suffix)| suffix.parse().ok())
}
