//! In-memory task store.
//!
//! Holds one record per task the framework has launched or heard about.
//! Failed, killed and lost tasks are dropped the moment their status is
//! applied, so the store only ever describes tasks that may still be alive.

use std::collections::{BTreeMap, HashMap};

use mesos_proto::TaskStatus;
use tracing::debug;

use crate::task::TaskRecord;

/// Result of applying a status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    /// The record now carries the new status.
    Updated,
    /// The status was terminal and the record is gone.
    Pruned,
}

/// Task records keyed by task identifier.
#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    tasks: HashMap<String, TaskRecord>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a store from a persisted snapshot.
    pub fn from_snapshot(tasks: BTreeMap<String, TaskRecord>) -> Self {
        Self {
            tasks: tasks.into_iter().collect(),
        }
    }

    /// Inserts or replaces the record of a task about to be launched.
    ///
    /// Any status already on the record is discarded.
    pub fn record_launch(&mut self, mut record: TaskRecord) {
        record.status = None;
        debug!(task_id = %record.task_id, "Recording task launch");
        self.tasks.insert(record.task_id.value.clone(), record);
    }

    /// Applies a status update.
    ///
    /// Unknown tasks get a fresh record, since an update may overtake the
    /// local launch bookkeeping. Terminal states remove the record.
    pub fn apply_status_update(&mut self, status: TaskStatus) -> StatusOutcome {
        let key = status.task_id.value.clone();

        if status.state.is_terminal() {
            debug!(task_id = %key, state = %status.state, "Removing terminal task");
            self.tasks.remove(&key);
            return StatusOutcome::Pruned;
        }

        let record = self.tasks.entry(key).or_insert_with(|| TaskRecord {
            task_id: status.task_id.clone(),
            agent_id: None,
            spec: None,
            status: None,
        });
        if record.agent_id.is_none() {
            record.agent_id = status.agent_id.clone();
        }
        record.status = Some(status);

        StatusOutcome::Updated
    }

    /// Drops the record of a launch the master never accepted.
    ///
    /// Only records without a status are removed; once the master has
    /// reported on a task, its updates decide when the record goes.
    pub fn discard_launch(&mut self, task_id: &str) -> Option<TaskRecord> {
        if self.tasks.get(task_id)?.status.is_some() {
            return None;
        }
        debug!(task_id = %task_id, "Discarding unlaunched task");
        self.tasks.remove(task_id)
    }

    /// Looks up a task. Absent is a normal answer.
    pub fn get(&self, task_id: &str) -> Option<&TaskRecord> {
        self.tasks.get(task_id)
    }

    /// Copies the full map, ordered by task identifier.
    pub fn snapshot(&self) -> BTreeMap<String, TaskRecord> {
        self.tasks
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &TaskRecord> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskSpec;
    use mesos_proto::{AgentId, TaskId, TaskState};

    fn launched(id: &str) -> TaskRecord {
        TaskRecord::launched(
            TaskId::new(id),
            AgentId::new("agent-1"),
            TaskSpec::new("web", "nginx"),
        )
    }

    fn status(id: &str, state: TaskState) -> TaskStatus {
        let mut status = TaskStatus::new(id, state);
        status.agent_id = Some(AgentId::new("agent-1"));
        status.uuid = Some("dXVpZA==".to_string());
        status
    }

    #[test]
    fn test_record_launch_has_no_status() {
        let mut store = TaskStore::new();
        let mut record = launched("web_1");
        record.status = Some(status("web_1", TaskState::Running));

        store.record_launch(record);

        let fetched = store.get("web_1").unwrap();
        assert!(fetched.status.is_none());
        assert_eq!(fetched.spec.as_ref().unwrap().name, "web");
    }

    #[test]
    fn test_update_sets_status() {
        let mut store = TaskStore::new();
        store.record_launch(launched("web_1"));

        let outcome = store.apply_status_update(status("web_1", TaskState::Running));

        assert_eq!(outcome, StatusOutcome::Updated);
        let record = store.get("web_1").unwrap();
        assert_eq!(record.status.as_ref().unwrap().state, TaskState::Running);
        assert!(record.spec.is_some());
    }

    #[test]
    fn test_update_for_unknown_task_creates_record() {
        let mut store = TaskStore::new();

        store.apply_status_update(status("web_9", TaskState::Staging));

        let record = store.get("web_9").unwrap();
        assert!(record.spec.is_none());
        assert_eq!(record.agent_id, Some(AgentId::new("agent-1")));
    }

    #[test]
    fn test_repeated_update_is_idempotent() {
        let mut once = TaskStore::new();
        once.record_launch(launched("web_1"));
        once.apply_status_update(status("web_1", TaskState::Running));

        let mut twice = once.clone();
        twice.apply_status_update(status("web_1", TaskState::Running));

        assert_eq!(once.snapshot(), twice.snapshot());
    }

    #[test]
    fn test_terminal_states_prune() {
        for state in [TaskState::Failed, TaskState::Killed, TaskState::Lost] {
            let mut store = TaskStore::new();
            store.record_launch(launched("web_1"));
            store.apply_status_update(status("web_1", TaskState::Running));

            let outcome = store.apply_status_update(status("web_1", state));

            assert_eq!(outcome, StatusOutcome::Pruned);
            assert!(store.get("web_1").is_none(), "{state} should prune");
            assert!(store.is_empty());
        }
    }

    #[test]
    fn test_terminal_update_for_unknown_task_leaves_nothing() {
        let mut store = TaskStore::new();
        store.apply_status_update(status("ghost", TaskState::Lost));
        assert!(store.get("ghost").is_none());
    }

    #[test]
    fn test_finished_is_kept() {
        let mut store = TaskStore::new();
        store.record_launch(launched("job_1"));
        store.apply_status_update(status("job_1", TaskState::Finished));
        assert!(store.get("job_1").is_some());
    }

    #[test]
    fn test_discard_launch_only_without_status() {
        let mut store = TaskStore::new();
        store.record_launch(launched("web_1"));
        store.record_launch(launched("web_2"));
        store.apply_status_update(status("web_2", TaskState::Staging));

        assert!(store.discard_launch("web_1").is_some());
        assert!(store.get("web_1").is_none());

        assert!(store.discard_launch("web_2").is_none());
        assert!(store.get("web_2").is_some());

        assert!(store.discard_launch("web_3").is_none());
    }

    #[test]
    fn test_snapshot_does_not_alias() {
        let mut store = TaskStore::new();
        store.record_launch(launched("web_1"));

        let snapshot = store.snapshot();
        store.apply_status_update(status("web_1", TaskState::Killed));
        store.record_launch(launched("web_2"));

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains_key("web_1"));
        assert!(snapshot["web_1"].status.is_none());
    }
}
