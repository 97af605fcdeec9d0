//! Framework state: the session plus the task store, behind one lock.
//!
//! Every mutation runs under the write lock and re-persists the snapshot
//! before the lock is released, so a snapshot always reflects one
//! consistent point in time. A failed write is logged and the in-memory
//! state stays authoritative for the life of the process.
//!
//! The snapshot write is blocking file I/O done on the calling task while
//! the lock is held. Mutations come from the single event loop and the
//! snapshot is small, so this stays off the hot path; callers must not
//! mutate from latency-sensitive tasks.

mod persistence;
mod store;

pub use persistence::{FrameworkSnapshot, SnapshotFile};
pub use store::{StatusOutcome, TaskStore};

use anyhow::Result;
use mesos_proto::{FrameworkId, FrameworkInfo, TaskStatus};
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::session::Session;
use crate::task::TaskRecord;

/// Session and tasks, mutated together.
#[derive(Debug, Clone, Default)]
pub struct FrameworkState {
    pub session: Session,
    pub tasks: TaskStore,
}

impl FrameworkState {
    pub fn new(framework_info: FrameworkInfo) -> Self {
        Self {
            session: Session::new(framework_info),
            tasks: TaskStore::new(),
        }
    }

    /// Restores persisted state on top of the configured framework info.
    ///
    /// Configuration wins for everything except the assigned identity and
    /// the task counter, which only the snapshot knows.
    pub fn restore(mut framework_info: FrameworkInfo, snapshot: FrameworkSnapshot) -> Self {
        framework_info.id = snapshot.session.framework_info.id.clone();
        Self {
            session: Session {
                framework_info,
                stream_id: None,
                task_counter: snapshot.session.task_counter,
            },
            tasks: TaskStore::from_snapshot(snapshot.tasks),
        }
    }

    pub fn snapshot(&self) -> FrameworkSnapshot {
        FrameworkSnapshot {
            session: self.session.clone(),
            tasks: self.tasks.snapshot(),
            ..FrameworkSnapshot::default()
        }
    }
}

/// Session and session token as needed by an outbound call.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    pub framework_id: Option<FrameworkId>,
    pub stream_id: Option<String>,
}

/// Shared, lock-protected framework state.
pub struct SharedState {
    inner: RwLock<FrameworkState>,
    file: Option<SnapshotFile>,
}

impl SharedState {
    pub fn new(state: FrameworkState, file: Option<SnapshotFile>) -> Self {
        Self {
            inner: RwLock::new(state),
            file,
        }
    }

    /// State that is never written anywhere (for testing).
    pub fn in_memory(framework_info: FrameworkInfo) -> Self {
        Self::new(FrameworkState::new(framework_info), None)
    }

    /// Loads the snapshot file and restores state from it.
    pub fn open(framework_info: FrameworkInfo, file: SnapshotFile) -> Result<Self> {
        let snapshot = file.load()?;
        let state = FrameworkState::restore(framework_info, snapshot);
        info!(
            framework_id = ?state.session.framework_id().map(|id| id.as_str()),
            task_count = state.tasks.len(),
            task_counter = state.session.task_counter,
            "Restored framework state"
        );
        Ok(Self::new(state, Some(file)))
    }

    /// Runs `f` under the write lock and persists the result.
    pub async fn mutate<R>(&self, f: impl FnOnce(&mut FrameworkState) -> R) -> R {
        let mut state = self.inner.write().await;
        let result = f(&mut state);
        self.persist(&state);
        result
    }

    fn persist(&self, state: &FrameworkState) {
        let Some(file) = &self.file else {
            return;
        };
        if let Err(e) = file.save(&state.snapshot()) {
            error!(
                path = %file.path().display(),
                error = %e,
                "Failed to persist framework snapshot"
            );
        }
    }

    pub async fn session(&self) -> Session {
        self.inner.read().await.session.clone()
    }

    pub async fn call_context(&self) -> CallContext {
        let state = self.inner.read().await;
        CallContext {
            framework_id: state.session.framework_id().cloned(),
            stream_id: state.session.stream_id().map(str::to_string),
        }
    }

    /// Records a successful subscribe and persists it.
    pub async fn set_subscribed(&self, framework_id: FrameworkId, stream_id: String) {
        self.mutate(|s| s.session.subscribed(framework_id, stream_id))
            .await
    }

    /// Invalidates the session token once its subscription is gone.
    ///
    /// Calls fail with `NotSubscribed` until the next SUBSCRIBED event.
    pub async fn clear_session_token(&self) {
        self.inner.write().await.session.clear_stream_id();
    }

    pub async fn record_launch(&self, record: TaskRecord) {
        self.mutate(|s| s.tasks.record_launch(record)).await
    }

    pub async fn discard_launch(&self, task_id: &str) -> Option<TaskRecord> {
        self.mutate(|s| s.tasks.discard_launch(task_id)).await
    }

    pub async fn apply_status_update(&self, status: TaskStatus) -> StatusOutcome {
        self.mutate(|s| s.tasks.apply_status_update(status)).await
    }

    pub async fn get(&self, task_id: &str) -> Option<TaskRecord> {
        self.inner.read().await.tasks.get(task_id).cloned()
    }

    pub async fn snapshot(&self) -> FrameworkSnapshot {
        self.inner.read().await.snapshot()
    }
}
