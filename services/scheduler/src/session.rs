//! The framework's session with the master.

use mesos_proto::{FrameworkId, FrameworkInfo};
use serde::{Deserialize, Serialize};

/// One subscription's worth of identity and credentials.
///
/// The framework identity and the task counter survive restarts; the
/// session token does not, since the master invalidates it when the
/// subscription ends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Framework info sent on subscribe, carrying the assigned identity.
    pub framework_info: FrameworkInfo,

    /// `Mesos-Stream-Id` of the current subscription.
    #[serde(skip)]
    pub stream_id: Option<String>,

    /// Highest task number handed out so far.
    #[serde(default)]
    pub task_counter: u64,
}

impl Session {
    pub fn new(framework_info: FrameworkInfo) -> Self {
        Self {
            framework_info,
            stream_id: None,
            task_counter: 0,
        }
    }

    /// The assigned framework identity, if the framework has subscribed before.
    pub fn framework_id(&self) -> Option<&FrameworkId> {
        self.framework_info.framework_id()
    }

    /// The current session token, if subscribed.
    pub fn stream_id(&self) -> Option<&str> {
        self.stream_id.as_deref().filter(|s| !s.is_empty())
    }

    /// Records a successful subscribe.
    pub fn subscribed(&mut self, framework_id: FrameworkId, stream_id: String) {
        self.framework_info.id = Some(framework_id);
        self.stream_id = Some(stream_id);
    }

    /// Forgets the session token of a subscription that has ended.
    pub fn clear_stream_id(&mut self) {
        self.stream_id = None;
    }

    /// Hands out the next task number.
    pub fn next_task_number(&mut self) -> u64 {
        self.task_counter += 1;
        self.task_counter
    }
}
