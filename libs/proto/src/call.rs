//! Outbound calls to the master's scheduler endpoint.

use serde::{Deserialize, Serialize};

use crate::framework::FrameworkInfo;
use crate::ids::{AgentId, FrameworkId, OfferId, TaskId};
use crate::resources::Filters;
use crate::task::{TaskInfo, TaskStatus};

/// Kind of a scheduler call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallType {
    Subscribe,
    Teardown,
    Accept,
    Decline,
    Revive,
    Kill,
    Shutdown,
    Acknowledge,
    Reconcile,
    Message,
    Request,
    Suppress,
}

impl std::fmt::Display for CallType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CallType::Subscribe => "subscribe",
            CallType::Teardown => "teardown",
            CallType::Accept => "accept",
            CallType::Decline => "decline",
            CallType::Revive => "revive",
            CallType::Kill => "kill",
            CallType::Shutdown => "shutdown",
            CallType::Acknowledge => "acknowledge",
            CallType::Reconcile => "reconcile",
            CallType::Message => "message",
            CallType::Request => "request",
            CallType::Suppress => "suppress",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscribe {
    pub framework_info: FrameworkInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    Launch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Launch {
    pub task_infos: Vec<TaskInfo>,
}

/// An operation applied to accepted offers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(rename = "type")]
    pub kind: OperationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch: Option<Launch>,
}

impl Operation {
    pub fn launch(task_infos: Vec<TaskInfo>) -> Self {
        Self {
            kind: OperationType::Launch,
            launch: Some(Launch { task_infos }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accept {
    pub offer_ids: Vec<OfferId>,
    #[serde(default)]
    pub operations: Vec<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Filters>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decline {
    pub offer_ids: Vec<OfferId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Filters>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kill {
    pub task_id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledge {
    pub agent_id: AgentId,
    pub task_id: TaskId,
    pub uuid: String,
}

/// One task the master is asked to report on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileTask {
    pub task_id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Reconcile {
    #[serde(default)]
    pub tasks: Vec<ReconcileTask>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Roles {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

/// A scheduler call.
///
/// Exactly one sub-message matching `kind` is set. `framework_id` is
/// filled in by the dispatcher right before transmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework_id: Option<FrameworkId>,
    #[serde(rename = "type")]
    pub kind: CallType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscribe: Option<Subscribe>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept: Option<Accept>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decline: Option<Decline>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kill: Option<Kill>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledge: Option<Acknowledge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconcile: Option<Reconcile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revive: Option<Roles>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suppress: Option<Roles>,
}

impl Call {
    fn bare(kind: CallType) -> Self {
        Self {
            framework_id: None,
            kind,
            subscribe: None,
            accept: None,
            decline: None,
            kill: None,
            acknowledge: None,
            reconcile: None,
            revive: None,
            suppress: None,
        }
    }

    pub fn subscribe(framework_info: FrameworkInfo) -> Self {
        Self {
            framework_id: framework_info.framework_id().cloned(),
            subscribe: Some(Subscribe { framework_info }),
            ..Self::bare(CallType::Subscribe)
        }
    }

    pub fn accept(offer_ids: Vec<OfferId>, operations: Vec<Operation>) -> Self {
        Self {
            accept: Some(Accept {
                offer_ids,
                operations,
                filters: None,
            }),
            ..Self::bare(CallType::Accept)
        }
    }

    pub fn decline(offer_ids: Vec<OfferId>) -> Self {
        Self {
            decline: Some(Decline {
                offer_ids,
                filters: None,
            }),
            ..Self::bare(CallType::Decline)
        }
    }

    pub fn revive() -> Self {
        Self::bare(CallType::Revive)
    }

    pub fn suppress() -> Self {
        Self::bare(CallType::Suppress)
    }

    pub fn kill(task_id: TaskId, agent_id: Option<AgentId>) -> Self {
        Self {
            kill: Some(Kill { task_id, agent_id }),
            ..Self::bare(CallType::Kill)
        }
    }

    /// Builds the acknowledgement for a status update.
    ///
    /// Returns `None` when the status carries no delivery token or no agent,
    /// in which case the master does not expect an acknowledgement.
    pub fn acknowledge(status: &TaskStatus) -> Option<Self> {
        let uuid = status.uuid.clone()?;
        let agent_id = status.agent_id.clone()?;
        Some(Self {
            acknowledge: Some(Acknowledge {
                agent_id,
                task_id: status.task_id.clone(),
                uuid,
            }),
            ..Self::bare(CallType::Acknowledge)
        })
    }

    pub fn reconcile(tasks: Vec<ReconcileTask>) -> Self {
        Self {
            reconcile: Some(Reconcile { tasks }),
            ..Self::bare(CallType::Reconcile)
        }
    }
}
