//! Framework registration info.

use serde::{Deserialize, Serialize};

use crate::ids::FrameworkId;

/// Describes this framework to the master.
///
/// `id` is empty until the first successful subscribe; afterwards it is
/// persisted and sent back so the master treats a restart as a failover.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameworkInfo {
    pub user: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<FrameworkId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failover_timeout: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<String>,
}

impl FrameworkInfo {
    /// Returns the assigned identity, if the framework has subscribed before.
    pub fn framework_id(&self) -> Option<&FrameworkId> {
        self.id.as_ref().filter(|id| !id.is_empty())
    }
}
