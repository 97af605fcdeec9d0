//! Framework-side task model: what to launch and what is known about it.

use std::collections::BTreeMap;

use mesos_proto::{
    AgentId, DiscoveryInfo, DockerNetwork, NetworkInfo, Parameter, PortMapping, TaskId,
    TaskStatus, Uri, Volume,
};
use serde::{Deserialize, Serialize};

/// Container network mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkMode {
    #[default]
    Bridge,
    Host,
    None,
    User,
}

impl From<NetworkMode> for DockerNetwork {
    fn from(mode: NetworkMode) -> Self {
        match mode {
            NetworkMode::Bridge => DockerNetwork::Bridge,
            NetworkMode::Host => DockerNetwork::Host,
            NetworkMode::None => DockerNetwork::None,
            NetworkMode::User => DockerNetwork::User,
        }
    }
}

fn default_shell() -> bool {
    true
}

/// Launch specification for one containerized task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Task name; also the prefix of generated task identifiers.
    pub name: String,
    pub container_image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default = "default_shell")]
    pub shell: bool,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default)]
    pub uris: Vec<Uri>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default)]
    pub network_mode: NetworkMode,
    #[serde(default)]
    pub network_infos: Vec<NetworkInfo>,
    #[serde(default)]
    pub port_mappings: Vec<PortMapping>,
    #[serde(default)]
    pub volumes: Vec<Volume>,
    #[serde(default)]
    pub docker_parameters: Vec<Parameter>,
    #[serde(default)]
    pub privileged: bool,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery: Option<DiscoveryInfo>,
    /// CPU shares.
    pub cpus: f64,
    /// Memory in MiB.
    pub mem: f64,
    /// Scratch disk in MiB.
    #[serde(default)]
    pub disk: f64,
}

impl TaskSpec {
    /// Creates a spec with no command, ports, or resources set.
    pub fn new(name: impl Into<String>, container_image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            container_image: container_image.into(),
            command: None,
            shell: true,
            arguments: Vec::new(),
            uris: Vec::new(),
            environment: BTreeMap::new(),
            hostname: None,
            network_mode: NetworkMode::default(),
            network_infos: Vec::new(),
            port_mappings: Vec::new(),
            volumes: Vec::new(),
            docker_parameters: Vec::new(),
            privileged: false,
            labels: BTreeMap::new(),
            discovery: None,
            cpus: 0.0,
            mem: 0.0,
            disk: 0.0,
        }
    }

    /// Host ports the task binds, in declaration order.
    pub fn host_ports(&self) -> Vec<u64> {
        self.port_mappings
            .iter()
            .map(|m| u64::from(m.host_port))
            .collect()
    }

    /// What an offer must provide for this task.
    pub fn requirements(&self) -> TaskRequirements {
        TaskRequirements {
            cpus: self.cpus,
            mem: self.mem,
            ports: self.host_ports(),
        }
    }
}

/// Resource requirements an offer is matched against.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskRequirements {
    pub cpus: f64,
    pub mem: f64,
    /// Host ports; empty means no port resource is needed.
    pub ports: Vec<u64>,
}

/// Everything the framework knows about one launched task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
    /// Launch spec; absent when the record was created from a status update
    /// for a task this process did not launch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<TaskSpec>,
    /// Most recent status; absent until the first update arrives.
    #[serde(default)]
    pub status: Option<TaskStatus>,
}

impl TaskRecord {
    /// A record for a task about to be launched.
    pub fn launched(task_id: TaskId, agent_id: AgentId, spec: TaskSpec) -> Self {
        Self {
            task_id,
            agent_id: Some(agent_id),
            spec: Some(spec),
            status: None,
        }
    }

    /// The agent the task runs on, from the launch or from its last status.
    pub fn agent(&self) -> Option<&AgentId> {
        self.agent_id
            .as_ref()
            .or_else(|| self.status.as_ref().and_then(|s| s.agent_id.as_ref()))
    }
}
