//! Read-only lookups against the master's introspection endpoints.
//!
//! These answers are not authoritative; the subscription stream is. They
//! share the call client's transport settings and credentials.

use mesos_proto::{AgentId, ContainerStatus, TaskId};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error};

use crate::client::SchedulerClient;
use crate::error::{DriverError, Result};

/// Resource totals as the master summarizes them.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ResourceSummary {
    #[serde(default)]
    pub cpus: f64,
    #[serde(default)]
    pub mem: f64,
    #[serde(default)]
    pub disk: f64,
    #[serde(default)]
    pub gpus: f64,
    /// Port ranges in the master's text form, e.g. `[31000-32000]`.
    #[serde(default)]
    pub ports: Option<String>,
}

/// One agent as reported by `/master/slaves`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgentSummary {
    pub id: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub resources: ResourceSummary,
    #[serde(default)]
    pub used_resources: ResourceSummary,
    #[serde(default)]
    pub unreserved_resources: ResourceSummary,
    #[serde(default)]
    pub active: bool,
}

/// Where a task runs and which addresses it was given.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskNetwork {
    pub task_id: TaskId,
    pub agent_id: AgentId,
    pub state: String,
    pub ip_addresses: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AgentsResponse {
    #[serde(default)]
    slaves: Vec<AgentSummary>,
}

#[derive(Debug, Deserialize)]
struct TasksResponse {
    #[serde(default)]
    tasks: Vec<MasterTask>,
}

#[derive(Debug, Deserialize)]
struct MasterTask {
    id: String,
    #[serde(default)]
    slave_id: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    statuses: Vec<MasterTaskStatus>,
}

#[derive(Debug, Deserialize)]
struct MasterTaskStatus {
    #[serde(default)]
    timestamp: f64,
    #[serde(default)]
    container_status: Option<ContainerStatus>,
}

impl MasterTask {
    fn into_network(self) -> TaskNetwork {
        let latest = self
            .statuses
            .iter()
            .filter(|s| s.container_status.is_some())
            .max_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

        let ip_addresses = latest
            .and_then(|s| s.container_status.as_ref())
            .map(|cs| {
                cs.network_infos
                    .iter()
                    .flat_map(|n| n.ip_addresses.iter())
                    .filter_map(|ip| ip.ip_address.clone())
                    .collect()
            })
            .unwrap_or_default();

        TaskNetwork {
            task_id: TaskId::new(self.id),
            agent_id: AgentId::new(self.slave_id),
            state: self.state,
            ip_addresses,
        }
    }
}

impl SchedulerClient {
    /// Looks up one agent by identifier.
    pub async fn agent(&self, agent_id: &AgentId) -> Result<Option<AgentSummary>> {
        let response: AgentsResponse = self
            .master_get("/master/slaves", ("slave_id", agent_id.as_str()))
            .await?;
        Ok(response
            .slaves
            .into_iter()
            .find(|a| a.id == agent_id.as_str()))
    }

    /// Looks up a task's agent and network addresses.
    pub async fn task_network(&self, task_id: &TaskId) -> Result<Option<TaskNetwork>> {
        let response: TasksResponse = self
            .master_get("/master/tasks", ("task_id", task_id.as_str()))
            .await?;
        Ok(response
            .tasks
            .into_iter()
            .find(|t| t.id == task_id.as_str())
            .map(MasterTask::into_network))
    }

    async fn master_get<T: DeserializeOwned>(&self, path: &str, query: (&str, &str)) -> Result<T> {
        let url = format!("{}{}", self.base_url(), path);
        debug!(url = %url, key = query.0, value = query.1, "Querying master");

        let request = self.http().get(&url).query(&[query]);
        let response = self.authenticated(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(url = %url, status = %status, body = %body, "Master query failed");
            return Err(DriverError::Query {
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_summary_decoding() {
        let json = r#"{
            "slaves": [{
                "id": "a1-S0",
                "hostname": "node-1",
                "port": 5051,
                "pid": "slave(1)@10.0.0.1:5051",
                "resources": {"cpus": 4.0, "mem": 7680.0, "disk": 10000.0, "ports": "[31000-32000]"},
                "used_resources": {"cpus": 1.0, "mem": 512.0},
                "active": true
            }],
            "recovered_slaves": []
        }"#;

        let response: AgentsResponse = serde_json::from_str(json).unwrap();
        let agent = &response.slaves[0];
        assert_eq!(agent.hostname, "node-1");
        assert_eq!(agent.resources.cpus, 4.0);
        assert_eq!(agent.resources.ports.as_deref(), Some("[31000-32000]"));
        assert_eq!(agent.used_resources.mem, 512.0);
        assert_eq!(agent.unreserved_resources, ResourceSummary::default());
        assert!(agent.active);
    }

    #[test]
    fn test_task_network_uses_latest_container_status() {
        let json = r#"{
            "tasks": [{
                "id": "web_3",
                "name": "web",
                "slave_id": "a1-S0",
                "state": "TASK_RUNNING",
                "statuses": [
                    {"state": "TASK_STARTING", "timestamp": 1.0},
                    {"state": "TASK_RUNNING", "timestamp": 3.0, "container_status": {
                        "network_infos": [{"ip_addresses": [{"ip_address": "172.17.0.4"}]}]
                    }},
                    {"state": "TASK_RUNNING", "timestamp": 2.0, "container_status": {
                        "network_infos": [{"ip_addresses": [{"ip_address": "172.17.0.2"}]}]
                    }}
                ]
            }]
        }"#;

        let response: TasksResponse = serde_json::from_str(json).unwrap();
        let network = response.tasks.into_iter().next().unwrap().into_network();

        assert_eq!(network.task_id.as_str(), "web_3");
        assert_eq!(network.agent_id.as_str(), "a1-S0");
        assert_eq!(network.state, "TASK_RUNNING");
        assert_eq!(network.ip_addresses, vec!["172.17.0.4".to_string()]);
    }

    #[test]
    fn test_task_without_container_status() {
        let json = r#"{"tasks": [{"id": "web_1", "slave_id": "a1", "state": "TASK_STAGING"}]}"#;
        let response: TasksResponse = serde_json::from_str(json).unwrap();
        let network = response.tasks.into_iter().next().unwrap().into_network();
        assert!(network.ip_addresses.is_empty());
    }
}
