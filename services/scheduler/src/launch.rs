//! Launch preparation: task identifiers, resources and `TaskInfo`.

use mesos_proto::{
    AgentId, CommandInfo, ContainerInfo, ContainerType, DockerInfo, Environment, Label, Labels,
    Offer, Resource, TaskId, TaskInfo, CPUS, DISK, MEM, PORTS,
};
use tracing::{info, warn};

use crate::dispatch::Dispatch;
use crate::error::Result;
use crate::state::SharedState;
use crate::task::{TaskRecord, TaskSpec};

/// Standard resources for a task: CPU, memory, disk when set, and one
/// single-port range per host port.
pub fn default_resources(spec: &TaskSpec) -> Vec<Resource> {
    let mut resources = vec![Resource::scalar(CPUS, spec.cpus), Resource::scalar(MEM, spec.mem)];

    if spec.disk > 0.0 {
        resources.push(Resource::scalar(DISK, spec.disk));
    }

    let mut ports = spec.host_ports();
    if !ports.is_empty() {
        ports.sort_unstable();
        ports.dedup();
        resources.push(Resource::ranges(PORTS, ports.into_iter().map(|p| (p, p))));
    }

    resources
}

/// Identifier of the `number`th task launched under `name`.
pub fn task_id(name: &str, number: u64) -> TaskId {
    TaskId::new(format!("{name}_{number}"))
}

/// Allocates a task identifier, records the launch and builds its `TaskInfo`.
///
/// The counter bump and the launch record are persisted together.
pub async fn prepare_launch(
    state: &SharedState,
    agent_id: &AgentId,
    spec: &TaskSpec,
    resources: Vec<Resource>,
) -> TaskInfo {
    let id = state
        .mutate(|s| {
            let id = task_id(&spec.name, s.session.next_task_number());
            s.tasks.record_launch(TaskRecord::launched(
                id.clone(),
                agent_id.clone(),
                spec.clone(),
            ));
            id
        })
        .await;

    info!(
        task_id = %id,
        agent_id = %agent_id,
        image = %spec.container_image,
        "Prepared task launch"
    );
    task_info(id, agent_id.clone(), spec, resources)
}

/// Launches one task on an offer with a single ACCEPT call.
///
/// The launch is recorded before the call goes out, so a task the master
/// did start is never missing from the store. If the master does not take
/// the call, the record is discarded again and the error returned.
pub async fn launch<D>(
    dispatcher: &D,
    state: &SharedState,
    offer: &Offer,
    spec: &TaskSpec,
    resources: Vec<Resource>,
) -> Result<TaskId>
where
    D: Dispatch + ?Sized,
{
    let info = prepare_launch(state, &offer.agent_id, spec, resources).await;
    let task_id = info.task_id.clone();
    if let Err(e) = dispatcher.accept(vec![offer.id.clone()], vec![info]).await {
        warn!(task_id = %task_id, offer_id = %offer.id, error = %e, "Launch not accepted");
        state.discard_launch(task_id.as_str()).await;
        return Err(e);
    }
    Ok(task_id)
}

/// Builds the `TaskInfo` for a Docker-containerized task.
pub fn task_info(
    task_id: TaskId,
    agent_id: AgentId,
    spec: &TaskSpec,
    resources: Vec<Resource>,
) -> TaskInfo {
    let command = CommandInfo {
        shell: Some(spec.shell),
        value: spec.command.clone(),
        arguments: spec.arguments.clone(),
        uris: spec.uris.clone(),
        environment: Some(Environment::from_map(&spec.environment)),
    };

    let container = ContainerInfo {
        kind: ContainerType::Docker,
        volumes: spec.volumes.clone(),
        hostname: spec.hostname.clone(),
        docker: Some(DockerInfo {
            image: spec.container_image.clone(),
            network: spec.network_mode.into(),
            port_mappings: spec.port_mappings.clone(),
            privileged: Some(spec.privileged),
            parameters: spec.docker_parameters.clone(),
            force_pull_image: None,
        }),
        network_infos: spec.network_infos.clone(),
    };

    let labels = (!spec.labels.is_empty()).then(|| Labels {
        labels: spec
            .labels
            .iter()
            .map(|(key, value)| Label {
                key: key.clone(),
                value: Some(value.clone()),
            })
            .collect(),
    });

    TaskInfo {
        name: spec.name.clone(),
        task_id,
        agent_id,
        resources,
        command: Some(command),
        container: Some(container),
        labels,
        discovery: spec.discovery.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::NetworkMode;
    use crate::dispatch::RecordingDispatcher;
    use mesos_proto::{
        CallType, DockerNetwork, FrameworkId, FrameworkInfo, OfferId, OperationType, PortMapping,
    };

    fn spec() -> TaskSpec {
        let mut spec = TaskSpec::new("web", "nginx:1.27");
        spec.cpus = 0.5;
        spec.mem = 256.0;
        spec.port_mappings = vec![
            PortMapping {
                host_port: 31002,
                container_port: 443,
                protocol: Some("tcp".to_string()),
            },
            PortMapping {
                host_port: 31001,
                container_port: 80,
                protocol: None,
            },
        ];
        spec
    }

    #[test]
    fn test_default_resources() {
        let resources = default_resources(&spec());

        assert_eq!(resources.len(), 3);
        assert_eq!(resources[0].scalar_value(), Some(0.5));
        assert_eq!(resources[1].scalar_value(), Some(256.0));
        let ports = resources[2].range_values().unwrap();
        assert_eq!(ports.len(), 2);
        assert_eq!((ports[0].begin, ports[0].end), (31001, 31001));
        assert_eq!((ports[1].begin, ports[1].end), (31002, 31002));
    }

    #[test]
    fn test_default_resources_include_disk_when_set() {
        let mut spec = TaskSpec::new("batch", "busybox");
        spec.disk = 1024.0;
        let names: Vec<_> = default_resources(&spec).into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec![CPUS, MEM, DISK]);
    }

    #[test]
    fn test_task_info_container() {
        let mut spec = spec();
        spec.network_mode = NetworkMode::Host;
        spec.command = Some("nginx -g 'daemon off;'".to_string());
        spec.labels.insert("team".to_string(), "edge".to_string());

        let info = task_info(TaskId::new("web_1"), AgentId::new("a1"), &spec, Vec::new());

        let command = info.command.unwrap();
        assert_eq!(command.shell, Some(true));
        assert_eq!(command.value.as_deref(), Some("nginx -g 'daemon off;'"));

        let docker = info.container.unwrap().docker.unwrap();
        assert_eq!(docker.image, "nginx:1.27");
        assert_eq!(docker.network, DockerNetwork::Host);
        assert_eq!(docker.port_mappings.len(), 2);

        let labels = info.labels.unwrap().labels;
        assert_eq!(labels[0].key, "team");
        assert!(info.discovery.is_none());
    }

    #[test]
    fn test_task_info_without_labels() {
        let info = task_info(TaskId::new("web_1"), AgentId::new("a1"), &spec(), Vec::new());
        assert!(info.labels.is_none());
        assert!(info.command.unwrap().value.is_none());
    }

    #[tokio::test]
    async fn test_prepare_launch_allocates_ids_and_records() {
        let state = SharedState::in_memory(FrameworkInfo::default());
        let agent = AgentId::new("agent-1");
        let spec = spec();

        let first = prepare_launch(&state, &agent, &spec, default_resources(&spec)).await;
        let second = prepare_launch(&state, &agent, &spec, default_resources(&spec)).await;

        assert_eq!(first.task_id.as_str(), "web_1");
        assert_eq!(second.task_id.as_str(), "web_2");
        assert_eq!(state.session().await.task_counter, 2);

        let record = state.get("web_1").await.unwrap();
        assert_eq!(record.agent_id, Some(agent));
        assert_eq!(record.spec, Some(spec));
        assert!(record.status.is_none());
    }

    #[tokio::test]
    async fn test_launch_sends_single_accept() {
        let state = SharedState::in_memory(FrameworkInfo::default());
        let dispatcher = RecordingDispatcher::new();
        let offer = Offer {
            id: OfferId::new("o1"),
            framework_id: FrameworkId::new("fw-1"),
            agent_id: AgentId::new("agent-1"),
            hostname: "a1".to_string(),
            resources: Vec::new(),
        };
        let spec = spec();

        let task_id = launch(&dispatcher, &state, &offer, &spec, default_resources(&spec))
            .await
            .unwrap();

        assert_eq!(task_id.as_str(), "web_1");
        let calls = dispatcher.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].kind, CallType::Accept);
        let accept = calls[0].accept.clone().unwrap();
        assert_eq!(accept.offer_ids, vec![OfferId::new("o1")]);
        assert_eq!(accept.operations.len(), 1);
        assert_eq!(accept.operations[0].kind, OperationType::Launch);
        assert!(state.get("web_1").await.is_some());
    }

    #[tokio::test]
    async fn test_rejected_launch_leaves_no_record() {
        let state = SharedState::in_memory(FrameworkInfo::default());
        let dispatcher = RecordingDispatcher::new();
        dispatcher.fail_sends(true);
        let offer = Offer {
            id: OfferId::new("o1"),
            framework_id: FrameworkId::new("fw-1"),
            agent_id: AgentId::new("agent-1"),
            hostname: "a1".to_string(),
            resources: Vec::new(),
        };
        let spec = spec();

        let result = launch(&dispatcher, &state, &offer, &spec, default_resources(&spec)).await;

        assert!(result.is_err());
        assert_eq!(dispatcher.kinds(), vec![CallType::Accept]);
        assert!(state.get("web_1").await.is_none());
        assert!(state.snapshot().await.tasks.is_empty());
        // The number stays used so a late report can never collide.
        assert_eq!(state.session().await.task_counter, 1);
    }
}
