//! Test harness for scheduler driver integration tests.
//!
//! Spawns an in-process mock master that serves the scheduler endpoint and
//! the introspection endpoints, and records every call it receives.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use mesos_proto::{Call, CallType, FrameworkInfo};
use mesos_scheduler::config::MasterConfig;
use mesos_scheduler::state::SharedState;
use mesos_scheduler::stream::frame;
use mesos_scheduler::SchedulerClient;
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub const STREAM_ID: &str = "stream-0f3c";
pub const USERNAME: &str = "scheduler";
pub const PASSWORD: &str = "s3cret";

/// A call as the master received it.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub call: Call,
    pub stream_id: Option<String>,
    pub authorization: Option<String>,
}

struct MasterState {
    calls: Mutex<Vec<RecordedCall>>,
    events: Mutex<Vec<Value>>,
    subscribe_status: AtomicU16,
    call_status: AtomicU16,
    call_error_body: Mutex<String>,
}

#[allow(dead_code)]
pub struct MockMaster {
    pub addr: SocketAddr,
    state: Arc<MasterState>,
}

#[allow(dead_code)]
impl MockMaster {
    /// Starts a master whose subscription delivers `events` and then closes.
    pub async fn spawn(events: Vec<Value>) -> Self {
        let state = Arc::new(MasterState {
            calls: Mutex::new(Vec::new()),
            events: Mutex::new(events),
            subscribe_status: AtomicU16::new(200),
            call_status: AtomicU16::new(202),
            call_error_body: Mutex::new(String::new()),
        });

        let app = Router::new()
            .route("/api/v1/scheduler", post(scheduler))
            .route("/master/slaves", get(slaves))
            .route("/master/tasks", get(tasks))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock master");
        let addr = listener.local_addr().expect("mock master address");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self { addr, state }
    }

    pub fn master_config(&self) -> MasterConfig {
        let mut config = MasterConfig::new(self.addr.to_string());
        config.username = Some(USERNAME.to_string());
        config.password = Some(PASSWORD.to_string());
        config.call_timeout = Duration::from_secs(5);
        config
    }

    pub fn client(&self, state: Arc<SharedState>) -> Arc<SchedulerClient> {
        Arc::new(SchedulerClient::new(&self.master_config(), state).expect("build client"))
    }

    /// Answers every non-subscribe call with `status` and `body`.
    pub fn fail_calls(&self, status: u16, body: &str) {
        self.state.call_status.store(status, Ordering::SeqCst);
        *self.state.call_error_body.lock().unwrap() = body.to_string();
    }

    pub fn reject_subscribe(&self, status: u16) {
        self.state.subscribe_status.store(status, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<CallType> {
        self.calls().iter().map(|c| c.call.kind).collect()
    }
}

async fn scheduler(
    State(state): State<Arc<MasterState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let call: Call = match serde_json::from_slice(&body) {
        Ok(call) => call,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let kind = call.kind;
    state.calls.lock().unwrap().push(RecordedCall {
        call,
        stream_id: header("mesos-stream-id"),
        authorization: header("authorization"),
    });

    if kind == CallType::Subscribe {
        let status = state.subscribe_status.load(Ordering::SeqCst);
        if status != 200 {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::UNAUTHORIZED);
            return (status, "subscribe refused").into_response();
        }

        let mut stream = Vec::new();
        for event in state.events.lock().unwrap().iter() {
            stream.extend_from_slice(&frame(event.to_string().as_bytes()));
        }
        return (
            StatusCode::OK,
            [
                ("Mesos-Stream-Id", STREAM_ID),
                ("Content-Type", "application/recordio"),
            ],
            Body::from(stream),
        )
            .into_response();
    }

    let status = StatusCode::from_u16(state.call_status.load(Ordering::SeqCst))
        .unwrap_or(StatusCode::ACCEPTED);
    if status == StatusCode::ACCEPTED {
        return status.into_response();
    }
    let body = state.call_error_body.lock().unwrap().clone();
    (status, body).into_response()
}

async fn slaves(Query(query): Query<std::collections::HashMap<String, String>>) -> Json<Value> {
    let id = query.get("slave_id").cloned().unwrap_or_default();
    if id != "agent-1" {
        return Json(json!({ "slaves": [], "recovered_slaves": [] }));
    }
    Json(json!({
        "slaves": [{
            "id": "agent-1",
            "hostname": "node-1.cluster",
            "port": 5051,
            "resources": {"cpus": 8.0, "mem": 15360.0, "disk": 100000.0, "ports": "[31000-32000]"},
            "used_resources": {"cpus": 0.5, "mem": 256.0},
            "unreserved_resources": {"cpus": 8.0, "mem": 15360.0},
            "active": true
        }]
    }))
}

async fn tasks(Query(query): Query<std::collections::HashMap<String, String>>) -> Json<Value> {
    let id = query.get("task_id").cloned().unwrap_or_default();
    if id != "web_1" {
        return Json(json!({ "tasks": [] }));
    }
    Json(json!({
        "tasks": [{
            "id": "web_1",
            "name": "web",
            "slave_id": "agent-1",
            "state": "TASK_RUNNING",
            "statuses": [{
                "state": "TASK_RUNNING",
                "timestamp": 1700000000.5,
                "container_status": {
                    "network_infos": [{"ip_addresses": [{"ip_address": "10.1.2.3"}]}]
                }
            }]
        }]
    }))
}

/// Framework identity used across tests.
#[allow(dead_code)]
pub fn framework_info() -> FrameworkInfo {
    FrameworkInfo {
        user: "root".to_string(),
        name: "harness".to_string(),
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn subscribed_event(framework_id: &str, heartbeat: f64) -> Value {
    json!({
        "type": "SUBSCRIBED",
        "subscribed": {
            "framework_id": {"value": framework_id},
            "heartbeat_interval_seconds": heartbeat
        }
    })
}

#[allow(dead_code)]
pub fn update_event(task_id: &str, state: &str, uuid: Option<&str>) -> Value {
    let mut status = json!({
        "task_id": {"value": task_id},
        "state": state,
        "agent_id": {"value": "agent-1"}
    });
    if let Some(uuid) = uuid {
        status["uuid"] = json!(uuid);
    }
    json!({ "type": "UPDATE", "update": { "status": status } })
}
