//! HTTP client for the master's scheduler endpoint.
//!
//! Two `reqwest` clients share one configuration: calls go through a client
//! with a request timeout, the subscription through one without, since its
//! response body is meant to stay open for the life of the process.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use mesos_proto::{Call, CallType};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{RequestBuilder, StatusCode};
use tracing::{debug, error, info};

use crate::config::MasterConfig;
use crate::dispatch::Dispatch;
use crate::error::{DriverError, Result};
use crate::state::SharedState;
use crate::stream::{BodyStream, EventStream, Subscription};

/// Header carrying the session token.
pub const STREAM_ID_HEADER: &str = "Mesos-Stream-Id";

const JSON: &str = "application/json";

/// Master API client.
pub struct SchedulerClient {
    http: reqwest::Client,
    stream_http: reqwest::Client,
    base_url: String,
    scheduler_url: String,
    username: Option<String>,
    password: Option<String>,
    state: Arc<SharedState>,
}

impl SchedulerClient {
    /// Create a client for the configured master.
    pub fn new(config: &MasterConfig, state: Arc<SharedState>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.call_timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        let stream_http = reqwest::Client::builder()
            .connect_timeout(config.call_timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self {
            http,
            stream_http,
            base_url: config.base_url(),
            scheduler_url: config.scheduler_url(),
            username: config.username.clone(),
            password: config.password.clone(),
            state,
        })
    }

    /// Framework state this client reads its identity and token from.
    pub fn state(&self) -> &Arc<SharedState> {
        &self.state
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn authenticated(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.username {
            Some(user) => request.basic_auth(user, self.password.as_deref()),
            None => request,
        }
    }

    /// Opens a subscription.
    ///
    /// The session token from the response is returned with the stream but
    /// not stored; it becomes current when the SUBSCRIBED event is handled.
    pub async fn subscribe(&self) -> Result<Subscription> {
        let session = self.state.session().await;
        let call = Call::subscribe(session.framework_info);
        debug!(
            url = %self.scheduler_url,
            framework_id = ?call.framework_id.as_ref().map(|id| id.as_str()),
            "Subscribing"
        );

        let request = self
            .stream_http
            .post(&self.scheduler_url)
            .header(CONTENT_TYPE, JSON)
            .header(ACCEPT, JSON)
            .json(&call);
        let response = self.authenticated(request).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Subscribe rejected");
            return Err(DriverError::Rejected {
                call: CallType::Subscribe,
                status: status.as_u16(),
                body,
            });
        }

        let stream_id = response
            .headers()
            .get(STREAM_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                DriverError::Protocol(format!("subscribe response has no {STREAM_ID_HEADER}"))
            })?;

        info!(stream_id = %stream_id, "Subscription opened");

        let body: BodyStream = response.bytes_stream().boxed();
        Ok(Subscription {
            stream_id,
            events: EventStream::new(body),
        })
    }
}

#[async_trait]
impl Dispatch for SchedulerClient {
    async fn send(&self, mut call: Call) -> Result<()> {
        let ctx = self.state.call_context().await;
        let Some(stream_id) = ctx.stream_id else {
            return Err(DriverError::NotSubscribed(call.kind));
        };
        call.framework_id = ctx.framework_id;

        let kind = call.kind;
        let body = serde_json::to_vec(&call)?;
        debug!(call = %kind, bytes = body.len(), "Sending call");

        let request = self
            .http
            .post(&self.scheduler_url)
            .header(CONTENT_TYPE, JSON)
            .header(ACCEPT, JSON)
            .header(STREAM_ID_HEADER, stream_id)
            .body(body);
        let response = self.authenticated(request).send().await?;

        let status = response.status();
        if status != StatusCode::ACCEPTED {
            let body = response.text().await.unwrap_or_default();
            error!(call = %kind, status = %status, body = %body, "Call rejected");
            return Err(DriverError::Rejected {
                call: kind,
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
