//! Configuration for the scheduler driver.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use mesos_proto::FrameworkInfo;

use crate::policy::{DriverPolicy, ReconcilePolicy, RevivePolicy};

/// Path of the scheduler endpoint on the master.
pub const SCHEDULER_PATH: &str = "/api/v1/scheduler";

/// Driver configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Where and how to reach the master.
    pub master: MasterConfig,

    /// How this framework presents itself to the master.
    pub framework: FrameworkConfig,

    /// Snapshot file for session and task state.
    pub state_file: PathBuf,

    /// Driver behavior knobs.
    pub policy: DriverPolicy,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

/// Master connection settings.
#[derive(Debug, Clone)]
pub struct MasterConfig {
    /// `host:port` of the leading master.
    pub address: String,

    /// Use HTTPS.
    pub ssl: bool,

    /// Basic auth principal.
    pub username: Option<String>,

    /// Basic auth secret.
    pub password: Option<String>,

    /// Accept self-signed or otherwise invalid master certificates.
    pub accept_invalid_certs: bool,

    /// Request timeout for individual calls. Never applied to the subscription.
    pub call_timeout: Duration,
}

impl MasterConfig {
    /// Creates settings for a plain-HTTP master with no credentials.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ssl: false,
            username: None,
            password: None,
            accept_invalid_certs: false,
            call_timeout: Duration::from_secs(30),
        }
    }

    /// Base URL of the master, without a trailing slash.
    pub fn base_url(&self) -> String {
        let scheme = if self.ssl { "https" } else { "http" };
        format!("{}://{}", scheme, self.address.trim_end_matches('/'))
    }

    /// Full URL of the scheduler endpoint.
    pub fn scheduler_url(&self) -> String {
        format!("{}{}", self.base_url(), SCHEDULER_PATH)
    }
}

/// Framework identity settings.
#[derive(Debug, Clone)]
pub struct FrameworkConfig {
    pub name: String,
    pub user: String,
    pub role: String,
    pub hostname: Option<String>,
    pub principal: Option<String>,
    /// How long the master keeps tasks alive while the framework is away.
    pub failover_timeout: Option<Duration>,
}

impl FrameworkConfig {
    /// Builds the framework info sent on subscribe.
    ///
    /// The identity is left empty; the persisted one is filled in on restore.
    pub fn framework_info(&self) -> FrameworkInfo {
        FrameworkInfo {
            user: self.user.clone(),
            name: self.name.clone(),
            id: None,
            failover_timeout: self.failover_timeout.map(|d| d.as_secs_f64()),
            checkpoint: Some(true),
            role: Some(self.role.clone()),
            hostname: self.hostname.clone(),
            principal: self.principal.clone(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let call_timeout_secs: u64 = env_parse("MESOS_CALL_TIMEOUT_SECS", 30)?;

        let master = MasterConfig {
            address: std::env::var("MESOS_MASTER")
                .unwrap_or_else(|_| "127.0.0.1:5050".to_string()),
            ssl: env_bool("MESOS_SSL", false),
            username: std::env::var("MESOS_USERNAME").ok().filter(|s| !s.is_empty()),
            password: std::env::var("MESOS_PASSWORD").ok().filter(|s| !s.is_empty()),
            accept_invalid_certs: env_bool("MESOS_TLS_INSECURE", false),
            call_timeout: Duration::from_secs(call_timeout_secs),
        };

        let failover_timeout = std::env::var("FRAMEWORK_FAILOVER_TIMEOUT_SECS")
            .ok()
            .map(|s| {
                s.parse::<u64>()
                    .map(Duration::from_secs)
                    .with_context(|| format!("Invalid FRAMEWORK_FAILOVER_TIMEOUT_SECS: {s}"))
            })
            .transpose()?;

        let framework = FrameworkConfig {
            name: std::env::var("FRAMEWORK_NAME")
                .unwrap_or_else(|_| "mesos-scheduler".to_string()),
            user: std::env::var("FRAMEWORK_USER").unwrap_or_else(|_| "root".to_string()),
            role: std::env::var("FRAMEWORK_ROLE").unwrap_or_else(|_| "*".to_string()),
            hostname: std::env::var("FRAMEWORK_HOSTNAME").ok(),
            principal: std::env::var("FRAMEWORK_PRINCIPAL").ok(),
            failover_timeout,
        };

        let state_file = std::env::var("FRAMEWORK_STATE_FILE")
            .unwrap_or_else(|_| "/var/lib/mesos-scheduler/framework.json".to_string())
            .into();

        let policy = DriverPolicy {
            revive: if env_bool("REVIVE_ON_UPDATE", true) {
                RevivePolicy::OnStatusUpdate
            } else {
                RevivePolicy::Never
            },
            reconcile: if env_bool("RECONCILE_ON_UPDATE", false) {
                ReconcilePolicy::OnStatusUpdate
            } else {
                ReconcilePolicy::Startup
            },
            heartbeat_misses: env_parse("HEARTBEAT_MISSES", 3)?,
        };

        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            master,
            framework,
            state_file,
            policy,
            log_level,
        })
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| parse_bool(&v))
        .unwrap_or(default)
}

fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

fn env_parse<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(v) => v
            .parse()
            .with_context(|| format!("Invalid {name}: {v}")),
        Err(_) => Ok(default),
    }
}
