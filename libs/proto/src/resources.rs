//! Resources and offers.

use serde::{Deserialize, Serialize};

use crate::ids::{AgentId, FrameworkId, OfferId};

/// Resource name the master uses for CPU shares.
pub const CPUS: &str = "cpus";
/// Resource name the master uses for memory, in MiB.
pub const MEM: &str = "mem";
/// Resource name the master uses for scratch disk, in MiB.
pub const DISK: &str = "disk";
/// Resource name the master uses for host port ranges.
pub const PORTS: &str = "ports";

/// Value type of a resource entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueType {
    Scalar,
    Ranges,
    Set,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scalar {
    pub value: f64,
}

/// Inclusive range of integer values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub begin: u64,
    pub end: u64,
}

impl Range {
    /// Returns true if `value` lies within the inclusive bounds.
    pub fn contains(&self, value: u64) -> bool {
        self.begin <= value && value <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Ranges {
    #[serde(default)]
    pub range: Vec<Range>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Set {
    #[serde(default)]
    pub item: Vec<String>,
}

/// A named resource entry, as offered by the master or requested by a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scalar: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranges: Option<Ranges>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<Set>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Resource {
    /// Creates a scalar resource entry.
    pub fn scalar(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            kind: ValueType::Scalar,
            scalar: Some(Scalar { value }),
            ranges: None,
            set: None,
            role: None,
        }
    }

    /// Creates a ranges resource entry from inclusive `(begin, end)` pairs.
    pub fn ranges(name: impl Into<String>, ranges: impl IntoIterator<Item = (u64, u64)>) -> Self {
        Self {
            name: name.into(),
            kind: ValueType::Ranges,
            scalar: None,
            ranges: Some(Ranges {
                range: ranges
                    .into_iter()
                    .map(|(begin, end)| Range { begin, end })
                    .collect(),
            }),
            set: None,
            role: None,
        }
    }

    /// Returns the scalar quantity if this is a scalar entry.
    pub fn scalar_value(&self) -> Option<f64> {
        match self.kind {
            ValueType::Scalar => self.scalar.map(|s| s.value),
            _ => None,
        }
    }

    /// Returns the advertised ranges if this is a ranges entry.
    pub fn range_values(&self) -> Option<&[Range]> {
        match self.kind {
            ValueType::Ranges => self.ranges.as_ref().map(|r| r.range.as_slice()),
            _ => None,
        }
    }
}

/// A time-boxed grant of resources on one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    #[serde(default)]
    pub framework_id: FrameworkId,
    pub agent_id: AgentId,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

/// Offer refusal filter attached to accept/decline calls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Filters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refuse_seconds: Option<f64>,
}
