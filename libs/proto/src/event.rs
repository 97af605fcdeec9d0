//! Events delivered on the subscription stream.

use serde::{Deserialize, Serialize};

use crate::error::ProtoError;
use crate::ids::FrameworkId;
use crate::resources::Offer;
use crate::task::TaskStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscribed {
    pub framework_id: FrameworkId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartbeat_interval_seconds: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Offers {
    #[serde(default)]
    pub offers: Vec<Offer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub status: TaskStatus,
}

/// Raw event message as encoded by the master.
///
/// Only the payload matching `kind` is expected to be present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscribed: Option<Subscribed>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offers: Option<Offers>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<Update>,
}

/// A decoded subscription event.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Subscription accepted; carries the assigned framework identity.
    Subscribed(Subscribed),
    /// A task changed state.
    Update(TaskStatus),
    /// Liveness signal from the master.
    Heartbeat,
    /// Zero or more resource offers.
    Offers(Vec<Offer>),
    /// Any kind this driver does not act on.
    Other { kind: String },
}

impl Event {
    /// Decodes one framed record payload.
    pub fn decode(payload: &[u8]) -> Result<Self, ProtoError> {
        let message: EventMessage = serde_json::from_slice(payload)?;
        Self::try_from(message)
    }

    /// Wire name of the event kind, for logging.
    pub fn kind(&self) -> &str {
        match self {
            Event::Subscribed(_) => "SUBSCRIBED",
            Event::Update(_) => "UPDATE",
            Event::Heartbeat => "HEARTBEAT",
            Event::Offers(_) => "OFFERS",
            Event::Other { kind } => kind,
        }
    }
}

impl TryFrom<EventMessage> for Event {
    type Error = ProtoError;

    fn try_from(message: EventMessage) -> Result<Self, Self::Error> {
        let missing = |field: &'static str| ProtoError::MissingPayload {
            kind: message.kind.clone(),
            field,
        };

        match message.kind.as_str() {
            "SUBSCRIBED" => message
                .subscribed
                .clone()
                .map(Event::Subscribed)
                .ok_or_else(|| missing("subscribed")),
            "UPDATE" => message
                .update
                .clone()
                .map(|u| Event::Update(u.status))
                .ok_or_else(|| missing("update")),
            "HEARTBEAT" => Ok(Event::Heartbeat),
            // An offers event with no offers is still an offers event.
            "OFFERS" => Ok(Event::Offers(
                message.offers.clone().unwrap_or_default().offers,
            )),
            _ => Ok(Event::Other {
                kind: message.kind.clone(),
            }),
        }
    }
}
