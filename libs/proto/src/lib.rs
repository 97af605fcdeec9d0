//! # mesos-proto
//!
//! Wire types for the Mesos v1 scheduler HTTP API, in the master's JSON
//! encoding of the v1 protobuf messages.
//!
//! ## Conventions
//!
//! - Field names are snake_case, as in the `.proto` definitions
//! - Enum values are the SCREAMING_SNAKE protobuf names
//! - Identifiers are `{"value": "..."}` messages
//! - Optional fields are omitted on encode and defaulted on decode
//!
//! ## Messages
//!
//! - [`Call`]: everything the framework sends to `/api/v1/scheduler`
//! - [`Event`]: everything the master streams back on a subscription

mod call;
mod error;
mod event;
mod framework;
mod ids;
mod resources;
mod task;

pub use call::*;
pub use error::ProtoError;
pub use event::*;
pub use framework::FrameworkInfo;
pub use ids::{AgentId, FrameworkId, OfferId, TaskId};
pub use resources::*;
pub use task::*;
