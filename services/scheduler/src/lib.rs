//! Mesos Scheduler Driver Library
//!
//! Drives a framework's session with a Mesos master over the v1 scheduler
//! HTTP API: one long-lived subscription delivering framed events, and
//! independent calls posted back with the session token.
//!
//! ## Architecture
//!
//! ```text
//! Driver
//! ├── SchedulerClient   (subscribe + Dispatch over HTTP)
//! ├── EventStream       (RecordIO framing, event decoding, watchdog)
//! └── EventRouter       (per-event state changes and calls)
//!     ├── SharedState   (session + task store, persisted on every change)
//!     ├── Reconciler    (master-authoritative recovery)
//!     └── EventHandler  (application placement callbacks)
//! ```
//!
//! ## Modules
//!
//! - `stream`: RecordIO decoding of the subscription body
//! - `dispatch`: the outbound call seam and its derived calls
//! - `state`: task store, session and snapshot persistence
//! - `offers`: offer matching and batch selection
//! - `reconciler`: reconciliation and task counter recovery
//! - `launch`: task identifiers, resources and `TaskInfo`
//! - `inspect`: best-effort master introspection queries

pub mod client;
pub mod config;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod handler;
pub mod inspect;
pub mod launch;
pub mod offers;
pub mod policy;
pub mod reconciler;
pub mod router;
pub mod session;
pub mod state;
pub mod stream;
pub mod task;

// Re-export commonly used types
pub use client::SchedulerClient;
pub use config::Config;
pub use dispatch::{Dispatch, RecordingDispatcher};
pub use driver::Driver;
pub use error::{DriverError, Result};
pub use handler::EventHandler;
pub use offers::{evaluate, select_offer, OfferSelection};
pub use policy::{DriverPolicy, ReconcilePolicy, RevivePolicy};
pub use state::SharedState;
pub use task::{TaskRecord, TaskRequirements, TaskSpec};
