//! Per-transaction meeting provisioning.
//!
//! `MeetingService` composes the in-process `MeetingRegistry` with a
//! `MeetingProvider`, verifying cached meetings before handing them out.

pub mod record;
pub mod registry;
pub mod service;
pub mod state;

pub use record::{MeetingRecord, TransactionId};
pub use registry::MeetingRegistry;
pub use service::MeetingService;
