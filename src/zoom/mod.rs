//! Zoom integration: server-to-server OAuth token cache and the meetings API.

pub mod client;
pub mod token;
pub mod types;

pub use client::{MeetingProvider, ZoomClient};
pub use token::{AccessToken, TokenCache};
pub use types::MeetingResource;
