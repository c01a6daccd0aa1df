//! The pose protocol: one round trip returning a consistent posed mesh and
//! posed skeleton.
//!
//! - [`wire`]: JSON request/response schema
//! - [`PoseService`]: stateless server side (solve + skin)
//! - [`PoseClient`]: coalescing client with stale-response protection
//! - [`PoseTransport`]: in-process or HTTP delivery

pub mod client;
pub mod queue;
pub mod service;
pub mod wire;

#[cfg(feature = "http")]
pub use client::HttpTransport;
pub use client::{ClientEvent, LocalTransport, PoseClient, PoseTransport, PosedFrame, ResponseCallback};
pub use queue::{Completion, Dispatch, QueueState, RequestQueue};
pub use service::PoseService;
pub use wire::{BonesResponse, PoseRequest, PoseResponse, ResponseStatus, Vec3List, WireBone, WireWeights};
