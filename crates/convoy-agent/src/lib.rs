//! Convoy Agent
//!
//! Device side of the fleet deployment pipeline: the periodic catalog sync,
//! the single-flight install queue with bounded retries, the local
//! installed-app registry, and the outbound store client.

pub mod client;
pub mod config;
pub mod context;
pub mod installer;
pub mod registry;
pub mod scheduler;
pub mod worker;
