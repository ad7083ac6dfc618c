//! Convoy Store
//!
//! Server side of the fleet deployment pipeline: the application catalog,
//! the idempotent per-(app, robot) installation-state store with its
//! append-only transition log, escalation on repeated failure, and the
//! HTTP surface robots talk to.

pub mod api;
pub mod catalog;
pub mod config;
pub mod db;
pub mod log;
pub mod notify;
pub mod state;
