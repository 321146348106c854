//! # ZenCorp
//!
//! Backend for a small-company HR workspace.
//!
//! - `workflow`: task chains, the task state machine and role views
//! - `directory`: employees, departments and login accounts
//! - `attendance`: clock-in with face or QR verification
//! - `messaging`: direct messages and the suggestion box
//! - `stats`: dashboard aggregates
//! - `store`: in-memory and SQLite persistence behind one trait
//! - `events`: broadcast change feed
//! - `api`: axum HTTP surface

pub mod api;
pub mod attendance;
pub mod config;
pub mod directory;
pub mod events;
pub mod messaging;
pub mod stats;
pub mod store;
pub mod util;
pub mod workflow;

pub use config::Config;
pub use store::{HrStore, SharedStore};
pub use workflow::WorkflowEngine;
