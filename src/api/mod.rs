//! HTTP API for the ZenCorp backend.
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Health check
//! - `POST /api/auth/login` - Staff login
//! - `POST /api/auth/employee-login` - Employee login, marks the employee online
//! - `POST /api/auth/verify-face`, `POST /api/auth/verify-qr` - Kiosk identity checks
//! - `/api/employees`, `/api/catalogs` - Directory
//! - `/api/tasks` - Task chains and their lifecycle
//! - `/api/attendance` - Clock-in / clock-out
//! - `/api/messages`, `/api/suggestions` - Messaging
//! - `GET /api/stats/activity`, `GET /api/stats/summary` - Dashboard numbers
//! - `GET /api/events` - Change feed via SSE

mod attendance;
mod auth;
mod catalogs;
mod employees;
mod error;
mod events;
mod messages;
pub(crate) mod routes;
mod stats;
mod suggestions;
mod tasks;
pub mod types;

pub use routes::{app, serve, AppState};
