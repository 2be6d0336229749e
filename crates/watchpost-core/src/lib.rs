//! Core library for watchpost, a server-monitoring dashboard client.
//!
//! The crate is organised leaves first:
//!
//! - `api`: `HttpClient` with per-request deadlines, the `ApiEnvelope`
//!   response shape and the `ApiError` taxonomy
//! - `auth`: `SessionStore` backed by durable key-value storage and the
//!   `AuthGateway` that owns the login/logout/refresh lifecycle
//! - `guard`: `RouteGuard`, the navigation interceptor for the views
//! - `endpoints`: the logical endpoint table and path templating
//! - `monitor`: typed helpers for the metrics and admin endpoints
//! - `config`: configuration file plus environment overrides

pub mod api;
pub mod auth;
pub mod config;
pub mod endpoints;
pub mod guard;
pub mod monitor;
pub mod utils;

pub use api::{ApiEnvelope, ApiError, HttpClient, Method, Payload, RequestDescriptor};
pub use auth::{AuthGateway, Outcome, Session, SessionStore};
pub use config::Config;
pub use endpoints::Endpoint;
pub use guard::{Navigation, Route, RouteGuard};
pub use monitor::MonitorClient;
