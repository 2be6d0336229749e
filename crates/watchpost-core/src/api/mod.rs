//! REST API plumbing for the monitoring backend.
//!
//! All traffic goes to relative paths under the API prefix on the local
//! proxy origin; the proxy forwards it to the real backend. This module
//! provides the `HttpClient` that performs those calls with a per-request
//! deadline, the `ApiEnvelope` every backend response is wrapped in, and
//! the `ApiError` taxonomy shared by the rest of the crate.

pub mod client;
pub mod envelope;
pub mod error;
pub mod request;

pub use client::{HttpClient, HttpResponse};
pub use envelope::{ApiEnvelope, Payload};
pub use error::ApiError;
pub use request::{Method, RequestDescriptor};
