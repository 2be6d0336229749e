//! Authentication module for managing user sessions.
//!
//! This module provides:
//! - `SessionStore`: the process-wide session, written through to durable
//!   storage under three keys on every change
//! - `KeyValueStore` backends: file (default), OS keychain, in-memory
//! - `AuthGateway`: register/login/logout/refresh and the authenticated
//!   request pipeline that attaches bearer tokens

pub mod gateway;
pub mod session;
pub mod storage;

pub use gateway::{AuthGateway, Outcome, AUTH_PATH_PREFIX};
pub use session::{Credentials, Session, SessionStore};
pub use storage::{FileStore, KeyValueStore, KeyringStore, MemoryStore};
