//! Authentication module for the portal session.
//!
//! This module provides:
//! - `Credential`, `Session`: the cookie set proving a portal login
//! - `SessionStore`: load-on-first-use, persist-on-write owner of the session
//!
//! The session is persisted to disk; cookies past their expiry are dropped
//! when it is loaded.

pub mod credentials;
pub mod session;

pub use credentials::{Credential, Session};
pub use session::SessionStore;
