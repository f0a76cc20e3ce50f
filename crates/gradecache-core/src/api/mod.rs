//! HTTP client module for the school portal.
//!
//! This module provides the `GradesClient` for retrieving the grades
//! listing page with the stored session cookies.
//!
//! The portal has no API: the page is HTML and a rejected session is only
//! recognisable by the login form appearing in place of the grades.

pub mod client;
pub mod error;

pub use client::{FetchOutcome, GradesClient, PORTAL_DOMAIN, SESSION_EXPIRED_MARKER};
pub use error::FetchError;
