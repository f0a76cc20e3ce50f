//! Core library for gradecache.
//!
//! Retrieves the grades page of the school portal with a stored session,
//! extracts dated grades per subject, and computes the grade still needed to
//! reach a passing average.
//!
//! The pipeline, leaves first:
//!
//! - [`auth::SessionStore`]: persisted portal cookies
//! - [`api::GradesClient`]: one authenticated fetch, classified
//! - [`parser::GradeHtmlParser`]: page to grades per subject
//! - [`solver::required_next`]: grade needed for the target mean
//!
//! [`refresh::GradeRefresher`] runs fetch and parse in the background, and
//! [`cache::CacheManager`] keeps the last result and the manual ledgers.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;
pub mod parser;
pub mod refresh;
pub mod solver;
pub mod utils;

pub use api::{FetchError, FetchOutcome, GradesClient};
pub use auth::{Credential, Session, SessionStore};
pub use cache::{CacheManager, GradeLedger, LedgerError};
pub use config::Config;
pub use models::{GradeRecord, ParseResult, SubjectSummary};
pub use parser::GradeHtmlParser;
pub use refresh::{GradeRefresher, RefreshResult};
pub use solver::{required_next, Unsolvable, DEFAULT_TARGET};
