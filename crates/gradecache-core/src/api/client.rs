//! HTTP client for the portal's grades listing.
//!
//! This module provides the `GradesClient` that performs one authenticated
//! GET of the grades page and classifies what came back.

use std::time::Duration;

use anyhow::Result;
use reqwest::{header, Client};
use tracing::{debug, info, warn};

use crate::auth::{Session, SessionStore};
use crate::config::Config;

use super::FetchError;

// ============================================================================
// Constants
// ============================================================================

/// Grades listing, ordered by subject, all periods.
pub const DEFAULT_GRADES_URL: &str =
    "https://web.spaggiari.eu/cvv/app/default/genitori_note.php?ordine=materia&filtro=tutto";

/// Cookie domain of the portal.
pub const PORTAL_DOMAIN: &str = "web.spaggiari.eu";

/// HTTP request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Text that only the portal's login form shows.
///
/// The portal answers 200 whether or not the session is valid, so this is
/// the only signal that the cookies were rejected. Matched exactly.
pub const SESSION_EXPIRED_MARKER: &str = "Codice Personale / Email";

/// Result of one fetch: the raw page on success.
pub type FetchOutcome = std::result::Result<String, FetchError>;

/// Client for the grades page.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct GradesClient {
    client: Client,
    grades_url: String,
}

impl GradesClient {
    /// Create a client for the default endpoint
    pub fn new() -> Result<Self> {
        Self::build(DEFAULT_GRADES_URL.to_string(), REQUEST_TIMEOUT_SECS)
    }

    /// Create a client using the endpoint and timeout from config
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::build(config.grades_url().to_string(), config.request_timeout_secs())
    }

    fn build(grades_url: String, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self { client, grades_url })
    }

    /// Same connection pool, different endpoint.
    pub fn with_url(&self, grades_url: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(),
            grades_url: grades_url.into(),
        }
    }

    pub fn grades_url(&self) -> &str {
        &self.grades_url
    }

    /// Fetch the grades page with the store's current session.
    ///
    /// When the portal answers with its login page the store is cleared
    /// before `SessionExpired` is returned.
    pub async fn fetch(&self, store: &SessionStore) -> FetchOutcome {
        let session = store.current();
        let outcome = self.fetch_document(&session).await;

        if let Err(FetchError::SessionExpired) = outcome {
            info!("Portal rejected the session, clearing it");
            if let Err(e) = store.clear() {
                warn!(error = %e, "Failed to clear expired session");
            }
        }

        outcome
    }

    /// Fetch the grades page with the given session, without touching any store.
    pub async fn fetch_document(&self, session: &Session) -> FetchOutcome {
        let mut request = self.client.get(&self.grades_url);
        if let Some(cookie) = session.cookie_header() {
            request = request.header(header::COOKIE, cookie);
        }

        debug!(url = %self.grades_url, credentials = session.len(), "Fetching grades page");
        let response = request.send().await?;
        debug!(status = %response.status(), "Grades page responded");

        let body = response.bytes().await?;
        Self::classify_body(body.to_vec())
    }

    /// Classify a response body.
    pub fn classify_body(body: Vec<u8>) -> FetchOutcome {
        if body.is_empty() {
            return Err(FetchError::EmptyBody);
        }

        let text = String::from_utf8(body)?;
        if Self::is_login_page(&text) {
            return Err(FetchError::SessionExpired);
        }

        Ok(text)
    }

    pub fn is_login_page(body: &str) -> bool {
        body.contains(SESSION_EXPIRED_MARKER)
    }
}
