use thiserror::Error;

/// Why a grades fetch did not produce a document.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Session expired - please log in again")]
    SessionExpired,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Empty response from the portal")]
    EmptyBody,

    #[error("Response is not valid UTF-8: {0}")]
    DecodeError(#[from] std::string::FromUtf8Error),
}

impl FetchError {
    /// True when the user has to log in again.
    pub fn requires_login(&self) -> bool {
        matches!(self, FetchError::SessionExpired)
    }
}
