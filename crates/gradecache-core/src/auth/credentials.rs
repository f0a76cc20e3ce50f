use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single portal cookie.
///
/// Fields are fixed at construction; a changed cookie is a new `Credential`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    name: String,
    value: String,
    domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            expires: None,
        }
    }

    /// Same credential with an expiry timestamp.
    pub fn with_expiry(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn expires(&self) -> Option<DateTime<Utc>> {
        self.expires
    }

    /// Session cookies (no expiry) never expire on their own.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires.map(|at| at < now).unwrap_or(false)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    fn key(&self) -> (String, String) {
        (self.name.clone(), self.domain.clone())
    }
}

/// The set of cookies proving a portal login, keyed by name and domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Credential>", into = "Vec<Credential>")]
pub struct Session {
    credentials: BTreeMap<(String, String), Credential>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a credential, returning the one it replaced (same name and domain).
    pub fn insert(&mut self, credential: Credential) -> Option<Credential> {
        self.credentials.insert(credential.key(), credential)
    }

    pub fn get(&self, name: &str, domain: &str) -> Option<&Credential> {
        self.credentials.get(&(name.to_string(), domain.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Credential> {
        self.credentials.values()
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Drop every credential that expired before `now`. Returns how many were dropped.
    pub fn prune_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.credentials.len();
        self.credentials.retain(|_, c| !c.is_expired_at(now));
        before - self.credentials.len()
    }

    /// `Cookie` request header value (`a=1; b=2`), or `None` for an empty session.
    pub fn cookie_header(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        let pairs: Vec<String> = self
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();
        Some(pairs.join("; "))
    }

    /// Build a session from a browser `Cookie` header string.
    ///
    /// Pairs without `=` or with an empty name are skipped.
    pub fn from_cookie_header(header: &str, domain: &str) -> Self {
        let mut session = Self::new();
        for pair in header.split(';') {
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            session.insert(Credential::new(name, value.trim(), domain));
        }
        session
    }
}

impl From<Vec<Credential>> for Session {
    fn from(credentials: Vec<Credential>) -> Self {
        credentials.into_iter().collect()
    }
}

impl From<Session> for Vec<Credential> {
    fn from(session: Session) -> Self {
        session.credentials.into_values().collect()
    }
}

impl FromIterator<Credential> for Session {
    fn from_iter<I: IntoIterator<Item = Credential>>(iter: I) -> Self {
        let mut session = Session::new();
        for credential in iter {
            session.insert(credential);
        }
        session
    }
}
