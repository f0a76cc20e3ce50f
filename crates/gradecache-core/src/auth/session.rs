use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info, warn};

use super::Session;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Scratch file written before being renamed over `SESSION_FILE`.
const SESSION_TMP_FILE: &str = "session.json.tmp";

/// Owner of the portal session.
///
/// The session is read from disk on first access and written back on every
/// change. All methods take `&self` and serialize through an internal lock,
/// so a store can be shared (`Arc<SessionStore>`) between the foreground
/// code and a background fetch that may clear it.
pub struct SessionStore {
    cache_dir: PathBuf,
    /// `None` until the first access loads it from disk.
    state: Mutex<Option<Session>>,
}

impl SessionStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            state: Mutex::new(None),
        }
    }

    /// Current session, loading it from disk on first access.
    ///
    /// Credentials that expired before the load are dropped. An unreadable
    /// session file counts as no session.
    pub fn current(&self) -> Session {
        let mut state = self.lock();
        if let Some(ref session) = *state {
            return session.clone();
        }

        let session = match self.load_from_disk() {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Failed to load session, starting logged out");
                Session::new()
            }
        };
        *state = Some(session.clone());
        session
    }

    /// Replace the session in memory and on disk.
    ///
    /// The file is written to a scratch path and renamed into place, and
    /// memory is only updated once that succeeds, so a failed write leaves
    /// the previous session in effect.
    pub fn replace(&self, session: Session) -> Result<()> {
        let mut state = self.lock();
        self.persist(&session)?;
        info!(credentials = session.len(), "Session replaced");
        *state = Some(session);
        Ok(())
    }

    /// Forget the session in memory and on disk.
    pub fn clear(&self) -> Result<()> {
        let mut state = self.lock();
        *state = Some(Session::new());

        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(&path).context("Failed to remove session file")?;
        }
        info!("Session cleared");
        Ok(())
    }

    /// True when the current session holds at least one credential.
    pub fn is_authenticated(&self) -> bool {
        !self.current().is_empty()
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn load_from_disk(&self) -> Result<Session> {
        let path = self.session_path();
        if !path.exists() {
            debug!(?path, "No session file");
            return Ok(Session::new());
        }

        let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
        let mut session: Session =
            serde_json::from_str(&contents).context("Failed to parse session file")?;

        let dropped = session.prune_expired(Utc::now());
        debug!(credentials = session.len(), dropped, "Session loaded");
        Ok(session)
    }

    fn persist(&self, session: &Session) -> Result<()> {
        std::fs::create_dir_all(&self.cache_dir).context("Failed to create cache directory")?;

        let tmp = self.cache_dir.join(SESSION_TMP_FILE);
        let contents = serde_json::to_string_pretty(session)?;
        std::fs::write(&tmp, contents).context("Failed to write session file")?;
        std::fs::rename(&tmp, self.session_path()).context("Failed to move session file into place")?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Option<Session>> {
        // A panic while holding the lock cannot leave a half-written Session
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}
