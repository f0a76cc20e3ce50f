//! Background grade refresh.
//!
//! The network fetch runs in a spawned Tokio task so it never blocks the
//! foreground loop. Each refresh sends exactly one `RefreshResult` back
//! through an MPSC channel, which the foreground drains with
//! [`GradeRefresher::check_background_tasks`] or awaits with
//! [`GradeRefresher::next_result`]. Parsing happens inside the task, right
//! after the body arrives.
//!
//! Only one refresh may be outstanding at a time: `spawn_refresh` refuses to
//! start another while one is in flight. A running refresh cannot be
//! cancelled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::api::{FetchError, GradesClient};
use crate::auth::SessionStore;
use crate::models::ParseResult;
use crate::parser::GradeHtmlParser;

/// Buffer size for the background result channel.
const CHANNEL_BUFFER_SIZE: usize = 8;

/// Outcome of one background refresh.
#[derive(Debug)]
pub enum RefreshResult {
    /// Fresh grades; replaces whatever was shown before.
    Grades(ParseResult),
    /// The portal showed its login page; the session store is already cleared.
    SessionExpired,
    /// Network, empty body or decode failure.
    Failed(FetchError),
}

pub struct GradeRefresher {
    store: Arc<SessionStore>,
    client: GradesClient,
    in_flight: Arc<AtomicBool>,
    refresh_tx: mpsc::Sender<RefreshResult>,
    refresh_rx: mpsc::Receiver<RefreshResult>,
}

impl GradeRefresher {
    pub fn new(store: Arc<SessionStore>, client: GradesClient) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        Self {
            store,
            client,
            in_flight: Arc::new(AtomicBool::new(false)),
            refresh_tx: tx,
            refresh_rx: rx,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Start a refresh in the background. Must be called inside a Tokio runtime.
    ///
    /// Returns `false` without doing anything if a refresh is already running.
    pub fn spawn_refresh(&self) -> bool {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            debug!("Refresh already in flight, not starting another");
            return false;
        }

        info!("Starting background grades refresh");
        let store = Arc::clone(&self.store);
        let client = self.client.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let tx = self.refresh_tx.clone();

        tokio::spawn(async move {
            let result = Self::execute_refresh(&client, &store).await;
            // Cleared before delivery so the receiver may start the next one
            in_flight.store(false, Ordering::Release);
            Self::send_result(&tx, result).await;
        });

        true
    }

    pub fn is_refreshing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Drain every result that has arrived, without waiting.
    pub fn check_background_tasks(&mut self) -> Vec<RefreshResult> {
        let mut results = Vec::new();
        while let Ok(result) = self.refresh_rx.try_recv() {
            results.push(result);
        }
        results
    }

    /// Wait for the next result.
    pub async fn next_result(&mut self) -> Option<RefreshResult> {
        self.refresh_rx.recv().await
    }

    async fn execute_refresh(client: &GradesClient, store: &SessionStore) -> RefreshResult {
        match client.fetch(store).await {
            Ok(document) => {
                let grades = GradeHtmlParser::parse(&document);
                info!(subjects = grades.len(), "Grades refreshed");
                RefreshResult::Grades(grades)
            }
            Err(FetchError::SessionExpired) => {
                warn!("Session expired during refresh");
                RefreshResult::SessionExpired
            }
            Err(e) => {
                warn!(error = %e, "Grades refresh failed");
                RefreshResult::Failed(e)
            }
        }
    }

    /// Helper to send refresh results, logging any channel errors
    async fn send_result(tx: &mpsc::Sender<RefreshResult>, result: RefreshResult) {
        if let Err(e) = tx.send(result).await {
            error!(error = %e, "Failed to send refresh result - channel closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Credential, Session};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    const PAGE: &str = concat!(
        r#"<td colspan="48" class="registro redtext open_sans_condensed_bold font_size_20" align="center" style="padding:20px;" >FISICA</td></tr>"#,
        r#"<tr><td><span class="voto_data cella_data font_size_11" style="">14/01/2025</span></td>"#,
        r#"<td><p align="center" class="s_reg_testo cella_trattino" style="height:40px; line-height:40px; border:0; margin:0; padding:0;font-weight:bold; font-size:22px;">6,5</p></td></tr>"#,
    );

    /// Answer one request with `body`, but only after `release` fires.
    async fn serve_after(body: &'static str, release: oneshot::Receiver<()>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let _ = release.await;

            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        url
    }

    fn logged_in_store(dir: &tempfile::TempDir) -> Arc<SessionStore> {
        let store = SessionStore::new(dir.path().to_path_buf());
        let session: Session = vec![Credential::new("PHPSESSID", "abc", "web.spaggiari.eu")]
            .into_iter()
            .collect();
        store.replace(session).unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_refresh_delivers_grades_once() {
        let dir = tempfile::tempdir().unwrap();
        let (release, wait) = oneshot::channel();
        let url = serve_after(PAGE, wait).await;
        let client = GradesClient::new().unwrap().with_url(url);
        let mut refresher = GradeRefresher::new(logged_in_store(&dir), client);

        assert!(refresher.spawn_refresh());
        assert!(refresher.is_refreshing());
        // Second request while the first is outstanding is refused
        assert!(!refresher.spawn_refresh());
        assert!(refresher.check_background_tasks().is_empty());

        release.send(()).unwrap();
        match refresher.next_result().await {
            Some(RefreshResult::Grades(grades)) => {
                assert_eq!(grades["FISICA"].len(), 1);
                assert_eq!(grades["FISICA"][0].value, 6.5);
            }
            other => panic!("unexpected result: {:?}", other),
        }

        assert!(!refresher.is_refreshing());
        assert!(refresher.check_background_tasks().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_session_expired_clears_store() {
        let dir = tempfile::tempdir().unwrap();
        let (release, wait) = oneshot::channel();
        let url = serve_after("<label>Codice Personale / Email</label>", wait).await;
        let client = GradesClient::new().unwrap().with_url(url);
        let mut refresher = GradeRefresher::new(logged_in_store(&dir), client);

        assert!(refresher.spawn_refresh());
        release.send(()).unwrap();

        assert!(matches!(refresher.next_result().await, Some(RefreshResult::SessionExpired)));
        assert!(!refresher.store().is_authenticated());
    }

    #[tokio::test]
    async fn test_refresh_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (release, wait) = oneshot::channel();
        let url = serve_after("", wait).await;
        let client = GradesClient::new().unwrap().with_url(url);
        let mut refresher = GradeRefresher::new(logged_in_store(&dir), client);

        assert!(refresher.spawn_refresh());
        release.send(()).unwrap();

        assert!(matches!(
            refresher.next_result().await,
            Some(RefreshResult::Failed(FetchError::EmptyBody))
        ));
        assert!(refresher.store().is_authenticated());
    }
}
