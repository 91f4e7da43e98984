//! Hosted realtime database store over its REST API.
//!
//! Writes map onto plain HTTP verbs against `<collection>/<id>.json`:
//! `POST` for a store-assigned id, `PUT` for a full replace, `DELETE` for a
//! remove. The live feed is the database's `text/event-stream` endpoint,
//! mirrored locally by [`RecordTree`] so every event can be turned into a
//! full-collection snapshot.

pub mod sse;
mod tree;

use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use self::sse::{SseEvent, SseParser};
use self::tree::{RecordTree, StreamPayload};
use super::{Change, StoreClient, Subscription};
use crate::config::FirebaseConfig;
use crate::error::{Error, Result};
use crate::record::RecordBody;

/// Characters the database refuses in keys.
const FORBIDDEN_KEY_CHARS: &[char] = &['/', '.', '#', '$', '[', ']'];

/// Store client for a hosted realtime database.
#[derive(Debug, Clone)]
pub struct FirebaseStore {
    client: Client,
    base_url: String,
    collection: String,
    auth_token: Option<String>,
    reconnect_delay: Duration,
}

/// Response body of a `POST`: the generated child key.
#[derive(Debug, Deserialize)]
struct PushResponse {
    name: String,
}

impl FirebaseStore {
    /// Create a client for the configured database.
    ///
    /// No request is made until the first subscribe or write.
    ///
    /// # Errors
    ///
    /// Returns an error if the database URL is missing or the HTTP client
    /// cannot be built.
    pub fn new(config: &FirebaseConfig, reconnect_delay: Duration) -> Result<Self> {
        let base_url = config.database_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::ConfigValidation {
                message: "firebase.database_url must be set".to_string(),
            });
        }

        let client = Client::builder()
            .user_agent(concat!("qanda/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            collection: config.collection.trim_matches('/').to_string(),
            auth_token: config.auth_token.clone().filter(|t| !t.is_empty()),
            reconnect_delay,
        })
    }

    /// REST URL of the collection, or of one child of it.
    fn url(&self, child: Option<&str>) -> String {
        let path = match (self.collection.as_str(), child) {
            ("", None) => String::new(),
            ("", Some(child)) => child.to_string(),
            (collection, None) => collection.to_string(),
            (collection, Some(child)) => format!("{collection}/{child}"),
        };
        format!("{}/{}.json", self.base_url, path)
    }

    fn query(&self) -> Vec<(&'static str, &str)> {
        self.auth_token
            .as_deref()
            .map(|token| vec![("auth", token)])
            .unwrap_or_default()
    }

    /// Open the event stream for the collection.
    async fn connect(&self) -> Result<Response> {
        let response = self
            .client
            .get(self.url(None))
            .query(&self.query())
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| Error::transport(format!("event stream connect failed: {e}")))?;
        check_status(response).await
    }

    /// Read events from an open stream until it ends or fails.
    async fn pump(
        &self,
        mut response: Response,
        tx: &mpsc::UnboundedSender<Change>,
    ) -> Result<()> {
        let mut parser = SseParser::new();
        let mut tree = RecordTree::new();

        loop {
            let chunk = response
                .chunk()
                .await
                .map_err(|e| Error::transport(format!("event stream read failed: {e}")))?;
            let Some(chunk) = chunk else {
                return Err(Error::transport("event stream closed by server"));
            };

            for event in parser.push(&chunk) {
                if apply_event(&mut tree, &event)?
                    && tx.send(Change::Snapshot(tree.records())).is_err()
                {
                    // Subscriber is gone
                    return Ok(());
                }
            }
        }
    }

    /// Keep the subscriber fed, reconnecting after each failure.
    ///
    /// A failed connect is reported like a dropped stream, so a database
    /// that is down at startup is retried rather than refused.
    async fn stream_loop(self, tx: mpsc::UnboundedSender<Change>) {
        let mut opened = false;
        while !tx.is_closed() {
            let result = match self.connect().await {
                Ok(open) => {
                    if opened {
                        info!("Event stream reconnected");
                    } else {
                        info!(url = %self.url(None), "Event stream opened");
                        opened = true;
                    }
                    self.pump(open, &tx).await
                }
                Err(e) => Err(e),
            };

            if tx.is_closed() {
                break;
            }
            let reason = match result {
                Ok(()) => break,
                Err(e) => e.to_string(),
            };
            warn!(%reason, delay = ?self.reconnect_delay, "Event stream interrupted");
            if tx.send(Change::Interrupted { reason }).is_err() {
                break;
            }
            tokio::time::sleep(self.reconnect_delay).await;
        }
        debug!("Event stream loop stopped");
    }
}

/// Apply one stream event to the mirror.
///
/// Returns `true` if the collection may have changed.
fn apply_event(tree: &mut RecordTree, event: &SseEvent) -> Result<bool> {
    match event.event.as_str() {
        "put" => {
            let payload = StreamPayload::parse(&event.data)?;
            tree.put(&payload.path, payload.data);
            Ok(true)
        }
        "patch" => {
            let payload = StreamPayload::parse(&event.data)?;
            tree.patch(&payload.path, payload.data)?;
            Ok(true)
        }
        "keep-alive" => Ok(false),
        "cancel" => Err(Error::transport(format!(
            "event stream cancelled: {}",
            event.data
        ))),
        "auth_revoked" => Err(Error::transport("event stream credential revoked")),
        other => {
            debug!(event = other, "Ignoring unknown stream event");
            Ok(false)
        }
    }
}

fn validate_key(id: &str) -> Result<()> {
    if id.is_empty() || id.contains(FORBIDDEN_KEY_CHARS) {
        return Err(Error::payload(format!("invalid record id: {id:?}")));
    }
    Ok(())
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(http_status_error(status, body))
}

fn http_status_error(status: StatusCode, body: String) -> Error {
    Error::HttpStatus {
        status: status.as_u16(),
        body,
    }
}

#[async_trait::async_trait]
impl StoreClient for FirebaseStore {
    fn name(&self) -> &'static str {
        "firebase"
    }

    async fn subscribe(&self) -> Result<Subscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.clone().stream_loop(tx));
        Ok(Subscription::new(rx).with_task(task))
    }

    async fn write(&self, id: Option<&str>, question: &str, answer: &str) -> Result<String> {
        let body = RecordBody {
            question: question.to_string(),
            answer: answer.to_string(),
        };

        match id {
            None => {
                let response = self
                    .client
                    .post(self.url(None))
                    .query(&self.query())
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| Error::transport(format!("create failed: {e}")))?;
                let pushed: PushResponse = check_status(response).await?.json().await?;
                debug!(id = %pushed.name, "Created record");
                Ok(pushed.name)
            }
            Some(id) => {
                validate_key(id)?;
                let response = self
                    .client
                    .put(self.url(Some(id)))
                    .query(&self.query())
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| Error::transport(format!("update failed: {e}")))?;
                check_status(response).await?;
                debug!(%id, "Replaced record");
                Ok(id.to_string())
            }
        }
    }

    async fn remove(&self, id: &str) -> Result<()> {
        validate_key(id)?;
        let response = self
            .client
            .delete(self.url(Some(id)))
            .query(&self.query())
            .send()
            .await
            .map_err(|e| Error::transport(format!("delete failed: {e}")))?;
        check_status(response).await?;
        debug!(%id, "Removed record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;

    fn store(url: &str, collection: &str, token: Option<&str>) -> FirebaseStore {
        let config = FirebaseConfig {
            database_url: url.to_string(),
            collection: collection.to_string(),
            auth_token: token.map(str::to_string),
            ..FirebaseConfig::default()
        };
        FirebaseStore::new(&config, Duration::from_millis(10)).unwrap()
    }

    fn event(name: &str, data: &str) -> SseEvent {
        SseEvent {
            event: name.to_string(),
            data: data.to_string(),
        }
    }

    #[test]
    fn test_url_at_database_root() {
        let store = store("https://demo.firebaseio.com/", "", None);
        assert_eq!(store.url(None), "https://demo.firebaseio.com/.json");
        assert_eq!(store.url(Some("-a")), "https://demo.firebaseio.com/-a.json");
    }

    #[test]
    fn test_url_under_collection() {
        let store = store("https://demo.firebaseio.com", "/faq/", None);
        assert_eq!(store.url(None), "https://demo.firebaseio.com/faq.json");
        assert_eq!(
            store.url(Some("-a")),
            "https://demo.firebaseio.com/faq/-a.json"
        );
    }

    #[test]
    fn test_auth_query() {
        let anonymous = store("https://x", "", None);
        assert!(anonymous.query().is_empty());

        let blank = store("https://x", "", Some(""));
        assert!(blank.query().is_empty());

        let authed = store("https://x", "", Some("t"));
        assert_eq!(authed.query(), vec![("auth", "t")]);
    }

    #[test]
    fn test_missing_url_is_rejected() {
        let err = FirebaseStore::new(&FirebaseConfig::default(), Duration::from_secs(1))
            .unwrap_err();
        assert!(err.to_string().contains("database_url"));
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("01HZX3").is_ok());
        assert!(validate_key("-Nabc").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("a/b").is_err());
        assert!(validate_key("a.b").is_err());
        assert!(validate_key("a[0]").is_err());
    }

    #[test]
    fn test_apply_put_and_patch() {
        let mut tree = RecordTree::new();

        let changed = apply_event(
            &mut tree,
            &event("put", r#"{"path":"/","data":{"-a":{"question":"Q1","answer":"A1"}}}"#),
        )
        .unwrap();
        assert!(changed);
        assert_eq!(tree.records(), vec![Record::new("-a", "Q1", "A1")]);

        apply_event(
            &mut tree,
            &event("patch", r#"{"path":"/-a","data":{"answer":"A1b"}}"#),
        )
        .unwrap();
        assert_eq!(tree.records(), vec![Record::new("-a", "Q1", "A1b")]);

        apply_event(&mut tree, &event("put", r#"{"path":"/-a","data":null}"#)).unwrap();
        assert!(tree.records().is_empty());
    }

    #[test]
    fn test_keep_alive_is_not_a_change() {
        let mut tree = RecordTree::new();
        assert!(!apply_event(&mut tree, &event("keep-alive", "null")).unwrap());
    }

    #[test]
    fn test_cancel_and_revoke_end_the_stream() {
        let mut tree = RecordTree::new();
        assert!(apply_event(&mut tree, &event("cancel", "denied")).is_err());
        let err = apply_event(&mut tree, &event("auth_revoked", "credential expired"))
            .unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn test_bad_payload_is_rejected() {
        let mut tree = RecordTree::new();
        let err = apply_event(&mut tree, &event("put", "not json")).unwrap_err();
        assert!(matches!(err, Error::Payload { .. }));
    }

    /// Serve one event stream per entry of `bodies`, closing each after its
    /// events are written.
    async fn serve_streams(bodies: Vec<&'static str>) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            for body in bodies {
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
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n{body}"
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
        });
        url
    }

    async fn next_change(sub: &mut Subscription) -> Change {
        tokio::time::timeout(Duration::from_secs(5), sub.next())
            .await
            .expect("no change within 5s")
            .expect("subscription closed")
    }

    #[tokio::test]
    async fn test_unreachable_database_is_retried() {
        let store = store("http://127.0.0.1:1", "", None);
        let mut sub = store.subscribe().await.unwrap();

        for _ in 0..2 {
            match next_change(&mut sub).await {
                Change::Interrupted { reason } => assert!(reason.contains("connect failed")),
                other => panic!("expected interruption, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_stream_resumes_after_server_close() {
        let url = serve_streams(vec![
            "event: put\ndata: {\"path\":\"/\",\"data\":{\"-a\":{\"question\":\"Q1\",\"answer\":\"A1\"}}}\n\n",
            "event: put\ndata: {\"path\":\"/\",\"data\":{\"-b\":{\"question\":\"Q2\",\"answer\":\"A2\"}}}\n\n",
        ])
        .await;
        let store = store(&url, "", None);
        let mut sub = store.subscribe().await.unwrap();

        assert_eq!(
            next_change(&mut sub).await,
            Change::Snapshot(vec![Record::new("-a", "Q1", "A1")])
        );
        match next_change(&mut sub).await {
            Change::Interrupted { reason } => assert!(reason.contains("closed by server")),
            other => panic!("expected interruption, got {other:?}"),
        }
        // The mirror starts over on each connection
        assert_eq!(
            next_change(&mut sub).await,
            Change::Snapshot(vec![Record::new("-b", "Q2", "A2")])
        );
    }

    #[test]
    fn test_http_status_error() {
        let err = http_status_error(StatusCode::UNAUTHORIZED, "denied".to_string());
        assert!(err.is_transport());
        assert!(err.to_string().contains("401"));
    }
}
