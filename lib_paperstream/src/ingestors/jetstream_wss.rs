//! # Jetstream WSS Ingestor
//!
//! Runs a single WebSocket session against a Jetstream endpoint. The session
//! ends on close, on a transport error, or when its token is cancelled; it
//! never reconnects by itself.

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Receives session events. Implemented by the stream manager.
pub trait SessionHandler: Send + Sync {
    /// The socket is open.
    fn on_open(&self);
    /// One text frame. Must not block; heavy work is spawned.
    fn on_text(&self, text: &str, token: &CancellationToken);
    /// A transport error ended the read side. The session reports `Closed` next.
    fn on_transport_error(&self, error: &str);
}

/// How a session finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The token was cancelled, either before or after the socket opened.
    Cancelled,
    /// Server close frame, end of stream, or transport error after open.
    Closed,
    /// The connection was never established.
    ConnectFailed(String),
}

pub struct JetstreamWssIngestor {
    url: String,
}

impl JetstreamWssIngestor {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Connects and pumps frames into `handler` until the session ends.
    pub async fn run<H: SessionHandler + ?Sized>(&self, handler: &H, token: &CancellationToken) -> SessionEnd {
        info!(url = %self.url, "Connecting to Jetstream");

        let ws_stream = tokio::select! {
            biased;
            _ = token.cancelled() => return SessionEnd::Cancelled,
            connected = connect_async(self.url.as_str()) => match connected {
                Ok((ws_stream, _)) => ws_stream,
                Err(e) => {
                    error!(error = %e, "Failed to connect to Jetstream");
                    return SessionEnd::ConnectFailed(format!("connect failed: {}", e));
                }
            }
        };

        info!("Connected to Jetstream");
        handler.on_open();
        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!("Session cancelled, closing socket");
                    if let Err(e) = write.send(Message::Close(None)).await {
                        debug!(error = %e, "Close frame not sent");
                    }
                    return SessionEnd::Cancelled;
                }
                msg = read.next() => match msg {
                    Some(Ok(Message::Text(text))) => handler.on_text(text.as_str(), token),
                    Some(Ok(Message::Close(frame))) => {
                        info!(?frame, "Jetstream closed the connection");
                        return SessionEnd::Closed;
                    }
                    // Binary, ping, pong and raw frames carry nothing for us.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "WSS read error");
                        handler.on_transport_error(&format!("stream error: {}", e));
                        return SessionEnd::Closed;
                    }
                    None => {
                        warn!("WSS stream ended by remote host");
                        return SessionEnd::Closed;
                    }
                }
            }
        }
    }
}
