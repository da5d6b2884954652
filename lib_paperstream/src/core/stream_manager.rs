//! # Stream Manager
//!
//! Owns the one live Jetstream connection for the process and everything
//! scheduled around it: the connection task, the reconnect timer, the
//! keep-alive task and the dispatch tasks. All of them run on one
//! `TaskTracker` under one session `CancellationToken`, so `stop()` can
//! cancel and then wait for every one of them.
//!
//! Every path into a connection (external `start`, reconnect timer,
//! keep-alive) goes through `PipelineState::try_begin_connecting`, so at most
//! one attempt is ever in flight. While `stop()` drains, the session is
//! marked stopping and no new connection or keep-alive is armed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace, warn};

use crate::configs::pipeline_config::PipelineConfig;
use crate::core::dispatcher::IngestionDispatcher;
use crate::core::keepalive;
use crate::core::state::{ConnectionPhase, PipelineState, StatusSnapshot};
use crate::error::Result;
use crate::events::EventProcessor;
use crate::ingestors::jetstream_wss::{JetstreamWssIngestor, SessionEnd, SessionHandler};
use crate::retrieve::ky_http::ApiClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StartStatus {
    #[serde(rename = "starting")]
    Starting,
    #[serde(rename = "already running")]
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopStatus {
    #[serde(rename = "stopped")]
    Stopped,
}

pub struct StreamManager {
    config: PipelineConfig,
    ingestor: JetstreamWssIngestor,
    processor: EventProcessor,
    dispatcher: IngestionDispatcher,
    state: Arc<PipelineState>,
    tracker: TaskTracker,
    session: Mutex<Session>,
    stop_serial: tokio::sync::Mutex<()>,
    keepalive: Mutex<Option<CancellationToken>>,
    reconnect_pending: AtomicBool,
}

struct Session {
    token: CancellationToken,
    stopping: bool,
}

impl StreamManager {
    pub fn new(config: PipelineConfig) -> Result<Arc<Self>> {
        let ingest = &config.ingest;
        let auth_token = (!ingest.secret.is_empty()).then(|| ingest.secret.clone());
        let client = ApiClient::new(&ingest.base_url, auth_token, ingest.timeout, ingest.max_retries)?;

        let state = Arc::new(PipelineState::default());
        let tracker = TaskTracker::new();

        Ok(Arc::new(Self {
            ingestor: JetstreamWssIngestor::new(config.stream_url.clone()),
            processor: EventProcessor::new(config.post_collection.clone()),
            dispatcher: IngestionDispatcher::new(client, Arc::clone(&state), tracker.clone()),
            state,
            tracker,
            session: Mutex::new(Session {
                token: CancellationToken::new(),
                stopping: false,
            }),
            stop_serial: tokio::sync::Mutex::new(()),
            keepalive: Mutex::new(None),
            reconnect_pending: AtomicBool::new(false),
            config,
        }))
    }

    /// Idempotent. Re-arms the keep-alive, then opens a connection unless one
    /// is already open or opening. Ignored while a `stop` is draining.
    pub fn start(self: &Arc<Self>) -> StartStatus {
        self.arm_keepalive();
        if self.connect_if_idle() {
            info!("Stream starting");
            StartStatus::Starting
        } else {
            debug!(phase = ?self.state.phase(), "Stream already running");
            StartStatus::AlreadyRunning
        }
    }

    /// Cancels every session task, waits for all of them to finish, and
    /// leaves the manager `Disconnected` and ready for another `start`.
    ///
    /// The old token stays in place, cancelled, until the drain is done, so
    /// anything spawned meanwhile exits at once. Concurrent calls run one
    /// after the other.
    pub async fn stop(&self) -> StopStatus {
        let _serial = self.stop_serial.lock().await;
        {
            let mut session = lock(&self.session);
            session.stopping = true;
            session.token.cancel();
        }
        lock(&self.keepalive).take();

        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();

        self.reconnect_pending.store(false, Ordering::Release);
        {
            let mut session = lock(&self.session);
            self.state.mark_disconnected();
            session.token = CancellationToken::new();
            session.stopping = false;
        }
        info!("Stream stopped");
        StopStatus::Stopped
    }

    pub fn status(&self) -> StatusSnapshot {
        self.state.snapshot()
    }

    pub fn state(&self) -> &Arc<PipelineState> {
        &self.state
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Opens a connection if the phase moves from `Disconnected` to
    /// `Connecting`. Returns whether this call won that transition.
    pub fn connect_if_idle(self: &Arc<Self>) -> bool {
        let token = {
            let session = lock(&self.session);
            if session.stopping || !self.state.try_begin_connecting() {
                return false;
            }
            session.token.clone()
        };
        let manager = Arc::clone(self);
        self.tracker.spawn(async move {
            match manager.ingestor.run(manager.as_ref(), &token).await {
                SessionEnd::Cancelled => {}
                SessionEnd::Closed => {
                    manager.state.mark_disconnected();
                    manager.schedule_reconnect();
                }
                SessionEnd::ConnectFailed(reason) => {
                    manager.state.record_error(reason);
                    manager.state.mark_disconnected();
                    manager.schedule_reconnect();
                }
            }
        });
        true
    }

    /// Arms one reconnect after the fixed delay. No-op while one is pending.
    pub fn schedule_reconnect(self: &Arc<Self>) {
        if self.reconnect_pending.swap(true, Ordering::AcqRel) {
            trace!("Reconnect already pending");
            return;
        }
        let token = self.session_token();
        let delay = self.config.reconnect_delay;
        let manager = Arc::clone(self);
        info!(delay_secs = delay.as_secs_f64(), "Reconnecting after delay");

        self.tracker.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    manager.reconnect_pending.store(false, Ordering::Release);
                    manager.connect_if_idle();
                }
            }
        });
    }

    pub fn is_reconnect_pending(&self) -> bool {
        self.reconnect_pending.load(Ordering::Acquire)
    }

    /// One text frame: decode, filter, extract, dispatch. Never fails the
    /// connection.
    pub fn handle_message(&self, raw: &str, token: &CancellationToken) {
        let event = match self.processor.decode(raw) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Skipping undecodable message");
                self.state.record_error(e.to_string());
                return;
            }
        };

        let Some(post) = self.processor.qualify(&event) else {
            return;
        };
        self.state.record_processed();

        let extraction = post.extract();
        if extraction.is_empty() && post.quoted_post_uri.is_none() {
            trace!(post = %post.post_uri, "Nothing to ingest");
            return;
        }

        self.state.record_found(&extraction);
        let batches = self.dispatcher.dispatch(&post, &extraction, token);
        debug!(post = %post.post_uri, found = extraction.total(), batches, "Dispatched");
    }

    fn arm_keepalive(self: &Arc<Self>) {
        let token = {
            let session = lock(&self.session);
            if session.stopping {
                return;
            }
            session.token.child_token()
        };
        if let Some(previous) = lock(&self.keepalive).replace(token.clone()) {
            previous.cancel();
        }
        keepalive::spawn(
            &self.tracker,
            Arc::downgrade(self),
            self.config.keepalive_interval,
            token,
        );
    }

    fn session_token(&self) -> CancellationToken {
        lock(&self.session).token.clone()
    }

    pub(crate) fn is_disconnected(&self) -> bool {
        self.state.phase() == ConnectionPhase::Disconnected
    }
}

impl SessionHandler for StreamManager {
    fn on_open(&self) {
        self.state.mark_connected();
    }

    fn on_text(&self, text: &str, token: &CancellationToken) {
        self.handle_message(text, token);
    }

    fn on_transport_error(&self, error: &str) {
        self.state.record_error(error);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
