//! # Keep-Alive
//!
//! Periodic wake that reconnects a stream the host dropped without a close
//! (hibernation, idle eviction). It holds only a weak reference, so it never
//! keeps a dropped manager alive.

use std::sync::Weak;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, trace};

use crate::core::stream_manager::StreamManager;

pub(crate) fn spawn(
    tracker: &TaskTracker,
    manager: Weak<StreamManager>,
    interval: Duration,
    token: CancellationToken,
) {
    tracker.spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }

            let Some(manager) = manager.upgrade() else {
                break;
            };
            if !manager.is_disconnected() {
                trace!("Keep-alive: stream up");
                continue;
            }
            if manager.connect_if_idle() {
                debug!("Keep-alive: reconnecting idle stream");
            }
        }
        trace!("Keep-alive exited");
    });
}
