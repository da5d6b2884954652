//! # Connection State
//!
//! Lock-free phase and counters shared by the connection task, the dispatch
//! tasks, the keep-alive task and the status route. Only `lastError` sits
//! behind a mutex. Counters are monotonic for the life of the process.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use crate::extract::{Category, Extraction};

/// Lifecycle of the single stream connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionPhase {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionPhase {
    const fn as_u8(self) -> u8 {
        match self {
            ConnectionPhase::Disconnected => 0,
            ConnectionPhase::Connecting => 1,
            ConnectionPhase::Connected => 2,
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => ConnectionPhase::Connecting,
            2 => ConnectionPhase::Connected,
            _ => ConnectionPhase::Disconnected,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FoundCounts {
    pub papers: u64,
    pub long_form_posts: u64,
    pub articles: u64,
}

/// Point-in-time view served by the status route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub connected: bool,
    pub state: ConnectionPhase,
    pub processed_count: u64,
    pub found_counts: FoundCounts,
    pub last_error: Option<String>,
}

#[derive(Debug)]
pub struct PipelineState {
    phase: AtomicU8,
    processed: AtomicU64,
    found: [AtomicU64; 3],
    last_error: Mutex<Option<String>>,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            phase: AtomicU8::new(ConnectionPhase::Disconnected.as_u8()),
            processed: AtomicU64::new(0),
            found: [AtomicU64::new(0), AtomicU64::new(0), AtomicU64::new(0)],
            last_error: Mutex::new(None),
        }
    }
}

impl PipelineState {
    pub fn phase(&self) -> ConnectionPhase {
        ConnectionPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// The only way into `Connecting`. Returns false if any other attempt
    /// holds the connection or is already opening it.
    pub fn try_begin_connecting(&self) -> bool {
        self.phase
            .compare_exchange(
                ConnectionPhase::Disconnected.as_u8(),
                ConnectionPhase::Connecting.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Socket open: clears the previous error.
    pub fn mark_connected(&self) {
        *self.error_slot() = None;
        self.phase.store(ConnectionPhase::Connected.as_u8(), Ordering::Release);
    }

    pub fn mark_disconnected(&self) {
        self.phase.store(ConnectionPhase::Disconnected.as_u8(), Ordering::Release);
    }

    pub fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_found(&self, extraction: &Extraction) {
        for category in Category::ALL {
            let n = extraction.get(category).len() as u64;
            if n > 0 {
                self.found[category.index()].fetch_add(n, Ordering::Relaxed);
            }
        }
    }

    pub fn record_error(&self, message: impl Into<String>) {
        *self.error_slot() = Some(message.into());
    }

    pub fn last_error(&self) -> Option<String> {
        self.error_slot().clone()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let phase = self.phase();
        let found = |c: Category| self.found[c.index()].load(Ordering::Relaxed);
        StatusSnapshot {
            connected: phase == ConnectionPhase::Connected,
            state: phase,
            processed_count: self.processed.load(Ordering::Relaxed),
            found_counts: FoundCounts {
                papers: found(Category::Papers),
                long_form_posts: found(Category::LongFormPosts),
                articles: found(Category::Articles),
            },
            last_error: self.last_error(),
        }
    }

    // A panic while holding the lock cannot leave an Option<String> half-written.
    fn error_slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.last_error.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
