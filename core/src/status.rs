//! Transaction Status
//!
//! Ephemeral per-action status shown to the user: exactly one of pending,
//! success or error, with a message. Never persisted. A terminal status
//! clears itself after a fixed delay; every newly set status supersedes the
//! previous one, and a superseded status's pending auto-clear must not fire
//! against the newer message. The board tags each status with a generation
//! and the clear task checks it before wiping.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;

/// How long a success stays visible
pub const SUCCESS_CLEAR: Duration = Duration::from_secs(2);
/// How long an error stays visible
pub const ERROR_CLEAR: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusPhase {
    Pending,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionStatus {
    pub phase: StatusPhase,
    pub message: String,
    pub visible: bool,
}

impl TransactionStatus {
    fn hidden() -> Self {
        Self {
            phase: StatusPhase::Pending,
            message: String::new(),
            visible: false,
        }
    }
}

struct BoardInner {
    status: TransactionStatus,
    generation: u64,
}

/// Shared status slot with generation-tagged auto-clear
#[derive(Clone)]
pub struct StatusBoard {
    inner: Arc<Mutex<BoardInner>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(BoardInner {
                status: TransactionStatus::hidden(),
                generation: 0,
            })),
        }
    }

    pub fn current(&self) -> TransactionStatus {
        self.inner.lock().expect("status board poisoned").status.clone()
    }

    /// Pending statuses stay until overwritten; the protocol always ends
    /// them with a terminal success or error.
    pub fn pending(&self, message: impl Into<String>) {
        self.set(StatusPhase::Pending, message.into(), None);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.set(StatusPhase::Success, message.into(), Some(SUCCESS_CLEAR));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.set(StatusPhase::Error, message.into(), Some(ERROR_CLEAR));
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("status board poisoned");
        inner.generation += 1;
        inner.status = TransactionStatus::hidden();
    }

    fn set(&self, phase: StatusPhase, message: String, auto_clear: Option<Duration>) {
        let generation = {
            let mut inner = self.inner.lock().expect("status board poisoned");
            inner.generation += 1;
            inner.status = TransactionStatus {
                phase,
                message,
                visible: true,
            };
            inner.generation
        };

        if let Some(delay) = auto_clear {
            let board = self.inner.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let mut inner = board.lock().expect("status board poisoned");
                // A newer status owns the slot now; leave it alone.
                if inner.generation == generation {
                    inner.status = TransactionStatus::hidden();
                }
            });
        }
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}
