//! Wall-clock access and client/server skew correction.

use chrono::Utc;
use log::debug;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Source of the current wall-clock time in whole epoch seconds.
pub trait Clock: Send + Sync {
    fn now_epoch_seconds(&self) -> i64;
}

/// The local system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_seconds(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// A clock that only moves when told to. Cloned handles share the same time,
/// so a simulation can keep one handle and give the other to a session.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(now)),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_epoch_seconds(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Offset of the local clock against the vendor reference, `local - server`.
///
/// Without a reference timestamp there is nothing to correct and the skew is 0.
pub fn compute_skew(local_now: i64, server_reference: Option<i64>) -> i64 {
    let skew = match server_reference {
        Some(server) => local_now - server,
        None => 0,
    };
    debug!(
        "Clock skew {}s (local={}, reference={:?})",
        skew, local_now, server_reference
    );
    skew
}
