//! Log tee.
//!
//! Wraps the serial logger and copies this crate's records, at or above a
//! level, into a bounded queue.  The poll loop drains that queue onto the
//! MQTT log topic through [`Dispatcher::drain_logs`], so remote operators see
//! the same `[stio]` diagnostics as the serial console.
//!
//! Logging never blocks on the network: a full or unattached queue drops the
//! copy and the serial line is still written.  `[failover]` records are not
//! mirrored, since they only appear when the broker refused something.
//!
//! [`Dispatcher::drain_logs`]: crate::app::dispatch::Dispatcher::drain_logs

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Mutex;

use log::{LevelFilter, Log, Metadata, Record};

use crate::app::dispatch::FAILOVER_TARGET;

/// Lines held while the broker is unreachable.
pub const QUEUE_DEPTH: usize = 16;

/// Prefix of every mirrored line.
pub const LINE_PREFIX: &str = "[stio]";

/// Queue between the tee and the poll loop.
pub fn channel() -> (SyncSender<String>, Receiver<String>) {
    mpsc::sync_channel(QUEUE_DEPTH)
}

pub struct LogTee<L> {
    inner: L,
    level: LevelFilter,
    forward: Mutex<Option<SyncSender<String>>>,
    dropped: AtomicU32,
}

impl<L: Log> LogTee<L> {
    pub fn new(inner: L, level: LevelFilter) -> Self {
        Self {
            inner,
            level,
            forward: Mutex::new(None),
            dropped: AtomicU32::new(0),
        }
    }

    /// Start mirroring into `tx`.  Records logged before this only reach the
    /// inner logger.
    pub fn attach(&self, tx: SyncSender<String>) {
        if let Ok(mut slot) = self.forward.lock() {
            *slot = Some(tx);
        }
    }

    /// Mirrored lines lost to a full queue.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    fn mirrors(&self, record: &Record) -> bool {
        let target = record.target();
        let own = target == "stateio" || target.starts_with("stateio::");
        own && target != FAILOVER_TARGET && record.level() <= self.level
    }
}

impl<L: Log> Log for LogTee<L> {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        self.inner.log(record);
        if !self.mirrors(record) {
            return;
        }
        let Ok(slot) = self.forward.lock() else {
            return;
        };
        if let Some(tx) = slot.as_ref() {
            if tx.try_send(format!("{} {}", LINE_PREFIX, record.args())).is_err() {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}
