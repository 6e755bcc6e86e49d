//! Event dispatcher.
//!
//! The single consumer of every [`IoEvent`].  Renders the status payload,
//! publishes it once, and on refusal writes a `[failover]` log record with
//! the full payload.  Delivery is at-most-once: nothing is queued or retried.

use std::sync::mpsc::Receiver;

use log::{error, warn};

use super::events::IoEvent;
use super::ports::{EventSink, StatusPublisher};

/// Log target of `[failover]` records.  Kept off the MQTT log mirror.
pub const FAILOVER_TARGET: &str = "stateio::failover";

pub struct Dispatcher<P: StatusPublisher> {
    publisher: P,
    published: u32,
    failed: u32,
}

impl<P: StatusPublisher> Dispatcher<P> {
    pub fn new(publisher: P) -> Self {
        Self {
            publisher,
            published: 0,
            failed: 0,
        }
    }

    /// Publish the adoption description; same failover policy as events.
    pub fn adopt(&mut self, payload: &str) -> bool {
        let ok = self.publisher.publish_adopt(payload);
        if !ok {
            warn!(target: FAILOVER_TARGET, "[failover] {}", payload);
        }
        ok
    }

    /// Publish one diagnostic line on the log topic.
    pub fn log(&mut self, line: &str) -> bool {
        let ok = self.publisher.publish_log(line);
        if !ok {
            warn!(target: FAILOVER_TARGET, "[failover] {}", line);
        }
        ok
    }

    /// Forward up to `max` mirrored log lines.  Stops at the first refusal;
    /// the rest stay queued for the next pass.
    pub fn drain_logs(&mut self, rx: &Receiver<String>, max: usize) -> usize {
        let mut sent = 0;
        for line in rx.try_iter().take(max) {
            if !self.log(&line) {
                break;
            }
            sent += 1;
        }
        sent
    }

    pub fn published(&self) -> u32 {
        self.published
    }

    pub fn failed(&self) -> u32 {
        self.failed
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn publisher_mut(&mut self) -> &mut P {
        &mut self.publisher
    }
}

impl<P: StatusPublisher> EventSink for Dispatcher<P> {
    fn emit(&mut self, event: &IoEvent) {
        let json = match event.to_json() {
            Ok(json) => json,
            Err(e) => {
                error!("dispatch: cannot render {:?}: {}", event, e);
                self.failed += 1;
                return;
            }
        };

        if self.publisher.publish_status(&json) {
            self.published += 1;
        } else {
            self.failed += 1;
            warn!(target: FAILOVER_TARGET, "[failover] {}", json);
        }
    }
}
