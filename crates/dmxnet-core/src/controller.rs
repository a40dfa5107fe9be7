//! Remote controller bookkeeping
//!
//! Every ArtPoll tells us a controller is alive. Controllers that have not
//! polled for a minute are flagged as lost but kept in the list.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::protocol::PollRequest;

/// How long a controller may stay silent before it is considered lost
pub const CONTROLLER_TIMEOUT_SECS: i64 = 60;
/// Cadence of the staleness sweep
pub const SWEEP_INTERVAL_SECS: u64 = 30;

/// One remote controller, keyed by IP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerRecord {
    pub ip: String,
    pub family: String,
    pub last_poll: DateTime<Utc>,
    pub alive: bool,
    pub diagnostic_unicast: bool,
    pub diagnostic_enabled: bool,
    pub unilateral: bool,
    pub priority: u8,
}

impl ControllerRecord {
    /// Record for a poll received at `now`
    pub fn from_poll(ip: String, family: String, poll: &PollRequest, now: DateTime<Utc>) -> Self {
        Self {
            ip,
            family,
            last_poll: now,
            alive: true,
            diagnostic_unicast: poll.diagnostic_unicast,
            diagnostic_enabled: poll.diagnostic_enabled,
            unilateral: poll.unilateral,
            priority: poll.priority,
        }
    }

    fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now - self.last_poll > Duration::seconds(CONTROLLER_TIMEOUT_SECS)
    }
}

/// Controllers seen by this node, at most one per IP
#[derive(Debug, Clone, Default)]
pub struct ControllerRegistry {
    controllers: Vec<ControllerRecord>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record for `record.ip`
    ///
    /// Returns `true` when the controller was unknown or had been lost.
    pub fn upsert(&mut self, record: ControllerRecord) -> bool {
        match self.controllers.iter_mut().find(|c| c.ip == record.ip) {
            Some(existing) => {
                let revived = !existing.alive;
                *existing = record;
                revived
            }
            None => {
                self.controllers.push(record);
                true
            }
        }
    }

    /// Flag every controller silent for more than a minute
    ///
    /// Returns the IPs that turned from alive to lost on this sweep.
    pub fn sweep_stale(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let mut lost = Vec::new();
        for controller in self.controllers.iter_mut() {
            if controller.is_stale(now) && controller.alive {
                controller.alive = false;
                lost.push(controller.ip.clone());
            }
        }
        lost
    }

    pub fn get(&self, ip: &str) -> Option<&ControllerRecord> {
        self.controllers.iter().find(|c| c.ip == ip)
    }

    pub fn all(&self) -> &[ControllerRecord] {
        &self.controllers
    }

    pub fn alive_count(&self) -> usize {
        self.controllers.iter().filter(|c| c.alive).count()
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }
}
