//! Session clock and cross-session timing memory.
//!
//! `SessionClock` turns wall-clock time into deadline progress and never
//! lets it run backwards within a session. `SessionTimeHistory` keeps the
//! final progress of the most recent sessions handled by this process.

use std::collections::VecDeque;

use chrono::Utc;

use crate::types::ProgressTime;

/// Default number of past sessions remembered.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Current wall-clock time in milliseconds since the epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

// ---------------------------------------------------------------------------
// Session clock
// ---------------------------------------------------------------------------

/// Monotone progress reader over a deadline tracker.
#[derive(Debug, Clone)]
pub struct SessionClock {
    progress: ProgressTime,
    last: f64,
}

impl SessionClock {
    pub fn new(progress: ProgressTime) -> Self {
        Self { progress, last: 0.0 }
    }

    /// Progress at `now_millis`, never lower than a previous read.
    pub fn read(&mut self, now_millis: i64) -> f64 {
        self.last = self.last.max(self.progress.get(now_millis));
        self.last
    }

    /// The most recent progress read.
    pub fn last(&self) -> f64 {
        self.last
    }

    pub fn tracker(&self) -> &ProgressTime {
        &self.progress
    }
}

// ---------------------------------------------------------------------------
// Past session times
// ---------------------------------------------------------------------------

/// Bounded FIFO of past session durations, oldest evicted first.
#[derive(Debug, Clone)]
pub struct SessionTimeHistory {
    capacity: usize,
    times: VecDeque<f64>,
}

impl Default for SessionTimeHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl SessionTimeHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            times: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a session duration, evicting the oldest when full.
    pub fn push(&mut self, time: f64) {
        if self.times.len() == self.capacity {
            self.times.pop_front();
        }
        self.times.push_back(time);
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Mean of the recorded durations, `None` when empty.
    pub fn mean(&self) -> Option<f64> {
        if self.times.is_empty() {
            None
        } else {
            Some(self.times.iter().sum::<f64>() / self.times.len() as f64)
        }
    }

    /// Durations from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.times.iter().copied()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
