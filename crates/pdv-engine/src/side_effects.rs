//! # Side-Effect Log
//!
//! Best-effort work runs after the caller's transaction has committed, so
//! its failure cannot be reported as the operation's error. It lands here
//! instead: a bounded in-memory log, mirrored to `tracing::warn!`.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

/// Default number of failures kept.
pub const DEFAULT_SIDE_EFFECT_CAPACITY: usize = 100;

/// Which best-effort step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffect {
    /// The revenue sale synthesized for a debt payment.
    PaymentSale,
}

/// One failed side effect.
#[derive(Debug, Clone, Serialize)]
pub struct SideEffectFailure {
    pub effect: SideEffect,
    /// Id of the record whose operation triggered the side effect.
    pub subject_id: String,
    pub detail: String,
    pub at: DateTime<Utc>,
}

/// Bounded log of side-effect failures. Oldest entries are evicted first.
#[derive(Debug)]
pub struct SideEffectLog {
    capacity: usize,
    entries: Mutex<VecDeque<SideEffectFailure>>,
}

impl SideEffectLog {
    pub fn new(capacity: usize) -> Self {
        SideEffectLog {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Records a failure.
    pub fn record(&self, effect: SideEffect, subject_id: &str, detail: impl Into<String>) {
        let failure = SideEffectFailure {
            effect,
            subject_id: subject_id.to_string(),
            detail: detail.into(),
            at: Utc::now(),
        };
        warn!(
            effect = ?failure.effect,
            subject_id = %failure.subject_id,
            detail = %failure.detail,
            "Side effect failed"
        );

        if self.capacity == 0 {
            return;
        }

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(failure);
    }

    /// Logged failures, oldest first.
    pub fn recent(&self) -> Vec<SideEffectFailure> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SideEffectLog {
    fn default() -> Self {
        SideEffectLog::new(DEFAULT_SIDE_EFFECT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_eviction() {
        let log = SideEffectLog::new(2);
        log.record(SideEffect::PaymentSale, "d-1", "disk full");
        log.record(SideEffect::PaymentSale, "d-2", "disk full");
        log.record(SideEffect::PaymentSale, "d-3", "disk full");

        let recent = log.recent();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].subject_id, "d-2");
        assert_eq!(recent[1].subject_id, "d-3");
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let log = SideEffectLog::new(0);
        log.record(SideEffect::PaymentSale, "d-1", "locked");
        assert!(log.is_empty());
    }
}
