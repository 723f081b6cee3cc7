//! Route-tx tracker: when a transaction entered the system, which
//! intermediary committees it crossed, and when it reached its destination.
//!
//! The outer mutex only guards insertion and lookup in the id map; each
//! record has its own mutex for field writes, so reports about different
//! transactions never contend on the same lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rapid_types::{Digest, Timestamp};

use crate::sink::lock;

#[derive(Debug, Default)]
struct RouteRecord {
    start: Option<Timestamp>,
    end: Option<Timestamp>,
    /// First arrival per intermediary committee, in arrival order.
    hops: Vec<(Digest, Timestamp)>,
    flushed: bool,
}

/// Read-only copy of one transaction's routing record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteSnapshot {
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
    pub hops: Vec<(Digest, Timestamp)>,
    pub flushed: bool,
}

impl RouteSnapshot {
    /// `start,end[,committee,hop_time]*` with unix seconds, `0` for an unset start.
    pub fn to_line(&self) -> String {
        let mut line = self.start.map_or(0, |t| t.unix_secs()).to_string();
        line.push(',');
        line.push_str(&self.end.map_or(0, |t| t.unix_secs()).to_string());
        for (committee, at) in &self.hops {
            line.push(',');
            line.push_str(&committee.to_string());
            line.push(',');
            line.push_str(&at.unix_secs().to_string());
        }
        line
    }
}

/// Concurrent store of [`RouteRecord`]s keyed by transaction id.
#[derive(Default)]
pub struct RouteTxTracker {
    records: Mutex<HashMap<Digest, Arc<Mutex<RouteRecord>>>>,
}

impl RouteTxTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, id: Digest) -> Arc<Mutex<RouteRecord>> {
        let mut records = lock(&self.records);
        Arc::clone(records.entry(id).or_default())
    }

    /// Create the record for `id` if it does not exist yet.
    pub fn ensure(&self, id: Digest) {
        self.record(id);
    }

    /// Set the start time unless one is already recorded.
    ///
    /// Returns `true` if this call set it.
    pub fn mark_start(&self, id: Digest, at: Timestamp) -> bool {
        let record = self.record(id);
        let mut r = lock(&record);
        if r.start.is_some() {
            return false;
        }
        r.start = Some(at);
        true
    }

    /// Record the first arrival of `id` at `committee`.
    ///
    /// Returns `false` if that committee already has an arrival time.
    pub fn mark_hop(&self, id: Digest, committee: Digest, at: Timestamp) -> bool {
        let record = self.record(id);
        let mut r = lock(&record);
        if r.hops.iter().any(|(c, _)| *c == committee) {
            return false;
        }
        r.hops.push((committee, at));
        true
    }

    /// Set the end time unless one is already recorded.
    ///
    /// Exactly one call per id returns `true`; that caller owns the flush.
    pub fn mark_end(&self, id: Digest, at: Timestamp) -> bool {
        let record = self.record(id);
        let mut r = lock(&record);
        if r.end.is_some() {
            return false;
        }
        r.end = Some(at);
        true
    }

    /// Mark the record flushed and return its line, once.
    ///
    /// Returns `None` for unknown ids, records without an end time, and
    /// records that were already flushed.
    pub fn take_flush_line(&self, id: &Digest) -> Option<String> {
        let record = lock(&self.records).get(id).cloned()?;
        let mut r = lock(&record);
        if r.flushed || r.end.is_none() {
            return None;
        }
        r.flushed = true;
        Some(snapshot_of(&r).to_line())
    }

    pub fn snapshot(&self, id: &Digest) -> Option<RouteSnapshot> {
        let record = lock(&self.records).get(id).cloned()?;
        let r = lock(&record);
        Some(snapshot_of(&r))
    }

    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn snapshot_of(r: &RouteRecord) -> RouteSnapshot {
    RouteSnapshot {
        start: r.start,
        end: r.end,
        hops: r.hops.clone(),
        flushed: r.flushed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(b: u8) -> Digest {
        Digest::new([b; 32])
    }

    #[test]
    fn first_start_wins() {
        let tracker = RouteTxTracker::new();
        assert!(tracker.mark_start(id(1), Timestamp::from_secs(10)));
        assert!(!tracker.mark_start(id(1), Timestamp::from_secs(5)));
        let snap = tracker.snapshot(&id(1)).unwrap();
        assert_eq!(snap.start, Some(Timestamp::from_secs(10)));
    }

    #[test]
    fn first_hop_per_committee_wins() {
        let tracker = RouteTxTracker::new();
        assert!(tracker.mark_hop(id(1), id(7), Timestamp::from_secs(3)));
        assert!(!tracker.mark_hop(id(1), id(7), Timestamp::from_secs(4)));
        assert!(tracker.mark_hop(id(1), id(8), Timestamp::from_secs(4)));
        let snap = tracker.snapshot(&id(1)).unwrap();
        assert_eq!(
            snap.hops,
            vec![(id(7), Timestamp::from_secs(3)), (id(8), Timestamp::from_secs(4))]
        );
    }

    #[test]
    fn ensure_is_idempotent() {
        let tracker = RouteTxTracker::new();
        tracker.ensure(id(1));
        tracker.mark_start(id(1), Timestamp::from_secs(1));
        tracker.ensure(id(1));
        assert_eq!(tracker.len(), 1);
        assert!(tracker.snapshot(&id(1)).unwrap().start.is_some());
    }

    #[test]
    fn flush_happens_once_and_only_after_end() {
        let tracker = RouteTxTracker::new();
        tracker.mark_hop(id(1), id(2), Timestamp::from_secs(20));
        assert_eq!(tracker.take_flush_line(&id(1)), None);

        assert!(tracker.mark_end(id(1), Timestamp::from_secs(30)));
        assert!(!tracker.mark_end(id(1), Timestamp::from_secs(31)));
        let line = tracker.take_flush_line(&id(1)).unwrap();
        assert_eq!(line, format!("0,30,{},20", id(2)));
        assert_eq!(tracker.take_flush_line(&id(1)), None);
        assert!(tracker.snapshot(&id(1)).unwrap().flushed);
    }

    #[test]
    fn unknown_id_has_no_snapshot() {
        let tracker = RouteTxTracker::new();
        assert!(tracker.snapshot(&id(9)).is_none());
        assert!(tracker.take_flush_line(&id(9)).is_none());
        assert!(tracker.is_empty());
    }

    #[test]
    fn concurrent_starts_have_one_winner() {
        let tracker = Arc::new(RouteTxTracker::new());
        let handles: Vec<_> = (0..16u64)
            .map(|i| {
                let tracker = Arc::clone(&tracker);
                std::thread::spawn(move || tracker.mark_start(id(1), Timestamp::from_secs(i + 1)))
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert!(tracker.snapshot(&id(1)).unwrap().start.is_some());
    }
}
