//! IDA-gossip tracker: broadcast start time and every node's reconstruction time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rapid_types::{Digest, Timestamp};

use crate::sink::lock;

#[derive(Debug, Default)]
struct IdaRecord {
    start: Option<Timestamp>,
    /// Reconstruction times in call order, not sorted.
    reconstructed: Vec<Timestamp>,
    flushed: bool,
}

/// Read-only copy of one broadcast's record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdaSnapshot {
    pub start: Option<Timestamp>,
    pub reconstructed: Vec<Timestamp>,
    pub flushed: bool,
}

impl IdaSnapshot {
    /// `start[,reconstructed]*` with unix seconds, `0` for an unset start.
    pub fn to_line(&self) -> String {
        let mut line = self.start.map_or(0, |t| t.unix_secs()).to_string();
        for at in &self.reconstructed {
            line.push(',');
            line.push_str(&at.unix_secs().to_string());
        }
        line
    }
}

/// Concurrent store of IDA-gossip records keyed by broadcast id.
#[derive(Default)]
pub struct IdaGossipTracker {
    records: Mutex<HashMap<Digest, Arc<Mutex<IdaRecord>>>>,
}

impl IdaGossipTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, id: Digest) -> Arc<Mutex<IdaRecord>> {
        let mut records = lock(&self.records);
        Arc::clone(records.entry(id).or_default())
    }

    pub fn ensure(&self, id: Digest) {
        self.record(id);
    }

    /// Set the broadcast start time unless one is already recorded.
    pub fn mark_start(&self, id: Digest, at: Timestamp) -> bool {
        let record = self.record(id);
        let mut r = lock(&record);
        if r.start.is_some() {
            return false;
        }
        r.start = Some(at);
        true
    }

    /// Append a reconstruction time. Returns `true` only for the first one.
    pub fn append_reconstructed(&self, id: Digest, at: Timestamp) -> bool {
        let record = self.record(id);
        let mut r = lock(&record);
        r.reconstructed.push(at);
        r.reconstructed.len() == 1
    }

    /// Mark the record flushed and return its line, once.
    pub fn take_flush_line(&self, id: &Digest) -> Option<String> {
        let record = lock(&self.records).get(id).cloned()?;
        let mut r = lock(&record);
        if r.flushed || r.reconstructed.is_empty() {
            return None;
        }
        r.flushed = true;
        Some(snapshot_of(&r).to_line())
    }

    pub fn snapshot(&self, id: &Digest) -> Option<IdaSnapshot> {
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

fn snapshot_of(r: &IdaRecord) -> IdaSnapshot {
    IdaSnapshot {
        start: r.start,
        reconstructed: r.reconstructed.clone(),
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
    fn only_first_append_reports_first() {
        let tracker = IdaGossipTracker::new();
        let times = [5u64, 3, 9, 3];
        let firsts: Vec<bool> = times
            .iter()
            .map(|&s| tracker.append_reconstructed(id(1), Timestamp::from_secs(s)))
            .collect();
        assert_eq!(firsts, vec![true, false, false, false]);

        let snap = tracker.snapshot(&id(1)).unwrap();
        let secs: Vec<u64> = snap.reconstructed.iter().map(|t| t.unix_secs()).collect();
        assert_eq!(secs, vec![5, 3, 9, 3]);
    }

    #[test]
    fn start_is_first_write_wins() {
        let tracker = IdaGossipTracker::new();
        assert!(tracker.mark_start(id(2), Timestamp::from_secs(1)));
        assert!(!tracker.mark_start(id(2), Timestamp::from_secs(2)));
        assert_eq!(
            tracker.snapshot(&id(2)).unwrap().start,
            Some(Timestamp::from_secs(1))
        );
    }

    #[test]
    fn flush_line_lists_start_then_reconstructions() {
        let tracker = IdaGossipTracker::new();
        tracker.mark_start(id(3), Timestamp::from_secs(100));
        tracker.append_reconstructed(id(3), Timestamp::from_secs(102));
        tracker.append_reconstructed(id(3), Timestamp::from_secs(101));
        assert_eq!(tracker.take_flush_line(&id(3)).unwrap(), "100,102,101");
        assert_eq!(tracker.take_flush_line(&id(3)), None);
    }

    #[test]
    fn missing_start_flushes_as_zero() {
        let tracker = IdaGossipTracker::new();
        tracker.append_reconstructed(id(4), Timestamp::from_secs(7));
        assert_eq!(tracker.take_flush_line(&id(4)).unwrap(), "0,7");
    }

    #[test]
    fn concurrent_appends_keep_every_entry() {
        let tracker = Arc::new(IdaGossipTracker::new());
        let handles: Vec<_> = (0..32u64)
            .map(|i| {
                let tracker = Arc::clone(&tracker);
                std::thread::spawn(move || {
                    tracker.append_reconstructed(id(5), Timestamp::from_secs(i))
                })
            })
            .collect();
        let firsts = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|first| *first)
            .count();
        assert_eq!(firsts, 1);
        assert_eq!(tracker.snapshot(&id(5)).unwrap().reconstructed.len(), 32);
    }
}
