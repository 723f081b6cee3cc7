//! Aggregation entry points used by the telemetry dispatcher.
//!
//! Records are only reachable through these operations; callers never hold
//! a reference to a record.

use std::time::Duration;

use rapid_protocol::{AcceptFailReport, RouteHop, TimedId};

use crate::ida::{IdaGossipTracker, IdaSnapshot};
use crate::route::{RouteSnapshot, RouteTxTracker};
use crate::streams::{ResultSinks, ResultStream};
use crate::TelemetryError;
use rapid_types::Digest;

/// Format an accept/fail report as `committee,key,iteration,total,received`.
pub fn accept_fail_line(report: &AcceptFailReport) -> String {
    format!(
        "{},{},{},{},{}",
        report.committee_id, report.key_id, report.iteration, report.total_votes, report.received
    )
}

/// Route-tx tracker, IDA-gossip tracker and the accept/fail log, writing
/// into one set of result streams.
pub struct TelemetryAggregator {
    routes: RouteTxTracker,
    ida: IdaGossipTracker,
    sinks: ResultSinks,
    /// Wait between the authoritative end/first-reconstruction report and
    /// the flush, so stragglers on other connections can land first.
    settle: Duration,
}

impl TelemetryAggregator {
    pub fn new(sinks: ResultSinks, settle: Duration) -> Self {
        Self {
            routes: RouteTxTracker::new(),
            ida: IdaGossipTracker::new(),
            sinks,
            settle,
        }
    }

    pub fn settle(&self) -> Duration {
        self.settle
    }

    /// `routetx`: first node to see the transaction.
    pub fn route_started(&self, ev: TimedId) -> bool {
        self.routes.mark_start(ev.id, ev.at)
    }

    /// `find_node`: transaction reached an intermediary committee.
    pub fn route_hop(&self, hop: RouteHop) -> bool {
        self.routes.mark_hop(hop.tx_id, hop.committee_id, hop.at)
    }

    /// `transaction_received`: transaction reached its destination committee.
    ///
    /// The authoritative caller waits out the settling delay and then writes
    /// the routing line. Returns `true` if this call flushed the record.
    pub async fn route_ended(&self, ev: TimedId) -> Result<bool, TelemetryError> {
        if !self.routes.mark_end(ev.id, ev.at) {
            return Ok(false);
        }
        tokio::time::sleep(self.settle).await;
        match self.routes.take_flush_line(&ev.id) {
            Some(line) => {
                self.sinks.append(ResultStream::Routing, &line).await?;
                tracing::debug!(tx = %ev.id, "routing record flushed");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// `start_ida_gossip`: a node began an IDA broadcast.
    pub fn ida_started(&self, ev: TimedId) -> bool {
        self.ida.mark_start(ev.id, ev.at)
    }

    /// `reconstructed_ida_gossip`: a node reconstructed the broadcast.
    ///
    /// The first report per id waits out the settling delay and then writes
    /// the reconstruction spread. Returns `true` if this call flushed.
    pub async fn ida_reconstructed(&self, ev: TimedId) -> Result<bool, TelemetryError> {
        if !self.ida.append_reconstructed(ev.id, ev.at) {
            return Ok(false);
        }
        tokio::time::sleep(self.settle).await;
        match self.ida.take_flush_line(&ev.id) {
            Some(line) => {
                self.sinks.append(ResultStream::Ida, &line).await?;
                tracing::debug!(root = %ev.id, "ida record flushed");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// `consensus_accept_fail`: appended straight to the sink.
    pub async fn accept_fail(&self, report: &AcceptFailReport) -> Result<(), TelemetryError> {
        tracing::info!(
            committee = %report.committee_id,
            key = %report.key_id,
            iteration = report.iteration,
            total_votes = report.total_votes,
            received = report.received,
            "consensus accept/fail"
        );
        self.sinks
            .append(ResultStream::ConsensusAcceptFail, &accept_fail_line(report))
            .await
    }

    /// `pocverify` / `pocadd`: elapsed time in nanoseconds.
    pub async fn poc_duration(
        &self,
        stream: ResultStream,
        elapsed: Duration,
    ) -> Result<(), TelemetryError> {
        let nanos = i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX);
        self.sinks.append_int(stream, nanos).await
    }

    pub fn route_snapshot(&self, id: &Digest) -> Option<RouteSnapshot> {
        self.routes.snapshot(id)
    }

    pub fn ida_snapshot(&self, id: &Digest) -> Option<IdaSnapshot> {
        self.ida.snapshot(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{MemorySink, ResultSink};
    use rapid_types::Timestamp;
    use std::sync::Arc;

    fn id(b: u8) -> Digest {
        Digest::new([b; 32])
    }

    fn ev(b: u8, secs: u64) -> TimedId {
        TimedId {
            id: id(b),
            at: Timestamp::from_secs(secs),
        }
    }

    fn aggregator(settle: Duration) -> (Arc<TelemetryAggregator>, Vec<Arc<MemorySink>>) {
        let memory: Vec<Arc<MemorySink>> = (0..6).map(|_| Arc::new(MemorySink::new())).collect();
        let mut it = memory.clone().into_iter();
        let sinks = ResultSinks::from_fn(|_| {
            let s: Arc<dyn ResultSink> = it.next().unwrap();
            s
        });
        (Arc::new(TelemetryAggregator::new(sinks, settle)), memory)
    }

    #[tokio::test]
    async fn route_flush_includes_hops_that_arrive_while_settling() {
        let (agg, memory) = aggregator(Duration::from_millis(50));
        agg.route_started(ev(1, 100));

        let ender = {
            let agg = Arc::clone(&agg);
            tokio::spawn(async move { agg.route_ended(ev(1, 110)).await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        agg.route_hop(RouteHop {
            tx_id: id(1),
            committee_id: id(9),
            at: Timestamp::from_secs(105),
        });

        assert!(ender.await.unwrap().unwrap());
        let routing = memory[3].lines();
        assert_eq!(routing, vec![format!("100,110,{},105", id(9))]);
    }

    #[tokio::test]
    async fn second_end_report_does_not_flush_again() {
        let (agg, memory) = aggregator(Duration::ZERO);
        assert!(agg.route_ended(ev(2, 5)).await.unwrap());
        assert!(!agg.route_ended(ev(2, 6)).await.unwrap());
        assert_eq!(memory[3].lines(), vec!["0,5"]);
        assert_eq!(agg.route_snapshot(&id(2)).unwrap().end, Some(Timestamp::from_secs(5)));
    }

    #[tokio::test]
    async fn ida_flushes_once_with_all_settled_reconstructions() {
        let (agg, memory) = aggregator(Duration::from_millis(30));
        agg.ida_started(ev(3, 50));
        let first = {
            let agg = Arc::clone(&agg);
            tokio::spawn(async move { agg.ida_reconstructed(ev(3, 52)).await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(!agg.ida_reconstructed(ev(3, 51)).await.unwrap());
        assert_eq!(agg.ida_snapshot(&id(3)).unwrap().reconstructed.len(), 2);
        assert!(first.await.unwrap().unwrap());
        assert_eq!(memory[4].lines(), vec!["50,52,51"]);
    }

    #[tokio::test]
    async fn accept_fail_is_written_verbatim() {
        let (agg, memory) = aggregator(Duration::ZERO);
        let report = AcceptFailReport {
            committee_id: id(1),
            key_id: id(2),
            iteration: 7,
            total_votes: 10,
            received: -1,
        };
        agg.accept_fail(&report).await.unwrap();
        assert_eq!(
            memory[5].lines(),
            vec![format!("{},{},7,10,-1", id(1), id(2))]
        );
    }

    #[tokio::test]
    async fn poc_durations_are_nanoseconds() {
        let (agg, memory) = aggregator(Duration::ZERO);
        agg.poc_duration(ResultStream::PocVerify, Duration::from_micros(2))
            .await
            .unwrap();
        agg.poc_duration(ResultStream::PocAdd, Duration::from_nanos(17))
            .await
            .unwrap();
        assert_eq!(memory[1].lines(), vec!["2000"]);
        assert_eq!(memory[2].lines(), vec!["17"]);
    }
}
