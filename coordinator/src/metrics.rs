//! Prometheus metrics for the coordinator.
//!
//! [`CoordinatorMetrics`] owns its own [`Registry`]; the daemon renders it
//! in the text exposition format when the run ends.

use prometheus::{
    register_int_counter_vec_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

pub struct CoordinatorMetrics {
    pub registry: Registry,

    /// Nodes that completed the bootstrap handshake.
    pub registered_nodes: IntGauge,
    /// Telemetry messages decoded, by envelope tag.
    pub telemetry_messages: IntCounterVec,
    /// Lines appended to each result stream.
    pub records_flushed: IntCounterVec,
    /// `consensus` hook reports, by tag; unknown tags share `other`.
    pub consensus_tags: IntCounterVec,
    pub ida_successes: IntCounter,
}

impl CoordinatorMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let registered_nodes = register_int_gauge_with_registry!(
            Opts::new("rapid_registered_nodes", "Nodes registered during bootstrap"),
            registry
        )?;
        let telemetry_messages = register_int_counter_vec_with_registry!(
            Opts::new(
                "rapid_telemetry_messages_total",
                "Telemetry messages received, by kind"
            ),
            &["kind"],
            registry
        )?;
        let records_flushed = register_int_counter_vec_with_registry!(
            Opts::new(
                "rapid_records_flushed_total",
                "Lines appended to result streams"
            ),
            &["stream"],
            registry
        )?;
        let consensus_tags = register_int_counter_vec_with_registry!(
            Opts::new("rapid_consensus_tags_total", "Consensus hook reports, by tag"),
            &["tag"],
            registry
        )?;
        let ida_successes = register_int_counter_with_registry!(
            Opts::new("rapid_ida_success_total", "IDASuccess hook reports"),
            registry
        )?;

        Ok(Self {
            registry,
            registered_nodes,
            telemetry_messages,
            records_flushed,
            consensus_tags,
            ida_successes,
        })
    }

    pub fn record_message(&self, kind: &str) {
        self.telemetry_messages.with_label_values(&[kind]).inc();
    }

    pub fn record_flush(&self, stream: &str) {
        self.records_flushed.with_label_values(&[stream]).inc();
    }

    pub fn record_consensus_tag(&self, tag: &str) {
        let label = match tag {
            "echo" | "pending" | "accept" => tag,
            _ => "other",
        };
        self.consensus_tags.with_label_values(&[label]).inc();
    }

    /// Text exposition of every metric in the registry.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_contains_registered_series() {
        let metrics = CoordinatorMetrics::new().unwrap();
        metrics.registered_nodes.set(4);
        metrics.record_message("routetx");
        metrics.record_message("routetx");
        metrics.record_flush("routing");
        metrics.record_consensus_tag("accept");
        metrics.ida_successes.inc();

        let text = metrics.render().unwrap();
        assert!(text.contains("rapid_registered_nodes 4"));
        assert!(text.contains(r#"rapid_telemetry_messages_total{kind="routetx"} 2"#));
        assert!(text.contains(r#"rapid_records_flushed_total{stream="routing"} 1"#));
        assert!(text.contains(r#"rapid_consensus_tags_total{tag="accept"} 1"#));
        assert!(text.contains("rapid_ida_success_total 1"));
    }

    #[test]
    fn unknown_consensus_tags_share_one_label() {
        let metrics = CoordinatorMetrics::new().unwrap();
        for tag in ["echo", "x1", "x2", "ECHO", "pending"] {
            metrics.record_consensus_tag(tag);
        }
        assert_eq!(metrics.consensus_tags.with_label_values(&["other"]).get(), 3);
        assert_eq!(metrics.consensus_tags.with_label_values(&["echo"]).get(), 1);
        let text = metrics.render().unwrap();
        assert!(!text.contains(r#"tag="x1""#));
    }

    #[test]
    fn separate_instances_do_not_share_a_registry() {
        let a = CoordinatorMetrics::new().unwrap();
        let b = CoordinatorMetrics::new().unwrap();
        a.ida_successes.inc();
        assert_eq!(b.ida_successes.get(), 0);
    }
}
