//! Telemetry reporting: one short-lived connection per message.

use std::net::SocketAddr;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use rapid_protocol::{write_frame, TelemetryMessage};

use crate::NodeError;

#[derive(Clone, Copy, Debug)]
pub struct TelemetryReporter {
    coordinator: SocketAddr,
}

impl TelemetryReporter {
    pub fn new(coordinator: SocketAddr) -> Self {
        Self { coordinator }
    }

    pub async fn report(&self, message: &TelemetryMessage) -> Result<(), NodeError> {
        let envelope = message.to_envelope()?;
        let mut stream = TcpStream::connect(self.coordinator)
            .await
            .map_err(|source| NodeError::Connect {
                addr: self.coordinator,
                source,
            })?;
        write_frame(&mut stream, &envelope).await?;
        stream.shutdown().await?;
        tracing::trace!(kind = message.kind(), "telemetry reported");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapid_protocol::{read_frame, Envelope, TimedId};
    use rapid_types::{Digest, Timestamp};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn each_report_is_its_own_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let reporter = TelemetryReporter::new(listener.local_addr().unwrap());

        let messages = vec![
            TelemetryMessage::RouteTx(TimedId {
                id: Digest::new([1; 32]),
                at: Timestamp::from_secs(5),
            }),
            TelemetryMessage::Consensus("echo".into()),
        ];
        let sent = messages.clone();
        let client = tokio::spawn(async move {
            for m in &sent {
                reporter.report(m).await.unwrap();
            }
        });

        for expected in &messages {
            let (mut stream, _) = listener.accept().await.unwrap();
            let envelope: Envelope = read_frame(&mut stream).await.unwrap();
            assert_eq!(&TelemetryMessage::from_envelope(&envelope).unwrap(), expected);
        }
        client.await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_coordinator_is_a_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = TelemetryReporter::new(addr)
            .report(&TelemetryMessage::Consensus("accept".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::Connect { .. }));
    }
}
