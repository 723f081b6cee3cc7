//! The six result streams written during a run.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::sink::{FileSink, ResultSink};
use crate::TelemetryError;

/// One append-only result stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResultStream {
    /// Finalized-block throughput fed by the transaction generator.
    Tx,
    PocVerify,
    PocAdd,
    /// Per-transaction routing latency and hops.
    Routing,
    /// IDA-gossip reconstruction spread.
    Ida,
    ConsensusAcceptFail,
}

impl ResultStream {
    pub const ALL: [ResultStream; 6] = [
        ResultStream::Tx,
        ResultStream::PocVerify,
        ResultStream::PocAdd,
        ResultStream::Routing,
        ResultStream::Ida,
        ResultStream::ConsensusAcceptFail,
    ];

    /// File stem and metrics label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tx => "tx",
            Self::PocVerify => "pocverify",
            Self::PocAdd => "pocadd",
            Self::Routing => "routing",
            Self::Ida => "ida",
            Self::ConsensusAcceptFail => "consensusacceptfail",
        }
    }

    fn index(&self) -> usize {
        match self {
            Self::Tx => 0,
            Self::PocVerify => 1,
            Self::PocAdd => 2,
            Self::Routing => 3,
            Self::Ida => 4,
            Self::ConsensusAcceptFail => 5,
        }
    }
}

impl fmt::Display for ResultStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sink per [`ResultStream`].
#[derive(Clone)]
pub struct ResultSinks {
    sinks: [Arc<dyn ResultSink>; 6],
}

impl ResultSinks {
    /// Build the set by asking `make` for each stream in [`ResultStream::ALL`] order.
    pub fn from_fn<F>(mut make: F) -> Self
    where
        F: FnMut(ResultStream) -> Arc<dyn ResultSink>,
    {
        Self {
            sinks: ResultStream::ALL.map(&mut make),
        }
    }

    /// Create `<dir>/<stream>-<run_id>.csv` for every stream.
    pub fn create_files(dir: &Path, run_id: u64) -> Result<Self, TelemetryError> {
        std::fs::create_dir_all(dir).map_err(|source| TelemetryError::CreateSink {
            path: dir.to_path_buf(),
            source,
        })?;
        let open = |stream: ResultStream| -> Result<Arc<dyn ResultSink>, TelemetryError> {
            let path = dir.join(format!("{}-{}.csv", stream.as_str(), run_id));
            let sink = FileSink::create(&path)?;
            tracing::debug!(stream = %stream, path = %path.display(), "result file created");
            Ok(Arc::new(sink))
        };
        let [tx, poc_verify, poc_add, routing, ida, accept_fail] = ResultStream::ALL.map(open);
        Ok(Self {
            sinks: [tx?, poc_verify?, poc_add?, routing?, ida?, accept_fail?],
        })
    }

    /// Append one line to `stream` on the blocking pool. The line is
    /// written and synced when this returns.
    pub async fn append(&self, stream: ResultStream, line: &str) -> Result<(), TelemetryError> {
        let sink = Arc::clone(&self.sinks[stream.index()]);
        let line = line.to_owned();
        tokio::task::spawn_blocking(move || sink.append(&line)).await?
    }

    pub async fn append_int(&self, stream: ResultStream, value: i64) -> Result<(), TelemetryError> {
        self.append(stream, &value.to_string()).await
    }
}
