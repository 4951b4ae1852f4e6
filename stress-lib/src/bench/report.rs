use std::time::Duration;

use rama::http::StatusCode;
use tokio::time::Instant;

use crate::{payload::NodeId, transport::TransportError};

/// Why a single node did not complete its request successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerFailure {
    /// The store answered with a non 2xx/3xx status.
    HttpStatus(StatusCode),
    /// The request could not be sent or its response not be read.
    Transport(String),
    /// No response within the configured request timeout.
    Timeout(Duration),
    /// The node could not prepare its payload.
    Payload(String),
    /// The node could not cross a rendezvous point.
    Rendezvous(String),
}

impl WorkerFailure {
    pub fn is_http_status(&self) -> bool {
        matches!(self, WorkerFailure::HttpStatus(_))
    }
}

impl From<TransportError> for WorkerFailure {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Status { status, .. } => WorkerFailure::HttpStatus(status),
            TransportError::Io(err) => WorkerFailure::Transport(err.to_string()),
        }
    }
}

impl std::fmt::Display for WorkerFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerFailure::HttpStatus(status) => write!(f, "http status {status}"),
            WorkerFailure::Transport(err) => write!(f, "transport: {err}"),
            WorkerFailure::Timeout(timeout) => write!(f, "timeout after {timeout:?}"),
            WorkerFailure::Payload(err) => write!(f, "payload: {err}"),
            WorkerFailure::Rendezvous(err) => write!(f, "rendezvous: {err}"),
        }
    }
}

/// What happened to a single node during one operation.
#[derive(Debug, Clone)]
pub struct WorkerOutcome {
    pub node: NodeId,
    /// When the node arrived at the entry rendezvous (payload ready).
    pub ready_at: Instant,
    /// When the node started its request, `None` if it never did.
    pub sent_at: Option<Instant>,
    /// Time between sending the request and having the full response.
    pub latency: Option<Duration>,
    /// Size of the request (write) or response (read) payload.
    pub payload_bytes: usize,
    pub failure: Option<WorkerFailure>,
}

impl WorkerOutcome {
    pub fn is_ok(&self) -> bool {
        self.failure.is_none()
    }
}

/// Aggregated result of one synchronized operation.
#[derive(Debug, Clone)]
pub struct OperationReport {
    pub node_count: usize,
    /// Time between the release of the entry and the exit rendezvous.
    pub elapsed: Duration,
    /// One outcome per node that ran to completion, ordered by node.
    pub outcomes: Vec<WorkerOutcome>,
    /// Nodes whose task died before it could report (should stay zero).
    pub lost: usize,
}

impl OperationReport {
    pub fn ok(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    pub fn http_failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.failure.as_ref().is_some_and(WorkerFailure::is_http_status))
            .count()
    }

    pub fn other_failures(&self) -> usize {
        self.failed() - self.http_failures()
    }

    pub fn failed(&self) -> usize {
        self.node_count - self.ok()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn payload_bytes(&self) -> usize {
        self.outcomes.iter().map(|o| o.payload_bytes).sum()
    }

    /// Latency of the slowest node that got a response.
    pub fn max_latency(&self) -> Option<Duration> {
        self.outcomes.iter().filter_map(|o| o.latency).max()
    }
}

#[derive(Debug, Clone)]
pub struct WriteReport {
    pub operation: OperationReport,
    /// Readings (= line protocol points) each node sent.
    pub readings_per_node: usize,
}

#[derive(Debug, Clone)]
pub struct ReadReport {
    pub operation: OperationReport,
    /// The InfluxQL statement every node issued.
    pub query: String,
    /// Result document of the extra, untimed, query; `None` if it failed.
    pub result: Option<serde_json::Value>,
}
