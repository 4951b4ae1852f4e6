//! Benchmark orchestration.
//!
//! A [`StressTester`] runs one task per simulated node. Nodes prepare
//! their work, meet at the entry rendezvous (which stamps the start),
//! perform exactly one request, and meet again at the exit rendezvous
//! (which stamps the end). A node whose request fails still crosses
//! both rendezvous points; its failure is part of the report.

use std::{sync::Arc, time::Duration};

use rama::telemetry::tracing;
use tokio::{task::JoinSet, time::Instant};

use crate::{
    client::{WebClient, new_web_client},
    config::{Precision, TargetConfig},
    error::BenchError,
    payload::NodeId,
    rendezvous::Rendezvous,
    timing::{BenchmarkRun, TimingRecorder},
    transport::{InfluxTransport, TransportError, parse_headers},
};

mod read;
mod report;
mod write;


pub use self::{
    report::{OperationReport, ReadReport, WorkerFailure, WorkerOutcome, WriteReport},
    write::WriteParams,
};

/// Entry point of the benchmark core, bound to a single target database.
#[derive(Debug)]
pub struct StressTester {
    transport: InfluxTransport,
    precision: Precision,
    request_timeout: Option<Duration>,
    seed: Option<u64>,
    timing: TimingRecorder,
}

impl StressTester {
    /// Create a tester using the default web client.
    pub async fn connect(config: TargetConfig) -> Result<Self, BenchError> {
        let client = new_web_client().map_err(BenchError::Connectivity)?;
        Self::try_new(config, client).await
    }

    /// Create a tester using the given client.
    ///
    /// Fails fast for unsupported configuration, and with
    /// [`BenchError::Connectivity`] when the target does not answer a ping.
    pub async fn try_new(config: TargetConfig, client: WebClient) -> Result<Self, BenchError> {
        if config.precision != Precision::Milliseconds {
            return Err(BenchError::unsupported(format!(
                "timestamp precision '{}' (only 'ms' is supported)",
                config.precision
            )));
        }
        let headers = parse_headers(&config.headers)?;

        let tester = Self {
            transport: InfluxTransport::new(
                client,
                config.base_url(),
                config.database.clone(),
                config.precision,
                headers,
            ),
            precision: config.precision,
            request_timeout: config.request_timeout(),
            seed: config.seed,
            timing: TimingRecorder::new(),
        };

        let elapsed = tester.ping().await?;
        tracing::info!(
            target = %config.base_url(),
            database = %config.database,
            ?elapsed,
            "stress target is reachable",
        );

        Ok(tester)
    }

    /// Elapsed time of the most recently completed operation.
    ///
    /// `None` as long as no operation completed. Do not read this
    /// while an operation is in flight on another task.
    pub fn elapsed(&self) -> Option<Duration> {
        self.timing.elapsed()
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub async fn ping(&self) -> Result<Duration, BenchError> {
        let (elapsed, result) = self.timed(self.transport.ping()).await;
        result.map_err(|err| BenchError::Connectivity(err.into()))?;
        Ok(elapsed)
    }

    pub async fn create_db(&self) -> Result<Duration, BenchError> {
        let (elapsed, result) = self.timed(self.transport.create_database()).await;
        result.map_err(|err| BenchError::RequestFailure(err.into()))?;
        Ok(elapsed)
    }

    pub async fn drop_db(&self) -> Result<Duration, BenchError> {
        let (elapsed, result) = self.timed(self.transport.drop_database()).await;
        result.map_err(|err| BenchError::RequestFailure(err.into()))?;
        Ok(elapsed)
    }

    /// Single party timing of administrative calls; recorded even when the call fails.
    async fn timed<F: Future>(&self, fut: F) -> (Duration, F::Output) {
        let run = BenchmarkRun::new(1);
        run.mark_start();
        let output = fut.await;
        run.mark_end();
        (self.timing.record(&run).unwrap_or_default(), output)
    }

    fn finish(
        &self,
        operation: &'static str,
        checkpoints: &Checkpoints,
        outcomes: Vec<WorkerOutcome>,
        lost: usize,
    ) -> OperationReport {
        let elapsed = self.timing.record(&checkpoints.run).unwrap_or_default();
        let report = OperationReport {
            node_count: checkpoints.run.node_count(),
            elapsed,
            outcomes,
            lost,
        };

        tracing::info!(
            operation,
            nodes = report.node_count,
            ok = report.ok(),
            http_fail = report.http_failures(),
            other_fail = report.other_failures(),
            elapsed = ?report.elapsed,
            "benchmark operation finished",
        );
        for outcome in &report.outcomes {
            if let Some(failure) = &outcome.failure {
                tracing::warn!(operation, node = %outcome.node, "node failed: {failure}");
            }
        }

        report
    }
}

fn validate_node_count(node_count: usize) -> Result<(), BenchError> {
    if node_count == 0 {
        return Err(BenchError::invalid("node count must be at least 1"));
    }
    Ok(())
}

/// The entry and exit rendezvous of one operation, both stamping the same run.
struct Checkpoints {
    run: Arc<BenchmarkRun>,
    entry: Rendezvous<Instant>,
    exit: Rendezvous<Instant>,
}

impl Checkpoints {
    fn try_new(node_count: usize) -> Result<Arc<Self>, BenchError> {
        let run = Arc::new(BenchmarkRun::new(node_count));
        let entry = Rendezvous::try_new(node_count, {
            let run = run.clone();
            move || run.mark_start()
        })?;
        let exit = Rendezvous::try_new(node_count, {
            let run = run.clone();
            move || run.mark_end()
        })?;
        Ok(Arc::new(Self { run, entry, exit }))
    }
}

/// Drive one node through both rendezvous points.
///
/// `prepared` is the outcome of the node's preparation (done before arriving);
/// `call` performs the timed request and yields the payload size.
async fn run_node<P, F, Fut>(
    checkpoints: &Checkpoints,
    node: NodeId,
    timeout: Option<Duration>,
    prepared: Result<P, WorkerFailure>,
    call: F,
) -> WorkerOutcome
where
    F: FnOnce(P) -> Fut,
    Fut: Future<Output = Result<usize, TransportError>>,
{
    let ready_at = Instant::now();
    let released = checkpoints.entry.arrive_and_wait().await;

    let mut sent_at = None;
    let mut latency = None;
    let mut payload_bytes = 0;

    let failure = match (prepared, released) {
        (Err(failure), _) => Some(failure),
        (Ok(_), Err(err)) => Some(WorkerFailure::Rendezvous(err.to_string())),
        (Ok(input), Ok(_)) => {
            let start = Instant::now();
            sent_at = Some(start);
            let result = with_timeout(timeout, call(input)).await;
            latency = Some(start.elapsed());
            match result {
                Ok(bytes) => {
                    payload_bytes = bytes;
                    None
                }
                Err(failure) => Some(failure),
            }
        }
    };

    tracing::debug!(%node, ?latency, ok = failure.is_none(), "node request done");

    if let Err(err) = checkpoints.exit.arrive_and_wait().await {
        tracing::error!(%node, "failed to cross exit rendezvous: {err}");
    }

    WorkerOutcome {
        node,
        ready_at,
        sent_at,
        latency,
        payload_bytes,
        failure,
    }
}

async fn with_timeout<T, F>(timeout: Option<Duration>, fut: F) -> Result<T, WorkerFailure>
where
    F: Future<Output = Result<T, TransportError>>,
{
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result.map_err(WorkerFailure::from),
            Err(_) => Err(WorkerFailure::Timeout(limit)),
        },
        None => fut.await.map_err(WorkerFailure::from),
    }
}

/// Wait for every node task; outcomes are returned ordered by node.
async fn join_nodes(mut nodes: JoinSet<WorkerOutcome>) -> (Vec<WorkerOutcome>, usize) {
    let mut outcomes = Vec::with_capacity(nodes.len());
    let mut lost = 0;
    while let Some(result) = nodes.join_next().await {
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(err) => {
                tracing::error!("benchmark node task did not complete: {err}");
                lost += 1;
            }
        }
    }
    outcomes.sort_by_key(|outcome| outcome.node.index());
    (outcomes, lost)
}
