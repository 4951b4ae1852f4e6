use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use rama::telemetry::tracing;
use tokio::task::JoinSet;

use super::{
    Checkpoints, StressTester, WorkerFailure, WriteReport, join_nodes, run_node,
    validate_node_count,
};
use crate::{
    error::BenchError,
    payload::{NodeId, PayloadGenerator, SensorCounts, node_rng},
};

/// Parameters of a synchronized write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteParams {
    pub node_count: usize,
    /// Number of sensors per kind every node reports each second.
    pub sensors: SensorCounts,
    /// Number of one-second time steps per node.
    pub duration_secs: u64,
    /// Timestamp of the first time step, defaults to now.
    pub start: Option<SystemTime>,
}

impl Default for WriteParams {
    fn default() -> Self {
        Self {
            node_count: 1,
            sensors: SensorCounts {
                float: 1,
                int: 1,
                str: 1,
                bool: 1,
            },
            duration_secs: 1,
            start: None,
        }
    }
}

impl StressTester {
    /// Let every node write its own batch, all requests released at once.
    ///
    /// Per node failures (such as a non-success status) do not fail the
    /// operation, they are counted in the returned report.
    pub async fn write(&self, params: &WriteParams) -> Result<WriteReport, BenchError> {
        validate_node_count(params.node_count)?;

        let start = params
            .start
            .unwrap_or_else(SystemTime::now)
            .duration_since(UNIX_EPOCH)
            .map_err(|_| BenchError::invalid("write start lies before the unix epoch"))?;
        let generator = PayloadGenerator::try_new(
            params.sensors,
            params.duration_secs,
            start,
            self.precision,
        )
        .map(Arc::new)
        .ok_or_else(|| BenchError::invalid("readings per node overflow (duration x sensors)"))?;

        tracing::info!(
            nodes = params.node_count,
            readings_per_node = generator.readings_per_batch(),
            "start synchronized write",
        );

        let checkpoints = Checkpoints::try_new(params.node_count)?;
        let mut nodes = JoinSet::new();

        for node in NodeId::all(params.node_count) {
            let checkpoints = checkpoints.clone();
            let generator = generator.clone();
            let transport = self.transport.clone();
            let seed = self.seed;
            let timeout = self.request_timeout;

            nodes.spawn(async move {
                let payload = tokio::task::spawn_blocking(move || {
                    let mut rng = node_rng(seed, &node);
                    generator.generate(node, &mut rng).encode()
                })
                .await
                .map_err(|err| WorkerFailure::Payload(err.to_string()));

                run_node(&checkpoints, node, timeout, payload, move |body: String| async move {
                    let size = body.len();
                    transport.write(body).await.map(|()| size)
                })
                .await
            });
        }

        let (outcomes, lost) = join_nodes(nodes).await;
        let operation = self.finish("write", &checkpoints, outcomes, lost);

        Ok(WriteReport {
            operation,
            readings_per_node: generator.readings_per_batch(),
        })
    }
}
