use std::sync::Arc;

use rama::telemetry::tracing;
use tokio::task::JoinSet;

use super::{Checkpoints, ReadReport, StressTester, join_nodes, run_node, validate_node_count};
use crate::{error::BenchError, payload::NodeId, query::ReadSpec};

impl StressTester {
    /// Let every node issue the same query, all requests released at once.
    ///
    /// After the timed window closes, the query is issued once more
    /// (untimed) and its decoded result is part of the report. A failure
    /// of that extra query leaves the result empty.
    pub async fn read(&self, node_count: usize, spec: &ReadSpec) -> Result<ReadReport, BenchError> {
        validate_node_count(node_count)?;

        let query: Arc<str> = spec.to_influxql(self.precision).into();
        tracing::info!(nodes = node_count, %query, "start synchronized read");

        let checkpoints = Checkpoints::try_new(node_count)?;
        let mut nodes = JoinSet::new();

        for node in NodeId::all(node_count) {
            let checkpoints = checkpoints.clone();
            let transport = self.transport.clone();
            let query = query.clone();
            let timeout = self.request_timeout;

            nodes.spawn(async move {
                run_node(&checkpoints, node, timeout, Ok(()), move |()| async move {
                    transport.query_discard(&query).await
                })
                .await
            });
        }

        let (outcomes, lost) = join_nodes(nodes).await;
        let operation = self.finish("read", &checkpoints, outcomes, lost);

        let result = match self.transport.query_json(&query).await {
            Ok(result) => Some(result),
            Err(err) => {
                tracing::warn!(%query, "result query failed: {err}");
                None
            }
        };

        Ok(ReadReport {
            operation,
            query: query.to_string(),
            result,
        })
    }
}
