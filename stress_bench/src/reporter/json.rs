use super::{NodeEvent, Reporter, Summary};

#[derive(Debug, Default)]
pub struct JsonlReporter;

impl JsonlReporter {
    pub fn new() -> Self {
        Self
    }
}

fn micros(d: std::time::Duration) -> u128 {
    d.as_micros()
}

impl Reporter for JsonlReporter {
    fn on_outcome(&mut self, ev: &NodeEvent<'_>) {
        let line = serde_json::json!({
            "type": "event",
            "op": ev.operation.as_str(),
            "node": ev.outcome.node.to_string(),
            "ok": ev.outcome.is_ok(),
            "latency_us": ev.outcome.latency.map(micros),
            "send_offset_us": ev.send_offset.map(micros),
            "bytes": ev.outcome.payload_bytes,
            "failure": ev.failure().map(|failure| failure.to_string()),
        });
        println!("{}", line);
    }

    fn finish(&mut self, summary: &Summary<'_>) {
        let line = serde_json::json!({
            "type": "final",
            "op": summary.operation.as_str(),
            "elapsed_us": micros(summary.elapsed),
            "max_latency_us": summary.max_latency.map(micros),
            "send_spread_us": summary.send_spread.map(micros),
            "readings_per_node": summary.readings_per_node,
            "bytes": summary.payload_bytes,
            "total": {
                "total": summary.counts.total,
                "ok": summary.counts.ok,
                "http_fail": summary.counts.http_fail,
                "other_fail": summary.counts.other_fail,
            },
            "query": summary.query,
            "result": summary.result,
            "error": summary.error,
        });
        println!("{}", line);
    }
}
