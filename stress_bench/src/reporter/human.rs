use super::{NodeEvent, Reporter, Summary};

#[derive(Debug, Default)]
pub struct HumanReporter;

impl HumanReporter {
    pub fn new() -> Self {
        Self
    }
}

fn millis(d: std::time::Duration) -> f64 {
    d.as_secs_f64() * 1000.
}

impl Reporter for HumanReporter {
    fn on_outcome(&mut self, ev: &NodeEvent<'_>) {
        let latency = ev.outcome.latency.map(millis).unwrap_or_default();
        let offset = ev.send_offset.map(millis).unwrap_or_default();

        match ev.failure() {
            None => println!(
                "op={} node={} ok latency={:.3}ms send_offset={:.3}ms bytes={}",
                ev.operation.as_str(),
                ev.outcome.node,
                latency,
                offset,
                ev.outcome.payload_bytes,
            ),
            Some(failure) => println!(
                "op={} node={} fail latency={:.3}ms send_offset={:.3}ms error={}",
                ev.operation.as_str(),
                ev.outcome.node,
                latency,
                offset,
                failure,
            ),
        }
    }

    fn finish(&mut self, summary: &Summary<'_>) {
        if let Some(query) = summary.query {
            println!("query: {query}");
        }
        if let Some(result) = summary.result {
            println!("{result:#}");
        }

        let mut line = format!(
            "done op={} elapsed={:.6}s ok={} http_fail={} other_fail={} total={}",
            summary.operation.as_str(),
            summary.elapsed.as_secs_f64(),
            summary.counts.ok,
            summary.counts.http_fail,
            summary.counts.other_fail,
            summary.counts.total,
        );
        if let Some(readings) = summary.readings_per_node {
            line.push_str(&format!(
                " readings_per_node={readings} bytes={}",
                summary.payload_bytes
            ));
        }
        if let Some(latency) = summary.max_latency {
            line.push_str(&format!(" max_latency={:.3}ms", millis(latency)));
        }
        if let Some(spread) = summary.send_spread {
            line.push_str(&format!(" send_spread={:.3}ms", millis(spread)));
        }
        if let Some(err) = summary.error {
            line.push_str(&format!(" error={err}"));
        }
        println!("{line}");
    }
}
