use std::time::Duration;

use influx_stress_lib::{
    BenchError, OperationReport, ReadReport, WriteReport,
    bench::{WorkerFailure, WorkerOutcome},
};

mod human;
mod json;

pub use self::{human::HumanReporter, json::JsonlReporter};

pub trait Reporter: Send + 'static {
    fn on_outcome(&mut self, ev: &NodeEvent<'_>);
    fn finish(&mut self, summary: &Summary<'_>);
}

pub fn new_reporter(json: bool) -> Box<dyn Reporter> {
    if json {
        Box::new(JsonlReporter::new())
    } else {
        Box::new(HumanReporter::new())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Ping,
    CreateDb,
    DropDb,
    Write,
    Read,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Ping => "ping",
            Operation::CreateDb => "create_db",
            Operation::DropDb => "drop_db",
            Operation::Write => "write",
            Operation::Read => "read",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub total: usize,
    pub ok: usize,
    pub http_fail: usize,
    pub other_fail: usize,
}

impl Counters {
    fn from_report(report: &OperationReport) -> Self {
        Self {
            total: report.node_count,
            ok: report.ok(),
            http_fail: report.http_failures(),
            other_fail: report.other_failures(),
        }
    }
}

#[derive(Debug)]
pub struct NodeEvent<'a> {
    pub operation: Operation,
    pub outcome: &'a WorkerOutcome,
    /// Delay between the first request of the operation and the one of this node.
    pub send_offset: Option<Duration>,
}

impl NodeEvent<'_> {
    pub fn failure(&self) -> Option<&WorkerFailure> {
        self.outcome.failure.as_ref()
    }
}

#[derive(Debug)]
pub struct Summary<'a> {
    pub operation: Operation,
    pub elapsed: Duration,
    pub counts: Counters,
    pub payload_bytes: usize,
    pub max_latency: Option<Duration>,
    /// Largest delay between two requests of the same operation.
    pub send_spread: Option<Duration>,
    pub readings_per_node: Option<usize>,
    pub query: Option<&'a str>,
    pub result: Option<&'a serde_json::Value>,
    /// Why a single shot operation failed.
    pub error: Option<&'a str>,
}

impl<'a> Summary<'a> {
    fn from_operation(operation: Operation, report: &OperationReport) -> Self {
        Self {
            operation,
            elapsed: report.elapsed,
            counts: Counters::from_report(report),
            payload_bytes: report.payload_bytes(),
            max_latency: report.max_latency(),
            send_spread: send_spread(report),
            readings_per_node: None,
            query: None,
            result: None,
            error: None,
        }
    }

    fn admin(operation: Operation, elapsed: Duration, counts: Counters) -> Self {
        Self {
            operation,
            elapsed,
            counts,
            payload_bytes: 0,
            max_latency: Some(elapsed),
            send_spread: None,
            readings_per_node: None,
            query: None,
            result: None,
            error: None,
        }
    }
}

fn send_spread(report: &OperationReport) -> Option<Duration> {
    let mut sent = report.outcomes.iter().filter_map(|o| o.sent_at);
    let first = sent.next()?;
    let (min, max) = sent.fold((first, first), |(min, max), at| (min.min(at), max.max(at)));
    Some(max.saturating_duration_since(min))
}

fn report_nodes(reporter: &mut dyn Reporter, operation: Operation, report: &OperationReport) {
    let first_send = report.outcomes.iter().filter_map(|o| o.sent_at).min();
    for outcome in &report.outcomes {
        reporter.on_outcome(&NodeEvent {
            operation,
            outcome,
            send_offset: outcome
                .sent_at
                .zip(first_send)
                .map(|(at, first)| at.saturating_duration_since(first)),
        });
    }
}

pub fn report_admin(
    reporter: &mut dyn Reporter,
    operation: Operation,
    elapsed: Duration,
    error: Option<&BenchError>,
) {
    let mut counts = Counters {
        total: 1,
        ..Default::default()
    };
    match error {
        None => counts.ok = 1,
        Some(err) if err.is_http_status() => counts.http_fail = 1,
        Some(_) => counts.other_fail = 1,
    }

    let error = error.map(|err| err.to_string());
    reporter.finish(&Summary {
        error: error.as_deref(),
        ..Summary::admin(operation, elapsed, counts)
    });
}

pub fn report_write(reporter: &mut dyn Reporter, report: &WriteReport) {
    report_nodes(reporter, Operation::Write, &report.operation);
    reporter.finish(&Summary {
        readings_per_node: Some(report.readings_per_node),
        ..Summary::from_operation(Operation::Write, &report.operation)
    });
}

pub fn report_read(reporter: &mut dyn Reporter, report: &ReadReport) {
    report_nodes(reporter, Operation::Read, &report.operation);
    reporter.finish(&Summary {
        query: Some(report.query.as_str()),
        result: report.result.as_ref(),
        ..Summary::from_operation(Operation::Read, &report.operation)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    use influx_stress_lib::payload::NodeId;
    use rama::http::StatusCode;
    use tokio::time::Instant;

    #[derive(Default)]
    struct Recorder {
        events: Vec<(String, Option<Duration>, bool)>,
        summaries: Vec<(Operation, Counters, Option<usize>, Option<Duration>)>,
        elapsed: Vec<Duration>,
        errors: Vec<Option<String>>,
    }

    impl Reporter for Recorder {
        fn on_outcome(&mut self, ev: &NodeEvent<'_>) {
            self.events.push((
                ev.outcome.node.to_string(),
                ev.send_offset,
                ev.failure().is_none(),
            ));
        }

        fn finish(&mut self, summary: &Summary<'_>) {
            self.summaries.push((
                summary.operation,
                summary.counts,
                summary.readings_per_node,
                summary.send_spread,
            ));
            self.elapsed.push(summary.elapsed);
            self.errors.push(summary.error.map(str::to_owned));
        }
    }

    fn outcome(
        index: usize,
        sent_at: Option<Instant>,
        failure: Option<WorkerFailure>,
    ) -> WorkerOutcome {
        WorkerOutcome {
            node: NodeId::new(index, 10),
            ready_at: Instant::now(),
            sent_at,
            latency: sent_at.map(|_| Duration::from_millis(3)),
            payload_bytes: 100,
            failure,
        }
    }

    #[test]
    fn write_report_is_split_in_node_events_and_a_summary() {
        let t0 = Instant::now();
        let report = WriteReport {
            operation: OperationReport {
                node_count: 10,
                elapsed: Duration::from_millis(12),
                outcomes: vec![
                    outcome(1, Some(t0 + Duration::from_micros(40)), None),
                    outcome(2, Some(t0), None),
                    outcome(
                        3,
                        Some(t0 + Duration::from_micros(90)),
                        Some(WorkerFailure::HttpStatus(StatusCode::BAD_REQUEST)),
                    ),
                    outcome(4, None, Some(WorkerFailure::Payload("boom".to_owned()))),
                ],
                lost: 6,
            },
            readings_per_node: 20,
        };

        let mut recorder = Recorder::default();
        report_write(&mut recorder, &report);

        assert_eq!(
            recorder.events,
            [
                ("01".to_owned(), Some(Duration::from_micros(40)), true),
                ("02".to_owned(), Some(Duration::ZERO), true),
                ("03".to_owned(), Some(Duration::from_micros(90)), false),
                ("04".to_owned(), None, false),
            ]
        );
        assert_eq!(
            recorder.summaries,
            [(
                Operation::Write,
                Counters {
                    total: 10,
                    ok: 2,
                    http_fail: 1,
                    other_fail: 7,
                },
                Some(20),
                Some(Duration::from_micros(90)),
            )]
        );
    }

    #[test]
    fn admin_report_counts_a_single_success() {
        let mut recorder = Recorder::default();
        report_admin(&mut recorder, Operation::Ping, Duration::from_millis(1), None);

        assert!(recorder.events.is_empty());
        assert_eq!(recorder.summaries[0].0, Operation::Ping);
        assert_eq!(recorder.summaries[0].1.ok, 1);
        assert_eq!(recorder.errors, [None]);
    }

    #[test]
    fn failed_admin_report_keeps_elapsed_time_and_error() {
        let mut recorder = Recorder::default();
        let err = BenchError::RequestFailure("connection refused".into());
        report_admin(
            &mut recorder,
            Operation::CreateDb,
            Duration::from_millis(7),
            Some(&err),
        );

        assert_eq!(recorder.elapsed, [Duration::from_millis(7)]);
        assert_eq!(
            recorder.summaries[0].1,
            Counters {
                total: 1,
                ok: 0,
                http_fail: 0,
                other_fail: 1,
            }
        );
        assert_eq!(
            recorder.errors,
            [Some("request failure: connection refused".to_owned())]
        );
    }
}
