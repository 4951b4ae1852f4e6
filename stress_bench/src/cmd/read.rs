use clap::Args;
use rama::{
    error::{BoxError, ErrorContext as _},
    graceful::ShutdownGuard,
    telemetry::tracing,
};

use influx_stress_lib::{
    Aggregation, GroupInterval, ReadSpec, SensorKind, TargetConfig, TimeBound,
};

use crate::{
    config::parse_date,
    reporter::{Reporter, report_read},
};

#[derive(Debug, Clone, Args)]
/// measure how fast concurrently reading nodes are served
pub struct ReadCommand {
    /// amount of nodes reading at the same time
    #[arg(long, short = 'n', value_name = "N", default_value_t = 1)]
    nodes: usize,

    /// InfluxQL aggregation function
    #[arg(long, default_value = "mean")]
    aggregation: Aggregation,

    /// sensor kind (field) to aggregate: float, int, str or bool
    #[arg(long = "type", value_name = "KIND", default_value = "float")]
    kind: SensorKind,

    /// lower time bound, a `YYYY-MM-DD[ HH[:MM[:SS]]]` date (UTC) or an InfluxQL time expression
    #[arg(long, value_name = "BOUND", default_value = "now() - 5m", value_parser = parse_time_bound)]
    start_date: TimeBound,

    /// upper time bound, a `YYYY-MM-DD[ HH[:MM[:SS]]]` date (UTC) or an InfluxQL time expression
    #[arg(long, value_name = "BOUND", default_value = "now()", value_parser = parse_time_bound)]
    end_date: TimeBound,

    /// `GROUP BY time(..)` interval
    #[arg(long, value_name = "INTERVAL", default_value = "5s")]
    interval: GroupInterval,
}

impl ReadCommand {
    fn spec(&self) -> ReadSpec {
        ReadSpec {
            aggregation: self.aggregation.clone(),
            kind: self.kind,
            start: self.start_date.clone(),
            end: self.end_date.clone(),
            interval: self.interval.clone(),
        }
    }
}

/// Input that looks like a date must be a valid one, anything else is an expression.
fn parse_time_bound(s: &str) -> Result<TimeBound, String> {
    let looks_like_date = s.len() >= 10
        && s.as_bytes()[..4].iter().all(u8::is_ascii_digit)
        && s.as_bytes()[4] == b'-';
    if looks_like_date {
        parse_date(s).map(TimeBound::At).map_err(|err| err.to_string())
    } else if s.trim().is_empty() {
        Err("empty time bound".to_owned())
    } else {
        Ok(TimeBound::Expr(s.to_owned()))
    }
}

pub async fn exec(
    guard: ShutdownGuard,
    target: TargetConfig,
    mut reporter: Box<dyn Reporter>,
    args: ReadCommand,
) -> Result<(), BoxError> {
    let spec = args.spec();
    tracing::info!(nodes = args.nodes, ?spec, "read parameters ready");

    let tester = super::connect(target).await?;

    let report = tokio::select! {
        _ = guard.cancelled() => {
            tracing::error!("exit read early: guard shutdown");
            return Ok(());
        }
        result = tester.read(args.nodes, &spec) => result.context("synchronized read")?,
    };

    report_read(reporter.as_mut(), &report);
    Ok(())
}
