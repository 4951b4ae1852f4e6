use std::time::SystemTime;

use clap::Args;
use rama::{
    error::{BoxError, ErrorContext as _},
    graceful::ShutdownGuard,
    telemetry::tracing,
};

use influx_stress_lib::{SensorCounts, TargetConfig, WriteParams};

use crate::{
    config::parse_date,
    reporter::{Reporter, report_write},
};

#[derive(Debug, Clone, Args)]
/// measure how fast concurrently writing nodes are ingested
pub struct WriteCommand {
    /// amount of nodes writing at the same time
    #[arg(long, short = 'n', value_name = "N", default_value_t = 1)]
    nodes: usize,

    /// float sensors per node
    #[arg(long = "float", value_name = "N", default_value_t = 1)]
    float_sensors: usize,

    /// integer sensors per node
    #[arg(long = "int", value_name = "N", default_value_t = 1)]
    int_sensors: usize,

    /// string sensors per node
    #[arg(long = "str", value_name = "N", default_value_t = 1)]
    str_sensors: usize,

    /// boolean sensors per node
    #[arg(long = "bool", value_name = "N", default_value_t = 1)]
    bool_sensors: usize,

    /// amount of seconds of readings every node accumulated before writing
    #[arg(long, value_name = "SECONDS", default_value_t = 1)]
    duration: u64,

    /// timestamp of the first readings, `YYYY-MM-DD[ HH[:MM[:SS]]]` in UTC (default: now)
    #[arg(long, value_name = "DATE", value_parser = parse_date)]
    start_date: Option<SystemTime>,
}

impl WriteCommand {
    fn params(&self) -> WriteParams {
        WriteParams {
            node_count: self.nodes,
            sensors: SensorCounts {
                float: self.float_sensors,
                int: self.int_sensors,
                str: self.str_sensors,
                bool: self.bool_sensors,
            },
            duration_secs: self.duration,
            start: self.start_date,
        }
    }
}

pub async fn exec(
    guard: ShutdownGuard,
    target: TargetConfig,
    mut reporter: Box<dyn Reporter>,
    args: WriteCommand,
) -> Result<(), BoxError> {
    let params = args.params();
    tracing::info!(?params, "write parameters ready");

    let tester = super::connect(target).await?;

    let report = tokio::select! {
        _ = guard.cancelled() => {
            tracing::error!("exit write early: guard shutdown");
            return Ok(());
        }
        result = tester.write(&params) => result.context("synchronized write")?,
    };

    report_write(reporter.as_mut(), &report);
    Ok(())
}
