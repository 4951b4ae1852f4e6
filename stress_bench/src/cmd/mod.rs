use rama::{
    error::{BoxError, ErrorContext as _},
    telemetry::tracing,
};

use influx_stress_lib::{StressTester, TargetConfig};

pub mod admin;
pub mod read;
pub mod write;

/// Create a tester for the target, which pings it as part of its creation.
async fn connect(target: TargetConfig) -> Result<StressTester, BoxError> {
    let base_url = target.base_url();
    let tester = StressTester::connect(target)
        .await
        .with_context(|| format!("connect to influx target @ {base_url}"))?;
    tracing::debug!(%base_url, "connected to influx target");
    Ok(tester)
}
