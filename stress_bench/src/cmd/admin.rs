use rama::{
    error::{BoxError, ErrorContext as _},
    graceful::ShutdownGuard,
    telemetry::tracing,
};

use influx_stress_lib::TargetConfig;

use crate::reporter::{Operation, Reporter, report_admin};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminOp {
    Ping,
    CreateDb,
    DropDb,
}

pub async fn exec(
    guard: ShutdownGuard,
    target: TargetConfig,
    mut reporter: Box<dyn Reporter>,
    op: AdminOp,
) -> Result<(), BoxError> {
    let tester = tokio::select! {
        _ = guard.cancelled() => {
            tracing::error!("exit admin command early: guard shutdown");
            return Ok(());
        }
        result = super::connect(target) => result?,
    };

    let (operation, result) = match op {
        AdminOp::Ping => (Operation::Ping, tester.ping().await),
        AdminOp::CreateDb => (Operation::CreateDb, tester.create_db().await),
        AdminOp::DropDb => (Operation::DropDb, tester.drop_db().await),
    };

    match &result {
        Ok(elapsed) => {
            tracing::info!(operation = operation.as_str(), ?elapsed, "admin operation finished");
            report_admin(reporter.as_mut(), operation, *elapsed, None);
        }
        Err(err) => {
            // the failed call is timed as well
            let elapsed = tester.elapsed().unwrap_or_default();
            tracing::error!(operation = operation.as_str(), ?elapsed, "admin operation failed: {err}");
            report_admin(reporter.as_mut(), operation, elapsed, Some(err));
        }
    }

    result.with_context(|| format!("{} influx target", operation.as_str()))?;
    Ok(())
}
