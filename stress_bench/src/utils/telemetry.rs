use std::io::IsTerminal as _;

use rama::{
    error::{BoxError, ErrorContext as _},
    telemetry::tracing::{
        self,
        subscriber::{EnvFilter, fmt::writer::BoxMakeWriter},
    },
};

use crate::Args;

const OWN_CRATES: [&str; 2] = ["influx_stress", "influx_stress_lib"];

/// Filter directives: `RUST_LOG` when defined, otherwise warnings for
/// dependencies and info (or debug when verbose) for the stress crates.
fn filter_directives(verbose: bool, env: Option<&str>) -> String {
    if let Some(env) = env.map(str::trim).filter(|env| !env.is_empty()) {
        return env.to_owned();
    }
    let level = if verbose { "debug" } else { "info" };
    std::iter::once("warn".to_owned())
        .chain(OWN_CRATES.iter().map(|name| format!("{name}={level}")))
        .collect::<Vec<_>>()
        .join(",")
}

/// Structured logging, filtered through the `RUST_LOG` environment variable.
///
/// Logs go to stderr (or the `--output` file), keeping stdout free for the reports.
pub fn init_tracing(args: &Args) -> Result<(), BoxError> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directives = filter_directives(args.verbose, env.as_deref());

    let make_writer = match args.output.as_deref() {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .append(true)
                .create(true)
                .open(path)
                .context("open log file")?;

            BoxMakeWriter::new(file)
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let subscriber = tracing::subscriber::fmt()
        .with_ansi(args.output.is_none() && std::io::stderr().is_terminal())
        .with_env_filter(EnvFilter::builder().parse_lossy(&directives))
        .with_writer(make_writer);

    if args.pretty {
        subscriber.pretty().try_init()?;
    } else {
        subscriber.try_init()?;
    }

    tracing::debug!(%directives, "tracing is set up");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_only_raises_own_crates() {
        assert_eq!(
            filter_directives(false, None),
            "warn,influx_stress=info,influx_stress_lib=info"
        );
        assert_eq!(
            filter_directives(true, Some("  ")),
            "warn,influx_stress=debug,influx_stress_lib=debug"
        );
    }

    #[test]
    fn rust_log_takes_precedence() {
        assert_eq!(filter_directives(true, Some("rama=trace")), "rama=trace");
    }
}
