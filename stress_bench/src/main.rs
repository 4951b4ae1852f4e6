use std::{path::PathBuf, time::Duration};

use rama::{error::BoxError, graceful, telemetry::tracing};

use clap::{Parser, Subcommand};

pub mod cmd;
pub mod config;
pub mod reporter;
pub mod utils;

#[cfg(target_family = "unix")]
#[global_allocator]
static ALLOC: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[cfg(target_os = "windows")]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// CLI arguments for configuring influx-stress behavior.
#[derive(Debug, Clone, Parser)]
#[command(name = "influx-stress")]
#[command(bin_name = "influx-stress")]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    cmds: CliCommands,

    /// debug logging as default instead of Info; use RUST_LOG env for more options
    #[arg(long, short = 'v', default_value_t = false, global = true)]
    pub verbose: bool,

    /// enable pretty logging (format for humans)
    #[arg(long, default_value_t = false, global = true)]
    pub pretty: bool,

    /// write the tracing output to the provided (log) file instead of stderr
    #[arg(long, short = 'o', global = true)]
    pub output: Option<PathBuf>,

    /// report json lines instead of a human-friendly format
    #[arg(long, default_value_t = false, global = true)]
    pub json: bool,

    /// JSON file with the target configuration,
    /// flags defined on the command line overwrite its properties.
    #[arg(long, short = 'c', value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[clap(flatten)]
    pub target: config::TargetArgs,

    #[arg(long, value_name = "SECONDS", default_value_t = 0., global = true)]
    /// the graceful shutdown timeout (<= 0.0 = no timeout)
    pub graceful: f64,
}

#[derive(Debug, Clone, Subcommand)]
enum CliCommands {
    /// ping the target and report the round trip time
    Ping,
    /// create the target database
    CreateDb,
    /// drop the target database
    DropDb,
    Write(self::cmd::write::WriteCommand),
    Read(self::cmd::read::ReadCommand),
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();

    utils::telemetry::init_tracing(&args)?;

    let base_shutdown_signal = graceful::default_signal();
    if let Err(err) = run_with_args(base_shutdown_signal, args).await {
        eprintln!("🚩 exit with error: {err}");
        std::process::exit(1);
    }

    Ok(())
}

/// run an influx-stress cmd with the given args
async fn run_with_args<F>(base_shutdown_signal: F, args: Args) -> Result<(), BoxError>
where
    F: Future<Output: Send + 'static> + Send + 'static,
{
    let graceful_timeout = (args.graceful > 0.).then(|| Duration::from_secs_f64(args.graceful));

    let target = config::resolve_target_config(args.config.as_deref(), args.target).await?;
    let reporter = reporter::new_reporter(args.json);

    let (error_tx, error_rx) = tokio::sync::oneshot::channel::<String>();
    let (result_tx, result_rx) = tokio::sync::oneshot::channel::<Result<(), BoxError>>();
    let graceful = graceful::Shutdown::new(new_shutdown_signal(error_rx, base_shutdown_signal));

    graceful.spawn_task_fn(async move |guard| {
        let result = match args.cmds {
            CliCommands::Ping => {
                self::cmd::admin::exec(guard, target, reporter, cmd::admin::AdminOp::Ping).await
            }
            CliCommands::CreateDb => {
                self::cmd::admin::exec(guard, target, reporter, cmd::admin::AdminOp::CreateDb)
                    .await
            }
            CliCommands::DropDb => {
                self::cmd::admin::exec(guard, target, reporter, cmd::admin::AdminOp::DropDb).await
            }
            CliCommands::Write(write_args) => {
                self::cmd::write::exec(guard, target, reporter, write_args).await
            }
            CliCommands::Read(read_args) => {
                self::cmd::read::exec(guard, target, reporter, read_args).await
            }
        };
        if let Err(err) = &result {
            let _ = error_tx.send(err.to_string());
        }
        let _ = result_tx.send(result);
    });

    let delay = match graceful_timeout {
        Some(duration) => graceful.shutdown_with_limit(duration).await?,
        None => graceful.shutdown().await,
    };

    tracing::debug!("gracefully shutdown with a delay of: {delay:?}");

    match result_rx.await {
        Ok(result) => result,
        Err(_) => Err(BoxError::from("command cancelled before completion")),
    }
}

fn new_shutdown_signal(
    error_rx: tokio::sync::oneshot::Receiver<String>,
    base_shutdown_signal: impl Future<Output: Send + 'static> + Send + 'static,
) -> impl Future + Send + 'static {
    async move {
        tokio::select! {
            _ = base_shutdown_signal => {
                tracing::debug!("default signal triggered: init graceful shutdown");
            }
            result = error_rx => {
                match result {
                    Ok(err) => {
                        tracing::error!("fatal err received: {err}; abort");
                    },
                    Err(_) => {
                        tracing::debug!("command is finished without error, return control");
                    },
                }
            }
        }
    }
}
