//! clean-shutdown demo service.
//!
//! Starts a worker pool, a group of ticking tasks on it and a liveness
//! watchdog over that group, registers all three with a coordinator, then
//! waits for a termination signal (or `--run-for`) and runs an awaited stop
//! pass.
//!
//! ```text
//!   signal / timer
//!        │
//!        ▼
//!   shutdown_awaiting ──▶ watchdog.stop ──▶ task group trigger ──▶ pool shutdown
//!        │                                         │                    │
//!        ▼                                         ▼                    ▼
//!   JSON summary   ◀──────────────────────  await tasks  ──────▶  await pool
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use serde_json::json;

use clean_shutdown::config::{load_config, CoordinatorConfig};
use clean_shutdown::health::LivenessWatchdog;
use clean_shutdown::lifecycle::signals::wait_for_shutdown_signal;
use clean_shutdown::observability::{logging, metrics};
use clean_shutdown::resource::{RuntimePool, TaskGroup};
use clean_shutdown::{CleanShutdown, ResourceHandle};

#[derive(Parser)]
#[command(name = "clean-shutdown")]
#[command(about = "Run managed resources until signalled, then stop them cleanly", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Worker threads in the managed pool.
    #[arg(long, default_value_t = 2)]
    workers: usize,

    /// Number of ticking tasks in the managed task group.
    #[arg(long, default_value_t = 4)]
    tasks: usize,

    /// Stop after this many seconds instead of waiting for a signal.
    #[arg(long)]
    run_for: Option<u64>,

    /// Per-resource await timeout in milliseconds (overrides config).
    #[arg(long)]
    timeout_ms: Option<u64>,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => CoordinatorConfig::default(),
    };
    if let Some(timeout_ms) = cli.timeout_ms {
        config.shutdown.await_timeout_ms = timeout_ms;
    }

    logging::init(&config.observability.log_level);
    tracing::info!("clean-shutdown v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let coordinator = CleanShutdown::from_config(&config.shutdown);

    let pool = Arc::new(RuntimePool::new("managed", cli.workers)?);
    let group = Arc::new(TaskGroup::new());
    for id in 0..cli.tasks {
        group.spawn(pool.handle(), move |mut signal| async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(250));
            let mut ticks: u64 = 0;
            loop {
                tokio::select! {
                    _ = ticker.tick() => ticks += 1,
                    _ = signal.recv() => break,
                }
            }
            tracing::debug!(task = id, ticks, "Task drained");
        });
    }

    let watched = group.clone();
    let watchdog = LivenessWatchdog::spawn("task-group", &config.watchdog, pool.handle(), move || {
        let alive = watched.active() > 0 && !watched.is_triggered();
        async move { alive }
    });

    coordinator.add_resource(ResourceHandle::watchdog(watchdog));
    coordinator.add_resource(ResourceHandle::event_loop(group));
    coordinator.add_resource(ResourceHandle::worker_pool(pool));

    tracing::info!(
        workers = cli.workers,
        tasks = cli.tasks,
        await_timeout_ms = config.shutdown.await_timeout_ms,
        exit_hook = coordinator.is_hook_installed(),
        "Resources registered"
    );

    let control = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let trigger = control.block_on(async {
        match cli.run_for {
            Some(secs) => {
                tokio::time::sleep(Duration::from_secs(secs)).await;
                Ok("timer")
            }
            None => wait_for_shutdown_signal().await,
        }
    })?;

    let started = Instant::now();
    let success = coordinator
        .shutdown_awaiting(Duration::from_millis(config.shutdown.await_timeout_ms))?
        .wait()?;

    let summary = json!({
        "trigger": trigger,
        "success": success,
        "resources": coordinator.len(),
        "elapsed_ms": started.elapsed().as_millis() as u64,
        "exit_hook_installed": coordinator.is_hook_installed(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    tracing::info!("Shutdown complete");
    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
