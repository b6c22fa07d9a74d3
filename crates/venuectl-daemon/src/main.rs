mod cli;
mod wiring;

use std::process::ExitCode;

use clap::Parser;
use log::{error, info};
use tokio::signal;

use cli::Cli;
use wiring::System;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Some(level) = &cli.log_level {
        // SAFETY: single-threaded at this point in startup, before env_logger
        // or any other reader of the environment has started.
        unsafe { std::env::set_var("RUST_LOG", level) };
    }
    env_logger::init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("fatal: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let raw = venuectl_commons::config::load_config(&cli.config)?;
    let system = System::build(&raw)?;
    info!("loaded {} device(s) from '{}'", system.registry.device_count(), cli.config);

    if cli.one_shot {
        info!("running a single monitor sweep (--one-shot)");
        let report = system.monitor.sweep().await;
        println!(
            "sweep complete: {}/{} online ({:.0}% online rate), {} alert(s)",
            report.online,
            report.total,
            report.online_rate * 100.0,
            report.alerts.len()
        );
        return Ok(());
    }

    system.scheduler.start().await?;
    info!("scheduler started; daily_turn_on={}, daily_turn_off={}", raw.schedule.on_time, raw.schedule.off_time);

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, stopping scheduler");

    system.scheduler.stop(true).await?;
    info!("shutdown complete");
    Ok(())
}

/// Waits for Ctrl+C or, on unix, SIGTERM — mirroring `kftray-server`'s
/// shutdown handling.
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("received Ctrl+C");
            }
            _ = async {
                if let Ok(mut sigterm) = signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    let _ = sigterm.recv().await;
                    info!("received SIGTERM");
                }
            } => {}
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.ok();
        info!("received Ctrl+C");
    }
}

