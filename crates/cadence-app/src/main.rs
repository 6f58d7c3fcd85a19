//! # Cadence
//!
//! A queued audio player driven from the terminal, playing through a
//! simulated output device.

mod commands;
mod services;
mod settings;

use std::time::Duration;

use anyhow::{Context, Result};
use cadence_audio::{Controller, SimulatedDriver};
use commands::Command;
use services::{LibraryCatalog, PlayerService};
use settings::Settings;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often driver events are drained.
const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they do not interleave with command output
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cadence=info,cadence_audio=info,cadence_core=info".into()),
        )
        .init();

    info!("Starting Cadence v{}", env!("CARGO_PKG_VERSION"));

    let mut settings = Settings::load().context("failed to load settings")?;
    let catalog = LibraryCatalog::load(settings.library_path.as_deref())
        .await
        .context("failed to load library")?
        .with_latency(Duration::from_millis(settings.catalog_latency_ms));

    // Give the simulated device the catalog's track lengths
    for track in catalog.all() {
        let seconds = track.duration_label.as_seconds();
        if seconds > 0 {
            settings
                .simulation
                .track_lengths
                .entry(track.source_locator.clone())
                .or_insert(seconds as f64);
        }
    }

    let (driver, events) =
        SimulatedDriver::spawn(settings.simulation).context("failed to start audio device")?;
    let controller = Controller::new(driver, events, &settings.player);
    let mut player = PlayerService::new(catalog, controller);

    println!("{}", commands::HELP);
    run(&mut player).await;

    let last = player.state().current_track().map(|t| t.id.clone());
    info!(?last, "Shutting down");
    Ok(())
}

/// Read commands from stdin until `quit` or end of input, draining driver
/// events in between.
async fn run(player: &mut PlayerService<LibraryCatalog, SimulatedDriver>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(EVENT_POLL_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        error!("Failed to read input: {e}");
                        break;
                    }
                };

                let command = match Command::parse(&line) {
                    Ok(command) => command,
                    Err(e) => {
                        println!("{e}");
                        continue;
                    }
                };
                if command == Command::Quit {
                    break;
                }

                match player.execute(command).await {
                    Ok(reply) => println!("{reply}"),
                    Err(e) if e.is_retryable() => {
                        warn!("Command failed: {e}");
                        println!("{e} (try again)");
                    }
                    Err(e) => println!("{e}"),
                }
            }
            _ = ticker.tick() => {
                for notice in player.pump() {
                    println!("{notice}");
                }
            }
        }
    }
}
