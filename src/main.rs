//! Rainfall Monitor CLI
//!
//! Watches a rain sensor feed and a weather forecast, and notifies once
//! per rain event over LINE and a synthesized voice announcement.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use rainfall_monitor::feed::forecast::JsonForecastFeed;
use rainfall_monitor::feed::influx::InfluxSensorFeed;
use rainfall_monitor::{
    healthz, Config, FileFootprintStore, FootprintStore, LineChannel, NotificationChannel,
    VoiceChannel, WatchCycle,
};

#[derive(Parser)]
#[command(name = "rainmon")]
#[command(about = "Detect the onset of rainfall and notify once per rain event")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the polling watch loop
    Watch {
        /// Config file path
        #[arg(long, short, default_value = "config.toml")]
        config: PathBuf,
        /// Stop after this many ticks (0 = run forever)
        #[arg(long, short = 'n', default_value = "0")]
        count: u32,
        /// Debug-level logging
        #[arg(long, short = 'D')]
        debug: bool,
    },
    /// Run a single tick and exit
    Once {
        /// Config file path
        #[arg(long, short, default_value = "config.toml")]
        config: PathBuf,
        /// Evaluate the gates but skip actual dispatch
        #[arg(long)]
        dry_run: bool,
        /// Debug-level logging
        #[arg(long, short = 'D')]
        debug: bool,
    },
    /// Liveness probe: exit 0 when the watch loop heartbeat is fresh
    Healthz {
        /// Config file path
        #[arg(long, short, default_value = "config.toml")]
        config: PathBuf,
        /// Debug-level logging
        #[arg(long, short = 'D')]
        debug: bool,
    },
}

fn init_logging(debug: bool) {
    let default_filter = if debug {
        "rainfall_monitor=debug,rainmon=debug"
    } else {
        "rainfall_monitor=info,rainmon=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt().with_env_filter(filter).init();
}

fn build_cycle(config: &Config) -> Result<WatchCycle> {
    let sensor = Box::new(InfluxSensorFeed::new(config.sensor.clone()));
    let forecast = Box::new(JsonForecastFeed::new(config.forecast.clone()));
    let footprints: Arc<dyn FootprintStore> =
        Arc::new(FileFootprintStore::new(&config.footprint.dir)?);
    let channels: Vec<Arc<dyn NotificationChannel>> = vec![
        Arc::new(LineChannel::new(config.notify.line.clone())),
        Arc::new(VoiceChannel::new(config.notify.voice.clone())),
    ];

    Ok(WatchCycle::new(
        config.clone(),
        sensor,
        forecast,
        footprints,
        channels,
    ))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Watch {
            config,
            count,
            debug,
        } => {
            init_logging(debug);
            let config = Config::load(&config)?;
            build_cycle(&config)?.run(count)?;
            info!("Finish.");
        }
        Commands::Once {
            config,
            dry_run,
            debug,
        } => {
            init_logging(debug);
            let config = Config::load(&config)?;
            build_cycle(&config)?.with_dry_run(dry_run).tick()?;
            info!("Finish.");
        }
        Commands::Healthz { config, debug } => {
            init_logging(debug);
            let config = Config::load(&config)?;
            let store = FileFootprintStore::new(&config.footprint.dir)?;
            let interval = Duration::from_secs(config.watch.interval_sec);

            if healthz::check_liveness(&store, &config.liveness.key, interval)? {
                info!("OK.");
            } else {
                error!("Liveness check failed");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
