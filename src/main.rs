use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use tokio::io::AsyncBufReadExt;
use tokio::signal::unix::{signal, SignalKind};

use ps2_spi_decoder::output::{sink_for, OutputFormat};
use ps2_spi_decoder::{Config, Monitor};

#[derive(Debug, Parser)]
#[command(name = "ps2-spi-decoder", about = "Decode PS2 controller traffic from SPI analyzer captures")]
struct Opt {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Output format, overrides the configuration file
    #[arg(short, long)]
    format: Option<OutputFormat>,
    /// Also report transactions with unknown commands or bad start bytes
    #[arg(long)]
    emit_invalid: bool,
    /// JSON Lines capture to decode. Reads stdin until EOF when omitted.
    capture: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logger();

    let opt = Opt::parse();

    info!("PS2 SPI decoder starting...");

    let config = load_config(&opt)?;
    let sink = sink_for(config.output.format, io::stdout());
    let mut monitor = Monitor::new(config, sink).context("Invalid configuration")?;

    match &opt.capture {
        Some(path) => {
            info!("Decoding capture: {}", path.display());
            let file = File::open(path)
                .context(format!("Failed to open capture: {}", path.display()))?;
            monitor
                .run_reader(BufReader::new(file))
                .context(format!("Failed to decode capture: {}", path.display()))?;
        }
        None => stream_stdin(&opt, &mut monitor).await?,
    }

    info!("PS2 SPI decoder done");
    Ok(())
}

/// Decodes a live capture piped into stdin until EOF or a termination signal.
async fn stream_stdin(opt: &Opt, monitor: &mut Monitor) -> Result<()> {
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    // Setup signal handling via tokio
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;
    let mut sighup = signal(SignalKind::hangup()).context("Failed to setup SIGHUP handler")?;

    info!("Reading capture from stdin");

    loop {
        tokio::select! {
            result = monitor.poll(&mut lines) => {
                match result {
                    Ok(true) => {}
                    Ok(false) => {
                        info!("End of input");
                        break;
                    }
                    Err(e) => {
                        error!("Decode error: {}", e);
                        return Err(e.into());
                    }
                }
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down gracefully");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down gracefully");
                break;
            }
            _ = sighup.recv() => {
                match &opt.config {
                    Some(path) => {
                        info!("Received SIGHUP, reloading configuration");
                        // a broken file keeps the running configuration
                        let reloaded = Config::load(path)
                            .and_then(|new_config| monitor.reload_config(apply_overrides(opt, new_config)));
                        if let Err(e) = reloaded {
                            error!("Failed to reload config file {}: {}", path.display(), e);
                        }
                    }
                    None => info!("Received SIGHUP, no configuration file to reload"),
                }
            }
        }
    }

    monitor.finish()?;
    Ok(())
}

fn load_config(opt: &Opt) -> Result<Config> {
    let config = match &opt.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            let config = Config::load(path)
                .context(format!("Failed to load config file: {}", path.display()))?;
            info!("Configuration loaded successfully");
            config
        }
        None => Config::default(),
    };

    Ok(apply_overrides(opt, config))
}

fn apply_overrides(opt: &Opt, mut config: Config) -> Config {
    if let Some(format) = opt.format {
        config.output.format = format;
    }
    if opt.emit_invalid {
        config.decoder.emit_invalid = true;
    }
    config
}

fn init_logger() {
    // Logs go to stderr, decoded frames to stdout.
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();
}
