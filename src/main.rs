//! thinview - headless thin client for a remote-UI protocol
//!
//! This is the binary entry point. All logic lives in the workspace crates.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use thinview_core::{logging, Size};
use tracing::{error, info};

/// Replay a recorded server session and print the layout of its active screen
#[derive(Parser, Debug)]
#[command(name = "thinview")]
#[command(about = "Headless thin client for a remote-UI protocol", long_about = None)]
struct Args {
    /// Project directory holding .thinview/config.toml
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,

    /// Recorded session to answer requests from
    #[arg(long, value_name = "FILE")]
    replay: PathBuf,

    /// Window size to lay the screen out in
    #[arg(long, value_name = "WxH", default_value = "1024x768", value_parser = parse_size)]
    size: Size,

    /// Write a default .thinview/config.toml before running
    #[arg(long)]
    init: bool,
}

fn parse_size(raw: &str) -> std::result::Result<Size, String> {
    let (width, height) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {:?}", raw))?;
    let parse = |value: &str| {
        value
            .trim()
            .parse::<i32>()
            .ok()
            .filter(|v| *v > 0)
            .ok_or_else(|| format!("invalid dimension {:?}", value))
    };
    Ok(Size::new(parse(width)?, parse(height)?))
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    logging::init().map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

    let args = Args::parse();
    let project_path = args
        .path
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    if args.init {
        thinview_app::init_config_dir(&project_path)?;
        info!("Initialized config in {}", project_path.display());
    }

    let result = thinview_app::run_headless(&project_path, &args.replay, args.size).await;
    if let Err(ref e) = result {
        error!("Headless run failed: {:?}", e);
    }
    result?;
    Ok(())
}
