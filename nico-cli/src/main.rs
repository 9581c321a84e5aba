mod cli;
mod commands;
mod config;
mod naming;

use std::process;

use anyhow::Result;
use clap::Parser;
use tracing::{Level, debug, error};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::{
    cli::{Args, ResolverKind},
    commands::Downloader,
    config::AppConfig,
};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    if let Err(e) = init_logging(args.verbose, args.quiet) {
        eprintln!("Error: {e}");
        process::exit(1);
    }

    if let Err(e) = run(args).await {
        error!("{e:#}");
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = AppConfig::load(args.config.as_deref())?;
    config.apply_args(&args);
    debug!(?config, "Loaded configuration");

    let credentials = config.credentials()?;
    let resolver = config.resolver();
    let downloader = Downloader::new(config, credentials);
    let output = args.output.as_deref();

    if args.timeshift {
        downloader.timeshift(&args.id, output).await
    } else {
        match resolver {
            ResolverKind::Api => downloader.video_api(&args.id, output).await,
            ResolverKind::Dom => downloader.video_dom(&args.id, output).await,
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) -> Result<()> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_level(verbose))
        .try_init()?;
    Ok(())
}
