//! dirmirror command-line entry point

use anyhow::{Context, Result};
use clap::Parser;
use dirmirror::cli::Args;
use dirmirror::{logging, Synchronizer};
use tracing::{info, warn};

fn main() -> Result<()> {
    let args = Args::parse();
    args.validate()?;

    logging::init(
        args.verbose(),
        args.quiet(),
        args.output.log_file.as_deref(),
    )?;

    let config = args
        .to_config()
        .validated()
        .context("Cannot start mirroring")?;

    if args.log_file_inside(config.destination()) {
        warn!(
            "Warning: log file is inside the destination {} and will be deleted by the next pass",
            config.destination().display()
        );
    }

    info!(
        "Mirroring {} to {} every {}s{}",
        config.source().display(),
        config.destination().display(),
        config.interval.as_secs(),
        if config.one_shot { " (one shot)" } else { "" }
    );

    let mirror = Synchronizer::new(config)?;
    mirror.run()?;
    Ok(())
}
