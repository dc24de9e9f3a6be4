//! Terminal logging for the headless driver.

use std::time::Instant;

use anyhow::{Context, Result};
use log::LevelFilter;

/// Installs a `fern` dispatcher writing to stderr at `level`.
///
/// Stdout stays reserved for simulation reports.
pub(crate) fn setup_logging(level: LevelFilter) -> Result<()> {
    let started = Instant::now();
    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{:>8.3}s {:<5} {}] {}",
                started.elapsed().as_secs_f32(),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
        .context("failed to install the logger")
}
