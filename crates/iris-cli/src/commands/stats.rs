use anyhow::{Context, Result};
use clap::Args;
use iris_core::config::RunConfig;
use iris_core::context::RunContext;

use crate::summary::print_stats;

#[derive(Args)]
pub struct StatsArgs {
    /// Odometer number of the exposure
    pub odometer: i64,
}

pub fn run(args: &StatsArgs, config: RunConfig) -> Result<()> {
    let ctx = RunContext::new(config);
    let record = ctx.frame_stats(args.odometer).with_context(|| {
        format!("Failed to read {}", ctx.store().path().display())
    })?;
    match record {
        Some(record) => print_stats(&record),
        None => println!("No stats yet for odometer {}", args.odometer),
    }
    Ok(())
}
