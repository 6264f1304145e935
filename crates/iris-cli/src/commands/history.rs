use anyhow::{Context, Result};
use clap::Args;
use iris_core::config::RunConfig;
use iris_core::context::RunContext;
use iris_core::history::load_history;

use super::CameraArg;
use crate::summary::print_history;

#[derive(Args)]
pub struct HistoryArgs {
    /// Cube to list
    #[arg(long, value_enum, default_value = "0")]
    pub camera: CameraArg,
}

pub fn run(args: &HistoryArgs, config: RunConfig) -> Result<()> {
    let ctx = RunContext::new(config);
    let cube = ctx.cubes().path(args.camera.into());
    let entries = load_history(&cube, ctx.store())
        .with_context(|| format!("Failed to read cube {}", cube.display()))?;
    print_history(&cube, &entries);
    Ok(())
}
