use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use iris_core::config::RunConfig;
use iris_core::context::RunContext;
use iris_core::io::cube::CubeReader;
use iris_core::io::image_io::save_frame;

use super::CameraArg;

#[derive(Args)]
pub struct ExportArgs {
    /// Cube to read from
    #[arg(value_enum)]
    pub camera: CameraArg,

    /// Odometer number of the frame
    pub odometer: i64,

    /// Output image (.png or .tiff)
    pub output: PathBuf,
}

pub fn run(args: &ExportArgs, config: RunConfig) -> Result<()> {
    let ctx = RunContext::new(config);
    let cube = ctx.cubes().path(args.camera.into());
    let reader = CubeReader::open(&cube)
        .with_context(|| format!("Failed to open cube {}", cube.display()))?;
    let Some(index) = reader.find_frame(args.odometer) else {
        bail!("Odometer {} not found in {}", args.odometer, cube.display());
    };
    let frame = reader.read_frame(index)?;
    save_frame(&frame, &args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    println!(
        "Frame {} (odometer {}) saved to {}",
        index,
        args.odometer,
        args.output.display()
    );
    Ok(())
}
