pub mod config;
pub mod export;
pub mod history;
pub mod listen;
pub mod notify;
pub mod run;
pub mod stats;

use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use iris_core::config::RunConfig;
use iris_core::frame::Camera;

/// Camera selector shared by the cube commands.
#[derive(Clone, Copy, ValueEnum)]
pub enum CameraArg {
    /// Merged frame
    #[value(name = "0", alias = "merged")]
    Merged,
    /// Camera 1
    #[value(name = "1")]
    One,
    /// Camera 2
    #[value(name = "2")]
    Two,
}

impl From<CameraArg> for Camera {
    fn from(arg: CameraArg) -> Self {
        match arg {
            CameraArg::Merged => Camera::Merged,
            CameraArg::One => Camera::One,
            CameraArg::Two => Camera::Two,
        }
    }
}

/// Default config, or the TOML file at `path`, with the run directory
/// optionally overridden.
pub fn load_config(path: Option<&Path>, data_dir: Option<&Path>) -> Result<RunConfig> {
    let mut config = match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Invalid run config {}", path.display()))?
        }
        None => RunConfig::default(),
    };
    if let Some(dir) = data_dir {
        config.data_dir = dir.to_path_buf();
    }
    Ok(config)
}
