use anyhow::{Context, Result};
use clap::Args;
use iris_core::config::RunConfig;
use iris_core::remote::send_to_port;

#[derive(Args)]
pub struct NotifyArgs {
    /// Raw message, e.g. "update .iris/cube.m.cube" or "stop"
    pub message: String,

    /// Listener port (defaults to the config's daemon port)
    #[arg(long)]
    pub port: Option<u16>,
}

pub fn run(args: &NotifyArgs, config: RunConfig) -> Result<()> {
    let port = args.port.unwrap_or(config.daemon_port);
    send_to_port(port, &args.message)
        .with_context(|| format!("Failed to send {:?} to port {}", args.message, port))?;
    Ok(())
}
