use anyhow::{Context, Result};
use clap::Args;
use iris_core::config::RunConfig;
use iris_core::history::{load_history, reference_store_for};
use iris_core::remote::{Listener, RemoteCommand, UpdateAction, ViewerState};

use crate::summary::{print_history, print_stats};

#[derive(Args)]
pub struct ListenArgs {
    /// Listener port (defaults to the config's daemon port)
    #[arg(long)]
    pub port: Option<u16>,

    /// Ignore updates of the file already shown
    #[arg(long)]
    pub lock: bool,
}

/// Headless viewer: show the latest statistics of the cube named by each
/// `update` message, until `stop`.
pub fn run(args: &ListenArgs, config: RunConfig) -> Result<()> {
    let port = args.port.unwrap_or(config.daemon_port);
    let state = ViewerState::new();
    state.set_locked(args.lock);

    let listener = Listener::spawn(port, move |command| {
        let RemoteCommand::Update(path) = command else {
            return;
        };
        let cube = match state.handle_update(&path) {
            UpdateAction::Reload(p) | UpdateAction::Load(p) => p,
            UpdateAction::Ignored => {
                println!("Locked: ignoring update of {}", path.display());
                return;
            }
        };
        match load_history(&cube, &reference_store_for(&cube)) {
            Ok(entries) => {
                print_history(&cube, &entries);
                if let Some(stats) = entries.iter().rev().find_map(|e| e.stats.as_ref()) {
                    print_stats(stats);
                }
            }
            Err(e) => eprintln!("Cannot read {}: {}", cube.display(), e),
        }
    })
    .with_context(|| format!("Failed to listen on port {}", port))?;

    println!("Listening on {} (send \"stop\" to quit)", listener.local_addr());
    listener.join()?;
    Ok(())
}
