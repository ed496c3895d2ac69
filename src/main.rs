use std::io::BufRead;
use std::thread;

use anyhow::{Context, Result};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

use jamdeck::sidecar::SidecarManager;
use jamdeck::{Bridge, BridgeEvent, Config, StdoutHost};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    log::info!("Starting jamdeck");

    if let Err(e) = run().await {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = Config::from_env()?;
    let (events, receiver) = unbounded_channel();

    let mut sidecar = SidecarManager::new();
    let commands = sidecar
        .spawn(&config, events.clone())
        .context("Failed to start page sidecar")?;
    log::info!("Sidecar spawned successfully");

    // Host actions arrive on stdin, one name per line
    let actions = events.clone();
    thread::spawn(move || read_actions(actions));

    let shutdown = events.clone();
    ctrlc::set_handler(move || {
        log::info!("Received interrupt signal (Ctrl+C), shutting down...");
        let _ = shutdown.send(BridgeEvent::Shutdown);
    })
    .context("Failed to set Ctrl+C handler")?;
    drop(events);

    let host = StdoutHost::new(std::io::stdout());
    let mut bridge = Bridge::new(host, commands, config.poll_interval);
    bridge.run(receiver).await;

    sidecar.stop()?;
    log::info!("Sidecar stopped, bye");
    Ok(())
}

fn read_actions(events: UnboundedSender<BridgeEvent>) {
    let stdin = std::io::stdin();

    for line in stdin.lock().lines() {
        match line {
            Ok(line) => {
                let name = line.trim();
                if name.is_empty() {
                    continue;
                }
                if events.send(BridgeEvent::Action(name.to_string())).is_err() {
                    break;
                }
            }
            Err(e) => {
                log::error!("Error reading actions from stdin: {}", e);
                break;
            }
        }
    }

    log::debug!("Action reader stopped");
}
