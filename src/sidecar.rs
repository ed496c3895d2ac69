use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

use crate::bridge::BridgeEvent;
use crate::config::Config;
use crate::types::{SidecarCommand, SidecarMessage};

const DEV_SCRIPT: &str = "sidecar/build/index.js";
const BUNDLED_BINARY: &str = "jamdeck-sidecar";

/// Manages the browser sidecar hosting the live page
#[derive(Clone)]
pub struct SidecarManager {
    child: Arc<Mutex<Option<Child>>>,
}

impl SidecarManager {
    pub fn new() -> Self {
        Self {
            child: Arc::new(Mutex::new(None)),
        }
    }

    /// Spawn the sidecar and start shuttling messages.
    ///
    /// Page messages end up on `events`; the returned sender takes commands
    /// for the page.
    pub fn spawn(
        &mut self,
        config: &Config,
        events: UnboundedSender<BridgeEvent>,
    ) -> Result<mpsc::Sender<SidecarCommand>> {
        log::info!("Spawning sidecar process...");

        let mut cmd = Self::command(config)?;
        cmd.env("JAMDECK_URL", &config.site_url)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().context("Failed to spawn sidecar process")?;
        log::info!("Sidecar process spawned with PID: {}", child.id());

        let stdin = child
            .stdin
            .take()
            .context("Failed to capture sidecar stdin")?;
        let stdout = child
            .stdout
            .take()
            .context("Failed to capture sidecar stdout")?;
        let stderr = child
            .stderr
            .take()
            .context("Failed to capture sidecar stderr")?;

        *self.child.lock() = Some(child);

        // stdout carries JSON messages
        thread::spawn(move || {
            Self::read_stdout(stdout, events);
        });

        // stderr is debug output
        thread::spawn(move || {
            Self::read_stderr(stderr);
        });

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            Self::write_stdin(stdin, rx);
        });

        Ok(tx)
    }

    /// Resolve how to launch the sidecar for this build
    fn command(config: &Config) -> Result<Command> {
        if let Some(path) = &config.sidecar_path {
            log::info!("Using sidecar from JAMDECK_SIDECAR: {:?}", path);
            return Ok(Self::command_for(path));
        }

        if cfg!(debug_assertions) {
            // Development: run the script with node, from the project root or
            // one level below it
            let cwd = std::env::current_dir().context("Failed to get current directory")?;
            let mut script_path = cwd.join(DEV_SCRIPT);
            if !script_path.exists() {
                script_path = cwd
                    .parent()
                    .context("No parent directory")?
                    .join(DEV_SCRIPT);
            }

            if !script_path.exists() {
                anyhow::bail!(
                    "Sidecar script not found at {:?}. Run 'cd sidecar && npm run build' first.",
                    script_path
                );
            }

            log::info!("Running sidecar in development mode: node {:?}", script_path);
            Ok(Self::command_for(&script_path))
        } else {
            let exe = std::env::current_exe().context("Failed to get current executable path")?;
            let binary = exe
                .parent()
                .context("Executable has no parent directory")?
                .join(BUNDLED_BINARY);

            if !binary.exists() {
                anyhow::bail!("Sidecar binary not found at {:?}", binary);
            }

            log::info!("Running bundled sidecar: {:?}", binary);
            Ok(Self::command_for(&binary))
        }
    }

    /// Scripts run under node, anything else is executed directly
    fn command_for(path: &Path) -> Command {
        if path.extension().map_or(false, |ext| ext == "js") {
            let mut cmd = Command::new("node");
            cmd.arg(path);
            cmd
        } else {
            Command::new(PathBuf::from(path))
        }
    }

    /// Turn one stdout line into an event; blank and malformed lines yield
    /// nothing
    fn parse_line(line: &str) -> Option<BridgeEvent> {
        if line.trim().is_empty() {
            return None;
        }

        match serde_json::from_str::<SidecarMessage>(line) {
            Ok(message) => Some(BridgeEvent::Sidecar(message)),
            Err(e) => {
                log::error!("Failed to parse sidecar message: {} - {}", e, line);
                None
            }
        }
    }

    fn read_stdout(stdout: std::process::ChildStdout, events: UnboundedSender<BridgeEvent>) {
        let reader = BufReader::new(stdout);

        for line in reader.lines() {
            match line {
                Ok(line) => {
                    if let Some(event) = Self::parse_line(&line) {
                        if events.send(event).is_err() {
                            log::debug!("Bridge gone, stopping sidecar reader");
                            return;
                        }
                    }
                }
                Err(e) => {
                    log::error!("Error reading sidecar stdout: {}", e);
                    break;
                }
            }
        }

        log::warn!("Sidecar stdout reader stopped");
        let _ = events.send(BridgeEvent::SidecarExited);
    }

    fn read_stderr(stderr: std::process::ChildStderr) {
        let reader = BufReader::new(stderr);

        for line in reader.lines() {
            match line {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        log::info!("[Sidecar] {}", line);
                    }
                }
                Err(e) => {
                    log::error!("Error reading sidecar stderr: {}", e);
                    break;
                }
            }
        }

        log::warn!("Sidecar stderr reader stopped");
    }

    fn write_stdin(mut stdin: ChildStdin, commands: mpsc::Receiver<SidecarCommand>) {
        for command in commands {
            if let Err(e) = Self::write_command(&mut stdin, &command) {
                log::error!("Failed to send {:?} to sidecar: {}", command, e);
                break;
            }
        }
        log::debug!("Sidecar stdin writer stopped");
    }

    fn write_command<W: Write>(out: &mut W, command: &SidecarCommand) -> Result<()> {
        serde_json::to_writer(&mut *out, command)?;
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(())
    }

    /// Pid to signal, or `None` when the OS id does not fit one
    #[cfg(unix)]
    fn signal_pid(id: u32) -> Option<nix::unistd::Pid> {
        match i32::try_from(id) {
            Ok(raw) => Some(nix::unistd::Pid::from_raw(raw)),
            Err(e) => {
                log::warn!("PID {} out of range for SIGTERM: {}", id, e);
                None
            }
        }
    }

    /// Stop the sidecar process
    pub fn stop(&self) -> Result<()> {
        let child_option = self.child.lock().take();
        if let Some(mut child) = child_option {
            log::info!("Stopping sidecar process with PID {}...", child.id());

            #[cfg(unix)]
            {
                use nix::sys::signal::{kill, Signal};

                if let Some(pid) = Self::signal_pid(child.id()) {
                    log::info!("Sending SIGTERM to sidecar process {}", pid);
                    if let Err(e) = kill(pid, Signal::SIGTERM) {
                        log::warn!("Failed to send SIGTERM to sidecar: {}", e);
                    }
                }
            }

            #[cfg(windows)]
            {
                log::info!("Killing sidecar process (Windows)");
                child.kill().ok();
            }

            // Wait for graceful shutdown (up to 2 seconds)
            let max_wait_ms = 2000;
            let check_interval_ms = 100;
            let mut waited_ms = 0;

            while waited_ms < max_wait_ms {
                thread::sleep(Duration::from_millis(check_interval_ms));
                waited_ms += check_interval_ms;

                match child.try_wait() {
                    Ok(Some(status)) => {
                        log::info!("Sidecar process exited gracefully with status: {:?}", status);
                        return Ok(());
                    }
                    Ok(None) => continue,
                    Err(e) => {
                        log::error!("Error checking sidecar status: {}", e);
                        break;
                    }
                }
            }

            log::warn!("Sidecar didn't stop after {}ms, sending SIGKILL...", max_wait_ms);
            child.kill().context("Failed to kill sidecar process")?;
            child.wait().context("Failed to wait for sidecar process")?;
            log::info!("Sidecar process forcefully terminated");
        }

        Ok(())
    }
}

impl Default for SidecarManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SidecarManager {
    fn drop(&mut self) {
        // Clones share the child; only the last one cleans up
        if Arc::strong_count(&self.child) > 1 {
            return;
        }
        if let Err(e) = self.stop() {
            log::error!("Error stopping sidecar in Drop: {}", e);
        }
    }
}
