use std::sync::mpsc::Sender;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{sleep_until, Instant};

use crate::adapter::SiteAdapter;
use crate::controller::Controller;
use crate::host::PlayerHost;
use crate::snapshot::SnapshotPage;
use crate::types::{SidecarCommand, SidecarMessage};

/// Everything that can wake the bridge up, apart from the poll timer
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    Sidecar(SidecarMessage),
    /// Action activated by the host
    Action(String),
    SidecarExited,
    Shutdown,
}

/// Single timeline driving the controller: events and poll ticks are
/// handled one at a time, never concurrently.
pub struct Bridge<H: PlayerHost> {
    controller: Controller<SnapshotPage, H>,
    commands: Sender<SidecarCommand>,
    poll_interval: Duration,
    attached: bool,
}

impl<H: PlayerHost> Bridge<H> {
    pub fn new(host: H, commands: Sender<SidecarCommand>, poll_interval: Duration) -> Self {
        let mut controller = Controller::new(SiteAdapter::new(SnapshotPage::blank()), host);
        controller.init_host();
        Self {
            controller,
            commands,
            poll_interval,
            attached: false,
        }
    }

    pub fn controller(&self) -> &Controller<SnapshotPage, H> {
        &self.controller
    }

    /// Run until shutdown, the sidecar goes away, or every sender is dropped
    pub async fn run(&mut self, mut events: UnboundedReceiver<BridgeEvent>) {
        let mut next_tick = Instant::now();

        loop {
            let polling = self.controller.is_polling();
            tokio::select! {
                biased;

                event = events.recv() => {
                    let event = match event {
                        Some(event) => event,
                        None => {
                            log::info!("Event channel closed, stopping bridge");
                            return;
                        }
                    };
                    let was_polling = self.controller.is_polling();
                    if !self.handle_event(event) {
                        return;
                    }
                    if !was_polling && self.controller.is_polling() {
                        next_tick = Instant::now();
                    }
                }
                _ = sleep_until(next_tick), if polling => {
                    self.controller.tick();
                    // Armed after the tick so a slow tick delays the next one
                    next_tick = Instant::now() + self.poll_interval;
                }
            }
            self.forward_clicks();
        }
    }

    /// Returns false when the bridge should stop
    pub fn handle_event(&mut self, event: BridgeEvent) -> bool {
        match event {
            BridgeEvent::Sidecar(SidecarMessage::Snapshot {
                url,
                ready_state,
                html,
            }) => {
                log::trace!("Snapshot of {} ({} bytes)", url, html.len());
                self.controller
                    .adapter_mut()
                    .page_mut()
                    .load(&url, ready_state, &html);
                if !self.attached {
                    self.attached = true;
                    self.controller.init_worker();
                }
            }
            BridgeEvent::Sidecar(SidecarMessage::Loaded) => {
                if self.attached {
                    self.controller.on_load_complete();
                } else {
                    log::debug!("Load signal before any snapshot, ignoring");
                }
            }
            BridgeEvent::Sidecar(SidecarMessage::Status { state, message }) => {
                log::info!("Sidecar status: {} - {:?}", state, message);
            }
            BridgeEvent::Sidecar(SidecarMessage::Error { message }) => {
                log::error!("Sidecar error: {}", message);
            }
            BridgeEvent::Action(name) => {
                self.controller.handle_action(name.trim());
            }
            BridgeEvent::SidecarExited => {
                log::warn!("Sidecar exited, stopping bridge");
                return false;
            }
            BridgeEvent::Shutdown => {
                log::info!("Shutdown requested");
                return false;
            }
        }
        true
    }

    fn forward_clicks(&mut self) {
        for selector in self.controller.adapter_mut().page_mut().take_clicks() {
            log::debug!("Clicking {}", selector);
            if self.commands.send(SidecarCommand::Click { selector }).is_err() {
                log::warn!("Sidecar command channel closed, dropping click");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::recording::RecordingHost;
    use crate::controller::ACTION_LIKE;
    use crate::types::{PlaybackState, ReadyState};
    use std::sync::mpsc;

    const PLAYING: &str = r#"<html><body>
        <a id="playPause" class="playing"></a>
        <span id="track-title">Hounds of Love</span>
        <span id="artist-name">Kate Bush</span>
    </body></html>"#;

    fn snapshot(ready_state: ReadyState) -> BridgeEvent {
        BridgeEvent::Sidecar(SidecarMessage::Snapshot {
            url: "https://www.thisismyjam.com/".to_string(),
            ready_state,
            html: PLAYING.to_string(),
        })
    }

    fn bridge() -> (Bridge<RecordingHost>, mpsc::Receiver<SidecarCommand>) {
        let (tx, rx) = mpsc::channel();
        (
            Bridge::new(RecordingHost::default(), tx, Duration::from_millis(500)),
            rx,
        )
    }

    #[test]
    fn first_ready_snapshot_starts_polling() {
        let (mut bridge, _rx) = bridge();
        assert_eq!(bridge.controller().host().enabled.get(ACTION_LIKE), Some(&false));
        assert!(!bridge.controller().is_polling());

        assert!(bridge.handle_event(snapshot(ReadyState::Interactive)));
        assert!(bridge.controller().is_polling());
    }

    #[test]
    fn loading_snapshot_waits_for_load_signal() {
        let (mut bridge, _rx) = bridge();
        bridge.handle_event(snapshot(ReadyState::Loading));
        bridge.handle_event(snapshot(ReadyState::Complete));
        assert!(!bridge.controller().is_polling());

        bridge.handle_event(BridgeEvent::Sidecar(SidecarMessage::Loaded));
        assert!(bridge.controller().is_polling());
    }

    #[test]
    fn stop_events() {
        let (mut bridge, _rx) = bridge();
        assert!(!bridge.handle_event(BridgeEvent::SidecarExited));
        assert!(!bridge.handle_event(BridgeEvent::Shutdown));
    }

    #[tokio::test(start_paused = true)]
    async fn run_ticks_until_shutdown() {
        let (mut bridge, rx) = bridge();
        let (events, receiver) = tokio::sync::mpsc::unbounded_channel();

        events.send(snapshot(ReadyState::Complete)).unwrap();
        events.send(BridgeEvent::Action("pause".to_string())).unwrap();

        let stopper = events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1200)).await;
            stopper.send(BridgeEvent::Shutdown).unwrap();
        });

        bridge.run(receiver).await;

        let host = bridge.controller().host();
        assert_eq!(host.state, Some(PlaybackState::Playing));
        assert_eq!(
            host.track.as_ref().and_then(|t| t.artist.as_deref()),
            Some("Kate Bush")
        );
        assert!(host.ticks >= 2);
        // The pause arrived before the first tick, while the state was
        // still unknown, so nothing was clicked
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn pause_while_playing_is_forwarded() {
        let (mut bridge, rx) = bridge();
        let (events, receiver) = tokio::sync::mpsc::unbounded_channel();
        events.send(snapshot(ReadyState::Complete)).unwrap();

        let actions = events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            actions.send(BridgeEvent::Action("pause".to_string())).unwrap();
            actions.send(BridgeEvent::Shutdown).unwrap();
        });

        bridge.run(receiver).await;

        assert_eq!(
            rx.try_recv(),
            Ok(SidecarCommand::Click {
                selector: "#playPause".to_string()
            })
        );
        assert!(rx.try_recv().is_err());
    }
}
