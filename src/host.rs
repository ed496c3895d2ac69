use std::collections::BTreeMap;
use std::io::Write;

use serde::Serialize;

use crate::types::{Capabilities, PlaybackState, Track};

/// The media-player side of the bridge.
///
/// The controller pushes the full picture every tick without diffing, hosts
/// decide themselves what counts as a change.
pub trait PlayerHost {
    /// Register a named boolean action
    fn add_action(&mut self, group: &str, scope: &str, name: &str, label: &str, enabled: bool);

    /// Show already registered actions next to the transport controls
    fn add_extra_actions(&mut self, names: &[&str]);

    fn set_playback_state(&mut self, state: PlaybackState);
    fn set_track(&mut self, track: Track);
    fn set_can_go_prev(&mut self, can: bool);
    fn set_can_go_next(&mut self, can: bool);
    fn set_can_play(&mut self, can: bool);
    fn set_can_pause(&mut self, can: bool);

    fn update_enabled_flag(&mut self, action: &str, enabled: bool);
    fn update_state(&mut self, action: &str, checked: bool);

    /// Called once all values of a tick have been pushed
    fn tick_complete(&mut self) {}
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
pub struct ActionView {
    pub label: String,
    pub enabled: bool,
    pub checked: bool,
    pub extra: bool,
}

/// Everything a host has been told so far
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
pub struct HostView {
    pub state: PlaybackState,
    pub track: Track,
    #[serde(flatten)]
    pub capabilities: Capabilities,
    pub actions: BTreeMap<String, ActionView>,
}

impl HostView {
    fn action(&mut self, name: &str) -> &mut ActionView {
        self.actions.entry(name.to_string()).or_default()
    }
}

/// Writes the host view as one JSON line whenever it changes, for status
/// bars and other line-oriented consumers.
pub struct StdoutHost<W: Write> {
    out: W,
    view: HostView,
    last_emitted: Option<HostView>,
}

impl<W: Write> StdoutHost<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            view: HostView::default(),
            last_emitted: None,
        }
    }

    pub fn view(&self) -> &HostView {
        &self.view
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self) -> anyhow::Result<()> {
        serde_json::to_writer(&mut self.out, &self.view)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> PlayerHost for StdoutHost<W> {
    fn add_action(&mut self, group: &str, scope: &str, name: &str, label: &str, enabled: bool) {
        log::debug!("Registering action {} ({}/{})", name, group, scope);
        let action = self.view.action(name);
        action.label = label.to_string();
        action.enabled = enabled;
    }

    fn add_extra_actions(&mut self, names: &[&str]) {
        for name in names {
            self.view.action(name).extra = true;
        }
    }

    fn set_playback_state(&mut self, state: PlaybackState) {
        if self.view.state != state {
            log::debug!("Playback state: {:?} -> {:?}", self.view.state, state);
        }
        self.view.state = state;
    }

    fn set_track(&mut self, track: Track) {
        if self.view.track != track {
            log::info!(
                "Now playing: {} - {}",
                track.title.as_deref().unwrap_or("?"),
                track.artist.as_deref().unwrap_or("?")
            );
        }
        self.view.track = track;
    }

    fn set_can_go_prev(&mut self, can: bool) {
        self.view.capabilities.can_go_prev = can;
    }

    fn set_can_go_next(&mut self, can: bool) {
        self.view.capabilities.can_go_next = can;
    }

    fn set_can_play(&mut self, can: bool) {
        self.view.capabilities.can_play = can;
    }

    fn set_can_pause(&mut self, can: bool) {
        self.view.capabilities.can_pause = can;
    }

    fn update_enabled_flag(&mut self, action: &str, enabled: bool) {
        self.view.action(action).enabled = enabled;
    }

    fn update_state(&mut self, action: &str, checked: bool) {
        self.view.action(action).checked = checked;
    }

    fn tick_complete(&mut self) {
        if self.last_emitted.as_ref() == Some(&self.view) {
            return;
        }
        match self.emit() {
            Ok(()) => self.last_emitted = Some(self.view.clone()),
            Err(e) => log::error!("Failed to write player state: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(host: StdoutHost<Vec<u8>>) -> Vec<serde_json::Value> {
        String::from_utf8(host.into_inner())
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn emits_only_on_change() {
        let mut host = StdoutHost::new(Vec::new());
        host.set_playback_state(PlaybackState::Playing);
        host.tick_complete();
        host.set_playback_state(PlaybackState::Playing);
        host.tick_complete();
        host.set_playback_state(PlaybackState::Paused);
        host.tick_complete();

        let lines = lines(host);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["state"], "playing");
        assert_eq!(lines[1]["state"], "paused");
    }

    #[test]
    fn view_layout() {
        let mut host = StdoutHost::new(Vec::new());
        host.add_action("playback", "win", "toggle-like", "Love", false);
        host.add_extra_actions(&["toggle-like"]);
        host.update_state("toggle-like", true);
        host.set_can_pause(true);
        host.set_track(Track {
            title: Some("Cellophane".into()),
            ..Track::default()
        });
        host.tick_complete();

        let lines = lines(host);
        let line = &lines[0];
        assert_eq!(line["can_pause"], true);
        assert_eq!(line["can_play"], false);
        assert_eq!(line["track"]["title"], "Cellophane");
        assert_eq!(line["track"]["album"], serde_json::Value::Null);
        assert_eq!(line["actions"]["toggle-like"]["label"], "Love");
        assert_eq!(line["actions"]["toggle-like"]["checked"], true);
        assert_eq!(line["actions"]["toggle-like"]["extra"], true);
    }
}
