use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Playback state as exposed by the page's play control
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Unknown,
    Playing,
    Paused,
}

/// Track metadata pushed to the host on every tick
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Track {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub art_location: Option<String>,
    pub album: Option<String>, // never exposed by the site
}

/// Transport capabilities, all disabled unless the page says otherwise
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub can_go_prev: bool,
    pub can_go_next: bool,
    pub can_play: bool,
    pub can_pause: bool,
}

/// Mirrors `document.readyState`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReadyState {
    #[default]
    Loading,
    Interactive,
    Complete,
}

impl ReadyState {
    /// The DOM can be queried once parsing finished
    pub fn is_ready(self) -> bool {
        matches!(self, ReadyState::Interactive | ReadyState::Complete)
    }
}

/// Standard transport actions a host can activate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    Play,
    TogglePlay,
    Pause,
    Stop,
    PrevSong,
    NextSong,
}

impl PlayerAction {
    pub fn name(self) -> &'static str {
        match self {
            PlayerAction::Play => "play",
            PlayerAction::TogglePlay => "toggle-play",
            PlayerAction::Pause => "pause",
            PlayerAction::Stop => "stop",
            PlayerAction::PrevSong => "prev-song",
            PlayerAction::NextSong => "next-song",
        }
    }
}

impl fmt::Display for PlayerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown player action: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for PlayerAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "play" => Ok(PlayerAction::Play),
            "toggle-play" => Ok(PlayerAction::TogglePlay),
            "pause" => Ok(PlayerAction::Pause),
            "stop" => Ok(PlayerAction::Stop),
            "prev-song" => Ok(PlayerAction::PrevSong),
            "next-song" => Ok(PlayerAction::NextSong),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}

/// Messages emitted by the page sidecar on stdout, one JSON object per line
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SidecarMessage {
    Snapshot {
        url: String,
        ready_state: ReadyState,
        html: String,
    },
    /// DOMContentLoaded fired in the hosted page
    Loaded,
    Status {
        state: String,
        message: Option<String>,
    },
    Error {
        message: String,
    },
}

/// Commands written to the sidecar's stdin
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SidecarCommand {
    Click { selector: String },
}
