//! Bridge between the This Is My Jam web player and a desktop media-player
//! host.
//!
//! The page lives in a browser sidecar that streams DOM snapshots; the
//! [`adapter`] reads player semantics off them, the [`controller`] pushes
//! those to a [`host::PlayerHost`] every tick and turns host actions into
//! clicks, and the [`bridge`] runs both on one timeline.

pub mod adapter;
pub mod bridge;
pub mod config;
pub mod controller;
pub mod dom;
pub mod error;
pub mod host;
pub mod sidecar;
pub mod snapshot;
pub mod types;

pub use adapter::{Control, SiteAdapter, Target};
pub use bridge::{Bridge, BridgeEvent};
pub use config::Config;
pub use controller::{Controller, ACTION_LIKE};
pub use dom::Document;
pub use error::{LookupError, Probe};
pub use host::{PlayerHost, StdoutHost};
pub use snapshot::SnapshotPage;
pub use types::{Capabilities, PlaybackState, PlayerAction, ReadyState, Track};
