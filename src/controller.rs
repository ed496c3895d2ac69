use crate::adapter::{Control, SiteAdapter};
use crate::dom::Document;
use crate::error::{LookupError, Probe};
use crate::host::PlayerHost;
use crate::types::{Capabilities, PlaybackState, PlayerAction, Track};

/// Host action toggling the "liked" mark of the current jam
pub const ACTION_LIKE: &str = "toggle-like";

/// Keeps the host in sync with the page and routes host actions to clicks.
///
/// `state` is `None` until the page is ready; only then does polling start.
pub struct Controller<D: Document, H: PlayerHost> {
    adapter: SiteAdapter<D>,
    host: H,
    state: Option<PlaybackState>,
}

impl<D: Document, H: PlayerHost> Controller<D, H> {
    pub fn new(adapter: SiteAdapter<D>, host: H) -> Self {
        Self {
            adapter,
            host,
            state: None,
        }
    }

    pub fn adapter(&self) -> &SiteAdapter<D> {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut SiteAdapter<D> {
        &mut self.adapter
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn state(&self) -> Option<PlaybackState> {
        self.state
    }

    /// Poll ticks run once the page is ready
    pub fn is_polling(&self) -> bool {
        self.state.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.state == Some(PlaybackState::Playing)
    }

    /// Host side setup, before any page exists
    pub fn init_host(&mut self) {
        self.host
            .add_action("playback", "win", ACTION_LIKE, "Love", false);
        self.host.update_enabled_flag(ACTION_LIKE, false);
    }

    /// Page side setup. Returns whether the page was ready right away;
    /// otherwise [`Controller::on_load_complete`] finishes the job.
    pub fn init_worker(&mut self) -> bool {
        let ready_state = self.adapter.page().ready_state();
        if ready_state.is_ready() {
            self.page_ready();
            true
        } else {
            log::info!("Page still {:?}, waiting for it to load", ready_state);
            false
        }
    }

    /// The page finished loading
    pub fn on_load_complete(&mut self) {
        if self.is_polling() {
            log::debug!("Ignoring repeated load signal");
            return;
        }
        self.page_ready();
    }

    fn page_ready(&mut self) {
        log::info!("Page ready, starting updates");
        self.host.add_extra_actions(&[ACTION_LIKE]);
        self.state = Some(PlaybackState::Unknown);
    }

    /// One synchronisation pass from the page to the host
    pub fn tick(&mut self) {
        let state = self.adapter.playback_state();
        self.state = Some(state);
        self.host.set_playback_state(state);

        let mut track = Track::default();
        self.fill_track(&mut track).degrade("track");
        self.host.set_track(track);

        let caps = self.capabilities().degrade("capabilities");
        self.host.set_can_go_prev(caps.can_go_prev);
        self.host.set_can_go_next(caps.can_go_next);
        self.host.set_can_play(caps.can_play);
        self.host.set_can_pause(caps.can_pause);

        let like_enabled = self.adapter.can_click(Control::Like).degrade("like control");
        self.host.update_enabled_flag(ACTION_LIKE, like_enabled);
        self.host.update_state(ACTION_LIKE, self.adapter.like_state());

        self.host.tick_complete();
    }

    /// Fields are filled in order and the first failure stops the rest
    fn fill_track(&mut self, track: &mut Track) -> Result<(), LookupError> {
        track.title = Some(self.adapter.title()?);
        track.artist = Some(self.adapter.artist()?);
        track.art_location = self.adapter.art_location();
        Ok(())
    }

    fn capabilities(&self) -> Result<Capabilities, LookupError> {
        let mut caps = Capabilities {
            can_go_prev: self.adapter.can_click(Control::Prev)?,
            can_go_next: self.adapter.can_click(Control::Next)?,
            ..Capabilities::default()
        };
        // One control toggles both ways
        if self.is_playing() {
            caps.can_pause = self.adapter.can_click(Control::Play)?;
        } else {
            caps.can_play =
                self.adapter.can_click(Control::Play)? || self.adapter.can_play_any()?;
        }
        Ok(caps)
    }

    /// Handle an action activated by the host
    pub fn handle_action(&mut self, name: &str) {
        let state = match self.state {
            Some(state) => state,
            None => {
                log::debug!("Page not ready, dropping action {}", name);
                return;
            }
        };

        if name == ACTION_LIKE {
            self.adapter.click(Control::Like);
            return;
        }

        let action = match name.parse::<PlayerAction>() {
            Ok(action) => action,
            Err(e) => {
                log::debug!("{}", e);
                return;
            }
        };
        log::debug!("Action {} in state {:?}", action, state);

        match action {
            PlayerAction::Play => {
                if state != PlaybackState::Playing {
                    self.adapter.play(state);
                }
            }
            PlayerAction::TogglePlay => {
                self.adapter.play(state);
            }
            PlayerAction::Pause | PlayerAction::Stop => {
                if state == PlaybackState::Playing {
                    self.adapter.click(Control::Play);
                }
            }
            PlayerAction::PrevSong => self.adapter.click(Control::Prev),
            PlayerAction::NextSong => self.adapter.click(Control::Next),
        }
    }
}
