use crate::dom::Document;
use crate::error::{LookupError, Probe};
use crate::types::PlaybackState;

/// Container of the playing row on the playlist page
const PLAYLIST_HOLDER: &str = ".blackHole.playing, .blackHole.paused, .blackHole.spin";
/// Element id of the jam container on a profile page
const PROFILE_HOLDER_ID: &str = "jamHolder";
const ACTIVE_MARKERS: &str = ".playing, .paused, .spin";
/// Per-row play button; on a profile page it is the only one
const PLAY_ANY: &str = ".itemPlayButton";

/// Controls the site exposes with stable element ids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Prev,
    Next,
    Title,
    Artist,
    Play,
    Like,
    PlayAll,
}

impl Control {
    pub fn element_id(self) -> &'static str {
        match self {
            Control::Prev => "backwards",
            Control::Next => "forwards",
            Control::Title => "track-title",
            Control::Artist => "artist-name",
            Control::Play => "playPause",
            Control::Like => "controlLike",
            Control::PlayAll => "playAllJams",
        }
    }
}

/// Either a named control or an element already looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<N> {
    Named(Control),
    Handle(N),
}

impl<N> From<Control> for Target<N> {
    fn from(control: Control) -> Self {
        Target::Named(control)
    }
}

/// Turns the site's markup into player semantics.
///
/// The only state kept across calls is the last art URL that could be
/// resolved: the site does not expose artwork globally, so away from the
/// playlist or the current jam's profile page the cached value is all we
/// have.
pub struct SiteAdapter<D: Document> {
    page: D,
    art_location: Option<String>,
}

impl<D: Document> SiteAdapter<D> {
    pub fn new(page: D) -> Self {
        Self {
            page,
            art_location: None,
        }
    }

    pub fn page(&self) -> &D {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut D {
        &mut self.page
    }

    pub fn get_element(&self, control: Control) -> Option<D::Node> {
        self.page.element_by_id(control.element_id())
    }

    fn resolve(&self, target: Target<D::Node>) -> Option<D::Node> {
        match target {
            Target::Named(control) => self.get_element(control),
            Target::Handle(node) => Some(node),
        }
    }

    /// Present, enabled and laid out
    pub fn can_click(&self, target: impl Into<Target<D::Node>>) -> Result<bool, LookupError> {
        match self.resolve(target.into()) {
            Some(node) => {
                Ok(!self.page.has_attribute(node, "disabled")? && !self.page.is_hidden(node)?)
            }
            None => Ok(false),
        }
    }

    pub fn click(&mut self, target: impl Into<Target<D::Node>>) {
        let target = target.into();
        let node = match self.resolve(target) {
            Some(node) => node,
            None => {
                if let Target::Named(control) = target {
                    log::debug!("Nothing to click for {:?}", control);
                }
                return;
            }
        };
        self.page.click(node).degrade_or("click", ());
    }

    pub fn playback_state(&self) -> PlaybackState {
        let play = match self.get_element(Control::Play) {
            Some(node) => node,
            None => return PlaybackState::Unknown,
        };

        let classify = || -> Result<PlaybackState, LookupError> {
            if self.page.has_class(play, "playing")? {
                Ok(PlaybackState::Playing)
            } else if self.page.has_class(play, "paused")? {
                Ok(PlaybackState::Paused)
            } else {
                Ok(PlaybackState::Unknown)
            }
        };
        classify().degrade("playback state")
    }

    pub fn like_state(&self) -> bool {
        match self.get_element(Control::Like) {
            Some(node) => self.page.has_class(node, "liked").degrade("like state"),
            None => false,
        }
    }

    pub fn title(&self) -> Result<String, LookupError> {
        self.text_of(Control::Title)
    }

    pub fn artist(&self) -> Result<String, LookupError> {
        self.text_of(Control::Artist)
    }

    fn text_of(&self, control: Control) -> Result<String, LookupError> {
        let node = self
            .get_element(control)
            .ok_or_else(|| LookupError::MissingElement(format!("#{}", control.element_id())))?;
        self.page.text_content(node)
    }

    /// Art of the playing track, or the last one seen if the current page
    /// cannot tell. Never goes back to `None` once something was found.
    pub fn art_location(&mut self) -> Option<String> {
        match self.resolve_art() {
            Ok(Some(location)) => {
                self.art_location = Some(location);
            }
            Ok(None) => {}
            Err(e) => log::trace!("art location unavailable: {}", e),
        }
        self.art_location.clone()
    }

    fn resolve_art(&self) -> Result<Option<String>, LookupError> {
        // Playlist page
        if let Some(holder) = self.page.query_selector(PLAYLIST_HOLDER)? {
            let img = self.image_in(holder)?;
            return self
                .page
                .attribute(img, "data-thumb")?
                .filter(|thumb| !thumb.is_empty())
                .map(Some)
                .ok_or_else(|| LookupError::MissingAttribute("data-thumb".to_string()));
        }

        // Profile page, only when it belongs to the active jam
        if let Some(holder) = self.page.element_by_id(PROFILE_HOLDER_ID) {
            if self.page.query_selector_in(holder, ACTIVE_MARKERS)?.is_some() {
                let img = self.image_in(holder)?;
                return self
                    .page
                    .image_source(img)?
                    .map(Some)
                    .ok_or_else(|| LookupError::MissingAttribute("src".to_string()));
            }
        }

        Ok(None)
    }

    fn image_in(&self, holder: D::Node) -> Result<D::Node, LookupError> {
        self.page
            .query_selector_in(holder, "img")?
            .ok_or_else(|| LookupError::MissingElement("img".to_string()))
    }

    fn play_any(&self) -> Option<D::Node> {
        self.page.query_selector(PLAY_ANY).degrade("play button")
    }

    pub fn can_play_any(&self) -> Result<bool, LookupError> {
        match self.play_any() {
            Some(node) => self.can_click(Target::Handle(node)),
            None => Ok(false),
        }
    }

    /// Start playback. With no known state the main control does nothing
    /// useful, so fall back to the first row's play button.
    pub fn play(&mut self, state: PlaybackState) -> bool {
        if state != PlaybackState::Unknown {
            self.click(Control::Play);
            return true;
        }

        match self.play_any() {
            Some(node) => {
                self.click(Target::Handle(node));
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory page for exercising the adapter without HTML.

    use std::collections::{HashMap, HashSet};

    use crate::dom::Document;
    use crate::error::LookupError;
    use crate::types::ReadyState;

    #[derive(Debug, Clone, Default)]
    pub struct FakeNode {
        pub id: Option<String>,
        pub classes: HashSet<String>,
        pub attributes: HashMap<String, String>,
        pub text: String,
        pub src: Option<String>,
        pub hidden: bool,
        pub parent: Option<usize>,
    }

    #[derive(Debug, Default)]
    pub struct FakePage {
        pub ready_state: ReadyState,
        pub nodes: Vec<FakeNode>,
        /// selector -> node, first match
        pub selectors: HashMap<String, usize>,
        pub broken: HashSet<usize>,
        pub clicks: Vec<usize>,
    }

    impl FakePage {
        pub fn add(&mut self, node: FakeNode) -> usize {
            self.nodes.push(node);
            self.nodes.len() - 1
        }

        pub fn with_id(&mut self, id: &str, classes: &[&str]) -> usize {
            self.add(FakeNode {
                id: Some(id.to_string()),
                classes: classes.iter().map(|c| c.to_string()).collect(),
                ..FakeNode::default()
            })
        }

        pub fn matching(&mut self, selector: &str, node: FakeNode) -> usize {
            let index = self.add(node);
            self.selectors.insert(selector.to_string(), index);
            index
        }

        fn node(&self, index: usize) -> Result<&FakeNode, LookupError> {
            if self.broken.contains(&index) {
                return Err(LookupError::Detached);
            }
            self.nodes.get(index).ok_or(LookupError::Detached)
        }
    }

    impl Document for FakePage {
        type Node = usize;

        fn ready_state(&self) -> ReadyState {
            self.ready_state
        }

        fn element_by_id(&self, id: &str) -> Option<usize> {
            self.nodes
                .iter()
                .position(|n| n.id.as_deref() == Some(id))
        }

        fn query_selector(&self, selector: &str) -> Result<Option<usize>, LookupError> {
            Ok(self.selectors.get(selector).copied())
        }

        fn query_selector_in(
            &self,
            scope: usize,
            selector: &str,
        ) -> Result<Option<usize>, LookupError> {
            self.node(scope)?;
            Ok(self
                .selectors
                .get(selector)
                .copied()
                .filter(|index| self.nodes[*index].parent == Some(scope)))
        }

        fn attribute(&self, node: usize, name: &str) -> Result<Option<String>, LookupError> {
            Ok(self.node(node)?.attributes.get(name).cloned())
        }

        fn has_class(&self, node: usize, class: &str) -> Result<bool, LookupError> {
            Ok(self.node(node)?.classes.contains(class))
        }

        fn text_content(&self, node: usize) -> Result<String, LookupError> {
            Ok(self.node(node)?.text.clone())
        }

        fn image_source(&self, node: usize) -> Result<Option<String>, LookupError> {
            Ok(self.node(node)?.src.clone())
        }

        fn is_hidden(&self, node: usize) -> Result<bool, LookupError> {
            Ok(self.node(node)?.hidden)
        }

        fn click(&mut self, node: usize) -> Result<(), LookupError> {
            self.node(node)?;
            self.clicks.push(node);
            Ok(())
        }
    }
}
