use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::dom::Document;
use crate::error::LookupError;
use crate::types::ReadyState;

/// Attribute the sidecar puts on every element whose `offsetParent` is null
/// at serialization time.
pub const HIDDEN_MARKER: &str = "data-jamdeck-hidden";

/// The most recent DOM snapshot streamed by the sidecar.
///
/// Clicks cannot be applied to a snapshot, so they are queued as CSS
/// locators and handed to the sidecar, which replays them on the live page.
pub struct SnapshotPage {
    html: Html,
    base: Option<Url>,
    ready_state: ReadyState,
    clicks: Vec<String>,
}

impl SnapshotPage {
    /// Empty page, as seen before the sidecar reported anything
    pub fn blank() -> Self {
        Self {
            html: Html::parse_document(""),
            base: None,
            ready_state: ReadyState::Loading,
            clicks: Vec::new(),
        }
    }

    pub fn parse(url: &str, ready_state: ReadyState, html: &str) -> Self {
        let mut page = Self::blank();
        page.load(url, ready_state, html);
        page
    }

    /// Replace the page content. Pending clicks are kept.
    pub fn load(&mut self, url: &str, ready_state: ReadyState, html: &str) {
        self.html = Html::parse_document(html);
        self.ready_state = ready_state;
        self.base = match Url::parse(url) {
            Ok(base) => Some(base),
            Err(e) => {
                log::debug!("Snapshot URL {:?} is not absolute: {}", url, e);
                None
            }
        };
    }

    /// Drain the locators of clicked elements
    pub fn take_clicks(&mut self) -> Vec<String> {
        std::mem::take(&mut self.clicks)
    }

    fn element(&self, node: NodeId) -> Result<ElementRef<'_>, LookupError> {
        self.html
            .tree
            .get(node)
            .and_then(ElementRef::wrap)
            .ok_or(LookupError::Detached)
    }

    fn selector(selector: &str) -> Result<Selector, LookupError> {
        Selector::parse(selector).map_err(|e| LookupError::InvalidSelector {
            selector: selector.to_string(),
            reason: format!("{:?}", e),
        })
    }

    /// CSS path the live page can resolve back to the same element.
    /// Anchored at the nearest ancestor with an id.
    fn locator(element: ElementRef<'_>) -> String {
        let mut steps = Vec::new();
        let mut current = Some(element);

        while let Some(el) = current {
            if let Some(id) = el.value().id() {
                steps.push(format!("#{}", id));
                break;
            }
            let position = el
                .prev_siblings()
                .filter(|sibling| sibling.value().is_element())
                .count()
                + 1;
            steps.push(format!("{}:nth-child({})", el.value().name(), position));
            current = el.parent().and_then(ElementRef::wrap);
        }

        steps.reverse();
        steps.join(" > ")
    }

    fn hides_itself(element: ElementRef<'_>) -> bool {
        let value = element.value();
        if value.attr(HIDDEN_MARKER).is_some() || value.attr("hidden").is_some() {
            return true;
        }
        value
            .attr("style")
            .map(|style| {
                let compact: String = style
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect::<String>()
                    .to_ascii_lowercase();
                compact.contains("display:none")
            })
            .unwrap_or(false)
    }
}

impl Default for SnapshotPage {
    fn default() -> Self {
        Self::blank()
    }
}

impl Document for SnapshotPage {
    type Node = NodeId;

    fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.html
            .tree
            .nodes()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().id() == Some(id))
            .map(|el| el.id())
    }

    fn query_selector(&self, selector: &str) -> Result<Option<NodeId>, LookupError> {
        let selector = Self::selector(selector)?;
        Ok(self.html.select(&selector).next().map(|el| el.id()))
    }

    fn query_selector_in(
        &self,
        scope: NodeId,
        selector: &str,
    ) -> Result<Option<NodeId>, LookupError> {
        let selector = Self::selector(selector)?;
        let scope_el = self.element(scope)?;
        Ok(scope_el
            .select(&selector)
            .map(|el| el.id())
            .find(|id| *id != scope))
    }

    fn attribute(&self, node: NodeId, name: &str) -> Result<Option<String>, LookupError> {
        Ok(self.element(node)?.value().attr(name).map(str::to_string))
    }

    fn has_class(&self, node: NodeId, class: &str) -> Result<bool, LookupError> {
        Ok(self.element(node)?.value().classes().any(|c| c == class))
    }

    fn text_content(&self, node: NodeId) -> Result<String, LookupError> {
        Ok(self.element(node)?.text().collect())
    }

    fn image_source(&self, node: NodeId) -> Result<Option<String>, LookupError> {
        let src = match self.element(node)?.value().attr("src") {
            Some(src) if !src.trim().is_empty() => src.trim(),
            _ => return Ok(None),
        };
        let resolved = match &self.base {
            Some(base) => base
                .join(src)
                .map(|url| url.to_string())
                .unwrap_or_else(|_| src.to_string()),
            None => src.to_string(),
        };
        Ok(Some(resolved))
    }

    fn is_hidden(&self, node: NodeId) -> Result<bool, LookupError> {
        let mut current = Some(self.element(node)?);
        while let Some(el) = current {
            if Self::hides_itself(el) {
                return Ok(true);
            }
            current = el.parent().and_then(ElementRef::wrap);
        }
        Ok(false)
    }

    fn click(&mut self, node: NodeId) -> Result<(), LookupError> {
        let locator = Self::locator(self.element(node)?);
        log::debug!("Queued click on {}", locator);
        self.clicks.push(locator);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html><body>
  <div id="player">
    <a id="playPause" class="control playing"></a>
    <a id="backwards" disabled></a>
    <a id="forwards" style="DISPLAY: None"></a>
    <span id="track-title">Harvest Moon</span>
  </div>
  <ul class="jams">
    <li><span class="item"><a class="itemPlayButton"></a></span></li>
    <li><span class="item"><a class="itemPlayButton"></a></span></li>
  </ul>
  <div id="jamHolder" class="playing"><img src="/img/cover.jpg"></div>
  <div data-jamdeck-hidden><a id="controlLike"></a></div>
</body></html>"#;

    fn page() -> SnapshotPage {
        SnapshotPage::parse("https://www.thisismyjam.com/neil", ReadyState::Complete, PAGE)
    }

    #[test]
    fn finds_elements_by_id() {
        let page = page();
        let play = page.element_by_id("playPause").unwrap();
        assert!(page.has_class(play, "playing").unwrap());
        assert!(!page.has_class(play, "paused").unwrap());
        assert!(page.element_by_id("missing").is_none());

        let title = page.element_by_id("track-title").unwrap();
        assert_eq!(page.text_content(title).unwrap(), "Harvest Moon");
    }

    #[test]
    fn query_selector_returns_first_match() {
        let mut page = page();
        let first = page.query_selector(".itemPlayButton").unwrap().unwrap();
        page.click(first).unwrap();
        assert_eq!(
            page.take_clicks(),
            vec!["html:nth-child(1) > body:nth-child(2) > ul:nth-child(2) > li:nth-child(1) > span:nth-child(1) > a:nth-child(1)"]
        );
        assert!(page.take_clicks().is_empty());
    }

    #[test]
    fn scoped_query_skips_the_scope() {
        let page = page();
        let holder = page.element_by_id("jamHolder").unwrap();
        assert_eq!(page.query_selector_in(holder, ".playing").unwrap(), None);
        assert!(page.query_selector_in(holder, "img").unwrap().is_some());
    }

    #[test]
    fn image_source_is_resolved_against_page_url() {
        let page = page();
        let holder = page.element_by_id("jamHolder").unwrap();
        let img = page.query_selector_in(holder, "img").unwrap().unwrap();
        assert_eq!(
            page.image_source(img).unwrap().as_deref(),
            Some("https://www.thisismyjam.com/img/cover.jpg")
        );
    }

    #[test]
    fn hidden_detection() {
        let page = page();
        let play = page.element_by_id("playPause").unwrap();
        let next = page.element_by_id("forwards").unwrap();
        let like = page.element_by_id("controlLike").unwrap();
        assert!(!page.is_hidden(play).unwrap());
        assert!(page.is_hidden(next).unwrap());
        assert!(page.is_hidden(like).unwrap());
    }

    #[test]
    fn disabled_attribute() {
        let page = page();
        let prev = page.element_by_id("backwards").unwrap();
        assert!(page.has_attribute(prev, "disabled").unwrap());
    }

    #[test]
    fn clicks_anchor_on_ids() {
        let mut page = page();
        let play = page.element_by_id("playPause").unwrap();
        page.click(play).unwrap();
        assert_eq!(page.take_clicks(), vec!["#playPause"]);
    }

    #[test]
    fn invalid_selector_is_reported() {
        let page = page();
        assert!(matches!(
            page.query_selector("a[["),
            Err(LookupError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn handles_from_an_older_snapshot_are_detached() {
        let mut page = page();
        let holder = page.element_by_id("jamHolder").unwrap();
        page.load("https://www.thisismyjam.com/", ReadyState::Complete, "<p></p>");
        assert!(page.text_content(holder).is_err());
    }
}
