use crate::error::LookupError;
use crate::types::ReadyState;

/// Read access to a page plus the one mutation we ever perform: a click.
///
/// Nodes are opaque handles owned by the page. A handle obtained during one
/// tick may be meaningless in the next, accessors report that as
/// [`LookupError::Detached`].
pub trait Document {
    type Node: Copy;

    fn ready_state(&self) -> ReadyState;

    /// `document.getElementById`
    fn element_by_id(&self, id: &str) -> Option<Self::Node>;

    /// `document.querySelector`, first match in document order
    fn query_selector(&self, selector: &str) -> Result<Option<Self::Node>, LookupError>;

    /// `scope.querySelector`, only descendants of `scope` are considered
    fn query_selector_in(
        &self,
        scope: Self::Node,
        selector: &str,
    ) -> Result<Option<Self::Node>, LookupError>;

    fn attribute(&self, node: Self::Node, name: &str) -> Result<Option<String>, LookupError>;

    fn has_attribute(&self, node: Self::Node, name: &str) -> Result<bool, LookupError> {
        Ok(self.attribute(node, name)?.is_some())
    }

    fn has_class(&self, node: Self::Node, class: &str) -> Result<bool, LookupError>;

    fn text_content(&self, node: Self::Node) -> Result<String, LookupError>;

    /// Absolute image URL, the way `img.src` reports it
    fn image_source(&self, node: Self::Node) -> Result<Option<String>, LookupError>;

    /// True when the node has no layout parent (`offsetParent === null`)
    fn is_hidden(&self, node: Self::Node) -> Result<bool, LookupError>;

    /// Dispatch a synthetic click on the node
    fn click(&mut self, node: Self::Node) -> Result<(), LookupError>;
}
