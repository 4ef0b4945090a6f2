use crate::errors::TranscribeError;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::debug;

/// Synthetic notifications a reactive front end listens for.
///
/// Frameworks that proxy the plain `value` property only update their internal
/// state when these fire after a value write; `commit_value` dispatches them in
/// the declared order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Notification {
    Input,
    Change,
    Blur,
}

/// Interface for backend-specific element implementations
pub trait ElementImpl: Send + Sync + Debug {
    /// Identity of the underlying node, stable for the document's lifetime.
    fn object_id(&self) -> usize;
    fn tag(&self) -> String;
    fn attribute(&self, name: &str) -> Option<String>;
    /// The raw `class` attribute, empty if absent.
    fn class_name(&self) -> String {
        self.attribute("class").unwrap_or_default()
    }
    /// Visible text content of the element and its subtree, trimmed.
    fn text(&self) -> String;
    /// Current value of an input-like element.
    fn value(&self) -> Option<String>;
    fn children(&self) -> Vec<Element>;
    fn parent(&self) -> Option<Element>;
    fn click(&self) -> Result<(), TranscribeError>;
    fn focus(&self) -> Result<(), TranscribeError>;
    /// Write through the framework-recognized setter pathway, bypassing any
    /// proxy installed on the plain `value` property.
    fn set_value(&self, value: &str) -> Result<(), TranscribeError>;
    fn dispatch(&self, notification: Notification) -> Result<(), TranscribeError>;

    fn clone_box(&self) -> Box<dyn ElementImpl>;
    fn as_any(&self) -> &dyn std::any::Any;
}

/// A handle on one element of the rendered document.
///
/// Value object: cloning clones the handle, never the node. All searches take
/// an `Element` as their explicit root; nothing in the crate reads ambient
/// document state.
#[derive(Debug)]
pub struct Element {
    inner: Box<dyn ElementImpl>,
}

impl Clone for Element {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_box(),
        }
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.inner.object_id() == other.inner.object_id()
    }
}

impl Element {
    pub fn new(inner: Box<dyn ElementImpl>) -> Self {
        Self { inner }
    }

    pub fn object_id(&self) -> usize {
        self.inner.object_id()
    }

    pub fn tag(&self) -> String {
        self.inner.tag()
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.inner.attribute(name)
    }

    pub fn class_name(&self) -> String {
        self.inner.class_name()
    }

    /// Case-insensitive test for a fragment of the `class` attribute.
    pub fn has_class_fragment(&self, fragment: &str) -> bool {
        self.class_name()
            .to_lowercase()
            .contains(&fragment.to_lowercase())
    }

    pub fn text(&self) -> String {
        self.inner.text()
    }

    pub fn value(&self) -> Option<String> {
        self.inner.value()
    }

    pub fn children(&self) -> Vec<Element> {
        self.inner.children()
    }

    pub fn parent(&self) -> Option<Element> {
        self.inner.parent()
    }

    /// The element's subtree in document order, excluding the element itself.
    pub fn descendants(&self) -> Vec<Element> {
        let mut out = Vec::new();
        let mut stack = self.children();
        stack.reverse();
        while let Some(el) = stack.pop() {
            out.push(el.clone());
            let mut kids = el.children();
            kids.reverse();
            stack.append(&mut kids);
        }
        out
    }

    /// First descendant with the given tag name (case-insensitive).
    pub fn first_descendant_tag(&self, tag: &str) -> Option<Element> {
        self.descendants()
            .into_iter()
            .find(|el| el.tag().eq_ignore_ascii_case(tag))
    }

    pub fn click(&self) -> Result<(), TranscribeError> {
        self.inner.click()
    }

    pub fn focus(&self) -> Result<(), TranscribeError> {
        self.inner.focus()
    }

    pub fn set_value(&self, value: &str) -> Result<(), TranscribeError> {
        self.inner.set_value(value)
    }

    pub fn dispatch(&self, notification: Notification) -> Result<(), TranscribeError> {
        self.inner.dispatch(notification)
    }

    /// Commit a value the way a reactive front end expects it: write through
    /// the framework setter, then dispatch the given notifications in order.
    ///
    /// Omitting a notification the destination listens for silently desyncs
    /// framework state from the displayed value, so callers always pass the
    /// full ordered list for the control they are driving.
    pub fn commit_value(
        &self,
        value: &str,
        notifications: &[Notification],
    ) -> Result<(), TranscribeError> {
        debug!(target_id = self.object_id(), value, "committing value");
        self.inner.set_value(value)?;
        for notification in notifications {
            self.inner.dispatch(*notification)?;
        }
        Ok(())
    }

    pub fn as_any(&self) -> &dyn std::any::Any {
        self.inner.as_any()
    }
}
