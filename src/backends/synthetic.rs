//! In-memory synthetic document.
//!
//! A mutable node tree that records every click, focus, value write, and
//! dispatched notification in arrival order, so tests assert on what the
//! sequencer actually did to the document instead of on intermediate state.
//! Click hooks let a fixture re-render itself the way a reactive front end
//! would (an add-row button that appends a row, for instance).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::backends::DomBackend;
use crate::element::{Element, ElementImpl, Notification};
use crate::errors::TranscribeError;

/// Everything observable the core did to the document, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedEvent {
    Click { node: usize },
    Focus { node: usize },
    ValueSet { node: usize, value: String },
    Notified { node: usize, notification: Notification },
}

type ClickHook = Arc<dyn Fn(&SyntheticDom) + Send + Sync>;

#[derive(Debug, Default)]
struct NodeData {
    tag: String,
    attrs: BTreeMap<String, String>,
    text: String,
    value: Option<String>,
    read_only: bool,
    parent: Option<usize>,
    children: Vec<usize>,
}

#[derive(Default)]
struct DomState {
    nodes: Vec<NodeData>,
    events: Vec<RecordedEvent>,
    location: Option<String>,
}

/// Handle on one synthetic document. Clones share the same tree.
#[derive(Clone)]
pub struct SyntheticDom {
    state: Arc<Mutex<DomState>>,
    hooks: Arc<Mutex<BTreeMap<usize, Vec<ClickHook>>>>,
}

impl fmt::Debug for SyntheticDom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock().unwrap();
        f.debug_struct("SyntheticDom")
            .field("nodes", &state.nodes.len())
            .field("events", &state.events.len())
            .finish()
    }
}

impl Default for SyntheticDom {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticDom {
    /// A fresh document holding only a `body` root (node 0).
    pub fn new() -> Self {
        let mut state = DomState::default();
        state.nodes.push(NodeData {
            tag: "body".to_string(),
            ..NodeData::default()
        });
        Self {
            state: Arc::new(Mutex::new(state)),
            hooks: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    pub fn set_location(&self, url: &str) {
        self.state.lock().unwrap().location = Some(url.to_string());
    }

    /// Append a child node and get a fluent builder for its attributes.
    pub fn node(&self, parent: usize, tag: &str) -> NodeBuilder<'_> {
        let id = {
            let mut state = self.state.lock().unwrap();
            let id = state.nodes.len();
            state.nodes.push(NodeData {
                tag: tag.to_string(),
                parent: Some(parent),
                ..NodeData::default()
            });
            state.nodes[parent].children.push(id);
            id
        };
        NodeBuilder { dom: self, id }
    }

    pub fn set_attr(&self, id: usize, name: &str, value: &str) {
        self.state.lock().unwrap().nodes[id]
            .attrs
            .insert(name.to_string(), value.to_string());
    }

    pub fn set_text(&self, id: usize, text: &str) {
        self.state.lock().unwrap().nodes[id].text = text.to_string();
    }

    pub fn remove_attr(&self, id: usize, name: &str) {
        self.state.lock().unwrap().nodes[id].attrs.remove(name);
    }

    /// Write a value directly, without recording an injection event.
    pub fn set_value_raw(&self, id: usize, value: &str) {
        self.state.lock().unwrap().nodes[id].value = Some(value.to_string());
    }

    /// Make a node reject the framework setter pathway, to exercise
    /// `ValueInjectionFailure`.
    pub fn set_read_only(&self, id: usize) {
        self.state.lock().unwrap().nodes[id].read_only = true;
    }

    /// Run `hook` whenever the node is clicked, after the click is recorded.
    pub fn on_click(&self, id: usize, hook: impl Fn(&SyntheticDom) + Send + Sync + 'static) {
        self.hooks
            .lock()
            .unwrap()
            .entry(id)
            .or_default()
            .push(Arc::new(hook));
    }

    pub fn element(&self, id: usize) -> Element {
        Element::new(Box::new(SyntheticElement {
            dom: self.clone(),
            id,
        }))
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn clicks_on(&self, id: usize) -> usize {
        self.state
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|event| matches!(event, RecordedEvent::Click { node } if *node == id))
            .count()
    }

    /// Notifications dispatched to one node, in arrival order.
    pub fn notifications_for(&self, id: usize) -> Vec<Notification> {
        self.state
            .lock()
            .unwrap()
            .events
            .iter()
            .filter_map(|event| match event {
                RecordedEvent::Notified { node, notification } if *node == id => {
                    Some(*notification)
                }
                _ => None,
            })
            .collect()
    }

    pub fn value_of(&self, id: usize) -> Option<String> {
        self.state.lock().unwrap().nodes[id].value.clone()
    }

    fn record(&self, event: RecordedEvent) {
        self.state.lock().unwrap().events.push(event);
    }

    fn run_click_hooks(&self, id: usize) {
        let hooks: Vec<ClickHook> = self
            .hooks
            .lock()
            .unwrap()
            .get(&id)
            .map(|list| list.to_vec())
            .unwrap_or_default();
        for hook in hooks {
            hook(self);
        }
    }
}

/// Fluent helper for building fixture markup.
pub struct NodeBuilder<'a> {
    dom: &'a SyntheticDom,
    id: usize,
}

impl NodeBuilder<'_> {
    pub fn class(self, class: &str) -> Self {
        self.dom.set_attr(self.id, "class", class);
        self
    }

    pub fn attr(self, name: &str, value: &str) -> Self {
        self.dom.set_attr(self.id, name, value);
        self
    }

    pub fn text(self, text: &str) -> Self {
        self.dom.set_text(self.id, text);
        self
    }

    pub fn value(self, value: &str) -> Self {
        self.dom.set_value_raw(self.id, value);
        self
    }

    pub fn id(&self) -> usize {
        self.id
    }
}

#[derive(Clone)]
struct SyntheticElement {
    dom: SyntheticDom,
    id: usize,
}

impl fmt::Debug for SyntheticElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SyntheticElement({}, {})", self.tag(), self.id)
    }
}

impl ElementImpl for SyntheticElement {
    fn object_id(&self) -> usize {
        self.id
    }

    fn tag(&self) -> String {
        self.dom.state.lock().unwrap().nodes[self.id].tag.clone()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.dom.state.lock().unwrap().nodes[self.id]
            .attrs
            .get(name)
            .cloned()
    }

    fn text(&self) -> String {
        let state = self.dom.state.lock().unwrap();
        let mut parts = Vec::new();
        let mut stack = vec![self.id];
        while let Some(id) = stack.pop() {
            let node = &state.nodes[id];
            if !node.text.is_empty() {
                parts.push(node.text.clone());
            }
            for &child in node.children.iter().rev() {
                stack.push(child);
            }
        }
        parts.join(" ").trim().to_string()
    }

    fn value(&self) -> Option<String> {
        self.dom.state.lock().unwrap().nodes[self.id].value.clone()
    }

    fn children(&self) -> Vec<Element> {
        let ids: Vec<usize> = self.dom.state.lock().unwrap().nodes[self.id]
            .children
            .clone();
        ids.into_iter().map(|id| self.dom.element(id)).collect()
    }

    fn parent(&self) -> Option<Element> {
        let parent = self.dom.state.lock().unwrap().nodes[self.id].parent;
        parent.map(|id| self.dom.element(id))
    }

    fn click(&self) -> Result<(), TranscribeError> {
        self.dom.record(RecordedEvent::Click { node: self.id });
        self.dom.run_click_hooks(self.id);
        Ok(())
    }

    fn focus(&self) -> Result<(), TranscribeError> {
        self.dom.record(RecordedEvent::Focus { node: self.id });
        Ok(())
    }

    fn set_value(&self, value: &str) -> Result<(), TranscribeError> {
        {
            let mut state = self.dom.state.lock().unwrap();
            let node = &mut state.nodes[self.id];
            if node.read_only {
                return Err(TranscribeError::ValueInjectionFailure(format!(
                    "value setter unavailable on node {}",
                    self.id
                )));
            }
            node.value = Some(value.to_string());
        }
        self.dom.record(RecordedEvent::ValueSet {
            node: self.id,
            value: value.to_string(),
        });
        Ok(())
    }

    fn dispatch(&self, notification: Notification) -> Result<(), TranscribeError> {
        self.dom.record(RecordedEvent::Notified {
            node: self.id,
            notification,
        });
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn ElementImpl> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl DomBackend for SyntheticDom {
    fn root(&self) -> Element {
        self.element(0)
    }

    fn location(&self) -> Option<String> {
        self.state.lock().unwrap().location.clone()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
