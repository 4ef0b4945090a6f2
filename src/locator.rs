//! Locator strategy engine.
//!
//! Resolves a logical target ("the work-type dropdown of row 3") to a concrete
//! element by trying an ordered list of candidate strategies against an
//! explicit search root. The engine never waits and never retries; waiting
//! between actions belongs to the sequencer.

use tracing::debug;

use crate::element::Element;
use crate::errors::TranscribeError;
use crate::selector::{LocatorSpec, Strategy};

/// Probe length for fuzzy text matching. Destination search boxes truncate
/// long labels around this length, so the probe must tolerate it.
pub const FUZZY_PROBE_LEN: usize = 30;

/// Outcome of a locate. "Not found" is ordinary data here, not an error;
/// fallback chains thread this through until a strategy succeeds.
#[derive(Debug, Clone)]
pub enum Resolution {
    Found(Element),
    NotFound,
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }

    pub fn found(self) -> Option<Element> {
        match self {
            Resolution::Found(el) => Some(el),
            Resolution::NotFound => None,
        }
    }

    /// Promote to a result, naming the missing control.
    pub fn require(self, what: &str) -> Result<Element, TranscribeError> {
        match self {
            Resolution::Found(el) => Ok(el),
            Resolution::NotFound => Err(TranscribeError::ElementNotFound(what.to_string())),
        }
    }
}

/// Whether a label matched on the exact pass or the fuzzy fallback pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Fuzzy,
}

/// A `LocatorSpec` bound to a search root.
#[derive(Debug, Clone)]
pub struct Locator {
    root: Element,
    spec: LocatorSpec,
}

impl Locator {
    pub fn new(root: Element, spec: impl Into<LocatorSpec>) -> Self {
        Self {
            root,
            spec: spec.into(),
        }
    }

    /// Rebind the same spec beneath a different root element.
    pub fn within(mut self, root: Element) -> Self {
        self.root = root;
        self
    }

    /// First element matched by the first strategy that yields anything.
    pub fn resolve(&self) -> Resolution {
        match self.all().into_iter().next() {
            Some(el) => Resolution::Found(el),
            None => {
                debug!(spec = ?self.spec, "no strategy yielded a match");
                Resolution::NotFound
            }
        }
    }

    /// All survivors of the first strategy that yields at least one match,
    /// in document order. Later strategies are not attempted.
    pub fn all(&self) -> Vec<Element> {
        for strategy in &self.spec.strategies {
            let mut survivors = survivors(&self.root, strategy);
            if let Some(filter) = &self.spec.filter {
                survivors.retain(|el| filter.accepts(&el.text()));
            }
            if !survivors.is_empty() {
                return survivors;
            }
        }
        Vec::new()
    }
}

/// Candidates a single strategy yields beneath `root`, in document order.
/// Text conditions run their exact pass over the whole candidate set before
/// any fuzzy comparison is attempted on any candidate.
fn survivors(root: &Element, strategy: &Strategy) -> Vec<Element> {
    match strategy {
        Strategy::Attr { .. } | Strategy::Class(_) | Strategy::Tag(_) => root
            .descendants()
            .into_iter()
            .filter(|el| holds(el, strategy))
            .collect(),
        Strategy::Text(target) => text_passes(root.descendants(), target),
        Strategy::Nth { tag, index } => root
            .descendants()
            .into_iter()
            .filter(|el| el.tag().eq_ignore_ascii_case(tag))
            .nth(*index)
            .into_iter()
            .collect(),
        Strategy::All(parts) => {
            let mut base: Vec<Element> = root.descendants();
            let mut text_target: Option<&str> = None;
            for part in parts {
                match part {
                    Strategy::Text(target) => text_target = Some(target.as_str()),
                    _ => base.retain(|el| holds(el, part)),
                }
            }
            match text_target {
                Some(target) => text_passes(base, target),
                None => base,
            }
        }
        Strategy::Invalid(reason) => {
            debug!(%reason, "skipping invalid selector strategy");
            Vec::new()
        }
    }
}

/// Point predicate for the strategies that do not need whole-set passes.
fn holds(el: &Element, strategy: &Strategy) -> bool {
    match strategy {
        Strategy::Attr { name, value } => match (el.attribute(name), value) {
            (Some(actual), Some(want)) => actual == *want,
            (Some(_), None) => true,
            (None, _) => false,
        },
        Strategy::Class(fragment) => el.has_class_fragment(fragment),
        Strategy::Tag(tag) => el.tag().eq_ignore_ascii_case(tag),
        Strategy::All(parts) => parts.iter().all(|p| holds(el, p)),
        // Positional and text conditions only make sense over a whole
        // candidate set; inside a conjunction they match nothing.
        Strategy::Text(_) | Strategy::Nth { .. } | Strategy::Invalid(_) => false,
    }
}

/// Exact pass over every candidate, then the fuzzy pass. Survivors keep
/// document order.
fn text_passes(candidates: Vec<Element>, target: &str) -> Vec<Element> {
    let want = target.trim();
    let exact: Vec<Element> = candidates
        .iter()
        .filter(|el| el.text().trim() == want)
        .cloned()
        .collect();
    if !exact.is_empty() {
        return exact;
    }
    candidates
        .into_iter()
        .filter(|el| fuzzy_matches(&el.text(), target))
        .collect()
}

/// Truncation-tolerant, case-insensitive containment: the first
/// `FUZZY_PROBE_LEN` characters of the target inside the candidate, or the
/// full candidate inside the target. Either direction counts.
pub fn fuzzy_matches(candidate: &str, target: &str) -> bool {
    let candidate = candidate.trim().to_lowercase();
    let target = target.trim().to_lowercase();
    if candidate.is_empty() || target.is_empty() {
        return false;
    }
    let probe: String = target.chars().take(FUZZY_PROBE_LEN).collect();
    candidate.contains(&probe) || target.contains(&candidate)
}

/// Match a target against a list of option labels: the exact pass covers the
/// entire set before any fuzzy comparison runs. Returns the matched index and
/// which pass matched it.
pub fn match_label(labels: &[String], target: &str) -> Option<(usize, MatchKind)> {
    let want = target.trim();
    for (idx, label) in labels.iter().enumerate() {
        if label.trim() == want {
            return Some((idx, MatchKind::Exact));
        }
    }
    for (idx, label) in labels.iter().enumerate() {
        if fuzzy_matches(label, target) {
            debug!(wanted = target, matched = %label, "fuzzy fallback matched option");
            return Some((idx, MatchKind::Fuzzy));
        }
    }
    None
}
