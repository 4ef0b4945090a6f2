//! Document backends.
//!
//! The core never reads ambient global state: every component takes a search
//! root obtained from a backend, so the same logic runs unchanged against a
//! live document adapter or the in-memory synthetic document used in tests.

pub mod synthetic;

pub use synthetic::{RecordedEvent, SyntheticDom};

use crate::element::Element;

/// A rendered document the core can search and drive.
pub trait DomBackend: Send + Sync {
    /// The document's root element.
    fn root(&self) -> Element;

    /// The page's addressable location (URL), when the backend knows it.
    /// Week-range derivation prefers an explicit date parameter found here.
    fn location(&self) -> Option<String>;

    /// Enable downcasting to concrete backend types.
    fn as_any(&self) -> &dyn std::any::Any;
}
