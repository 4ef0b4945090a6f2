//! Weekly-timesheet transcription through rendered web grids
//!
//! This crate automates moving time-tracking data between two web timesheet
//! applications that expose no public API, inspired by Playwright's web
//! automation model: a resilient locator engine resolves logical targets
//! against unstable framework-rendered markup, an interaction sequencer
//! replays multi-step stateful input through framework-compatible events, a
//! grid extractor reconstructs normalized records from semi-structured table
//! markup, and an aggregation layer reconciles day-of-week conventions
//! between the two systems.
//!
//! The browser/DOM runtime itself is an external collaborator behind the
//! [`DomBackend`] seam; the crate ships an in-memory synthetic document so
//! the same logic runs against fixtures in tests.

use std::sync::Arc;

use tracing::instrument;

pub mod aggregate;
pub mod backends;
pub mod element;
pub mod errors;
pub mod extract;
pub mod locator;
pub mod selector;
pub mod sequencer;
pub mod week;

#[cfg(test)]
mod tests;

pub use aggregate::{AggregatedEntry, ReadReport, TimeEntryRecord};
pub use backends::{DomBackend, SyntheticDom};
pub use element::{Element, ElementImpl, Notification};
pub use errors::TranscribeError;
pub use locator::{Locator, MatchKind, Resolution};
pub use selector::{LocatorSpec, Strategy, TextFilter};
pub use sequencer::{
    DayFill, EntryInput, EntryOutcome, EntryPhase, RunSummary, Sequencer, SettleConfig,
    WeekRowInput, WeekRowOutcome,
};
pub use week::{DayConvention, WeekRange};

/// The main entry point: one rendered page behind a backend.
pub struct Page {
    backend: Arc<dyn DomBackend>,
}

impl Page {
    pub fn new(backend: Arc<dyn DomBackend>) -> Self {
        Self { backend }
    }

    /// The document's root element, the default search root.
    pub fn root(&self) -> Element {
        self.backend.root()
    }

    /// The page's addressable location, when the backend knows it.
    pub fn location(&self) -> Option<String> {
        self.backend.location()
    }

    /// Bind a locator spec to this page's root.
    #[instrument(skip(self, spec))]
    pub fn locator(&self, spec: impl Into<LocatorSpec>) -> Locator {
        Locator::new(self.root(), spec)
    }

    /// Read the page's week into normalized aggregated entries.
    #[instrument(skip(self))]
    pub fn read_week(&self) -> ReadReport {
        extract::read_week(self)
    }
}

impl Clone for Page {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
        }
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("location", &self.location())
            .finish()
    }
}
