//! Interaction sequencer.
//!
//! Performs the multi-step stateful UI operations reactive front ends demand:
//! open a control, wait for it to mount, filter it, pick an option through the
//! locator engine, commit values through the framework setter pathway. All
//! waiting lives here as fixed settle intervals: the markup offers no
//! readiness signal, so determinism is bought with a bounded wall-clock cost
//! per step rather than adaptive backoff.
//!
//! Entries are processed strictly in the supplied order; concurrent writes
//! into the same reactive grid shift later row indices, so nothing here
//! reorders or parallelizes.

mod entry_grid;
mod week_grid;

pub use entry_grid::{EntryInput, EntryOutcome, EntryPhase, RunSummary};
pub use week_grid::{DayFill, WeekRowInput, WeekRowOutcome};

use std::time::Duration;

use tracing::debug;

use crate::element::{Element, Notification};
use crate::errors::TranscribeError;
use crate::locator::{match_label, Locator, MatchKind, FUZZY_PROBE_LEN};
use crate::selector::Strategy;
use crate::Page;

/// Fixed empirical settle intervals, one per interaction step family. These
/// are constants, not an adaptive policy: if the destination renders slower
/// than the interval, the following locate step fails and is reported.
#[derive(Debug, Clone)]
pub struct SettleConfig {
    /// After triggering a control's open affordance, for the option list or
    /// search box to mount.
    pub open: Duration,
    /// After injecting filter text, for the option list to re-render.
    pub filter: Duration,
    /// After activating an option.
    pub option: Duration,
    /// After a project pick, for the dependent work-type list to reload.
    pub reload: Duration,
    /// After an add-row click, for the new row to mount.
    pub row: Duration,
    /// After committing a raw value.
    pub commit: Duration,
    /// After a dismissal click outside an open control.
    pub dismiss: Duration,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            open: Duration::from_millis(300),
            filter: Duration::from_millis(300),
            option: Duration::from_millis(200),
            reload: Duration::from_millis(400),
            row: Duration::from_millis(500),
            commit: Duration::from_millis(300),
            dismiss: Duration::from_millis(150),
        }
    }
}

impl SettleConfig {
    /// All-zero profile for synthetic documents, which re-render in place.
    pub fn zero() -> Self {
        Self {
            open: Duration::ZERO,
            filter: Duration::ZERO,
            option: Duration::ZERO,
            reload: Duration::ZERO,
            row: Duration::ZERO,
            commit: Duration::ZERO,
            dismiss: Duration::ZERO,
        }
    }
}

/// Drives one page. One logical operation owns the document between its start
/// and its last settle wait; the sequential `async` model enforces that
/// without locking.
#[derive(Debug, Clone)]
pub struct Sequencer {
    page: Page,
    settle: SettleConfig,
}

impl Sequencer {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            settle: SettleConfig::default(),
        }
    }

    pub fn with_settle(page: Page, settle: SettleConfig) -> Self {
        Self { page, settle }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub(crate) async fn pause(&self, interval: Duration) {
        if !interval.is_zero() {
            tokio::time::sleep(interval).await;
        }
    }

    /// Click a neutral spot to close whatever control is open.
    pub(crate) async fn dismiss_open_control(&self) {
        if let Err(err) = self.page.root().click() {
            debug!(%err, "dismissal click failed");
        }
        self.pause(self.settle.dismiss).await;
    }

    /// The canonical four-step select against a filtered-list dropdown
    /// (header click → settle → filter injection → settle → exact-then-fuzzy
    /// option pick, or dismiss and fail).
    pub(crate) async fn select_filtered_option(
        &self,
        cell: &Element,
        target: &str,
        what: &str,
    ) -> Result<MatchKind, TranscribeError> {
        let header = Locator::new(cell.clone(), Strategy::Class("dropt-header".into()))
            .resolve()
            .require(&format!("{what} dropdown header"))?;
        header.click()?;
        self.pause(self.settle.open).await;

        // The search box truncates long labels, so inject a bounded probe.
        if let Some(search) = Locator::new(cell.clone(), Strategy::Class("dropt-search".into()))
            .resolve()
            .found()
        {
            if let Some(input) = search.first_descendant_tag("input") {
                let probe: String = target.chars().take(FUZZY_PROBE_LEN).collect();
                input.commit_value(&probe, &[Notification::Input])?;
                self.pause(self.settle.filter).await;
            }
        }

        let options = Locator::new(
            cell.clone(),
            Strategy::All(vec![
                Strategy::Tag("li".into()),
                Strategy::Attr {
                    name: "title".into(),
                    value: None,
                },
            ]),
        )
        .all();
        let labels: Vec<String> = options
            .iter()
            .map(|opt| opt.attribute("title").unwrap_or_default())
            .collect();

        match match_label(&labels, target) {
            Some((at, kind)) => {
                debug!(what, wanted = target, ?kind, "option matched");
                options[at].click()?;
                self.pause(self.settle.option).await;
                Ok(kind)
            }
            None => {
                self.dismiss_open_control().await;
                Err(TranscribeError::OptionNotFound(format!(
                    "{what} \"{target}\" not in option list"
                )))
            }
        }
    }

    pub(crate) fn settle(&self) -> &SettleConfig {
        &self.settle
    }
}
