//! Write path for the per-day entry grid: each row carries a project and
//! work-type dropdown plus one hour input per weekday column, addressed by a
//! positional field-name encoding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::element::{Element, Notification};
use crate::errors::TranscribeError;
use crate::locator::Locator;
use crate::selector::Strategy;
use crate::sequencer::Sequencer;

const PROJECT_CELL: &str = "col-time-multiple-clientproject";
const WORK_TYPE_CELL: &str = "col-time-multiple-worktype";
/// Placeholder label the work-type dropdown shows before a pick.
const WORK_TYPE_PLACEHOLDER: &str = "Work type";

/// One validated entry to transcribe, names already matched against the
/// destination's option vocabulary by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryInput {
    pub project: String,
    pub work_type: String,
    /// Verbatim hour text to inject, e.g. "3" or "1.5".
    pub hours: String,
    #[serde(default)]
    pub description: String,
}

impl EntryInput {
    pub fn hours_value(&self) -> f64 {
        self.hours.trim().parse().unwrap_or(0.0)
    }
}

/// Progress of one entry through the fill sequence. A failure at any step
/// freezes the phase where it happened; the run continues with the next
/// entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryPhase {
    Start,
    ProjectSelected,
    WorkTypeSelected,
    HoursSet,
    DescriptionSet,
    Committed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryOutcome {
    pub index: usize,
    pub phase: EntryPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TranscribeError>,
    pub hours: f64,
}

impl EntryOutcome {
    pub fn succeeded(&self) -> bool {
        self.phase == EntryPhase::Committed && self.error.is_none()
    }
}

/// Per-run report: every entry's outcome plus a human-readable aggregate so a
/// failed run can be patched instead of repeated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub filled: usize,
    pub total: usize,
    pub total_hours: f64,
    pub outcomes: Vec<EntryOutcome>,
    pub message: String,
}

impl RunSummary {
    /// Convert to JSON for the embedding driver.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    fn from_outcomes(total: usize, outcomes: Vec<EntryOutcome>) -> Self {
        let filled = outcomes.iter().filter(|o| o.succeeded()).count();
        let total_hours: f64 = outcomes
            .iter()
            .filter(|o| o.succeeded())
            .map(|o| o.hours)
            .sum();
        let errors: Vec<String> = outcomes
            .iter()
            .filter_map(|o| {
                o.error
                    .as_ref()
                    .map(|err| format!("entry {}: {err}", o.index))
            })
            .collect();
        let message = if errors.is_empty() {
            format!("Filled {filled} entries ({total_hours}h). Review and click Save.")
        } else {
            format!("Filled {filled}/{total}. Errors: {}", errors.join(", "))
        };
        Self {
            filled,
            total,
            total_hours,
            outcomes,
            message,
        }
    }
}

impl Sequencer {
    /// Transcribe `entries` into the grid under the given destination
    /// weekday-slot, in order, isolating each entry's failure.
    #[instrument(skip(self, entries), fields(total = entries.len()))]
    pub async fn run(&self, day_slot: usize, entries: &[EntryInput]) -> RunSummary {
        let mut outcomes = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let outcome = match self.ensure_rows(index + 1).await {
                Ok(()) => self.fill_entry(day_slot, index, entry).await,
                Err(error) => {
                    warn!(index, %error, "row management failed");
                    EntryOutcome {
                        index,
                        phase: EntryPhase::Start,
                        error: Some(error),
                        hours: 0.0,
                    }
                }
            };
            outcomes.push(outcome);
        }
        RunSummary::from_outcomes(entries.len(), outcomes)
    }

    /// Fill one row. The phase freezes at the step that failed.
    pub async fn fill_entry(
        &self,
        day_slot: usize,
        index: usize,
        entry: &EntryInput,
    ) -> EntryOutcome {
        let mut phase = EntryPhase::Start;
        match self.try_fill(day_slot, index, entry, &mut phase).await {
            Ok(()) => EntryOutcome {
                index,
                phase,
                error: None,
                hours: entry.hours_value(),
            },
            Err(error) => {
                warn!(index, ?phase, %error, "entry failed");
                EntryOutcome {
                    index,
                    phase,
                    error: Some(error),
                    hours: 0.0,
                }
            }
        }
    }

    async fn try_fill(
        &self,
        day_slot: usize,
        index: usize,
        entry: &EntryInput,
        phase: &mut EntryPhase,
    ) -> Result<(), TranscribeError> {
        let row = self
            .entry_row(index)
            .ok_or_else(|| TranscribeError::ElementNotFound(format!("entry row {index}")))?;

        let project_cell = Locator::new(row.clone(), Strategy::Class(PROJECT_CELL.into()))
            .resolve()
            .require("project cell")?;
        self.select_filtered_option(&project_cell, &entry.project, "project")
            .await?;
        *phase = EntryPhase::ProjectSelected;
        // The work-type option list depends on the project and reloads.
        self.pause(self.settle().reload).await;

        let work_type_cell = Locator::new(row.clone(), Strategy::Class(WORK_TYPE_CELL.into()))
            .resolve()
            .require("work type cell")?;
        self.select_filtered_option(&work_type_cell, &entry.work_type, "work type")
            .await?;
        *phase = EntryPhase::WorkTypeSelected;

        // The hour input's name attribute is the one stable handle the grid
        // offers: row index and day slot are both encoded in it.
        let input_name = format!("f_time[{index}][dates][{day_slot}][time]");
        let hours_input = Locator::new(
            self.page().root(),
            Strategy::Attr {
                name: "name".into(),
                value: Some(input_name.clone()),
            },
        )
        .resolve()
        .require(&format!("hours input {input_name}"))?;
        hours_input.focus()?;
        hours_input.click()?;
        self.pause(self.settle().option).await;
        hours_input.commit_value(&entry.hours, &[Notification::Input, Notification::Change])?;
        self.pause(self.settle().commit).await;
        *phase = EntryPhase::HoursSet;

        // Focusing the hour cell mounts a metadata popup carrying the
        // description textarea. Absence is tolerated.
        if let Some(textarea) = self.active_popup_textarea() {
            textarea.commit_value(
                &entry.description,
                &[Notification::Input, Notification::Change],
            )?;
        }
        *phase = EntryPhase::DescriptionSet;

        // A neutral header-cell click closes the popup.
        if let Some(th) = self.page().root().first_descendant_tag("th") {
            th.click()?;
        }
        self.pause(self.settle().dismiss).await;
        *phase = EntryPhase::Committed;
        Ok(())
    }

    fn active_popup_textarea(&self) -> Option<Element> {
        Locator::new(
            self.page().root(),
            Strategy::All(vec![
                Strategy::Class("popup".into()),
                Strategy::Class("is-active".into()),
            ]),
        )
        .resolve()
        .found()
        .and_then(|popup| popup.first_descendant_tag("textarea"))
    }

    /// Make sure at least `needed` rows exist: one add-attempt per missing
    /// row, re-querying the count after each attempt rather than assuming it
    /// grew by one.
    pub async fn ensure_rows(&self, needed: usize) -> Result<(), TranscribeError> {
        let mut count = self.entry_row_count();
        if count >= needed {
            return Ok(());
        }
        let mut attempts = needed - count;
        while count < needed && attempts > 0 {
            let button = self.locate_add_row().ok_or_else(|| {
                TranscribeError::RowCreationFailure("add-row affordance not found".into())
            })?;
            button.click()?;
            self.pause(self.settle().row).await;
            count = self.entry_row_count();
            attempts -= 1;
        }
        if count < needed {
            return Err(TranscribeError::RowCreationFailure(format!(
                "row count stuck at {count}, needed {needed}"
            )));
        }
        debug!(count, "rows ready");
        Ok(())
    }

    pub fn entry_row_count(&self) -> usize {
        Locator::new(
            self.page().root(),
            Strategy::All(vec![
                Strategy::Tag("tr".into()),
                Strategy::Attr {
                    name: "data-project-row".into(),
                    value: None,
                },
            ]),
        )
        .all()
        .len()
    }

    fn entry_row(&self, index: usize) -> Option<Element> {
        Locator::new(
            self.page().root(),
            Strategy::All(vec![
                Strategy::Tag("tr".into()),
                Strategy::Attr {
                    name: "data-project-row".into(),
                    value: Some(index.to_string()),
                },
            ]),
        )
        .resolve()
        .found()
    }

    fn locate_add_row(&self) -> Option<Element> {
        Locator::new(self.page().root(), "attr:data-add-row")
            .resolve()
            .found()
            .or_else(|| {
                Locator::new(
                    self.page().root(),
                    Strategy::All(vec![
                        Strategy::Tag("button".into()),
                        Strategy::Text("Add another row".into()),
                    ]),
                )
                .resolve()
                .found()
            })
    }

    /// Discovery contract: for each project name, the selectable work-type
    /// labels the destination offers once that project is picked, or an error
    /// marker when the project cannot be resolved in the option list.
    #[instrument(skip(self, projects))]
    pub async fn discover_work_types(
        &self,
        projects: &[String],
    ) -> BTreeMap<String, Result<Vec<String>, TranscribeError>> {
        let mut discovered = BTreeMap::new();
        for project in projects {
            discovered.insert(project.clone(), self.discover_one(project).await);
        }
        discovered
    }

    async fn discover_one(&self, project: &str) -> Result<Vec<String>, TranscribeError> {
        let row = self
            .entry_row(0)
            .ok_or_else(|| TranscribeError::ElementNotFound("entry row 0".into()))?;

        let project_cell = Locator::new(row.clone(), Strategy::Class(PROJECT_CELL.into()))
            .resolve()
            .require("project cell")?;
        self.select_filtered_option(&project_cell, project, "project")
            .await?;
        self.pause(self.settle().reload).await;

        let work_type_cell = Locator::new(row, Strategy::Class(WORK_TYPE_CELL.into()))
            .resolve()
            .require("work type cell")?;
        let header = Locator::new(work_type_cell.clone(), Strategy::Class("dropt-header".into()))
            .resolve()
            .require("work type dropdown header")?;
        header.click()?;
        self.pause(self.settle().open).await;

        let labels: Vec<String> = Locator::new(
            work_type_cell,
            Strategy::All(vec![
                Strategy::Tag("li".into()),
                Strategy::Attr {
                    name: "title".into(),
                    value: None,
                },
            ]),
        )
        .all()
        .iter()
        .filter_map(|opt| opt.attribute("title"))
        .filter(|title| !title.is_empty() && title != WORK_TYPE_PLACEHOLDER)
        .collect();

        self.dismiss_open_control().await;
        Ok(labels)
    }
}
