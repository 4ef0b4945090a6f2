//! Write path for the week-row grid: one row holds a whole week for a
//! client/service pair, with searchable comboboxes for the pair and one hour
//! input per day column, Sunday-first.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::aggregate::AggregatedEntry;
use crate::element::{Element, Notification};
use crate::errors::TranscribeError;
use crate::locator::{match_label, Locator, MatchKind};
use crate::sequencer::Sequencer;
use crate::week::{DayConvention, WeekRange};

/// Day columns of the destination grid, Sunday=0 .. Saturday=6.
const DAY_NAMES: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

/// One validated week row for the destination grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekRowInput {
    pub client: String,
    pub service: String,
    /// Destination grid order: Sunday=0 .. Saturday=6.
    pub hours_by_day: [f64; 7],
}

impl WeekRowInput {
    /// Re-slot an aggregated entry into the destination's Sunday-first
    /// columns. The crossing goes through calendar dates; the aggregation
    /// side is Monday-first and the two never convert slot-to-slot.
    pub fn from_aggregated(entry: &AggregatedEntry, week: &WeekRange) -> Self {
        let mut hours_by_day = [0.0; 7];
        for (logical_slot, &value) in entry.hours_by_day.iter().enumerate() {
            if value <= 0.0 {
                continue;
            }
            if let Some(date) = DayConvention::MondayFirst.date_in_week(week, logical_slot) {
                hours_by_day[DayConvention::SundayFirst.slot_for_date(date)] += value;
            }
        }
        let client = if entry.client.is_empty() {
            entry.project.clone()
        } else {
            entry.client.clone()
        };
        Self {
            client,
            service: entry.work_type.clone(),
            hours_by_day,
        }
    }

    pub fn total_hours(&self) -> f64 {
        self.hours_by_day.iter().sum()
    }
}

/// Result of injecting one day's hours.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayFill {
    /// Sunday-first grid slot.
    pub grid_slot: usize,
    pub hours: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TranscribeError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekRowOutcome {
    pub client: String,
    pub service: String,
    /// Whether an explicit save affordance was found and clicked; rows
    /// without one auto-save.
    pub saved: bool,
    pub days: Vec<DayFill>,
    pub total_hours: f64,
    pub message: String,
}

impl Sequencer {
    /// Create and fill one destination week row: add the row, pick client and
    /// service through their comboboxes, save, then inject every non-zero
    /// day's hours.
    #[instrument(skip(self, input), fields(client = %input.client, service = %input.service))]
    pub async fn fill_week_row(
        &self,
        input: &WeekRowInput,
    ) -> Result<WeekRowOutcome, TranscribeError> {
        let button = self.locate_new_row_button().ok_or_else(|| {
            TranscribeError::RowCreationFailure("new-row affordance not found".into())
        })?;
        button.click()?;
        self.pause(self.settle().row).await;

        let row = self.find_new_row().ok_or_else(|| {
            TranscribeError::RowCreationFailure("created row not found".into())
        })?;

        let client_cell = self
            .week_row_cell(&row, "client")
            .ok_or_else(|| TranscribeError::ElementNotFound("client cell".into()))?;
        client_cell.click()?;
        self.pause(self.settle().open).await;
        self.select_combobox_option(&client_cell, &input.client, "client")
            .await?;

        let service_cell = self
            .week_row_cell(&row, "service")
            .ok_or_else(|| TranscribeError::ElementNotFound("service cell".into()))?;
        service_cell.click()?;
        self.pause(self.settle().open).await;
        self.select_combobox_option(&service_cell, &input.service, "service")
            .await?;

        let saved = self.save_week_row(&row).await?;
        self.pause(self.settle().option).await;

        let days = self.fill_day_inputs(&row, &input.hours_by_day).await;
        let total_hours = input.total_hours();
        let message = format!(
            "Created row for {}/{} with {total_hours}h",
            input.client, input.service
        );
        Ok(WeekRowOutcome {
            client: input.client.clone(),
            service: input.service.clone(),
            saved,
            days,
            total_hours,
            message,
        })
    }

    fn locate_new_row_button(&self) -> Option<Element> {
        let by_marker = Locator::new(
            self.page().root(),
            "attr:data-testid=new-row || attr:data-testid=add-row || class:new-row-button || class:add-row-button",
        )
        .resolve()
        .found();
        by_marker.or_else(|| {
            self.page().root().descendants().into_iter().find(|el| {
                let button_like = el.tag().eq_ignore_ascii_case("button")
                    || el
                        .attribute("role")
                        .map(|r| r.eq_ignore_ascii_case("button"))
                        .unwrap_or(false);
                if !button_like {
                    return false;
                }
                let text = el.text().to_lowercase();
                text.contains("new row") || text.contains("add row") || text.trim() == "+"
            })
        })
    }

    /// The freshly-created row: reverse scan for the row whose client cell
    /// still shows a placeholder. Falls back to the last row.
    fn find_new_row(&self) -> Option<Element> {
        let rows = Locator::new(
            self.page().root(),
            "class:timesheet-row || class:time-entry-row || tag:tr",
        )
        .all();
        for row in rows.iter().rev() {
            let cell = self
                .week_row_cell(row, "client")
                .or_else(|| row.first_descendant_tag("td"));
            if let Some(cell) = cell {
                let text = cell.text().trim().to_lowercase();
                if text.is_empty()
                    || text.contains("select")
                    || text.contains("choose")
                    || text.contains("client")
                {
                    return Some(row.clone());
                }
            }
        }
        rows.last().cloned()
    }

    fn week_row_cell(&self, row: &Element, kind: &str) -> Option<Element> {
        row.descendants().into_iter().find(|el| {
            el.attribute("data-testid")
                .map(|v| v.to_lowercase().contains(kind))
                .unwrap_or(false)
                || el.has_class_fragment(kind)
        })
    }

    /// Four-step select against a searchable combobox: the filter input lives
    /// inside the cell and the option list mounts document-wide.
    async fn select_combobox_option(
        &self,
        cell: &Element,
        target: &str,
        what: &str,
    ) -> Result<MatchKind, TranscribeError> {
        let input = cell
            .first_descendant_tag("input")
            .unwrap_or_else(|| cell.clone());
        input.focus()?;
        input.set_value("")?;
        self.pause(self.settle().dismiss).await;
        input.commit_value(target, &[Notification::Input, Notification::Change])?;
        self.pause(self.settle().filter).await;

        let listbox = Locator::new(
            self.page().root(),
            "attr:role=listbox || class:dropdown-menu || class:combobox-options || class:dropdown || class:options",
        )
        .resolve()
        .require(&format!("{what} option list"))?;
        let options = Locator::new(listbox, "attr:role=option || tag:li || class:option").all();
        let labels: Vec<String> = options.iter().map(|opt| opt.text().trim().to_string()).collect();

        match match_label(&labels, target) {
            Some((at, kind)) => {
                debug!(what, wanted = target, ?kind, "combobox option matched");
                options[at].click()?;
                self.pause(self.settle().option).await;
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

    /// Click the row's save affordance when it has one. Rows without an
    /// explicit button auto-save; that is not an error.
    async fn save_week_row(&self, row: &Element) -> Result<bool, TranscribeError> {
        let button = row.descendants().into_iter().find(|el| {
            let hinted = |value: Option<String>| {
                value
                    .map(|v| {
                        let v = v.to_lowercase();
                        v.contains("save") || v.contains("confirm")
                    })
                    .unwrap_or(false)
            };
            el.tag().eq_ignore_ascii_case("button")
                && (hinted(el.attribute("data-testid"))
                    || hinted(el.attribute("aria-label"))
                    || el.has_class_fragment("save")
                    || el.has_class_fragment("confirm"))
        });
        match button {
            Some(button) => {
                button.click()?;
                self.pause(self.settle().row).await;
                Ok(true)
            }
            None => {
                debug!("no explicit save button, assuming auto-save");
                Ok(false)
            }
        }
    }

    /// Inject every non-zero day. Blur is part of the commit here: the
    /// destination validates hour cells on blur, and skipping it leaves
    /// framework state desynced from the displayed value.
    async fn fill_day_inputs(&self, row: &Element, hours: &[f64; 7]) -> Vec<DayFill> {
        let mut fills = Vec::with_capacity(7);
        for (grid_slot, &value) in hours.iter().enumerate() {
            if value <= 0.0 {
                continue;
            }
            let result = match self.day_input(row, grid_slot) {
                None => Err(TranscribeError::ElementNotFound(format!(
                    "hour input for {}",
                    DAY_NAMES[grid_slot]
                ))),
                Some(input) => input.focus().and_then(|()| {
                    input.commit_value(
                        &format_hours(value),
                        &[Notification::Input, Notification::Change, Notification::Blur],
                    )
                }),
            };
            if let Err(err) = &result {
                warn!(day = DAY_NAMES[grid_slot], %err, "day fill failed");
            }
            self.pause(self.settle().commit).await;
            fills.push(DayFill {
                grid_slot,
                hours: value,
                error: result.err(),
            });
        }
        fills
    }

    /// Locate one day's input: an explicit `data-day` marker, then position
    /// when the row carries a full week of inputs, then a day-name hint.
    fn day_input(&self, row: &Element, grid_slot: usize) -> Option<Element> {
        let day = DAY_NAMES[grid_slot];
        let explicit = row.descendants().into_iter().find(|el| {
            el.tag().eq_ignore_ascii_case("input")
                && el
                    .attribute("data-day")
                    .map(|v| v == grid_slot.to_string() || v.eq_ignore_ascii_case(day))
                    .unwrap_or(false)
        });
        if explicit.is_some() {
            return explicit;
        }

        let inputs: Vec<Element> = row
            .descendants()
            .into_iter()
            .filter(|el| {
                el.tag().eq_ignore_ascii_case("input")
                    && el
                        .attribute("type")
                        .map(|t| t == "text" || t == "number")
                        .unwrap_or(false)
            })
            .collect();
        if inputs.len() >= 7 {
            return inputs.get(grid_slot).cloned();
        }

        row.descendants().into_iter().find(|el| {
            let named = |value: Option<String>| {
                value.map(|v| v.to_lowercase().contains(day)).unwrap_or(false)
            };
            el.tag().eq_ignore_ascii_case("input")
                && (named(el.attribute("aria-label")) || named(el.attribute("name")))
        })
    }
}

fn format_hours(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
