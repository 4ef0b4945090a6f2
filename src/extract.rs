//! Grid/table extractor.
//!
//! Reconstructs normalized time-entry records from semi-structured,
//! inconsistently-labeled table markup. Table location runs an ordered
//! strategy chain and short-circuits on the first strategy that yields rows;
//! per-cell reads land in an all-optional field struct and pass through one
//! normalization step before a record exists.

use chrono::{Datelike, Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument};

use crate::aggregate::{aggregate, AggregatedEntry, ReadReport, TimeEntryRecord};
use crate::element::Element;
use crate::errors::TranscribeError;
use crate::locator::Locator;
use crate::selector::Strategy;
use crate::week::{self, DayConvention, WeekRange};
use crate::Page;

static SMALL_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(\.\d+)?$").expect("valid regex"));

/// Placeholder label an unconfigured summary row shows instead of a project.
const PROJECT_PLACEHOLDER: &str = "Select Project...";

/// Read the whole week from a page: the summary grid when it has configured
/// rows, otherwise the detail table folded through aggregation.
#[instrument(skip(page))]
pub fn read_week(page: &Page) -> ReadReport {
    let root = page.root();
    let week = derive_week_range(page.location().as_deref(), &root);
    let (mut entries, mut diagnostics) = read_summary_grid(&root, &week);

    if entries.is_empty() {
        debug!("summary grid empty, falling back to detail table");
        let (records, mut row_diags) = extract_records(&root);
        diagnostics.append(&mut row_diags);
        let (aggregated, mut fold_diags) = aggregate(&records);
        entries = aggregated;
        diagnostics.append(&mut fold_diags);
    }

    ReadReport::new(week, entries, diagnostics)
}

/// Detail-table path: one `TimeEntryRecord` per physical row. Rows missing
/// either required field (project, hours) are discarded.
pub fn extract_records(root: &Element) -> (Vec<TimeEntryRecord>, Vec<TranscribeError>) {
    let (rows, mut diagnostics) = locate_entry_rows(root);
    let mut records = Vec::new();
    for row in &rows {
        let (fields, mut problems) = scrape_row(row);
        diagnostics.append(&mut problems);
        if let Some(record) = fields.normalize() {
            records.push(record);
        }
    }
    debug!(rows = rows.len(), kept = records.len(), "extracted detail rows");
    (records, diagnostics)
}

/// Ordered table-location strategy chain. The first strategy that yields at
/// least one candidate row wins; later strategies are not attempted.
pub fn locate_entry_rows(root: &Element) -> (Vec<Element>, Vec<TranscribeError>) {
    let mut diagnostics = Vec::new();

    // 1. Rows carrying an explicit entry-identifier marker.
    let marked = Locator::new(
        root.clone(),
        vec![
            Strategy::All(vec![tag("tr"), attr("data-time-id")]),
            Strategy::All(vec![tag("tr"), attr("data-entry-id")]),
        ],
    )
    .all();
    if !marked.is_empty() {
        return (marked, diagnostics);
    }

    // 2. A table beneath a heading labeled with the entries section name.
    if let Some(table) = table_under_heading(root, "time entries") {
        let rows = data_rows(&table);
        if !rows.is_empty() {
            return (rows, diagnostics);
        }
    }

    // 3. Structural fallback: a table whose header row mentions the client,
    // project, and hours columns, in any order and casing.
    let plausible: Vec<Element> = root
        .descendants()
        .into_iter()
        .filter(|el| el.tag().eq_ignore_ascii_case("table"))
        .filter(|table| header_mentions_all(table, &["client", "project", "hours"]))
        .collect();
    if plausible.len() > 1 {
        diagnostics.push(TranscribeError::StructuralAmbiguity(format!(
            "{} tables carry client/project/hours headers; using the first",
            plausible.len()
        )));
    }
    if let Some(table) = plausible.first() {
        let rows = data_rows(table);
        if !rows.is_empty() {
            return (rows, diagnostics);
        }
    }

    // 4. Any element matching a recognized class-name fragment.
    let by_class = Locator::new(
        root.clone(),
        vec![
            Strategy::Class("time-entry-row".into()),
            Strategy::Class("entry-row".into()),
            Strategy::Class("entry-".into()),
        ],
    )
    .all();
    (by_class, diagnostics)
}

/// Header test for the structural fallback: every label must appear somewhere
/// in the table's `th` texts (order-independent, case-insensitive substring).
fn header_mentions_all(table: &Element, labels: &[&str]) -> bool {
    let headers: Vec<String> = table
        .descendants()
        .into_iter()
        .filter(|el| el.tag().eq_ignore_ascii_case("th"))
        .map(|th| th.text().to_lowercase())
        .collect();
    labels
        .iter()
        .all(|label| headers.iter().any(|h| h.contains(label)))
}

/// Find a heading whose text mentions `label` and return the table it
/// introduces: the following sibling (or a table inside it), else any table
/// beneath the heading's parent.
fn table_under_heading(root: &Element, label: &str) -> Option<Element> {
    let heading = root.descendants().into_iter().find(|el| {
        let tag = el.tag().to_lowercase();
        (tag == "h2" || tag == "h3" || el.has_class_fragment("section-header"))
            && el.text().to_lowercase().contains(label)
    })?;

    if let Some(sibling) = following_sibling(&heading) {
        if sibling.tag().eq_ignore_ascii_case("table") {
            return Some(sibling);
        }
        if let Some(table) = sibling.first_descendant_tag("table") {
            return Some(table);
        }
    }
    heading.parent()?.first_descendant_tag("table")
}

fn following_sibling(el: &Element) -> Option<Element> {
    let parent = el.parent()?;
    let siblings = parent.children();
    let at = siblings.iter().position(|s| s == el)?;
    siblings.get(at + 1).cloned()
}

/// Data rows of a table: `tr` elements that carry cells but no header cells.
fn data_rows(table: &Element) -> Vec<Element> {
    table
        .descendants()
        .into_iter()
        .filter(|el| el.tag().eq_ignore_ascii_case("tr"))
        .filter(|row| {
            let kids = row.descendants();
            kids.iter().any(|c| c.tag().eq_ignore_ascii_case("td"))
                && !kids.iter().any(|c| c.tag().eq_ignore_ascii_case("th"))
        })
        .collect()
}

/// Per-cell reads before normalization. Every field is optional here; the
/// DOM boundary never produces a partially-populated record directly.
#[derive(Debug, Clone, Default)]
pub struct RowFields {
    pub client: Option<String>,
    pub project: Option<String>,
    pub work_type: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub hours: Option<f64>,
    pub billable: Option<bool>,
}

impl RowFields {
    /// The single normalization step: defaults applied, required fields
    /// enforced. A row without a project name or with zero hours yields no
    /// record.
    pub fn normalize(self) -> Option<TimeEntryRecord> {
        let project = self.project.unwrap_or_default();
        let hours = self.hours.unwrap_or(0.0);
        if project.is_empty() || hours <= 0.0 {
            return None;
        }
        Some(TimeEntryRecord {
            client: self.client.unwrap_or_default(),
            project,
            work_type: self.work_type.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            date: self.date,
            hours,
            billable: self.billable.unwrap_or(false),
        })
    }
}

/// Read one physical row. Class-name hints assign cells first; content
/// patterns fill what is still unset. A cell classed as a date that fails to
/// parse is reported, not fatal.
pub fn scrape_row(row: &Element) -> (RowFields, Vec<TranscribeError>) {
    let mut fields = RowFields::default();
    let mut problems = Vec::new();

    let cells: Vec<Element> = row
        .descendants()
        .into_iter()
        .filter(|el| el.tag().eq_ignore_ascii_case("td"))
        .collect();
    if cells.len() < 4 {
        return (fields, problems);
    }

    for cell in &cells {
        let text = cell.text();
        let text = text.trim();
        let class = cell.class_name().to_lowercase();

        if class.contains("client") {
            fields.client = Some(text.to_string());
        } else if class.contains("project") {
            fields.project = Some(anchor_text(cell).unwrap_or_else(|| text.to_string()));
        } else if class.contains("worktype") || class.contains("work-type") {
            fields.work_type = Some(text.to_string());
        } else if class.contains("description") || class.contains("notes") {
            fields.description = Some(text.to_string());
        } else if class.contains("date") {
            match week::parse_entry_date(text) {
                Ok(date) => fields.date = Some(date),
                Err(err) => problems.push(err),
            }
        } else if class.contains("hours") || class.contains("time") {
            if let Ok(v) = text.parse::<f64>() {
                fields.hours = Some(v);
            }
        } else if class.contains("billable") {
            fields.billable = Some(billable_cell(cell, text));
        }

        // Content inference for unhinted cells. The hours heuristic accepts
        // any bare numeric in (0, 24], which can misread a small row ID as
        // hours; callers that care pass class hints.
        if fields.date.is_none() {
            if let Ok(date) = week::parse_entry_date(text) {
                fields.date = Some(date);
            }
        }
        if fields.hours.is_none() && SMALL_NUMBER.is_match(text) {
            if let Ok(v) = text.parse::<f64>() {
                if v > 0.0 && v <= 24.0 {
                    fields.hours = Some(v);
                }
            }
        }
    }

    // A project link anywhere in the row beats an unresolved project cell.
    if fields.project.is_none() {
        fields.project = row
            .descendants()
            .into_iter()
            .find(|el| {
                el.tag().eq_ignore_ascii_case("a")
                    && el
                        .attribute("href")
                        .map(|href| href.contains("project"))
                        .unwrap_or(false)
            })
            .map(|a| a.text().trim().to_string());
    }

    (fields, problems)
}

fn anchor_text(cell: &Element) -> Option<String> {
    cell.first_descendant_tag("a")
        .map(|a| a.text().trim().to_string())
        .filter(|t| !t.is_empty())
}

fn billable_cell(cell: &Element, text: &str) -> bool {
    let checked = cell.descendants().into_iter().any(|el| {
        el.tag().eq_ignore_ascii_case("input")
            && el
                .attribute("type")
                .map(|t| t.eq_ignore_ascii_case("checkbox"))
                .unwrap_or(false)
            && el.attribute("checked").is_some()
    });
    checked
        || text.eq_ignore_ascii_case("yes")
        || cell
            .descendants()
            .into_iter()
            .any(|el| el.has_class_fragment("checkmark") || el.has_class_fragment("checked"))
}

/// Summary-grid path: each configured row already holds one project/work-type
/// pair with one input per weekday. Grid columns are Sunday-first in the DOM
/// field names; values cross into Monday-first logical slots through calendar
/// dates, never slot-to-slot.
pub fn read_summary_grid(
    root: &Element,
    week: &WeekRange,
) -> (Vec<AggregatedEntry>, Vec<TranscribeError>) {
    let diagnostics = Vec::new();
    let mut entries = Vec::new();

    let rows = Locator::new(
        root.clone(),
        Strategy::All(vec![tag("tr"), attr("data-project-row")]),
    )
    .all();

    for row in rows {
        let project = dropdown_label(&row, "col-time-multiple-clientproject");
        let work_type = dropdown_label(&row, "col-time-multiple-worktype");
        if project.is_empty() || project == PROJECT_PLACEHOLDER {
            continue;
        }

        let mut entry = AggregatedEntry::new("", &project, &work_type, true);
        for grid_slot in 0..7 {
            let marker = format!("[dates][{grid_slot}][time]");
            let value = row
                .descendants()
                .into_iter()
                .find(|el| {
                    el.tag().eq_ignore_ascii_case("input")
                        && el
                            .attribute("name")
                            .map(|name| name.contains(&marker))
                            .unwrap_or(false)
                })
                .and_then(|input| input.value())
                .and_then(|v| v.trim().parse::<f64>().ok())
                .unwrap_or(0.0);
            if value > 0.0 {
                if let Some(date) = DayConvention::SundayFirst.date_in_week(week, grid_slot) {
                    let logical = DayConvention::MondayFirst.slot_for_date(date);
                    entry.hours_by_day[logical] += value;
                }
            }
        }
        entry.total_hours = entry.hours_by_day.iter().sum();
        if entry.total_hours > 0.0 {
            entries.push(entry);
        }
    }

    (entries, diagnostics)
}

/// Currently-selected label a grid dropdown shows in its header.
fn dropdown_label(row: &Element, cell_class: &str) -> String {
    Locator::new(row.clone(), Strategy::Class(cell_class.into()))
        .resolve()
        .found()
        .and_then(|cell| {
            Locator::new(cell, Strategy::Class("dropt-header".into()))
                .resolve()
                .found()
        })
        .map(|header| header.text().trim().to_string())
        .unwrap_or_default()
}

/// Week-range reconciliation, in order of preference: the explicit date
/// parameter in the page's addressable location, the visible header dates,
/// the current calendar week.
pub fn derive_week_range(location: Option<&str>, root: &Element) -> WeekRange {
    if let Some(date) = location.and_then(week::parse_location_date) {
        debug!(%date, "week range from location parameter");
        return WeekRange::containing(date);
    }

    let year = Local::now().year();
    let mut dates: Vec<NaiveDate> = root
        .descendants()
        .into_iter()
        .filter(|el| el.tag().eq_ignore_ascii_case("th"))
        .filter_map(|th| week::parse_header_date(&th.text(), year))
        .collect();
    dates.sort();
    dates.dedup();
    if dates.len() >= 2 {
        return WeekRange::from_span(dates[0], dates[dates.len() - 1]);
    }

    WeekRange::current()
}

fn tag(name: &str) -> Strategy {
    Strategy::Tag(name.to_string())
}

fn attr(name: &str) -> Strategy {
    Strategy::Attr {
        name: name.to_string(),
        value: None,
    }
}
