//! Folding extracted records into per-week aggregation buckets.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::TranscribeError;
use crate::week::{DayConvention, WeekRange};

/// One physical row of the source's detail table, normalized. Never mutated
/// after creation; aggregation consumes it by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntryRecord {
    pub client: String,
    pub project: String,
    pub work_type: String,
    pub description: String,
    /// Absent when the row carried no parseable date cell; such records are
    /// skipped at fold time with a `DateParseFailure` diagnostic.
    pub date: Option<NaiveDate>,
    pub hours: f64,
    pub billable: bool,
}

impl TimeEntryRecord {
    /// The aggregation bucket this record belongs to. A missing client is a
    /// valid, distinct key component.
    pub fn group_key(&self) -> (String, String, String) {
        (
            self.client.clone(),
            self.project.clone(),
            self.work_type.clone(),
        )
    }
}

/// One aggregation bucket: all hours for a `(client, project, work type)`
/// tuple across the week, slotted Monday-first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedEntry {
    pub client: String,
    pub project: String,
    pub work_type: String,
    /// Monday=0 .. Sunday=6.
    pub hours_by_day: [f64; 7],
    /// Always the sum of `hours_by_day`; recomputed on every fold, never
    /// accumulated independently.
    pub total_hours: f64,
    /// Distinct descriptions in first-seen order.
    pub descriptions: Vec<String>,
    pub billable: bool,
}

impl AggregatedEntry {
    pub fn new(client: &str, project: &str, work_type: &str, billable: bool) -> Self {
        Self {
            client: client.to_string(),
            project: project.to_string(),
            work_type: work_type.to_string(),
            hours_by_day: [0.0; 7],
            total_hours: 0.0,
            descriptions: Vec::new(),
            billable,
        }
    }

    /// Fold one record into this bucket. Hours are additive; descriptions
    /// merge with set semantics. Folding the same record twice doubles its
    /// hour contribution but never duplicates its description.
    pub fn fold(&mut self, record: &TimeEntryRecord) -> Result<(), TranscribeError> {
        let date = record.date.ok_or_else(|| {
            TranscribeError::DateParseFailure(format!(
                "record for {:?} has no parseable date",
                record.project
            ))
        })?;
        let slot = DayConvention::MondayFirst.slot_for_date(date);
        self.hours_by_day[slot] += record.hours;
        self.total_hours = self.hours_by_day.iter().sum();
        if !record.description.is_empty() && !self.descriptions.contains(&record.description) {
            self.descriptions.push(record.description.clone());
        }
        Ok(())
    }
}

/// Fold a record sequence into buckets, in first-seen order. Records that
/// cannot be slotted are skipped and reported; one bad row never aborts the
/// fold.
pub fn aggregate(records: &[TimeEntryRecord]) -> (Vec<AggregatedEntry>, Vec<TranscribeError>) {
    let mut entries: Vec<AggregatedEntry> = Vec::new();
    let mut diagnostics = Vec::new();

    for record in records {
        let at = entries.iter().position(|e| {
            e.client == record.client
                && e.project == record.project
                && e.work_type == record.work_type
        });
        let at = match at {
            Some(at) => at,
            None => {
                entries.push(AggregatedEntry::new(
                    &record.client,
                    &record.project,
                    &record.work_type,
                    record.billable,
                ));
                entries.len() - 1
            }
        };
        if let Err(err) = entries[at].fold(record) {
            debug!(%err, project = %record.project, "skipping record");
            diagnostics.push(err);
        }
    }

    // Drop buckets every record of which failed to slot.
    entries.retain(|e| e.total_hours > 0.0);
    (entries, diagnostics)
}

/// Read-path output contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadReport {
    pub success: bool,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub entries: Vec<AggregatedEntry>,
    pub total_entries: usize,
    pub total_hours: f64,
    /// Per-row problems that were isolated rather than fatal: ambiguous
    /// table picks, unslottable records, discarded rows.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<TranscribeError>,
}

impl ReadReport {
    /// Convert to JSON for the embedding driver.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Create from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn new(week: WeekRange, entries: Vec<AggregatedEntry>, diagnostics: Vec<TranscribeError>) -> Self {
        let total_entries = entries.len();
        let total_hours = entries.iter().map(|e| e.total_hours).sum();
        Self {
            success: true,
            week_start: week.start,
            week_end: week.end,
            entries,
            total_entries,
            total_hours,
            diagnostics,
        }
    }
}
