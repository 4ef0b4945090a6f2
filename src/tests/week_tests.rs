//! Tests for week ranges and the day-index mapping between the two grid
//! conventions.

use chrono::{Datelike, Duration, Local, NaiveDate, Weekday};

use crate::backends::{DomBackend, SyntheticDom};
use crate::extract::derive_week_range;
use crate::week::{parse_entry_date, parse_header_date, parse_location_date, DayConvention, WeekRange};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
}

#[test]
fn containing_snaps_to_monday() {
    // 2026-01-07 is a Wednesday.
    let week = WeekRange::containing(date(2026, 1, 7));
    assert_eq!(week.start, date(2026, 1, 5));
    assert_eq!(week.end, date(2026, 1, 11));
    assert_eq!(week.start.weekday(), Weekday::Mon);
    assert_eq!(week.end - week.start, Duration::days(6));
    assert!(week.contains(date(2026, 1, 7)));
    assert!(!week.contains(date(2026, 1, 12)));
}

#[test]
fn day_mapping_round_trips_through_calendar_dates() {
    let week = WeekRange::containing(date(2026, 1, 5));
    for slot in 0..7 {
        // Source grid slot -> calendar date -> logical slot -> calendar date
        // -> source grid slot.
        let as_date = DayConvention::SundayFirst
            .date_in_week(&week, slot)
            .expect("slot in range");
        let logical = DayConvention::MondayFirst.slot_for_date(as_date);
        let back = DayConvention::MondayFirst
            .date_in_week(&week, logical)
            .expect("slot in range");
        assert_eq!(DayConvention::SundayFirst.slot_for_date(back), slot);
    }
}

#[test]
fn conventions_assign_different_slots_to_the_same_date() {
    // Monday: logical slot 0, grid slot 1.
    let monday = date(2026, 1, 5);
    assert_eq!(DayConvention::MondayFirst.slot_for_date(monday), 0);
    assert_eq!(DayConvention::SundayFirst.slot_for_date(monday), 1);
    // Sunday: logical slot 6, grid slot 0.
    let sunday = date(2026, 1, 11);
    assert_eq!(DayConvention::MondayFirst.slot_for_date(sunday), 6);
    assert_eq!(DayConvention::SundayFirst.slot_for_date(sunday), 0);
}

#[test]
fn out_of_range_slot_has_no_weekday() {
    assert!(DayConvention::MondayFirst.weekday_at(7).is_none());
    assert!(DayConvention::SundayFirst.weekday_at(42).is_none());
    assert_eq!(
        DayConvention::SundayFirst.weekday_at(0),
        Some(Weekday::Sun)
    );
    assert_eq!(
        DayConvention::MondayFirst.weekday_at(0),
        Some(Weekday::Mon)
    );
}

#[test]
fn entry_date_accepts_only_full_dates() {
    assert_eq!(parse_entry_date("01/06/2026").ok(), Some(date(2026, 1, 6)));
    assert_eq!(parse_entry_date(" 1/6/2026 ").ok(), Some(date(2026, 1, 6)));
    assert!(parse_entry_date("01/06").is_err());
    assert!(parse_entry_date("13/40/2026").is_err());
    assert!(parse_entry_date("yesterday").is_err());
}

#[test]
fn header_date_defaults_the_year() {
    assert_eq!(parse_header_date("Mon 01/05", 2026), Some(date(2026, 1, 5)));
    assert_eq!(
        parse_header_date("01/05/2025", 2026),
        Some(date(2025, 1, 5))
    );
    assert_eq!(parse_header_date("Monday", 2026), None);
}

#[test]
fn location_date_parameter_parses() {
    assert_eq!(
        parse_location_date("https://example.com/time/?date=2026-01-07&tab=week"),
        Some(date(2026, 1, 7))
    );
    assert_eq!(parse_location_date("https://example.com/time/"), None);
}

#[test]
fn week_derivation_prefers_location_over_headers() {
    let dom = SyntheticDom::new();
    let row = dom.node(0, "tr").id();
    dom.node(row, "th").text("Mon 03/10");
    dom.node(row, "th").text("Sun 03/16");

    let week = derive_week_range(
        Some("https://example.com/time/?date=2026-01-07"),
        &dom.root(),
    );
    assert_eq!(week.start, date(2026, 1, 5));
    assert_eq!(week.end, date(2026, 1, 11));
}

#[test]
fn week_derivation_reads_header_dates_ascending() {
    let dom = SyntheticDom::new();
    let row = dom.node(0, "tr").id();
    // Out of order on purpose; derivation takes earliest/latest.
    dom.node(row, "th").text("Sun 01/11");
    dom.node(row, "th").text("Mon 01/05");
    dom.node(row, "th").text("Wed 01/07");

    let year = Local::now().year();
    let week = derive_week_range(None, &dom.root());
    assert_eq!(week.start, date(year, 1, 5));
    assert_eq!(week.end, date(year, 1, 11));
    assert_eq!(week.end - week.start, Duration::days(6));
}

#[test]
fn week_derivation_defaults_to_current_week() {
    let dom = SyntheticDom::new();
    dom.node(0, "p").text("no dates anywhere");

    let week = derive_week_range(None, &dom.root());
    let today = Local::now().date_naive();
    assert_eq!(week.start.weekday(), Weekday::Mon);
    assert_eq!(week.end - week.start, Duration::days(6));
    assert!(week.contains(today));
}
