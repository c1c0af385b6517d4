//! Month calendar grid
//!
//! Lays out a month of daily summaries as a Sunday-first, 7-column grid with
//! blank padding cells before day 1 and after the last day.

use crate::types::{CalendarCell, DailySummary, YearMonth};
use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;

/// Columns per grid row (Sunday through Saturday)
pub const DAYS_PER_WEEK: usize = 7;

/// Build the display grid for `month` from a sparse list of summaries.
///
/// Summaries outside the month are ignored; for duplicate dates the last one wins.
/// The result length is always a multiple of 7.
pub fn build_month_grid(month: YearMonth, summaries: &[DailySummary]) -> Vec<CalendarCell> {
    let by_date: HashMap<NaiveDate, &DailySummary> =
        summaries.iter().map(|s| (s.date, s)).collect();

    let leading = month.first_day().weekday().num_days_from_sunday() as usize;
    let days = month.length();

    let mut cells = Vec::with_capacity(6 * DAYS_PER_WEEK);
    cells.extend(std::iter::repeat_with(CalendarCell::blank).take(leading));

    for d in 1..=days {
        let Some(date) = month.day(d) else {
            continue;
        };
        cells.push(CalendarCell {
            date: Some(date),
            label: d.to_string(),
            summary: by_date.get(&date).map(|s| (*s).clone()),
        });
    }

    while cells.len() % DAYS_PER_WEEK != 0 {
        cells.push(CalendarCell::blank());
    }

    cells
}

/// Find the cell for a date, if the grid contains it
pub fn find_cell(cells: &[CalendarCell], date: NaiveDate) -> Option<&CalendarCell> {
    cells.iter().find(|c| c.date == Some(date))
}

/// Split a grid into week rows
pub fn weeks(cells: &[CalendarCell]) -> impl Iterator<Item = &[CalendarCell]> {
    cells.chunks(DAYS_PER_WEEK)
}
