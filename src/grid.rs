//! Month grids and month-aligned date ranges.
//!
//! Months are zero-based here (`0` is January) to match the calendar
//! widgets the grid feeds. `YearMonth`'s `Display`/`FromStr` use the
//! human `YYYY-MM` form with a one-based month.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime};

/// Lays out one month as Sunday-first grid cells.
///
/// `None` cells pad the first week so day 1 lands in its weekday column.
/// The last week is left ragged: no trailing padding is added.
/// An out-of-range `month0` yields an empty grid.
pub fn build_grid(year: i32, month0: u32) -> Vec<Option<NaiveDate>> {
    let Some(first) = first_of_month(year, month0) else {
        return Vec::new();
    };

    let leading = first.weekday().num_days_from_sunday() as usize;
    let days = days_in_month(year, month0) as usize;

    let mut cells = Vec::with_capacity(leading + days);
    cells.resize(leading, None);
    cells.extend(first.iter_days().take(days).map(Some));
    cells
}

pub fn first_of_month(year: i32, month0: u32) -> Option<NaiveDate> {
    if month0 > 11 {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month0 + 1, 1)
}

/// Number of days in the month, computed as the day before the first of the
/// following month.
pub fn days_in_month(year: i32, month0: u32) -> u32 {
    first_of_month(year, month0)
        .and_then(|first| first.checked_add_months(Months::new(1)))
        .and_then(|next| next.pred_opt())
        .map_or(0, |last| last.day())
}

/// Inclusive span of local timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateRange {
    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month0: u32,
}

impl YearMonth {
    pub fn new(year: i32, month0: u32) -> Option<Self> {
        first_of_month(year, month0)?;
        Some(Self { year, month0 })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month0: date.month0(),
        }
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month0(self) -> u32 {
        self.month0
    }

    /// Moves by `delta` months, rolling over year boundaries.
    pub fn offset(self, delta: i32) -> Self {
        let index = i64::from(self.year) * 12 + i64::from(self.month0) + i64::from(delta);
        let year = index.div_euclid(12);
        let month0 = index.rem_euclid(12) as u32;

        i32::try_from(year)
            .ok()
            .and_then(|year| Self::new(year, month0))
            .unwrap_or(self)
    }

    pub fn first_day(self) -> NaiveDate {
        first_of_month(self.year, self.month0).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(self) -> NaiveDate {
        self.first_day()
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month0() == self.month0
    }

    /// From the first day at midnight through the last nanosecond of the
    /// last day.
    pub fn range(self) -> DateRange {
        DateRange {
            start: self.first_day().and_hms_opt(0, 0, 0).unwrap_or(NaiveDateTime::MIN),
            end: self
                .last_day()
                .and_hms_nano_opt(23, 59, 59, 999_999_999)
                .unwrap_or(NaiveDateTime::MAX),
        }
    }

    pub fn grid(self) -> Vec<Option<NaiveDate>> {
        build_grid(self.year, self.month0)
    }

    pub fn name(self) -> &'static str {
        chrono::Month::try_from((self.month0 + 1) as u8)
            .map(|month| month.name())
            .unwrap_or("")
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month0 + 1)
    }
}

impl FromStr for YearMonth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("`{s}` is not a month, expected YYYY-MM");
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;

        month
            .checked_sub(1)
            .and_then(|month0| YearMonth::new(year, month0))
            .ok_or_else(invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn day_cells(grid: &[Option<NaiveDate>]) -> Vec<NaiveDate> {
        grid.iter().flatten().copied().collect()
    }

    #[test]
    fn grid_covers_every_day_once_in_order() {
        for year in [1999, 2000, 2023, 2024, 2100] {
            for month0 in 0..12 {
                let grid = build_grid(year, month0);
                let days = day_cells(&grid);
                let first = first_of_month(year, month0).unwrap();

                assert_eq!(days.len() as u32, days_in_month(year, month0));
                assert_eq!(days[0], first);
                assert!(days.windows(2).all(|pair| pair[1] == pair[0].succ_opt().unwrap()));
                assert!(days.iter().all(|day| day.month0() == month0));
            }
        }
    }

    #[test]
    fn padding_only_leads() {
        for month0 in 0..12 {
            let grid = build_grid(2025, month0);
            let leading = grid.iter().take_while(|cell| cell.is_none()).count();

            assert!(leading < 7);
            assert!(grid[leading..].iter().all(Option::is_some));
        }
    }

    #[test]
    fn february_follows_leap_years() {
        assert_eq!(day_cells(&build_grid(2024, 1)).len(), 29);
        assert_eq!(day_cells(&build_grid(2023, 1)).len(), 28);
        assert_eq!(day_cells(&build_grid(1900, 1)).len(), 28);
        assert_eq!(day_cells(&build_grid(2000, 1)).len(), 29);
    }

    #[test]
    fn first_day_lands_in_its_weekday_column() {
        // January 2024 starts on a Monday.
        let grid = build_grid(2024, 0);
        assert_eq!(grid[0], None);
        assert_eq!(grid[1], Some(date(2024, 1, 1)));

        // September 2024 starts on a Sunday.
        let grid = build_grid(2024, 8);
        assert_eq!(grid[0], Some(date(2024, 9, 1)));

        // June 2024 starts on a Saturday and needs six weeks.
        let grid = build_grid(2024, 5);
        assert_eq!(grid.iter().take_while(|cell| cell.is_none()).count(), 6);
        assert_eq!(grid.len(), 36);
    }

    #[test]
    fn invalid_month_yields_empty_grid() {
        assert!(build_grid(2024, 12).is_empty());
        assert_eq!(days_in_month(2024, 12), 0);
    }

    #[test]
    fn offset_rolls_over_years() {
        let december = YearMonth::new(2023, 11).unwrap();
        assert_eq!(december.offset(1), YearMonth::new(2024, 0).unwrap());
        assert_eq!(december.offset(-12), YearMonth::new(2022, 11).unwrap());
        assert_eq!(
            YearMonth::new(2024, 0).unwrap().offset(-1),
            YearMonth::new(2023, 11).unwrap()
        );
    }

    #[test]
    fn range_spans_the_whole_month() {
        let range = YearMonth::new(2024, 1).unwrap().range();

        assert_eq!(range.start, date(2024, 2, 1).and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(
            range.end,
            date(2024, 2, 29).and_hms_nano_opt(23, 59, 59, 999_999_999).unwrap()
        );
        assert!(range.contains(date(2024, 2, 29).and_hms_opt(23, 0, 0).unwrap()));
        assert!(!range.contains(date(2024, 3, 1).and_hms_opt(0, 0, 0).unwrap()));
    }

    #[test]
    fn adjacent_ranges_share_no_instant_and_leave_no_gap() {
        let march = YearMonth::new(2024, 2).unwrap();
        let april = march.offset(1).range();
        let march = march.range();
        let half_past = date(2024, 3, 31).and_hms_milli_opt(23, 59, 59, 500).unwrap();

        assert!(march.contains(half_past));
        assert!(!april.contains(half_past));
        assert!(!march.contains(april.start));
        assert_eq!(march.end + chrono::Duration::nanoseconds(1), april.start);
    }

    #[test]
    fn year_month_parses_human_form() {
        let march = "2024-03".parse::<YearMonth>().unwrap();
        assert_eq!(march, YearMonth::new(2024, 2).unwrap());
        assert_eq!(march.to_string(), "2024-03");
        assert_eq!(march.name(), "March");

        assert!("2024-13".parse::<YearMonth>().is_err());
        assert!("2024-00".parse::<YearMonth>().is_err());
        assert!("March".parse::<YearMonth>().is_err());
    }

    #[test]
    fn containing_matches_contains() {
        let day = date(2024, 3, 15);
        let month = YearMonth::containing(day);

        assert!(month.contains(day));
        assert!(!month.contains(date(2024, 4, 1)));
    }
}
