use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};

use crate::bucket::bucketize;
use crate::grid::YearMonth;
use crate::structs::CalendarEvent;

/// Everything needed to draw one month. Rebuilt from scratch whenever the
/// month or its events change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarMonthView {
    pub month: YearMonth,
    pub days: Vec<Option<NaiveDate>>,
    pub events_by_date: BTreeMap<NaiveDate, Vec<CalendarEvent>>,
}

impl CalendarMonthView {
    pub fn new(month: YearMonth, events: &[CalendarEvent]) -> Self {
        Self {
            month,
            days: month.grid(),
            events_by_date: bucketize(events),
        }
    }

    pub fn year(&self) -> i32 {
        self.month.year()
    }

    pub fn month0(&self) -> u32 {
        self.month.month0()
    }

    pub fn events_on(&self, date: NaiveDate) -> &[CalendarEvent] {
        self.events_by_date
            .get(&date)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Grid rows of up to seven cells; the last row may be short.
    pub fn weeks(&self) -> impl Iterator<Item = &[Option<NaiveDate>]> {
        self.days.chunks(7)
    }

    pub fn event_count(&self) -> usize {
        self.events_by_date.values().map(Vec::len).sum()
    }

    pub fn events(&self) -> impl Iterator<Item = &CalendarEvent> {
        self.events_by_date.values().flatten()
    }
}

/// Renders a `cal`-style grid, days carrying events are marked with `*`,
/// followed by the agenda of the month.
impl fmt::Display for CalendarMonthView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.month.name(), self.month.year())?;
        writeln!(f, "Su  Mo  Tu  We  Th  Fr  Sa")?;

        for week in self.weeks() {
            let mut line = String::new();
            for cell in week {
                match cell {
                    Some(date) => {
                        let marker = if self.events_on(*date).is_empty() { ' ' } else { '*' };
                        line.push_str(&format!("{:>2}{marker} ", date.day()));
                    }
                    None => line.push_str("    "),
                }
            }
            writeln!(f, "{}", line.trim_end())?;
        }

        if self.events_by_date.is_empty() {
            return writeln!(f, "\nNo events.");
        }

        writeln!(f)?;
        for event in self.events() {
            writeln!(
                f,
                "{}  {} min  [{}]  {}",
                event.scheduled_at.format("%Y-%m-%d %H:%M"),
                event.duration_minutes,
                event.event_type.label(),
                event.title
            )?;
        }

        Ok(())
    }
}
