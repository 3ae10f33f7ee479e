use chrono::Duration;
use ics::{
    escape_text,
    properties::{Categories, Description, DtEnd, DtStart, Summary},
};

use crate::{CalendarEvent, CalendarMonthView};

const STAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

impl CalendarMonthView {
    /// iCalendar document of every event in the month. Times are written
    /// floating since events carry local wall-clock timestamps.
    #[must_use]
    pub fn to_ics(&self) -> ics::ICalendar<'_> {
        let mut icalendar = ics::ICalendar::new(
            "2.0",
            format!("-//prepa-calendar//{}//EN", self.month),
        );

        for event in self.events() {
            icalendar.add_event(event.to_ics());
        }

        icalendar
    }
}

impl CalendarEvent {
    #[must_use]
    pub fn to_ics(&self) -> ics::Event<'_> {
        let start = self.scheduled_at.format(STAMP_FORMAT).to_string();
        let end = (self.scheduled_at + Duration::minutes(i64::from(self.duration_minutes)))
            .format(STAMP_FORMAT)
            .to_string();

        let mut ics_event = ics::Event::new(self.id.as_str(), start.clone());

        ics_event.push(DtStart::new(start));
        ics_event.push(DtEnd::new(end));
        ics_event.push(Summary::new(escape_text(self.title.as_str())));
        ics_event.push(Categories::new(self.event_type.as_str()));

        if let Some(description) = &self.description {
            ics_event.push(Description::new(escape_text(description.as_str())));
        }

        ics_event
    }
}
