use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::structs::CalendarEvent;

/// Events whose `scheduled_at` falls on `date`, in their original order.
pub fn events_on(events: &[CalendarEvent], date: NaiveDate) -> Vec<&CalendarEvent> {
    events.iter().filter(|event| event.day() == date).collect()
}

/// Indexes events by calendar day. Each bucket keeps the order the events
/// were received in.
pub fn bucketize(events: &[CalendarEvent]) -> BTreeMap<NaiveDate, Vec<CalendarEvent>> {
    let mut buckets: BTreeMap<NaiveDate, Vec<CalendarEvent>> = BTreeMap::new();
    for event in events {
        buckets.entry(event.day()).or_default().push(event.clone());
    }
    buckets
}
