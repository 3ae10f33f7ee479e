use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use log::debug;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::EventStore;
use crate::error::{Error, Result};
use crate::grid::DateRange;
use crate::structs::{CalendarEvent, NewEvent};

/// Event store held in process memory.
///
/// Backs the local development server and doubles as a fake in tests: it
/// counts requests and can be switched offline to simulate network failures.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    events: RwLock<Vec<CalendarEvent>>,
    offline: AtomicBool,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: Vec<CalendarEvent>) -> Self {
        Self {
            events: RwLock::new(events),
            ..Self::default()
        }
    }

    /// While offline every request fails with a network error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network("events store is unreachable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn list_events(&self, range: DateRange) -> Result<Vec<CalendarEvent>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;

        let mut events: Vec<CalendarEvent> = self
            .events
            .read()
            .await
            .iter()
            .filter(|event| range.contains(event.scheduled_at))
            .cloned()
            .collect();

        // Stable, so events at the same instant keep insertion order.
        events.sort_by_key(|event| event.scheduled_at);
        Ok(events)
    }

    async fn create_event(&self, event: NewEvent) -> Result<CalendarEvent> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        event.check()?;

        let created = event.into_event(Uuid::new_v4().to_string());
        debug!("Stored event {} at {}", created.id, created.scheduled_at);

        self.events.write().await.push(created.clone());
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::error::Field;
    use crate::grid::YearMonth;
    use crate::structs::EventType;

    fn new_event(title: &str, day: u32, hour: u32) -> NewEvent {
        NewEvent {
            title: title.into(),
            description: None,
            scheduled_at: NaiveDate::from_ymd_opt(2024, 3, day)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            duration_minutes: 60,
            event_type: EventType::Lesson,
        }
    }

    #[tokio::test]
    async fn lists_only_the_requested_range_in_time_order() {
        let store = MemoryEventStore::new();
        store.create_event(new_event("late", 31, 23)).await.unwrap();
        store.create_event(new_event("first", 1, 0)).await.unwrap();
        store.create_event(new_event("second", 1, 8)).await.unwrap();

        let mut outside = new_event("april", 1, 0);
        outside.scheduled_at = NaiveDate::from_ymd_opt(2024, 4, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        store.create_event(outside).await.unwrap();

        let march = YearMonth::new(2024, 2).unwrap().range();
        let titles: Vec<_> = store
            .list_events(march)
            .await
            .unwrap()
            .into_iter()
            .map(|event| event.title)
            .collect();

        assert_eq!(titles, ["first", "second", "late"]);
        assert_eq!(store.len().await, 4);
        assert_eq!(store.create_calls(), 4);
        assert_eq!(store.list_calls(), 1);
    }

    #[tokio::test]
    async fn last_second_of_the_month_is_listed_once() {
        let mut closing = new_event("closing", 31, 23);
        closing.scheduled_at = NaiveDate::from_ymd_opt(2024, 3, 31)
            .unwrap()
            .and_hms_milli_opt(23, 59, 59, 500)
            .unwrap();
        let store = MemoryEventStore::new();
        store.create_event(closing).await.unwrap();

        let march = YearMonth::new(2024, 2).unwrap();
        let listed = store.list_events(march.range()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "closing");
        assert!(store.list_events(march.offset(1).range()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn assigns_distinct_ids() {
        let store = MemoryEventStore::new();
        let a = store.create_event(new_event("a", 2, 9)).await.unwrap();
        let b = store.create_event(new_event("b", 2, 9)).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(a.title, "a");
    }

    #[tokio::test]
    async fn rejects_blank_titles() {
        let store = MemoryEventStore::new();
        let err = store.create_event(new_event("  ", 2, 9)).await.unwrap_err();

        match err {
            Error::Validation(errors) => assert!(errors.get(Field::Title).is_some()),
            other => panic!("unexpected error: {other}"),
        }
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn offline_fails_with_network_error() {
        let store = MemoryEventStore::new();
        store.set_offline(true);

        let range = YearMonth::new(2024, 2).unwrap().range();
        assert!(matches!(
            store.list_events(range).await,
            Err(Error::Network(_))
        ));
        assert!(matches!(
            store.create_event(new_event("a", 2, 9)).await,
            Err(Error::Network(_))
        ));

        store.set_offline(false);
        assert!(store.list_events(range).await.unwrap().is_empty());
    }
}
