//! Access to the Events API.

mod http;
mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::grid::DateRange;
use crate::structs::{CalendarEvent, NewEvent};

pub use http::HttpEventStore;
pub use memory::MemoryEventStore;

/// Remote collection of calendar events.
///
/// Stores assign ids and are the only source of truth: callers re-list after
/// creating instead of inserting the returned event locally.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Events whose `scheduled_at` lies within `range`, bounds included.
    async fn list_events(&self, range: DateRange) -> Result<Vec<CalendarEvent>>;

    async fn create_event(&self, event: NewEvent) -> Result<CalendarEvent>;
}
