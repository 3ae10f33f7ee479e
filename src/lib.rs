//! Study-plan calendar for the exam-preparation platform: month grids,
//! day bucketing of events, a client for the Events API and the state of a
//! calendar view.

mod bucket;
mod config;
mod controller;
mod error;
mod grid;
mod ics;
pub mod server;
mod store;
mod structs;
mod view;

pub use bucket::{bucketize, events_on};
pub use config::Config;
pub use controller::{
    CalendarController, FetchOutcome, FetchTicket, SubmitOutcome, SubmitStart, SubmitTicket,
};
pub use error::{Error, Field, FieldErrors, Result};
pub use grid::{build_grid, days_in_month, first_of_month, DateRange, YearMonth};
pub use store::{EventStore, HttpEventStore, MemoryEventStore};
pub use structs::{
    wire_time, CalendarEvent, Envelope, EventDraft, EventType, NewEvent, DEFAULT_DURATION_MINUTES,
};
pub use view::CalendarMonthView;
