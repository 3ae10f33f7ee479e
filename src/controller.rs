//! State behind one rendered calendar.
//!
//! Every request is split in two halves so the caller decides when the
//! await happens: `begin_*` hands out a ticket and marks the request as in
//! flight, `apply_fetch`/`finish_submit` take the ticket back together with
//! the store's answer. Responses may come back in any order; a fetch ticket
//! that no longer matches the visible month is dropped on arrival.

use chrono::{Local, NaiveDate};
use log::{debug, info, warn};

use crate::error::{Error, FieldErrors, Result};
use crate::grid::{DateRange, YearMonth};
use crate::store::EventStore;
use crate::structs::{CalendarEvent, EventDraft, NewEvent};
use crate::view::CalendarMonthView;

/// Identifies one `list_events` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    month: YearMonth,
    seq: u64,
}

impl FetchTicket {
    pub fn month(&self) -> YearMonth {
        self.month
    }

    pub fn range(&self) -> DateRange {
        self.month.range()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response replaced the displayed events.
    Applied(usize),
    /// The request failed; the month shows no events and a banner is set.
    Failed,
    /// The response belongs to a month or request that has since been
    /// superseded and was dropped.
    Stale,
}

/// Payload of a submission that is in flight.
#[derive(Debug)]
pub struct SubmitTicket {
    event: NewEvent,
}

impl SubmitTicket {
    pub fn event(&self) -> &NewEvent {
        &self.event
    }
}

#[derive(Debug)]
pub enum SubmitStart {
    Ready(SubmitTicket),
    /// A submission is already in flight; nothing was sent.
    AlreadyPending,
    /// The draft has field errors; nothing was sent.
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The store accepted the event. `refresh` re-lists the visible month.
    Created {
        event: CalendarEvent,
        refresh: FetchTicket,
    },
    /// The store refused or could not be reached; the draft is kept.
    Rejected,
    AlreadyPending,
    Invalid,
}

#[derive(Debug, Clone)]
pub struct CalendarController {
    visible: YearMonth,
    selected: Option<NaiveDate>,
    events: Vec<CalendarEvent>,
    banner: Option<String>,
    issued_seq: u64,
    applied_seq: u64,
    loading: bool,

    draft: EventDraft,
    dialog_open: bool,
    field_errors: FieldErrors,
    submit_error: Option<String>,
    submitting: bool,
}

impl CalendarController {
    pub fn new(visible: YearMonth) -> Self {
        Self {
            visible,
            selected: None,
            events: Vec::new(),
            banner: None,
            issued_seq: 0,
            applied_seq: 0,
            loading: false,
            draft: EventDraft::default(),
            dialog_open: false,
            field_errors: FieldErrors::new(),
            submit_error: None,
            submitting: false,
        }
    }

    /// Controller showing the current local month with today selected.
    pub fn for_today() -> Self {
        let today = Local::now().date_naive();
        let mut controller = Self::new(YearMonth::containing(today));
        controller.selected = Some(today);
        controller
    }

    pub fn visible(&self) -> YearMonth {
        self.visible
    }

    pub fn selected(&self) -> Option<NaiveDate> {
        self.selected
    }

    pub fn events(&self) -> &[CalendarEvent] {
        &self.events
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn month_view(&self) -> CalendarMonthView {
        CalendarMonthView::new(self.visible, &self.events)
    }

    pub fn selected_events(&self) -> Vec<&CalendarEvent> {
        match self.selected {
            Some(date) => crate::bucket::events_on(&self.events, date),
            None => Vec::new(),
        }
    }

    // Month navigation and fetching

    /// Starts a fetch of the visible month.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.issued_seq += 1;
        self.loading = true;
        FetchTicket {
            month: self.visible,
            seq: self.issued_seq,
        }
    }

    /// Shows the previous (`-1`) or next (`+1`) month. The old month's
    /// events are cleared right away and a fetch for the new one is issued.
    pub fn navigate_month(&mut self, delta: i32) -> FetchTicket {
        self.visible = self.visible.offset(delta);
        self.events.clear();
        debug!("Navigated to {}", self.visible);
        self.begin_fetch()
    }

    /// Re-issues the fetch for the visible month after a failure.
    pub fn retry(&mut self) -> FetchTicket {
        self.begin_fetch()
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    /// Applies the answer to `ticket`, unless it has been superseded.
    pub fn apply_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<CalendarEvent>>,
    ) -> FetchOutcome {
        if ticket.seq == self.issued_seq {
            self.loading = false;
        }

        if ticket.month != self.visible || ticket.seq <= self.applied_seq {
            debug!(
                "Discarding stale events for {} (showing {})",
                ticket.month, self.visible
            );
            return FetchOutcome::Stale;
        }
        self.applied_seq = ticket.seq;

        match result {
            Ok(events) => {
                debug!("Loaded {} events for {}", events.len(), ticket.month);
                self.events = events;
                self.banner = None;
                FetchOutcome::Applied(self.events.len())
            }
            Err(err) => {
                warn!("Failed to load events for {}: {err}", ticket.month);
                self.events.clear();
                self.banner = Some(format!(
                    "Could not load events for {} {}: {err}",
                    ticket.month.name(),
                    ticket.month.year()
                ));
                FetchOutcome::Failed
            }
        }
    }

    pub async fn load<S: EventStore + ?Sized>(
        &mut self,
        store: &S,
        ticket: FetchTicket,
    ) -> FetchOutcome {
        let result = store.list_events(ticket.range()).await;
        self.apply_fetch(ticket, result)
    }

    pub async fn refresh<S: EventStore + ?Sized>(&mut self, store: &S) -> FetchOutcome {
        let ticket = self.begin_fetch();
        self.load(store, ticket).await
    }

    pub async fn navigate<S: EventStore + ?Sized>(&mut self, store: &S, delta: i32) -> FetchOutcome {
        let ticket = self.navigate_month(delta);
        self.load(store, ticket).await
    }

    // Selection

    /// Selects a grid cell. Padding cells and dates outside the visible
    /// month are ignored. Returns whether the selection changed.
    pub fn select_date(&mut self, cell: Option<NaiveDate>) -> bool {
        match cell {
            Some(date) if self.visible.contains(date) => {
                let changed = self.selected != Some(date);
                self.selected = Some(date);
                changed
            }
            _ => false,
        }
    }

    // Creation dialog

    pub fn is_dialog_open(&self) -> bool {
        self.dialog_open
    }

    /// Opens the creation dialog, pre-filling the selected date into an
    /// empty draft.
    pub fn open_dialog(&mut self) {
        self.dialog_open = true;
        if self.draft.date.is_empty() {
            if let Some(date) = self.selected {
                self.draft.date = date.format("%Y-%m-%d").to_string();
            }
        }
    }

    pub fn cancel_dialog(&mut self) {
        self.dialog_open = false;
        self.reset_draft();
    }

    pub fn draft(&self) -> &EventDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut EventDraft {
        &mut self.draft
    }

    pub fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    pub fn submit_error(&self) -> Option<&str> {
        self.submit_error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn can_submit(&self) -> bool {
        !self.submitting && self.draft.is_complete()
    }

    /// Validates the draft and marks a submission as in flight.
    pub fn begin_submit(&mut self) -> SubmitStart {
        if self.submitting {
            debug!("Ignoring submit while another one is pending");
            return SubmitStart::AlreadyPending;
        }

        match self.draft.validate() {
            Ok(event) => {
                self.field_errors.clear();
                self.submit_error = None;
                self.submitting = true;
                SubmitStart::Ready(SubmitTicket { event })
            }
            Err(errors) => {
                debug!("Draft rejected before submission: {errors}");
                self.field_errors = errors;
                SubmitStart::Invalid
            }
        }
    }

    pub fn finish_submit(
        &mut self,
        ticket: SubmitTicket,
        result: Result<CalendarEvent>,
    ) -> SubmitOutcome {
        self.submitting = false;

        match result {
            Ok(event) => {
                info!("Created event {} ({})", event.id, ticket.event.title);
                self.dialog_open = false;
                self.reset_draft();
                let refresh = self.begin_fetch();
                SubmitOutcome::Created { event, refresh }
            }
            Err(Error::Validation(errors)) => {
                warn!("Events API rejected `{}`: {errors}", ticket.event.title);
                self.field_errors = errors;
                SubmitOutcome::Rejected
            }
            Err(err) => {
                warn!("Failed to create `{}`: {err}", ticket.event.title);
                self.submit_error = Some(err.to_string());
                SubmitOutcome::Rejected
            }
        }
    }

    /// Submits the draft and, once created, re-lists the visible month.
    pub async fn submit<S: EventStore + ?Sized>(&mut self, store: &S) -> SubmitOutcome {
        let ticket = match self.begin_submit() {
            SubmitStart::Ready(ticket) => ticket,
            SubmitStart::AlreadyPending => return SubmitOutcome::AlreadyPending,
            SubmitStart::Invalid => return SubmitOutcome::Invalid,
        };

        let result = store.create_event(ticket.event.clone()).await;
        let outcome = self.finish_submit(ticket, result);

        if let SubmitOutcome::Created { refresh, .. } = &outcome {
            self.load(store, *refresh).await;
        }
        outcome
    }

    fn reset_draft(&mut self) {
        self.draft = EventDraft::default();
        self.field_errors.clear();
        self.submit_error = None;
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;
    use crate::error::Field;
    use crate::store::MemoryEventStore;
    use crate::structs::EventType;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn event(id: &str, scheduled_at: &str) -> CalendarEvent {
        CalendarEvent {
            id: id.into(),
            title: format!("Event {id}"),
            description: None,
            scheduled_at: NaiveDateTime::parse_from_str(scheduled_at, "%Y-%m-%d %H:%M").unwrap(),
            duration_minutes: 60,
            event_type: EventType::Study,
        }
    }

    fn march() -> CalendarController {
        CalendarController::new(YearMonth::new(2024, 2).unwrap())
    }

    fn ids(events: &[CalendarEvent]) -> Vec<&str> {
        events.iter().map(|event| event.id.as_str()).collect()
    }

    fn study_session() -> EventDraft {
        EventDraft {
            title: "Study Session".into(),
            date: "2024-03-15".into(),
            time: "14:00".into(),
            duration_minutes: 60,
            event_type: EventType::Study,
            ..EventDraft::default()
        }
    }

    #[test]
    fn late_response_for_previous_month_is_discarded() {
        let mut controller = march();
        let march_ticket = controller.begin_fetch();
        let april_ticket = controller.navigate_month(1);

        let april = controller.apply_fetch(april_ticket, Ok(vec![event("apr", "2024-04-02 10:00")]));
        assert_eq!(april, FetchOutcome::Applied(1));

        let stale = controller.apply_fetch(march_ticket, Ok(vec![event("mar", "2024-03-02 10:00")]));
        assert_eq!(stale, FetchOutcome::Stale);
        assert_eq!(ids(controller.events()), ["apr"]);
        assert_eq!(controller.visible(), YearMonth::new(2024, 3).unwrap());
    }

    #[test]
    fn early_response_for_previous_month_is_discarded() {
        let mut controller = march();
        let march_ticket = controller.begin_fetch();
        let april_ticket = controller.navigate_month(1);

        let stale = controller.apply_fetch(march_ticket, Ok(vec![event("mar", "2024-03-02 10:00")]));
        assert_eq!(stale, FetchOutcome::Stale);
        assert!(controller.events().is_empty());
        assert!(controller.is_loading());

        controller.apply_fetch(april_ticket, Ok(vec![]));
        assert!(!controller.is_loading());
    }

    #[test]
    fn older_request_for_same_month_cannot_overwrite_newer() {
        let mut controller = march();
        let first = controller.begin_fetch();
        let second = controller.begin_fetch();

        controller.apply_fetch(second, Ok(vec![event("new", "2024-03-02 10:00")]));
        assert_eq!(controller.apply_fetch(first, Ok(vec![])), FetchOutcome::Stale);
        assert_eq!(ids(controller.events()), ["new"]);
    }

    #[test]
    fn failed_fetch_shows_empty_month_and_banner() {
        let mut controller = march();
        let ticket = controller.begin_fetch();
        controller.apply_fetch(ticket, Ok(vec![event("a", "2024-03-02 10:00")]));

        let ticket = controller.retry();
        let outcome = controller.apply_fetch(ticket, Err(Error::Network("offline".into())));

        assert_eq!(outcome, FetchOutcome::Failed);
        assert!(controller.events().is_empty());
        assert!(controller.banner().unwrap().contains("March 2024"));
        assert!(!controller.is_loading());

        let ticket = controller.retry();
        controller.apply_fetch(ticket, Ok(vec![]));
        assert_eq!(controller.banner(), None);
    }

    #[test]
    fn banner_can_be_dismissed() {
        let mut controller = march();
        let ticket = controller.begin_fetch();
        controller.apply_fetch(
            ticket,
            Err(Error::Server {
                status: 500,
                message: "boom".into(),
            }),
        );

        controller.dismiss_banner();
        assert_eq!(controller.banner(), None);
    }

    #[test]
    fn navigation_wraps_years() {
        let mut controller = CalendarController::new(YearMonth::new(2024, 0).unwrap());
        let ticket = controller.navigate_month(-1);

        assert_eq!(ticket.month(), YearMonth::new(2023, 11).unwrap());
        assert_eq!(ticket.range().start.date(), date(2023, 12, 1));
    }

    #[test]
    fn selecting_padding_or_foreign_dates_is_a_no_op() {
        let mut controller = march();

        assert!(!controller.select_date(None));
        assert!(!controller.select_date(Some(date(2024, 4, 1))));
        assert_eq!(controller.selected(), None);

        assert!(controller.select_date(Some(date(2024, 3, 15))));
        assert!(!controller.select_date(Some(date(2024, 3, 15))));
        assert_eq!(controller.selected(), Some(date(2024, 3, 15)));
    }

    #[test]
    fn selection_filters_without_fetching() {
        let mut controller = march();
        let ticket = controller.begin_fetch();
        controller.apply_fetch(
            ticket,
            Ok(vec![
                event("a", "2024-03-15 09:00"),
                event("b", "2024-03-16 09:00"),
                event("c", "2024-03-15 18:00"),
            ]),
        );

        controller.select_date(Some(date(2024, 3, 15)));
        let selected: Vec<_> = controller.selected_events().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(selected, ["a", "c"]);
        assert!(!controller.is_loading());
    }

    #[test]
    fn open_dialog_prefills_selected_date() {
        let mut controller = march();
        controller.select_date(Some(date(2024, 3, 9)));
        controller.open_dialog();

        assert!(controller.is_dialog_open());
        assert_eq!(controller.draft().date, "2024-03-09");

        controller.draft_mut().title = "Chemistry".into();
        controller.cancel_dialog();
        assert!(!controller.is_dialog_open());
        assert_eq!(controller.draft(), &EventDraft::default());
    }

    #[test]
    fn second_submit_while_pending_is_ignored() {
        let mut controller = march();
        *controller.draft_mut() = study_session();

        let ticket = match controller.begin_submit() {
            SubmitStart::Ready(ticket) => ticket,
            other => panic!("unexpected start: {other:?}"),
        };
        assert!(controller.is_submitting());
        assert!(!controller.can_submit());
        assert!(matches!(controller.begin_submit(), SubmitStart::AlreadyPending));

        controller.finish_submit(ticket, Err(Error::Network("timeout".into())));
        assert!(controller.can_submit());
    }

    #[test]
    fn failed_submit_keeps_draft_and_shows_error_inline() {
        let mut controller = march();
        controller.open_dialog();
        *controller.draft_mut() = study_session();

        let SubmitStart::Ready(ticket) = controller.begin_submit() else {
            panic!("draft should be valid");
        };
        let outcome = controller.finish_submit(
            ticket,
            Err(Error::Server {
                status: 503,
                message: "maintenance".into(),
            }),
        );

        assert_eq!(outcome, SubmitOutcome::Rejected);
        assert!(controller.is_dialog_open());
        assert_eq!(controller.draft(), &study_session());
        assert!(controller.submit_error().unwrap().contains("maintenance"));
    }

    #[test]
    fn server_validation_is_shown_as_field_errors() {
        let mut controller = march();
        *controller.draft_mut() = study_session();

        let SubmitStart::Ready(ticket) = controller.begin_submit() else {
            panic!("draft should be valid");
        };
        controller.finish_submit(
            ticket,
            Err(Error::Validation(FieldErrors::single(Field::Form, "duplicate"))),
        );

        assert_eq!(controller.field_errors().get(Field::Form), Some("duplicate"));
        assert_eq!(controller.submit_error(), None);
    }

    #[tokio::test]
    async fn created_event_appears_after_refresh() {
        let store = MemoryEventStore::new();
        let mut controller = march();
        controller.refresh(&store).await;

        controller.open_dialog();
        *controller.draft_mut() = study_session();
        assert!(controller.can_submit());

        let outcome = controller.submit(&store).await;
        let SubmitOutcome::Created { event, .. } = outcome else {
            panic!("unexpected outcome: {outcome:?}");
        };

        let expected_at = date(2024, 3, 15).and_hms_opt(14, 0, 0).unwrap();
        assert_eq!(event.scheduled_at, expected_at);

        let view = controller.month_view();
        let on_day = view.events_on(date(2024, 3, 15));
        assert_eq!(on_day.len(), 1);
        assert_eq!(on_day[0].title, "Study Session");
        assert_eq!(on_day[0].scheduled_at, expected_at);
        assert_eq!(on_day[0].event_type, EventType::Study);

        assert!(!controller.is_dialog_open());
        assert_eq!(controller.draft(), &EventDraft::default());
        assert_eq!(store.create_calls(), 1);
        assert_eq!(store.list_calls(), 2);
    }

    #[tokio::test]
    async fn empty_title_never_reaches_the_store() {
        let store = MemoryEventStore::new();
        let mut controller = march();
        controller.open_dialog();
        *controller.draft_mut() = EventDraft {
            title: String::new(),
            ..study_session()
        };

        assert!(!controller.can_submit());
        assert_eq!(controller.submit(&store).await, SubmitOutcome::Invalid);

        assert_eq!(store.create_calls(), 0);
        assert_eq!(store.list_calls(), 0);
        assert!(controller.field_errors().get(Field::Title).is_some());
        assert!(controller.is_dialog_open());
        assert_eq!(controller.draft().date, "2024-03-15");
    }

    #[tokio::test]
    async fn unreachable_store_degrades_to_banner() {
        let store = MemoryEventStore::with_events(vec![event("a", "2024-03-15 09:00")]);
        store.set_offline(true);

        let mut controller = march();
        assert_eq!(controller.refresh(&store).await, FetchOutcome::Failed);
        assert!(controller.month_view().events_by_date.is_empty());
        assert!(controller.banner().is_some());

        store.set_offline(false);
        assert_eq!(controller.navigate(&store, 1).await, FetchOutcome::Applied(0));
        assert_eq!(controller.navigate(&store, -1).await, FetchOutcome::Applied(1));
        assert_eq!(controller.banner(), None);
    }
}
