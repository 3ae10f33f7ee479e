use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{Field, FieldErrors};

pub const DEFAULT_DURATION_MINUTES: u32 = 60;

fn default_duration() -> u32 {
    DEFAULT_DURATION_MINUTES
}

/// Category of a study-plan event. Only affects labelling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Lesson,
    Assessment,
    Review,
    Practice,
    StudyGroup,
    LiveSession,
    Custom,
    #[default]
    Study,
}

impl EventType {
    pub const ALL: [EventType; 8] = [
        EventType::Lesson,
        EventType::Assessment,
        EventType::Review,
        EventType::Practice,
        EventType::StudyGroup,
        EventType::LiveSession,
        EventType::Custom,
        EventType::Study,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Lesson => "lesson",
            EventType::Assessment => "assessment",
            EventType::Review => "review",
            EventType::Practice => "practice",
            EventType::StudyGroup => "study_group",
            EventType::LiveSession => "live_session",
            EventType::Custom => "custom",
            EventType::Study => "study",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EventType::Lesson => "Lesson",
            EventType::Assessment => "Assessment",
            EventType::Review => "Review",
            EventType::Practice => "Practice",
            EventType::StudyGroup => "Study group",
            EventType::LiveSession => "Live session",
            EventType::Custom => "Custom",
            EventType::Study => "Study",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown event type `{s}`"))
    }
}

/// An event as stored by the Events API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(with = "wire_time")]
    pub scheduled_at: NaiveDateTime,
    #[serde(rename = "duration", default = "default_duration")]
    pub duration_minutes: u32,
    #[serde(rename = "type", default)]
    pub event_type: EventType,
}

impl CalendarEvent {
    /// The calendar day this event is bucketed under.
    pub fn day(&self) -> NaiveDate {
        self.scheduled_at.date()
    }
}

/// Body of `POST /events`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(with = "wire_time")]
    pub scheduled_at: NaiveDateTime,
    #[serde(rename = "duration", default = "default_duration")]
    pub duration_minutes: u32,
    #[serde(rename = "type", default)]
    pub event_type: EventType,
}

impl NewEvent {
    /// Checks the invariants a payload must hold regardless of where it was
    /// built. Used by stores receiving payloads from elsewhere.
    pub fn check(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.title.trim().is_empty() {
            errors.insert(Field::Title, "Title is required");
        }
        if self.duration_minutes == 0 {
            errors.insert(Field::Duration, "Duration must be at least one minute");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn into_event(self, id: impl Into<String>) -> CalendarEvent {
        CalendarEvent {
            id: id.into(),
            title: self.title,
            description: self.description,
            scheduled_at: self.scheduled_at,
            duration_minutes: self.duration_minutes,
            event_type: self.event_type,
        }
    }
}

/// `{ success, data, message, errors }` wrapper around every Events API
/// response. `errors` carries field-scoped validation messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            errors: None,
        }
    }

    pub fn rejected(errors: &FieldErrors) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(errors.to_string()),
            errors: Some(errors.to_wire()),
        }
    }
}

/// User-entered form state for an event that has not been submitted yet.
///
/// Date and time are kept as the raw strings typed into the form so that a
/// failed submission hands them back untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`
    pub time: String,
    pub duration_minutes: u32,
    pub event_type: EventType,
}

impl Default for EventDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            date: String::new(),
            time: String::new(),
            duration_minutes: DEFAULT_DURATION_MINUTES,
            event_type: EventType::default(),
        }
    }
}

impl EventDraft {
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            date: date.format("%Y-%m-%d").to_string(),
            ..Self::default()
        }
    }

    /// Title, date and time are all filled in.
    pub fn is_complete(&self) -> bool {
        !self.title.trim().is_empty()
            && !self.date.trim().is_empty()
            && !self.time.trim().is_empty()
    }

    /// Turns the draft into a request payload, collecting every field error.
    pub fn validate(&self) -> Result<NewEvent, FieldErrors> {
        let mut errors = FieldErrors::new();

        let title = self.title.trim();
        if title.is_empty() {
            errors.insert(Field::Title, "Title is required");
        }

        let date = match self.date.trim() {
            "" => {
                errors.insert(Field::Date, "Date is required");
                None
            }
            raw => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| errors.insert(Field::Date, format!("`{raw}` is not a valid date")))
                .ok(),
        };

        let time = match self.time.trim() {
            "" => {
                errors.insert(Field::Time, "Time is required");
                None
            }
            raw => parse_time(raw)
                .ok_or_else(|| errors.insert(Field::Time, format!("`{raw}` is not a valid time")))
                .ok(),
        };

        if self.duration_minutes == 0 {
            errors.insert(Field::Duration, "Duration must be at least one minute");
        }

        match (date, time) {
            (Some(date), Some(time)) if errors.is_empty() => {
                let description = self.description.trim();
                Ok(NewEvent {
                    title: title.to_string(),
                    description: (!description.is_empty()).then(|| description.to_string()),
                    scheduled_at: date.and_time(time),
                    duration_minutes: self.duration_minutes,
                    event_type: self.event_type,
                })
            }
            _ => Err(errors),
        }
    }
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

/// `scheduledAt` on the wire.
///
/// Written as a naive local timestamp. Read either with an offset, which is
/// converted to the local wall clock, or naive.
pub mod wire_time {
    use chrono::{DateTime, Local, NaiveDateTime};
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Fractional seconds are written only when present.
    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn format(timestamp: &NaiveDateTime) -> String {
        timestamp.format(FORMAT).to_string()
    }

    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
            return Some(timestamp.with_timezone(&Local).naive_local());
        }

        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
            .ok()
    }

    pub fn serialize<S: Serializer>(
        timestamp: &NaiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&timestamp.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp `{raw}`")))
    }
}
