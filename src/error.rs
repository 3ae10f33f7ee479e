use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Form field an inline validation message is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Title,
    Date,
    Time,
    Duration,
    /// The submitted payload as a whole, used for rejections the server
    /// does not scope to a single field.
    Form,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Date => "date",
            Field::Time => "time",
            Field::Duration => "duration",
            Field::Form => "form",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [Field::Title, Field::Date, Field::Time, Field::Duration, Field::Form]
            .into_iter()
            .find(|field| field.as_str() == name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: Field, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.insert(field, message);
        errors
    }

    pub fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }

    /// Messages keyed by field name, as sent in an error envelope.
    pub fn to_wire(&self) -> BTreeMap<String, String> {
        self.iter()
            .map(|(field, message)| (field.to_string(), message.to_string()))
            .collect()
    }

    /// Reads a field-keyed error map. Names this form has no input for are
    /// reported under [`Field::Form`].
    pub fn from_wire(wire: BTreeMap<String, String>) -> Self {
        let mut errors = Self::new();
        for (name, message) in wire {
            match Field::from_name(&name) {
                Some(field) => errors.insert(field, message),
                None => {
                    let message = format!("{name}: {message}");
                    errors
                        .0
                        .entry(Field::Form)
                        .and_modify(|form| {
                            form.push_str("; ");
                            form.push_str(&message);
                        })
                        .or_insert(message);
                }
            }
        }
        errors
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (field, message)) in self.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid event: {0}")]
    Validation(FieldErrors),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(_) => true,
            Error::Server { status, .. } => *status >= 500 || *status == 0,
            Error::Validation(_) | Error::Config(_) => false,
        }
    }
}

impl From<FieldErrors> for Error {
    fn from(errors: FieldErrors) -> Self {
        Error::Validation(errors)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Network(err.to_string())
    }
}
