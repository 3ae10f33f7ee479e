use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use super::EventStore;
use crate::config::Config;
use crate::error::{Error, Field, FieldErrors, Result};
use crate::grid::DateRange;
use crate::structs::{wire_time, CalendarEvent, Envelope, NewEvent};

/// Client for the REST Events API.
#[derive(Debug, Clone)]
pub struct HttpEventStore {
    client: Client,
    events_url: String,
}

impl HttpEventStore {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| Error::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            events_url: format!("{}/events", config.api_url.trim_end_matches('/')),
        })
    }

    pub fn events_url(&self) -> &str {
        &self.events_url
    }
}

#[async_trait]
impl EventStore for HttpEventStore {
    async fn list_events(&self, range: DateRange) -> Result<Vec<CalendarEvent>> {
        let url = Url::parse_with_params(
            &self.events_url,
            &[
                ("startDate", wire_time::format(&range.start)),
                ("endDate", wire_time::format(&range.end)),
            ],
        )
        .map_err(|err| Error::Config(format!("invalid events URL: {err}")))?;

        debug!("GET {url}");
        let response = self.client.get(url).send().await?;
        read_envelope(response).await
    }

    async fn create_event(&self, event: NewEvent) -> Result<CalendarEvent> {
        debug!("POST {} ({})", self.events_url, event.title);
        let response = self
            .client
            .post(&self.events_url)
            .json(&event)
            .send()
            .await?;
        read_envelope(response).await
    }
}

async fn read_envelope<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let (message, errors) = match serde_json::from_str::<Envelope<serde_json::Value>>(&body) {
            Ok(envelope) => (envelope.message, envelope.errors),
            Err(_) => (None, None),
        };
        let message = message
            .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

        warn!("Events API answered {status}: {message}");

        return Err(match status {
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                match errors.map(FieldErrors::from_wire) {
                    Some(errors) if !errors.is_empty() => Error::Validation(errors),
                    _ => Error::Validation(FieldErrors::single(Field::Form, message)),
                }
            }
            _ => Error::Server {
                status: status.as_u16(),
                message,
            },
        });
    }

    let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|err| Error::Server {
        status: status.as_u16(),
        message: format!("malformed response: {err}"),
    })?;

    match envelope {
        Envelope {
            success: true,
            data: Some(data),
            ..
        } => Ok(data),
        Envelope { message, .. } => Err(Error::Server {
            status: status.as_u16(),
            message: message.unwrap_or_else(|| "request was not successful".to_string()),
        }),
    }
}
