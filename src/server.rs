//! Local Events API backed by [`MemoryEventStore`], for working on the
//! calendar without the platform backend.

use std::{io, net::SocketAddr, sync::Arc};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use log::{error, info};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use crate::error::{Error, FieldErrors};
use crate::grid::DateRange;
use crate::store::{EventStore, MemoryEventStore};
use crate::structs::{wire_time, Envelope, NewEvent};

pub const EVENTS_PATH: &str = "/api/events";

type Store = Arc<MemoryEventStore>;

pub fn router(store: Store) -> Router {
    Router::new()
        .route(EVENTS_PATH, get(handle_list).post(handle_create))
        .with_state(store)
}

pub async fn serve(addr: SocketAddr, store: Store) -> io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Serving events API at http://{}{EVENTS_PATH}", listener.local_addr()?);

    axum::serve(listener, router(store))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {err}");
    }
    info!("Shutting down");
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RangeQuery {
    start_date: String,
    end_date: String,
}

async fn handle_list(State(store): State<Store>, Query(query): Query<RangeQuery>) -> Response {
    let (Some(start), Some(end)) = (
        wire_time::parse(&query.start_date),
        wire_time::parse(&query.end_date),
    ) else {
        return reply_error(
            StatusCode::BAD_REQUEST,
            "`startDate` and `endDate` must be ISO 8601 timestamps",
        );
    };

    match store.list_events(DateRange { start, end }).await {
        Ok(events) => reply(StatusCode::OK, events),
        Err(err) => reply_store_error(err),
    }
}

async fn handle_create(State(store): State<Store>, Json(event): Json<NewEvent>) -> Response {
    match store.create_event(event).await {
        Ok(created) => reply(StatusCode::CREATED, created),
        Err(err) => reply_store_error(err),
    }
}

fn reply<T: Serialize>(status: StatusCode, data: T) -> Response {
    (status, Json(Envelope::ok(data))).into_response()
}

fn reply_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(Envelope::<()>::error(message))).into_response()
}

fn reply_rejected(errors: &FieldErrors) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(Envelope::<()>::rejected(errors)),
    )
        .into_response()
}

fn reply_store_error(err: Error) -> Response {
    let status = match &err {
        Error::Validation(errors) => return reply_rejected(errors),
        Error::Network(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::Server { .. } | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    reply_error(status, err.to_string())
}
