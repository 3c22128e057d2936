//! Request handlers.

use axum::{
    body::Body,
    extract::{Form, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use tracing::{error, info, warn};

use super::form::FlightForm;
use super::render;
use super::AppState;
use crate::error::Error;
use crate::export::export_csv;
use crate::quotes::quote_of_the_day;
use crate::record::FlightEntry;

/// Error page response
pub type PageError = (StatusCode, Html<String>);

fn err_response(status: StatusCode, msg: impl Into<String>) -> PageError {
    let title = status.canonical_reason().unwrap_or("Error");
    (status, Html(render::error_page(title, &msg.into())))
}

/// Map a failed request to a status; the process keeps serving.
fn server_error(context: &str, err: &Error) -> PageError {
    error!("{}: {}", context, err);
    err_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{context}: {err}"))
}

/// GET /: Summary statistics and the quote of the day
pub async fn summary(State(state): State<AppState>) -> Result<Html<String>, PageError> {
    let summary = state
        .stats
        .summary()
        .await
        .map_err(|e| server_error("Failed to load statistics", &e))?;
    let today = chrono::Local::now().date_naive();
    let quote = quote_of_the_day(&state.quotes_path, today).await;
    Ok(Html(render::summary_page(&summary, &quote)))
}

/// GET /flights: All logged flights
pub async fn list_flights(State(state): State<AppState>) -> Result<Html<String>, PageError> {
    let flights = state
        .repo
        .list_all()
        .await
        .map_err(|e| server_error("Failed to load flights", &e))?;
    Ok(Html(render::flights_page(&flights)))
}

/// GET /flights/add: Blank entry form
pub async fn add_flight_form() -> Html<String> {
    Html(render::add_flight_page(None))
}

/// POST /flights/add: Store a flight, then show the list
pub async fn create_flight(
    State(state): State<AppState>,
    Form(form): Form<FlightForm>,
) -> Result<Redirect, PageError> {
    let entry = FlightEntry::try_from(form).map_err(|e| {
        if !e.is_input_error() {
            return server_error("Failed to read flight form", &e);
        }
        warn!("Rejected flight submission: {}", e);
        (
            StatusCode::BAD_REQUEST,
            Html(render::add_flight_page(Some(&e.to_string()))),
        )
    })?;

    let id = state
        .repo
        .insert(entry)
        .await
        .map_err(|e| server_error("Failed to save flight", &e))?;
    info!("Logged flight {}", id);

    Ok(Redirect::to("/flights"))
}

/// GET /export: Write the CSV export and download it
pub async fn export(State(state): State<AppState>) -> Result<Response, PageError> {
    let path = export_csv(&state.repo, &state.export_path)
        .await
        .map_err(|e| server_error("Export failed", &e))?;

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| server_error("Failed to read export file", &Error::from(e)))?;

    let filename = path
        .file_name()
        .map_or_else(|| "flights.csv".into(), |n| n.to_string_lossy());
    let disposition = format!("attachment; filename=\"{filename}\"");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from(bytes),
    )
        .into_response())
}
