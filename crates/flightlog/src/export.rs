//! CSV export of the whole logbook.

use std::fmt::Display;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{Error, Result};
use crate::record::FlightRecord;
use crate::repository::FlightRepository;
use crate::storage::schema::FLIGHT_COLUMNS;

/// Render records as CSV with a header row of column names.
///
/// Durations are written as `HH:MM`, absent values as empty fields.
#[must_use]
pub fn to_csv(records: &[FlightRecord]) -> String {
    let mut out = String::new();
    push_row(&mut out, std::iter::once("id").chain(FLIGHT_COLUMNS.iter().copied()));

    for record in records {
        let e = &record.entry;
        let fields = [
            record.id.to_string(),
            e.date.format("%Y-%m-%d").to_string(),
            e.departure_place.clone(),
            e.departure_time.format("%H:%M").to_string(),
            e.arrival_place.clone(),
            e.arrival_time.format("%H:%M").to_string(),
            opt(e.aircraft_type.as_ref()),
            opt(e.aircraft_registration.as_ref()),
            opt(e.single_pilot_time.as_ref()),
            opt(e.multi_pilot_time.as_ref()),
            opt(e.total_flight_time.as_ref()),
            e.pilot_in_command.clone(),
            opt(e.landings_day.as_ref()),
            opt(e.landings_night.as_ref()),
            opt(e.night_time.as_ref()),
            opt(e.ifr_time.as_ref()),
            opt(e.pic_time.as_ref()),
            opt(e.copilot_time.as_ref()),
            opt(e.dual_time.as_ref()),
            opt(e.instructor_time.as_ref()),
            opt(e.simulator_date.as_ref()),
            opt(e.simulator_type.as_ref()),
            opt(e.simulator_time.as_ref()),
            opt(e.remarks.as_ref()),
        ];
        push_row(&mut out, fields.iter().map(String::as_str));
    }
    out
}

/// Write every flight to `path` as CSV and return the path.
///
/// The parent directory is created if needed.
///
/// # Errors
///
/// Returns an error if the flights cannot be read or the file cannot be written.
pub async fn export_csv(repo: &FlightRepository, path: &Path) -> Result<PathBuf> {
    let records = repo.list_all().await?;
    let csv = to_csv(&records);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
    }
    tokio::fs::write(path, csv).await?;

    info!("Exported {} flights to {}", records.len(), path.display());
    Ok(path.to_path_buf())
}

fn opt<T: Display>(value: Option<&T>) -> String {
    value.map(ToString::to_string).unwrap_or_default()
}

fn push_row<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.push(',');
        }
        push_field(out, field);
    }
    out.push_str("\r\n");
}

/// Quote a field if it contains a separator, quote or line break.
fn push_field(out: &mut String, field: &str) {
    if field.contains([',', '"', '\n', '\r']) {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}
