//! Text rendering for CLI commands.

use std::fmt::Write;
use std::path::PathBuf;

use serde::Serialize;

use crate::record::FlightRecord;
use crate::stats::{Summary, NOT_AVAILABLE};

/// Snapshot reported by `ofl status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    /// Configuration file in effect.
    pub config_path: PathBuf,
    /// Database file.
    pub database_path: PathBuf,
    /// Schema version recorded in the database.
    pub schema_version: i32,
    /// Number of logged flights.
    pub total_flights: u64,
    /// Default export destination.
    pub export_path: PathBuf,
    /// Quote file.
    pub quotes_path: PathBuf,
}

impl StatusReport {
    /// Human-readable rendering.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "ofl status");
        let _ = writeln!(out, "----------");
        let _ = writeln!(out, "Config:         {}", self.config_path.display());
        let _ = writeln!(out, "Database:       {}", self.database_path.display());
        let _ = writeln!(out, "Schema version: {}", self.schema_version);
        let _ = writeln!(out, "Flights:        {}", self.total_flights);
        let _ = writeln!(out, "Export path:    {}", self.export_path.display());
        let _ = writeln!(out, "Quotes:         {}", self.quotes_path.display());
        out
    }
}

/// Summary statistics as aligned text.
#[must_use]
pub fn summary_text(summary: &Summary) -> String {
    let last_flight = summary
        .last_flight
        .map_or_else(|| NOT_AVAILABLE.to_string(), |d| d.to_string());
    let mut out = String::new();
    let _ = writeln!(out, "Total flights:       {}", summary.total_flights);
    let _ = writeln!(out, "Total flight time:   {}", summary.total_time_display());
    let _ = writeln!(out, "Most flown aircraft: {}", summary.most_flown_aircraft);
    let _ = writeln!(out, "Last flight:         {last_flight}");
    out
}

/// One line per flight.
#[must_use]
pub fn flights_plain(flights: &[FlightRecord]) -> String {
    let mut out = String::new();
    for flight in flights {
        let e = &flight.entry;
        let _ = write!(
            out,
            "#{} {} {} {} -> {} {}",
            flight.id,
            e.date,
            e.departure_place,
            e.departure_time.format("%H:%M"),
            e.arrival_place,
            e.arrival_time.format("%H:%M"),
        );
        if let Some(aircraft) = &e.aircraft_type {
            let _ = write!(out, " {aircraft}");
        }
        if let Some(total) = e.total_flight_time {
            let _ = write!(out, " ({total})");
        }
        out.push('\n');
    }
    out
}

/// Flights as a fixed-width table.
#[must_use]
pub fn flights_table(flights: &[FlightRecord]) -> String {
    const HEADER: [&str; 9] = [
        "ID", "Date", "From", "Dep", "To", "Arr", "Aircraft", "Total", "PIC",
    ];

    let rows: Vec<[String; 9]> = flights
        .iter()
        .map(|f| {
            let e = &f.entry;
            [
                f.id.to_string(),
                e.date.to_string(),
                e.departure_place.clone(),
                e.departure_time.format("%H:%M").to_string(),
                e.arrival_place.clone(),
                e.arrival_time.format("%H:%M").to_string(),
                e.aircraft_type.clone().unwrap_or_default(),
                e.total_flight_time.map(|t| t.to_string()).unwrap_or_default(),
                e.pilot_in_command.clone(),
            ]
        })
        .collect();

    let mut widths = HEADER.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_table_row(&mut out, &HEADER, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_table_row(&mut out, &rule, &widths);
    for row in &rows {
        push_table_row(&mut out, row, &widths);
    }
    out
}

fn push_table_row<S: AsRef<str>>(out: &mut String, cells: &[S], widths: &[usize]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{:<width$}", cell.as_ref()))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}
