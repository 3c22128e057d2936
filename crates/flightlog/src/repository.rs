//! Typed access to the `flights` table.
//!
//! [`FlightRepository`] wraps a [`Store`] handle and exposes the only
//! operations the logbook needs: insert a flight, read them back, and the
//! aggregate queries behind the summary page.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use tracing::debug;

use crate::duration::FlightTime;
use crate::error::Result;
use crate::record::{FlightEntry, FlightRecord};
use crate::storage::schema::{select_columns, FLIGHT_COLUMNS};
use crate::storage::Store;

/// Cumulative flight time logged on one aircraft type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AircraftTime {
    /// Aircraft type label as entered.
    pub aircraft_type: String,
    /// Sum of the total flight time of its flights.
    pub total: FlightTime,
}

/// Data-access layer for logged flights.
#[derive(Debug, Clone)]
pub struct FlightRepository {
    store: Store,
}

impl FlightRepository {
    /// Create a repository over an initialized store.
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Insert a flight and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is not open or a constraint is violated.
    pub async fn insert(&self, entry: FlightEntry) -> Result<i64> {
        self.store
            .call(move |conn| {
                let id = insert_entry(conn, None, &entry)?;
                debug!("Inserted flight with id {}", id);
                Ok(id)
            })
            .await
    }

    /// Every flight, oldest insertion first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn list_all(&self) -> Result<Vec<FlightRecord>> {
        self.store
            .call(|conn| {
                let sql = format!("SELECT {} FROM flights ORDER BY id ASC", select_columns());
                let mut stmt = conn.prepare(&sql)?;
                let flights = stmt
                    .query_map([], row_to_record)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(flights)
            })
            .await
    }

    /// The flight with the latest date; the last inserted wins on equal dates.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn most_recent(&self) -> Result<Option<FlightRecord>> {
        self.store
            .call(|conn| {
                let sql = format!(
                    "SELECT {} FROM flights ORDER BY date DESC, id DESC LIMIT 1",
                    select_columns()
                );
                Ok(conn.query_row(&sql, [], row_to_record).optional()?)
            })
            .await
    }

    /// Number of logged flights.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn count(&self) -> Result<u64> {
        self.store
            .call(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM flights", [], |row| row.get(0))?;
                Ok(u64::try_from(count).unwrap_or_default())
            })
            .await
    }

    /// Cumulative total flight time; flights without one count as zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn total_time(&self) -> Result<FlightTime> {
        self.store
            .call(|conn| {
                let total: FlightTime = conn.query_row(
                    "SELECT COALESCE(SUM(total_flight_minutes), 0) FROM flights",
                    [],
                    |row| row.get(0),
                )?;
                Ok(total)
            })
            .await
    }

    /// The aircraft type with the most cumulative flight time.
    ///
    /// Only flights with both an aircraft type and a flight time count. On a
    /// tie the aircraft that was logged first wins. Returns `None` if no
    /// flight qualifies.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn most_flown_aircraft(&self) -> Result<Option<AircraftTime>> {
        self.store
            .call(|conn| {
                let top = conn
                    .query_row(
                        r"
                        SELECT aircraft_type, SUM(total_flight_minutes) AS minutes, MIN(id) AS first
                        FROM flights
                        WHERE aircraft_type IS NOT NULL AND TRIM(aircraft_type) <> ''
                          AND total_flight_minutes IS NOT NULL
                        GROUP BY aircraft_type
                        ORDER BY minutes DESC, first ASC
                        LIMIT 1
                        ",
                        [],
                        |row| {
                            Ok(AircraftTime {
                                aircraft_type: row.get(0)?,
                                total: row.get(1)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(top)
            })
            .await
    }
}

/// Insert one row, letting `SQLite` assign the id when `id` is `None`.
pub(crate) fn insert_entry(
    conn: &Connection,
    id: Option<i64>,
    entry: &FlightEntry,
) -> rusqlite::Result<i64> {
    let placeholders = (2..=FLIGHT_COLUMNS.len() + 1)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO flights (id, {}) VALUES (?1, {placeholders})",
        FLIGHT_COLUMNS.join(", ")
    );

    conn.execute(
        &sql,
        params![
            id,
            entry.date,
            entry.departure_place,
            entry.departure_time,
            entry.arrival_place,
            entry.arrival_time,
            entry.aircraft_type,
            entry.aircraft_registration,
            entry.single_pilot_time,
            entry.multi_pilot_time,
            entry.total_flight_time,
            entry.pilot_in_command,
            entry.landings_day,
            entry.landings_night,
            entry.night_time,
            entry.ifr_time,
            entry.pic_time,
            entry.copilot_time,
            entry.dual_time,
            entry.instructor_time,
            entry.simulator_date,
            entry.simulator_type,
            entry.simulator_time,
            entry.remarks,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Convert a row selected with [`select_columns`] to a record.
fn row_to_record(row: &Row<'_>) -> rusqlite::Result<FlightRecord> {
    Ok(FlightRecord {
        id: row.get("id")?,
        entry: FlightEntry {
            date: row.get("date")?,
            departure_place: row.get("departure_place")?,
            departure_time: row.get("departure_time")?,
            arrival_place: row.get("arrival_place")?,
            arrival_time: row.get("arrival_time")?,
            aircraft_type: row.get("aircraft_type")?,
            aircraft_registration: row.get("aircraft_registration")?,
            single_pilot_time: row.get("single_pilot_minutes")?,
            multi_pilot_time: row.get("multi_pilot_minutes")?,
            total_flight_time: row.get("total_flight_minutes")?,
            pilot_in_command: row.get("pilot_in_command")?,
            landings_day: row.get("landings_day")?,
            landings_night: row.get("landings_night")?,
            night_time: row.get("night_minutes")?,
            ifr_time: row.get("ifr_minutes")?,
            pic_time: row.get("pic_minutes")?,
            copilot_time: row.get("copilot_minutes")?,
            dual_time: row.get("dual_minutes")?,
            instructor_time: row.get("instructor_minutes")?,
            simulator_date: row.get("simulator_date")?,
            simulator_type: row.get("simulator_type")?,
            simulator_time: row.get("simulator_minutes")?,
            remarks: row.get("remarks")?,
        },
    })
}
