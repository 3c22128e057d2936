//! Database migration system for flightlog.
//!
//! Tracks the schema version in the `metadata` table. Version 1 is the minute
//! based `flights` table. Databases written by earlier releases have no
//! `metadata` table and store each duration either as an hours/minutes pair
//! of integer columns or as a single `HH:MM` text column; migration 1 rewrites
//! such a table in place, keeping every flight id.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{Connection, Row};
use tracing::{info, warn};

use crate::duration::FlightTime;
use crate::error::{Error, Result};
use crate::record::{parse_time_of_day, FlightEntry};
use crate::repository::insert_entry;

use super::schema::DEFAULT_SCHEMA;

/// The current schema version.
pub const CURRENT_VERSION: i32 = 1;

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// Bring the schema up to [`CURRENT_VERSION`].
///
/// # Errors
///
/// Returns an error if the recorded version is unknown or a migration fails.
pub fn run(conn: &Connection) -> Result<()> {
    conn.execute(CREATE_METADATA_TABLE, [])?;

    let version = schema_version(conn)?;
    if version > CURRENT_VERSION {
        return Err(Error::migration(format!(
            "database schema version {version} is newer than supported version {CURRENT_VERSION}"
        )));
    }
    if version < CURRENT_VERSION {
        run_migrations(conn, version)?;
    }
    Ok(())
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (fresh or legacy database).
///
/// # Errors
///
/// Returns an error if the stored version is not a number.
pub fn schema_version(conn: &Connection) -> Result<i32> {
    let result: std::result::Result<String, rusqlite::Error> = conn.query_row(
        "SELECT value FROM metadata WHERE key = ?1",
        [VERSION_KEY],
        |row| row.get(0),
    );

    match result {
        Ok(value) => value
            .parse()
            .map_err(|_| Error::migration(format!("invalid schema version: {value}"))),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e.into()),
    }
}

/// Set the schema version in the database.
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}

/// Run migrations from the given version to the current version.
fn run_migrations(conn: &Connection, from_version: i32) -> Result<()> {
    let mut current = from_version;

    while current < CURRENT_VERSION {
        current += 1;
        run_migration(conn, current)?;
    }

    set_schema_version(conn, CURRENT_VERSION)?;
    Ok(())
}

/// Run a specific migration version.
fn run_migration(conn: &Connection, version: i32) -> Result<()> {
    match version {
        1 => migrate_v1(conn),
        _ => Err(Error::migration(format!(
            "unknown migration version: {version}"
        ))),
    }
}

/// Migration to version 1: convert a legacy flights table to minute columns.
///
/// Does nothing when there is no flights table or it already has the
/// current layout.
fn migrate_v1(conn: &Connection) -> Result<()> {
    let columns = table_columns(conn, "flights")?;
    if !columns.contains("dept_place") {
        return Ok(());
    }

    info!("Converting legacy flights table to minute durations");
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch("ALTER TABLE flights RENAME TO flights_legacy;")?;
    tx.execute_batch(DEFAULT_SCHEMA)?;

    let converted = copy_legacy_rows(&tx)?;

    tx.execute_batch("DROP TABLE flights_legacy;")?;
    set_schema_version(&tx, 1)?;
    tx.commit()?;

    info!("Converted {} legacy flights", converted);
    Ok(())
}

/// Names of the columns of `table`, empty if the table does not exist.
fn table_columns(conn: &Connection, table: &str) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
    let columns = stmt
        .query_map([table], |row| row.get(0))?
        .collect::<std::result::Result<HashSet<String>, _>>()?;
    Ok(columns)
}

fn copy_legacy_rows(conn: &Connection) -> Result<usize> {
    let mut stmt = conn.prepare("SELECT rowid, * FROM flights_legacy ORDER BY rowid")?;
    let names: Vec<String> = stmt
        .column_names()
        .into_iter()
        .skip(1)
        .map(str::to_string)
        .collect();

    let mut rows = stmt.query([])?;
    let mut converted = 0;
    while let Some(row) = rows.next()? {
        let legacy = LegacyRow::read(row, &names)?;
        let entry = legacy.to_entry()?;
        insert_entry(conn, Some(legacy.id), &entry)?;
        converted += 1;
    }
    Ok(converted)
}

/// Where a legacy database kept one duration.
#[derive(Debug, Clone, Copy)]
struct LegacyDuration {
    /// `HH:MM` text column.
    text: &'static str,
    /// Integer hours column.
    hours: &'static str,
    /// Integer minutes column.
    minutes: &'static str,
}

const fn legacy(text: &'static str, hours: &'static str, minutes: &'static str) -> LegacyDuration {
    LegacyDuration {
        text,
        hours,
        minutes,
    }
}

const SINGLE_PILOT: LegacyDuration = legacy(
    "single_pilot_time",
    "single_pilot_time_hrs",
    "single_pilot_time_min",
);
const MULTI_PILOT: LegacyDuration = legacy(
    "multi_pilot_time",
    "multi_pilot_time_hrs",
    "multi_pilot_time_min",
);
const TOTAL_FLIGHT: LegacyDuration = legacy(
    "total_flight_time",
    "total_flight_time_hrs",
    "total_flight_time_min",
);
const NIGHT: LegacyDuration = legacy("oct_night", "oct_night_hrs", "oct_night_min");
const IFR: LegacyDuration = legacy("oct_ifr", "oct_ifr_hrs", "oct_ifr_mins");
const PIC: LegacyDuration = legacy("pft_pic", "pft_pic_hrs", "pft_pic_min");
const COPILOT: LegacyDuration = legacy("pft_copilot", "pft_copilot_hrs", "pft_copilot_min");
const DUAL: LegacyDuration = legacy("pft_dual", "pft_dual_hrs", "pft_dual_min");
const INSTRUCTOR: LegacyDuration = legacy(
    "pft_instructor",
    "pft_instructor_hrs",
    "pft_instructor_min",
);
const SIMULATOR: LegacyDuration = legacy(
    "fstd_total_time_sess",
    "fstd_total_time_sess_hrs",
    "fstd_total_time_sess_min",
);

/// One row of a legacy flights table, keyed by column name.
#[derive(Debug)]
struct LegacyRow {
    id: i64,
    values: HashMap<String, Value>,
}

impl LegacyRow {
    fn read(row: &Row<'_>, names: &[String]) -> Result<Self> {
        let id: i64 = row.get(0)?;
        let mut values = HashMap::with_capacity(names.len());
        for (index, name) in names.iter().enumerate() {
            values.insert(name.clone(), row.get::<_, Value>(index + 1)?);
        }
        Ok(Self { id, values })
    }

    fn to_entry(&self) -> Result<FlightEntry> {
        Ok(FlightEntry {
            date: self.required("date", |s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())?,
            departure_place: self.required("dept_place", |s| Some(s.to_string()))?,
            departure_time: self.required("dept_time", |s| parse_time_of_day(s).ok())?,
            arrival_place: self.required("arrv_place", |s| Some(s.to_string()))?,
            arrival_time: self.required("arrv_time", |s| parse_time_of_day(s).ok())?,
            aircraft_type: self.text("aircraft_type"),
            aircraft_registration: self.text("aircraft_registration").map(|s| s.to_uppercase()),
            single_pilot_time: self.duration(SINGLE_PILOT),
            multi_pilot_time: self.duration(MULTI_PILOT),
            total_flight_time: self.duration(TOTAL_FLIGHT),
            pilot_in_command: self.required("pilot_in_command", |s| Some(s.to_string()))?,
            landings_day: self.count("landings_day"),
            landings_night: self.count("landings_night"),
            night_time: self.duration(NIGHT),
            ifr_time: self.duration(IFR),
            pic_time: self.duration(PIC),
            copilot_time: self.duration(COPILOT),
            dual_time: self.duration(DUAL),
            instructor_time: self.duration(INSTRUCTOR),
            simulator_date: self
                .text("fstd_date")
                .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            simulator_type: self.text("fstd_type"),
            simulator_time: self.duration(SIMULATOR),
            remarks: self.text("remarks"),
        })
    }

    fn required<T>(&self, column: &str, parse: impl Fn(&str) -> Option<T>) -> Result<T> {
        self.text(column)
            .and_then(|s| parse(s.as_str()))
            .ok_or_else(|| {
                Error::migration(format!(
                    "legacy flight {} has no valid {column}",
                    self.id
                ))
            })
    }

    /// Non-blank value as text.
    fn text(&self, column: &str) -> Option<String> {
        match self.values.get(column)? {
            Value::Text(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Real(f) => Some(f.to_string()),
            _ => None,
        }
    }

    fn integer(&self, column: &str) -> Option<i64> {
        match self.values.get(column)? {
            Value::Integer(i) => Some(*i),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn count(&self, column: &str) -> Option<u32> {
        self.integer(column).and_then(|n| u32::try_from(n).ok())
    }

    /// Read a duration from whichever representation the row carries.
    ///
    /// Unparseable or negative values become `None`.
    fn duration(&self, columns: LegacyDuration) -> Option<FlightTime> {
        let hours = self.integer(columns.hours);
        let minutes = self.integer(columns.minutes);
        if hours.is_some() || minutes.is_some() {
            let hours = u32::try_from(hours.unwrap_or(0)).ok()?;
            let minutes = u32::try_from(minutes.unwrap_or(0)).ok()?;
            return Some(FlightTime::from_hours_minutes(hours, minutes));
        }

        let text = self.text(columns.text)?;
        match text.parse() {
            Ok(time) => Some(time),
            Err(_) => {
                warn!(
                    "Dropping malformed {} '{}' on legacy flight {}",
                    columns.text, text, self.id
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_db() -> Connection {
        Connection::open_in_memory().expect("failed to create in-memory database")
    }

    const LEGACY_SPLIT_TABLE: &str = r"
        CREATE TABLE flights (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL,
            dept_place TEXT NOT NULL,
            dept_time INTEGER NOT NULL,
            arrv_place TEXT NOT NULL,
            arrv_time INTEGER NOT NULL,
            aircraft_type TEXT,
            aircraft_registration TEXT,
            single_pilot_time TEXT,
            multi_pilot_time_hrs INTEGER,
            multi_pilot_time_min INTEGER,
            total_flight_time_hrs INTEGER,
            total_flight_time_min INTEGER,
            pilot_in_command TEXT NOT NULL,
            landings_day INTEGER,
            landings_night INTEGER,
            oct_ifr_hrs INTEGER,
            oct_ifr_mins INTEGER,
            remarks TEXT
        );
    ";

    const LEGACY_TEXT_TABLE: &str = r"
        CREATE TABLE flights (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL,
            dept_place TEXT NOT NULL,
            dept_time TEXT NOT NULL,
            arrv_place TEXT NOT NULL,
            arrv_time TEXT NOT NULL,
            aircraft_type TEXT,
            aircraft_registration TEXT,
            single_pilot_time TEXT,
            multi_pilot_time TEXT,
            total_flight_time TEXT,
            pilot_in_command TEXT NOT NULL,
            landings_day INTEGER,
            landings_night INTEGER,
            oct_ifr TEXT,
            fstd_date TEXT,
            fstd_type TEXT,
            fstd_total_time_sess TEXT,
            remarks TEXT
        );
    ";

    fn total_minutes(conn: &Connection) -> i64 {
        conn.query_row(
            "SELECT COALESCE(SUM(total_flight_minutes), 0) FROM flights",
            [],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_run_on_fresh_database() {
        let conn = create_test_db();
        conn.execute_batch(DEFAULT_SCHEMA).unwrap();
        run(&conn).unwrap();

        assert_eq!(schema_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_run_is_idempotent() {
        let conn = create_test_db();
        conn.execute_batch(DEFAULT_SCHEMA).unwrap();

        run(&conn).expect("first run failed");
        run(&conn).expect("second run failed");

        assert_eq!(schema_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_run_without_flights_table() {
        let conn = create_test_db();
        run(&conn).unwrap();

        assert_eq!(schema_version(&conn).unwrap(), CURRENT_VERSION);
        assert!(table_columns(&conn, "flights").unwrap().is_empty());
    }

    #[test]
    fn test_get_schema_version_fresh_db() {
        let conn = create_test_db();
        conn.execute(CREATE_METADATA_TABLE, []).unwrap();

        assert_eq!(schema_version(&conn).unwrap(), 0);
    }

    #[test]
    fn test_set_and_get_schema_version() {
        let conn = create_test_db();
        conn.execute(CREATE_METADATA_TABLE, []).unwrap();

        set_schema_version(&conn, 42).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 42);
    }

    #[test]
    fn test_newer_database_is_rejected() {
        let conn = create_test_db();
        conn.execute(CREATE_METADATA_TABLE, []).unwrap();
        set_schema_version(&conn, CURRENT_VERSION + 1).unwrap();

        let err = run(&conn).unwrap_err();
        assert!(err.is_setup_error());
        assert!(err.to_string().contains("newer than supported"));
    }

    #[test]
    fn test_invalid_version_value() {
        let conn = create_test_db();
        conn.execute(CREATE_METADATA_TABLE, []).unwrap();
        conn.execute(
            "INSERT INTO metadata (key, value) VALUES ('schema_version', 'one')",
            [],
        )
        .unwrap();

        let err = schema_version(&conn).unwrap_err();
        assert!(err.to_string().contains("invalid schema version"));
    }

    #[test]
    fn test_run_migration_unknown_version() {
        let conn = create_test_db();
        run(&conn).unwrap();

        let err = run_migration(&conn, 999).unwrap_err();
        assert!(err.to_string().contains("unknown migration version"));
    }

    #[test]
    fn test_migrate_split_columns() {
        let conn = create_test_db();
        conn.execute_batch(LEGACY_SPLIT_TABLE).unwrap();
        conn.execute_batch(
            r"
            INSERT INTO flights (id, date, dept_place, dept_time, arrv_place, arrv_time,
                aircraft_type, aircraft_registration, total_flight_time_hrs, total_flight_time_min,
                pilot_in_command, landings_day, oct_ifr_hrs, oct_ifr_mins)
            VALUES (4, '2024-06-01', 'LOWI', 930, 'LOWS', 1045, 'C172', 'd-ejoe', 1, 90,
                'SELF', 2, 0, 20);
            INSERT INTO flights (id, date, dept_place, dept_time, arrv_place, arrv_time,
                pilot_in_command, total_flight_time_min)
            VALUES (9, '2024-06-02', 'LOWS', 800, 'LOWI', 845, 'SELF', 45);
            ",
        )
        .unwrap();

        run(&conn).unwrap();

        assert_eq!(schema_version(&conn).unwrap(), CURRENT_VERSION);
        assert_eq!(total_minutes(&conn), 150 + 45);

        let (registration, departure, ifr): (String, String, i64) = conn
            .query_row(
                "SELECT aircraft_registration, departure_time, ifr_minutes FROM flights WHERE id = 4",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(registration, "D-EJOE");
        assert!(departure.starts_with("09:30"));
        assert_eq!(ifr, 20);

        assert!(table_columns(&conn, "flights_legacy").unwrap().is_empty());
    }

    #[test]
    fn test_migrate_midnight_hour_integer_times() {
        let conn = create_test_db();
        conn.execute_batch(LEGACY_SPLIT_TABLE).unwrap();
        conn.execute_batch(
            r"
            INSERT INTO flights (id, date, dept_place, dept_time, arrv_place, arrv_time,
                pilot_in_command, total_flight_time_hrs, total_flight_time_min)
            VALUES (1, '2024-06-03', 'LOWW', 30, 'LOWL', 115, 'SELF', 0, 45);
            INSERT INTO flights (id, date, dept_place, dept_time, arrv_place, arrv_time,
                pilot_in_command)
            VALUES (2, '2024-06-04', 'LOWL', 5, 'LOWW', 0, 'SELF');
            ",
        )
        .unwrap();

        run(&conn).unwrap();

        let times = |id: i64| -> (String, String) {
            conn.query_row(
                "SELECT departure_time, arrival_time FROM flights WHERE id = ?1",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap()
        };
        let (departure, arrival) = times(1);
        assert!(departure.starts_with("00:30"), "departure {departure}");
        assert!(arrival.starts_with("01:15"), "arrival {arrival}");
        let (departure, arrival) = times(2);
        assert!(departure.starts_with("00:05"), "departure {departure}");
        assert!(arrival.starts_with("00:00"), "arrival {arrival}");
        assert_eq!(total_minutes(&conn), 45);
    }

    #[test]
    fn test_migrate_text_columns_tolerates_malformed_values() {
        let conn = create_test_db();
        conn.execute_batch(LEGACY_TEXT_TABLE).unwrap();
        conn.execute_batch(
            r"
            INSERT INTO flights (date, dept_place, dept_time, arrv_place, arrv_time,
                aircraft_type, total_flight_time, pilot_in_command, fstd_date, fstd_type,
                fstd_total_time_sess)
            VALUES ('2024-07-01', 'EDDF', '06:10', 'EGLL', '07:40', 'A320', '2:30', 'Smith',
                '2024-07-03', 'FFS', '4:00');
            INSERT INTO flights (date, dept_place, dept_time, arrv_place, arrv_time,
                aircraft_type, total_flight_time, pilot_in_command)
            VALUES ('2024-07-02', 'EGLL', '0900', 'EDDF', '1030', 'A320', 'abc', 'Smith');
            INSERT INTO flights (date, dept_place, dept_time, arrv_place, arrv_time,
                total_flight_time, pilot_in_command)
            VALUES ('2024-07-05', 'EDDF', '12:00', 'EDDM', '13:00', '', 'Smith');
            ",
        )
        .unwrap();

        run(&conn).unwrap();

        assert_eq!(total_minutes(&conn), 150);
        let nulls: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM flights WHERE total_flight_minutes IS NULL",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(nulls, 2);

        let (sim_type, sim_minutes): (String, i64) = conn
            .query_row(
                "SELECT simulator_type, simulator_minutes FROM flights WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(sim_type, "FFS");
        assert_eq!(sim_minutes, 240);
    }

    #[test]
    fn test_split_and_text_legacy_agree() {
        let split = create_test_db();
        split.execute_batch(LEGACY_SPLIT_TABLE).unwrap();
        split
            .execute(
                "INSERT INTO flights (date, dept_place, dept_time, arrv_place, arrv_time, \
                 pilot_in_command, total_flight_time_hrs, total_flight_time_min) \
                 VALUES ('2024-01-01', 'A', 1000, 'B', 1230, 'SELF', 1, 90)",
                [],
            )
            .unwrap();

        let text = create_test_db();
        text.execute_batch(LEGACY_TEXT_TABLE).unwrap();
        text.execute(
            "INSERT INTO flights (date, dept_place, dept_time, arrv_place, arrv_time, \
             pilot_in_command, total_flight_time) \
             VALUES ('2024-01-01', 'A', '10:00', 'B', '12:30', 'SELF', '2:30')",
            [],
        )
        .unwrap();

        run(&split).unwrap();
        run(&text).unwrap();

        assert_eq!(total_minutes(&split), total_minutes(&text));
        assert_eq!(total_minutes(&text), 150);
    }

    #[test]
    fn test_migration_failure_leaves_legacy_table_untouched() {
        let conn = create_test_db();
        conn.execute_batch(LEGACY_TEXT_TABLE).unwrap();
        conn.execute(
            "INSERT INTO flights (date, dept_place, dept_time, arrv_place, arrv_time, \
             pilot_in_command) VALUES ('not a date', 'A', '10:00', 'B', '11:00', 'SELF')",
            [],
        )
        .unwrap();

        let err = run(&conn).unwrap_err();
        assert!(err.to_string().contains("legacy flight 1 has no valid date"));

        assert!(table_columns(&conn, "flights").unwrap().contains("dept_place"));
        assert!(table_columns(&conn, "flights_legacy").unwrap().is_empty());
        assert_eq!(schema_version(&conn).unwrap(), 0);
    }
}
