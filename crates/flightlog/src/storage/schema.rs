//! `SQLite` schema definitions for flightlog.
//!
//! The schema lives in `sql/schema.sql` and is embedded at compile time. A
//! deployment may point `storage.schema_path` at its own script instead.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// The schema script shipped with the crate.
pub const DEFAULT_SCHEMA: &str = include_str!("../../sql/schema.sql");

/// Columns of the `flights` table in storage order, excluding `id`.
pub const FLIGHT_COLUMNS: &[&str] = &[
    "date",
    "departure_place",
    "departure_time",
    "arrival_place",
    "arrival_time",
    "aircraft_type",
    "aircraft_registration",
    "single_pilot_minutes",
    "multi_pilot_minutes",
    "total_flight_minutes",
    "pilot_in_command",
    "landings_day",
    "landings_night",
    "night_minutes",
    "ifr_minutes",
    "pic_minutes",
    "copilot_minutes",
    "dual_minutes",
    "instructor_minutes",
    "simulator_date",
    "simulator_type",
    "simulator_minutes",
    "remarks",
];

/// Where the schema script comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SchemaSource {
    /// The script embedded in the binary.
    #[default]
    Embedded,
    /// A script file on disk.
    File(PathBuf),
}

impl SchemaSource {
    /// Build a source from an optional configured path.
    #[must_use]
    pub fn from_path(path: Option<PathBuf>) -> Self {
        path.map_or(Self::Embedded, Self::File)
    }

    /// Read the full script.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaSetup`] if the script file cannot be read or is empty.
    pub fn read(&self) -> Result<String> {
        match self {
            Self::Embedded => Ok(DEFAULT_SCHEMA.to_string()),
            Self::File(path) => {
                let script = std::fs::read_to_string(path).map_err(|e| {
                    Error::schema_setup(format!("cannot read {}: {e}", path.display()))
                })?;
                if script.trim().is_empty() {
                    return Err(Error::schema_setup(format!(
                        "schema script {} is empty",
                        path.display()
                    )));
                }
                Ok(script)
            }
        }
    }
}

/// Comma-separated column list for SELECT statements, starting with `id`.
#[must_use]
pub fn select_columns() -> String {
    let mut columns = vec!["id"];
    columns.extend_from_slice(FLIGHT_COLUMNS);
    columns.join(", ")
}
