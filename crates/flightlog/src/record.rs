//! Core logbook record types.
//!
//! A [`FlightEntry`] holds everything a pilot enters for one flight or
//! simulator session. Once stored it becomes a [`FlightRecord`], which adds
//! the identifier assigned by the storage layer.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::duration::FlightTime;
use crate::error::{Error, Result};

/// The fields of one logged flight or simulator session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightEntry {
    /// Date of the flight.
    pub date: NaiveDate,
    /// Departure aerodrome or place.
    pub departure_place: String,
    /// Off-block time.
    pub departure_time: NaiveTime,
    /// Arrival aerodrome or place.
    pub arrival_place: String,
    /// On-block time.
    pub arrival_time: NaiveTime,

    /// Aircraft make and model.
    pub aircraft_type: Option<String>,
    /// Aircraft registration.
    pub aircraft_registration: Option<String>,
    /// Single-pilot time.
    pub single_pilot_time: Option<FlightTime>,
    /// Multi-pilot time.
    pub multi_pilot_time: Option<FlightTime>,
    /// Total time of flight.
    pub total_flight_time: Option<FlightTime>,

    /// Name of the pilot-in-command.
    pub pilot_in_command: String,
    /// Day landings.
    pub landings_day: Option<u32>,
    /// Night landings.
    pub landings_night: Option<u32>,

    /// Night operational condition time.
    pub night_time: Option<FlightTime>,
    /// IFR operational condition time.
    pub ifr_time: Option<FlightTime>,
    /// Pilot-in-command function time.
    pub pic_time: Option<FlightTime>,
    /// Co-pilot function time.
    pub copilot_time: Option<FlightTime>,
    /// Dual instruction time.
    pub dual_time: Option<FlightTime>,
    /// Instructor function time.
    pub instructor_time: Option<FlightTime>,

    /// Date of the simulator session.
    pub simulator_date: Option<NaiveDate>,
    /// Type of simulator device.
    pub simulator_type: Option<String>,
    /// Simulator session time.
    pub simulator_time: Option<FlightTime>,

    /// Free-text remarks and endorsements.
    pub remarks: Option<String>,
}

impl FlightEntry {
    /// Create an entry with only the required fields set.
    #[must_use]
    pub fn new(
        date: NaiveDate,
        departure: (impl Into<String>, NaiveTime),
        arrival: (impl Into<String>, NaiveTime),
        pilot_in_command: impl Into<String>,
    ) -> Self {
        Self {
            date,
            departure_place: departure.0.into(),
            departure_time: departure.1,
            arrival_place: arrival.0.into(),
            arrival_time: arrival.1,
            aircraft_type: None,
            aircraft_registration: None,
            single_pilot_time: None,
            multi_pilot_time: None,
            total_flight_time: None,
            pilot_in_command: pilot_in_command.into(),
            landings_day: None,
            landings_night: None,
            night_time: None,
            ifr_time: None,
            pic_time: None,
            copilot_time: None,
            dual_time: None,
            instructor_time: None,
            simulator_date: None,
            simulator_type: None,
            simulator_time: None,
            remarks: None,
        }
    }

    /// Set the aircraft type and total flight time.
    #[must_use]
    pub fn with_aircraft(mut self, aircraft_type: impl Into<String>, total: FlightTime) -> Self {
        self.aircraft_type = Some(aircraft_type.into());
        self.total_flight_time = Some(total);
        self
    }
}

/// A stored flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightRecord {
    /// Identifier assigned on insert, increasing with insertion order.
    pub id: i64,
    /// The logged fields.
    #[serde(flatten)]
    pub entry: FlightEntry,
}

/// Parse a time of day written as `HH:MM`, `HH:MM:SS` or `HHMM`.
///
/// Shorter digit strings are left-padded, so `930` is `09:30` and `30` is
/// `00:30`.
///
/// # Errors
///
/// Returns [`Error::InvalidField`] if the value is not a valid time.
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime> {
    let value = value.trim();
    let invalid = || Error::invalid_field("time", format!("'{value}' is not a time of day"));

    if value.contains(':') {
        return NaiveTime::parse_from_str(value, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
            .map_err(|_| invalid());
    }

    if !(1..=4).contains(&value.len()) || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let padded = format!("{value:0>4}");
    let hours: u32 = padded[..2].parse().map_err(|_| invalid())?;
    let minutes: u32 = padded[2..].parse().map_err(|_| invalid())?;
    NaiveTime::from_hms_opt(hours, minutes, 0).ok_or_else(invalid)
}
