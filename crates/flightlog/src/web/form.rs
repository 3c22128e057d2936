//! Binding of the add-flight form to a [`FlightEntry`].

use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;

use crate::duration::FlightTime;
use crate::error::{Error, Result};
use crate::record::{parse_time_of_day, FlightEntry};

/// Raw fields as submitted by the browser.
///
/// Every field is text; missing fields deserialize as empty strings so that
/// validation, not extraction, decides what is required.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FlightForm {
    /// Raw `date` input.
    pub date: String,
    /// Raw `departure_place` input.
    pub departure_place: String,
    /// Raw `departure_time` input.
    pub departure_time: String,
    /// Raw `arrival_place` input.
    pub arrival_place: String,
    /// Raw `arrival_time` input.
    pub arrival_time: String,
    /// Raw `aircraft_type` input.
    pub aircraft_type: String,
    /// Raw `aircraft_registration` input.
    pub aircraft_registration: String,
    /// Raw `single_pilot_time` input.
    pub single_pilot_time: String,
    /// Raw `multi_pilot_time` input.
    pub multi_pilot_time: String,
    /// Raw `total_flight_time` input.
    pub total_flight_time: String,
    /// Raw `pilot_in_command` input.
    pub pilot_in_command: String,
    /// Raw `landings_day` input.
    pub landings_day: String,
    /// Raw `landings_night` input.
    pub landings_night: String,
    /// Raw `night_time` input.
    pub night_time: String,
    /// Raw `ifr_time` input.
    pub ifr_time: String,
    /// Raw `pic_time` input.
    pub pic_time: String,
    /// Raw `copilot_time` input.
    pub copilot_time: String,
    /// Raw `dual_time` input.
    pub dual_time: String,
    /// Raw `instructor_time` input.
    pub instructor_time: String,
    /// Raw `simulator_date` input.
    pub simulator_date: String,
    /// Raw `simulator_type` input.
    pub simulator_type: String,
    /// Raw `simulator_time` input.
    pub simulator_time: String,
    /// Raw `remarks` input.
    pub remarks: String,
}

impl TryFrom<FlightForm> for FlightEntry {
    type Error = Error;

    fn try_from(form: FlightForm) -> Result<Self> {
        Ok(Self {
            date: date("date", required("date", &form.date)?)?,
            departure_place: required("departure_place", &form.departure_place)?.to_string(),
            departure_time: time("departure_time", required("departure_time", &form.departure_time)?)?,
            arrival_place: required("arrival_place", &form.arrival_place)?.to_string(),
            arrival_time: time("arrival_time", required("arrival_time", &form.arrival_time)?)?,
            aircraft_type: text(&form.aircraft_type).map(str::to_string),
            aircraft_registration: text(&form.aircraft_registration).map(|r| r.to_uppercase()),
            single_pilot_time: duration("single_pilot_time", &form.single_pilot_time)?,
            multi_pilot_time: duration("multi_pilot_time", &form.multi_pilot_time)?,
            total_flight_time: duration("total_flight_time", &form.total_flight_time)?,
            pilot_in_command: required("pilot_in_command", &form.pilot_in_command)?.to_string(),
            landings_day: count("landings_day", &form.landings_day)?,
            landings_night: count("landings_night", &form.landings_night)?,
            night_time: duration("night_time", &form.night_time)?,
            ifr_time: duration("ifr_time", &form.ifr_time)?,
            pic_time: duration("pic_time", &form.pic_time)?,
            copilot_time: duration("copilot_time", &form.copilot_time)?,
            dual_time: duration("dual_time", &form.dual_time)?,
            instructor_time: duration("instructor_time", &form.instructor_time)?,
            simulator_date: text(&form.simulator_date)
                .map(|v| date("simulator_date", v))
                .transpose()?,
            simulator_type: text(&form.simulator_type).map(str::to_string),
            simulator_time: duration("simulator_time", &form.simulator_time)?,
            remarks: text(&form.remarks).map(str::to_string),
        })
    }
}

/// Trimmed value, `None` if blank.
fn text(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str> {
    text(value).ok_or_else(|| Error::invalid_field(field, "is required"))
}

fn date(field: &'static str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| Error::invalid_field(field, format!("'{value}' is not a YYYY-MM-DD date")))
}

fn time(field: &'static str, value: &str) -> Result<NaiveTime> {
    parse_time_of_day(value)
        .map_err(|_| Error::invalid_field(field, format!("'{value}' is not a time of day")))
}

fn duration(field: &'static str, value: &str) -> Result<Option<FlightTime>> {
    text(value)
        .map(|v| {
            v.parse::<FlightTime>()
                .map_err(|_| Error::invalid_field(field, format!("'{v}' is not an HH:MM duration")))
        })
        .transpose()
}

fn count(field: &'static str, value: &str) -> Result<Option<u32>> {
    text(value)
        .map(|v| {
            v.parse::<u32>()
                .map_err(|_| Error::invalid_field(field, format!("'{v}' is not a whole number")))
        })
        .transpose()
}
