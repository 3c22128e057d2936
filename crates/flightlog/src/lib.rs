//! `flightlog` - A personal pilot logbook
//!
//! This library stores logged flights in `SQLite`, computes the statistics
//! shown on the summary page, exports the logbook to CSV and serves it all
//! as a small web application.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod duration;
pub mod error;
pub mod export;
pub mod logging;
pub mod quotes;
pub mod record;
pub mod repository;
pub mod stats;
pub mod storage;
pub mod web;

pub use config::Config;
pub use duration::FlightTime;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use record::{FlightEntry, FlightRecord};
pub use repository::{AircraftTime, FlightRepository};
pub use stats::{StatsAggregator, Summary};
pub use storage::{SchemaSource, Store};
