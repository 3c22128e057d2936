//! Headline numbers for the summary page.

use chrono::NaiveDate;
use serde::Serialize;

use crate::duration::FlightTime;
use crate::error::Result;
use crate::repository::FlightRepository;

/// Shown in place of the most-flown aircraft when there is none.
pub const NOT_AVAILABLE: &str = "N/A";

/// Aggregated logbook statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Number of logged flights.
    pub total_flights: u64,
    /// Cumulative total flight time.
    pub total_time: FlightTime,
    /// Aircraft type with the most flight time, or [`NOT_AVAILABLE`].
    pub most_flown_aircraft: String,
    /// Date of the most recent flight.
    pub last_flight: Option<NaiveDate>,
}

impl Summary {
    /// Total time as `Xh Ym`.
    #[must_use]
    pub fn total_time_display(&self) -> String {
        self.total_time.summary()
    }
}

/// Combines repository queries into a [`Summary`].
#[derive(Debug, Clone)]
pub struct StatsAggregator {
    repo: FlightRepository,
}

impl StatsAggregator {
    /// Create an aggregator over `repo`.
    #[must_use]
    pub fn new(repo: FlightRepository) -> Self {
        Self { repo }
    }

    /// Compute the summary.
    ///
    /// # Errors
    ///
    /// Returns the first repository error; no partial summary is produced.
    pub async fn summary(&self) -> Result<Summary> {
        let total_flights = self.repo.count().await?;
        let total_time = self.repo.total_time().await?;
        let most_flown_aircraft = self
            .repo
            .most_flown_aircraft()
            .await?
            .map_or_else(|| NOT_AVAILABLE.to_string(), |top| top.aircraft_type);
        let last_flight = self.repo.most_recent().await?.map(|f| f.entry.date);

        Ok(Summary {
            total_flights,
            total_time,
            most_flown_aircraft,
            last_flight,
        })
    }
}
