//! Occupancy data models
//!
//! One reading covers all six monitored locations of the library building.
//! Locations are identified positionally: the page renders them in a fixed
//! order and every table or document this crate produces uses that order.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Number of monitored locations on the occupancy page
pub const LOCATION_COUNT: usize = 6;

/// Location labels in the order the page renders them
pub const LOCATIONS: [&str; LOCATION_COUNT] = [
    "KTH Library",
    "South-East Gallery",
    "North Gallery",
    "South Gallery",
    "Ångdomen",
    "Newton",
];

/// Format of the text timestamp column in the history table
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One timestamped set of six occupancy percentages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyReading {
    /// Civil time at the monitored facility when the reading was taken
    pub taken_at: NaiveDateTime,
    /// Occupancy percentages in [`LOCATIONS`] order. The page may report
    /// values above 100 on a sensor glitch; they pass through unchanged.
    pub levels: [i64; LOCATION_COUNT],
}

impl OccupancyReading {
    pub fn new(taken_at: NaiveDateTime, levels: [i64; LOCATION_COUNT]) -> Self {
        Self { taken_at, levels }
    }

    /// Look up a level by location label
    pub fn level(&self, location: &str) -> Option<i64> {
        LOCATIONS
            .iter()
            .position(|l| *l == location)
            .map(|i| self.levels[i])
    }

    /// Timestamp rendered the way the history table stores it
    pub fn timestamp_text(&self) -> String {
        self.taken_at.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Convert into the document shape the live-state store serves
    pub fn live_snapshot(&self) -> LiveSnapshot {
        LiveSnapshot {
            current_occupancy: CurrentOccupancy {
                main: self.levels[0],
                south_east: self.levels[1],
                north: self.levels[2],
                south: self.levels[3],
                angdomen: self.levels[4],
                newton: self.levels[5],
            },
        }
    }
}

/// Document written to the live-state store root; holds only the most
/// recent reading and is overwritten wholesale on every publish
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveSnapshot {
    #[serde(rename = "current-occupancy")]
    pub current_occupancy: CurrentOccupancy,
}

/// Fixed short keys the live consumers read, in [`LOCATIONS`] order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentOccupancy {
    pub main: i64,
    pub south_east: i64,
    pub north: i64,
    pub south: i64,
    pub angdomen: i64,
    pub newton: i64,
}
