//! Extraction of occupancy readings from raw page text
//!
//! The page renders six lines of the form `<label> <integer>%`. Anything
//! other than exactly six matches is a soft failure the scheduler retries;
//! the raw content is logged so upstream page changes show up in the log.

use chrono::NaiveDateTime;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::{OccupancyError, Result};
use crate::models::{OccupancyReading, LOCATIONS, LOCATION_COUNT};

/// Matches `<label> <integer>%`; labels may contain letters (including
/// Å/Ä/Ö), spaces and hyphens
const READING_PATTERN: &str = r"([A-Za-zÅÄÖåäö\s-]+)\s(\d+)%";

/// Parse one reading out of the page body text, stamped with `taken_at`.
///
/// Values are assigned to [`LOCATIONS`] positionally, in page render order;
/// the matched label text is logged but not compared. A match count other
/// than six is [`OccupancyError::ParseIncomplete`], a value that does not
/// fit an integer is [`OccupancyError::ParseValue`].
pub fn parse_reading(content: &str, taken_at: NaiveDateTime) -> Result<OccupancyReading> {
    let pattern = Regex::new(READING_PATTERN).unwrap();
    let matches: Vec<(&str, &str)> = pattern
        .captures_iter(content)
        .map(|c| {
            (
                c.get(1).map_or("", |m| m.as_str()),
                c.get(2).map_or("", |m| m.as_str()),
            )
        })
        .collect();

    if matches.len() != LOCATION_COUNT {
        warn!(
            found = matches.len(),
            content, "unexpected number of locations on page"
        );
        return Err(OccupancyError::ParseIncomplete {
            found: matches.len(),
        });
    }

    let mut levels = [0i64; LOCATION_COUNT];
    for (i, (label, value)) in matches.iter().enumerate() {
        debug!(position = i, label = label.trim(), value, "matched location");
        levels[i] = value.parse::<i64>().map_err(|e| {
            OccupancyError::ParseValue(format!(
                "occupancy value {value:?} for {}: {e}",
                LOCATIONS[i]
            ))
        })?;
    }

    Ok(OccupancyReading::new(taken_at, levels))
}

/// Current civil time at the monitored facility
pub fn facility_now() -> NaiveDateTime {
    chrono::Utc::now()
        .with_timezone(&chrono_tz::Europe::Stockholm)
        .naive_local()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    const PAGE: &str = "KTH Library 42%\nSouth-East Gallery 10%\nNorth Gallery 5%\nSouth Gallery 8%\nÅngdomen 0%\nNewton 99%";

    #[test]
    fn test_parses_six_locations() {
        let reading = parse_reading(PAGE, noon()).unwrap();
        assert_eq!(reading.levels, [42, 10, 5, 8, 0, 99]);
        assert_eq!(reading.taken_at, noon());
        assert_eq!(reading.level("Ångdomen"), Some(0));
    }

    #[test]
    fn test_tolerates_surrounding_text() {
        let page = format!("Visitors in real time\n{PAGE}\nUpdated every five minutes");
        let reading = parse_reading(&page, noon()).unwrap();
        assert_eq!(reading.levels, [42, 10, 5, 8, 0, 99]);
    }

    #[test]
    fn test_values_above_100_pass_through() {
        let page = PAGE.replace("42%", "130%");
        let reading = parse_reading(&page, noon()).unwrap();
        assert_eq!(reading.levels[0], 130);
    }

    #[test]
    fn test_too_few_matches() {
        let page = "KTH Library 42%\nNewton 99%";
        let err = parse_reading(page, noon()).unwrap_err();
        assert!(matches!(err, OccupancyError::ParseIncomplete { found: 2 }));
    }

    #[test]
    fn test_too_many_matches() {
        let page = format!("{PAGE}\nAnnex 12%");
        let err = parse_reading(&page, noon()).unwrap_err();
        assert!(matches!(err, OccupancyError::ParseIncomplete { found: 7 }));
    }

    #[test]
    fn test_empty_page() {
        let err = parse_reading("", noon()).unwrap_err();
        assert!(matches!(err, OccupancyError::ParseIncomplete { found: 0 }));
    }

    #[test]
    fn test_overflowing_value_is_a_value_error() {
        let page = PAGE.replace("42%", "99999999999999999999%");
        let err = parse_reading(&page, noon()).unwrap_err();
        assert!(matches!(err, OccupancyError::ParseValue(_)));
    }

    #[test]
    fn test_facility_now_is_recent() {
        // Stockholm is within a couple of hours of UTC year-round
        let now = facility_now();
        let utc = chrono::Utc::now().naive_utc();
        let drift = (now - utc).num_hours().abs();
        assert!(drift <= 3, "unexpected drift: {drift}h");
    }
}
