use chrono::{DateTime, NaiveDate, NaiveTime, Timelike};
use thiserror::Error;

/// A bookable instant is the pair (date, canonical "HH:MM" string). Slots are
/// matched exactly — no duration-aware overlap detection.

#[derive(Debug, Error)]
pub enum SlotParseError {
    #[error("date must be YYYY-MM-DD or an RFC 3339 timestamp, got {0:?}")]
    BadDate(String),
    #[error("time must be HH:MM or HH:MM:SS, got {0:?}")]
    BadTime(String),
}

/// Parse a submitted date, truncating any time component to the date part.
/// `2025-06-10` and `2025-06-10T00:00:00.000Z` normalize to the same day.
pub fn normalize_date(raw: &str) -> Result<NaiveDate, SlotParseError> {
    let raw = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(d);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.date_naive());
    }
    Err(SlotParseError::BadDate(raw.to_string()))
}

/// Canonicalize a submitted time to zero-padded "HH:MM", dropping seconds.
/// "9:5", "09:05" and "09:05:30" all name the 09:05 slot.
pub fn normalize_time(raw: &str) -> Result<String, SlotParseError> {
    let raw = raw.trim();
    let bad = || SlotParseError::BadTime(raw.to_string());

    let parts: Vec<&str> = raw.split(':').collect();
    if parts.len() != 2 && parts.len() != 3 {
        return Err(bad());
    }
    let hour: u32 = parts[0].parse().map_err(|_| bad())?;
    let minute: u32 = parts[1].parse().map_err(|_| bad())?;
    if parts.len() == 3 {
        let _seconds: u32 = parts[2].parse().map_err(|_| bad())?;
    }
    if hour > 23 || minute > 59 {
        return Err(bad());
    }
    Ok(format!("{hour:02}:{minute:02}"))
}

/// Canonical "HH:MM" of a wall-clock time, for minute-precision comparison
/// against stored slot strings.
pub fn canonical_minute(t: NaiveTime) -> String {
    format!("{:02}:{:02}", t.hour(), t.minute())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_only_parses() {
        assert_eq!(
            normalize_date("2025-06-10").unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
        );
    }

    #[test]
    fn timestamp_truncates_to_date() {
        let plain = normalize_date("2025-06-10").unwrap();
        let stamped = normalize_date("2025-06-10T00:00:00.000Z").unwrap();
        assert_eq!(plain, stamped);

        let offset = normalize_date("2025-06-10T18:30:00+02:00").unwrap();
        assert_eq!(plain, offset);
    }

    #[test]
    fn garbage_date_rejected() {
        assert!(normalize_date("next tuesday").is_err());
        assert!(normalize_date("2025-13-01").is_err());
        assert!(normalize_date("").is_err());
    }

    #[test]
    fn times_canonicalize_to_padded_minutes() {
        assert_eq!(normalize_time("9:5").unwrap(), "09:05");
        assert_eq!(normalize_time("09:05").unwrap(), "09:05");
        assert_eq!(normalize_time("09:05:30").unwrap(), "09:05");
        assert_eq!(normalize_time("23:59").unwrap(), "23:59");
    }

    #[test]
    fn out_of_range_times_rejected() {
        assert!(normalize_time("24:00").is_err());
        assert!(normalize_time("12:60").is_err());
        assert!(normalize_time("12").is_err());
        assert!(normalize_time("12:00:00:00").is_err());
        assert!(normalize_time("noon").is_err());
    }

    #[test]
    fn canonical_minute_drops_seconds() {
        let t = NaiveTime::from_hms_opt(7, 3, 59).unwrap();
        assert_eq!(canonical_minute(t), "07:03");
    }
}
