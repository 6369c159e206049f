use chrono::{DateTime, TimeZone, Utc};
use mongodb::bson::DateTime as BsonDateTime;

pub fn chrono_to_bson(dt: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(dt.timestamp_millis())
}

pub fn bson_to_chrono(dt: BsonDateTime) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(dt.timestamp_millis())
        .single()
        .unwrap_or_default()
}

/// Human readable duration, e.g. `1h 2m 5s`.
pub fn format_duration(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0s".to_string();
    }

    let total = seconds.round() as u64;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);

    let mut parts = Vec::with_capacity(3);
    if h > 0 {
        parts.push(format!("{}h", h));
    }
    if m > 0 {
        parts.push(format!("{}m", m));
    }
    parts.push(format!("{}s", s));
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "0s");
        assert_eq!(format_duration(59.6), "1m 0s");
        assert_eq!(format_duration(3725.0), "1h 2m 5s");
        assert_eq!(format_duration(3600.0), "1h 0s");
        assert_eq!(format_duration(-3.0), "0s");
        assert_eq!(format_duration(f64::NAN), "0s");
    }

    #[test]
    fn test_bson_round_trip_keeps_millis() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(bson_to_chrono(chrono_to_bson(now)), now);
    }
}
