use chrono::{DateTime, TimeZone, Utc};

/// Current wall-clock instant, used to stamp election updates.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// The zero timestamp carried by vehicles that never received a vote.
pub fn epoch() -> DateTime<Utc> {
    Utc.timestamp_nanos(0)
}

/// Nanoseconds since the UNIX epoch, saturating outside the `i64` range.
pub fn to_nanos(time: DateTime<Utc>) -> i64 {
    time.timestamp_nanos_opt().unwrap_or(i64::MAX)
}

pub fn from_nanos(nanos: i64) -> DateTime<Utc> {
    Utc.timestamp_nanos(nanos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_is_zero() {
        assert_eq!(to_nanos(epoch()), 0);
    }

    #[test]
    fn test_nanos_round_trip_keeps_ordering() {
        let t1 = now();
        let t2 = from_nanos(to_nanos(t1) + 1);
        assert!(t2 > t1);
        assert_eq!(from_nanos(to_nanos(t1)), t1);
    }

    #[test]
    fn test_now_is_after_epoch() {
        assert!(now() > epoch(), "Wall clock should be past the UNIX epoch");
    }
}
