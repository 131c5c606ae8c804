use std::fmt;
use std::ops::Add;
use std::str::FromStr;

use jiff::SignedDuration;
use serde::{Deserialize, Serialize};

use crate::error::TransitError;

const SECONDS_PER_DAY: i64 = 86_400;

/// A wall-clock time on a service day, stored as seconds since the service
/// day's midnight.
///
/// Timetables use the service-day convention: a trip departing after midnight
/// still belongs to the previous day's service and is written with an hour
/// value of 24 or more (`25:30:00` is 01:30 on the next calendar day).
/// Keeping the raw seconds makes ordering and duration arithmetic correct
/// across midnight without any date handling.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(try_from = "String", into = "String")]
pub struct ServiceTime(i64);

impl ServiceTime {
    pub fn from_hms(hours: i64, minutes: i64, seconds: i64) -> Self {
        ServiceTime(hours * 3600 + minutes * 60 + seconds)
    }

    pub const fn seconds(&self) -> i64 {
        self.0
    }

    /// Number of whole calendar days past the service day's midnight.
    pub const fn day_offset(&self) -> i64 {
        self.0.div_euclid(SECONDS_PER_DAY)
    }

    /// The normalized clock time, with the day offset folded away.
    pub fn clock(&self) -> jiff::civil::Time {
        let secs = self.0.rem_euclid(SECONDS_PER_DAY);
        jiff::civil::Time::new(
            (secs / 3600) as i8,
            ((secs % 3600) / 60) as i8,
            (secs % 60) as i8,
            0,
        )
        .expect("normalized seconds are a valid clock time")
    }

    /// Signed duration from `self` to `other`.
    pub fn until(&self, other: ServiceTime) -> SignedDuration {
        SignedDuration::from_secs(other.0 - self.0)
    }
}

impl Add<SignedDuration> for ServiceTime {
    type Output = ServiceTime;

    fn add(self, duration: SignedDuration) -> Self::Output {
        ServiceTime(self.0 + duration.as_secs())
    }
}

impl FromStr for ServiceTime {
    type Err = TransitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TransitError::InvalidTime(s.to_owned());

        let mut parts = s.trim().splitn(3, ':');
        let hours: i64 = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;
        let minutes: i64 = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;
        let seconds: i64 = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;

        // Hours beyond 24 are the service-day next-day convention and allowed.
        if hours < 0 || !(0..60).contains(&minutes) || !(0..60).contains(&seconds) {
            return Err(invalid());
        }

        Ok(ServiceTime::from_hms(hours, minutes, seconds))
    }
}

impl fmt::Display for ServiceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Round-trips through the service-day form, hour 24+ included.
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.0 / 3600,
            (self.0 % 3600) / 60,
            self.0 % 60
        )
    }
}

impl TryFrom<String> for ServiceTime {
    type Error = TransitError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ServiceTime> for String {
    fn from(value: ServiceTime) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_time() {
        let t: ServiceTime = "09:15:30".parse().unwrap();
        assert_eq!(t.seconds(), 9 * 3600 + 15 * 60 + 30);
        assert_eq!(t.day_offset(), 0);
    }

    #[test]
    fn test_parse_next_day_time() {
        let t: ServiceTime = "25:30:00".parse().unwrap();
        assert_eq!(t.day_offset(), 1);
        assert_eq!(t.clock(), jiff::civil::time(1, 30, 0, 0));
        assert_eq!(t.to_string(), "25:30:00");
    }

    #[test]
    fn test_duration_across_midnight() {
        let end: ServiceTime = "23:50:00".parse().unwrap();
        let next_start: ServiceTime = "24:10:00".parse().unwrap();
        assert_eq!(end.until(next_start), SignedDuration::from_mins(20));
        assert!(end < next_start);
    }

    #[test]
    fn test_invalid_strings_rejected() {
        for input in ["", "12:00", "12:61:00", "12:00:99", "ab:cd:ef", "-1:00:00"] {
            assert!(input.parse::<ServiceTime>().is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn test_display_round_trip() {
        for input in ["00:00:00", "08:05:09", "24:00:00", "27:45:12"] {
            let t: ServiceTime = input.parse().unwrap();
            assert_eq!(t.to_string(), input);
            assert_eq!(t.to_string().parse::<ServiceTime>().unwrap(), t);
        }
    }
}
