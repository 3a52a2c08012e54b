//! Simulation Time
//!
//! Office wall-clock time derived from the tick counter.
//!
//! # Example
//!
//! ```
//! use office_events::SimTime;
//!
//! let t = SimTime::from_tick(65);
//! assert_eq!(t.to_string(), "day_1.10:05");
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Simulated minutes that pass per tick.
pub const MINUTES_PER_TICK: u64 = 1;

/// Hour of day at tick zero.
pub const DAY_START_HOUR: u64 = 9;

const MINUTES_PER_DAY: u64 = 24 * 60;

/// Human-readable office time.
///
/// Serializes to strings like "day_2.14:30".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SimTime {
    pub day: u32,
    pub hour: u8,
    pub minute: u8,
}

impl SimTime {
    /// Creates a new SimTime.
    pub fn new(day: u32, hour: u8, minute: u8) -> Self {
        Self { day, hour, minute }
    }

    /// Converts a tick count into office time.
    pub fn from_tick(tick: u64) -> Self {
        let total = DAY_START_HOUR * 60 + tick * MINUTES_PER_TICK;
        let day = (total / MINUTES_PER_DAY) as u32 + 1;
        let in_day = total % MINUTES_PER_DAY;
        Self {
            day,
            hour: (in_day / 60) as u8,
            minute: (in_day % 60) as u8,
        }
    }

    /// Minutes since midnight of the current day.
    pub fn minute_of_day(&self) -> u32 {
        self.hour as u32 * 60 + self.minute as u32
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "day_{}.{:02}:{:02}", self.day, self.hour, self.minute)
    }
}

/// Error type for parsing SimTime from strings.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseTimeError {
    InvalidFormat(String),
    InvalidDay(String),
    InvalidClock(String),
}

impl fmt::Display for ParseTimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseTimeError::InvalidFormat(s) => {
                write!(f, "invalid time format: '{}', expected 'day_N.HH:MM'", s)
            }
            ParseTimeError::InvalidDay(s) => write!(f, "invalid day: '{}'", s),
            ParseTimeError::InvalidClock(s) => write!(f, "invalid clock time: '{}'", s),
        }
    }
}

impl std::error::Error for ParseTimeError {}

impl FromStr for SimTime {
    type Err = ParseTimeError;

    /// Parses a SimTime from a string like "day_3.17:45".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (day_part, clock_part) = s
            .split_once('.')
            .ok_or_else(|| ParseTimeError::InvalidFormat(s.to_string()))?;

        let day = day_part
            .strip_prefix("day_")
            .ok_or_else(|| ParseTimeError::InvalidFormat(s.to_string()))?
            .parse::<u32>()
            .map_err(|_| ParseTimeError::InvalidDay(day_part.to_string()))?;

        let (hour, minute) = clock_part
            .split_once(':')
            .ok_or_else(|| ParseTimeError::InvalidClock(clock_part.to_string()))?;
        let hour = hour
            .parse::<u8>()
            .map_err(|_| ParseTimeError::InvalidClock(clock_part.to_string()))?;
        let minute = minute
            .parse::<u8>()
            .map_err(|_| ParseTimeError::InvalidClock(clock_part.to_string()))?;
        if hour > 23 || minute > 59 {
            return Err(ParseTimeError::InvalidClock(clock_part.to_string()));
        }

        Ok(SimTime { day, hour, minute })
    }
}

// Serialize as a string
impl Serialize for SimTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SimTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_zero_is_day_start() {
        let t = SimTime::from_tick(0);
        assert_eq!(t, SimTime::new(1, DAY_START_HOUR as u8, 0));
    }

    #[test]
    fn test_day_rollover() {
        let ticks_to_midnight = (24 - DAY_START_HOUR) * 60 / MINUTES_PER_TICK;
        let t = SimTime::from_tick(ticks_to_midnight);
        assert_eq!(t, SimTime::new(2, 0, 0));
    }

    #[test]
    fn test_parse_roundtrip() {
        let t = SimTime::new(3, 17, 45);
        assert_eq!(t.to_string(), "day_3.17:45");
        assert_eq!("day_3.17:45".parse::<SimTime>().unwrap(), t);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "17:45".parse::<SimTime>(),
            Err(ParseTimeError::InvalidFormat(_))
        ));
        assert!(matches!(
            "day_x.17:45".parse::<SimTime>(),
            Err(ParseTimeError::InvalidDay(_))
        ));
        assert!(matches!(
            "day_1.25:00".parse::<SimTime>(),
            Err(ParseTimeError::InvalidClock(_))
        ));
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&SimTime::new(1, 9, 5)).unwrap();
        assert_eq!(json, "\"day_1.09:05\"");
    }
}
