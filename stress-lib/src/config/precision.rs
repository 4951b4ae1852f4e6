use std::{fmt, str::FromStr, time::Duration};

use serde::Deserialize;

/// Timestamp precision as understood by the InfluxDB 1.x HTTP API
/// (`precision=` on writes, `epoch=` on queries).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum Precision {
    #[serde(rename = "ns")]
    Nanoseconds,
    #[serde(rename = "u")]
    Microseconds,
    #[default]
    #[serde(rename = "ms")]
    Milliseconds,
    #[serde(rename = "s")]
    Seconds,
    #[serde(rename = "m")]
    Minutes,
    #[serde(rename = "h")]
    Hours,
}

impl Precision {
    pub fn as_str(self) -> &'static str {
        match self {
            Precision::Nanoseconds => "ns",
            Precision::Microseconds => "u",
            Precision::Milliseconds => "ms",
            Precision::Seconds => "s",
            Precision::Minutes => "m",
            Precision::Hours => "h",
        }
    }

    /// Express a duration (e.g. since the unix epoch) in ticks of this precision.
    pub fn ticks(self, d: Duration) -> u128 {
        match self {
            Precision::Nanoseconds => d.as_nanos(),
            Precision::Microseconds => d.as_micros(),
            Precision::Milliseconds => d.as_millis(),
            Precision::Seconds => d.as_secs() as u128,
            Precision::Minutes => (d.as_secs() / 60) as u128,
            Precision::Hours => (d.as_secs() / 3600) as u128,
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct UnknownPrecision(String);

impl fmt::Display for UnknownPrecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown precision '{}' (expected one of: ns, u, ms, s, m, h)",
            self.0
        )
    }
}

impl std::error::Error for UnknownPrecision {}

impl FromStr for Precision {
    type Err = UnknownPrecision;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ns" => Ok(Precision::Nanoseconds),
            "u" | "us" | "µ" => Ok(Precision::Microseconds),
            "ms" => Ok(Precision::Milliseconds),
            "s" => Ok(Precision::Seconds),
            "m" => Ok(Precision::Minutes),
            "h" => Ok(Precision::Hours),
            other => Err(UnknownPrecision(other.to_owned())),
        }
    }
}
