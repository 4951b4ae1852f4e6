//! Read benchmark parameters and their InfluxQL rendering.

use std::{
    fmt,
    str::FromStr,
    time::{SystemTime, UNIX_EPOCH},
};

use crate::{
    config::Precision,
    payload::{MEASUREMENT, SensorKind},
};

/// Retention policy the generated points land in.
pub const RETENTION_POLICY: &str = "autogen";

/// Immutable description of the query every read node issues.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadSpec {
    pub aggregation: Aggregation,
    pub kind: SensorKind,
    pub start: TimeBound,
    pub end: TimeBound,
    pub interval: GroupInterval,
}

impl Default for ReadSpec {
    fn default() -> Self {
        Self {
            aggregation: Aggregation("mean".to_owned()),
            kind: SensorKind::Float,
            start: TimeBound::Expr("now() - 5m".to_owned()),
            end: TimeBound::Expr("now()".to_owned()),
            interval: GroupInterval("5s".to_owned()),
        }
    }
}

impl ReadSpec {
    /// Render the `SELECT` statement; absolute bounds are expressed in `precision`.
    pub fn to_influxql(&self, precision: Precision) -> String {
        format!(
            r#"SELECT {}("{}") FROM "{RETENTION_POLICY}"."{MEASUREMENT}" WHERE {} <= time AND time <= {} GROUP BY time({})"#,
            self.aggregation,
            self.kind.field_name(),
            self.start.render(precision),
            self.end.render(precision),
            self.interval,
        )
    }
}

/// One end of the queried time window.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeBound {
    /// Absolute instant, rendered as an epoch literal (e.g. `1600000000000ms`).
    At(SystemTime),
    /// InfluxQL time expression passed through verbatim (e.g. `now() - 5m`).
    Expr(String),
}

impl TimeBound {
    fn render(&self, precision: Precision) -> String {
        match self {
            TimeBound::At(ts) => {
                let since_epoch = ts.duration_since(UNIX_EPOCH).unwrap_or_default();
                format!("{}{}", precision.ticks(since_epoch), precision.as_str())
            }
            TimeBound::Expr(expr) => expr.clone(),
        }
    }
}

/// InfluxQL aggregation function name (`mean`, `max`, `count`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation(String);

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Aggregation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(format!("invalid aggregation function name '{s}'"));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }
}

/// InfluxQL duration literal used in `GROUP BY time(..)`, e.g. `5s` or `1h30m`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInterval(String);

impl fmt::Display for GroupInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for GroupInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const UNITS: [&str; 9] = ["ns", "ms", "u", "µ", "s", "m", "h", "d", "w"];

        let s = s.trim();
        let err = || format!("invalid group interval '{s}' (expected e.g. 5s, 1m, 1h30m)");

        let mut rest = s;
        if rest.is_empty() {
            return Err(err());
        }
        while !rest.is_empty() {
            let digits = rest.chars().take_while(char::is_ascii_digit).count();
            if digits == 0 {
                return Err(err());
            }
            rest = &rest[digits..];
            let unit = UNITS
                .iter()
                .find(|unit| rest.starts_with(**unit))
                .ok_or_else(err)?;
            rest = &rest[unit.len()..];
        }

        Ok(Self(s.to_owned()))
    }
}
