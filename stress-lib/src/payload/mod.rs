//! Synthetic sensor readings and their line protocol encoding.
//!
//! Each node generates its own [`WriteBatch`] using its own random generator,
//! so no generator state is shared between concurrently running nodes.

use std::{fmt, fmt::Write as _, str::FromStr, time::Duration};

use rand::{Rng, SeedableRng as _, distr::Alphanumeric, rngs::SmallRng};
use serde::{Deserialize, Serialize};

use crate::config::Precision;

mod node;

pub use self::node::NodeId;

/// Measurement name used for every generated point.
pub const MEASUREMENT: &str = "stress_measurement";
/// Tag key identifying the node that produced a point.
pub const NODE_TAG: &str = "node";
/// Length of generated string values.
pub const STR_VALUE_LEN: usize = 60;

const VALUE_UPPER_BOUND: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    Float,
    Int,
    Str,
    Bool,
}

impl SensorKind {
    pub const ALL: [SensorKind; 4] = [
        SensorKind::Float,
        SensorKind::Int,
        SensorKind::Str,
        SensorKind::Bool,
    ];

    /// Field key used in the line protocol (and selected by read queries).
    pub fn field_name(self) -> &'static str {
        match self {
            SensorKind::Float => "float",
            SensorKind::Int => "int",
            SensorKind::Str => "str",
            SensorKind::Bool => "bool",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

impl FromStr for SensorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "float" => Ok(SensorKind::Float),
            "int" | "integer" => Ok(SensorKind::Int),
            "str" | "string" => Ok(SensorKind::Str),
            "bool" | "boolean" => Ok(SensorKind::Bool),
            other => Err(format!(
                "unknown sensor kind '{other}' (expected float, int, str or bool)"
            )),
        }
    }
}

/// Number of sensors of each kind simulated per node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorCounts {
    pub float: usize,
    pub int: usize,
    pub str: usize,
    pub bool: usize,
}

impl SensorCounts {
    pub fn of(&self, kind: SensorKind) -> usize {
        match kind {
            SensorKind::Float => self.float,
            SensorKind::Int => self.int,
            SensorKind::Str => self.str,
            SensorKind::Bool => self.bool,
        }
    }

    /// Sensors per time step, `None` on overflow.
    pub fn total(&self) -> Option<usize> {
        self.float
            .checked_add(self.int)?
            .checked_add(self.str)?
            .checked_add(self.bool)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SensorValue {
    Float(f64),
    Int(i64),
    Str(String),
    Bool(bool),
}

impl SensorValue {
    fn random<R: Rng>(kind: SensorKind, rng: &mut R) -> Self {
        match kind {
            SensorKind::Float => {
                SensorValue::Float(rng.random::<f64>() * f64::from(VALUE_UPPER_BOUND))
            }
            SensorKind::Int => SensorValue::Int(rng.random_range(0..i64::from(VALUE_UPPER_BOUND))),
            SensorKind::Str => SensorValue::Str(
                (&mut *rng)
                    .sample_iter(Alphanumeric)
                    .take(STR_VALUE_LEN)
                    .map(char::from)
                    .collect(),
            ),
            SensorKind::Bool => SensorValue::Bool(rng.random_bool(0.5)),
        }
    }

    pub fn kind(&self) -> SensorKind {
        match self {
            SensorValue::Float(_) => SensorKind::Float,
            SensorValue::Int(_) => SensorKind::Int,
            SensorValue::Str(_) => SensorKind::Str,
            SensorValue::Bool(_) => SensorKind::Bool,
        }
    }
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorValue::Float(v) => write!(f, "{v:.5e}"),
            SensorValue::Int(v) => write!(f, "{v}i"),
            // alphanumeric only, nothing to escape
            SensorValue::Str(v) => write!(f, "\"{v}\""),
            SensorValue::Bool(true) => f.write_str("t"),
            SensorValue::Bool(false) => f.write_str("f"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub value: SensorValue,
    /// Timestamp in ticks of the generator precision.
    pub timestamp: u128,
}

/// All readings a single node sends in one write request.
#[derive(Debug, Clone)]
pub struct WriteBatch {
    node: NodeId,
    readings: Vec<SensorReading>,
}

impl WriteBatch {
    pub fn readings(&self) -> &[SensorReading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Encode as newline separated line protocol, one point per reading:
    ///
    /// `stress_measurement,node=<id> <kind>=<value> <timestamp>`
    pub fn encode(&self) -> String {
        // rough guess, strings dominate when present
        let mut buf = String::with_capacity(self.readings.len() * 48);
        for (idx, reading) in self.readings.iter().enumerate() {
            if idx > 0 {
                buf.push('\n');
            }
            // writing into a String is infallible
            let _ = write!(
                buf,
                "{MEASUREMENT},{NODE_TAG}={} {}={} {}",
                self.node,
                reading.value.kind().field_name(),
                reading.value,
                reading.timestamp,
            );
        }
        buf
    }
}

/// Produces the write batch of one node.
///
/// For every second offset in `0..duration_secs` one reading per
/// configured sensor is emitted, stamped `start + offset`.
#[derive(Debug, Clone)]
pub struct PayloadGenerator {
    counts: SensorCounts,
    readings_per_batch: usize,
    duration_secs: u64,
    start: Duration,
    precision: Precision,
}

impl PayloadGenerator {
    /// `start` is the first timestamp, expressed as duration since the unix epoch.
    ///
    /// `None` when the number of readings per batch does not fit in a `usize`.
    pub fn try_new(
        counts: SensorCounts,
        duration_secs: u64,
        start: Duration,
        precision: Precision,
    ) -> Option<Self> {
        let readings_per_batch = usize::try_from(duration_secs)
            .ok()?
            .checked_mul(counts.total()?)?;
        Some(Self {
            counts,
            readings_per_batch,
            duration_secs,
            start,
            precision,
        })
    }

    /// Number of readings every generated batch contains.
    pub fn readings_per_batch(&self) -> usize {
        self.readings_per_batch
    }

    pub fn generate<R: Rng>(&self, node: NodeId, rng: &mut R) -> WriteBatch {
        let mut readings = Vec::with_capacity(self.readings_per_batch());
        for offset in 0..self.duration_secs {
            let timestamp = self
                .precision
                .ticks(self.start + Duration::from_secs(offset));
            for kind in SensorKind::ALL {
                for _ in 0..self.counts.of(kind) {
                    readings.push(SensorReading {
                        value: SensorValue::random(kind, rng),
                        timestamp,
                    });
                }
            }
        }
        WriteBatch { node, readings }
    }
}

/// Random generator owned by a single node.
///
/// With a base seed the output is reproducible per node index,
/// otherwise it is seeded from the OS.
pub fn node_rng(base_seed: Option<u64>, node: &NodeId) -> SmallRng {
    match base_seed {
        Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(node.index() as u64)),
        None => SmallRng::from_os_rng(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: Duration = Duration::from_millis(1_600_000_000_000);

    fn generator(counts: SensorCounts, duration: u64) -> PayloadGenerator {
        PayloadGenerator::try_new(counts, duration, T, Precision::Milliseconds).unwrap()
    }

    #[test]
    fn overflowing_batch_sizes_are_rejected() {
        let huge = SensorCounts {
            float: usize::MAX,
            int: 1,
            ..Default::default()
        };
        assert_eq!(huge.total(), None);
        assert!(PayloadGenerator::try_new(huge, 1, T, Precision::Milliseconds).is_none());

        let wide = SensorCounts {
            float: usize::MAX / 2 + 1,
            ..Default::default()
        };
        assert_eq!(wide.total(), Some(usize::MAX / 2 + 1));
        assert!(PayloadGenerator::try_new(wide, 2, T, Precision::Milliseconds).is_none());
        assert!(PayloadGenerator::try_new(wide, 1, T, Precision::Milliseconds).is_some());
    }

    #[test]
    fn batch_holds_duration_times_sensor_count_readings() {
        let counts = SensorCounts {
            float: 2,
            int: 1,
            str: 3,
            bool: 1,
        };
        let generator = generator(counts, 4);
        let node = NodeId::new(1, 1);
        let batch = generator.generate(node, &mut node_rng(Some(1), &node));

        assert_eq!(generator.readings_per_batch(), 28);
        assert_eq!(batch.len(), 28);
        assert_eq!(batch.encode().lines().count(), 28);
    }

    #[test]
    fn timestamps_advance_one_second_per_offset() {
        let counts = SensorCounts {
            float: 2,
            ..Default::default()
        };
        let node = NodeId::new(3, 3);
        let batch = generator(counts, 5).generate(node, &mut node_rng(Some(7), &node));

        let timestamps: Vec<u128> = batch.readings().iter().map(|r| r.timestamp).collect();
        let start = 1_600_000_000_000u128;
        assert_eq!(
            timestamps,
            vec![
                start,
                start,
                start + 1000,
                start + 1000,
                start + 2000,
                start + 2000,
                start + 3000,
                start + 3000,
                start + 4000,
                start + 4000,
            ]
        );
    }

    #[test]
    fn values_stay_within_their_domains() {
        let counts = SensorCounts {
            float: 5,
            int: 5,
            str: 5,
            bool: 5,
        };
        let node = NodeId::new(1, 1);
        let batch = generator(counts, 20).generate(node, &mut node_rng(Some(42), &node));

        for reading in batch.readings() {
            match &reading.value {
                SensorValue::Float(v) => assert!((0.0..1000.0).contains(v), "{v}"),
                SensorValue::Int(v) => assert!((0..1000).contains(v), "{v}"),
                SensorValue::Str(v) => {
                    assert_eq!(v.len(), STR_VALUE_LEN);
                    assert!(v.chars().all(|c| c.is_ascii_alphanumeric()));
                }
                SensorValue::Bool(_) => (),
            }
        }
    }

    #[test]
    fn kinds_are_emitted_in_fixed_order_per_timestamp() {
        let counts = SensorCounts {
            float: 1,
            int: 1,
            str: 1,
            bool: 1,
        };
        let node = NodeId::new(1, 1);
        let batch = generator(counts, 1).generate(node, &mut node_rng(Some(3), &node));
        let kinds: Vec<_> = batch.readings().iter().map(|r| r.value.kind()).collect();
        assert_eq!(kinds, SensorKind::ALL.to_vec());
    }

    #[test]
    fn encoded_lines_follow_line_protocol() {
        let counts = SensorCounts {
            float: 1,
            int: 1,
            str: 1,
            bool: 1,
        };
        let node = NodeId::new(7, 12);
        let payload = generator(counts, 1)
            .generate(node, &mut node_rng(Some(9), &node))
            .encode();
        let lines: Vec<&str> = payload.lines().collect();

        assert!(lines.iter().all(|l| l.starts_with("stress_measurement,node=07 ")));
        assert!(lines.iter().all(|l| l.ends_with(" 1600000000000")));
        assert!(lines[0].contains(" float="));
        assert!(lines[0].split(' ').nth(1).unwrap().contains('e'));
        assert!(lines[1].contains(" int=") && lines[1].split(' ').nth(1).unwrap().ends_with('i'));
        assert!(lines[2].contains(" str=\""));
        let bool_field = lines[3].split(' ').nth(1).unwrap();
        assert!(bool_field == "bool=t" || bool_field == "bool=f", "{bool_field}");
        assert!(!payload.ends_with('\n'));
    }

    #[test]
    fn seeded_generation_is_reproducible_per_node() {
        let counts = SensorCounts {
            float: 3,
            str: 1,
            ..Default::default()
        };
        let generator = generator(counts, 3);
        let a = NodeId::new(1, 2);
        let b = NodeId::new(2, 2);

        let first = generator.generate(a, &mut node_rng(Some(5), &a)).encode();
        let again = generator.generate(a, &mut node_rng(Some(5), &a)).encode();
        let other = generator.generate(b, &mut node_rng(Some(5), &b)).encode();

        assert_eq!(first, again);
        assert_ne!(first, other);
    }

    #[test]
    fn zero_duration_or_sensors_give_empty_batch() {
        let node = NodeId::new(1, 1);
        let empty = generator(SensorCounts::default(), 10).generate(node, &mut node_rng(None, &node));
        assert!(empty.is_empty());
        assert_eq!(empty.encode(), "");

        let counts = SensorCounts {
            float: 1,
            ..Default::default()
        };
        assert!(generator(counts, 0).generate(node, &mut node_rng(None, &node)).is_empty());
    }

    #[test]
    fn parse_sensor_kind() {
        assert_eq!("Float".parse::<SensorKind>().unwrap(), SensorKind::Float);
        assert_eq!("string".parse::<SensorKind>().unwrap(), SensorKind::Str);
        assert!("decimal".parse::<SensorKind>().is_err());
    }
}
