use std::{collections::BTreeMap, fmt, str::FromStr, time::Duration};

use serde::Deserialize;

mod precision;

pub use self::precision::{Precision, UnknownPrecision};

/// Connection settings for the store under test.
///
/// Loaded by the caller (config file and/or CLI flags);
/// validated when a [`crate::StressTester`] is created.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    #[serde(alias = "db")]
    pub database: String,
    pub precision: Precision,
    /// Extra headers sent with every request (e.g. `Authorization`).
    pub headers: BTreeMap<String, String>,
    /// Per request timeout in seconds (<= 0.0 or absent = wait forever).
    pub request_timeout: Option<f64>,
    /// Base seed for payload generation; every node derives its own seed from it.
    pub seed: Option<u64>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            scheme: Scheme::Http,
            host: "localhost".to_owned(),
            port: 8086,
            database: "stress".to_owned(),
            precision: Precision::Milliseconds,
            headers: BTreeMap::new(),
            request_timeout: None,
            seed: None,
        }
    }
}

impl TargetConfig {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
            .filter(|secs| secs.is_finite() && *secs > 0.)
            .map(Duration::from_secs_f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Http => f.write_str("http"),
            Scheme::Https => f.write_str("https"),
        }
    }
}

impl FromStr for Scheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("http") {
            Ok(Scheme::Http)
        } else if s.eq_ignore_ascii_case("https") {
            Ok(Scheme::Https)
        } else {
            Err(format!("unknown scheme '{s}' (expected http or https)"))
        }
    }
}
