use std::{fmt, time::SystemTime};

/// Parse a `YYYY-MM-DD[ HH[:MM[:SS]]]` date, interpreted as UTC.
///
/// Omitted time components default to zero.
pub fn parse_date(s: &str) -> Result<SystemTime, InvalidDate> {
    let s = s.trim();
    let (date, time) = match s.split_once(' ') {
        Some((date, time)) => (date, time.trim()),
        None => (s, ""),
    };

    let mut components: Vec<&str> = if time.is_empty() {
        Vec::new()
    } else {
        time.split(':').collect()
    };
    if components.len() > 3
        || components
            .iter()
            .any(|c| c.len() != 2 || !c.bytes().all(|b| b.is_ascii_digit()))
    {
        return Err(InvalidDate(s.to_owned()));
    }
    components.resize(3, "00");

    humantime::parse_rfc3339_weak(&format!("{date} {}", components.join(":")))
        .map_err(|_| InvalidDate(s.to_owned()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidDate(String);

impl fmt::Display for InvalidDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid date '{}' (expected YYYY-MM-DD[ HH[:MM[:SS]]])",
            self.0
        )
    }
}

impl std::error::Error for InvalidDate {}
