use std::fmt;

use rama::error::BoxError;

use crate::transport::TransportError;

/// Errors surfaced by the benchmark core to its caller.
///
/// Failures of individual workers during a `write` or `read` are not
/// reported through this type; they end up in the operation report instead.
#[derive(Debug)]
pub enum BenchError {
    /// The target could not be reached (ping failed or the transport broke).
    Connectivity(BoxError),
    /// The configuration describes something this tool does not support.
    UnsupportedConfiguration(String),
    /// A benchmark parameter is out of range (e.g. zero nodes).
    InvalidParameter(String),
    /// A single-shot request (admin call or result query) failed.
    RequestFailure(BoxError),
}

impl BenchError {
    pub(crate) fn unsupported(reason: impl Into<String>) -> Self {
        Self::UnsupportedConfiguration(reason.into())
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidParameter(reason.into())
    }

    /// The store answered the request, but with an error status.
    pub fn is_http_status(&self) -> bool {
        match self {
            BenchError::Connectivity(err) | BenchError::RequestFailure(err) => matches!(
                err.downcast_ref::<TransportError>(),
                Some(TransportError::Status { .. })
            ),
            BenchError::UnsupportedConfiguration(_) | BenchError::InvalidParameter(_) => false,
        }
    }
}

impl fmt::Display for BenchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BenchError::Connectivity(err) => write!(f, "connectivity error: {err}"),
            BenchError::UnsupportedConfiguration(reason) => {
                write!(f, "unsupported configuration: {reason}")
            }
            BenchError::InvalidParameter(reason) => write!(f, "invalid parameter: {reason}"),
            BenchError::RequestFailure(err) => write!(f, "request failure: {err}"),
        }
    }
}

impl std::error::Error for BenchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BenchError::Connectivity(err) | BenchError::RequestFailure(err) => Some(err.as_ref()),
            BenchError::UnsupportedConfiguration(_) | BenchError::InvalidParameter(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_reason() {
        let err = BenchError::unsupported("precision 's'");
        assert_eq!(
            err.to_string(),
            "unsupported configuration: precision 's'"
        );
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn transport_errors_keep_their_source() {
        let err = BenchError::Connectivity(BoxError::from("connection refused"));
        assert!(err.to_string().contains("connection refused"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_http_status());
    }
}
