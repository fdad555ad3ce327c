//! Error types for probe measurements

use std::fmt;

/// Result type alias for probe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors raised by the external measurement services
///
/// Only the recoverable classes are absorbed into sentinel samples. Everything else
/// propagates to the scheduler, which skips the tick.
#[derive(Debug)]
pub enum ProbeError {
    /// The speed service could not retrieve its configuration / server list
    ConfigRetrieval(String),

    /// No usable server could be selected for the speed measurement
    BestServerSelection(String),

    /// The reachability target refused or dropped the connection
    Connection(String),

    /// The reachability check exceeded its timeout
    Timeout(String),

    /// A download or upload transfer failed mid-way
    Transfer(String),

    /// Any other failure
    Unexpected(anyhow::Error),
}

impl ProbeError {
    /// Whether this failure is converted into a sentinel value
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ProbeError::ConfigRetrieval(_)
                | ProbeError::BestServerSelection(_)
                | ProbeError::Connection(_)
                | ProbeError::Timeout(_)
        )
    }

    /// Whether this failure triggers the throughput cooldown
    pub fn is_server_discovery(&self) -> bool {
        matches!(
            self,
            ProbeError::ConfigRetrieval(_) | ProbeError::BestServerSelection(_)
        )
    }

    /// Whether this failure makes a reachability target count as unreachable
    pub fn is_unreachable(&self) -> bool {
        matches!(self, ProbeError::Connection(_) | ProbeError::Timeout(_))
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::ConfigRetrieval(msg) => {
                write!(f, "failed to retrieve speed test configuration: {}", msg)
            }
            ProbeError::BestServerSelection(msg) => {
                write!(f, "failed to select a speed test server: {}", msg)
            }
            ProbeError::Connection(msg) => write!(f, "connection failed: {}", msg),
            ProbeError::Timeout(msg) => write!(f, "request timed out: {}", msg),
            ProbeError::Transfer(msg) => write!(f, "transfer failed: {}", msg),
            ProbeError::Unexpected(err) => write!(f, "unexpected probe failure: {:#}", err),
        }
    }
}

impl std::error::Error for ProbeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProbeError::Unexpected(err) => Some(&**err),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for ProbeError {
    fn from(err: anyhow::Error) -> Self {
        ProbeError::Unexpected(err)
    }
}
