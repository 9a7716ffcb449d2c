use core::fmt;

/// Errors produced by table setup, encoding, decoding, and interleaving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvCodeError {
    /// Bad `k`, polynomial count, or `start_state` at setup/reinit time.
    ConfigError { reason: &'static str },
    /// Memory could not be acquired for tables or trellis storage.
    AllocError { reason: &'static str },
    /// `decode_symbol`/`decode_data` would exceed `trellis_size`.
    CapacityError { trellis_size: usize },
    /// The caller-supplied bit sink rejected a byte.
    SinkError { reason: &'static str },
}

impl fmt::Display for ConvCodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvCodeError::ConfigError { reason } => write!(f, "invalid configuration: {reason}"),
            ConvCodeError::AllocError { reason } => write!(f, "allocation failed: {reason}"),
            ConvCodeError::CapacityError { trellis_size } => {
                write!(f, "trellis capacity exceeded (size = {trellis_size})")
            }
            ConvCodeError::SinkError { reason } => write!(f, "output sink error: {reason}"),
        }
    }
}

impl std::error::Error for ConvCodeError {}
