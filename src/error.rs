//! Error types for dashlink

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Dashlink error types
///
/// Malformed telemetry never surfaces here; bad frames are dropped inside the
/// decoder. Errors are reserved for connection attempts, configuration
/// validation and radio-level failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration rejected during validation
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Radio hardware absent or disabled
    #[error("Radio not available")]
    RadioUnavailable,

    /// Address could not be resolved to a remote device
    #[error("Invalid device address: {0}")]
    InvalidAddress(String),

    /// Caller lacks authorization for the requested radio operation
    #[error("Radio authorization denied: {0}")]
    AuthorizationDenied(String),

    /// Opening the byte channel to the device failed
    #[error("Channel open failed: {0}")]
    ChannelOpen(String),

    /// A connection attempt is already in flight
    #[error("Connection attempt already in progress")]
    ConnectBusy,

    /// No device is connected
    #[error("No device connected")]
    NotConnected,
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}
