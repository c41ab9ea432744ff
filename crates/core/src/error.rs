/// Result alias that carries the custom [`FxError`] type.
pub type Result<T> = std::result::Result<T, FxError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum FxError {
    /// Free-form message for failures that do not warrant their own variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// No demo has been registered under the requested id.
    #[error("unknown demo `{0}`")]
    UnknownDemo(String),
    /// A demo was requested before a drawing surface was bound.
    #[error("no drawing surface is bound")]
    NoSurface,
    /// Caller supplied data the operation cannot work with.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Configuration could not be parsed.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// The FFT backend rejected the buffers it was handed.
    #[error("fft failed: {0}")]
    Fft(String),
}

impl FxError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for FxError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for FxError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

impl From<realfft::FftError> for FxError {
    fn from(value: realfft::FftError) -> Self {
        Self::Fft(value.to_string())
    }
}
