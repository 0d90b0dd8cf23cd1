/*!
    Error types shared by the media crates.
*/

use std::fmt;

/**
    Error type shared by the media crates.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Unsupported format (valid but not handled)
    UnsupportedFormat { message: String },
    /// Output device failure (stream could not be built, started or paused)
    Device { message: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedFormat { message } => write!(f, "unsupported format: {message}"),
            Self::Device { message } => write!(f, "device error: {message}"),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    pub fn unsupported_format(message: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            message: message.into(),
        }
    }

    pub fn device(message: impl Into<String>) -> Self {
        Self::Device {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let e = Error::unsupported_format("u8 samples");
        assert_eq!(format!("{e}"), "unsupported format: u8 samples");

        let e = Error::device("failed to start stream");
        assert_eq!(format!("{e}"), "device error: failed to start stream");
    }
}
