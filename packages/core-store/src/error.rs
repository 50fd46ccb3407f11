//! Store errors.
//!
//! Only stores that persist outside the process can fail. Reading and
//! writing entries in memory is infallible.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted suite document could not be read back.
    #[error("decode error: {message}")]
    Decode { message: String },

    /// Entries could not be turned into a suite document.
    #[error("encode error: {message}")]
    Encode { message: String },

    #[error("suite location {} is not a directory", path.display())]
    NotADirectory { path: PathBuf },
}

impl Error {
    pub fn decode(message: impl Into<String>) -> Self {
        Error::Decode {
            message: message.into(),
        }
    }

    pub fn encode(message: impl Into<String>) -> Self {
        Error::Encode {
            message: message.into(),
        }
    }
}
