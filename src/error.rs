//! Error types
//!
//! Only configuration, device acquisition and the thin I/O collaborators
//! produce errors. Synthesis and mixing absorb their own edge cases.

use std::fmt;

/// Murmur error types
#[derive(Debug)]
pub enum MurmurError {
    /// Character name not present in the chosen sound set
    UnknownCharacter {
        set: String,
        name: String,
        available: Vec<&'static str>,
    },
    /// Sound set name not recognised
    UnknownSoundSet(String),
    /// No audio output device could be claimed
    DeviceUnavailable(String),
    /// Configuration value out of range
    InvalidConfig(String),
    /// Config file could not be parsed
    ConfigParse(String),
    /// WAV export failed
    Wav(String),
    /// Wrapped command could not be started
    Spawn(String),
    /// IO error
    Io(std::io::Error),
}

impl fmt::Display for MurmurError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MurmurError::UnknownCharacter {
                set,
                name,
                available,
            } => write!(
                f,
                "character '{}' not in set '{}'. Available: {}",
                name,
                set,
                available.join(", ")
            ),
            MurmurError::UnknownSoundSet(name) => {
                write!(f, "unknown sound set '{}' (expected ambient or material)", name)
            }
            MurmurError::DeviceUnavailable(msg) => {
                write!(f, "no usable audio output device: {}", msg)
            }
            MurmurError::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            MurmurError::ConfigParse(msg) => write!(f, "failed to parse config file: {}", msg),
            MurmurError::Wav(msg) => write!(f, "WAV export failed: {}", msg),
            MurmurError::Spawn(msg) => write!(f, "failed to start command: {}", msg),
            MurmurError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for MurmurError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MurmurError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MurmurError {
    fn from(e: std::io::Error) -> Self {
        MurmurError::Io(e)
    }
}

impl From<hound::Error> for MurmurError {
    fn from(e: hound::Error) -> Self {
        MurmurError::Wav(e.to_string())
    }
}

impl From<toml::de::Error> for MurmurError {
    fn from(e: toml::de::Error) -> Self {
        MurmurError::ConfigParse(e.to_string())
    }
}

/// Result type for murmur operations
pub type Result<T> = std::result::Result<T, MurmurError>;
