//! Error types
//!
//! Everything that can fail in this crate fails at configuration time:
//! malformed assets, inconsistent geometry, unreadable files. Once a
//! pattern is constructed its per-cycle operation is infallible.

use std::fmt;
use std::io;

/// Malformed asset or geometry detected while building a pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// A `.mem` line is not a hex number
    InvalidLine { line: usize, content: String },
    /// A `.mem` value does not fit in 24 bits
    ValueOutOfRange { line: usize, value: u64 },
    /// Table has the wrong number of entries for its declared size
    WrongLength { expected: usize, found: usize },
    /// A supplied tilemap entry names a tile that does not exist
    TileIndexOutOfRange {
        position: usize,
        index: u16,
        tile_count: usize,
    },
    /// Dimensions that cannot describe a valid layout
    InvalidGeometry(String),
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLine { line, content } => {
                write!(f, "line {}: not a hex RGB value: {:?}", line, content)
            }
            Self::ValueOutOfRange { line, value } => {
                write!(f, "line {}: value 0x{:x} exceeds 24 bits", line, value)
            }
            Self::WrongLength { expected, found } => write!(
                f,
                "table has {} entries, expected {}",
                found, expected
            ),
            Self::TileIndexOutOfRange {
                position,
                index,
                tile_count,
            } => write!(
                f,
                "tilemap entry {} references tile {} but only {} tiles exist",
                position, index, tile_count
            ),
            Self::InvalidGeometry(msg) => write!(f, "invalid geometry: {}", msg),
        }
    }
}

impl std::error::Error for FormatError {}

/// Failure loading an asset file
#[derive(Debug)]
pub enum AssetError {
    Io(io::Error),
    Format(FormatError),
    /// PNG snapshot encoding failed
    Encode(png::EncodingError),
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "asset I/O error: {}", e),
            Self::Format(e) => write!(f, "malformed asset: {}", e),
            Self::Encode(e) => write!(f, "cannot encode image: {}", e),
        }
    }
}

impl std::error::Error for AssetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Format(e) => Some(e),
            Self::Encode(e) => Some(e),
        }
    }
}

impl From<io::Error> for AssetError {
    fn from(e: io::Error) -> Self {
        AssetError::Io(e)
    }
}

impl From<FormatError> for AssetError {
    fn from(e: FormatError) -> Self {
        AssetError::Format(e)
    }
}

impl From<png::EncodingError> for AssetError {
    fn from(e: png::EncodingError) -> Self {
        AssetError::Encode(e)
    }
}

/// Failure loading or validating a configuration
#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Parse(serde_json::Error),
    Invalid(String),
    /// An asset named by the configuration failed to load
    Asset(AssetError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "cannot read config: {}", e),
            Self::Parse(e) => write!(f, "cannot parse config: {}", e),
            Self::Invalid(msg) => write!(f, "invalid config: {}", msg),
            Self::Asset(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
            Self::Invalid(_) => None,
            Self::Asset(e) => Some(e),
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl From<AssetError> for ConfigError {
    fn from(e: AssetError) -> Self {
        ConfigError::Asset(e)
    }
}

impl From<FormatError> for ConfigError {
    fn from(e: FormatError) -> Self {
        ConfigError::Asset(AssetError::Format(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_display() {
        let e = FormatError::WrongLength {
            expected: 256,
            found: 255,
        };
        assert_eq!(e.to_string(), "table has 255 entries, expected 256");

        let e = FormatError::InvalidLine {
            line: 3,
            content: "zz".into(),
        };
        assert!(e.to_string().starts_with("line 3"));
    }

    #[test]
    fn test_asset_error_wraps_format() {
        let e: AssetError = FormatError::InvalidGeometry("zero width".into()).into();
        assert!(matches!(e, AssetError::Format(_)));
        assert!(std::error::Error::source(&e).is_some());
    }
}
