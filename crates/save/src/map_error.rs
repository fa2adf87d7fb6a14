// ---------------------------------------------------------------------------
// MapFileError: error types for map file load/save
// ---------------------------------------------------------------------------

use std::fmt;

/// Errors that can occur while reading or writing a map file.
///
/// Load errors abort before any live state is touched; save errors abort
/// before the file on disk is replaced.
#[derive(Debug)]
pub enum MapFileError {
    /// I/O error (permission denied, disk full, etc.)
    Io(std::io::Error),
    /// The file ended before the named section was complete.
    TooShort {
        stage: &'static str,
        expected: usize,
        found: usize,
    },
    /// The header does not start with the map signature.
    BadSignature,
    /// Map file version is not the one this build reads.
    UnsupportedVersion { found: u32, supported: u32 },
    /// The header declares an empty chunk grid, or one too large to address.
    InvalidChunkCount { x: u32, z: u32 },
    /// The host height data does not cover the map's texture.
    HeightDataSizeMismatch { found: usize, width: u32, height: u32 },
    /// One of the JSON sections failed to parse or serialize.
    Json { stage: &'static str, message: String },
    /// No map file with this name exists.
    MapNotFound(String),
}

impl fmt::Display for MapFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapFileError::Io(e) => write!(f, "I/O error: {e}"),
            MapFileError::TooShort {
                stage,
                expected,
                found,
            } => write!(
                f,
                "Map file too short reading {stage}: need {expected} bytes, found {found}"
            ),
            MapFileError::BadSignature => write!(f, "Map file has an invalid signature"),
            MapFileError::UnsupportedVersion { found, supported } => write!(
                f,
                "Unsupported map version: file is v{found}, this build reads v{supported}"
            ),
            MapFileError::InvalidChunkCount { x, z } => write!(
                f,
                "Map file header declares an invalid chunk grid of {x}x{z} chunks"
            ),
            MapFileError::HeightDataSizeMismatch {
                found,
                width,
                height,
            } => write!(
                f,
                "Height data has {found} samples, expected {width}x{height} = {}",
                *width as usize * *height as usize
            ),
            MapFileError::Json { stage, message } => {
                write!(f, "JSON error in {stage}: {message}")
            }
            MapFileError::MapNotFound(name) => write!(f, "Map not found: {name}"),
        }
    }
}

impl std::error::Error for MapFileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MapFileError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MapFileError {
    fn from(e: std::io::Error) -> Self {
        MapFileError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_file_error_display_too_short() {
        let err = MapFileError::TooShort {
            stage: "height data",
            expected: 4096,
            found: 12,
        };
        let msg = format!("{err}");
        assert!(msg.contains("height data"), "got: {msg}");
        assert!(msg.contains("4096"), "got: {msg}");
    }

    #[test]
    fn test_map_file_error_display_size_mismatch() {
        let err = MapFileError::HeightDataSizeMismatch {
            found: 10,
            width: 32,
            height: 64,
        };
        let msg = format!("{err}");
        assert!(msg.contains("32x64 = 2048"), "got: {msg}");
    }

    #[test]
    fn test_map_file_error_display_version() {
        let err = MapFileError::UnsupportedVersion {
            found: 7,
            supported: 1,
        };
        let msg = format!("{err}");
        assert!(msg.contains("v7"), "got: {msg}");
        assert!(msg.contains("v1"), "got: {msg}");
    }

    #[test]
    fn test_map_file_error_display_chunk_count() {
        let err = MapFileError::InvalidChunkCount { x: 1 << 27, z: 0 };
        let msg = format!("{err}");
        assert!(msg.contains("header"), "got: {msg}");
        assert!(msg.contains("134217728x0"), "got: {msg}");
    }

    #[test]
    fn test_map_file_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: MapFileError = io_err.into();
        assert!(matches!(err, MapFileError::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_map_file_error_json_has_no_source() {
        let err = MapFileError::Json {
            stage: "additional json",
            message: "EOF while parsing".to_string(),
        };
        assert!(std::error::Error::source(&err).is_none());
        assert!(format!("{err}").contains("additional json"));
    }
}
