// ---------------------------------------------------------------------------
// map_header – fixed-size header at the start of every map file
// ---------------------------------------------------------------------------
//
// Header format (52 bytes, little-endian):
//   [0..32]  Signature: "HELL_MAP", zero-padded
//   [32..36] Format version (u32)
//   [36..40] Chunk count along X (u32)
//   [40..44] Chunk count along Z (u32)
//   [44..48] Create-info JSON length in bytes (u32)
//   [48..52] Additional map data JSON length in bytes (u32)
//
// The header is followed by the f32 height grid, then the two JSON blobs.

use terrain::config::{MAP_SIGNATURE, MAP_VERSION};

use crate::map_error::MapFileError;

pub const SIGNATURE_SIZE: usize = 32;

pub const HEADER_SIZE: usize = SIGNATURE_SIZE + 5 * 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapFileHeader {
    pub version: u32,
    pub chunk_count_x: u32,
    pub chunk_count_z: u32,
    pub create_info_json_length: u32,
    pub additional_json_length: u32,
}

impl MapFileHeader {
    pub fn new(
        chunk_count_x: u32,
        chunk_count_z: u32,
        create_info_json_length: u32,
        additional_json_length: u32,
    ) -> Self {
        Self {
            version: MAP_VERSION,
            chunk_count_x,
            chunk_count_z,
            create_info_json_length,
            additional_json_length,
        }
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[..MAP_SIGNATURE.len()].copy_from_slice(MAP_SIGNATURE.as_bytes());
        let fields = [
            self.version,
            self.chunk_count_x,
            self.chunk_count_z,
            self.create_info_json_length,
            self.additional_json_length,
        ];
        for (i, field) in fields.iter().enumerate() {
            let start = SIGNATURE_SIZE + i * 4;
            out[start..start + 4].copy_from_slice(&field.to_le_bytes());
        }
        out
    }

    /// Parses and validates the header at the start of `bytes`.
    pub fn parse(bytes: &[u8]) -> Result<Self, MapFileError> {
        if bytes.len() < HEADER_SIZE {
            return Err(MapFileError::TooShort {
                stage: "header",
                expected: HEADER_SIZE,
                found: bytes.len(),
            });
        }

        // The signature is a C string inside a fixed field.
        let field = &bytes[..SIGNATURE_SIZE];
        let end = field.iter().position(|&b| b == 0).unwrap_or(SIGNATURE_SIZE);
        if &field[..end] != MAP_SIGNATURE.as_bytes() {
            return Err(MapFileError::BadSignature);
        }

        let read_u32 = |index: usize| {
            let start = SIGNATURE_SIZE + index * 4;
            u32::from_le_bytes([
                bytes[start],
                bytes[start + 1],
                bytes[start + 2],
                bytes[start + 3],
            ])
        };

        let header = Self {
            version: read_u32(0),
            chunk_count_x: read_u32(1),
            chunk_count_z: read_u32(2),
            create_info_json_length: read_u32(3),
            additional_json_length: read_u32(4),
        };
        if header.version != MAP_VERSION {
            return Err(MapFileError::UnsupportedVersion {
                found: header.version,
                supported: MAP_VERSION,
            });
        }
        Ok(header)
    }
}

#[cfg(test)]
#[path = "map_header_tests.rs"]
mod tests;
