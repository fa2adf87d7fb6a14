//! Map file encoding: header, raw height grid, then the create-info and
//! additional map data JSON blobs.
//!
//! Heights are stored as normalized little-endian `f32` samples, row-major,
//! `chunk_count_x * 32` wide. The JSON blobs are pretty-printed UTF-8.

use terrain::config::HEIGHT_MAP_CHUNK_PIXEL_SIZE;
use terrain::map::{AdditionalMapData, CreateInfoCollection, Map};

use crate::map_error::MapFileError;
use crate::map_header::{MapFileHeader, HEADER_SIZE};


/// Serializes `map` using its host height data.
///
/// Fails without producing bytes if the host data does not match the map's
/// texture size, e.g. when the map was never read back from the world.
pub fn encode_map(map: &Map) -> Result<Vec<u8>, MapFileError> {
    let width = map.texture_width();
    let height = map.texture_height();
    let samples = map.height_map_data();
    if samples.len() != width as usize * height as usize {
        return Err(MapFileError::HeightDataSizeMismatch {
            found: samples.len(),
            width,
            height,
        });
    }

    let create_info_json = serde_json::to_string_pretty(map.create_info_collection())
        .map_err(|e| MapFileError::Json {
            stage: "create info json",
            message: e.to_string(),
        })?;
    let additional_json = serde_json::to_string_pretty(map.additional_map_data())
        .map_err(|e| MapFileError::Json {
            stage: "additional json",
            message: e.to_string(),
        })?;

    let header = MapFileHeader::new(
        map.chunk_count_x(),
        map.chunk_count_z(),
        create_info_json.len() as u32,
        additional_json.len() as u32,
    );

    let mut out = Vec::with_capacity(
        HEADER_SIZE + samples.len() * 4 + create_info_json.len() + additional_json.len(),
    );
    out.extend_from_slice(&header.encode());
    for sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }
    out.extend_from_slice(create_info_json.as_bytes());
    out.extend_from_slice(additional_json.as_bytes());
    Ok(out)
}

/// Parses a map file. Nothing is returned unless every section is present
/// and valid.
pub fn decode_map(name: &str, bytes: &[u8]) -> Result<Map, MapFileError> {
    let header = MapFileHeader::parse(bytes)?;
    let (width, height) = texture_size(&header)?;
    let mut cursor = HEADER_SIZE;

    let sample_count = (width as usize).saturating_mul(height as usize);
    let height_bytes = take(
        bytes,
        &mut cursor,
        sample_count.saturating_mul(4),
        "height data",
    )?;
    let samples: Vec<f32> = height_bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    let create_info_bytes = take(
        bytes,
        &mut cursor,
        header.create_info_json_length as usize,
        "create info json",
    )?;
    let additional_bytes = take(
        bytes,
        &mut cursor,
        header.additional_json_length as usize,
        "additional json",
    )?;

    let collection: CreateInfoCollection = parse_json(create_info_bytes, "create info json")?;
    let additional: AdditionalMapData = parse_json(additional_bytes, "additional json")?;

    let mut map = Map::default();
    map.set_name(name);
    map.set_height_map_data(header.chunk_count_x, header.chunk_count_z, samples);
    map.set_create_info_collection(collection);
    map.set_additional_map_data(additional);
    Ok(map)
}

/// Texel size of the height grid the header declares. Both axes must hold
/// at least one chunk, and the world texture (one texel wider) must still fit
/// in a `u32`.
fn texture_size(header: &MapFileHeader) -> Result<(u32, u32), MapFileError> {
    let axis = |chunks: u32| {
        chunks
            .checked_mul(HEIGHT_MAP_CHUNK_PIXEL_SIZE)
            .filter(|texels| *texels > 0 && *texels < u32::MAX)
    };
    match (axis(header.chunk_count_x), axis(header.chunk_count_z)) {
        (Some(width), Some(height)) => Ok((width, height)),
        _ => Err(MapFileError::InvalidChunkCount {
            x: header.chunk_count_x,
            z: header.chunk_count_z,
        }),
    }
}

fn take<'a>(
    bytes: &'a [u8],
    cursor: &mut usize,
    len: usize,
    stage: &'static str,
) -> Result<&'a [u8], MapFileError> {
    let end = cursor.saturating_add(len);
    if end > bytes.len() {
        return Err(MapFileError::TooShort {
            stage,
            expected: len,
            found: bytes.len().saturating_sub(*cursor),
        });
    }
    let slice = &bytes[*cursor..end];
    *cursor = end;
    Ok(slice)
}

/// An empty blob is read as the default value.
fn parse_json<T: Default + serde::de::DeserializeOwned>(
    bytes: &[u8],
    stage: &'static str,
) -> Result<T, MapFileError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(bytes).map_err(|e| MapFileError::Json {
        stage,
        message: e.to_string(),
    })
}
