//! Map files on disk: `<directory>/<name>.map`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bevy::prelude::*;
use terrain::config::MAP_FILE_EXTENSION;
use terrain::map::Map;

use crate::atomic_write::atomic_write;
use crate::map_codec::{decode_map, encode_map};
use crate::map_error::MapFileError;

pub fn map_path(directory: &Path, name: &str) -> PathBuf {
    directory.join(format!("{name}.{MAP_FILE_EXTENSION}"))
}

/// Reads and decodes the map called `name`. The returned map is fully
/// formed; nothing is returned on a partial read.
pub fn load_map_file(directory: &Path, name: &str) -> Result<Map, MapFileError> {
    let path = map_path(directory, name);
    let bytes = std::fs::read(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => MapFileError::MapNotFound(name.to_string()),
        _ => MapFileError::Io(e),
    })?;
    let map = decode_map(name, &bytes)?;
    debug!(
        "Loaded map \"{}\" from {} ({}x{} chunks)",
        name,
        path.display(),
        map.chunk_count_x(),
        map.chunk_count_z()
    );
    Ok(map)
}

/// Encodes `map` and atomically replaces its file. Validation happens before
/// the file is opened, so a rejected map leaves any existing file intact.
pub fn save_map_file(map: &Map, directory: &Path) -> Result<PathBuf, MapFileError> {
    let bytes = encode_map(map)?;
    let path = map_path(directory, map.name());
    atomic_write(&path, &bytes)?;
    Ok(path)
}
