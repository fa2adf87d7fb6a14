mod atomic_write;
pub mod map_codec;
pub mod map_error;
pub mod map_header;
pub mod map_io;
mod save_plugin;

pub use map_codec::{decode_map, encode_map};
pub use map_error::MapFileError;
pub use map_io::{load_map_file, map_path, save_map_file};
pub use save_plugin::{LoadMapEvent, MapDirectory, MapSavePlugin, SaveMapEvent};
