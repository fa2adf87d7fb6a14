use std::path::PathBuf;

use bevy::prelude::*;
use terrain::config::{
    DEFAULT_MAP_CHUNK_COUNT_X, DEFAULT_MAP_CHUNK_COUNT_Z, DEFAULT_MAP_DIRECTORY,
    DEFAULT_MAP_INITIAL_HEIGHT, DEFAULT_MAP_NAME,
};
use terrain::map::{Map, MapStore};
use terrain::recalculate::{read_back_height_map_data, LoadMapInstances, SyncHeightFieldCollision};
use terrain::road::{RoadCurveType, DEFAULT_ROAD_CONTROL_POINTS, DEFAULT_ROAD_SPACING};
use terrain::world::{MapInstanceCreateInfo, TerrainWorld};
use terrain::TerrainSet;

use crate::map_error::MapFileError;
use crate::map_io::{load_map_file, save_map_file};

// ---------------------------------------------------------------------------
// Resources and events
// ---------------------------------------------------------------------------

/// Directory map files are read from and written to.
#[derive(Resource, Debug, Clone, PartialEq, Eq)]
pub struct MapDirectory(pub PathBuf);

impl Default for MapDirectory {
    fn default() -> Self {
        Self(PathBuf::from(DEFAULT_MAP_DIRECTORY))
    }
}

/// Read the named map back from the world and write it to disk.
#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub struct SaveMapEvent {
    pub map_name: String,
}

/// Load the named map from disk and place it at the world origin.
#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub struct LoadMapEvent {
    pub map_name: String,
}

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

/// Map file persistence. On startup the default map is loaded (or created
/// when no file exists yet), placed, and the default road is laid on it.
pub struct MapSavePlugin;

impl Plugin for MapSavePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MapDirectory>()
            .add_event::<SaveMapEvent>()
            .add_event::<LoadMapEvent>()
            .add_systems(Startup, load_default_map)
            .add_systems(
                Update,
                (load_map_system, save_map_system).before(TerrainSet::Rebuild),
            );
    }
}

fn default_map() -> Map {
    Map::create_new(
        DEFAULT_MAP_NAME,
        DEFAULT_MAP_CHUNK_COUNT_X,
        DEFAULT_MAP_CHUNK_COUNT_Z,
        DEFAULT_MAP_INITIAL_HEIGHT,
    )
}

fn load_default_map(
    directory: Res<MapDirectory>,
    mut store: ResMut<MapStore>,
    mut world: ResMut<TerrainWorld>,
    mut load: EventWriter<LoadMapInstances>,
) {
    let map = match load_map_file(&directory.0, DEFAULT_MAP_NAME) {
        Ok(map) => map,
        Err(MapFileError::MapNotFound(_)) => {
            info!(
                "No saved \"{}\" map in {}, creating a new one",
                DEFAULT_MAP_NAME,
                directory.0.display()
            );
            default_map()
        }
        Err(e) => {
            error!("Failed to load map \"{}\": {e}", DEFAULT_MAP_NAME);
            default_map()
        }
    };
    store.insert(map);
    world.add_road(
        &DEFAULT_ROAD_CONTROL_POINTS,
        RoadCurveType::Bezier,
        DEFAULT_ROAD_SPACING,
    );
    load.send(LoadMapInstances(vec![MapInstanceCreateInfo::new(
        DEFAULT_MAP_NAME,
        0,
        0,
    )]));
}

/// Failed loads leave the store and the world untouched.
fn load_map_system(
    mut events: EventReader<LoadMapEvent>,
    directory: Res<MapDirectory>,
    mut store: ResMut<MapStore>,
    mut load: EventWriter<LoadMapInstances>,
) {
    for event in events.read() {
        match load_map_file(&directory.0, &event.map_name) {
            Ok(map) => {
                store.insert(map);
                load.send(LoadMapInstances(vec![MapInstanceCreateInfo::new(
                    &event.map_name,
                    0,
                    0,
                )]));
            }
            Err(e) => error!("Failed to load map \"{}\": {e}", event.map_name),
        }
    }
}

fn save_map_system(
    mut events: EventReader<SaveMapEvent>,
    directory: Res<MapDirectory>,
    world: Res<TerrainWorld>,
    mut store: ResMut<MapStore>,
    mut sync: EventWriter<SyncHeightFieldCollision>,
) {
    for event in events.read() {
        let Some(index) = store.index_of(&event.map_name) else {
            error!("Save failed: no map named \"{}\"", event.map_name);
            continue;
        };
        let Some(map) = store.get_mut(index) else {
            continue;
        };
        if let Err(e) = read_back_height_map_data(&world, index, map) {
            error!("Save of map \"{}\" aborted: {e}", event.map_name);
            continue;
        }
        match save_map_file(map, &directory.0) {
            Ok(path) => info!("Saved map \"{}\" to {}", event.map_name, path.display()),
            Err(e) => error!("Save of map \"{}\" failed: {e}", event.map_name),
        }
        sync.send(SyncHeightFieldCollision);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map_io::map_path;
    use terrain::collision::HeightFieldRegistry;
    use terrain::TerrainPlugin;

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("terrain_save_plugin_test_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn app_with_directory(dir: &std::path::Path) -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins((TerrainPlugin, MapSavePlugin));
        app.insert_resource(MapDirectory(dir.to_path_buf()));
        app.update();
        app
    }

    #[test]
    fn test_startup_creates_default_map() {
        let dir = test_dir("startup");
        let app = app_with_directory(&dir);

        let store = app.world().resource::<MapStore>();
        let map = store.get_by_name(DEFAULT_MAP_NAME).unwrap();
        assert_eq!((map.chunk_count_x(), map.chunk_count_z()), (8, 16));

        let world = app.world().resource::<TerrainWorld>();
        assert_eq!(world.chunk_count(), 128);
        assert_eq!(world.roads.len(), 1);
        assert!(world.roads[0]
            .world_points
            .iter()
            .all(|p| (p.y - 30.0).abs() < 1e-3));
        assert_eq!(app.world().resource::<HeightFieldRegistry>().fields().len(), 128);

        // Creating the map does not write it.
        assert!(!map_path(&dir, DEFAULT_MAP_NAME).exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_save_event_writes_read_back_heights() {
        let dir = test_dir("save_event");
        let mut app = app_with_directory(&dir);
        app.world_mut()
            .resource_mut::<TerrainWorld>()
            .height_texture
            .clear(0.5);

        app.world_mut().send_event(SaveMapEvent {
            map_name: DEFAULT_MAP_NAME.to_string(),
        });
        app.update();

        let saved = load_map_file(&dir, DEFAULT_MAP_NAME).unwrap();
        assert_eq!(saved.height_map_data().len(), 256 * 512);
        assert!(saved.height_map_data().iter().all(|&h| h == 0.5));
        let world = app.world().resource::<TerrainWorld>();
        assert_eq!(world.chunks()[0].aabb.max.y, 20.0);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_event_replaces_world() {
        let dir = test_dir("load_event");
        let mut other = Map::create_new("other", 2, 3, 0.0);
        other.set_read_back_data(vec![0.25; 64 * 96]);
        save_map_file(&other, &dir).unwrap();

        let mut app = app_with_directory(&dir);
        app.world_mut().send_event(LoadMapEvent {
            map_name: "other".to_string(),
        });
        app.update();

        let world = app.world().resource::<TerrainWorld>();
        assert_eq!((world.chunk_count_x(), world.chunk_count_z()), (2, 3));
        assert_eq!(world.height_at_world_xz(4.0, 4.0), Some(10.0));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_failed_load_keeps_world() {
        let dir = test_dir("failed_load");
        let mut app = app_with_directory(&dir);
        let maps_before = app.world().resource::<MapStore>().len();

        app.world_mut().send_event(LoadMapEvent {
            map_name: "missing".to_string(),
        });
        app.update();

        assert_eq!(app.world().resource::<MapStore>().len(), maps_before);
        assert_eq!(app.world().resource::<TerrainWorld>().chunk_count(), 128);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
