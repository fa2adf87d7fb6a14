//! Named height maps and the object/spawn data stored alongside them.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{HEIGHTMAP_SCALE_Y, HEIGHT_MAP_CHUNK_PIXEL_SIZE};
use crate::raster::Raster;

type JsonObject = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpawnPoint {
    #[serde(rename = "Position")]
    pub position: Vec3,
    #[serde(rename = "CamEuler", default)]
    pub cam_euler: Vec3,
}

impl SpawnPoint {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            cam_euler: Vec3::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HouseLocation {
    #[serde(rename = "Position")]
    pub position: Vec3,
    #[serde(rename = "Rotation", default)]
    pub rotation: f32,
    #[serde(rename = "Type", default)]
    pub house_type: String,
}

/// Spawns and house placements. Unrecognised keys survive a load/save cycle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AdditionalMapData {
    #[serde(rename = "HouseLocations", default)]
    pub house_locations: Vec<HouseLocation>,
    #[serde(rename = "CampaignSpawns", default)]
    pub campaign_spawns: Vec<SpawnPoint>,
    #[serde(rename = "DeathmatchSpawns", default)]
    pub deathmatch_spawns: Vec<SpawnPoint>,
    #[serde(flatten)]
    pub extra: JsonObject,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PickUpCreateInfo {
    #[serde(rename = "Position")]
    pub position: Vec3,
    #[serde(rename = "Rotation", default)]
    pub rotation: Vec3,
    #[serde(rename = "Type", default)]
    pub pick_up_type: String,
    #[serde(flatten)]
    pub extra: JsonObject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeCreateInfo {
    #[serde(rename = "Position")]
    pub position: Vec3,
    #[serde(rename = "Rotation", default)]
    pub rotation: Vec3,
    #[serde(rename = "Scale", default = "unit_scale")]
    pub scale: Vec3,
    #[serde(rename = "Type", default)]
    pub tree_type: String,
    #[serde(flatten)]
    pub extra: JsonObject,
}

fn unit_scale() -> Vec3 {
    Vec3::ONE
}

/// Objects placed on a map. Only pick-ups and trees are interpreted here;
/// every other category is carried through untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CreateInfoCollection {
    #[serde(rename = "PickUps", default)]
    pub pick_ups: Vec<PickUpCreateInfo>,
    #[serde(rename = "Trees", default)]
    pub trees: Vec<TreeCreateInfo>,
    #[serde(flatten)]
    pub extra: JsonObject,
}

/// A named height map. `texture` holds normalized samples on the device;
/// `height_map_data` is the host copy last read back or loaded from disk.
#[derive(Debug, Clone, Default)]
pub struct Map {
    name: String,
    chunk_count_x: u32,
    chunk_count_z: u32,
    texture: Raster,
    height_map_data: Vec<f32>,
    additional_map_data: AdditionalMapData,
    create_info_collection: CreateInfoCollection,
}

impl Map {
    /// A map of the given size filled with `initial_height` world units.
    pub fn create_new(name: &str, chunk_count_x: u32, chunk_count_z: u32, initial_height: f32) -> Self {
        let mut map = Self {
            name: name.to_string(),
            chunk_count_x,
            chunk_count_z,
            ..Default::default()
        };
        map.texture = Raster::new(map.texture_width(), map.texture_height());
        map.clear_to_height(initial_height);
        map
    }

    /// Fills the device texture with `height` world units.
    pub fn clear_to_height(&mut self, height: f32) {
        self.texture.clear(height / HEIGHTMAP_SCALE_Y);
    }

    /// Replaces the dimensions and height data, uploading it to the device texture.
    pub fn set_height_map_data(&mut self, chunk_count_x: u32, chunk_count_z: u32, data: Vec<f32>) {
        self.chunk_count_x = chunk_count_x;
        self.chunk_count_z = chunk_count_z;
        self.texture = Raster::new(self.texture_width(), self.texture_height());
        self.texture.upload(&data);
        self.height_map_data = data;
    }

    /// Stores host data read back from the device without changing dimensions.
    pub fn set_read_back_data(&mut self, data: Vec<f32>) {
        self.texture.upload(&data);
        self.height_map_data = data;
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn chunk_count_x(&self) -> u32 {
        self.chunk_count_x
    }

    pub fn chunk_count_z(&self) -> u32 {
        self.chunk_count_z
    }

    pub fn texture_width(&self) -> u32 {
        self.chunk_count_x * HEIGHT_MAP_CHUNK_PIXEL_SIZE
    }

    pub fn texture_height(&self) -> u32 {
        self.chunk_count_z * HEIGHT_MAP_CHUNK_PIXEL_SIZE
    }

    pub fn expected_sample_count(&self) -> usize {
        self.texture_width() as usize * self.texture_height() as usize
    }

    pub fn texture(&self) -> &Raster {
        &self.texture
    }

    pub fn height_map_data(&self) -> &[f32] {
        &self.height_map_data
    }

    pub fn additional_map_data(&self) -> &AdditionalMapData {
        &self.additional_map_data
    }

    pub fn set_additional_map_data(&mut self, data: AdditionalMapData) {
        self.additional_map_data = data;
    }

    pub fn create_info_collection(&self) -> &CreateInfoCollection {
        &self.create_info_collection
    }

    pub fn set_create_info_collection(&mut self, collection: CreateInfoCollection) {
        self.create_info_collection = collection;
    }

    pub fn add_player_campaign_spawn(&mut self, position: Vec3) {
        self.additional_map_data
            .campaign_spawns
            .push(SpawnPoint::at(position));
    }

    pub fn add_player_deathmatch_spawn(&mut self, position: Vec3) {
        self.additional_map_data
            .deathmatch_spawns
            .push(SpawnPoint::at(position));
    }
}

/// Every map known to the process, addressed by name or index.
#[derive(Resource, Debug, Default)]
pub struct MapStore {
    maps: Vec<Map>,
}

impl MapStore {
    pub fn new_map(&mut self, name: &str, chunk_count_x: u32, chunk_count_z: u32, initial_height: f32) -> usize {
        self.insert(Map::create_new(name, chunk_count_x, chunk_count_z, initial_height))
    }

    /// Adds `map`, replacing any map with the same name. Returns its index.
    pub fn insert(&mut self, map: Map) -> usize {
        if let Some(index) = self.index_of(map.name()) {
            self.maps[index] = map;
            index
        } else {
            self.maps.push(map);
            self.maps.len() - 1
        }
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.maps.iter().position(|m| m.name() == name)
    }

    pub fn get(&self, index: usize) -> Option<&Map> {
        self.maps.get(index)
    }

    /// Like [`MapStore::get`], but logs when `index` is out of range.
    pub fn get_by_index(&self, index: usize) -> Option<&Map> {
        let map = self.maps.get(index);
        if map.is_none() {
            error!(
                "MapStore::get_by_index: index {} out of range ({} maps)",
                index,
                self.maps.len()
            );
        }
        map
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Map> {
        self.maps.get_mut(index)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Map> {
        self.maps.iter().find(|m| m.name() == name)
    }

    pub fn get_by_name_mut(&mut self, name: &str) -> Option<&mut Map> {
        self.maps.iter_mut().find(|m| m.name() == name)
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Map> {
        self.maps.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.maps.iter().map(Map::name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::PixelRegion;

    #[test]
    fn test_create_new_normalizes_height() {
        let map = Map::create_new("Shit", 8, 16, 30.0);
        assert_eq!(map.texture_width(), 256);
        assert_eq!(map.texture_height(), 512);
        let texels = map
            .texture()
            .read_region(PixelRegion::full(256, 512))
            .unwrap();
        assert!(texels.iter().all(|&t| t == 0.75));
        assert!(map.height_map_data().is_empty());
    }

    #[test]
    fn test_set_height_map_data_resizes_texture() {
        let mut map = Map::create_new("a", 1, 1, 0.0);
        let data = vec![0.25; 64 * 32];
        map.set_height_map_data(2, 1, data.clone());
        assert_eq!(map.texture().width(), 64);
        assert_eq!(map.texture().height(), 32);
        assert_eq!(map.height_map_data(), data.as_slice());
    }

    #[test]
    fn test_store_insert_replaces_by_name() {
        let mut store = MapStore::default();
        let a = store.new_map("a", 1, 1, 0.0);
        let b = store.new_map("b", 1, 1, 0.0);
        let a2 = store.new_map("a", 2, 2, 0.0);
        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get_by_name("a").unwrap().chunk_count_x(), 2);
        assert!(store.get(5).is_none());
        assert_eq!(store.get(0).unwrap().name(), "a");
    }

    #[test]
    fn test_additional_data_json_keys_and_unknown_fields() {
        let json = r#"{
            "CampaignSpawns": [{"Position": [1.0, 2.0, 3.0], "CamEuler": [0.0, 1.5, 0.0]}],
            "DeathmatchSpawns": [],
            "HouseLocations": [{"Position": [4.0, 0.0, 4.0], "Rotation": 1.0, "Type": "MEDIUM"}],
            "Lighting": {"Sun": 0.5}
        }"#;
        let data: AdditionalMapData = serde_json::from_str(json).unwrap();
        assert_eq!(data.campaign_spawns[0].position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(data.house_locations[0].house_type, "MEDIUM");
        assert!(data.extra.contains_key("Lighting"));

        let written = serde_json::to_value(&data).unwrap();
        assert!(written.get("Lighting").is_some());
        assert!(written.get("HouseLocations").is_some());
    }

    #[test]
    fn test_create_info_collection_keeps_other_categories() {
        let json = r#"{
            "PickUps": [{"Position": [0.0, 1.0, 0.0], "Rotation": [0.0, 0.0, 0.0], "Type": "SHOTGUN_AMMO", "Respawn": true}],
            "Trees": [{"Position": [5.0, 0.0, 5.0], "Type": "TREE_LARGE_0"}],
            "Doors": [{"Position": [1.0, 0.0, 1.0]}]
        }"#;
        let collection: CreateInfoCollection = serde_json::from_str(json).unwrap();
        assert_eq!(collection.pick_ups.len(), 1);
        assert_eq!(
            collection.pick_ups[0].extra.get("Respawn"),
            Some(&serde_json::Value::Bool(true))
        );
        assert_eq!(collection.trees[0].scale, Vec3::ONE);
        assert!(collection.extra.contains_key("Doors"));
    }

    #[test]
    fn test_spawn_adders() {
        let mut map = Map::create_new("a", 1, 1, 0.0);
        map.add_player_campaign_spawn(Vec3::X);
        map.add_player_deathmatch_spawn(Vec3::Y);
        map.add_player_deathmatch_spawn(Vec3::Z);
        assert_eq!(map.additional_map_data().campaign_spawns.len(), 1);
        assert_eq!(map.additional_map_data().deathmatch_spawns.len(), 2);
        assert_eq!(map.additional_map_data().deathmatch_spawns[1].position, Vec3::Z);
    }

    #[test]
    fn test_store_index_lookups() {
        let mut store = MapStore::default();
        store.new_map("a", 1, 1, 0.0);
        store.new_map("b", 2, 2, 0.0);
        assert_eq!(store.names(), vec!["a", "b"]);
        assert_eq!(store.get_by_index(1).map(Map::chunk_count_x), Some(2));
        assert!(store.get_by_index(2).is_none());
        assert_eq!(store.index_of("b"), Some(1));
    }
}
