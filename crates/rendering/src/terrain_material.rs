//! The terrain material and the textures it binds.
//!
//! Ground and dirt road are both full PBR sets (albedo, normal and a packed
//! roughness/metallic/occlusion map). The road mask is uploaded as a texture
//! and blended per pixel in `terrain_blend.wgsl`. The draw pass only runs
//! once every texture in the set is resident; a missing one skips the pass
//! and is reported once.

// encase's `ShaderType` derive emits a module-level `check` fn that newer
// rustc reports as dead code; it cannot be silenced at the struct.
#![allow(dead_code)]

use bevy::asset::load_internal_asset;
use bevy::image::{ImageSampler, ImageSamplerDescriptor};
use bevy::math::Affine2;
use bevy::pbr::{ExtendedMaterial, MaterialExtension};
use bevy::prelude::*;
use bevy::render::render_asset::RenderAssetUsages;
use bevy::render::render_resource::{
    AsBindGroup, Extent3d, ShaderRef, ShaderType, TextureDimension, TextureFormat,
};

use terrain::config::{DEFAULT_TEXTURE_SCALING, HEIGHT_EDITOR_TEXTURE_SCALING};
use terrain::editor::EditorState;
use terrain::raster::{PixelRegion, Raster};
use terrain::road_mask::road_mask_span;
use terrain::world::TerrainWorld;

const GROUND_TEXTURE_SIZE: u32 = 64;

pub const TERRAIN_BLEND_SHADER_HANDLE: Handle<Shader> =
    Handle::weak_from_u128(0x5e1d_7a2c_93b4_4f08_a6d1_2c7e_0b9f_3a41);

pub type TerrainMaterial = ExtendedMaterial<StandardMaterial, TerrainExtension>;

pub fn load_terrain_shader(app: &mut App) {
    load_internal_asset!(
        app,
        TERRAIN_BLEND_SHADER_HANDLE,
        "terrain_blend.wgsl",
        Shader::from_wgsl
    );
}

#[derive(ShaderType, Reflect, Debug, Clone, Copy, PartialEq, Default)]
pub struct TerrainBlend {
    /// World XZ extent the road mask covers.
    pub mask_span: Vec2,
    /// Texture repeats across the world, shared by ground and road.
    pub texture_repeat: Vec2,
}

/// Road layer bound on top of the standard ground material.
#[derive(Asset, AsBindGroup, Reflect, Debug, Clone)]
pub struct TerrainExtension {
    #[uniform(100)]
    pub blend: TerrainBlend,
    #[texture(101)]
    #[sampler(102)]
    pub road_mask: Handle<Image>,
    #[texture(103)]
    #[sampler(104)]
    pub ground_rma: Handle<Image>,
    #[texture(105)]
    #[sampler(106)]
    pub road_color: Handle<Image>,
    #[texture(107)]
    #[sampler(108)]
    pub road_normal: Handle<Image>,
    #[texture(109)]
    #[sampler(110)]
    pub road_rma: Handle<Image>,
}

impl MaterialExtension for TerrainExtension {
    fn fragment_shader() -> ShaderRef {
        TERRAIN_BLEND_SHADER_HANDLE.into()
    }
}

#[derive(Resource, Debug, Clone)]
pub struct TerrainMaterialSet {
    pub ground_color: Handle<Image>,
    pub ground_normal: Handle<Image>,
    pub ground_rma: Handle<Image>,
    pub road_color: Handle<Image>,
    pub road_normal: Handle<Image>,
    pub road_rma: Handle<Image>,
    pub road_mask: Handle<Image>,
    pub material: Handle<TerrainMaterial>,
}

impl TerrainMaterialSet {
    /// The material to draw with, or `None` while any bound texture is missing.
    pub fn resolve(&self, images: &Assets<Image>) -> Option<Handle<TerrainMaterial>> {
        self.missing_textures(images)
            .is_empty()
            .then(|| self.material.clone())
    }

    pub fn missing_textures(&self, images: &Assets<Image>) -> Vec<&'static str> {
        [
            ("ground color", &self.ground_color),
            ("ground normal", &self.ground_normal),
            ("ground rma", &self.ground_rma),
            ("road color", &self.road_color),
            ("road normal", &self.road_normal),
            ("road rma", &self.road_rma),
            ("road mask", &self.road_mask),
        ]
        .into_iter()
        .filter(|(_, handle)| images.get(*handle).is_none())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Tiling RGBA8 texture filled texel by texel.
fn procedural_texture(format: TextureFormat, texel: impl Fn(u32, u32) -> [u8; 4]) -> Image {
    let size = GROUND_TEXTURE_SIZE;
    let mut data = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            data.extend_from_slice(&texel(x, y));
        }
    }
    Image::new(
        Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        data,
        format,
        RenderAssetUsages::default(),
    )
}

/// Mottled grass tone.
fn ground_color_texture() -> Image {
    procedural_texture(TextureFormat::Rgba8UnormSrgb, |x, y| {
        let n = texel_hash(x, y) as f32 / 255.0;
        [
            (70.0 + 25.0 * n) as u8,
            (105.0 + 35.0 * n) as u8,
            (50.0 + 15.0 * n) as u8,
            255,
        ]
    })
}

/// Packed dirt with darker gravel specks.
fn road_color_texture() -> Image {
    procedural_texture(TextureFormat::Rgba8UnormSrgb, |x, y| {
        let n = texel_hash(x, y) as f32 / 255.0;
        let speck = if texel_hash(y, x) > 230 { 0.6 } else { 1.0 };
        [
            ((105.0 + 30.0 * n) * speck) as u8,
            ((85.0 + 22.0 * n) * speck) as u8,
            ((62.0 + 14.0 * n) * speck) as u8,
            255,
        ]
    })
}

/// Tangent-space normals jittered by up to `128 / divisor`.
fn normal_texture(divisor: i32) -> Image {
    procedural_texture(TextureFormat::Rgba8Unorm, |x, y| {
        let jitter_x = texel_hash(x, y) as i32 - 128;
        let jitter_y = texel_hash(y, x) as i32 - 128;
        [
            (128 + jitter_x / divisor) as u8,
            (128 + jitter_y / divisor) as u8,
            255,
            255,
        ]
    })
}

/// Roughness, metallic and occlusion in r, g, b. Never metallic.
fn rma_texture(roughness: u8, occlusion: u8) -> Image {
    procedural_texture(TextureFormat::Rgba8Unorm, |x, y| {
        let n = texel_hash(x, y) / 16;
        [
            roughness.saturating_sub(n),
            0,
            occlusion.saturating_add(n).saturating_sub(8),
            255,
        ]
    })
}

fn texel_hash(x: u32, y: u32) -> u8 {
    let mut h = x.wrapping_mul(0x8da6_b343) ^ y.wrapping_mul(0xd816_3841);
    h ^= h >> 13;
    h = h.wrapping_mul(0x5bd1_e995);
    (h >> 24) as u8
}

fn mask_byte(weight: f32) -> u8 {
    (weight.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Single-channel copy of the road mask. An unallocated mask becomes one
/// road-free texel so the binding stays valid.
pub fn road_mask_image(mask: &Raster) -> Image {
    let texels = mask
        .read_region(PixelRegion::full(mask.width(), mask.height()))
        .unwrap_or_default();
    let (width, height, data) = if texels.is_empty() {
        (1, 1, vec![0])
    } else {
        let bytes = texels.into_iter().map(mask_byte).collect();
        (mask.width(), mask.height(), bytes)
    };
    let mut image = Image::new(
        Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        data,
        TextureFormat::R8Unorm,
        RenderAssetUsages::default(),
    );
    // The mask covers the world once, so it clamps instead of tiling.
    image.sampler = ImageSampler::Descriptor(ImageSamplerDescriptor::linear());
    image
}

pub fn setup_terrain_material(
    mut commands: Commands,
    mut images: ResMut<Assets<Image>>,
    mut materials: ResMut<Assets<TerrainMaterial>>,
) {
    let ground_color = images.add(ground_color_texture());
    let ground_normal = images.add(normal_texture(8));
    let ground_rma = images.add(rma_texture(235, 255));
    let road_color = images.add(road_color_texture());
    let road_normal = images.add(normal_texture(3));
    let road_rma = images.add(rma_texture(250, 215));
    let road_mask = images.add(road_mask_image(&Raster::default()));

    let material = materials.add(ExtendedMaterial {
        base: StandardMaterial {
            base_color: Color::WHITE,
            base_color_texture: Some(ground_color.clone()),
            normal_map_texture: Some(ground_normal.clone()),
            perceptual_roughness: 0.9,
            ..default()
        },
        extension: TerrainExtension {
            blend: TerrainBlend::default(),
            road_mask: road_mask.clone(),
            ground_rma: ground_rma.clone(),
            road_color: road_color.clone(),
            road_normal: road_normal.clone(),
            road_rma: road_rma.clone(),
        },
    });
    commands.insert_resource(TerrainMaterialSet {
        ground_color,
        ground_normal,
        ground_rma,
        road_color,
        road_normal,
        road_rma,
        road_mask,
        material,
    });
}

/// Re-uploads the road mask after it is re-blitted or resized and keeps the
/// span the shader maps world XZ through in step with the world.
pub fn sync_road_mask_texture(
    world: Res<TerrainWorld>,
    set: Option<Res<TerrainMaterialSet>>,
    mut images: ResMut<Assets<Image>>,
    mut materials: ResMut<Assets<TerrainMaterial>>,
    mut uploaded: Local<Option<(u64, u32, u32)>>,
) {
    let Some(set) = set else {
        return;
    };
    let mask = &world.road_mask;
    let key = (mask.revision(), mask.width(), mask.height());
    if *uploaded == Some(key) {
        return;
    }
    images.insert(&set.road_mask, road_mask_image(mask));

    let span = road_mask_span(&world);
    if let Some(material) = materials.get_mut(&set.material) {
        material.extension.blend.mask_span = span;
    }
    debug!(
        "Uploaded {}x{} road mask spanning {:?}",
        mask.width(),
        mask.height(),
        span
    );
    *uploaded = Some(key);
}

/// Texture repeats across the whole world for the given scaling. Mesh uvs
/// span 0..1 over the world.
pub fn ground_uv_transform(world_width: f32, world_depth: f32, scaling: f32) -> Affine2 {
    Affine2::from_scale(Vec2::new(world_width, world_depth) * scaling)
}

/// Ground and road textures are stretched while the height editor is active
/// so slopes are easier to read.
pub fn update_texture_scaling(
    editor: Res<EditorState>,
    world: Res<TerrainWorld>,
    set: Option<Res<TerrainMaterialSet>>,
    mut materials: ResMut<Assets<TerrainMaterial>>,
) {
    let Some(set) = set else {
        return;
    };
    if !editor.is_changed() && !world.is_changed() && !set.is_changed() {
        return;
    }
    let scaling = if editor.is_height_editing() {
        HEIGHT_EDITOR_TEXTURE_SCALING
    } else {
        DEFAULT_TEXTURE_SCALING
    };
    let transform = ground_uv_transform(world.world_space_width(), world.world_space_depth(), scaling);
    let repeat = Vec2::new(transform.matrix2.x_axis.x, transform.matrix2.y_axis.y);
    let stale = materials.get(&set.material).is_some_and(|material| {
        material.base.uv_transform != transform || material.extension.blend.texture_repeat != repeat
    });
    if !stale {
        return;
    }
    if let Some(material) = materials.get_mut(&set.material) {
        material.base.uv_transform = transform;
        material.extension.blend.texture_repeat = repeat;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terrain::compositor::blit_world_map;
    use terrain::map::MapStore;
    use terrain::road::RoadCurveType;
    use terrain::road_mask::{blit_road_mask, RoadMaskSettings};
    use terrain::world::MapInstanceCreateInfo;

    fn material_set(images: &mut Assets<Image>, skip: &[&str]) -> TerrainMaterialSet {
        let mut add = |name: &str, image: fn() -> Image| {
            if skip.contains(&name) {
                Handle::default()
            } else {
                images.add(image())
            }
        };
        let ground_color = add("ground color", ground_color_texture);
        let ground_normal = add("ground normal", || normal_texture(8));
        let ground_rma = add("ground rma", || rma_texture(235, 255));
        let road_color = add("road color", road_color_texture);
        let road_normal = add("road normal", || normal_texture(3));
        let road_rma = add("road rma", || rma_texture(250, 215));
        let road_mask = add("road mask", || road_mask_image(&Raster::default()));

        let mut materials = Assets::<TerrainMaterial>::default();
        let material = materials.add(ExtendedMaterial {
            base: StandardMaterial::default(),
            extension: TerrainExtension {
                blend: TerrainBlend::default(),
                road_mask: road_mask.clone(),
                ground_rma: ground_rma.clone(),
                road_color: road_color.clone(),
                road_normal: road_normal.clone(),
                road_rma: road_rma.clone(),
            },
        });
        TerrainMaterialSet {
            ground_color,
            ground_normal,
            ground_rma,
            road_color,
            road_normal,
            road_rma,
            road_mask,
            material,
        }
    }

    #[test]
    fn test_resolve_with_every_texture() {
        let mut images = Assets::<Image>::default();
        let set = material_set(&mut images, &[]);
        assert_eq!(set.resolve(&images), Some(set.material.clone()));
        assert!(set.missing_textures(&images).is_empty());
    }

    #[test]
    fn test_resolve_fails_on_missing_texture() {
        let mut images = Assets::<Image>::default();
        let set = material_set(&mut images, &["ground normal"]);
        assert_eq!(set.resolve(&images), None);
        assert_eq!(set.missing_textures(&images), vec!["ground normal"]);
    }

    #[test]
    fn test_missing_road_layer_blocks_draw() {
        let mut images = Assets::<Image>::default();
        let set = material_set(&mut images, &["road rma", "road mask"]);
        assert_eq!(set.resolve(&images), None);
        assert_eq!(set.missing_textures(&images), vec!["road rma", "road mask"]);
    }

    #[test]
    fn test_editor_scaling_stretches_texture() {
        let game = ground_uv_transform(64.0, 128.0, DEFAULT_TEXTURE_SCALING);
        let editor = ground_uv_transform(64.0, 128.0, HEIGHT_EDITOR_TEXTURE_SCALING);
        assert_eq!(game.matrix2.x_axis.x, 32.0);
        assert_eq!(game.matrix2.y_axis.y, 64.0);
        assert!(editor.matrix2.x_axis.x < game.matrix2.x_axis.x);
    }

    #[test]
    fn test_generated_textures_have_full_size() {
        let color = ground_color_texture();
        assert_eq!(color.width(), GROUND_TEXTURE_SIZE);
        assert_eq!(
            color.data.len(),
            (GROUND_TEXTURE_SIZE * GROUND_TEXTURE_SIZE * 4) as usize
        );
    }

    #[test]
    fn test_road_mask_image_quantizes_weights() {
        let mut mask = Raster::new(4, 2);
        mask.upload(&[0.0, 0.25, 0.5, 1.0, -1.0, 2.0, 0.999, 0.001]);
        let image = road_mask_image(&mask);
        assert_eq!(image.width(), 4);
        assert_eq!(image.height(), 2);
        assert_eq!(image.texture_descriptor.format, TextureFormat::R8Unorm);
        assert_eq!(image.data, vec![0, 64, 128, 255, 0, 255, 255, 0]);
    }

    #[test]
    fn test_unallocated_mask_uploads_one_clear_texel() {
        let image = road_mask_image(&Raster::default());
        assert_eq!((image.width(), image.height()), (1, 1));
        assert_eq!(image.data, vec![0]);
    }

    #[test]
    fn test_road_mask_texture_follows_reblit() {
        let mut store = MapStore::default();
        store.new_map("a", 2, 2, 4.0);
        let mut world = TerrainWorld::default();
        world.load_map_instances(&store, &[MapInstanceCreateInfo::new("a", 0, 0)]);
        blit_world_map(&mut world, &store);
        world.add_road(
            &[Vec2::new(0.0, 8.0), Vec2::new(16.0, 8.0)],
            RoadCurveType::Straight,
            1.0,
        );
        assert!(blit_road_mask(&mut world, &RoadMaskSettings::default()));
        let span = road_mask_span(&world);
        let mask_width = world.road_mask.width();

        let mut app = App::new();
        app.init_resource::<Assets<Image>>()
            .init_resource::<Assets<TerrainMaterial>>()
            .insert_resource(world)
            .add_systems(Startup, setup_terrain_material)
            .add_systems(Update, sync_road_mask_texture);
        app.update();

        let set = app.world().resource::<TerrainMaterialSet>().clone();
        let image = app.world().resource::<Assets<Image>>().get(&set.road_mask).unwrap();
        assert_eq!(image.width(), mask_width);
        assert!(image.data.iter().any(|b| *b == 255));
        let materials = app.world().resource::<Assets<TerrainMaterial>>();
        assert_eq!(materials.get(&set.material).unwrap().extension.blend.mask_span, span);

        app.world_mut()
            .resource_mut::<TerrainWorld>()
            .road_mask
            .clear(0.0);
        app.update();
        let image = app.world().resource::<Assets<Image>>().get(&set.road_mask).unwrap();
        assert!(image.data.iter().all(|b| *b == 0));
    }
}
