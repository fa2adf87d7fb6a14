/// Texels along one edge of a chunk. A chunk's vertex grid is one larger so
/// neighbouring chunks share their border row.
pub const HEIGHT_MAP_CHUNK_PIXEL_SIZE: u32 = 32;
pub const CHUNK_VERTEX_EDGE: u32 = HEIGHT_MAP_CHUNK_PIXEL_SIZE + 1;
pub const VERTICES_PER_CHUNK: usize = (CHUNK_VERTEX_EDGE * CHUNK_VERTEX_EDGE) as usize;
pub const INDICES_PER_CHUNK: usize =
    (HEIGHT_MAP_CHUNK_PIXEL_SIZE * HEIGHT_MAP_CHUNK_PIXEL_SIZE * 6) as usize;

/// World units between two adjacent height texels.
pub const HEIGHTMAP_SCALE_XZ: f32 = 0.25;

/// Maximum terrain height in world units. Stored samples in [0,1] map to [0, HEIGHTMAP_SCALE_Y].
pub const HEIGHTMAP_SCALE_Y: f32 = 40.0;

pub const CHUNK_WORLD_SPACE_SIZE: f32 = HEIGHT_MAP_CHUNK_PIXEL_SIZE as f32 * HEIGHTMAP_SCALE_XZ;

/// The road mask is rasterized at this multiple of the height texture resolution.
pub const ROAD_MASK_SCALE: u32 = 4;

pub const MAX_VIEWPORTS: usize = 4;

/// Normalized height change per painted frame at full strength and zero distance.
pub const BRUSH_RATE: f32 = 0.0025;

/// Leading bytes of every map file, zero-padded to the signature field width.
pub const MAP_SIGNATURE: &str = "HELL_MAP";
pub const MAP_VERSION: u32 = 1;
pub const MAP_FILE_EXTENSION: &str = "map";
pub const DEFAULT_MAP_DIRECTORY: &str = "res/maps";

/// Map loaded at startup, created fresh when no file exists yet.
pub const DEFAULT_MAP_NAME: &str = "Shit";
pub const DEFAULT_MAP_CHUNK_COUNT_X: u32 = 8;
pub const DEFAULT_MAP_CHUNK_COUNT_Z: u32 = 16;
pub const DEFAULT_MAP_INITIAL_HEIGHT: f32 = 30.0;

/// Texture coordinate scale applied to the ground material while the height editor is active.
pub const HEIGHT_EDITOR_TEXTURE_SCALING: f32 = 0.1;
pub const DEFAULT_TEXTURE_SCALING: f32 = 0.5;

/// Distance the cursor ray is marched before it is considered to miss the terrain.
pub const MOUSE_RAY_MAX_DISTANCE: f32 = 2000.0;
