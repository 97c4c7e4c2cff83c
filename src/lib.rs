pub mod biome;
pub mod block_state;
pub mod cache;
pub mod chunk;
pub mod color;
pub mod config;
pub mod error;
pub mod filter;
pub mod nbt;
pub mod packing;
pub mod render;
pub mod version;

pub use block_state::BlockState;
pub use cache::{OverlayCache, OverlayKind};
pub use chunk::{Chunk, ChunkPos, RegionPos};
pub use color::{ColorMapping, StaticColorMapping};
pub use config::{CacheSettings, RenderMode, RenderSettings};
pub use error::{
    CacheError, ChunkError, ConfigError, DecodeError, InvalidFilterValueError,
    UnsupportedVersionError,
};
pub use filter::{Comparator, PaletteQuery, RawFilterValue, StructureCatalog, StructureQuery};
pub use render::region::{render_chunk, render_region, ChunkFailure};
pub use render::{Placement, RegionImage, TerrainOptions, TileTarget};
pub use version::{registry, Capabilities, ChunkFilter, ChunkRenderer, VersionRegistry};
