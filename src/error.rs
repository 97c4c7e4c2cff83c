use thiserror::Error;

/// A packed block-state array that cannot be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("packed word {word} out of bounds (array holds {len} words)")]
    WordOutOfBounds { word: usize, len: usize },
    #[error("no bit width >= {min_bits} matches {len} words for a palette of {palette_len}")]
    BitWidthMismatch {
        len: usize,
        palette_len: usize,
        min_bits: u32,
    },
    #[error("unsupported bit width {0}")]
    InvalidBitWidth(u32),
    #[error("palette slot {slot} outside palette of {palette_len}")]
    SlotOutOfPalette { slot: u32, palette_len: usize },
    #[error("flat index {0} outside the 4096 entries of a section")]
    IndexOutOfRange(usize),
    #[error("section Y {0} outside -128..=127")]
    SectionOutOfRange(i64),
    #[error("chunk at ({x}, {z}) with scale {scale} does not fit the target")]
    PlacementOutOfBounds { x: usize, z: usize, scale: usize },
}

/// No capability binding exists for a chunk's data version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unsupported data version {version}")]
pub struct UnsupportedVersionError {
    pub version: i32,
}

/// A raw filter value that was rejected at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidFilterValueError {
    #[error("filter value is empty")]
    Empty,
    #[error("malformed block name `{0}`")]
    MalformedBlockName(String),
    #[error("unknown structure `{0}`")]
    UnknownStructure(String),
    #[error("comparator `{0}` does not apply to this filter")]
    UnsupportedComparator(String),
}

/// Failure of the overlay cache backend.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("overlay blob inflates to {0} bytes, expected 4096")]
    BlobSize(usize),
    #[error("overlay holds {0} values, expected 1024")]
    OverlayLength(usize),
    #[error("invalid overlay table name `{0}`")]
    InvalidKind(String),
    #[error("cache store is closed")]
    Closed,
    #[error("cache lock poisoned")]
    Poisoned,
}

/// Settings that could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("scale {0} is not a power of two between 1 and 16")]
    InvalidScale(usize),
}

/// Everything that can make a single chunk unrenderable or unfilterable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    UnsupportedVersion(#[from] UnsupportedVersionError),
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;
