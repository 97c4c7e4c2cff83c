use quartz_nbt::io::{Flavor, NbtIoError};
use std::io::Cursor;

pub use quartz_nbt::{NbtCompound, NbtList, NbtTag};

pub fn tag<'a>(compound: &'a NbtCompound, key: &str) -> Option<&'a NbtTag> {
    compound.inner().get(key)
}

pub fn compound<'a>(compound: &'a NbtCompound, key: &str) -> Option<&'a NbtCompound> {
    match tag(compound, key)? {
        NbtTag::Compound(value) => Some(value),
        _ => None,
    }
}

pub fn list<'a>(compound: &'a NbtCompound, key: &str) -> Option<&'a NbtList> {
    match tag(compound, key)? {
        NbtTag::List(value) => Some(value),
        _ => None,
    }
}

pub fn string<'a>(compound: &'a NbtCompound, key: &str) -> Option<&'a str> {
    match tag(compound, key)? {
        NbtTag::String(value) => Some(value.as_str()),
        _ => None,
    }
}

pub fn long_array<'a>(compound: &'a NbtCompound, key: &str) -> Option<&'a [i64]> {
    match tag(compound, key)? {
        NbtTag::LongArray(value) => Some(value.as_slice()),
        _ => None,
    }
}

pub fn int_array<'a>(compound: &'a NbtCompound, key: &str) -> Option<&'a [i32]> {
    match tag(compound, key)? {
        NbtTag::IntArray(value) => Some(value.as_slice()),
        _ => None,
    }
}

/// Integer lookup that accepts any integer tag width.
///
/// Section `Y` is a byte in most versions but has been written as an int by
/// third-party tools, so the width is not trusted.
pub fn int(compound: &NbtCompound, key: &str) -> Option<i64> {
    match tag(compound, key)? {
        NbtTag::Byte(v) => Some(*v as i64),
        NbtTag::Short(v) => Some(*v as i64),
        NbtTag::Int(v) => Some(*v as i64),
        NbtTag::Long(v) => Some(*v),
        NbtTag::Float(_)
        | NbtTag::Double(_)
        | NbtTag::String(_)
        | NbtTag::List(_)
        | NbtTag::Compound(_)
        | NbtTag::ByteArray(_)
        | NbtTag::IntArray(_)
        | NbtTag::LongArray(_) => None,
    }
}

/// The compound elements of a list, skipping anything else.
pub fn compounds(list: &NbtList) -> impl Iterator<Item = &NbtCompound> {
    list.iter().filter_map(|tag| match tag {
        NbtTag::Compound(compound) => Some(compound),
        _ => None,
    })
}

/// Whether a tag holds no elements. Scalars count as non-empty.
pub fn is_empty_value(tag: &NbtTag) -> bool {
    match tag {
        NbtTag::List(list) => list.len() == 0,
        NbtTag::Compound(compound) => compound.inner().is_empty(),
        NbtTag::ByteArray(array) => array.is_empty(),
        NbtTag::IntArray(array) => array.is_empty(),
        NbtTag::LongArray(array) => array.is_empty(),
        NbtTag::String(value) => value.is_empty(),
        NbtTag::Byte(_)
        | NbtTag::Short(_)
        | NbtTag::Int(_)
        | NbtTag::Long(_)
        | NbtTag::Float(_)
        | NbtTag::Double(_) => false,
    }
}

/// Copies `key` from `source` into `target` when it exists.
pub fn copy_key(source: &NbtCompound, target: &mut NbtCompound, key: &str) {
    if let Some(value) = tag(source, key) {
        target.insert(key, value.clone());
    }
}

/// Parse an uncompressed NBT blob into its root compound.
pub fn read_compound(bytes: &[u8]) -> Result<NbtCompound, NbtIoError> {
    let (root, _) = quartz_nbt::io::read_nbt(&mut Cursor::new(bytes), Flavor::Uncompressed)?;
    Ok(root)
}

/// Serialize a root compound as an uncompressed NBT blob.
pub fn write_compound(root: &NbtCompound) -> Result<Vec<u8>, NbtIoError> {
    let mut out = Vec::new();
    quartz_nbt::io::write_nbt(&mut out, None, root, Flavor::Uncompressed)?;
    Ok(out)
}
