use crate::chunk::Chunk;
use crate::error::{InvalidFilterValueError, UnsupportedVersionError};
use crate::nbt::NbtCompound;
use crate::version::{ChunkFilter, VersionRegistry};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

const DEFAULT_NAMESPACE: &str = "minecraft";

/// A raw filter value: `"stone, dirt"` or `["stone", "dirt"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawFilterValue {
    Text(String),
    List(Vec<String>),
}

impl RawFilterValue {
    /// Comma separated tokens with all whitespace removed.
    pub fn tokens(&self) -> Result<Vec<String>, InvalidFilterValueError> {
        let joined = match self {
            RawFilterValue::Text(text) => text.clone(),
            RawFilterValue::List(items) => items.join(","),
        };
        let stripped: String = joined.chars().filter(|c| !c.is_whitespace()).collect();
        if stripped.is_empty() {
            return Err(InvalidFilterValueError::Empty);
        }
        Ok(stripped.split(',').map(str::to_string).collect())
    }
}

impl From<&str> for RawFilterValue {
    fn from(value: &str) -> Self {
        RawFilterValue::Text(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Comparator {
    Contains,
    ContainsNot,
    Intersects,
    Equal,
    NotEqual,
}

impl Comparator {
    /// Parses the short operator form used in query strings.
    pub fn from_query_str(op: &str) -> Option<Self> {
        match op {
            "\\" | "contains" => Some(Comparator::Contains),
            "!\\" | "contains-not" => Some(Comparator::ContainsNot),
            "><" | "intersects" => Some(Comparator::Intersects),
            "=" | "equal" => Some(Comparator::Equal),
            "!=" | "not-equal" => Some(Comparator::NotEqual),
            _ => None,
        }
    }

    pub fn query_str(&self) -> &'static str {
        match self {
            Comparator::Contains => "\\",
            Comparator::ContainsNot => "!\\",
            Comparator::Intersects => "><",
            Comparator::Equal => "=",
            Comparator::NotEqual => "!=",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.query_str())
    }
}

/// A comparator plus its raw value, as stored in saved queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawQuery {
    pub comparator: Comparator,
    pub value: RawFilterValue,
}

/// `'name'` unwraps to `name`; anything else is `None`.
fn unquote(token: &str) -> Option<&str> {
    let inner = token.strip_prefix('\'')?.strip_suffix('\'')?;
    (!inner.is_empty() && !inner.contains(['\'', '"'])).then_some(inner)
}

fn is_id_char(c: char) -> bool {
    matches!(c, 'a'..='z' | '0'..='9' | '_' | '-' | '.' | '/')
}

/// Adds the `minecraft:` namespace to bare names. Quoted names are taken
/// as written.
pub fn parse_block_name(token: &str) -> Result<String, InvalidFilterValueError> {
    if let Some(custom) = unquote(token) {
        return Ok(custom.to_string());
    }
    let malformed = || InvalidFilterValueError::MalformedBlockName(token.to_string());
    let (namespace, path) = match token.split_once(':') {
        Some((namespace, path)) => (namespace, path),
        None => (DEFAULT_NAMESPACE, token),
    };
    if namespace.is_empty() || path.is_empty() {
        return Err(malformed());
    }
    if !namespace.chars().all(is_id_char) || !path.chars().all(is_id_char) {
        return Err(malformed());
    }
    Ok(format!("{namespace}:{path}"))
}

pub fn parse_block_names(raw: &RawFilterValue) -> Result<Vec<String>, InvalidFilterValueError> {
    let mut names: Vec<String> = Vec::new();
    for token in raw.tokens()? {
        let name = parse_block_name(&token)?;
        if !names.contains(&name) {
            names.push(name);
        }
    }
    Ok(names)
}

/// Known structure names, matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct StructureCatalog {
    canonical: FxHashMap<String, String>,
}

impl StructureCatalog {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let canonical = names
            .into_iter()
            .map(Into::into)
            .map(|name: String| (name.to_lowercase(), name))
            .collect();
        Self { canonical }
    }

    /// One name per line; blank lines and `#` comments are skipped.
    pub fn from_lines(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        )
    }

    /// The catalog's spelling of `name`, ignoring case.
    pub fn canonical(&self, name: &str) -> Option<&str> {
        self.canonical
            .get(&name.to_lowercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    /// Lower-cased names; unknown names fail unless quoted.
    pub fn parse_names(&self, raw: &RawFilterValue) -> Result<Vec<String>, InvalidFilterValueError> {
        let mut names: Vec<String> = Vec::new();
        for token in raw.tokens()? {
            let name = match unquote(&token) {
                Some(custom) => custom.to_lowercase(),
                None if self.canonical(&token).is_some() => token.to_lowercase(),
                None => return Err(InvalidFilterValueError::UnknownStructure(token)),
            };
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Ok(names)
    }
}

/// Block palette predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteQuery {
    comparator: Comparator,
    names: Vec<String>,
}

impl PaletteQuery {
    pub fn new(comparator: Comparator, raw: &RawFilterValue) -> Result<Self, InvalidFilterValueError> {
        Ok(Self {
            comparator,
            names: parse_block_names(raw)?,
        })
    }

    pub fn from_raw(raw: &RawQuery) -> Result<Self, InvalidFilterValueError> {
        Self::new(raw.comparator, &raw.value)
    }

    pub fn comparator(&self) -> Comparator {
        self.comparator
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn matches(&self, filter: &dyn ChunkFilter, root: &NbtCompound) -> bool {
        match self.comparator {
            Comparator::Contains => filter.match_block_names(root, &self.names),
            Comparator::ContainsNot => !filter.match_block_names(root, &self.names),
            Comparator::Intersects => filter.match_any_block_name(root, &self.names),
            Comparator::Equal => filter.palette_equals(root, &self.names),
            Comparator::NotEqual => !filter.palette_equals(root, &self.names),
        }
    }

    /// Resolves the chunk's family first; unsupported versions are reported
    /// instead of counted as a miss.
    pub fn matches_chunk(
        &self,
        chunk: &Chunk,
        registry: &VersionRegistry,
    ) -> Result<bool, UnsupportedVersionError> {
        Ok(self.matches(registry.filter(chunk.data_version)?, &chunk.root))
    }
}

impl fmt::Display for PaletteQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Palette {} \"{}\"", self.comparator, self.names.join(","))
    }
}

/// Structure reference predicate.
#[derive(Debug, Clone)]
pub struct StructureQuery {
    comparator: Comparator,
    names: Vec<String>,
    catalog: StructureCatalog,
}

impl StructureQuery {
    pub fn new(
        comparator: Comparator,
        raw: &RawFilterValue,
        catalog: &StructureCatalog,
    ) -> Result<Self, InvalidFilterValueError> {
        if matches!(comparator, Comparator::Equal | Comparator::NotEqual) {
            return Err(InvalidFilterValueError::UnsupportedComparator(
                comparator.query_str().to_string(),
            ));
        }
        Ok(Self {
            comparator,
            names: catalog.parse_names(raw)?,
            catalog: catalog.clone(),
        })
    }

    pub fn from_raw(raw: &RawQuery, catalog: &StructureCatalog) -> Result<Self, InvalidFilterValueError> {
        Self::new(raw.comparator, &raw.value, catalog)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn matches(&self, filter: &dyn ChunkFilter, root: &NbtCompound) -> bool {
        match self.comparator {
            Comparator::ContainsNot => !filter.contains_structures(root, &self.names, &self.catalog),
            Comparator::Intersects => filter.intersects_structures(root, &self.names, &self.catalog),
            _ => filter.contains_structures(root, &self.names, &self.catalog),
        }
    }

    pub fn matches_chunk(
        &self,
        chunk: &Chunk,
        registry: &VersionRegistry,
    ) -> Result<bool, UnsupportedVersionError> {
        Ok(self.matches(registry.filter(chunk.data_version)?, &chunk.root))
    }
}

impl fmt::Display for StructureQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Structures {} \"{}\"", self.comparator, self.names.join(","))
    }
}
