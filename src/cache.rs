use crate::chunk::{RegionPos, CHUNKS_PER_REGION};
use crate::config::CacheSettings;
use crate::error::{CacheError, CacheResult};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex, MutexGuard};

const FILE_TIMES: &str = "file_times";

/// One overlay producer and its variant, e.g. `InhabitedTime` + `""`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OverlayKind {
    pub name: String,
    #[serde(default)]
    pub variant: String,
}

impl OverlayKind {
    pub fn new(name: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variant: variant.into(),
        }
    }

    /// Table name, restricted to ASCII letters, digits and underscores so
    /// it can be spliced into SQL.
    pub fn table(&self) -> CacheResult<String> {
        let table = format!("{}{}", self.name, self.variant);
        let valid = !table.is_empty()
            && table != FILE_TIMES
            && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid {
            Ok(table)
        } else {
            Err(CacheError::InvalidKind(table))
        }
    }
}

impl fmt::Display for OverlayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.variant)
    }
}

pub fn compress_overlay(values: &[i32]) -> CacheResult<Vec<u8>> {
    if values.len() != CHUNKS_PER_REGION {
        return Err(CacheError::OverlayLength(values.len()));
    }
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    for value in values {
        encoder.write_all(&value.to_be_bytes())?;
    }
    Ok(encoder.finish()?)
}

pub fn decompress_overlay(blob: &[u8]) -> CacheResult<Vec<i32>> {
    let mut bytes = Vec::with_capacity(CHUNKS_PER_REGION * 4);
    GzDecoder::new(blob).read_to_end(&mut bytes)?;
    if bytes.len() != CHUNKS_PER_REGION * 4 {
        return Err(CacheError::BlobSize(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

struct Store {
    path: PathBuf,
    conn: Connection,
    kinds: Vec<OverlayKind>,
    /// Every table in the file, `file_times` included.
    tables: Vec<String>,
}

impl Store {
    fn open(path: &Path, kinds: &[OverlayKind]) -> CacheResult<Self> {
        let conn = Connection::open(path)?;
        let mut store = Store {
            path: path.to_path_buf(),
            conn,
            kinds: kinds.to_vec(),
            tables: Vec::new(),
        };
        for kind in kinds {
            store.create_table(&kind.table()?)?;
        }
        store.conn.execute(
            "CREATE TABLE IF NOT EXISTS file_times (p INTEGER PRIMARY KEY, t INTEGER)",
            [],
        )?;
        store.tables = store.list_tables()?;
        Ok(store)
    }

    fn create_table(&self, table: &str) -> CacheResult<()> {
        self.conn.execute(
            &format!("CREATE TABLE IF NOT EXISTS \"{table}\" (p INTEGER PRIMARY KEY, d BLOB)"),
            [],
        )?;
        Ok(())
    }

    fn list_tables(&self) -> CacheResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn close(self) -> CacheResult<()> {
        let path = self.path;
        self.conn.close().map_err(|(_, err)| CacheError::Sqlite(err))?;
        tracing::debug!(path = %path.display(), "closed overlay cache");
        Ok(())
    }
}

/// Opens `path`, recreating the file once if it is not a usable database.
/// Busy, locked and I/O failures are returned without touching the file.
fn open_or_recreate(path: &Path, kinds: &[OverlayKind]) -> CacheResult<Store> {
    match Store::open(path, kinds) {
        Err(err) if is_corrupt(&err) => {
            tracing::warn!(path = %path.display(), error = %err, "overlay cache unusable, recreating");
            remove_file(path)?;
            Store::open(path, kinds)
        }
        opened => opened,
    }
}

fn is_corrupt(err: &CacheError) -> bool {
    matches!(
        err,
        CacheError::Sqlite(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: ErrorCode::NotADatabase | ErrorCode::DatabaseCorrupt,
                ..
            },
            _,
        ))
    )
}

fn remove_file(path: &Path) -> CacheResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

enum State {
    Pending,
    Open(Store),
    Closed,
}

/// Per-region overlay arrays in a local SQLite file. Accessors block until
/// [`OverlayCache::switch_to`] attaches a store and fail with
/// [`CacheError::Closed`] after [`OverlayCache::close`].
pub struct OverlayCache {
    state: Mutex<State>,
    ready: Condvar,
}

impl Default for OverlayCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OverlayCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state.try_lock().as_deref() {
            Ok(State::Pending) => "pending",
            Ok(State::Open(_)) => "open",
            Ok(State::Closed) => "closed",
            Err(_) => "busy",
        };
        f.debug_struct("OverlayCache").field("state", &state).finish()
    }
}

impl OverlayCache {
    /// A cache that has no store yet; accessors wait for [`Self::switch_to`].
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::Pending),
            ready: Condvar::new(),
        }
    }

    pub fn open(path: impl AsRef<Path>, kinds: &[OverlayKind]) -> CacheResult<Self> {
        let cache = Self::new();
        cache.switch_to(path, kinds)?;
        Ok(cache)
    }

    pub fn from_settings(settings: &CacheSettings) -> CacheResult<Self> {
        Self::open(&settings.path, &settings.kinds)
    }

    fn lock(&self) -> CacheResult<MutexGuard<'_, State>> {
        self.state.lock().map_err(|_| CacheError::Poisoned)
    }

    /// Runs `f` on the open store, waiting for it if necessary.
    fn with_store<T>(&self, f: impl FnOnce(&mut Store) -> CacheResult<T>) -> CacheResult<T> {
        let guard = self.lock()?;
        let mut guard = self
            .ready
            .wait_while(guard, |state| matches!(state, State::Pending))
            .map_err(|_| CacheError::Poisoned)?;
        match &mut *guard {
            State::Open(store) => f(store),
            _ => Err(CacheError::Closed),
        }
    }

    /// Points the cache at `path`, closing the previous store first. A file
    /// that cannot be opened or initialised is deleted and created afresh.
    pub fn switch_to(&self, path: impl AsRef<Path>, kinds: &[OverlayKind]) -> CacheResult<()> {
        let path = path.as_ref();
        let mut guard = self.lock()?;
        if let State::Open(store) = std::mem::replace(&mut *guard, State::Pending) {
            if let Err(err) = store.close() {
                tracing::warn!(error = %err, "failed to close previous overlay cache");
            }
        }
        let opened = open_or_recreate(path, kinds);
        self.publish(&mut guard, opened)
    }

    /// Installs the outcome of an open and wakes every waiting accessor.
    fn publish(&self, state: &mut State, opened: CacheResult<Store>) -> CacheResult<()> {
        let result = match opened {
            Ok(store) => {
                tracing::debug!(
                    path = %store.path.display(),
                    tables = store.tables.len(),
                    "opened overlay cache"
                );
                *state = State::Open(store);
                Ok(())
            }
            Err(err) => {
                *state = State::Closed;
                Err(err)
            }
        };
        self.ready.notify_all();
        result
    }

    pub fn is_open(&self) -> bool {
        matches!(self.lock().as_deref(), Ok(State::Open(_)))
    }

    /// Path of the open store.
    pub fn path(&self) -> Option<PathBuf> {
        match self.lock().as_deref() {
            Ok(State::Open(store)) => Some(store.path.clone()),
            _ => None,
        }
    }

    /// Closes the store. Waiting and later accessors fail with
    /// [`CacheError::Closed`].
    pub fn close(&self) -> CacheResult<()> {
        let mut guard = self.lock()?;
        let previous = std::mem::replace(&mut *guard, State::Closed);
        self.ready.notify_all();
        match previous {
            State::Open(store) => store.close(),
            _ => Ok(()),
        }
    }

    pub fn get(&self, kind: &OverlayKind, region: RegionPos) -> CacheResult<Option<Vec<i32>>> {
        let table = kind.table()?;
        self.with_store(|store| {
            if !store.tables.contains(&table) {
                return Ok(None);
            }
            let blob: Option<Vec<u8>> = store
                .conn
                .query_row(
                    &format!("SELECT d FROM \"{table}\" WHERE p = ?1"),
                    params![region.as_long()],
                    |row| row.get(0),
                )
                .optional()?;
            blob.map(|blob| decompress_overlay(&blob)).transpose()
        })
    }

    /// Inserts or replaces the overlay of `region`.
    pub fn put(&self, kind: &OverlayKind, region: RegionPos, values: &[i32]) -> CacheResult<()> {
        let table = kind.table()?;
        let blob = compress_overlay(values)?;
        self.with_store(|store| {
            if !store.tables.contains(&table) {
                store.create_table(&table)?;
                store.tables.push(table.clone());
                store.kinds.push(kind.clone());
            }
            store.conn.execute(
                &format!(
                    "INSERT INTO \"{table}\" (p, d) VALUES (?1, ?2) \
                     ON CONFLICT(p) DO UPDATE SET d = excluded.d"
                ),
                params![region.as_long(), blob],
            )?;
            Ok(())
        })
    }

    /// Removes one overlay of `region`.
    pub fn delete_kind(&self, kind: &OverlayKind, region: RegionPos) -> CacheResult<()> {
        let table = kind.table()?;
        self.with_store(|store| {
            if store.tables.contains(&table) {
                store.conn.execute(
                    &format!("DELETE FROM \"{table}\" WHERE p = ?1"),
                    params![region.as_long()],
                )?;
            }
            Ok(())
        })
    }

    /// Removes every overlay of `region`, and its file time.
    pub fn delete(&self, region: RegionPos) -> CacheResult<()> {
        self.with_store(|store| {
            for table in &store.tables {
                store.conn.execute(
                    &format!("DELETE FROM \"{table}\" WHERE p = ?1"),
                    params![region.as_long()],
                )?;
            }
            Ok(())
        })
    }

    pub fn get_file_time(&self, region: RegionPos) -> CacheResult<Option<i64>> {
        self.with_store(|store| {
            let time = store
                .conn
                .query_row(
                    "SELECT t FROM file_times WHERE p = ?1",
                    params![region.as_long()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(time)
        })
    }

    pub fn set_file_time(&self, region: RegionPos, time: i64) -> CacheResult<()> {
        self.with_store(|store| {
            store.conn.execute(
                "INSERT INTO file_times (p, t) VALUES (?1, ?2) \
                 ON CONFLICT(p) DO UPDATE SET t = excluded.t",
                params![region.as_long(), time],
            )?;
            Ok(())
        })
    }

    /// Deletes the store file and starts over with the same overlay kinds.
    /// A closed cache stays closed.
    pub fn clear(&self) -> CacheResult<()> {
        let guard = self.lock()?;
        let mut guard = self
            .ready
            .wait_while(guard, |state| matches!(state, State::Pending))
            .map_err(|_| CacheError::Poisoned)?;
        let store = match std::mem::replace(&mut *guard, State::Pending) {
            State::Open(store) => store,
            other => {
                *guard = other;
                return Ok(());
            }
        };

        let (path, kinds) = (store.path.clone(), store.kinds.clone());
        let opened = store
            .close()
            .and_then(|()| remove_file(&path))
            .and_then(|()| {
                tracing::debug!(path = %path.display(), "cleared overlay cache");
                Store::open(&path, &kinds)
            });
        self.publish(&mut guard, opened)
    }
}

impl Drop for OverlayCache {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            tracing::warn!(error = %err, "failed to close overlay cache on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn kinds() -> Vec<OverlayKind> {
        vec![
            OverlayKind::new("InhabitedTime", ""),
            OverlayKind::new("BlockAmount", "minecraft_diamond_ore"),
        ]
    }

    fn overlay(seed: i32) -> Vec<i32> {
        (0..1024).map(|i| i * seed - 512).collect()
    }

    #[test]
    fn test_blob_roundtrip_and_size_check() {
        let values = overlay(7);
        let blob = compress_overlay(&values).unwrap();
        assert_eq!(decompress_overlay(&blob).unwrap(), values);

        assert!(matches!(
            compress_overlay(&[1, 2, 3]),
            Err(CacheError::OverlayLength(3))
        ));

        let mut short = GzEncoder::new(Vec::new(), Compression::default());
        short.write_all(&[0; 12]).unwrap();
        let short = short.finish().unwrap();
        assert!(matches!(decompress_overlay(&short), Err(CacheError::BlobSize(12))));
    }

    #[test]
    fn test_table_names_validated() {
        assert_eq!(OverlayKind::new("Entities", "").table().unwrap(), "Entities");
        assert!(OverlayKind::new("Block", "minecraft:stone").table().is_err());
        assert!(OverlayKind::new("x\"; DROP TABLE file_times; --", "").table().is_err());
        assert!(OverlayKind::new("file_times", "").table().is_err());
        assert!(OverlayKind::new("", "").table().is_err());
    }

    #[test]
    fn test_put_get_and_upsert() {
        let dir = tempfile::tempdir().unwrap();
        let cache = OverlayCache::open(dir.path().join("cache.db"), &kinds()).unwrap();
        let kind = &kinds()[0];
        let region = RegionPos::new(-3, 12);

        assert_eq!(cache.get(kind, region).unwrap(), None);
        cache.put(kind, region, &overlay(1)).unwrap();
        assert_eq!(cache.get(kind, region).unwrap(), Some(overlay(1)));
        cache.put(kind, region, &overlay(2)).unwrap();
        assert_eq!(cache.get(kind, region).unwrap(), Some(overlay(2)));
        assert_eq!(cache.get(&kinds()[1], region).unwrap(), None);
    }

    #[test]
    fn test_unregistered_kind_created_on_put() {
        let dir = tempfile::tempdir().unwrap();
        let cache = OverlayCache::open(dir.path().join("cache.db"), &[]).unwrap();
        let kind = OverlayKind::new("Status", "");
        let region = RegionPos::new(0, 0);
        assert_eq!(cache.get(&kind, region).unwrap(), None);
        cache.put(&kind, region, &overlay(3)).unwrap();
        assert_eq!(cache.get(&kind, region).unwrap(), Some(overlay(3)));
    }

    #[test]
    fn test_file_times() {
        let dir = tempfile::tempdir().unwrap();
        let cache = OverlayCache::open(dir.path().join("cache.db"), &kinds()).unwrap();
        let region = RegionPos::new(1, 1);
        assert_eq!(cache.get_file_time(region).unwrap(), None);
        cache.set_file_time(region, 1_700_000_000_000).unwrap();
        cache.set_file_time(region, 1_700_000_000_500).unwrap();
        assert_eq!(cache.get_file_time(region).unwrap(), Some(1_700_000_000_500));
    }

    #[test]
    fn test_delete_region_and_kind() {
        let dir = tempfile::tempdir().unwrap();
        let cache = OverlayCache::open(dir.path().join("cache.db"), &kinds()).unwrap();
        let region = RegionPos::new(4, -4);
        let other = RegionPos::new(4, -5);
        for kind in kinds() {
            cache.put(&kind, region, &overlay(5)).unwrap();
            cache.put(&kind, other, &overlay(6)).unwrap();
        }
        cache.set_file_time(region, 10).unwrap();

        cache.delete_kind(&kinds()[1], other).unwrap();
        assert_eq!(cache.get(&kinds()[1], other).unwrap(), None);
        assert!(cache.get(&kinds()[0], other).unwrap().is_some());

        cache.delete(region).unwrap();
        for kind in kinds() {
            assert_eq!(cache.get(&kind, region).unwrap(), None);
        }
        assert_eq!(cache.get_file_time(region).unwrap(), None);
        assert!(cache.get(&kinds()[0], other).unwrap().is_some());
    }

    #[test]
    fn test_corrupted_store_recreated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");
        std::fs::write(&path, vec![0xAB; 8192]).unwrap();

        let cache = OverlayCache::open(&path, &kinds()).unwrap();
        let region = RegionPos::new(0, 1);
        cache.put(&kinds()[0], region, &overlay(9)).unwrap();
        assert_eq!(cache.get(&kinds()[0], region).unwrap(), Some(overlay(9)));
    }

    #[test]
    fn test_locked_store_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");
        let region = RegionPos::new(3, -7);
        {
            let cache = OverlayCache::open(&path, &kinds()).unwrap();
            cache.put(&kinds()[0], region, &overlay(8)).unwrap();
        }

        let holder = Connection::open(&path).unwrap();
        holder.execute_batch("BEGIN EXCLUSIVE").unwrap();
        let err = OverlayCache::open(&path, &kinds()).unwrap_err();
        assert!(matches!(err, CacheError::Sqlite(_)));
        assert!(!is_corrupt(&err));
        holder.execute_batch("COMMIT").unwrap();
        drop(holder);

        let cache = OverlayCache::open(&path, &kinds()).unwrap();
        assert_eq!(cache.get(&kinds()[0], region).unwrap(), Some(overlay(8)));
    }

    #[test]
    fn test_switch_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.db");
        let second = dir.path().join("second.db");
        let region = RegionPos::new(2, 2);
        let kind = &kinds()[0];

        let cache = OverlayCache::open(&first, &kinds()).unwrap();
        cache.put(kind, region, &overlay(1)).unwrap();
        cache.switch_to(&second, &kinds()).unwrap();
        assert_eq!(cache.path(), Some(second.clone()));
        assert_eq!(cache.get(kind, region).unwrap(), None);

        cache.switch_to(&first, &kinds()).unwrap();
        assert_eq!(cache.get(kind, region).unwrap(), Some(overlay(1)));

        cache.clear().unwrap();
        assert!(cache.is_open());
        assert_eq!(cache.get(kind, region).unwrap(), None);
        cache.put(kind, region, &overlay(4)).unwrap();
        assert_eq!(cache.get(kind, region).unwrap(), Some(overlay(4)));
    }

    #[test]
    fn test_closed_cache_rejects_access() {
        let dir = tempfile::tempdir().unwrap();
        let cache = OverlayCache::open(dir.path().join("cache.db"), &kinds()).unwrap();
        cache.close().unwrap();
        assert!(!cache.is_open());
        assert!(matches!(
            cache.get_file_time(RegionPos::new(0, 0)),
            Err(CacheError::Closed)
        ));
        cache.clear().unwrap();
        assert!(!cache.is_open());
    }

    #[test]
    fn test_accessors_wait_for_first_switch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");
        let cache = Arc::new(OverlayCache::new());

        let reader = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.get_file_time(RegionPos::new(5, 5)))
        };
        thread::sleep(Duration::from_millis(50));
        assert!(!reader.is_finished());

        cache.switch_to(&path, &kinds()).unwrap();
        assert_eq!(reader.join().unwrap().unwrap(), None);
    }
}
