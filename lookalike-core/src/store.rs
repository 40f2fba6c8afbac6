//! Persisted mapping from dataset identifier to perceptual hash.
//!
//! On disk the store is a JSON object mapping each identifier (a path
//! relative to the dataset root, `/`-separated) to the canonical hex form of
//! its hash:
//!
//! ```json
//! {
//!   "cases/a.png": "c3a5f0e1d2b49687",
//!   "reference.jpg": "8f0f1e3c3c78f0e0"
//! }
//! ```
//!
//! Hex values are kept verbatim in memory. Entries that fail to decode are
//! skipped when a snapshot is taken for matching rather than failing the
//! whole load, so one bad entry never hides the others.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};

use crate::error::{LookalikeError, Result};
use crate::phash::{PerceptualHash, DEFAULT_HASH_BITS};

/// A dataset item with a decoded fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetEntry {
    pub identifier: String,
    pub hash: PerceptualHash,
}

/// A stored entry whose hex text could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub identifier: String,
    pub reason: String,
}

/// Decoded view of a store at one hash length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub entries: Vec<DatasetEntry>,
    pub skipped: Vec<SkippedEntry>,
}

impl StoreSnapshot {
    /// Number of decoded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// In-memory identifier to hash mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashStore {
    entries: BTreeMap<String, String>,
}

impl HashStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from a JSON file.
    ///
    /// A missing file yields an empty store. A file that is not a JSON object
    /// of strings fails with [`LookalikeError::CorruptStore`].
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "Hash store not found, starting empty");
                return Ok(Self::new());
            }
            Err(e) => return Err(e.into()),
        };

        let store = Self::from_json_slice(&bytes).map_err(|e| LookalikeError::CorruptStore {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        info!(path = %path.display(), entries = store.len(), "Loaded hash store");
        Ok(store)
    }

    /// Parse the persisted JSON form.
    pub fn from_json_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        let entries: BTreeMap<String, String> = serde_json::from_slice(bytes)?;
        Ok(Self { entries })
    }

    /// Serialize to the persisted JSON form (2-space indent, sorted keys).
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.entries)
    }

    /// Write the store to `path`.
    ///
    /// The JSON is written to a sibling temporary file and renamed over the
    /// target, so the file is either fully replaced or left unchanged.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json_pretty().map_err(std::io::Error::from)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = temp_path_for(path);
        if let Err(e) = fs::write(&tmp_path, json.as_bytes()) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp_path, path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        info!(path = %path.display(), entries = self.len(), "Saved hash store");
        Ok(())
    }

    /// Insert or replace the hash for `identifier`.
    pub fn insert(&mut self, identifier: impl Into<String>, hash: &PerceptualHash) {
        self.insert_raw(identifier, hash.to_hex());
    }

    /// Insert a hex string as-is, without validating it.
    pub fn insert_raw(&mut self, identifier: impl Into<String>, hex: impl Into<String>) {
        let identifier = identifier.into();
        if self.entries.insert(identifier.clone(), hex.into()).is_some() {
            debug!(identifier = %identifier, "Replaced existing hash");
        }
    }

    /// Stored hex text for `identifier`.
    pub fn get(&self, identifier: &str) -> Option<&str> {
        self.entries.get(identifier).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw `(identifier, hex)` pairs in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Decode every entry at `bit_len` bits.
    ///
    /// Entries with malformed hex, or a length other than `bit_len`, are
    /// reported in [`StoreSnapshot::skipped`].
    pub fn get_all(&self, bit_len: usize) -> StoreSnapshot {
        let mut snapshot = StoreSnapshot::default();

        for (identifier, hex) in &self.entries {
            match PerceptualHash::from_hex_with_bits(hex, bit_len) {
                Ok(hash) => snapshot.entries.push(DatasetEntry {
                    identifier: identifier.clone(),
                    hash,
                }),
                Err(e) => {
                    warn!(identifier = %identifier, error = %e, "Skipping malformed store entry");
                    snapshot.skipped.push(SkippedEntry {
                        identifier: identifier.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        snapshot
    }
}

impl FromIterator<(String, PerceptualHash)> for HashStore {
    fn from_iter<I: IntoIterator<Item = (String, PerceptualHash)>>(iter: I) -> Self {
        let mut store = Self::new();
        for (identifier, hash) in iter {
            store.insert(identifier, &hash);
        }
        store
    }
}

/// `dir/.name.tmp` next to the target so the rename stays on one filesystem.
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_else(|| OsStr::new("hashes")));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Publishes decoded store snapshots to concurrent readers.
///
/// Each published store is decoded once, at the bit length fixed on
/// construction, so lookups never re-parse hex and malformed entries are
/// logged once per publish. Readers take an `Arc` and keep using it for the
/// whole lookup; a rebuild swaps the reference without touching snapshots
/// already handed out. The lock is held only to clone or replace the `Arc`.
#[derive(Debug)]
pub struct SharedStore {
    bit_len: usize,
    current: RwLock<Arc<StoreSnapshot>>,
}

impl Default for SharedStore {
    fn default() -> Self {
        Self::new(&HashStore::new(), DEFAULT_HASH_BITS)
    }
}

impl SharedStore {
    pub fn new(store: &HashStore, bit_len: usize) -> Self {
        Self {
            bit_len,
            current: RwLock::new(Arc::new(store.get_all(bit_len))),
        }
    }

    /// Hash length every published store is decoded at.
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// The decoded store visible to new lookups.
    pub fn snapshot(&self) -> Arc<StoreSnapshot> {
        let guard = self
            .current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&*guard)
    }

    /// Decode and publish a rebuilt store, returning the snapshot it replaces.
    pub fn replace(&self, store: &HashStore) -> Arc<StoreSnapshot> {
        // Decode outside the lock
        let next = Arc::new(store.get_all(self.bit_len));
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        info!(
            entries = next.len(),
            skipped = next.skipped.len(),
            "Published new hash store snapshot"
        );
        std::mem::replace(&mut *guard, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::TempDir;

    fn hash(byte: u8) -> PerceptualHash {
        PerceptualHash::from_bytes(vec![byte; 8])
    }

    #[test]
    fn test_load_missing_file_yields_empty_store() {
        let temp = TempDir::new().unwrap();
        let store = HashStore::load(&temp.path().join("hashes.json")).unwrap();
        assert!(store.is_empty());
        assert!(store.get_all(64).entries.is_empty());
    }

    #[test]
    fn test_load_corrupt_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("hashes.json");

        for contents in ["not json at all", "[\"a\", \"b\"]", "{\"a.png\": 42}", ""] {
            fs::write(&path, contents).unwrap();
            let err = HashStore::load(&path).unwrap_err();
            assert!(
                matches!(err, LookalikeError::CorruptStore { .. }),
                "{contents:?} should be reported as corrupt"
            );
        }
    }

    #[test]
    fn test_load_is_whitespace_insensitive() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("hashes.json");
        fs::write(
            &path,
            "\n  {\"a.png\":\"0000000000000001\",\n\n   \"b/c.jpg\" :  \"ffffffffffffffff\" }  \n",
        )
        .unwrap();

        let store = HashStore::load(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("b/c.jpg"), Some("ffffffffffffffff"));
    }

    #[test]
    fn test_save_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("hashes.json");

        let mut store = HashStore::new();
        store.insert("reference.jpg", &hash(0xAB));
        store.insert("cases/one.png", &hash(0x01));
        store.insert_raw("cases/broken.png", "not-a-hash");
        store.save(&path).unwrap();

        let loaded = HashStore::load(&path).unwrap();
        assert_eq!(loaded, store);
        assert_eq!(loaded.get("reference.jpg"), Some("abababababababab"));
        assert_eq!(loaded.get("cases/broken.png"), Some("not-a-hash"));
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("hashes.json");

        let mut store = HashStore::new();
        store.insert("a.png", &hash(0x00));
        store.save(&path).unwrap();
        store.insert("b.png", &hash(0xFF));
        store.save(&path).unwrap();

        let names: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![OsString::from("hashes.json")]);
        assert_eq!(HashStore::load(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_save_failure_leaves_target_unchanged() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("hashes.json");

        let mut original = HashStore::new();
        original.insert("a.png", &hash(0x0F));
        original.save(&path).unwrap();

        // A directory squatting on the temp path makes the write fail
        fs::create_dir(temp_path_for(&path)).unwrap();
        let mut updated = original.clone();
        updated.insert("b.png", &hash(0xF0));
        assert!(updated.save(&path).is_err());

        assert_eq!(HashStore::load(&path).unwrap(), original);
    }

    #[test]
    fn test_persisted_form_is_pretty_json() {
        let mut store = HashStore::new();
        store.insert("b.png", &hash(0x02));
        store.insert("a.png", &hash(0x01));
        let json = store.to_json_pretty().unwrap();
        assert_eq!(
            json,
            "{\n  \"a.png\": \"0101010101010101\",\n  \"b.png\": \"0202020202020202\"\n}"
        );
    }

    #[test]
    fn test_insert_is_last_write_wins() {
        let mut store = HashStore::new();
        store.insert("a.png", &hash(0x01));
        store.insert("a.png", &hash(0x02));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a.png"), Some("0202020202020202"));
    }

    #[test]
    fn test_get_all_skips_malformed_entries() {
        let mut store = HashStore::new();
        store.insert("good.png", &hash(0x11));
        store.insert_raw("short.png", "abcd");
        store.insert_raw("nonhex.png", "zzzzzzzzzzzzzzzz");

        let snapshot = store.get_all(64);
        assert_eq!(snapshot.entries.len(), 1);
        assert_eq!(snapshot.entries[0].identifier, "good.png");
        assert_eq!(snapshot.entries[0].hash, hash(0x11));

        let skipped: Vec<_> = snapshot.skipped.iter().map(|s| s.identifier.as_str()).collect();
        assert_eq!(skipped, vec!["nonhex.png", "short.png"]);
    }

    #[test]
    fn test_from_iterator() {
        let store: HashStore = vec![
            ("a.png".to_string(), hash(0x01)),
            ("a.png".to_string(), hash(0x03)),
            ("b.png".to_string(), hash(0x02)),
        ]
        .into_iter()
        .collect();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a.png"), Some("0303030303030303"));
    }

    #[test]
    fn test_temp_path_is_hidden_sibling() {
        assert_eq!(
            temp_path_for(Path::new("data/hashes.json")),
            PathBuf::from("data/.hashes.json.tmp")
        );
    }

    #[test]
    fn test_shared_store_swap_keeps_old_snapshots() {
        let mut first = HashStore::new();
        first.insert("a.png", &hash(0x01));
        let shared = SharedStore::new(&first, 64);

        let before = shared.snapshot();

        let mut second = first.clone();
        second.insert("b.png", &hash(0x02));
        let replaced = shared.replace(&second);

        assert_eq!(*replaced, first.get_all(64));
        assert_eq!(before.len(), 1);
        assert_eq!(shared.snapshot().len(), 2);
    }

    #[test]
    fn test_shared_store_decodes_once_per_publish() {
        let mut store = HashStore::new();
        store.insert("a.png", &hash(0x01));
        store.insert_raw("bad.png", "zz");
        store.insert_raw("short.png", "abcd");
        let shared = SharedStore::new(&store, 64);
        assert_eq!(shared.bit_len(), 64);

        let first = shared.snapshot();
        let second = shared.snapshot();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 1);
        let skipped: Vec<_> = first.skipped.iter().map(|s| s.identifier.as_str()).collect();
        assert_eq!(skipped, vec!["bad.png", "short.png"]);

        shared.replace(&store);
        let republished = shared.snapshot();
        assert!(!Arc::ptr_eq(&first, &republished));
        assert_eq!(*republished, *first);
    }

    #[test]
    fn test_shared_store_concurrent_readers() {
        let shared = Arc::new(SharedStore::default());

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let snapshot = shared.snapshot();
                        // Every published store has either 0 or 8 entries
                        assert!(snapshot.len() == 0 || snapshot.len() == 8);
                    }
                })
            })
            .collect();

        let full: HashStore = (0..8u8)
            .map(|i| (format!("{i}.png"), hash(i)))
            .collect();
        shared.replace(&full);

        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(shared.snapshot().len(), 8);
    }
}
