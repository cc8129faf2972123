//! Key-value slot backends: one opaque string value per session key.

use crate::StorageError;
use fs2::FileExt;
use sha2::{Digest, Sha256};
use sidenote_core::SessionKey;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub trait SlotStore {
    fn get(&self, key: &SessionKey) -> Result<Option<String>, StorageError>;
    fn put(&mut self, key: &SessionKey, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &SessionKey) -> Result<bool, StorageError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemorySlots {
    slots: BTreeMap<String, String>,
}

impl MemorySlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.slots.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }
}

impl SlotStore for MemorySlots {
    fn get(&self, key: &SessionKey) -> Result<Option<String>, StorageError> {
        Ok(self.slots.get(key.as_str()).cloned())
    }

    fn put(&mut self, key: &SessionKey, value: &str) -> Result<(), StorageError> {
        self.slots.insert(key.as_str().to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &SessionKey) -> Result<bool, StorageError> {
        Ok(self.slots.remove(key.as_str()).is_some())
    }
}

/// One `<key>.json` file per session inside a data directory.
///
/// Writes go through a temp file and a rename while holding an advisory lock
/// on `<dir>/.lock`. The lock serialises individual writes only; two
/// processes editing the same key still race on read-modify-write.
#[derive(Debug, Clone)]
pub struct FileSlots {
    root: PathBuf,
}

impl FileSlots {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn slot_path(&self, key: &SessionKey) -> PathBuf {
        self.root.join(format!("{}.json", slot_file_stem(key.as_str())))
    }

    fn lock(&self) -> Result<SlotLock, StorageError> {
        fs::create_dir_all(&self.root).map_err(|err| StorageError::io(&self.root, err))?;
        let path = self.root.join(".lock");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|err| StorageError::io(&path, err))?;
        file.lock_exclusive()
            .map_err(|err| StorageError::io(&path, err))?;
        Ok(SlotLock { file })
    }
}

struct SlotLock {
    file: File,
}

impl Drop for SlotLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

impl SlotStore for FileSlots {
    fn get(&self, key: &SessionKey) -> Result<Option<String>, StorageError> {
        let path = self.slot_path(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::io(path, err)),
        }
    }

    fn put(&mut self, key: &SessionKey, value: &str) -> Result<(), StorageError> {
        let _lock = self.lock()?;
        let path = self.slot_path(key);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, value).map_err(|err| StorageError::io(&tmp_path, err))?;
        fs::rename(&tmp_path, &path).map_err(|err| StorageError::io(&path, err))?;
        Ok(())
    }

    fn remove(&mut self, key: &SessionKey) -> Result<bool, StorageError> {
        let _lock = self.lock()?;
        let path = self.slot_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(StorageError::io(path, err)),
        }
    }
}

/// Longest escaped prefix kept before a key is shortened with a digest.
const MAX_STEM_PREFIX: usize = 120;
const STEM_DIGEST_CHARS: usize = 16;

/// File-name-safe form of a session key. Project names come from page
/// headings and can hold anything, so bytes outside `[A-Za-z0-9_-]` are
/// written as `%XX`. Escaped keys longer than `MAX_STEM_PREFIX` keep a
/// readable prefix and end in `~` plus a SHA-256 digest of the whole key;
/// `~` never appears in a plain escaped stem, so the two forms cannot collide.
fn slot_file_stem(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    if out.len() <= MAX_STEM_PREFIX {
        return out;
    }

    let mut cut = MAX_STEM_PREFIX;
    if let Some(escape) = out[..cut].rfind('%') {
        if escape + 3 > cut {
            cut = escape;
        }
    }
    out.truncate(cut);
    out.push('~');
    out.push_str(&sha256_hex(key.as_bytes())[..STEM_DIGEST_CHARS]);
    out
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut output = String::with_capacity(digest.len() * 2);
    for byte in digest {
        output.push_str(&format!("{byte:02x}"));
    }
    output
}
