use std::{
    fs,
    path::{Path, PathBuf},
};

use super::StorageBackend;
use crate::{
    core::utils::{ensure_dir, write_atomic},
    errors::Result,
};

const FILE_EXTENSION: &str = "json";
// Escapes always carry two hex digits, so `%em` cannot come from a real key.
const EMPTY_KEY_NAME: &str = "%empty";

/// Stores each key as a pretty-printed JSON file inside one directory.
#[derive(Debug, Clone)]
pub struct JsonStorage {
    root: PathBuf,
}

impl JsonStorage {
    pub fn new(root: PathBuf) -> Result<Self> {
        ensure_dir(&root)?;
        Ok(Self { root })
    }

    pub fn base_dir(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", canonical_name(key), FILE_EXTENSION))
    }
}

impl StorageBackend for JsonStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn write(&self, key: &str, data: &str) -> Result<()> {
        write_atomic(&self.path_for(key), data)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// Maps a storage key to a file stem. Characters outside `[A-Za-z0-9._@-]`
/// are written as `%XX` per UTF-8 byte, so distinct keys never share a file.
fn canonical_name(key: &str) -> String {
    if key.is_empty() {
        return EMPTY_KEY_NAME.into();
    }
    let mut name = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'@' => {
                name.push(char::from(byte))
            }
            _ => name.push_str(&format!("%{byte:02X}")),
        }
    }
    name
}
