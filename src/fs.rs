// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! In-memory filesystem shared with the inference backend.
//!
//! Model files never touch the host filesystem once loaded: their bytes are
//! uploaded here under generated names and the backend opens them by those
//! names.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{CoreError, Result};

/// Flat name-to-bytes store. Cloning shares the same files.
#[derive(Debug, Clone, Default)]
pub struct VirtualFs {
    files: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl VirtualFs {
    /// Create an empty filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `name` or truncate it, then write `data`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Poisoned`] if the lock is poisoned.
    pub fn upload(&self, name: &str, data: &[u8]) -> Result<()> {
        self.files.write()?.insert(name.to_string(), data.to_vec());
        tracing::debug!(target: "openvinojs::fs", name, bytes = data.len(), "file uploaded");
        Ok(())
    }

    /// Read the full contents of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Io`] if the file does not exist.
    pub fn read(&self, name: &str) -> Result<Vec<u8>> {
        self.files
            .read()?
            .get(name)
            .cloned()
            .ok_or_else(|| not_found(name))
    }

    /// Whether `name` exists.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Poisoned`] if the lock is poisoned.
    pub fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.files.read()?.contains_key(name))
    }

    /// Delete `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Io`] if the file does not exist.
    pub fn remove(&self, name: &str) -> Result<()> {
        self.files
            .write()?
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| not_found(name))
    }

    /// Number of files.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Poisoned`] if the lock is poisoned.
    pub fn len(&self) -> Result<usize> {
        Ok(self.files.read()?.len())
    }

    /// Upload a model's topology and weights under fresh names.
    ///
    /// Names follow `m{millis}.xml` and `m{millis}.bin` for the current wall
    /// clock. A pair already taken gets `m{millis}_1`, `_2` and so on. The
    /// names are chosen and written under one lock, so concurrent uploads
    /// never share a pair.
    ///
    /// Returns the `(xml, bin)` names.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Poisoned`] if the lock is poisoned.
    pub fn upload_model(&self, xml: &[u8], bin: &[u8]) -> Result<(String, String)> {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or_default();
        self.upload_model_at(millis, xml, bin)
    }

    fn upload_model_at(&self, millis: u128, xml: &[u8], bin: &[u8]) -> Result<(String, String)> {
        let (xml_name, bin_name) = {
            let mut files = self.files.write()?;
            let stem = free_stem(&files, millis);
            let xml_name = format!("{stem}.xml");
            let bin_name = format!("{stem}.bin");
            files.insert(xml_name.clone(), xml.to_vec());
            files.insert(bin_name.clone(), bin.to_vec());
            (xml_name, bin_name)
        };
        tracing::debug!(
            target: "openvinojs::fs",
            xml = %xml_name,
            bin = %bin_name,
            xml_bytes = xml.len(),
            bin_bytes = bin.len(),
            "model uploaded"
        );
        Ok((xml_name, bin_name))
    }

    /// Whether the filesystem holds no files.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Poisoned`] if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.files.read()?.is_empty())
    }
}

fn not_found(name: &str) -> CoreError {
    CoreError::io(format!("no such file in virtual filesystem: {name}"))
}

fn free_stem(files: &BTreeMap<String, Vec<u8>>, millis: u128) -> String {
    let mut stem = format!("m{millis}");
    let mut suffix = 0usize;
    while files.contains_key(&format!("{stem}.xml")) || files.contains_key(&format!("{stem}.bin"))
    {
        suffix += 1;
        stem = format!("m{millis}_{suffix}");
    }
    stem
}
