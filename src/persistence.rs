//! Key/value storage for network parameter snapshots.
//!
//! Trained parameters leave the core only as [`NetworkParameters`]; where they
//! end up is the store's business.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};

use crate::error::{QDriveError, Result};
use crate::network::NetworkParameters;

/// Key the trainer saves the final parameters under unless configured otherwise.
pub const DEFAULT_PARAMETERS_KEY: &str = "best_brain";

/// Persistence collaborator: stores parameter snapshots by key.
pub trait ParameterStore {
    fn save(&mut self, key: &str, params: &NetworkParameters) -> Result<()>;

    /// `Ok(None)` when nothing is stored under `key`.
    fn load(&self, key: &str) -> Result<Option<NetworkParameters>>;

    fn remove(&mut self, key: &str) -> Result<()>;
}

/// In-process store holding bincode blobs.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ParameterStore for MemoryStore {
    fn save(&mut self, key: &str, params: &NetworkParameters) -> Result<()> {
        self.entries.insert(key.to_string(), params.to_bytes()?);
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<NetworkParameters>> {
        self.entries
            .get(key)
            .map(|bytes| NetworkParameters::from_bytes(bytes))
            .transpose()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// On-disk encoding used by [`FileStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StoreFormat {
    #[default]
    Json,
    Bincode,
}

impl StoreFormat {
    fn extension(self) -> &'static str {
        match self {
            StoreFormat::Json => "json",
            StoreFormat::Bincode => "bin",
        }
    }
}

/// One file per key inside a directory.
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
    format: StoreFormat,
}

impl FileStore {
    /// Create the store, creating `dir` if needed.
    pub fn new<P: AsRef<Path>>(dir: P, format: StoreFormat) -> Result<Self> {
        fs::create_dir_all(dir.as_ref())?;
        Ok(FileStore {
            dir: dir.as_ref().to_path_buf(),
            format,
        })
    }

    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(QDriveError::invalid_parameter(
                "key".to_string(),
                format!("'{}' is not a valid store key", key),
            ));
        }
        Ok(self.dir.join(format!("{}.{}", key, self.format.extension())))
    }
}

impl ParameterStore for FileStore {
    fn save(&mut self, key: &str, params: &NetworkParameters) -> Result<()> {
        let path = self.path_for(key)?;
        match self.format {
            StoreFormat::Json => fs::write(path, params.to_json()?)?,
            StoreFormat::Bincode => fs::write(path, params.to_bytes()?)?,
        }
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<NetworkParameters>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let params = match self.format {
            StoreFormat::Json => NetworkParameters::from_json(&fs::read_to_string(path)?)?,
            StoreFormat::Bincode => NetworkParameters::from_bytes(&fs::read(path)?)?,
        };
        Ok(Some(params))
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

impl<S: ParameterStore + ?Sized> ParameterStore for &mut S {
    fn save(&mut self, key: &str, params: &NetworkParameters) -> Result<()> {
        (**self).save(key, params)
    }

    fn load(&self, key: &str) -> Result<Option<NetworkParameters>> {
        (**self).load(key)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}
