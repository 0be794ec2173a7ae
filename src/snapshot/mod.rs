// src/snapshot/mod.rs
pub mod version;

pub use version::Version;

use anyhow::{Context, Result};
use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
};
use tracing::{debug, instrument};

/// Storage entry holding the raw dataset text.
pub const DATASET_KEY: &str = "vin_unit_csv";
/// Storage entry holding the version tag of that text.
pub const VERSION_KEY: &str = "vin_unit_version";

/// Last persisted dataset, as read back from durable storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub text: String,
    /// `None` when the version entry is missing.
    pub version: Option<Version>,
}

/// Durable string key-value storage: one file per key under `dir`.
/// Writes go to a temporary file that is renamed into place.
#[derive(Clone, Debug)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Open a store at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating storage directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let final_path = self.path_for(key);
        let tmp_path = self.path_for(&format!("{key}.tmp"));

        let mut file = fs::File::create(&tmp_path)
            .with_context(|| format!("could not create temporary file `{}`", tmp_path.display()))?;
        file.write_all(value.as_bytes())
            .with_context(|| format!("writing `{}`", tmp_path.display()))?;
        file.sync_all()
            .with_context(|| format!("syncing `{}`", tmp_path.display()))?;
        drop(file);

        fs::rename(&tmp_path, &final_path).with_context(|| {
            format!(
                "failed to rename `{}` to `{}`",
                tmp_path.display(),
                final_path.display()
            )
        })?;
        debug!(key, bytes = value.len(), "stored entry");
        Ok(())
    }

    /// Persist a freshly fetched dataset, overwriting any earlier one.
    #[instrument(level = "info", skip_all, fields(bytes = text.len(), version = %version))]
    pub fn persist(&self, text: &str, version: &Version) -> Result<()> {
        self.set(DATASET_KEY, text)?;
        self.set(VERSION_KEY, &version.to_string())?;
        Ok(())
    }

    /// The last persisted dataset, or `None` if nothing was ever stored.
    pub fn load(&self) -> Result<Option<Snapshot>> {
        let Some(text) = self.get(DATASET_KEY)? else {
            return Ok(None);
        };
        let version = self.get(VERSION_KEY)?.map(|tag| Version::parse(&tag));
        Ok(Some(Snapshot { text, version }))
    }
}
