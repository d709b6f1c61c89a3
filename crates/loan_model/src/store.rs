//! Artifact Store
//!
//! Filesystem persistence for [`ModelBundle`]s at a fixed path. Writes go to
//! a temporary file in the target directory and are renamed into place, so a
//! reader never observes a half-written artifact.

use crate::bundle::ModelBundle;
use crate::errors::{ModelError, Result};
use crate::serde_canon::to_canonical_json;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    path: PathBuf,
}

impl ArtifactStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Serialize `bundle` to the store path, creating parent directories
    pub fn write(&self, bundle: &ModelBundle) -> Result<()> {
        let persistence = |source: std::io::Error| ModelError::Persistence {
            path: self.path.clone(),
            source,
        };

        let parent = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(persistence)?;

        let json = to_canonical_json(bundle)?;

        let mut tmp = NamedTempFile::new_in(&parent).map_err(persistence)?;
        tmp.write_all(json.as_bytes()).map_err(persistence)?;
        tmp.as_file().sync_all().map_err(persistence)?;
        tmp.persist(&self.path).map_err(|e| persistence(e.error))?;

        info!(
            path = %self.path.display(),
            bytes = json.len(),
            hash = %bundle.content_hash,
            "model bundle written"
        );
        Ok(())
    }

    /// Load and verify the bundle at the store path
    pub fn read(&self) -> Result<ModelBundle> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(ModelError::NotFound(self.path.clone()))
            }
            Err(source) => {
                return Err(ModelError::Persistence {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let corruption = |reason: String| ModelError::Corruption {
            path: self.path.clone(),
            reason,
        };

        let bundle: ModelBundle =
            serde_json::from_str(&json).map_err(|e| corruption(e.to_string()))?;
        bundle.verify().map_err(|e| corruption(e.to_string()))?;

        debug!(
            path = %self.path.display(),
            hash = %bundle.content_hash,
            trees = bundle.forest.num_trees(),
            "model bundle loaded"
        );
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::tests::sample_bundle;
    use crate::record::RawRecord;
    use tempfile::tempdir;

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("models/nested/loan_model.json"));
        let bundle = sample_bundle();

        store.write(&bundle).unwrap();
        assert!(store.exists());

        let loaded = store.read().unwrap();
        assert_eq!(loaded, bundle);

        let record = RawRecord::from_pairs([
            ("education", "Not Graduate"),
            ("cibil_score", "612.5"),
            ("residential_assets_value", "10"),
            ("bank_asset_value", "20"),
        ]);
        assert_eq!(
            loaded.predict_record(&record, 1).unwrap(),
            bundle.predict_record(&record, 1).unwrap()
        );
    }

    #[test]
    fn missing_artifact_is_not_found() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("absent.json"));
        assert!(matches!(store.read(), Err(ModelError::NotFound(_))));
    }

    #[test]
    fn garbage_is_corruption() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            ArtifactStore::new(&path).read(),
            Err(ModelError::Corruption { .. })
        ));
    }

    #[test]
    fn edited_artifact_fails_hash_check() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("model.json"));
        store.write(&sample_bundle()).unwrap();

        let json = fs::read_to_string(store.path()).unwrap();
        let edited = json.replace("\"mean\":600.0", "\"mean\":601.0");
        assert_ne!(json, edited);
        fs::write(store.path(), edited).unwrap();

        assert!(matches!(store.read(), Err(ModelError::Corruption { .. })));
    }

    #[test]
    fn unwritable_parent_is_persistence_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let store = ArtifactStore::new(blocker.join("model.json"));
        assert!(matches!(
            store.write(&sample_bundle()),
            Err(ModelError::Persistence { .. })
        ));
    }
}
