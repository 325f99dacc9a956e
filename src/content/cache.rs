//! On-disk snapshot of the parsed collection.
//!
//! Two JSON files in the cache directory:
//!
//! ```text
//! data/
//! ├── documents.json   publishable documents, newest first
//! └── tags.json        tag list, first-seen order
//! ```
//!
//! The modification time of `documents.json` is the snapshot timestamp. A
//! snapshot is only ever rewritten whole.

use super::document::Document;
use super::error::ContentError;
use serde::{Serialize, de::DeserializeOwned};
use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

const DOCUMENTS_FILE: &str = "documents.json";
const TAGS_FILE: &str = "tags.json";

#[derive(Debug, Clone)]
pub struct CacheSnapshot {
    dir: PathBuf,
    /// Pretty-print in dev mode, compact in production.
    pretty: bool,
}

impl CacheSnapshot {
    pub fn new(dir: impl Into<PathBuf>, pretty: bool) -> Self {
        Self {
            dir: dir.into(),
            pretty,
        }
    }

    pub fn documents_path(&self) -> PathBuf {
        self.dir.join(DOCUMENTS_FILE)
    }

    pub fn tags_path(&self) -> PathBuf {
        self.dir.join(TAGS_FILE)
    }

    /// Snapshot timestamp, `None` unless both files exist.
    pub fn modified(&self) -> Option<SystemTime> {
        if !self.tags_path().is_file() {
            return None;
        }
        fs::metadata(self.documents_path()).and_then(|m| m.modified()).ok()
    }

    pub fn save(&self, documents: &[Document], tags: &[String]) -> Result<(), ContentError> {
        fs::create_dir_all(&self.dir).map_err(|e| ContentError::Io(self.dir.clone(), e))?;
        // tags first: `documents.json` carries the timestamp
        self.write(&self.tags_path(), tags)?;
        self.write(&self.documents_path(), documents)
    }

    pub fn load(&self) -> Result<(Vec<Document>, Vec<String>), ContentError> {
        Ok((read(&self.documents_path())?, read(&self.tags_path())?))
    }

    fn write<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<(), ContentError> {
        let json = if self.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        }
        .map_err(|e| ContentError::Cache(path.to_path_buf(), e))?;

        fs::write(path, json).map_err(|e| ContentError::Io(path.to_path_buf(), e))
    }
}

fn read<T: DeserializeOwned>(path: &Path) -> Result<T, ContentError> {
    let bytes = fs::read(path).map_err(|e| ContentError::Io(path.to_path_buf(), e))?;
    serde_json::from_slice(&bytes).map_err(|e| ContentError::Cache(path.to_path_buf(), e))
}

/// Remove the cache directory. Succeeds when it doesn't exist.
pub fn clear(dir: &Path) -> Result<bool, ContentError> {
    if !dir.exists() {
        return Ok(false);
    }
    fs::remove_dir_all(dir).map_err(|e| ContentError::Io(dir.to_path_buf(), e))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn doc(slug: &str) -> Document {
        Document {
            title: slug.to_uppercase(),
            slug: slug.into(),
            tags: vec!["a".into()],
            ..Document::default()
        }
    }

    #[test]
    fn test_missing_snapshot_has_no_timestamp() {
        let dir = TempDir::new().unwrap();
        assert!(CacheSnapshot::new(dir.path().join("data"), false).modified().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let cache = CacheSnapshot::new(dir.path().join("data"), true);

        cache.save(&[doc("one"), doc("two")], &["a".into()]).unwrap();
        let (documents, tags) = cache.load().unwrap();

        assert_eq!(documents, [doc("one"), doc("two")]);
        assert_eq!(tags, ["a"]);
        assert!(cache.modified().is_some());
    }

    #[test]
    fn test_pretty_vs_compact() {
        let dir = TempDir::new().unwrap();
        let pretty = CacheSnapshot::new(dir.path().join("pretty"), true);
        let compact = CacheSnapshot::new(dir.path().join("compact"), false);

        pretty.save(&[doc("one")], &[]).unwrap();
        compact.save(&[doc("one")], &[]).unwrap();

        let pretty = fs::read_to_string(pretty.documents_path()).unwrap();
        let compact = fs::read_to_string(compact.documents_path()).unwrap();
        assert!(pretty.contains('\n'));
        assert!(!compact.contains('\n'));
    }

    #[test]
    fn test_corrupt_snapshot() {
        let dir = TempDir::new().unwrap();
        let cache = CacheSnapshot::new(dir.path(), false);
        fs::write(cache.documents_path(), "{not json").unwrap();
        fs::write(cache.tags_path(), "[]").unwrap();

        assert!(matches!(cache.load(), Err(ContentError::Cache(..))));
    }

    #[test]
    fn test_clear() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data");
        CacheSnapshot::new(&data, false).save(&[], &[]).unwrap();

        assert!(clear(&data).unwrap());
        assert!(!data.exists());
        assert!(!clear(&data).unwrap());
    }
}
