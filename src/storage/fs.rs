//! Filesystem-backed version directory.
//!
//! Storage layout:
//! ```text
//! <data_dir>/
//! ├── pointers.json          # collection id -> current pointer
//! ├── dishes.1.catalog
//! ├── dishes.2.catalog       # current if pointers.json says 2
//! └── notes.1.catalog
//! ```
//!
//! Every version is a separate blob; advancing a pointer rewrites only the
//! pointer table, so a failed catalog write never touches the previously
//! durable version. Superseded blobs are left for an external cleanup pass.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Cursor, Read, Write};
use std::path::PathBuf;

use super::{ByteChannel, CollectionId, StorageError, VersionDirectory};

/// File extension for catalog blobs.
const CATALOG_EXTENSION: &str = "catalog";

/// Filename of the pointer table.
const POINTER_FILE: &str = "pointers.json";

/// Filesystem [`VersionDirectory`].
#[derive(Debug, Clone)]
pub struct FsDirectory {
    data_dir: PathBuf,
}

impl FsDirectory {
    /// Creates a directory rooted at `data_dir`. The directory is created on
    /// first write, not here.
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    /// Returns the blob path for one collection version.
    pub fn catalog_path(&self, id: &CollectionId, pointer: u64) -> PathBuf {
        self.data_dir
            .join(format!("{}.{}.{}", id, pointer, CATALOG_EXTENSION))
    }

    fn pointer_table_path(&self) -> PathBuf {
        self.data_dir.join(POINTER_FILE)
    }

    fn load_pointer_table(&self) -> Result<BTreeMap<CollectionId, u64>, StorageError> {
        let path = self.pointer_table_path();
        match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StorageError::PointerTable(e.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(StorageError::File { path, source: e }),
        }
    }
}

impl VersionDirectory for FsDirectory {
    fn pointer(&self, id: &CollectionId) -> Result<u64, StorageError> {
        Ok(self.load_pointer_table()?.get(id).copied().unwrap_or(0))
    }

    fn advance(&self, pointers: &BTreeMap<CollectionId, u64>) -> Result<(), StorageError> {
        if pointers.is_empty() {
            return Ok(());
        }

        fs::create_dir_all(&self.data_dir).map_err(|e| StorageError::File {
            path: self.data_dir.clone(),
            source: e,
        })?;

        let mut table = self.load_pointer_table()?;
        for (id, pointer) in pointers {
            table.insert(id.clone(), *pointer);
        }

        let path = self.pointer_table_path();
        let bytes =
            serde_json::to_vec(&table).map_err(|e| StorageError::PointerTable(e.to_string()))?;
        fs::write(&path, bytes).map_err(|e| StorageError::File { path, source: e })?;

        Ok(())
    }

    fn channel(
        &self,
        id: &CollectionId,
        input: u64,
        output: u64,
    ) -> Result<Box<dyn ByteChannel>, StorageError> {
        Ok(Box::new(FsChannel {
            data_dir: self.data_dir.clone(),
            read_path: self.catalog_path(id, input),
            write_path: self.catalog_path(id, output),
        }))
    }
}

/// Channel over one pair of catalog blob paths.
struct FsChannel {
    data_dir: PathBuf,
    read_path: PathBuf,
    write_path: PathBuf,
}

impl ByteChannel for FsChannel {
    fn reader(&self) -> Result<Box<dyn Read>, StorageError> {
        match fs::File::open(&self.read_path) {
            Ok(file) => Ok(Box::new(file)),
            // A version that was never written reads as an empty catalog.
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Ok(Box::new(Cursor::new(Vec::new())))
            }
            Err(e) => Err(StorageError::File {
                path: self.read_path.clone(),
                source: e,
            }),
        }
    }

    fn writer(&self) -> Result<Box<dyn Write>, StorageError> {
        fs::create_dir_all(&self.data_dir).map_err(|e| StorageError::File {
            path: self.data_dir.clone(),
            source: e,
        })?;

        let file = fs::File::create(&self.write_path).map_err(|e| StorageError::File {
            path: self.write_path.clone(),
            source: e,
        })?;
        Ok(Box::new(file))
    }
}
