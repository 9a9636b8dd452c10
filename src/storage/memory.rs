//! In-memory version directory, for tests and ephemeral embeddings.

use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read, Write};
use std::sync::{Arc, Mutex};

use super::{ByteChannel, CollectionId, StorageError, VersionDirectory};

#[derive(Debug, Default)]
struct MemoryState {
    blobs: HashMap<(CollectionId, u64), Vec<u8>>,
    pointers: HashMap<CollectionId, u64>,
}

/// [`VersionDirectory`] keeping every version in memory.
///
/// Cloning yields a handle to the same underlying store.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().expect("memory directory lock poisoned")
    }
}

impl VersionDirectory for MemoryDirectory {
    fn pointer(&self, id: &CollectionId) -> Result<u64, StorageError> {
        Ok(self.lock().pointers.get(id).copied().unwrap_or(0))
    }

    fn advance(&self, pointers: &BTreeMap<CollectionId, u64>) -> Result<(), StorageError> {
        let mut state = self.lock();
        for (id, pointer) in pointers {
            state.pointers.insert(id.clone(), *pointer);
        }
        Ok(())
    }

    fn channel(
        &self,
        id: &CollectionId,
        input: u64,
        output: u64,
    ) -> Result<Box<dyn ByteChannel>, StorageError> {
        Ok(Box::new(MemoryChannel {
            state: self.state.clone(),
            input: (id.clone(), input),
            output: (id.clone(), output),
        }))
    }
}

struct MemoryChannel {
    state: Arc<Mutex<MemoryState>>,
    input: (CollectionId, u64),
    output: (CollectionId, u64),
}

impl ByteChannel for MemoryChannel {
    fn reader(&self) -> Result<Box<dyn Read>, StorageError> {
        let state = self.state.lock().expect("memory directory lock poisoned");
        let bytes = state.blobs.get(&self.input).cloned().unwrap_or_default();
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn writer(&self) -> Result<Box<dyn Write>, StorageError> {
        Ok(Box::new(MemoryWriter {
            state: self.state.clone(),
            key: self.output.clone(),
            buffer: Vec::new(),
        }))
    }
}

/// Buffers writes and stores the blob on flush (and again on drop, so a
/// forgotten flush still persists).
struct MemoryWriter {
    state: Arc<Mutex<MemoryState>>,
    key: (CollectionId, u64),
    buffer: Vec<u8>,
}

impl MemoryWriter {
    fn store(&mut self) {
        let mut state = self.state.lock().expect("memory directory lock poisoned");
        state.blobs.insert(self.key.clone(), self.buffer.clone());
    }
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.store();
        Ok(())
    }
}

impl Drop for MemoryWriter {
    fn drop(&mut self) {
        self.store();
    }
}
