//! The catalog: one collection's full persisted state, and its binary layout.
//!
//! A catalog blob is self-contained and written wholesale to a new version.
//! All integers are big-endian. Layout:
//!
//! ```text
//! deleted_count: u32
//! deleted_count × id (16 bytes)
//! locals_count:  u32
//! locals_count × id (16 bytes)
//! items_count:   u32
//! items_count × {
//!   id: 16 bytes
//!   created: i64 (epoch millis)
//!   updated: i64 (epoch millis)
//!   hash: hash_len bytes
//!   encoded_len: u32
//!   encoded_len payload bytes
//! }
//! ```
//!
//! Items are always written in ascending `created` order. An empty stream
//! (a version that was never written) decodes to the empty catalog.

use std::collections::BTreeSet;
use std::io::{Read, Write};

use crate::context::ContentHash;
use crate::record::{ItemInfo, RawRecord, Record};
use crate::record_id::RecordId;
use crate::storage::StorageError;

/// Full state of one collection version.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    /// Active records, ascending by `created` (insertion order on ties).
    pub items: Vec<RawRecord>,
    /// Tombstones: ids of deleted records, propagated so peers remove them too.
    pub deleted: BTreeSet<RecordId>,
    /// Ids added since the last completed sync round.
    pub locals: BTreeSet<RecordId>,
}

impl Catalog {
    /// Decodes a catalog from a byte stream.
    ///
    /// `hash_len` is the output length of the content hasher the collection
    /// is bound to; item hashes are stored without their own length prefix.
    pub fn read_from(reader: &mut dyn Read, hash_len: usize) -> Result<Self, StorageError> {
        let deleted_count = match try_read_u32(reader)? {
            Some(count) => count,
            None => return Ok(Catalog::default()),
        };

        let mut deleted = BTreeSet::new();
        for _ in 0..deleted_count {
            deleted.insert(read_id(reader)?);
        }

        let locals_count = read_u32(reader)?;
        let mut locals = BTreeSet::new();
        for _ in 0..locals_count {
            locals.insert(read_id(reader)?);
        }

        let items_count = read_u32(reader)?;
        let mut items = Vec::with_capacity(items_count as usize);
        for _ in 0..items_count {
            let id = read_id(reader)?;
            let created = read_i64(reader)?;
            let updated = read_i64(reader)?;

            let mut hash = vec![0u8; hash_len];
            reader
                .read_exact(&mut hash)
                .map_err(|_| StorageError::Corrupt("truncated item hash"))?;

            let encoded_len = read_u32(reader)?;
            let mut payload = vec![0u8; encoded_len as usize];
            reader
                .read_exact(&mut payload)
                .map_err(|_| StorageError::Corrupt("truncated item payload"))?;

            items.push(Record {
                id,
                info: ItemInfo {
                    created,
                    updated,
                    hash: ContentHash::from_bytes(hash),
                },
                payload,
            });
        }

        Ok(Catalog {
            items,
            deleted,
            locals,
        })
    }

    /// Encodes the catalog to a byte stream. Items are written in their
    /// stored order, which the engine keeps ascending by `created`.
    pub fn write_to(&self, writer: &mut dyn Write) -> Result<(), StorageError> {
        writer.write_all(&(self.deleted.len() as u32).to_be_bytes())?;
        for id in &self.deleted {
            writer.write_all(id.as_bytes())?;
        }

        writer.write_all(&(self.locals.len() as u32).to_be_bytes())?;
        for id in &self.locals {
            writer.write_all(id.as_bytes())?;
        }

        writer.write_all(&(self.items.len() as u32).to_be_bytes())?;
        for item in &self.items {
            writer.write_all(item.id.as_bytes())?;
            writer.write_all(&item.info.created.to_be_bytes())?;
            writer.write_all(&item.info.updated.to_be_bytes())?;
            writer.write_all(item.info.hash.as_bytes())?;
            writer.write_all(&(item.payload.len() as u32).to_be_bytes())?;
            writer.write_all(&item.payload)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Input to the collection digest: `id ∥ updated ∥ hash` per item in
    /// stored order. Excludes `created` and payload bytes, so catalog
    /// equality depends only on identity, last-mutation time, and content
    /// hash.
    pub fn digest_input(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for item in &self.items {
            buf.extend_from_slice(item.id.as_bytes());
            buf.extend_from_slice(&item.info.updated.to_be_bytes());
            buf.extend_from_slice(item.info.hash.as_bytes());
        }
        buf
    }

    /// Re-establishes ascending `created` order after appends. Stable, so
    /// records created at the same instant keep their insertion order.
    pub fn sort_items(&mut self) {
        self.items.sort_by_key(|item| item.info.created);
    }

    /// Finds an active record by id.
    pub fn find(&self, id: RecordId) -> Option<&RawRecord> {
        self.items.iter().find(|item| item.id == id)
    }
}

fn try_read_u32(reader: &mut dyn Read) -> Result<Option<u32>, StorageError> {
    let mut buf = [0u8; 4];
    let mut filled = 0;
    while filled < 4 {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(StorageError::Corrupt("truncated section count"));
        }
        filled += n;
    }
    Ok(Some(u32::from_be_bytes(buf)))
}

fn read_u32(reader: &mut dyn Read) -> Result<u32, StorageError> {
    let mut buf = [0u8; 4];
    reader
        .read_exact(&mut buf)
        .map_err(|_| StorageError::Corrupt("truncated u32 field"))?;
    Ok(u32::from_be_bytes(buf))
}

fn read_i64(reader: &mut dyn Read) -> Result<i64, StorageError> {
    let mut buf = [0u8; 8];
    reader
        .read_exact(&mut buf)
        .map_err(|_| StorageError::Corrupt("truncated timestamp"))?;
    Ok(i64::from_be_bytes(buf))
}

fn read_id(reader: &mut dyn Read) -> Result<RecordId, StorageError> {
    let mut buf = [0u8; 16];
    reader
        .read_exact(&mut buf)
        .map_err(|_| StorageError::Corrupt("truncated record id"))?;
    Ok(RecordId::from_bytes(buf))
}
