//! Operation log storage.
//!
//! Record frame: `[len: u32 LE][crc32: u32 LE][payload: bincode(Operation)]`, the CRC
//! covering the length bytes and the payload.
//!
//! Only the last record can be torn: a short header, or a short payload with no valid record
//! after it, is dropped and truncated on replay. Anything else that fails to check out
//! (bad CRC, oversized length, a short record followed by valid ones) fails the replay and
//! leaves the file untouched.

use crate::errors::DbError;
use crate::types::Operation;
use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use crc32fast::Hasher as Crc32Hasher;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const HEADER_LEN: usize = 8;

/// Upper bound on one encoded operation.
pub const MAX_RECORD_LEN: usize = 64 * 1024 * 1024;

/// Where collections persist their mutations.
pub trait StorageEngine: Send + Sync {
    /// Durably records one mutation before it is applied in memory.
    ///
    /// # Errors
    /// Returns an error if the operation cannot be encoded or written.
    fn append(&mut self, operation: &Operation) -> Result<(), DbError>;

    /// Reads back every recorded mutation in append order.
    ///
    /// # Errors
    /// Returns an error if the log is unreadable or corrupt.
    fn read_all(&mut self) -> Result<Vec<Operation>, DbError>;
}

/// Volatile storage: nothing is recorded.
#[derive(Debug, Default)]
pub struct MemoryStorage;

impl StorageEngine for MemoryStorage {
    fn append(&mut self, _operation: &Operation) -> Result<(), DbError> {
        Ok(())
    }

    fn read_all(&mut self) -> Result<Vec<Operation>, DbError> {
        Ok(Vec::new())
    }
}

/// Append-only, checksummed operation log on a single file.
#[derive(Debug)]
pub struct Wal {
    file: File,
    path: PathBuf,
}

impl Wal {
    /// # Errors
    /// Returns an error if the file cannot be created or opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().read(true).append(true).create(true).open(&path)?;
        Ok(Self { file, path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn checksum(len: u32, payload: &[u8]) -> u32 {
    let mut hasher = Crc32Hasher::new();
    hasher.update(&len.to_le_bytes());
    hasher.update(payload);
    hasher.finalize()
}

fn read_u32(buf: &[u8], at: usize) -> Option<u32> {
    let bytes: [u8; 4] = buf.get(at..at.checked_add(4)?)?.try_into().ok()?;
    Some(u32::from_le_bytes(bytes))
}

enum Frame<'a> {
    Valid { payload: &'a [u8], end: usize },
    /// Runs past the end of the buffer.
    Short,
    Corrupt,
}

fn frame_at(buf: &[u8], offset: usize) -> Frame<'_> {
    let (Some(len), Some(crc)) = (read_u32(buf, offset), read_u32(buf, offset + 4)) else {
        return Frame::Short;
    };
    let Some(size) = usize::try_from(len).ok().filter(|l| *l <= MAX_RECORD_LEN) else {
        return Frame::Corrupt;
    };
    let start = offset + HEADER_LEN;
    let end = start + size;
    match buf.get(start..end) {
        None => Frame::Short,
        Some(payload) if checksum(len, payload) == crc => Frame::Valid { payload, end },
        Some(_) => Frame::Corrupt,
    }
}

/// A short record is a torn tail only if no valid record starts after it.
fn valid_record_after(buf: &[u8], offset: usize) -> bool {
    (offset + 1..buf.len().saturating_sub(HEADER_LEN - 1))
        .any(|at| matches!(frame_at(buf, at), Frame::Valid { .. }))
}

impl StorageEngine for Wal {
    fn append(&mut self, operation: &Operation) -> Result<(), DbError> {
        let payload = encode_to_vec(operation, standard())?;
        let len = u32::try_from(payload.len())
            .ok()
            .filter(|_| payload.len() <= MAX_RECORD_LEN)
            .ok_or_else(|| DbError::InvalidDocument("operation too large for log".into()))?;
        let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&checksum(len, &payload).to_le_bytes());
        frame.extend_from_slice(&payload);
        self.file.write_all(&frame)?;
        self.file.sync_data()?;
        Ok(())
    }

    fn read_all(&mut self) -> Result<Vec<Operation>, DbError> {
        self.file.seek(SeekFrom::Start(0))?;
        let mut buf = Vec::new();
        self.file.read_to_end(&mut buf)?;
        let mut records = Vec::new();
        let mut offset = 0usize;
        while offset < buf.len() {
            match frame_at(&buf, offset) {
                Frame::Valid { payload, end } => {
                    let (op, _) = decode_from_slice::<Operation, _>(payload, standard())?;
                    records.push(op);
                    offset = end;
                }
                Frame::Short if !valid_record_after(&buf, offset) => break,
                Frame::Short | Frame::Corrupt => {
                    return Err(DbError::Checksum { offset: crate::utils::num::usize_to_u64(offset) });
                }
            }
        }
        if offset < buf.len() {
            log::warn!(
                "dropping torn record at offset {offset} of {} ({} bytes)",
                self.path.display(),
                buf.len() - offset
            );
            self.file.set_len(crate::utils::num::usize_to_u64(offset))?;
        }
        Ok(records)
    }
}
