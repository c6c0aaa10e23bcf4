//! Checksummed snapshot files.
//!
//! Layout, little endian:
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 4 | magic `RVGS` |
//! | 4 | 2 | format version |
//! | 6 | 1 | payload kind |
//! | 7 | 1 | reserved |
//! | 8 | 8 | payload length |
//! | 16 | 4 | CRC-32 of the payload |
//! | 20 | n | bincode payload |

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use revgraph_common::utils::error::{Error, Result, StorageError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::{Cursor, ErrorKind, Write};
use std::path::Path;

const MAGIC: [u8; 4] = *b"RVGS";
const VERSION: u16 = 1;
const HEADER_LEN: usize = 20;

/// What a snapshot file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SnapshotKind {
    /// Vertex store contents.
    Vertices = 1,
    /// Index definitions.
    Indices = 2,
}

/// Encodes `payload` into a snapshot image.
pub fn encode<T: Serialize>(kind: SnapshotKind, payload: &T) -> Result<Vec<u8>> {
    let body = bincode::serde::encode_to_vec(payload, bincode::config::standard())
        .map_err(|e| Error::Serialization(e.to_string()))?;

    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.extend_from_slice(&MAGIC);
    out.write_u16::<LittleEndian>(VERSION)?;
    out.write_u8(kind as u8)?;
    out.write_u8(0)?;
    out.write_u64::<LittleEndian>(body.len() as u64)?;
    out.write_u32::<LittleEndian>(crc32fast::hash(&body))?;
    out.extend_from_slice(&body);
    Ok(out)
}

/// Decodes a snapshot image written by [`encode`].
pub fn decode<T: DeserializeOwned>(kind: SnapshotKind, bytes: &[u8]) -> Result<T> {
    if bytes.len() < HEADER_LEN {
        return Err(StorageError::Truncated.into());
    }
    if bytes[..4] != MAGIC {
        return Err(StorageError::BadMagic.into());
    }

    let mut header = Cursor::new(&bytes[4..HEADER_LEN]);
    let version = header.read_u16::<LittleEndian>()?;
    if version != VERSION {
        return Err(StorageError::UnsupportedVersion(version).into());
    }
    let found = header.read_u8()?;
    if found != kind as u8 {
        return Err(StorageError::KindMismatch {
            expected: kind as u8,
            found,
        }
        .into());
    }
    let _reserved = header.read_u8()?;
    let len = header.read_u64::<LittleEndian>()? as usize;
    let expected = header.read_u32::<LittleEndian>()?;

    let body = bytes
        .get(HEADER_LEN..HEADER_LEN.saturating_add(len))
        .ok_or(StorageError::Truncated)?;
    let actual = crc32fast::hash(body);
    if actual != expected {
        return Err(StorageError::ChecksumMismatch {
            expected,
            found: actual,
        }
        .into());
    }

    let (payload, _) = bincode::serde::decode_from_slice(body, bincode::config::standard())
        .map_err(|e| Error::Serialization(e.to_string()))?;
    Ok(payload)
}

/// Writes a snapshot file, replacing any previous one atomically.
pub fn write<T: Serialize>(path: &Path, kind: SnapshotKind, payload: &T) -> Result<()> {
    let image = encode(kind, payload)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&image)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Reads a snapshot file. Returns `None` if the file does not exist.
pub fn read<T: DeserializeOwned>(path: &Path, kind: SnapshotKind) -> Result<Option<T>> {
    match fs::read(path) {
        Ok(bytes) => decode(kind, &bytes).map(Some),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vertices.snap");
        let payload = vec![(1u64, "a".to_string()), (2, "b".to_string())];

        write(&path, SnapshotKind::Vertices, &payload).unwrap();
        let back: Option<Vec<(u64, String)>> = read(&path, SnapshotKind::Vertices).unwrap();
        assert_eq!(back, Some(payload));
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let back: Option<Vec<u64>> =
            read(&dir.path().join("absent.snap"), SnapshotKind::Indices).unwrap();
        assert!(back.is_none());
    }

    #[test]
    fn test_corrupted_payload_detected() {
        let mut image = encode(SnapshotKind::Vertices, &vec![7u64; 16]).unwrap();
        let last = image.len() - 1;
        image[last] ^= 0xFF;
        let err = decode::<Vec<u64>>(SnapshotKind::Vertices, &image).unwrap_err();
        assert!(matches!(err, Error::Storage(StorageError::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_kind_mismatch_detected() {
        let image = encode(SnapshotKind::Indices, &0u8).unwrap();
        let err = decode::<u8>(SnapshotKind::Vertices, &image).unwrap_err();
        assert!(matches!(
            err,
            Error::Storage(StorageError::KindMismatch { expected: 1, found: 2 })
        ));
    }

    #[test]
    fn test_truncated_and_bad_magic() {
        let image = encode(SnapshotKind::Vertices, &vec![1u64, 2, 3]).unwrap();
        let truncated = &image[..image.len() - 2];
        let err = decode::<Vec<u64>>(SnapshotKind::Vertices, truncated).unwrap_err();
        assert!(matches!(err, Error::Storage(StorageError::Truncated)));

        let mut bad = image.clone();
        bad[0] = b'X';
        let err = decode::<Vec<u64>>(SnapshotKind::Vertices, &bad).unwrap_err();
        assert!(matches!(err, Error::Storage(StorageError::BadMagic)));
    }
}
