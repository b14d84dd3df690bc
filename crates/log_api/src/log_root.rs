// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! The `LogRootV1` tree head, carried inside a [`SignedLogRoot`](crate::SignedLogRoot).
//!
//! Encoding (TLS presentation language, big-endian):
//! ```text
//! struct {
//!     uint16 version = 1;
//!     uint64 tree_size;
//!     opaque root_hash<0..128>;
//!     uint64 timestamp_nanos;
//!     uint64 revision;
//!     opaque metadata<0..65535>;
//! } LogRootV1;
//! ```

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use length_prefixed::{ReadLengthPrefixedBytesExt, WriteLengthPrefixedBytesExt};
use std::io::Read;
use thiserror::Error;

/// The only supported envelope version.
pub const LOG_ROOT_V1: u16 = 1;

const MAX_ROOT_HASH_LEN: usize = 128;
const MAX_METADATA_LEN: usize = 65535;

#[derive(Error, Debug)]
pub enum LogRootError {
    #[error("unsupported log root version {0}")]
    UnsupportedVersion(u16),
    #[error("trailing data after log root")]
    TrailingData,
    #[error("{0} too long")]
    FieldTooLong(&'static str),
    #[error("invalid log root signature")]
    InvalidSignature,
    #[error(transparent)]
    IO(#[from] std::io::Error),
}

/// A decoded log root: the log's attested size and root hash at some point in
/// time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogRootV1 {
    pub tree_size: u64,
    pub root_hash: Vec<u8>,
    pub timestamp_nanos: u64,
    pub revision: u64,
    pub metadata: Vec<u8>,
}

impl LogRootV1 {
    /// Returns the binary encoding of the log root.
    ///
    /// # Errors
    ///
    /// Returns an error if the root hash or metadata are too long to encode.
    pub fn to_bytes(&self) -> Result<Vec<u8>, LogRootError> {
        if self.root_hash.len() > MAX_ROOT_HASH_LEN {
            return Err(LogRootError::FieldTooLong("root hash"));
        }
        if self.metadata.len() > MAX_METADATA_LEN {
            return Err(LogRootError::FieldTooLong("metadata"));
        }
        let mut buffer = Vec::with_capacity(2 + 8 + 1 + self.root_hash.len() + 16 + 2);
        buffer.write_u16::<BigEndian>(LOG_ROOT_V1)?;
        buffer.write_u64::<BigEndian>(self.tree_size)?;
        buffer.write_length_prefixed(&self.root_hash, 1)?;
        buffer.write_u64::<BigEndian>(self.timestamp_nanos)?;
        buffer.write_u64::<BigEndian>(self.revision)?;
        buffer.write_length_prefixed(&self.metadata, 2)?;
        Ok(buffer)
    }

    /// Parses a log root from its binary encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if the version is unknown, the input is truncated,
    /// a field exceeds its maximum length, or bytes remain after the root.
    pub fn from_bytes(data: &[u8]) -> Result<Self, LogRootError> {
        let mut s = data;
        let version = s.read_u16::<BigEndian>()?;
        if version != LOG_ROOT_V1 {
            return Err(LogRootError::UnsupportedVersion(version));
        }
        let root = LogRootV1 {
            tree_size: s.read_u64::<BigEndian>()?,
            root_hash: s.read_length_prefixed_max(1, MAX_ROOT_HASH_LEN)?,
            timestamp_nanos: s.read_u64::<BigEndian>()?,
            revision: s.read_u64::<BigEndian>()?,
            metadata: s.read_length_prefixed_max(2, MAX_METADATA_LEN)?,
        };
        if s.read(&mut [0])? != 0 {
            return Err(LogRootError::TrailingData);
        }
        Ok(root)
    }
}
