// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Big-endian length-prefixed byte strings, as used by TLS-style encodings
//! such as the `LogRootV1` tree head envelope.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Error, ErrorKind, Read, Write};
use std::marker::Sized;

pub trait ReadLengthPrefixedBytesExt: Read {
    /// Read big-endian length-prefixed bytes from the reader, where the length
    /// prefix is `nbytes` wide.
    ///
    /// # Errors
    ///
    /// Returns the same errors as
    /// [`Read::read_exact`](https://doc.rust-lang.org/std/io/trait.Read.html#method.read_exact),
    /// or [`ErrorKind::InvalidData`] if the length does not fit in memory.
    ///
    /// # Panics
    ///
    /// `read_uint` requires that `1 <= nbytes <= 8`, and will panic otherwise.
    #[inline]
    fn read_length_prefixed(&mut self, nbytes: usize) -> std::io::Result<Vec<u8>> {
        self.read_length_prefixed_max(nbytes, usize::MAX)
    }

    /// Like [`ReadLengthPrefixedBytesExt::read_length_prefixed`], but rejects
    /// payloads longer than `max_len` before allocating for them.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidData`] if the encoded length exceeds
    /// `max_len`, and otherwise the same errors as `read_length_prefixed`.
    fn read_length_prefixed_max(
        &mut self,
        nbytes: usize,
        max_len: usize,
    ) -> std::io::Result<Vec<u8>> {
        let length = usize::try_from(self.read_uint::<BigEndian>(nbytes)?)
            .map_err(|e| Error::new(ErrorKind::InvalidData, e))?;
        if length > max_len {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("length {length} exceeds maximum {max_len}"),
            ));
        }
        let mut buffer = vec![0; length];
        self.read_exact(&mut buffer)?;
        Ok(buffer)
    }
}

/// All types that implement `Read` get methods defined in
/// `ReadLengthPrefixedBytesExt` for free.
impl<R: Read + ?Sized> ReadLengthPrefixedBytesExt for R {}

pub trait WriteLengthPrefixedBytesExt: Write {
    /// Write big-endian length-prefixed bytes to the writer.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidInput`] if `data` is too long for an
    /// `nbytes`-wide prefix, and otherwise the same errors as
    /// [`Write::write_all`](https://doc.rust-lang.org/std/io/trait.Write.html#method.write_all).
    #[inline]
    fn write_length_prefixed(&mut self, data: &[u8], nbytes: usize) -> std::io::Result<()> {
        let length = data.len() as u64;
        if nbytes < 8 && length >> (8 * nbytes) != 0 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("length {length} does not fit in {nbytes} bytes"),
            ));
        }
        self.write_uint::<BigEndian>(length, nbytes)?;
        self.write_all(data)
    }
}

/// All types that implement `Write` get methods defined in
/// `WriteLengthPrefixedBytesExt` for free.
impl<W: Write + ?Sized> WriteLengthPrefixedBytesExt for W {}
