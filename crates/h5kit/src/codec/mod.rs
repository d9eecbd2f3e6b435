// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Binary encoding of descriptors and dataspaces.
//!
//! # Blob Layout
//!
//! ```text
//! +-----------+-------------+------------------------+-------------+
//! | magic (4) | version (1) | body (little-endian)   | CRC-32 (4)  |
//! +-----------+-------------+------------------------+-------------+
//!   "H5KT" for a TypeDescriptor, "H5KS" for a Dataspace
//! ```
//!
//! The CRC covers every byte before it. Only the round-trip law is
//! guaranteed: `decode(encode(x)) == x`.
//!
//! Encoding is two-phase: [`encoded_len`] computes the exact size, then
//! [`encode_into`] fills a buffer of exactly that size. [`encode`] does both.

mod space;
mod types;

pub use self::space::{decode_space, encode_space, encode_space_into, encoded_space_len};
pub use self::types::{decode, encode, encode_into, encoded_len};

use crate::error::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Cursor};

/// Magic of an encoded type descriptor.
pub const TYPE_MAGIC: [u8; 4] = *b"H5KT";

/// Magic of an encoded dataspace.
pub const SPACE_MAGIC: [u8; 4] = *b"H5KS";

/// Current format version.
pub const FORMAT_VERSION: u8 = 1;

/// Magic + version.
const HEADER_LEN: usize = 5;

/// CRC-32 trailer.
const TRAILER_LEN: usize = 4;

/// Deepest descriptor nesting, enforced by both the encoder and the decoder.
pub const MAX_DEPTH: usize = 32;

/// What a blob holds, judged by its magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobKind {
    Type,
    Space,
}

/// Identify a blob from its magic bytes.
pub fn sniff(bytes: &[u8]) -> Option<BlobKind> {
    match bytes.get(..4)? {
        m if m == TYPE_MAGIC => Some(BlobKind::Type),
        m if m == SPACE_MAGIC => Some(BlobKind::Space),
        _ => None,
    }
}

fn check_buffer(buf: &[u8], expected: usize) -> Result<()> {
    if buf.len() != expected {
        return Err(Error::InvalidArgument(format!(
            "encode buffer must be exactly {} bytes, got {}",
            expected,
            buf.len()
        )));
    }
    Ok(())
}

/// Append the CRC of `buf[..len - 4]` into the last four bytes.
fn seal(buf: &mut [u8]) {
    let body_end = buf.len() - TRAILER_LEN;
    let crc = crc32fast::hash(&buf[..body_end]);
    buf[body_end..].copy_from_slice(&crc.to_le_bytes());
}

/// Check framing and return a cursor over the body.
fn open<'a>(bytes: &'a [u8], magic: [u8; 4], what: &str) -> Result<Cursor<&'a [u8]>> {
    if bytes.is_empty() {
        return Err(Error::EmptyInput);
    }
    if bytes.len() < HEADER_LEN + TRAILER_LEN {
        return Err(Error::Malformed(format!(
            "{} blob truncated ({} bytes)",
            what,
            bytes.len()
        )));
    }
    if bytes[..4] != magic {
        return Err(Error::Malformed(format!("bad {} magic {:02x?}", what, &bytes[..4])));
    }
    if bytes[4] != FORMAT_VERSION {
        return Err(Error::Malformed(format!(
            "unsupported {} format version {}",
            what, bytes[4]
        )));
    }
    let body_end = bytes.len() - TRAILER_LEN;
    let stored = u32::from_le_bytes([
        bytes[body_end],
        bytes[body_end + 1],
        bytes[body_end + 2],
        bytes[body_end + 3],
    ]);
    let actual = crc32fast::hash(&bytes[..body_end]);
    if stored != actual {
        log::debug!(
            "[codec] {} checksum mismatch: stored {:08x}, computed {:08x}",
            what,
            stored,
            actual
        );
        return Err(Error::Malformed(format!("{} checksum mismatch", what)));
    }
    let mut cursor = Cursor::new(&bytes[..body_end]);
    cursor.set_position(HEADER_LEN as u64);
    Ok(cursor)
}

/// Reject bytes left over after the body.
fn finish(cursor: &Cursor<&[u8]>, what: &str) -> Result<()> {
    let remaining = cursor.get_ref().len() as u64 - cursor.position();
    if remaining != 0 {
        return Err(Error::Malformed(format!(
            "{} trailing bytes after {} body",
            remaining, what
        )));
    }
    Ok(())
}

fn truncated(e: io::Error) -> Error {
    Error::Malformed(format!("truncated body: {}", e))
}

fn read_u8(r: &mut Cursor<&[u8]>) -> Result<u8> {
    r.read_u8().map_err(truncated)
}

fn read_u16(r: &mut Cursor<&[u8]>) -> Result<u16> {
    r.read_u16::<LittleEndian>().map_err(truncated)
}

fn read_u32(r: &mut Cursor<&[u8]>) -> Result<u32> {
    r.read_u32::<LittleEndian>().map_err(truncated)
}

fn read_u64(r: &mut Cursor<&[u8]>) -> Result<u64> {
    r.read_u64::<LittleEndian>().map_err(truncated)
}

fn read_name(r: &mut Cursor<&[u8]>) -> Result<String> {
    let len = read_u16(r)? as usize;
    let start = r.position() as usize;
    let bytes = r
        .get_ref()
        .get(start..start + len)
        .ok_or_else(|| Error::Malformed(format!("name of {} bytes runs past the end", len)))?;
    let name = std::str::from_utf8(bytes)
        .map_err(|e| Error::Malformed(format!("name is not UTF-8: {}", e)))?
        .to_string();
    r.set_position((start + len) as u64);
    Ok(name)
}

/// Length prefix of a name, checked to fit in `u16`.
fn name_len(name: &str) -> Result<usize> {
    if name.len() > u16::MAX as usize {
        return Err(Error::InvalidArgument(format!(
            "name of {} bytes exceeds the {} byte limit",
            name.len(),
            u16::MAX
        )));
    }
    Ok(2 + name.len())
}

fn to_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| Error::InvalidArgument(format!("{} {} does not fit in 32 bits", what, value)))
}
