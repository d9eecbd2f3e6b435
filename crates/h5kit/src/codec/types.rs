// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type descriptor blobs.
//!
//! Every node starts with a one-byte tag followed by its class payload:
//!
//! ```text
//! 1  integer    width u8, signed u8, order u8
//! 2  float      width u8, order u8
//! 3  string     charset u8, length u32 (0 = variable)
//! 4  opaque     size u32, tag (u16 len + bytes)
//! 5  bitfield   size u32, order u8
//! 6  time       size u32, order u8
//! 7  reference  size u32, order u8
//! 8  enum       base (width, signed, order), count u32, {name, value u64}*
//! 9  compound   size u32, count u32, {name, offset u32, node}*
//! 10 array      rank u8, dim u32 * rank, node
//! 11 vlist      node
//! ```

use super::{
    check_buffer, finish, name_len, open, read_name, read_u32, read_u64, read_u8, seal, to_u32,
    FORMAT_VERSION, HEADER_LEN, MAX_DEPTH, TRAILER_LEN, TYPE_MAGIC,
};
use crate::error::{Error, Result};
use crate::types::{
    ArrayType, ByteOrder, CharSet, CompoundType, EnumType, FloatType, IntegerType, LeafType,
    OpaqueType, StringLength, StringType, TypeDescriptor,
};
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{Cursor, Write};

const TAG_INTEGER: u8 = 1;
const TAG_FLOAT: u8 = 2;
const TAG_STRING: u8 = 3;
const TAG_OPAQUE: u8 = 4;
const TAG_BITFIELD: u8 = 5;
const TAG_TIME: u8 = 6;
const TAG_REFERENCE: u8 = 7;
const TAG_ENUM: u8 = 8;
const TAG_COMPOUND: u8 = 9;
const TAG_ARRAY: u8 = 10;
const TAG_VLIST: u8 = 11;

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Exact size of the blob [`encode`] would produce.
pub fn encoded_len(ty: &TypeDescriptor) -> Result<usize> {
    Ok(HEADER_LEN + node_len(ty, 0)? + TRAILER_LEN)
}

/// Payload size of one node. Nesting is capped at [`MAX_DEPTH`] here as in
/// [`decode`], so every blob `encode` produces can be read back.
fn node_len(ty: &TypeDescriptor, depth: usize) -> Result<usize> {
    if depth >= MAX_DEPTH {
        return Err(Error::InvalidArgument(format!(
            "descriptor nesting exceeds {} levels",
            MAX_DEPTH
        )));
    }
    let payload = match ty {
        TypeDescriptor::Integer(_) => 3,
        TypeDescriptor::Float(_) => 2,
        TypeDescriptor::String(_) => 1 + 4,
        TypeDescriptor::Opaque(t) => 4 + name_len(t.tag())?,
        TypeDescriptor::Bitfield(_) | TypeDescriptor::Time(_) | TypeDescriptor::Reference(_) => {
            4 + 1
        }
        TypeDescriptor::Enum(t) => {
            let mut len = 3 + 4;
            for m in t.members() {
                len += name_len(&m.name)? + 8;
            }
            len
        }
        TypeDescriptor::Compound(t) => {
            let mut len = 4 + 4;
            for f in t.fields() {
                len += name_len(f.name())? + 4 + node_len(f.ty(), depth + 1)?;
            }
            len
        }
        TypeDescriptor::Array(t) => 1 + 4 * t.dims().len() + node_len(t.element(), depth + 1)?,
        TypeDescriptor::VarList(elem) => node_len(elem, depth + 1)?,
    };
    Ok(1 + payload)
}

/// Encode into `buf`, which must be exactly [`encoded_len`] bytes long.
/// Returns the number of bytes written.
pub fn encode_into(ty: &TypeDescriptor, buf: &mut [u8]) -> Result<usize> {
    let expected = encoded_len(ty)?;
    check_buffer(buf, expected)?;
    {
        let mut w = Cursor::new(&mut buf[..expected - TRAILER_LEN]);
        write_all(&mut w, &TYPE_MAGIC)?;
        put_u8(&mut w, FORMAT_VERSION)?;
        write_node(&mut w, ty)?;
    }
    seal(buf);
    Ok(expected)
}

/// Encode a descriptor into a fresh buffer.
pub fn encode(ty: &TypeDescriptor) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; encoded_len(ty)?];
    encode_into(ty, &mut buf)?;
    log::trace!("[codec] encoded {} ({} bytes)", ty.class().name(), buf.len());
    Ok(buf)
}

type Writer<'a> = Cursor<&'a mut [u8]>;

fn write_err(e: std::io::Error) -> Error {
    Error::InvalidArgument(format!("encode buffer overflow: {}", e))
}

fn write_all(w: &mut Writer<'_>, bytes: &[u8]) -> Result<()> {
    w.write_all(bytes).map_err(write_err)
}

fn put_u8(w: &mut Writer<'_>, v: u8) -> Result<()> {
    w.write_u8(v).map_err(write_err)
}

fn put_u32(w: &mut Writer<'_>, v: u32) -> Result<()> {
    w.write_u32::<LittleEndian>(v).map_err(write_err)
}

fn put_u64(w: &mut Writer<'_>, v: u64) -> Result<()> {
    w.write_u64::<LittleEndian>(v).map_err(write_err)
}

fn put_name(w: &mut Writer<'_>, name: &str) -> Result<()> {
    w.write_u16::<LittleEndian>(name.len() as u16)
        .map_err(write_err)?;
    write_all(w, name.as_bytes())
}

fn order_byte(order: ByteOrder) -> u8 {
    match order {
        ByteOrder::LittleEndian => 0,
        ByteOrder::BigEndian => 1,
    }
}

fn put_integer(w: &mut Writer<'_>, t: &IntegerType) -> Result<()> {
    put_u8(w, t.width() as u8)?;
    put_u8(w, u8::from(t.is_signed()))?;
    put_u8(w, order_byte(t.order()))
}

fn put_leaf(w: &mut Writer<'_>, t: &LeafType) -> Result<()> {
    put_u32(w, to_u32(t.size(), "size")?)?;
    put_u8(w, order_byte(t.order()))
}

fn write_node(w: &mut Writer<'_>, ty: &TypeDescriptor) -> Result<()> {
    match ty {
        TypeDescriptor::Integer(t) => {
            put_u8(w, TAG_INTEGER)?;
            put_integer(w, t)
        }
        TypeDescriptor::Float(t) => {
            put_u8(w, TAG_FLOAT)?;
            put_u8(w, t.width() as u8)?;
            put_u8(w, order_byte(t.order()))
        }
        TypeDescriptor::String(t) => {
            put_u8(w, TAG_STRING)?;
            put_u8(
                w,
                match t.charset() {
                    CharSet::Ascii => 0,
                    CharSet::Utf8 => 1,
                },
            )?;
            let len = match t.length() {
                StringLength::Fixed(n) => to_u32(n, "string length")?,
                StringLength::Variable => 0,
            };
            put_u32(w, len)
        }
        TypeDescriptor::Opaque(t) => {
            put_u8(w, TAG_OPAQUE)?;
            put_u32(w, to_u32(t.size(), "opaque size")?)?;
            put_name(w, t.tag())
        }
        TypeDescriptor::Bitfield(t) => {
            put_u8(w, TAG_BITFIELD)?;
            put_leaf(w, t)
        }
        TypeDescriptor::Time(t) => {
            put_u8(w, TAG_TIME)?;
            put_leaf(w, t)
        }
        TypeDescriptor::Reference(t) => {
            put_u8(w, TAG_REFERENCE)?;
            put_leaf(w, t)
        }
        TypeDescriptor::Enum(t) => {
            put_u8(w, TAG_ENUM)?;
            put_integer(w, &t.base())?;
            put_u32(w, to_u32(t.len(), "enum member count")?)?;
            for m in t.members() {
                put_name(w, &m.name)?;
                put_u64(w, m.value)?;
            }
            Ok(())
        }
        TypeDescriptor::Compound(t) => {
            put_u8(w, TAG_COMPOUND)?;
            put_u32(w, to_u32(t.size(), "compound size")?)?;
            put_u32(w, to_u32(t.fields().len(), "compound member count")?)?;
            for f in t.fields() {
                put_name(w, f.name())?;
                put_u32(w, to_u32(f.offset(), "member offset")?)?;
                write_node(w, f.ty())?;
            }
            Ok(())
        }
        TypeDescriptor::Array(t) => {
            put_u8(w, TAG_ARRAY)?;
            put_u8(w, t.dims().len() as u8)?;
            for &d in t.dims() {
                put_u32(w, to_u32(d, "array dimension")?)?;
            }
            write_node(w, t.element())
        }
        TypeDescriptor::VarList(elem) => {
            put_u8(w, TAG_VLIST)?;
            write_node(w, elem)
        }
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode a descriptor blob.
///
/// Every node is rebuilt through the validating constructors, so a blob that
/// passes its checksum but describes an impossible layout is still rejected.
pub fn decode(bytes: &[u8]) -> Result<TypeDescriptor> {
    let mut r = open(bytes, TYPE_MAGIC, "type")?;
    let ty = read_node(&mut r, 0)?;
    finish(&r, "type")?;
    log::trace!("[codec] decoded {} from {} bytes", ty.class().name(), bytes.len());
    Ok(ty)
}

type Reader<'a> = Cursor<&'a [u8]>;

/// Reject a constructor failure as malformed input.
fn invalid(e: Error) -> Error {
    Error::Malformed(format!("invalid descriptor: {}", e))
}

fn read_order(r: &mut Reader<'_>) -> Result<ByteOrder> {
    match read_u8(r)? {
        0 => Ok(ByteOrder::LittleEndian),
        1 => Ok(ByteOrder::BigEndian),
        other => Err(Error::Malformed(format!("unknown byte order {}", other))),
    }
}

fn read_integer(r: &mut Reader<'_>) -> Result<IntegerType> {
    let width = read_u8(r)? as usize;
    let signed = match read_u8(r)? {
        0 => false,
        1 => true,
        other => return Err(Error::Malformed(format!("bad signedness flag {}", other))),
    };
    let order = read_order(r)?;
    Ok(IntegerType::new(width, signed).map_err(invalid)?.with_order(order))
}

fn read_leaf(r: &mut Reader<'_>) -> Result<LeafType> {
    let size = read_u32(r)? as usize;
    let order = read_order(r)?;
    LeafType::new(size, order).map_err(invalid)
}

fn read_node(r: &mut Reader<'_>, depth: usize) -> Result<TypeDescriptor> {
    if depth >= MAX_DEPTH {
        return Err(Error::Malformed(format!(
            "descriptor nesting exceeds {} levels",
            MAX_DEPTH
        )));
    }
    let tag = read_u8(r)?;
    let ty = match tag {
        TAG_INTEGER => TypeDescriptor::Integer(read_integer(r)?),
        TAG_FLOAT => {
            let width = read_u8(r)? as usize;
            let order = read_order(r)?;
            TypeDescriptor::Float(FloatType::new(width).map_err(invalid)?.with_order(order))
        }
        TAG_STRING => {
            let charset = match read_u8(r)? {
                0 => CharSet::Ascii,
                1 => CharSet::Utf8,
                other => return Err(Error::Malformed(format!("unknown charset {}", other))),
            };
            let string = match read_u32(r)? {
                0 => StringType::variable(charset),
                n => StringType::fixed(charset, n as usize).map_err(invalid)?,
            };
            TypeDescriptor::String(string)
        }
        TAG_OPAQUE => {
            let size = read_u32(r)? as usize;
            let tag = read_name(r)?;
            TypeDescriptor::Opaque(OpaqueType::new(size, tag).map_err(invalid)?)
        }
        TAG_BITFIELD => TypeDescriptor::Bitfield(read_leaf(r)?),
        TAG_TIME => TypeDescriptor::Time(read_leaf(r)?),
        TAG_REFERENCE => TypeDescriptor::Reference(read_leaf(r)?),
        TAG_ENUM => {
            let mut ty = EnumType::new(read_integer(r)?);
            let count = read_u32(r)?;
            for _ in 0..count {
                let name = read_name(r)?;
                let value = read_u64(r)?;
                ty.insert(name, value).map_err(invalid)?;
            }
            TypeDescriptor::Enum(ty)
        }
        TAG_COMPOUND => {
            let size = read_u32(r)? as usize;
            let count = read_u32(r)?;
            let mut builder = CompoundType::builder(size);
            for _ in 0..count {
                let name = read_name(r)?;
                let offset = read_u32(r)? as usize;
                let member = read_node(r, depth + 1)?;
                builder = builder.field(name, offset, member).map_err(invalid)?;
            }
            TypeDescriptor::Compound(builder.build().map_err(invalid)?)
        }
        TAG_ARRAY => {
            let rank = read_u8(r)?;
            let mut dims = Vec::new();
            for _ in 0..rank {
                dims.push(read_u32(r)? as usize);
            }
            let elem = read_node(r, depth + 1)?;
            TypeDescriptor::Array(ArrayType::new(elem, dims).map_err(invalid)?)
        }
        TAG_VLIST => TypeDescriptor::var_list(read_node(r, depth + 1)?),
        other => return Err(Error::Malformed(format!("unknown type tag {}", other))),
    };
    Ok(ty)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TypeDescriptor {
        let color = EnumType::from_members(IntegerType::U8, [("RED", 0), ("GREEN", 1)]).unwrap();
        let inner = CompoundType::builder(8)
            .field("re", 0, FloatType::F32.into())
            .and_then(|b| b.field("im", 4, FloatType::F32.into()))
            .and_then(|b| b.build())
            .unwrap();
        let outer = CompoundType::builder(40)
            .field("id", 0, IntegerType::I64.into())
            .and_then(|b| b.field("color", 8, TypeDescriptor::Enum(color)))
            .and_then(|b| {
                b.field(
                    "grid",
                    16,
                    TypeDescriptor::array(TypeDescriptor::Compound(inner), vec![1, 2]).unwrap(),
                )
            })
            .and_then(|b| {
                b.field(
                    "name",
                    32,
                    TypeDescriptor::String(StringType::variable(CharSet::Utf8)),
                )
            })
            .and_then(|b| b.build())
            .unwrap();
        TypeDescriptor::Compound(outer)
    }

    #[test]
    fn test_nested_round_trip() {
        let ty = sample();
        let blob = encode(&ty).unwrap();
        assert_eq!(blob.len(), encoded_len(&ty).unwrap());
        assert_eq!(&blob[..4], b"H5KT");
        assert_eq!(decode(&blob).unwrap(), ty);
    }

    #[test]
    fn test_encode_into_requires_exact_length() {
        let ty: TypeDescriptor = IntegerType::I32.into();
        let len = encoded_len(&ty).unwrap();
        let mut short = vec![0u8; len - 1];
        assert!(encode_into(&ty, &mut short).is_err());
        let mut exact = vec![0u8; len];
        assert_eq!(encode_into(&ty, &mut exact).unwrap(), len);
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(decode(&[]), Err(Error::EmptyInput)));
    }

    #[test]
    fn test_corruption_is_detected() {
        let mut blob = encode(&sample()).unwrap();
        let mid = blob.len() / 2;
        blob[mid] ^= 0x40;
        assert!(matches!(decode(&blob), Err(Error::Malformed(_))));
    }

    #[test]
    fn test_truncated_blob() {
        let blob = encode(&sample()).unwrap();
        let mut cut = blob[..blob.len() - 10].to_vec();
        seal_for_test(&mut cut);
        assert!(matches!(decode(&cut), Err(Error::Malformed(_))));
    }

    #[test]
    fn test_nesting_limit_is_symmetric() {
        let mut ty: TypeDescriptor = IntegerType::U8.into();
        for _ in 0..MAX_DEPTH - 1 {
            ty = TypeDescriptor::var_list(ty);
        }
        let blob = encode(&ty).unwrap();
        assert_eq!(decode(&blob).unwrap(), ty);

        let deeper = TypeDescriptor::var_list(ty);
        assert!(matches!(encoded_len(&deeper), Err(Error::InvalidArgument(_))));
        let err = encode(&deeper).unwrap_err();
        assert!(err.to_string().contains("nesting"));
    }

    #[test]
    fn test_decoder_rejects_deep_blobs() {
        // Hand-built: MAX_DEPTH vlist tags around a u8, one level past the cap.
        let mut blob = b"H5KT\x01".to_vec();
        blob.extend(std::iter::repeat(TAG_VLIST).take(MAX_DEPTH));
        blob.extend_from_slice(&[TAG_INTEGER, 1, 0, 0]);
        seal_for_test(&mut blob);
        let err = decode(&blob).unwrap_err();
        assert!(err.to_string().contains("nesting"));
    }

    #[test]
    fn test_invalid_layout_rejected_after_checksum() {
        // Compound of size 2 holding an i32: passes the CRC, fails the builder.
        let mut blob = vec![];
        blob.extend_from_slice(b"H5KT\x01");
        blob.push(TAG_COMPOUND);
        blob.extend_from_slice(&2u32.to_le_bytes());
        blob.extend_from_slice(&1u32.to_le_bytes());
        blob.extend_from_slice(&1u16.to_le_bytes());
        blob.push(b'x');
        blob.extend_from_slice(&0u32.to_le_bytes());
        blob.extend_from_slice(&[TAG_INTEGER, 4, 1, 0]);
        blob.extend_from_slice(&[0; 4]);
        seal(&mut blob);
        let err = decode(&blob).unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
        assert!(err.to_string().contains("exceeds compound size"));
    }

    /// Re-append a trailer over a shortened body.
    fn seal_for_test(body: &mut Vec<u8>) {
        body.extend_from_slice(&[0; 4]);
        seal(body);
    }
}
