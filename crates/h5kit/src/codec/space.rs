// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dataspace blobs.
//!
//! ```text
//! class u8 (0 null, 1 scalar, 2 simple), rank u8,
//! dims u64 * rank, max u64 * rank,
//! selection u8:
//!   0 none | 1 all
//!   2 hyperslab  count u32, {start u64 * rank, end u64 * rank}*
//!   3 points     count u32, {coord u64 * rank}*
//! ```

use super::{
    check_buffer, finish, open, read_u32, read_u64, read_u8, seal, to_u32, FORMAT_VERSION,
    HEADER_LEN, SPACE_MAGIC, TRAILER_LEN,
};
use crate::error::{Error, Result};
use crate::space::{Block, BlockSet, Dataspace, Selection, SpaceClass, MAX_RANK};
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{Cursor, Write};

const SEL_NONE: u8 = 0;
const SEL_ALL: u8 = 1;
const SEL_HYPERSLAB: u8 = 2;
const SEL_POINTS: u8 = 3;

/// Exact size of the blob [`encode_space`] would produce.
pub fn encoded_space_len(space: &Dataspace) -> Result<usize> {
    let rank = space.rank();
    let selection = match space.selection() {
        Selection::None | Selection::All => 0,
        Selection::Hyperslab(set) => 4 + set.blocks().len() * rank * 16,
        Selection::Points(list) => 4 + list.len() * rank * 8,
    };
    Ok(HEADER_LEN + 2 + rank * 16 + 1 + selection + TRAILER_LEN)
}

/// Encode into `buf`, which must be exactly [`encoded_space_len`] bytes.
pub fn encode_space_into(space: &Dataspace, buf: &mut [u8]) -> Result<usize> {
    let expected = encoded_space_len(space)?;
    check_buffer(buf, expected)?;
    {
        let mut w = Cursor::new(&mut buf[..expected - TRAILER_LEN]);
        write_body(&mut w, space).map_err(|e| {
            Error::InvalidArgument(format!("encode buffer overflow: {}", e))
        })?;
    }
    seal(buf);
    Ok(expected)
}

/// Encode a dataspace, selection included, into a fresh buffer.
pub fn encode_space(space: &Dataspace) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; encoded_space_len(space)?];
    encode_space_into(space, &mut buf)?;
    Ok(buf)
}

fn write_body(w: &mut Cursor<&mut [u8]>, space: &Dataspace) -> std::io::Result<()> {
    w.write_all(&SPACE_MAGIC)?;
    w.write_u8(FORMAT_VERSION)?;
    w.write_u8(match space.class() {
        SpaceClass::Null => 0,
        SpaceClass::Scalar => 1,
        SpaceClass::Simple => 2,
    })?;
    w.write_u8(space.rank() as u8)?;
    for &d in space.dims() {
        w.write_u64::<LittleEndian>(d)?;
    }
    for &m in space.max_dims() {
        w.write_u64::<LittleEndian>(m)?;
    }
    match space.selection() {
        Selection::None => w.write_u8(SEL_NONE)?,
        Selection::All => w.write_u8(SEL_ALL)?,
        Selection::Hyperslab(set) => {
            w.write_u8(SEL_HYPERSLAB)?;
            w.write_u32::<LittleEndian>(count_u32(set.blocks().len())?)?;
            for block in set.blocks() {
                for &s in block.start() {
                    w.write_u64::<LittleEndian>(s)?;
                }
                for &e in block.end() {
                    w.write_u64::<LittleEndian>(e)?;
                }
            }
        }
        Selection::Points(list) => {
            w.write_u8(SEL_POINTS)?;
            w.write_u32::<LittleEndian>(count_u32(list.len())?)?;
            for point in list {
                for &c in point {
                    w.write_u64::<LittleEndian>(c)?;
                }
            }
        }
    }
    Ok(())
}

fn count_u32(n: usize) -> std::io::Result<u32> {
    to_u32(n, "selection entry count")
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))
}

/// Decode a dataspace blob.
///
/// Extents go through [`Dataspace::from_extents`] and the selection is
/// re-checked against them.
pub fn decode_space(bytes: &[u8]) -> Result<Dataspace> {
    let mut r = open(bytes, SPACE_MAGIC, "space")?;
    let class = read_u8(&mut r)?;
    let rank = read_u8(&mut r)? as usize;
    if rank > MAX_RANK {
        return Err(Error::Malformed(format!("rank {} exceeds {}", rank, MAX_RANK)));
    }
    let mut dims = Vec::with_capacity(rank);
    for _ in 0..rank {
        dims.push(read_u64(&mut r)?);
    }
    let mut max_dims = Vec::with_capacity(rank);
    for _ in 0..rank {
        max_dims.push(read_u64(&mut r)?);
    }

    let mut space = match (class, rank) {
        (0, 0) => Dataspace::null(),
        (1, 0) => Dataspace::scalar(),
        (2, _) => Dataspace::from_extents(dims, max_dims).map_err(invalid)?,
        (0 | 1, _) => {
            return Err(Error::Malformed(format!(
                "null or scalar dataspace with rank {}",
                rank
            )))
        }
        (other, _) => return Err(Error::Malformed(format!("unknown space class {}", other))),
    };

    let selection = match read_u8(&mut r)? {
        SEL_NONE => Selection::None,
        SEL_ALL => Selection::All,
        SEL_HYPERSLAB => {
            let count = read_u32(&mut r)?;
            if count == 0 {
                return Err(Error::Malformed("empty hyperslab selection".to_string()));
            }
            let mut blocks = Vec::new();
            for _ in 0..count {
                let mut start = Vec::with_capacity(rank);
                for _ in 0..rank {
                    start.push(read_u64(&mut r)?);
                }
                let mut end = Vec::with_capacity(rank);
                for _ in 0..rank {
                    end.push(read_u64(&mut r)?);
                }
                blocks.push(Block::new(start, end).map_err(invalid)?);
            }
            Selection::Hyperslab(BlockSet::from_disjoint(rank, blocks).map_err(invalid)?)
        }
        SEL_POINTS => {
            let count = read_u32(&mut r)?;
            if count == 0 {
                return Err(Error::Malformed("empty point selection".to_string()));
            }
            let mut points = Vec::new();
            for _ in 0..count {
                let mut point = Vec::with_capacity(rank);
                for _ in 0..rank {
                    point.push(read_u64(&mut r)?);
                }
                points.push(point);
            }
            Selection::Points(points)
        }
        other => return Err(Error::Malformed(format!("unknown selection tag {}", other))),
    };
    finish(&r, "space")?;

    if space.class() != SpaceClass::Simple
        && !matches!(selection, Selection::None | Selection::All)
    {
        return Err(Error::Malformed(format!(
            "{} selection on a {} dataspace",
            selection.kind_name(),
            space.class()
        )));
    }
    space.restore_selection(selection).map_err(invalid)?;
    Ok(space)
}

fn invalid(e: Error) -> Error {
    Error::Malformed(format!("invalid dataspace: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::{Hyperslab, SelectOp, UNLIMITED};

    #[test]
    fn test_round_trip_with_hyperslab() {
        let mut space = Dataspace::simple(&[10, 10], Some(&[-1, 20])).unwrap();
        space
            .select_hyperslab(SelectOp::Set, &Hyperslab::new(vec![0, 0], vec![4, 4]))
            .unwrap();
        space
            .select_hyperslab(SelectOp::NotB, &Hyperslab::new(vec![1, 1], vec![2, 2]))
            .unwrap();
        let blob = encode_space(&space).unwrap();
        assert_eq!(blob.len(), encoded_space_len(&space).unwrap());
        let back = decode_space(&blob).unwrap();
        assert_eq!(back, space);
        assert_eq!(back.max_dims()[0], UNLIMITED);
        assert_eq!(back.selected_count(), 12);
    }

    #[test]
    fn test_round_trip_points_keep_order() {
        let mut space = Dataspace::simple(&[8], None).unwrap();
        space
            .select_points(SelectOp::Set, &[vec![5], vec![1], vec![5]])
            .unwrap();
        let back = decode_space(&encode_space(&space).unwrap()).unwrap();
        assert_eq!(back.selected_coords(), vec![vec![5], vec![1], vec![5]]);
    }

    #[test]
    fn test_null_and_scalar() {
        for space in [Dataspace::null(), Dataspace::scalar()] {
            let back = decode_space(&encode_space(&space).unwrap()).unwrap();
            assert_eq!(back, space);
        }
    }

    #[test]
    fn test_type_blob_is_not_a_space() {
        let blob = crate::codec::encode(&crate::types::IntegerType::U8.into()).unwrap();
        assert!(matches!(decode_space(&blob), Err(Error::Malformed(_))));
        assert!(matches!(decode_space(&[]), Err(Error::EmptyInput)));
    }

    #[test]
    fn test_max_below_current_is_rejected() {
        let space = Dataspace::simple(&[4], None).unwrap();
        let mut blob = encode_space(&space).unwrap();
        // max_dims[0] sits right after dims[0].
        let max_at = HEADER_LEN + 2 + 8;
        blob[max_at..max_at + 8].copy_from_slice(&2u64.to_le_bytes());
        seal(&mut blob);
        let err = decode_space(&blob).unwrap_err();
        assert!(err.to_string().contains("invalid dataspace"));
    }
}
