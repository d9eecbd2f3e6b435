// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Selections: which elements of a dataspace take part in a transfer.

use super::region::{Block, BlockSet};
use crate::error::{Error, Result};
use std::fmt;

/// How a new hyperslab or point list combines with the current selection.
///
/// `A` is the current selection, `B` the new region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SelectOp {
    /// Replace: `B`.
    Set,
    /// Union: `A ∪ B`.
    Or,
    /// Intersection: `A ∩ B`.
    And,
    /// Exclusive union.
    Xor,
    /// `A \ B`.
    NotB,
    /// `B \ A`.
    NotA,
    /// Points only: `A` followed by `B`.
    Append,
    /// Points only: `B` followed by `A`.
    Prepend,
}

impl fmt::Display for SelectOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Set => "SET",
            Self::Or => "OR",
            Self::And => "AND",
            Self::Xor => "XOR",
            Self::NotB => "NOTB",
            Self::NotA => "NOTA",
            Self::Append => "APPEND",
            Self::Prepend => "PREPEND",
        })
    }
}

/// Regular pattern of blocks: `count` blocks of `block` elements spaced
/// `stride` apart, starting at `start`. `stride` and `block` default to 1.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Hyperslab {
    start: Vec<u64>,
    stride: Option<Vec<u64>>,
    count: Vec<u64>,
    block: Option<Vec<u64>>,
}

impl Hyperslab {
    pub fn new(start: impl Into<Vec<u64>>, count: impl Into<Vec<u64>>) -> Self {
        Self {
            start: start.into(),
            stride: None,
            count: count.into(),
            block: None,
        }
    }

    pub fn stride(mut self, stride: impl Into<Vec<u64>>) -> Self {
        self.stride = Some(stride.into());
        self
    }

    pub fn block(mut self, block: impl Into<Vec<u64>>) -> Self {
        self.block = Some(block.into());
        self
    }

    pub fn rank(&self) -> usize {
        self.start.len()
    }

    fn stride_at(&self, d: usize) -> u64 {
        self.stride.as_ref().map_or(1, |s| s[d])
    }

    fn block_at(&self, d: usize) -> u64 {
        self.block.as_ref().map_or(1, |b| b[d])
    }

    /// Check lengths against `rank` and the per-dimension constraints.
    pub(crate) fn validate(&self, rank: usize) -> Result<()> {
        let lens = [
            Some(self.start.len()),
            Some(self.count.len()),
            self.stride.as_ref().map(Vec::len),
            self.block.as_ref().map(Vec::len),
        ];
        if let Some(got) = lens.into_iter().flatten().find(|&len| len != rank) {
            return Err(Error::RankMismatch {
                expected: rank,
                got,
            });
        }
        for d in 0..rank {
            let (count, stride, block) = (self.count[d], self.stride_at(d), self.block_at(d));
            if count == 0 || block == 0 {
                return Err(Error::InvalidArgument(format!(
                    "count and block must be positive (dimension {})",
                    d
                )));
            }
            if count > 1 && stride < block {
                return Err(Error::InvalidArgument(format!(
                    "stride {} smaller than block {} in dimension {}",
                    stride, block, d
                )));
            }
        }
        Ok(())
    }

    /// Last selected coordinate (inclusive) in dimension `d`.
    pub(crate) fn last_coord(&self, d: usize) -> Result<u64> {
        (self.count[d] - 1)
            .checked_mul(self.stride_at(d))
            .and_then(|v| v.checked_add(self.start[d]))
            .and_then(|v| v.checked_add(self.block_at(d) - 1))
            .ok_or_else(|| {
                Error::InvalidArgument(format!("hyperslab overflows in dimension {}", d))
            })
    }

    /// Expand into disjoint blocks. Contiguous patterns collapse to one
    /// interval per dimension. `validate` guarantees `stride >= block`, so
    /// the blocks are disjoint without checking pairs.
    pub(crate) fn to_blocks(&self) -> Result<BlockSet> {
        let rank = self.rank();
        let mut per_dim: Vec<Vec<(u64, u64)>> = Vec::with_capacity(rank);
        for d in 0..rank {
            let (start, count, stride, block) =
                (self.start[d], self.count[d], self.stride_at(d), self.block_at(d));
            let end = self.last_coord(d)? + 1;
            if count == 1 || stride == block {
                per_dim.push(vec![(start, end)]);
            } else {
                per_dim.push(
                    (0..count)
                        .map(|k| {
                            let s = start + k * stride;
                            (s, s + block)
                        })
                        .collect(),
                );
            }
        }

        let mut blocks = Vec::new();
        let mut idx = vec![0usize; rank];
        'outer: loop {
            let start: Vec<u64> = (0..rank).map(|d| per_dim[d][idx[d]].0).collect();
            let end: Vec<u64> = (0..rank).map(|d| per_dim[d][idx[d]].1).collect();
            blocks.push(Block::new(start, end)?);
            let mut d = rank;
            loop {
                if d == 0 {
                    break 'outer;
                }
                d -= 1;
                idx[d] += 1;
                if idx[d] < per_dim[d].len() {
                    break;
                }
                idx[d] = 0;
            }
        }
        Ok(BlockSet::from_disjoint_unchecked(rank, blocks))
    }
}

/// Current selection of a dataspace.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Selection {
    None,
    All,
    /// Union of hyperslab regions; never empty.
    Hyperslab(BlockSet),
    /// Ordered list of coordinates; never empty.
    Points(Vec<Vec<u64>>),
}

impl Selection {
    /// Name used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::All => "all",
            Self::Hyperslab(_) => "hyperslab",
            Self::Points(_) => "point",
        }
    }

    pub(crate) fn from_blocks(set: BlockSet) -> Self {
        if set.is_empty() {
            Self::None
        } else {
            Self::Hyperslab(set)
        }
    }
}

/// Combine `current` (already expanded) with `new` under `op`.
pub(crate) fn combine_regions(op: SelectOp, current: &BlockSet, new: &BlockSet) -> BlockSet {
    match op {
        SelectOp::Set => new.clone(),
        SelectOp::Or => current.union(new),
        SelectOp::And => current.intersection(new),
        SelectOp::Xor => current.symmetric_difference(new),
        SelectOp::NotB => current.difference(new),
        SelectOp::NotA => new.difference(current),
        // Rejected before reaching here.
        SelectOp::Append | SelectOp::Prepend => current.clone(),
    }
}
