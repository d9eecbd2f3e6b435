// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Exact set algebra over unions of hyper-rectangles.
//!
//! A [`BlockSet`] holds pairwise disjoint, non-empty half-open boxes
//! `[start, end)`. Every operator keeps that invariant, so membership,
//! counting and enumeration never see the same coordinate twice.
//!
//! Operators never compare every pair of blocks. The right-hand side is
//! put in an [`Index`] that groups blocks by their interval in one
//! dimension, then by the next, so a query only visits blocks whose
//! projections overlap it. Subtracting many cutters from one block bisects
//! the block between cutter boundaries instead of cutting one at a time.

use crate::error::{Error, Result};

/// Half-open box `[start, end)` in every dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Block {
    start: Vec<u64>,
    end: Vec<u64>,
}

impl Block {
    /// `start[d] < end[d]` must hold in every dimension.
    pub fn new(start: Vec<u64>, end: Vec<u64>) -> Result<Self> {
        if start.len() != end.len() {
            return Err(Error::RankMismatch {
                expected: start.len(),
                got: end.len(),
            });
        }
        if let Some(d) = (0..start.len()).find(|&d| start[d] >= end[d]) {
            return Err(Error::InvalidArgument(format!(
                "empty block in dimension {}: [{}, {})",
                d, start[d], end[d]
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> &[u64] {
        &self.start
    }

    pub fn end(&self) -> &[u64] {
        &self.end
    }

    pub fn rank(&self) -> usize {
        self.start.len()
    }

    /// Number of coordinates inside, saturating at `u64::MAX`.
    pub fn volume(&self) -> u64 {
        self.start
            .iter()
            .zip(&self.end)
            .fold(1u64, |acc, (s, e)| acc.saturating_mul(e - s))
    }

    pub fn contains(&self, coord: &[u64]) -> bool {
        coord.len() == self.rank()
            && coord
                .iter()
                .zip(self.start.iter().zip(&self.end))
                .all(|(c, (s, e))| s <= c && c < e)
    }

    /// Whether the two boxes share at least one coordinate.
    fn overlaps(&self, other: &Block) -> bool {
        (0..self.rank()).all(|d| {
            self.start[d].max(other.start[d]) < self.end[d].min(other.end[d])
        })
    }

    /// Cut at `at` in dimension `d`; `start[d] < at < end[d]` must hold.
    fn split(&self, d: usize, at: u64) -> (Block, Block) {
        let mut below = self.clone();
        let mut above = self.clone();
        below.end[d] = at;
        above.start[d] = at;
        (below, above)
    }

    fn intersect(&self, other: &Block) -> Option<Block> {
        let mut start = Vec::with_capacity(self.rank());
        let mut end = Vec::with_capacity(self.rank());
        for d in 0..self.rank() {
            let s = self.start[d].max(other.start[d]);
            let e = self.end[d].min(other.end[d]);
            if s >= e {
                return None;
            }
            start.push(s);
            end.push(e);
        }
        Some(Block { start, end })
    }

    /// `self \ other` as at most `2 * rank` disjoint pieces.
    fn subtract(&self, other: &Block) -> Vec<Block> {
        let Some(cut) = self.intersect(other) else {
            return vec![self.clone()];
        };
        let mut pieces = Vec::new();
        let mut rest = self.clone();
        for d in 0..self.rank() {
            if rest.start[d] < cut.start[d] {
                let mut below = rest.clone();
                below.end[d] = cut.start[d];
                pieces.push(below);
                rest.start[d] = cut.start[d];
            }
            if cut.end[d] < rest.end[d] {
                let mut above = rest.clone();
                above.start[d] = cut.end[d];
                pieces.push(above);
                rest.end[d] = cut.end[d];
            }
        }
        pieces
    }

    /// Visit every coordinate in row-major order.
    fn for_each_coord(&self, mut visit: impl FnMut(&[u64])) {
        let rank = self.rank();
        if rank == 0 {
            visit(&[]);
            return;
        }
        let mut cursor = self.start.clone();
        loop {
            visit(&cursor);
            let mut d = rank;
            loop {
                if d == 0 {
                    return;
                }
                d -= 1;
                cursor[d] += 1;
                if cursor[d] < self.end[d] {
                    break;
                }
                cursor[d] = self.start[d];
            }
        }
    }
}

/// Disjoint union of blocks sharing one rank.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BlockSet {
    rank: usize,
    blocks: Vec<Block>,
}

impl BlockSet {
    pub fn empty(rank: usize) -> Self {
        Self {
            rank,
            blocks: Vec::new(),
        }
    }

    pub fn from_block(block: Block) -> Self {
        Self {
            rank: block.rank(),
            blocks: vec![block],
        }
    }

    /// Build from blocks that must already be pairwise disjoint. Overlaps
    /// are detected through an [`Index`], not by comparing every pair.
    pub fn from_disjoint(rank: usize, blocks: Vec<Block>) -> Result<Self> {
        if let Some(b) = blocks.iter().find(|b| b.rank() != rank) {
            return Err(Error::RankMismatch {
                expected: rank,
                got: b.rank(),
            });
        }
        {
            let index = Index::new(&blocks);
            let mut hits = Vec::new();
            for (i, b) in blocks.iter().enumerate() {
                hits.clear();
                index.overlapping(b, &mut hits);
                if hits.iter().any(|other| !std::ptr::eq(*other, b)) {
                    return Err(Error::InvalidArgument(format!(
                        "block {} overlaps another block",
                        i
                    )));
                }
            }
        }
        Ok(Self { rank, blocks })
    }

    /// Build from blocks the caller produced disjoint.
    pub(crate) fn from_disjoint_unchecked(rank: usize, blocks: Vec<Block>) -> Self {
        debug_assert!(blocks.iter().all(|b| b.rank() == rank));
        Self { rank, blocks }
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of coordinates, saturating at `u64::MAX`.
    pub fn count(&self) -> u64 {
        self.blocks
            .iter()
            .fold(0u64, |acc, b| acc.saturating_add(b.volume()))
    }

    pub fn contains(&self, coord: &[u64]) -> bool {
        self.blocks.iter().any(|b| b.contains(coord))
    }

    /// Inclusive bounding box.
    pub fn bounds(&self) -> Option<(Vec<u64>, Vec<u64>)> {
        let first = self.blocks.first()?;
        let mut lo = first.start.clone();
        let mut hi: Vec<u64> = first.end.iter().map(|e| e - 1).collect();
        for b in &self.blocks[1..] {
            for d in 0..self.rank {
                lo[d] = lo[d].min(b.start[d]);
                hi[d] = hi[d].max(b.end[d] - 1);
            }
        }
        Some((lo, hi))
    }

    /// All coordinates in row-major order.
    pub fn coords(&self) -> Vec<Vec<u64>> {
        let mut out = Vec::new();
        for b in &self.blocks {
            b.for_each_coord(|c| out.push(c.to_vec()));
        }
        out.sort_unstable();
        out
    }

    fn minus_all(pieces: Vec<Block>, cutters: &[Block]) -> Vec<Block> {
        if cutters.is_empty() {
            return pieces;
        }
        let index = Index::new(cutters);
        let mut out = Vec::with_capacity(pieces.len());
        let mut hits = Vec::new();
        for piece in pieces {
            hits.clear();
            index.overlapping(&piece, &mut hits);
            carve(piece, &hits, &mut out);
        }
        out
    }

    /// `self ∪ other`.
    pub fn union(&self, other: &BlockSet) -> BlockSet {
        let mut blocks = self.blocks.clone();
        blocks.extend(Self::minus_all(other.blocks.clone(), &self.blocks));
        BlockSet {
            rank: self.rank,
            blocks,
        }
    }

    /// `self ∩ other`.
    pub fn intersection(&self, other: &BlockSet) -> BlockSet {
        let index = Index::new(&other.blocks);
        let mut blocks = Vec::new();
        let mut hits = Vec::new();
        for a in &self.blocks {
            hits.clear();
            index.overlapping(a, &mut hits);
            blocks.extend(hits.iter().filter_map(|b| a.intersect(b)));
        }
        BlockSet {
            rank: self.rank,
            blocks,
        }
    }

    /// `self \ other`.
    pub fn difference(&self, other: &BlockSet) -> BlockSet {
        BlockSet {
            rank: self.rank,
            blocks: Self::minus_all(self.blocks.clone(), &other.blocks),
        }
    }

    /// `(self \ other) ∪ (other \ self)`.
    pub fn symmetric_difference(&self, other: &BlockSet) -> BlockSet {
        let mut blocks = Self::minus_all(self.blocks.clone(), &other.blocks);
        blocks.extend(Self::minus_all(other.blocks.clone(), &self.blocks));
        BlockSet {
            rank: self.rank,
            blocks,
        }
    }
}

/// Append `piece` minus every block of `cutters` to `out`. All cutters
/// overlap `piece` and are pairwise disjoint.
fn carve(piece: Block, cutters: &[&Block], out: &mut Vec<Block>) {
    if cutters.is_empty() {
        out.push(piece);
        return;
    }
    if cutters.len() <= CARVE_DIRECT {
        out.extend(subtract_each(piece, cutters));
        return;
    }

    // Bisect at the median cutter boundary of the busiest dimension. With
    // more than one disjoint cutter some boundary falls strictly inside.
    let mut best: Option<(usize, Vec<u64>)> = None;
    for d in 0..piece.rank() {
        let mut cuts: Vec<u64> = cutters
            .iter()
            .flat_map(|c| [c.start[d], c.end[d]])
            .filter(|&x| piece.start[d] < x && x < piece.end[d])
            .collect();
        cuts.sort_unstable();
        cuts.dedup();
        if best.as_ref().map_or(true, |(_, b)| cuts.len() > b.len()) {
            best = Some((d, cuts));
        }
    }
    let Some((d, cuts)) = best.filter(|(_, cuts)| !cuts.is_empty()) else {
        out.extend(subtract_each(piece, cutters));
        return;
    };
    let (below, above) = piece.split(d, cuts[cuts.len() / 2]);
    for half in [below, above] {
        let inside: Vec<&Block> = cutters.iter().copied().filter(|c| c.overlaps(&half)).collect();
        carve(half, &inside, out);
    }
}

fn subtract_each(piece: Block, cutters: &[&Block]) -> Vec<Block> {
    cutters.iter().fold(vec![piece], |acc, cutter| {
        acc.iter().flat_map(|p| p.subtract(cutter)).collect()
    })
}

/// Cutter count at or below which [`carve`] subtracts one cutter at a time.
const CARVE_DIRECT: usize = 4;

/// Block count at or below which an [`Index`] level is scanned linearly.
const INDEX_LEAF: usize = 8;

/// Overlap queries over a fixed list of blocks.
///
/// Each level picks the dimension whose distinct intervals overlap least,
/// groups the blocks sharing an interval there into a slab, and keeps the
/// slabs sorted by start with a max-end tree on top. Each slab indexes its
/// members on the remaining dimensions.
enum Index<'a> {
    Flat(Vec<&'a Block>),
    Split {
        dim: usize,
        slabs: Vec<Slab<'a>>,
        /// Segment tree of the largest slab end below each node.
        max_end: Vec<u64>,
    },
}

struct Slab<'a> {
    start: u64,
    end: u64,
    members: Index<'a>,
}

impl<'a> Index<'a> {
    fn new(blocks: &'a [Block]) -> Self {
        let rank = blocks.first().map_or(0, Block::rank);
        let free: Vec<usize> = (0..rank).collect();
        Self::build(blocks.iter().collect(), &free)
    }

    fn build(mut blocks: Vec<&'a Block>, free: &[usize]) -> Self {
        if blocks.len() <= INDEX_LEAF || free.is_empty() {
            return Self::Flat(blocks);
        }
        let dim = free
            .iter()
            .copied()
            .min_by_key(|&d| interval_overlaps(&blocks, d))
            .unwrap_or(free[0]);
        let rest: Vec<usize> = free.iter().copied().filter(|&d| d != dim).collect();

        blocks.sort_unstable_by_key(|b| (b.start[dim], b.end[dim]));
        let mut slabs = Vec::new();
        let mut group: Vec<&'a Block> = Vec::new();
        let mut key = None;
        for b in blocks {
            let interval = (b.start[dim], b.end[dim]);
            if key != Some(interval) {
                if let Some((start, end)) = key {
                    slabs.push(Slab {
                        start,
                        end,
                        members: Self::build(std::mem::take(&mut group), &rest),
                    });
                }
                key = Some(interval);
            }
            group.push(b);
        }
        if let Some((start, end)) = key {
            slabs.push(Slab {
                start,
                end,
                members: Self::build(group, &rest),
            });
        }

        let mut max_end = vec![0; 4 * slabs.len()];
        fill_max_end(&slabs, &mut max_end, 0, 0, slabs.len());
        Self::Split {
            dim,
            slabs,
            max_end,
        }
    }

    /// Push every indexed block sharing a coordinate with `query`.
    fn overlapping(&self, query: &Block, out: &mut Vec<&'a Block>) {
        match self {
            Self::Flat(blocks) => out.extend(blocks.iter().copied().filter(|b| b.overlaps(query))),
            Self::Split {
                dim,
                slabs,
                max_end,
            } => {
                let stop = slabs.partition_point(|s| s.start < query.end[*dim]);
                let probe = Probe {
                    query,
                    from: query.start[*dim],
                    stop,
                };
                probe.visit(slabs, max_end, 0, 0, slabs.len(), out);
            }
        }
    }
}

/// Slab range query: slabs `[0, stop)` whose end exceeds `from`.
struct Probe<'q> {
    query: &'q Block,
    from: u64,
    stop: usize,
}

impl Probe<'_> {
    fn visit<'a>(
        &self,
        slabs: &[Slab<'a>],
        max_end: &[u64],
        node: usize,
        lo: usize,
        hi: usize,
        out: &mut Vec<&'a Block>,
    ) {
        if lo >= self.stop || max_end[node] <= self.from {
            return;
        }
        if hi - lo == 1 {
            slabs[lo].members.overlapping(self.query, out);
            return;
        }
        let mid = lo + (hi - lo) / 2;
        self.visit(slabs, max_end, 2 * node + 1, lo, mid, out);
        self.visit(slabs, max_end, 2 * node + 2, mid, hi, out);
    }
}

fn fill_max_end(slabs: &[Slab<'_>], tree: &mut [u64], node: usize, lo: usize, hi: usize) -> u64 {
    let max = if hi - lo == 1 {
        slabs[lo].end
    } else {
        let mid = lo + (hi - lo) / 2;
        let left = fill_max_end(slabs, tree, 2 * node + 1, lo, mid);
        left.max(fill_max_end(slabs, tree, 2 * node + 2, mid, hi))
    };
    tree[node] = max;
    max
}

/// Pairs of distinct intervals overlapping in dimension `d`.
fn interval_overlaps(blocks: &[&Block], d: usize) -> u64 {
    let mut intervals: Vec<(u64, u64)> = blocks.iter().map(|b| (b.start[d], b.end[d])).collect();
    intervals.sort_unstable();
    intervals.dedup();
    let mut ends: Vec<u64> = intervals.iter().map(|&(_, e)| e).collect();
    ends.sort_unstable();
    let n = intervals.len() as u64;
    // An unordered pair is apart when one ends at or before the other starts.
    let apart: u64 = intervals
        .iter()
        .map(|&(s, _)| ends.partition_point(|&e| e <= s) as u64)
        .sum();
    (n * n.saturating_sub(1) / 2).saturating_sub(apart)
}

/// Two sets are equal when they select the same coordinates.
impl PartialEq for BlockSet {
    fn eq(&self, other: &Self) -> bool {
        self.rank == other.rank
            && self.count() == other.count()
            && self.difference(other).is_empty()
    }
}
