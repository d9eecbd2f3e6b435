// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dataspace: shape of a stored dataset plus its current selection.

use super::region::{Block, BlockSet};
use super::selection::{combine_regions, Hyperslab, SelectOp, Selection};
use super::{SpaceClass, MAX_RANK, UNLIMITED};
use crate::error::{Error, Result};

/// Rank, current extent, maximum extent and selection.
///
/// Cloning yields an independent value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Dataspace {
    class: SpaceClass,
    dims: Vec<u64>,
    max_dims: Vec<u64>,
    selection: Selection,
}

impl Dataspace {
    /// Dataspace with no elements.
    pub fn null() -> Self {
        Self {
            class: SpaceClass::Null,
            dims: Vec::new(),
            max_dims: Vec::new(),
            selection: Selection::None,
        }
    }

    /// Single-element dataspace of rank 0.
    pub fn scalar() -> Self {
        Self {
            class: SpaceClass::Scalar,
            dims: Vec::new(),
            max_dims: Vec::new(),
            selection: Selection::All,
        }
    }

    /// N-dimensional dataspace.
    ///
    /// Without `max`, the extent is fixed at `dims`. Negative entries of
    /// `max` become [`UNLIMITED`]; finite entries must be positive and at
    /// least the current extent.
    ///
    /// ```
    /// use h5kit::space::{Dataspace, UNLIMITED};
    ///
    /// let mut space = Dataspace::simple(&[3], Some(&[-1]))?;
    /// assert_eq!(space.max_dims(), &[UNLIMITED]);
    /// space.set_extent(&[10])?;
    /// assert_eq!(space.dims(), &[10]);
    /// # Ok::<(), h5kit::Error>(())
    /// ```
    pub fn simple(dims: &[u64], max: Option<&[i64]>) -> Result<Self> {
        let max_dims = match max {
            None => dims.to_vec(),
            Some(max) => {
                if max.len() != dims.len() {
                    return Err(Error::RankMismatch {
                        expected: dims.len(),
                        got: max.len(),
                    });
                }
                max.iter()
                    .map(|&m| if m < 0 { UNLIMITED } else { m as u64 })
                    .collect()
            }
        };
        Self::from_extents(dims.to_vec(), max_dims)
    }

    /// Simple dataspace from already-normalized extents.
    pub fn from_extents(dims: Vec<u64>, max_dims: Vec<u64>) -> Result<Self> {
        if dims.is_empty() || dims.len() > MAX_RANK {
            return Err(Error::InvalidArgument(format!(
                "simple dataspace rank must be in 1..={}, got {}",
                MAX_RANK,
                dims.len()
            )));
        }
        if max_dims.len() != dims.len() {
            return Err(Error::RankMismatch {
                expected: dims.len(),
                got: max_dims.len(),
            });
        }
        for (d, (&cur, &max)) in dims.iter().zip(&max_dims).enumerate() {
            if max == UNLIMITED {
                continue;
            }
            if max == 0 || max < cur {
                return Err(Error::InvalidArgument(format!(
                    "max extent {} in dimension {} must be positive and >= {}",
                    max, d, cur
                )));
            }
        }
        Ok(Self {
            class: SpaceClass::Simple,
            dims,
            max_dims,
            selection: Selection::All,
        })
    }

    pub fn class(&self) -> SpaceClass {
        self.class
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Current extent.
    pub fn dims(&self) -> &[u64] {
        &self.dims
    }

    /// Maximum extent ([`UNLIMITED`] entries allowed).
    pub fn max_dims(&self) -> &[u64] {
        &self.max_dims
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Number of elements in the current extent.
    pub fn element_count(&self) -> u64 {
        match self.class {
            SpaceClass::Null => 0,
            SpaceClass::Scalar => 1,
            SpaceClass::Simple => self.dims.iter().fold(1u64, |a, &d| a.saturating_mul(d)),
        }
    }

    /// Change the current extent within the maximum extent.
    pub fn set_extent(&mut self, dims: &[u64]) -> Result<()> {
        if self.class != SpaceClass::Simple {
            return Err(Error::InvalidArgument(format!(
                "cannot change the extent of a {} dataspace",
                self.class
            )));
        }
        if dims.len() != self.rank() {
            return Err(Error::RankMismatch {
                expected: self.rank(),
                got: dims.len(),
            });
        }
        for (d, (&new, &max)) in dims.iter().zip(&self.max_dims).enumerate() {
            if max != UNLIMITED && new > max {
                return Err(Error::OutOfBounds {
                    dim: d,
                    coord: new,
                    limit: max,
                });
            }
        }
        log::trace!("[space] extent {:?} -> {:?}", self.dims, dims);
        self.dims = dims.to_vec();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Selection operators
    // -----------------------------------------------------------------------

    pub fn select_all(&mut self) {
        self.selection = Selection::All;
    }

    pub fn select_none(&mut self) {
        self.selection = Selection::None;
    }

    fn check_finite_bound(&self, d: usize, coord: u64) -> Result<()> {
        let max = self.max_dims[d];
        if max != UNLIMITED && coord >= max {
            return Err(Error::OutOfBounds {
                dim: d,
                coord,
                limit: max,
            });
        }
        Ok(())
    }

    /// Whole current extent as a region.
    fn extent_region(&self) -> BlockSet {
        if self.dims.iter().any(|&d| d == 0) {
            return BlockSet::empty(self.rank());
        }
        match Block::new(vec![0; self.rank()], self.dims.clone()) {
            Ok(block) => BlockSet::from_block(block),
            Err(_) => BlockSet::empty(self.rank()),
        }
    }

    /// Combine a hyperslab with the current selection, in place.
    pub fn select_hyperslab(&mut self, op: SelectOp, slab: &Hyperslab) -> Result<()> {
        if self.class != SpaceClass::Simple {
            return Err(Error::InvalidOperator {
                op,
                target: self.class.name(),
            });
        }
        if matches!(op, SelectOp::Append | SelectOp::Prepend) {
            return Err(Error::InvalidOperator {
                op,
                target: "hyperslab",
            });
        }
        slab.validate(self.rank())?;
        for d in 0..self.rank() {
            self.check_finite_bound(d, slab.last_coord(d)?)?;
        }
        let new = slab.to_blocks()?;

        let current = match &self.selection {
            _ if op == SelectOp::Set => BlockSet::empty(self.rank()),
            Selection::None => BlockSet::empty(self.rank()),
            Selection::All => self.extent_region(),
            Selection::Hyperslab(set) => set.clone(),
            Selection::Points(_) => {
                return Err(Error::InvalidOperator {
                    op,
                    target: "point",
                })
            }
        };

        let result = combine_regions(op, &current, &new);
        log::trace!(
            "[space] hyperslab {} -> {} element(s) in {} block(s)",
            op,
            result.count(),
            result.blocks().len()
        );
        self.selection = Selection::from_blocks(result);
        Ok(())
    }

    /// Combine a point list with the current selection, in place.
    ///
    /// An empty list is a successful no-op.
    pub fn select_points(&mut self, op: SelectOp, coords: &[Vec<u64>]) -> Result<()> {
        if coords.is_empty() {
            return Ok(());
        }
        if self.class == SpaceClass::Null {
            return Err(Error::InvalidOperator {
                op,
                target: self.class.name(),
            });
        }
        if !matches!(op, SelectOp::Set | SelectOp::Append | SelectOp::Prepend) {
            return Err(Error::InvalidOperator {
                op,
                target: "point",
            });
        }
        for point in coords {
            if point.len() != self.rank() {
                return Err(Error::RankMismatch {
                    expected: self.rank(),
                    got: point.len(),
                });
            }
            for (d, &c) in point.iter().enumerate() {
                self.check_finite_bound(d, c)?;
            }
        }

        let mut current = match std::mem::replace(&mut self.selection, Selection::None) {
            Selection::Points(list) if op != SelectOp::Set => list,
            _ => Vec::new(),
        };
        match op {
            SelectOp::Prepend => {
                let mut list = coords.to_vec();
                list.append(&mut current);
                current = list;
            }
            _ => current.extend_from_slice(coords),
        }
        log::trace!("[space] points {} -> {} point(s)", op, current.len());
        self.selection = Selection::Points(current);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Number of selected elements (points are counted with multiplicity).
    pub fn selected_count(&self) -> u64 {
        match &self.selection {
            Selection::None => 0,
            Selection::All => self.element_count(),
            Selection::Hyperslab(set) => set.count(),
            Selection::Points(list) => list.len() as u64,
        }
    }

    pub fn is_selected(&self, coord: &[u64]) -> bool {
        if coord.len() != self.rank() {
            return false;
        }
        match &self.selection {
            Selection::None => false,
            Selection::All => {
                self.class != SpaceClass::Null
                    && coord.iter().zip(&self.dims).all(|(c, d)| c < d)
            }
            Selection::Hyperslab(set) => set.contains(coord),
            Selection::Points(list) => list.iter().any(|p| p.as_slice() == coord),
        }
    }

    /// Selected coordinates: row-major for regions, list order for points.
    pub fn selected_coords(&self) -> Vec<Vec<u64>> {
        match &self.selection {
            Selection::None => Vec::new(),
            Selection::All => match self.class {
                SpaceClass::Null => Vec::new(),
                SpaceClass::Scalar => vec![Vec::new()],
                SpaceClass::Simple => self.extent_region().coords(),
            },
            Selection::Hyperslab(set) => set.coords(),
            Selection::Points(list) => list.clone(),
        }
    }

    /// Row-major linear offsets of the selected coordinates within the
    /// current extent.
    pub fn selected_offsets(&self) -> Result<Vec<u64>> {
        self.selected_coords()
            .iter()
            .map(|coord| self.linear_offset(coord))
            .collect()
    }

    /// Row-major offset of `coord` within the current extent.
    pub fn linear_offset(&self, coord: &[u64]) -> Result<u64> {
        if coord.len() != self.rank() {
            return Err(Error::RankMismatch {
                expected: self.rank(),
                got: coord.len(),
            });
        }
        let mut offset = 0u64;
        for (d, (&c, &extent)) in coord.iter().zip(&self.dims).enumerate() {
            if c >= extent {
                return Err(Error::OutOfBounds {
                    dim: d,
                    coord: c,
                    limit: extent,
                });
            }
            offset = offset * extent + c;
        }
        Ok(offset)
    }

    /// Inclusive bounding box of the selection.
    pub fn selection_bounds(&self) -> Option<(Vec<u64>, Vec<u64>)> {
        match &self.selection {
            Selection::None => None,
            Selection::All => match self.class {
                SpaceClass::Null => None,
                SpaceClass::Scalar => Some((Vec::new(), Vec::new())),
                SpaceClass::Simple => self.extent_region().bounds(),
            },
            Selection::Hyperslab(set) => set.bounds(),
            Selection::Points(list) => {
                let first = list.first()?;
                let mut lo = first.clone();
                let mut hi = first.clone();
                for p in &list[1..] {
                    for d in 0..p.len() {
                        lo[d] = lo[d].min(p[d]);
                        hi[d] = hi[d].max(p[d]);
                    }
                }
                Some((lo, hi))
            }
        }
    }

    /// Whether every selected coordinate lies inside the current extent.
    pub fn selection_within_extent(&self) -> bool {
        match self.selection_bounds() {
            None => true,
            Some((_, hi)) => hi.iter().zip(&self.dims).all(|(h, d)| h < d),
        }
    }

    /// Restore a decoded selection after checking it against this extent.
    pub(crate) fn restore_selection(&mut self, selection: Selection) -> Result<()> {
        match &selection {
            Selection::Hyperslab(set) => {
                if self.class != SpaceClass::Simple || set.rank() != self.rank() {
                    return Err(Error::RankMismatch {
                        expected: self.rank(),
                        got: set.rank(),
                    });
                }
                if let Some((_, hi)) = set.bounds() {
                    for (d, &h) in hi.iter().enumerate() {
                        self.check_finite_bound(d, h)?;
                    }
                }
            }
            Selection::Points(list) => {
                for point in list {
                    if point.len() != self.rank() {
                        return Err(Error::RankMismatch {
                            expected: self.rank(),
                            got: point.len(),
                        });
                    }
                    for (d, &c) in point.iter().enumerate() {
                        self.check_finite_bound(d, c)?;
                    }
                }
            }
            Selection::None | Selection::All => {}
        }
        self.selection = selection;
        Ok(())
    }
}
