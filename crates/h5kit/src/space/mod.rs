// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! N-dimensional addressing: dataspaces and selections.
//!
//! # Operators
//!
//! ```text
//! hyperslab: SET  OR  AND  XOR  NOTB (A \ B)  NOTA (B \ A)
//! points:    SET  APPEND  PREPEND
//! ```
//!
//! Hyperslab regions are kept as disjoint boxes so set algebra is exact;
//! only membership matters, never the decomposition. An empty result
//! becomes [`Selection::None`].
//!
//! # Example
//!
//! ```
//! use h5kit::space::{Dataspace, Hyperslab, SelectOp};
//!
//! let mut space = Dataspace::simple(&[5, 5], None)?;
//! let slab = Hyperslab::new(vec![1, 1], vec![2, 2]);
//! space.select_hyperslab(SelectOp::Set, &slab)?;
//! assert_eq!(space.selected_count(), 4);
//! space.select_hyperslab(SelectOp::Xor, &slab)?;
//! assert_eq!(space.selected_count(), 0);
//! # Ok::<(), h5kit::Error>(())
//! ```

mod dataspace;
pub mod region;
mod selection;

pub use dataspace::Dataspace;
pub use region::{Block, BlockSet};
pub use selection::{Hyperslab, SelectOp, Selection};

use crate::handle::{Handle, Resource, ResourceKind};
use std::fmt;

/// Maximum extent marker: the dimension may grow without bound.
pub const UNLIMITED: u64 = u64::MAX;

/// Largest supported rank.
pub const MAX_RANK: usize = 32;

/// Dataspace class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SpaceClass {
    /// No elements.
    Null,
    /// Exactly one element, rank 0.
    Scalar,
    /// Rectangular N-dimensional array.
    Simple,
}

impl SpaceClass {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Scalar => "scalar",
            Self::Simple => "simple",
        }
    }
}

impl fmt::Display for SpaceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Dataspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.class() {
            SpaceClass::Simple => {
                let dims: Vec<String> = self
                    .dims()
                    .iter()
                    .zip(self.max_dims())
                    .map(|(d, &m)| match m {
                        UNLIMITED => format!("{}/inf", d),
                        m if m == *d => d.to_string(),
                        m => format!("{}/{}", d, m),
                    })
                    .collect();
                write!(
                    f,
                    "simple[{}] ({}: {} selected)",
                    dims.join(", "),
                    self.selection().kind_name(),
                    self.selected_count()
                )
            }
            class => write!(f, "{}", class),
        }
    }
}

impl Resource for Dataspace {
    const KIND: ResourceKind = ResourceKind::Dataspace;
}

/// Registered handle to a dataspace.
pub type Space = Handle<Dataspace>;

/// One side of a transfer: the whole current extent, or a dataspace with its
/// selection.
#[derive(Debug, Clone, Copy)]
pub enum SpaceRef<'a> {
    All,
    Space(&'a Dataspace),
}

impl SpaceRef<'_> {
    /// The entire current extent of the dataset's own dataspace.
    pub const ALL: SpaceRef<'static> = SpaceRef::All;
}

impl<'a> From<&'a Dataspace> for SpaceRef<'a> {
    fn from(space: &'a Dataspace) -> Self {
        SpaceRef::Space(space)
    }
}
