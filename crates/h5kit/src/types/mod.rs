// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type descriptors: the schema of one stored element.
//!
//! A [`TypeDescriptor`] is a closed tagged union of leaves (integer, float,
//! string, opaque, bitfield, time, reference) and composites (enum, compound,
//! fixed array, variable-length list). Every constructor validates its
//! invariants, so a descriptor that exists is well formed.
//!
//! # Example
//!
//! ```
//! use h5kit::types::{CharSet, CompoundBuilder, IntegerType, StringType, TypeDescriptor};
//!
//! let record = CompoundBuilder::new(32)
//!     .field("id", 0, IntegerType::I32.into())?
//!     .field("name", 8, StringType::variable(CharSet::Utf8).into())?
//!     .build()?;
//! let ty = TypeDescriptor::from(record);
//! assert_eq!(ty.size(), Some(32));
//! assert!(ty.contains_variable_length());
//! # Ok::<(), h5kit::Error>(())
//! ```

pub mod compat;
mod compound;
mod descriptor;
mod display;
mod enums;

pub use compat::check_conversion;
pub use compound::{CompoundBuilder, CompoundType, Field};
pub use descriptor::{
    ArrayType, ByteOrder, CharSet, FloatType, IntegerType, LeafType, OpaqueType, StringLength,
    StringType, TypeClass, TypeDescriptor,
};
pub use enums::{EnumMember, EnumType};

use crate::handle::{Handle, Resource, ResourceKind};

impl Resource for TypeDescriptor {
    const KIND: ResourceKind = ResourceKind::Datatype;
}

/// Registered handle to a descriptor.
pub type Datatype = Handle<TypeDescriptor>;
