// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Structural description of host types.
//!
//! [`Reflect`] exposes the host layout of a type as a [`Shape`]: its identity,
//! byte size, and a closed [`Kind`] tag. Nested shapes are referenced through
//! [`ShapeFn`] pointers and are only produced on demand, so recursive types
//! can describe themselves without recursing at construction time.
//!
//! Std types are covered here; user records and enums get
//! `#[derive(Reflect)]`:
//!
//! ```
//! use h5kit::reflect::{Kind, Reflect};
//!
//! #[derive(Reflect)]
//! struct Sample {
//!     id: u32,
//!     #[hdf("temperature")]
//!     temp: f64,
//!     #[hdf(ignore)]
//!     cache: Vec<u8>,
//! }
//!
//! let shape = Sample::shape();
//! let Kind::Record { fields } = shape.kind else { unreachable!() };
//! assert_eq!(fields[1].stored_name(), "temperature");
//! assert!(fields[2].tags.ignore);
//! ```

mod impls;

use std::any::TypeId;

pub use h5kit_codegen::Reflect;

/// Lazily produces a nested shape.
pub type ShapeFn = fn() -> Shape;

/// Types whose host layout can be described.
pub trait Reflect: 'static {
    fn shape() -> Shape;
}

/// Host layout of one type.
#[derive(Debug, Clone)]
pub struct Shape {
    /// Identity, used for cycle detection.
    pub id: TypeId,
    /// Fully qualified type name.
    pub name: &'static str,
    /// `size_of` in bytes.
    pub size: usize,
    pub kind: Kind,
}

impl Shape {
    /// Shape of `T` with the given kind.
    pub fn new<T: 'static>(kind: Kind) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            size: std::mem::size_of::<T>(),
            kind,
        }
    }

    /// Shape of `T`.
    pub fn of<T: Reflect>() -> Self {
        T::shape()
    }

    /// Last path segment of the type name, generics stripped.
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        base.rsplit("::").next().unwrap_or(base)
    }
}

/// Closed set of structural kinds.
#[derive(Debug, Clone)]
pub enum Kind {
    Bool,
    Char,
    Int { width: usize, signed: bool },
    Float { width: usize },
    /// Two floats of `width` bytes each, real part first.
    Complex { width: usize },
    /// Native text (`String`, `&'static str`).
    Str,
    /// Fixed-length array `[T; len]`.
    Array { len: usize, elem: ShapeFn },
    /// Growable sequence of `elem`.
    Sequence { elem: ShapeFn },
    /// Associative container.
    Map,
    Record { fields: Vec<FieldShape> },
    /// Unit-only enum with a `width`-byte discriminant.
    Enumeration {
        width: usize,
        signed: bool,
        variants: Vec<VariantShape>,
    },
    /// Owning pointer, reference-counted pointer or optional value.
    Pointer { target: ShapeFn },
    Function,
    Channel,
    RawPointer,
    /// Zero-sized markers and anything with no storable content.
    Invalid,
}

impl Kind {
    /// Lower-case name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Char => "char",
            Self::Int { .. } => "integer",
            Self::Float { .. } => "float",
            Self::Complex { .. } => "complex",
            Self::Str => "string",
            Self::Array { .. } => "array",
            Self::Sequence { .. } => "sequence",
            Self::Map => "map",
            Self::Record { .. } => "record",
            Self::Enumeration { .. } => "enumeration",
            Self::Pointer { .. } => "pointer",
            Self::Function => "function",
            Self::Channel => "channel",
            Self::RawPointer => "raw pointer",
            Self::Invalid => "invalid type",
        }
    }
}

/// Annotations attached to a record member with `#[hdf(...)]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldTags {
    /// `#[hdf(ignore)]`: leave the member out of the compound.
    pub ignore: bool,
    /// `#[hdf("name")]` or `#[hdf(rename = "name")]`: stored member name.
    pub rename: Option<&'static str>,
    /// `#[hdf(type_ref = "/path")]`: resolve the member type by name.
    pub type_ref: Option<&'static str>,
}

impl FieldTags {
    pub const NONE: FieldTags = FieldTags {
        ignore: false,
        rename: None,
        type_ref: None,
    };
}

/// One record member.
#[derive(Debug, Clone)]
pub struct FieldShape {
    /// Declared member name (index for tuple structs).
    pub name: &'static str,
    /// Byte offset inside the record.
    pub offset: usize,
    /// `None` when the member type does not implement [`Reflect`] and was
    /// skipped or redirected by an annotation.
    pub shape: Option<ShapeFn>,
    pub tags: FieldTags,
}

impl FieldShape {
    /// Name stored in the compound: the rename tag if present.
    pub fn stored_name(&self) -> &'static str {
        self.tags.rename.unwrap_or(self.name)
    }
}

/// One unit variant of a host enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantShape {
    pub name: &'static str,
    /// Discriminant reinterpreted as unsigned in the enum's width.
    pub value: u64,
}
