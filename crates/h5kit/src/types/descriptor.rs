// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Leaf descriptors and the [`TypeDescriptor`] union.

use super::{CompoundType, EnumType};
use crate::error::{Error, Result};
use crate::space::MAX_RANK;

/// Byte order of a numeric leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

impl ByteOrder {
    /// Byte order of the host.
    #[cfg(target_endian = "little")]
    pub const NATIVE: ByteOrder = ByteOrder::LittleEndian;
    #[cfg(target_endian = "big")]
    pub const NATIVE: ByteOrder = ByteOrder::BigEndian;

    /// Two-letter suffix used by `Display` (`le` / `be`).
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::LittleEndian => "le",
            Self::BigEndian => "be",
        }
    }
}

/// Character set of a string leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum CharSet {
    Ascii,
    Utf8,
}

/// Length discipline of a string leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum StringLength {
    /// Exactly `n > 0` bytes.
    Fixed(usize),
    /// Any length; no fixed byte size.
    Variable,
}

fn check_width(width: usize, allowed: &[usize], what: &str) -> Result<()> {
    if allowed.contains(&width) {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "{} width must be one of {:?}, got {}",
            what, allowed, width
        )))
    }
}

// ---------------------------------------------------------------------------
// Numeric leaves
// ---------------------------------------------------------------------------

/// Integer leaf: width in {1, 2, 4, 8} bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct IntegerType {
    width: usize,
    signed: bool,
    order: ByteOrder,
}

impl IntegerType {
    pub const U8: IntegerType = IntegerType::native(1, false);
    pub const U16: IntegerType = IntegerType::native(2, false);
    pub const U32: IntegerType = IntegerType::native(4, false);
    pub const U64: IntegerType = IntegerType::native(8, false);
    pub const I8: IntegerType = IntegerType::native(1, true);
    pub const I16: IntegerType = IntegerType::native(2, true);
    pub const I32: IntegerType = IntegerType::native(4, true);
    pub const I64: IntegerType = IntegerType::native(8, true);

    const fn native(width: usize, signed: bool) -> Self {
        Self {
            width,
            signed,
            order: ByteOrder::NATIVE,
        }
    }

    /// Native-order integer of `width` bytes.
    pub fn new(width: usize, signed: bool) -> Result<Self> {
        check_width(width, &[1, 2, 4, 8], "integer")?;
        Ok(Self::native(width, signed))
    }

    pub fn with_order(mut self, order: ByteOrder) -> Self {
        self.order = order;
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    /// Largest unsigned value representable in `width` bytes.
    pub fn max_unsigned(&self) -> u64 {
        if self.width >= 8 {
            u64::MAX
        } else {
            (1u64 << (self.width * 8)) - 1
        }
    }
}

/// Floating-point leaf: width in {4, 8} bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FloatType {
    width: usize,
    order: ByteOrder,
}

impl FloatType {
    pub const F32: FloatType = FloatType {
        width: 4,
        order: ByteOrder::NATIVE,
    };
    pub const F64: FloatType = FloatType {
        width: 8,
        order: ByteOrder::NATIVE,
    };

    pub fn new(width: usize) -> Result<Self> {
        check_width(width, &[4, 8], "float")?;
        Ok(Self {
            width,
            order: ByteOrder::NATIVE,
        })
    }

    pub fn with_order(mut self, order: ByteOrder) -> Self {
        self.order = order;
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }
}

// ---------------------------------------------------------------------------
// Strings and opaque leaves
// ---------------------------------------------------------------------------

/// String leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StringType {
    charset: CharSet,
    length: StringLength,
}

impl StringType {
    /// Variable-length string.
    pub const fn variable(charset: CharSet) -> Self {
        Self {
            charset,
            length: StringLength::Variable,
        }
    }

    /// Fixed-length string of `len > 0` bytes.
    pub fn fixed(charset: CharSet, len: usize) -> Result<Self> {
        if len == 0 {
            return Err(Error::InvalidArgument(
                "fixed string length must be positive".to_string(),
            ));
        }
        Ok(Self {
            charset,
            length: StringLength::Fixed(len),
        })
    }

    pub fn charset(&self) -> CharSet {
        self.charset
    }

    pub fn length(&self) -> StringLength {
        self.length
    }
}

/// Uninterpreted bytes with a descriptive tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct OpaqueType {
    size: usize,
    tag: String,
}

impl OpaqueType {
    pub fn new(size: usize, tag: impl Into<String>) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidArgument(
                "opaque size must be positive".to_string(),
            ));
        }
        Ok(Self {
            size,
            tag: tag.into(),
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

/// Fixed-size leaf carrying only a byte order (bitfield, time, reference).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LeafType {
    size: usize,
    order: ByteOrder,
}

impl LeafType {
    pub fn new(size: usize, order: ByteOrder) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidArgument(
                "leaf size must be positive".to_string(),
            ));
        }
        Ok(Self { size, order })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }
}

// ---------------------------------------------------------------------------
// Arrays
// ---------------------------------------------------------------------------

/// Fixed multi-dimensional array of one element type.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ArrayType {
    elem: Box<TypeDescriptor>,
    dims: Vec<usize>,
}

impl ArrayType {
    /// `dims` must be non-empty, at most 32 long, and strictly positive.
    pub fn new(elem: TypeDescriptor, dims: Vec<usize>) -> Result<Self> {
        if dims.is_empty() || dims.len() > MAX_RANK {
            return Err(Error::InvalidArgument(format!(
                "array rank must be in 1..={}, got {}",
                MAX_RANK,
                dims.len()
            )));
        }
        if let Some(pos) = dims.iter().position(|&d| d == 0) {
            return Err(Error::InvalidArgument(format!(
                "array dimension {} is zero",
                pos
            )));
        }
        Ok(Self {
            elem: Box::new(elem),
            dims,
        })
    }

    pub fn element(&self) -> &TypeDescriptor {
        &self.elem
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// TypeDescriptor
// ---------------------------------------------------------------------------

/// Class tag of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TypeClass {
    Integer,
    Float,
    String,
    Opaque,
    Bitfield,
    Time,
    Reference,
    Enum,
    Compound,
    Array,
    VarList,
}

impl TypeClass {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Opaque => "opaque",
            Self::Bitfield => "bitfield",
            Self::Time => "time",
            Self::Reference => "reference",
            Self::Enum => "enum",
            Self::Compound => "compound",
            Self::Array => "array",
            Self::VarList => "vlist",
        }
    }
}

/// Schema of one stored element.
///
/// Composite descriptors own their nested descriptors; a descriptor is never
/// mutated once built.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TypeDescriptor {
    Integer(IntegerType),
    Float(FloatType),
    String(StringType),
    Opaque(OpaqueType),
    Bitfield(LeafType),
    Time(LeafType),
    Reference(LeafType),
    Enum(EnumType),
    Compound(CompoundType),
    Array(ArrayType),
    VarList(Box<TypeDescriptor>),
}

impl TypeDescriptor {
    /// Variable-length list of `elem`.
    pub fn var_list(elem: TypeDescriptor) -> Self {
        Self::VarList(Box::new(elem))
    }

    /// Fixed array of `elem`.
    pub fn array(elem: TypeDescriptor, dims: Vec<usize>) -> Result<Self> {
        Ok(Self::Array(ArrayType::new(elem, dims)?))
    }

    pub fn class(&self) -> TypeClass {
        match self {
            Self::Integer(_) => TypeClass::Integer,
            Self::Float(_) => TypeClass::Float,
            Self::String(_) => TypeClass::String,
            Self::Opaque(_) => TypeClass::Opaque,
            Self::Bitfield(_) => TypeClass::Bitfield,
            Self::Time(_) => TypeClass::Time,
            Self::Reference(_) => TypeClass::Reference,
            Self::Enum(_) => TypeClass::Enum,
            Self::Compound(_) => TypeClass::Compound,
            Self::Array(_) => TypeClass::Array,
            Self::VarList(_) => TypeClass::VarList,
        }
    }

    /// Stored byte size, or `None` when the element has no fixed size.
    ///
    /// A compound always has a fixed size: variable-length members occupy a
    /// fixed slot in it.
    pub fn size(&self) -> Option<usize> {
        match self {
            Self::Integer(t) => Some(t.width()),
            Self::Float(t) => Some(t.width()),
            Self::String(t) => match t.length() {
                StringLength::Fixed(n) => Some(n),
                StringLength::Variable => None,
            },
            Self::Opaque(t) => Some(t.size()),
            Self::Bitfield(t) | Self::Time(t) | Self::Reference(t) => Some(t.size()),
            Self::Enum(t) => Some(t.base().width()),
            Self::Compound(t) => Some(t.size()),
            Self::Array(t) => t.element().size().map(|s| s * t.len()),
            Self::VarList(_) => None,
        }
    }

    pub fn is_variable_length(&self) -> bool {
        self.size().is_none()
    }

    /// Whether a variable-length leaf appears anywhere in the tree.
    pub fn contains_variable_length(&self) -> bool {
        match self {
            Self::String(t) => t.length() == StringLength::Variable,
            Self::VarList(_) => true,
            Self::Array(t) => t.element().contains_variable_length(),
            Self::Compound(t) => t.fields().iter().any(|f| f.ty().contains_variable_length()),
            _ => false,
        }
    }

    pub fn as_compound(&self) -> Option<&CompoundType> {
        match self {
            Self::Compound(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumType> {
        match self {
            Self::Enum(e) => Some(e),
            _ => None,
        }
    }
}

impl From<IntegerType> for TypeDescriptor {
    fn from(t: IntegerType) -> Self {
        Self::Integer(t)
    }
}

impl From<FloatType> for TypeDescriptor {
    fn from(t: FloatType) -> Self {
        Self::Float(t)
    }
}

impl From<StringType> for TypeDescriptor {
    fn from(t: StringType) -> Self {
        Self::String(t)
    }
}

impl From<EnumType> for TypeDescriptor {
    fn from(t: EnumType) -> Self {
        Self::Enum(t)
    }
}

impl From<CompoundType> for TypeDescriptor {
    fn from(t: CompoundType) -> Self {
        Self::Compound(t)
    }
}

impl From<ArrayType> for TypeDescriptor {
    fn from(t: ArrayType) -> Self {
        Self::Array(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_widths() {
        assert!(IntegerType::new(3, true).is_err());
        assert!(IntegerType::new(16, false).is_err());
        let t = IntegerType::new(2, true).unwrap();
        assert_eq!(t, IntegerType::I16);
        assert_eq!(IntegerType::U8.max_unsigned(), 255);
        assert_eq!(IntegerType::U64.max_unsigned(), u64::MAX);
    }

    #[test]
    fn test_float_widths() {
        assert!(FloatType::new(2).is_err());
        assert_eq!(FloatType::new(8).unwrap(), FloatType::F64);
    }

    #[test]
    fn test_sizes() {
        assert_eq!(TypeDescriptor::from(IntegerType::I32).size(), Some(4));
        let vs = TypeDescriptor::from(StringType::variable(CharSet::Utf8));
        assert_eq!(vs.size(), None);
        assert!(vs.is_variable_length());
        let fs = StringType::fixed(CharSet::Ascii, 12).unwrap();
        assert_eq!(TypeDescriptor::from(fs).size(), Some(12));
        assert!(StringType::fixed(CharSet::Ascii, 0).is_err());

        let arr = TypeDescriptor::array(IntegerType::I32.into(), vec![2, 3]).unwrap();
        assert_eq!(arr.size(), Some(24));
        let varr = TypeDescriptor::array(vs.clone(), vec![4]).unwrap();
        assert_eq!(varr.size(), None);
        assert_eq!(TypeDescriptor::var_list(IntegerType::U8.into()).size(), None);
    }

    #[test]
    fn test_array_validation() {
        assert!(ArrayType::new(IntegerType::U8.into(), vec![]).is_err());
        assert!(ArrayType::new(IntegerType::U8.into(), vec![2, 0]).is_err());
        assert!(ArrayType::new(IntegerType::U8.into(), vec![1; 33]).is_err());
        let a = ArrayType::new(IntegerType::U8.into(), vec![2, 2]).unwrap();
        assert_eq!(a.len(), 4);
    }

    #[test]
    fn test_leaf_validation() {
        assert!(OpaqueType::new(0, "blob").is_err());
        assert!(LeafType::new(0, ByteOrder::BigEndian).is_err());
        let t = LeafType::new(8, ByteOrder::BigEndian).unwrap();
        assert_eq!(TypeDescriptor::Time(t).class(), TypeClass::Time);
    }
}
