// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Compact textual form of descriptors.
//!
//! ```text
//! i32le   u8be   f64le   string(utf8, variable)   string(ascii, 16)
//! opaque[8] "tag"   bitfield[4]le   enum(u8le){RED = 0, GREEN = 1}
//! compound[16] {id: i32le @0, value: f64le @8}
//! array[2x2] of i32le   vlist of f32le
//! ```

use super::{
    ByteOrder, CharSet, CompoundType, EnumType, FloatType, IntegerType, StringLength,
    StringType, TypeDescriptor,
};
use std::fmt;

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl fmt::Display for CharSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CharSet::Ascii => "ascii",
            CharSet::Utf8 => "utf8",
        })
    }
}

impl fmt::Display for IntegerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_signed() { 'i' } else { 'u' };
        write!(f, "{}{}{}", sign, self.width() * 8, self.order())
    }
}

impl fmt::Display for FloatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}{}", self.width() * 8, self.order())
    }
}

impl fmt::Display for StringType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.length() {
            StringLength::Fixed(n) => write!(f, "string({}, {})", self.charset(), n),
            StringLength::Variable => write!(f, "string({}, variable)", self.charset()),
        }
    }
}

impl fmt::Display for EnumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "enum({}){{", self.base())?;
        for (i, m) in self.members().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} = {}", m.name, m.value)?;
        }
        f.write_str("}")
    }
}

impl fmt::Display for CompoundType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "compound[{}] {{", self.size())?;
        for (i, field) in self.fields().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {} @{}", field.name(), field.ty(), field.offset())?;
        }
        f.write_str("}")
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(t) => fmt::Display::fmt(t, f),
            Self::Float(t) => fmt::Display::fmt(t, f),
            Self::String(t) => fmt::Display::fmt(t, f),
            Self::Opaque(t) => write!(f, "opaque[{}] {:?}", t.size(), t.tag()),
            Self::Bitfield(t) => write!(f, "bitfield[{}]{}", t.size(), t.order()),
            Self::Time(t) => write!(f, "time[{}]{}", t.size(), t.order()),
            Self::Reference(t) => write!(f, "reference[{}]{}", t.size(), t.order()),
            Self::Enum(t) => fmt::Display::fmt(t, f),
            Self::Compound(t) => fmt::Display::fmt(t, f),
            Self::Array(t) => {
                let dims: Vec<String> = t.dims().iter().map(ToString::to_string).collect();
                write!(f, "array[{}] of {}", dims.join("x"), t.element())
            }
            Self::VarList(elem) => write!(f, "vlist of {}", elem),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CompoundBuilder, LeafType, OpaqueType};

    #[test]
    fn test_leaf_forms() {
        let be = IntegerType::U16.with_order(ByteOrder::BigEndian);
        assert_eq!(be.to_string(), "u16be");
        let le = FloatType::F64.with_order(ByteOrder::LittleEndian);
        assert_eq!(le.to_string(), "f64le");
        assert_eq!(
            StringType::variable(CharSet::Utf8).to_string(),
            "string(utf8, variable)"
        );
        let op = TypeDescriptor::Opaque(OpaqueType::new(8, "blob").unwrap());
        assert_eq!(op.to_string(), "opaque[8] \"blob\"");
        let bf = TypeDescriptor::Bitfield(LeafType::new(4, ByteOrder::LittleEndian).unwrap());
        assert_eq!(bf.to_string(), "bitfield[4]le");
    }

    #[test]
    fn test_composite_forms() {
        let i32le: TypeDescriptor = IntegerType::I32.with_order(ByteOrder::LittleEndian).into();
        let c = CompoundBuilder::new(8)
            .field("a", 0, i32le.clone())
            .and_then(|b| b.field("b", 4, i32le.clone()))
            .and_then(CompoundBuilder::build)
            .unwrap();
        assert_eq!(c.to_string(), "compound[8] {a: i32le @0, b: i32le @4}");

        let arr = TypeDescriptor::array(i32le.clone(), vec![2, 2]).unwrap();
        assert_eq!(arr.to_string(), "array[2x2] of i32le");
        assert_eq!(TypeDescriptor::var_list(i32le).to_string(), "vlist of i32le");

        let e = EnumType::from_members(
            IntegerType::U8.with_order(ByteOrder::LittleEndian),
            [("A", 0), ("B", 3)],
        )
        .unwrap();
        assert_eq!(e.to_string(), "enum(u8le){A = 0, B = 3}");
    }
}
