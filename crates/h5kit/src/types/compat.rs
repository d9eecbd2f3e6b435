// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Conversion compatibility between a stored and a memory descriptor.
//!
//! Checked before every transfer. Mirrors the conversions a container engine
//! can perform on the fly:
//!
//! | source | destination |
//! |---|---|
//! | integer | integer, float |
//! | float | float, integer |
//! | string | string |
//! | enum | enum holding every source member name |
//! | compound | compound sharing at least one member name (recursively compatible) |
//! | array | array with the same dims (compatible elements) |
//! | vlist | vlist (compatible elements) |
//! | opaque | opaque with the same size and tag |
//! | bitfield / time / reference | same class and size |

use super::{TypeClass, TypeDescriptor};
use crate::error::{Error, Result};

/// Check that values of `src` can be converted into `dst`.
pub fn check_conversion(src: &TypeDescriptor, dst: &TypeDescriptor) -> Result<()> {
    check_at(src, dst, "")
}

fn incompatible(path: &str, src: &TypeDescriptor, dst: &TypeDescriptor, why: &str) -> Error {
    let at = if path.is_empty() { "<root>" } else { path };
    Error::IncompatibleTypes(format!("{} -> {} at `{}`: {}", src, dst, at, why))
}

fn class_mismatch(path: &str, src: &TypeDescriptor, dst: &TypeDescriptor) -> Error {
    let why = format!(
        "no conversion from {} to {}",
        src.class().name(),
        dst.class().name()
    );
    incompatible(path, src, dst, &why)
}

fn check_at(src: &TypeDescriptor, dst: &TypeDescriptor, path: &str) -> Result<()> {
    use TypeDescriptor as T;

    if !classes_convertible(src.class(), dst.class()) {
        return Err(class_mismatch(path, src, dst));
    }
    match (src, dst) {
        (T::Integer(_) | T::Float(_), T::Integer(_) | T::Float(_)) => Ok(()),
        (T::String(_), T::String(_)) => Ok(()),
        (T::Enum(s), T::Enum(d)) => {
            match s.members().iter().find(|m| d.value_of(&m.name).is_none()) {
                Some(missing) => Err(incompatible(
                    path,
                    src,
                    dst,
                    &format!("member `{}` has no counterpart", missing.name),
                )),
                None => Ok(()),
            }
        }
        (T::Compound(s), T::Compound(d)) => {
            let mut common = 0usize;
            for field in s.fields() {
                if let Some(other) = d.field(field.name()) {
                    let sub = if path.is_empty() {
                        field.name().to_string()
                    } else {
                        format!("{}.{}", path, field.name())
                    };
                    check_at(field.ty(), other.ty(), &sub)?;
                    common += 1;
                }
            }
            if common == 0 {
                return Err(incompatible(path, src, dst, "no member names in common"));
            }
            Ok(())
        }
        (T::Array(s), T::Array(d)) => {
            if s.dims() != d.dims() {
                return Err(incompatible(path, src, dst, "array dimensions differ"));
            }
            check_at(s.element(), d.element(), &format!("{}[]", path))
        }
        (T::VarList(s), T::VarList(d)) => check_at(s, d, &format!("{}[]", path)),
        (T::Opaque(s), T::Opaque(d)) => {
            if s.size() != d.size() || s.tag() != d.tag() {
                return Err(incompatible(path, src, dst, "opaque size or tag differs"));
            }
            Ok(())
        }
        (T::Bitfield(s), T::Bitfield(d))
        | (T::Time(s), T::Time(d))
        | (T::Reference(s), T::Reference(d)) => {
            if s.size() != d.size() {
                return Err(incompatible(path, src, dst, "leaf sizes differ"));
            }
            Ok(())
        }
        _ => Err(class_mismatch(path, src, dst)),
    }
}

/// Whether two classes can ever be converted, ignoring nested members.
pub fn classes_convertible(src: TypeClass, dst: TypeClass) -> bool {
    use TypeClass as C;
    matches!(
        (src, dst),
        (C::Integer | C::Float, C::Integer | C::Float)
    ) || src == dst
}
