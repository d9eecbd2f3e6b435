// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Derivation engine: host shapes to type descriptors.
//!
//! # Kind Mapping
//!
//! ```text
//! bool            -> u8                     char       -> u32
//! integers        -> Integer (native order) floats     -> Float
//! Complex<f>      -> compound {re @0, im @w}
//! String, &str    -> variable UTF-8 string
//! [[T; b]; a]     -> Array[a x b] of T      Vec<T>     -> vlist of T
//! record          -> Compound (declaration order, host offsets)
//! unit enum       -> Enum over the discriminant width
//! Box/Rc/Arc/Option -> the target
//! maps            -> UnsupportedKind
//! fn, channels, raw pointers, zero-sized -> NotSerializable
//! ```
//!
//! A failure anywhere aborts the whole derivation; no partial descriptor is
//! returned. Error paths name the member that failed, e.g.
//! `Reading.samples[]`.

use crate::config;
use crate::error::{Error, Result};
use crate::naming::{self, NamingContext};
use crate::path::Path;
use crate::reflect::{FieldShape, Kind, Reflect, Shape, VariantShape};
use crate::types::{
    ArrayType, CharSet, CompoundType, Datatype, EnumType, FloatType, IntegerType, StringType,
    TypeDescriptor,
};
use std::any::TypeId;

/// Derive the descriptor of `T`.
///
/// `ctx` resolves `#[hdf(type_ref = "...")]` members; without one such
/// members fail with [`Error::NamedTypeLookupFailed`].
///
/// ```
/// use h5kit::derive::describe;
/// use h5kit::Reflect;
///
/// #[derive(Reflect)]
/// struct Point {
///     x: f64,
///     y: f64,
/// }
///
/// let ty = describe::<Point>(None)?;
/// assert_eq!(ty.to_string(), "compound[16] {x: f64le @0, y: f64le @8}");
/// # Ok::<(), h5kit::Error>(())
/// ```
pub fn describe<T: Reflect>(ctx: Option<&dyn NamingContext>) -> Result<TypeDescriptor> {
    describe_shape(&T::shape(), ctx)
}

/// Derive the descriptor of the type of `value`.
pub fn describe_value<T: Reflect>(
    _value: &T,
    ctx: Option<&dyn NamingContext>,
) -> Result<TypeDescriptor> {
    describe::<T>(ctx)
}

/// Derive the descriptor of an arbitrary shape.
pub fn describe_shape(shape: &Shape, ctx: Option<&dyn NamingContext>) -> Result<TypeDescriptor> {
    let mut deriver = Deriver {
        ctx,
        stack: Vec::new(),
        path: shape.short_name().to_string(),
    };
    deriver.derive(shape).map_err(|e| {
        log::debug!("[derive] {} failed: {}", shape.name, e);
        e
    })
}

impl Datatype {
    /// Derive the descriptor of `T` and register it.
    pub fn derive<T: Reflect>(ctx: Option<&dyn NamingContext>) -> Result<Datatype> {
        describe::<T>(ctx).map(Datatype::new)
    }
}

// ---------------------------------------------------------------------------
// Deriver
// ---------------------------------------------------------------------------

struct Deriver<'a> {
    ctx: Option<&'a dyn NamingContext>,
    /// Types currently being derived, outermost first.
    stack: Vec<TypeId>,
    /// Member path of the node being derived.
    path: String,
}

impl Deriver<'_> {
    fn derive(&mut self, shape: &Shape) -> Result<TypeDescriptor> {
        if self.stack.contains(&shape.id) {
            log::debug!("[derive] cycle through {} at {}", shape.name, self.path);
            return Err(Error::CyclicType {
                type_name: shape.name,
                path: self.path.clone(),
            });
        }
        self.stack.push(shape.id);
        let result = self.derive_kind(shape);
        self.stack.pop();
        result
    }

    fn derive_kind(&mut self, shape: &Shape) -> Result<TypeDescriptor> {
        match &shape.kind {
            Kind::Bool => Ok(IntegerType::U8.into()),
            Kind::Char => Ok(IntegerType::U32.into()),
            Kind::Int { width, signed } => Ok(IntegerType::new(*width, *signed)?.into()),
            Kind::Float { width } => Ok(FloatType::new(*width)?.into()),
            Kind::Complex { width } => complex(*width),
            Kind::Str => Ok(StringType::variable(CharSet::Utf8).into()),
            Kind::Array { len, elem } => self.array(*len, *elem),
            Kind::Sequence { elem } => {
                let elem = self.nested("[]", &elem())?;
                Ok(TypeDescriptor::var_list(elem))
            }
            Kind::Record { fields } => self.record(shape, fields),
            Kind::Enumeration {
                width,
                signed,
                variants,
            } => enumeration(*width, *signed, variants),
            Kind::Pointer { target } => self.derive(&target()),
            Kind::Map => Err(Error::UnsupportedKind {
                kind: shape.kind.name(),
                path: self.path.clone(),
            }),
            Kind::Function | Kind::Channel | Kind::RawPointer | Kind::Invalid => {
                Err(Error::NotSerializable {
                    kind: shape.kind.name(),
                    path: self.path.clone(),
                })
            }
        }
    }

    /// Derive `shape` with `segment` appended to the error path.
    fn nested(&mut self, segment: &str, shape: &Shape) -> Result<TypeDescriptor> {
        let mark = self.path.len();
        self.path.push_str(segment);
        let result = self.derive(shape);
        self.path.truncate(mark);
        result
    }

    /// Nested fixed arrays collapse into one array whose dims concatenate.
    fn array(&mut self, len: usize, elem: fn() -> Shape) -> Result<TypeDescriptor> {
        let mut dims = vec![len];
        let mut inner = elem();
        while let Kind::Array { len, elem } = inner.kind {
            dims.push(len);
            inner = elem();
        }
        let elem = self.nested("[]", &inner)?;
        Ok(TypeDescriptor::Array(ArrayType::new(elem, dims)?))
    }

    fn record(&mut self, shape: &Shape, fields: &[FieldShape]) -> Result<TypeDescriptor> {
        let mut builder = CompoundType::builder(shape.size);
        let mut skipped = 0usize;
        for field in fields {
            if field.tags.ignore {
                skipped += 1;
                continue;
            }
            let name = field.stored_name();
            let mark = self.path.len();
            self.path.push('.');
            self.path.push_str(field.name);
            let ty = self.member(field);
            self.path.truncate(mark);
            builder = builder.field(name, field.offset, ty?)?;
        }
        let compound = builder.build().map_err(|e| match e {
            Error::InvalidLayout(why) => {
                Error::InvalidLayout(format!("{} at `{}`: {}", shape.name, self.path, why))
            }
            other => other,
        })?;
        log::trace!(
            "[derive] {} -> compound[{}] with {} member(s), {} ignored",
            shape.name,
            compound.size(),
            compound.fields().len(),
            skipped
        );
        Ok(TypeDescriptor::Compound(compound))
    }

    fn member(&mut self, field: &FieldShape) -> Result<TypeDescriptor> {
        if let Some(reference) = field.tags.type_ref {
            return self.named(reference);
        }
        match field.shape {
            Some(shape) => self.derive(&shape()),
            None => Err(Error::NotSerializable {
                kind: "unreflected member",
                path: self.path.clone(),
            }),
        }
    }

    /// Resolve a `type_ref` member through the naming context.
    fn named(&self, reference: &str) -> Result<TypeDescriptor> {
        let Some(ctx) = self.ctx else {
            return Err(Error::NamedTypeLookupFailed {
                path: reference.to_string(),
                reason: format!("no naming context to resolve `{}`", self.path),
            });
        };
        let access = config::defaults().access;
        naming::load_type(ctx, &Path::new(reference), &access).map_err(|e| {
            log::debug!("[derive] lookup of {} for {} failed: {}", reference, self.path, e);
            Error::NamedTypeLookupFailed {
                path: reference.to_string(),
                reason: e.to_string(),
            }
        })
    }
}

fn complex(width: usize) -> Result<TypeDescriptor> {
    let part = FloatType::new(width)?;
    let compound = CompoundType::builder(2 * width)
        .field("re", 0, part.into())?
        .field("im", width, part.into())?
        .build()?;
    Ok(TypeDescriptor::Compound(compound))
}

fn enumeration(width: usize, signed: bool, variants: &[VariantShape]) -> Result<TypeDescriptor> {
    let base = IntegerType::new(width, signed)?;
    let ty = EnumType::from_members(base, variants.iter().map(|v| (v.name, v.value)))?;
    Ok(TypeDescriptor::Enum(ty))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CreateConfig;
    use crate::naming::{commit_type, MemoryNamespace};
    use crate::reflect::{FieldTags, Reflect};
    use std::collections::HashMap;
    use std::sync::mpsc::Sender;

    #[derive(Reflect)]
    #[allow(dead_code)]
    struct Reading {
        id: u32,
        #[hdf("temperature")]
        temp: f64,
        #[hdf(ignore)]
        cache: HashMap<String, u8>,
        label: String,
    }

    #[derive(Reflect)]
    #[allow(dead_code)]
    struct Grid {
        cells: [[i16; 3]; 2],
    }

    #[derive(Reflect)]
    #[allow(dead_code)]
    struct WithCallback {
        id: u32,
        on_change: fn(u32) -> bool,
    }

    #[derive(Reflect)]
    #[allow(dead_code)]
    struct WithChannel {
        tx: Sender<u8>,
    }

    #[derive(Reflect)]
    #[allow(dead_code)]
    struct Node {
        value: i32,
        next: Option<Box<Node>>,
    }

    #[derive(Reflect)]
    #[allow(dead_code)]
    struct Labels {
        names: HashMap<String, u32>,
    }

    #[derive(Reflect)]
    #[repr(u8)]
    #[allow(dead_code)]
    enum Level {
        Low = 1,
        High = 200,
    }

    #[derive(Reflect)]
    #[allow(dead_code)]
    struct Tagged {
        id: u64,
        #[hdf(type_ref = "/types/level")]
        level: u8,
    }

    #[test]
    fn test_primitives() {
        assert_eq!(describe::<bool>(None).unwrap(), IntegerType::U8.into());
        assert_eq!(describe::<char>(None).unwrap(), IntegerType::U32.into());
        assert_eq!(describe::<i16>(None).unwrap(), IntegerType::I16.into());
        assert_eq!(describe::<f32>(None).unwrap(), FloatType::F32.into());
        assert_eq!(
            describe::<String>(None).unwrap(),
            StringType::variable(CharSet::Utf8).into()
        );
        assert_eq!(describe::<Box<u64>>(None).unwrap(), IntegerType::U64.into());
    }

    #[test]
    fn test_record_tags() {
        let ty = describe::<Reading>(None).unwrap();
        let compound = ty.as_compound().unwrap();
        let names: Vec<&str> = compound.field_names().collect();
        assert_eq!(names, vec!["id", "temperature", "label"]);
        assert_eq!(compound.size(), std::mem::size_of::<Reading>());
        assert_eq!(
            compound.field("temperature").unwrap().offset(),
            std::mem::offset_of!(Reading, temp)
        );
        assert!(compound.field("label").unwrap().ty().is_variable_length());
    }

    #[test]
    fn test_nested_arrays_flatten() {
        let ty = describe::<Grid>(None).unwrap();
        let cells = ty.as_compound().unwrap().field("cells").unwrap().ty();
        match cells {
            TypeDescriptor::Array(a) => {
                assert_eq!(a.dims(), &[2, 3]);
                assert_eq!(a.element(), &TypeDescriptor::from(IntegerType::I16));
            }
            other => panic!("expected array, got {}", other),
        }
    }

    #[test]
    fn test_sequence_becomes_vlist() {
        let ty = describe::<Vec<f64>>(None).unwrap();
        assert_eq!(ty, TypeDescriptor::var_list(FloatType::F64.into()));
    }

    #[test]
    fn test_function_member_fails() {
        let err = describe::<WithCallback>(None).unwrap_err();
        match err {
            Error::NotSerializable { kind, path } => {
                assert_eq!(kind, "function");
                assert_eq!(path, "WithCallback.on_change");
            }
            other => panic!("unexpected {other}"),
        }
        assert!(matches!(
            describe::<WithChannel>(None),
            Err(Error::NotSerializable { kind: "channel", .. })
        ));
    }

    #[test]
    fn test_map_is_unsupported() {
        let err = describe::<Labels>(None).unwrap_err();
        assert!(matches!(err, Error::UnsupportedKind { kind: "map", .. }));
        assert!(err.to_string().contains("Labels.names"));
    }

    #[test]
    fn test_cycle_detected() {
        let err = describe::<Node>(None).unwrap_err();
        match err {
            Error::CyclicType { type_name, path } => {
                assert!(type_name.ends_with("Node"));
                assert_eq!(path, "Node.next");
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn test_enum_discriminants() {
        let ty = describe::<Level>(None).unwrap();
        let e = ty.as_enum().unwrap();
        assert_eq!(e.base(), IntegerType::U8);
        assert_eq!(e.value_of("High"), Some(200));
        assert_eq!(e.name_of(1), Some("Low"));
    }

    #[test]
    fn test_type_ref_needs_context() {
        let err = describe::<Tagged>(None).unwrap_err();
        assert!(matches!(
            err,
            Error::NamedTypeLookupFailed { ref path, .. } if path == "/types/level"
        ));
    }

    #[test]
    fn test_type_ref_resolves() {
        let ns = MemoryNamespace::new();
        let level = describe::<Level>(None).unwrap();
        commit_type(&ns, &Path::new("/types/level"), &level, &CreateConfig::default()).unwrap();

        let ty = describe::<Tagged>(Some(&ns)).unwrap();
        let member = ty.as_compound().unwrap().field("level").unwrap();
        assert_eq!(member.ty(), &level);
    }

    #[test]
    fn test_type_ref_missing_fails_whole_derivation() {
        let ns = MemoryNamespace::new();
        let err = describe::<Tagged>(Some(&ns)).unwrap_err();
        assert!(matches!(err, Error::NamedTypeLookupFailed { .. }));
    }

    #[test]
    fn test_unreflected_member_shape() {
        let shape = Shape::new::<[u8; 4]>(Kind::Record {
            fields: vec![FieldShape {
                name: "raw",
                offset: 0,
                shape: None,
                tags: FieldTags::NONE,
            }],
        });
        assert!(matches!(
            describe_shape(&shape, None),
            Err(Error::NotSerializable { .. })
        ));
    }

    #[test]
    fn test_derive_registers_handle() {
        let handle = Datatype::derive::<u16>(None).unwrap();
        assert!(handle.id().is_valid());
        assert_eq!(*handle, TypeDescriptor::from(IntegerType::U16));
        handle.close().unwrap();
    }
}
