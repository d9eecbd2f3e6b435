// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! [`Reflect`] for std types.

use super::{Kind, Reflect, Shape, ShapeFn};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::rc::Rc;
use std::sync::mpsc::{Receiver, Sender, SyncSender};
use std::sync::Arc;

macro_rules! reflect_int {
    ($($ty:ty => $signed:expr),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn shape() -> Shape {
                    Shape::new::<$ty>(Kind::Int {
                        width: std::mem::size_of::<$ty>(),
                        signed: $signed,
                    })
                }
            }
        )*
    };
}

reflect_int! {
    u8 => false, u16 => false, u32 => false, u64 => false, usize => false,
    i8 => true, i16 => true, i32 => true, i64 => true, isize => true,
}

impl Reflect for f32 {
    fn shape() -> Shape {
        Shape::new::<f32>(Kind::Float { width: 4 })
    }
}

impl Reflect for f64 {
    fn shape() -> Shape {
        Shape::new::<f64>(Kind::Float { width: 8 })
    }
}

impl Reflect for bool {
    fn shape() -> Shape {
        Shape::new::<bool>(Kind::Bool)
    }
}

impl Reflect for char {
    fn shape() -> Shape {
        Shape::new::<char>(Kind::Char)
    }
}

impl Reflect for String {
    fn shape() -> Shape {
        Shape::new::<String>(Kind::Str)
    }
}

impl Reflect for &'static str {
    fn shape() -> Shape {
        Shape::new::<&'static str>(Kind::Str)
    }
}

#[cfg(feature = "complex")]
impl Reflect for num_complex::Complex<f32> {
    fn shape() -> Shape {
        Shape::new::<Self>(Kind::Complex { width: 4 })
    }
}

#[cfg(feature = "complex")]
impl Reflect for num_complex::Complex<f64> {
    fn shape() -> Shape {
        Shape::new::<Self>(Kind::Complex { width: 8 })
    }
}

// ---------------------------------------------------------------------------
// Containers
// ---------------------------------------------------------------------------

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn shape() -> Shape {
        Shape::new::<Self>(Kind::Array {
            len: N,
            elem: T::shape as ShapeFn,
        })
    }
}

impl<T: Reflect> Reflect for Vec<T> {
    fn shape() -> Shape {
        Shape::new::<Self>(Kind::Sequence {
            elem: T::shape as ShapeFn,
        })
    }
}

impl<T: Reflect> Reflect for VecDeque<T> {
    fn shape() -> Shape {
        Shape::new::<Self>(Kind::Sequence {
            elem: T::shape as ShapeFn,
        })
    }
}

impl<K: 'static, V: 'static, S: 'static> Reflect for HashMap<K, V, S> {
    fn shape() -> Shape {
        Shape::new::<Self>(Kind::Map)
    }
}

impl<K: 'static, V: 'static> Reflect for BTreeMap<K, V> {
    fn shape() -> Shape {
        Shape::new::<Self>(Kind::Map)
    }
}

impl<T: 'static, S: 'static> Reflect for HashSet<T, S> {
    fn shape() -> Shape {
        Shape::new::<Self>(Kind::Map)
    }
}

impl<T: 'static> Reflect for BTreeSet<T> {
    fn shape() -> Shape {
        Shape::new::<Self>(Kind::Map)
    }
}

// ---------------------------------------------------------------------------
// Pointers
// ---------------------------------------------------------------------------

macro_rules! reflect_pointer {
    ($($wrapper:ident),*) => {
        $(
            impl<T: Reflect> Reflect for $wrapper<T> {
                fn shape() -> Shape {
                    Shape::new::<Self>(Kind::Pointer {
                        target: T::shape as ShapeFn,
                    })
                }
            }
        )*
    };
}

reflect_pointer!(Box, Rc, Arc, Option);

impl<T: 'static> Reflect for *const T {
    fn shape() -> Shape {
        Shape::new::<Self>(Kind::RawPointer)
    }
}

impl<T: 'static> Reflect for *mut T {
    fn shape() -> Shape {
        Shape::new::<Self>(Kind::RawPointer)
    }
}

impl<T: 'static> Reflect for NonNull<T> {
    fn shape() -> Shape {
        Shape::new::<Self>(Kind::RawPointer)
    }
}

// ---------------------------------------------------------------------------
// Not storable
// ---------------------------------------------------------------------------

macro_rules! reflect_fn {
    ($($arg:ident),*) => {
        impl<R: 'static $(, $arg: 'static)*> Reflect for fn($($arg),*) -> R {
            fn shape() -> Shape {
                Shape::new::<Self>(Kind::Function)
            }
        }
    };
}

reflect_fn!();
reflect_fn!(A);
reflect_fn!(A, B);
reflect_fn!(A, B, C);

impl<T: 'static> Reflect for Sender<T> {
    fn shape() -> Shape {
        Shape::new::<Self>(Kind::Channel)
    }
}

impl<T: 'static> Reflect for SyncSender<T> {
    fn shape() -> Shape {
        Shape::new::<Self>(Kind::Channel)
    }
}

impl<T: 'static> Reflect for Receiver<T> {
    fn shape() -> Shape {
        Shape::new::<Self>(Kind::Channel)
    }
}

impl Reflect for () {
    fn shape() -> Shape {
        Shape::new::<()>(Kind::Invalid)
    }
}

impl<T: 'static> Reflect for PhantomData<T> {
    fn shape() -> Shape {
        Shape::new::<Self>(Kind::Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_widths_follow_host() {
        match usize::shape().kind {
            Kind::Int { width, signed } => {
                assert_eq!(width, std::mem::size_of::<usize>());
                assert!(!signed);
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_nested_array_shape() {
        let shape = <[[i16; 3]; 2]>::shape();
        assert_eq!(shape.size, 12);
        let Kind::Array { len, elem } = shape.kind else {
            panic!("expected array");
        };
        assert_eq!(len, 2);
        assert!(matches!(elem().kind, Kind::Array { len: 3, .. }));
    }

    #[test]
    fn test_kind_names_for_unsupported() {
        assert_eq!(<HashMap<String, u8>>::shape().kind.name(), "map");
        assert_eq!(<fn(u8) -> u8>::shape().kind.name(), "function");
        assert_eq!(<Sender<u8>>::shape().kind.name(), "channel");
        assert_eq!(<*const u8>::shape().kind.name(), "raw pointer");
        assert_eq!(<PhantomData<u8>>::shape().kind.name(), "invalid type");
    }

    #[test]
    fn test_pointer_targets() {
        let Kind::Pointer { target } = <Option<Box<f32>>>::shape().kind else {
            panic!("expected pointer");
        };
        assert!(matches!(target().kind, Kind::Pointer { .. }));
    }
}
