// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Derivation rules as seen by a downstream crate using `#[derive(Reflect)]`.

#![allow(dead_code)]

mod support;

use h5kit::config::CreateConfig;
use h5kit::naming::commit_type;
use h5kit::types::{IntegerType, StringLength, TypeClass, TypeDescriptor};
use h5kit::{derive, Datatype, Error, Path, Reflect};
use std::rc::Rc;
use std::sync::mpsc::Receiver;
use support::MemFile;

#[derive(Reflect)]
struct Telemetry {
    #[hdf("ts")]
    timestamp: u64,
    #[hdf(rename = "v")]
    voltage: f32,
    #[hdf(ignore)]
    cache: Vec<u8>,
    #[hdf(ignore)]
    listener: fn(u64),
    ok: bool,
}

#[derive(Reflect)]
struct Pair<T>(T, T);

#[derive(Reflect)]
struct WithSubscriber {
    id: u32,
    updates: Receiver<u32>,
}

#[derive(Reflect)]
struct WithHook {
    hook: fn(u32) -> bool,
}

#[derive(Reflect)]
struct Tree {
    value: i32,
    children: Vec<Option<Rc<Tree>>>,
}

#[derive(Reflect)]
#[repr(i16)]
enum Offset {
    Back = -2,
    Here = 0,
    Ahead = 7,
}

#[derive(Reflect)]
struct Tagged {
    #[hdf(type_ref = "/shared/unit")]
    unit: u8,
    #[hdf("value")]
    raw: f64,
}

#[test]
fn ignored_members_are_skipped() {
    let ty = derive::describe::<Telemetry>(None).unwrap();
    let compound = ty.as_compound().unwrap();
    assert_eq!(compound.fields().len(), 3);
    assert!(compound.field("cache").is_none());
    assert!(compound.field("listener").is_none());
    // The host layout is kept even though members were dropped.
    assert_eq!(compound.size(), std::mem::size_of::<Telemetry>());
}

#[test]
fn renamed_members_use_the_tag() {
    let ty = derive::describe::<Telemetry>(None).unwrap();
    let names: Vec<&str> = ty.as_compound().unwrap().field_names().collect();
    assert_eq!(names, ["ts", "v", "ok"]);
    let ok = ty.as_compound().unwrap().field("ok").unwrap();
    assert_eq!(*ok.ty(), TypeDescriptor::Integer(IntegerType::U8));
}

#[test]
fn function_and_channel_members_fail() {
    match derive::describe::<WithHook>(None) {
        Err(Error::NotSerializable { kind, path }) => {
            assert_eq!(kind, "function");
            assert_eq!(path, "WithHook.hook");
        }
        other => panic!("expected NotSerializable, got {:?}", other),
    }
    match derive::describe::<WithSubscriber>(None) {
        Err(Error::NotSerializable { kind, path }) => {
            assert_eq!(kind, "channel");
            assert_eq!(path, "WithSubscriber.updates");
        }
        other => panic!("expected NotSerializable, got {:?}", other),
    }
}

#[test]
fn tuple_structs_and_generics() {
    let ty = derive::describe::<Pair<i16>>(None).unwrap();
    let c = ty.as_compound().unwrap();
    let layout: Vec<(&str, usize)> = c.fields().iter().map(|f| (f.name(), f.offset())).collect();
    assert_eq!(layout, [("0", 0), ("1", 2)]);
    assert_eq!(c.size(), 4);
    assert_eq!(
        derive::describe::<Pair<[u8; 3]>>(None).unwrap().size(),
        Some(6)
    );
}

#[test]
fn self_reference_through_pointers_is_cyclic() {
    match derive::describe::<Tree>(None) {
        Err(Error::CyclicType { path, .. }) => assert_eq!(path, "Tree.children[]"),
        other => panic!("expected CyclicType, got {:?}", other),
    }
}

#[test]
fn signed_discriminants_keep_their_bits() {
    let ty = derive::describe::<Offset>(None).unwrap();
    let e = ty.as_enum().unwrap();
    assert_eq!(e.base(), IntegerType::I16);
    assert_eq!(e.value_of("Back"), Some(0xFFFE));
    assert_eq!(e.value_of("Ahead"), Some(7));
    assert_eq!(e.name_of(0), Some("Here"));
}

#[test]
fn type_ref_members_resolve_by_name() {
    let file = MemFile::new();
    let err = derive::describe::<Tagged>(Some(&file)).unwrap_err();
    assert!(matches!(
        err,
        Error::NamedTypeLookupFailed { ref path, .. } if path == "/shared/unit"
    ));

    let unit: TypeDescriptor = h5kit::types::EnumType::from_members(
        IntegerType::U8,
        [("kelvin", 0), ("celsius", 1)],
    )
    .unwrap()
    .into();
    commit_type(
        &file,
        &Path::new("/shared/unit"),
        &unit,
        &CreateConfig::default(),
    )
    .unwrap();

    let handle = Datatype::derive::<Tagged>(Some(&file)).unwrap();
    let compound = handle.as_compound().unwrap();
    assert_eq!(compound.field("unit").unwrap().ty().class(), TypeClass::Enum);
    assert!(compound.field("value").is_some());
}

#[test]
fn strings_are_variable_utf8() {
    #[derive(Reflect)]
    struct Named {
        name: String,
        alias: &'static str,
        chars: [char; 2],
    }

    let ty = derive::describe::<Named>(None).unwrap();
    let c = ty.as_compound().unwrap();
    for member in ["name", "alias"] {
        match c.field(member).unwrap().ty() {
            TypeDescriptor::String(s) => assert_eq!(s.length(), StringLength::Variable),
            other => panic!("{} derived as {}", member, other),
        }
    }
    assert!(ty.contains_variable_length());
    assert_eq!(c.field("chars").unwrap().ty().size(), Some(8));
}

#[cfg(feature = "complex")]
#[test]
fn complex_numbers_become_pairs() {
    let ty = derive::describe::<num_complex::Complex<f32>>(None).unwrap();
    let c = ty.as_compound().unwrap();
    assert_eq!(c.size(), 8);
    assert_eq!(c.field("re").unwrap().offset(), 0);
    assert_eq!(c.field("im").unwrap().offset(), 4);
}
