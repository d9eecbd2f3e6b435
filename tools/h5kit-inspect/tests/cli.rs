// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use h5kit::codec;
use h5kit::space::{Dataspace, Hyperslab, SelectOp};
use h5kit::types::{CharSet, CompoundBuilder, IntegerType, StringType};
use std::io::Write;
use std::process::Command;

fn inspect(bytes: &[u8], extra: &[&str]) -> std::process::Output {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(bytes).expect("write blob");
    Command::new(env!("CARGO_BIN_EXE_h5kit-inspect"))
        .arg(file.path())
        .args(extra)
        .output()
        .expect("run h5kit-inspect")
}

#[test]
fn prints_type_descriptor() {
    let ty = CompoundBuilder::new(32)
        .field("id", 0, IntegerType::I32.into())
        .and_then(|b| b.field("name", 8, StringType::variable(CharSet::Utf8).into()))
        .and_then(|b| b.build())
        .expect("compound");
    let blob = codec::encode(&ty.into()).expect("encode");

    let out = inspect(&blob, &[]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.starts_with("compound[32] {id: i32"));
    assert!(stdout.contains("class: compound"));
}

#[test]
fn prints_dataspace_json() {
    let mut space = Dataspace::simple(&[6, 6], Some(&[-1, 6])).expect("space");
    space
        .select_hyperslab(SelectOp::Set, &Hyperslab::new(vec![2, 2], vec![2, 3]))
        .expect("select");
    let blob = codec::encode_space(&space).expect("encode");

    let out = inspect(&blob, &["--json"]);
    assert!(out.status.success());
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).expect("valid JSON");
    assert_eq!(json["class"], "Simple");
    assert_eq!(json["dims"], serde_json::json!([6, 6]));
}

#[test]
fn rejects_corrupted_blob() {
    let mut blob = codec::encode(&IntegerType::U16.into()).expect("encode");
    blob[6] ^= 0xFF;
    let out = inspect(&blob, &[]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("checksum mismatch"));
}

#[test]
fn forced_kind_mismatch_fails() {
    let blob = codec::encode(&IntegerType::U8.into()).expect("encode");
    let out = inspect(&blob, &["--kind", "space"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("decoding dataspace"));
}
