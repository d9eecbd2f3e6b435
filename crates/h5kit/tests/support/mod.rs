// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-memory container used by the integration tests.
//!
//! `MemFile` stores committed datatypes through a [`MemoryNamespace`] and
//! dataset elements as decoded [`Value`] trees, so reads and writes go
//! through real layout conversion (member lookup by name, numeric widening,
//! `String` slots for variable-length strings).

#![allow(dead_code)]

use h5kit::config::{AccessConfig, CreateConfig};
use h5kit::naming::{MemoryNamespace, NamingContext};
use h5kit::space::{Dataspace, SpaceRef};
use h5kit::transfer::{Dataset, Direction, Request, Target, Transfer};
use h5kit::types::{IntegerType, StringLength, TypeDescriptor};
use h5kit::{Error, Id, Path, Result};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// One stored element.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Empty,
    Int(i128),
    Float(f64),
    Str(String),
    Label(String),
    Raw(Vec<u8>),
    Record(BTreeMap<String, Value>),
    List(Vec<Value>),
}

#[derive(Debug)]
struct Stored {
    target: Target,
    cells: Vec<Value>,
}

/// Container double implementing both collaborator traits.
#[derive(Default)]
pub struct MemFile {
    names: MemoryNamespace,
    datasets: RwLock<HashMap<String, Stored>>,
    open: RwLock<HashMap<Id, String>>,
    /// Report as non-reentrant so calls go through the engine lock.
    serialize: bool,
    in_call: AtomicBool,
    overlaps: AtomicUsize,
    calls: AtomicUsize,
    passes: AtomicUsize,
}

impl MemFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// A container that claims not to be reentrant.
    pub fn non_reentrant() -> Self {
        Self {
            serialize: true,
            ..Self::default()
        }
    }

    pub fn create_dataset(
        &self,
        path: &str,
        datatype: TypeDescriptor,
        dataspace: Dataspace,
    ) -> Result<Dataset> {
        let mut datasets = self.datasets.write();
        if datasets.contains_key(path) {
            return Err(missing(format_args!("creating dataset at {}", path)));
        }
        let cells = vec![Value::Empty; dataspace.element_count() as usize];
        let target = Target::new(datatype, dataspace);
        datasets.insert(
            path.to_string(),
            Stored {
                target: target.clone(),
                cells,
            },
        );
        drop(datasets);
        Ok(self.register(path, target))
    }

    pub fn open_dataset(&self, path: &str) -> Result<Dataset> {
        let target = self.datasets.read().get(path).map(|s| s.target.clone());
        match target {
            Some(target) => Ok(self.register(path, target)),
            None => Err(missing(format_args!("opening dataset at {}", path))),
        }
    }

    /// Change the current extent of a dataset, keeping existing elements.
    pub fn set_extent(&self, dataset: &mut Dataset, dims: &[u64]) -> Result<()> {
        let path = self.path_of(dataset.id())?;
        let mut datasets = self.datasets.write();
        let Some(stored) = datasets.get_mut(&path) else {
            return Err(missing(format_args!("extending dataset {}", path)));
        };
        let mut old = stored.target.dataspace().clone();
        old.select_all();
        let mut grown = stored.target.clone();
        grown.set_extent(dims)?;
        let mut cells = vec![Value::Empty; grown.dataspace().element_count() as usize];
        for (coord, value) in old.selected_coords().iter().zip(stored.cells.drain(..)) {
            if let Ok(offset) = grown.dataspace().linear_offset(coord) {
                cells[offset as usize] = value;
            }
        }
        stored.cells = cells;
        stored.target = grown.clone();
        dataset.set_extent(dims)?;
        Ok(())
    }

    pub fn transfer_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn overlapping_calls(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    /// Conversion passes run so far, one per `Request::batch_len` elements.
    pub fn conversion_passes(&self) -> usize {
        self.passes.load(Ordering::SeqCst)
    }

    fn register(&self, path: &str, target: Target) -> Dataset {
        let dataset = Dataset::new(target);
        self.open.write().insert(dataset.id(), path.to_string());
        dataset
    }

    fn path_of(&self, id: Id) -> Result<String> {
        self.open
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| missing(format_args!("resolving dataset {}", id)))
    }
}

fn missing(context: std::fmt::Arguments<'_>) -> Error {
    Error::EngineStatus {
        code: -1,
        context: context.to_string(),
    }
}

impl NamingContext for MemFile {
    fn load_schema(&self, path: &Path, access: &AccessConfig) -> Result<Vec<u8>> {
        self.names.load_schema(path, access)
    }

    fn store_schema(&self, path: &Path, schema: &[u8], create: &CreateConfig) -> Result<()> {
        self.names.store_schema(path, schema, create)
    }

    fn is_thread_safe(&self) -> bool {
        !self.serialize
    }
}

impl Transfer for MemFile {
    unsafe fn transfer(&self, request: &Request<'_>) -> Result<()> {
        if self.in_call.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = self.copy(request);
        self.in_call.store(false, Ordering::SeqCst);
        result
    }

    fn is_thread_safe(&self) -> bool {
        !self.serialize
    }
}

impl MemFile {
    unsafe fn copy(&self, request: &Request<'_>) -> Result<()> {
        let path = self.path_of(request.resource)?;
        let file = request.file_space.selected_offsets()?;
        let mem: Vec<u64> = match request.mem_space {
            SpaceRef::All => (0..request.count).collect(),
            SpaceRef::Space(space) => space.selected_offsets()?,
        };

        if request.direction == Direction::Read {
            // Give an overlapping caller the chance to show up.
            std::thread::yield_now();
        }

        let mut datasets = self.datasets.write();
        let Some(stored) = datasets.get_mut(&path) else {
            return Err(missing(format_args!("transferring on {}", path)));
        };
        let batch = request.batch_len();
        for (files, mems) in file.chunks(batch).zip(mem.chunks(batch)) {
            self.passes.fetch_add(1, Ordering::SeqCst);
            for (&f, &m) in files.iter().zip(mems) {
                let slot = request.buf.add(m as usize * request.elem_size);
                let cell = &mut stored.cells[f as usize];
                match request.direction {
                    Direction::Write => {
                        let value = conform(load(slot, request.mem_type), request.file_type);
                        *cell = if request.config.preserve_partial() {
                            merge(std::mem::replace(cell, Value::Empty), value)
                        } else {
                            value
                        };
                    }
                    Direction::Read => store(slot, request.mem_type, cell),
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Memory layout
// ---------------------------------------------------------------------------

unsafe fn load_int(ptr: *const u8, t: &IntegerType) -> i128 {
    let mut raw = [0u8; 8];
    std::ptr::copy_nonoverlapping(ptr, raw.as_mut_ptr(), t.width());
    match (t.width(), t.is_signed()) {
        (1, true) => i8::from_ne_bytes([raw[0]]) as i128,
        (1, false) => raw[0] as i128,
        (2, true) => i16::from_ne_bytes([raw[0], raw[1]]) as i128,
        (2, false) => u16::from_ne_bytes([raw[0], raw[1]]) as i128,
        (4, true) => i32::from_ne_bytes([raw[0], raw[1], raw[2], raw[3]]) as i128,
        (4, false) => u32::from_ne_bytes([raw[0], raw[1], raw[2], raw[3]]) as i128,
        (_, true) => i64::from_ne_bytes(raw) as i128,
        (_, false) => u64::from_ne_bytes(raw) as i128,
    }
}

unsafe fn store_int(ptr: *mut u8, t: &IntegerType, v: i128) {
    match t.width() {
        1 => *ptr = v as u8,
        2 => std::ptr::copy_nonoverlapping((v as u16).to_ne_bytes().as_ptr(), ptr, 2),
        4 => std::ptr::copy_nonoverlapping((v as u32).to_ne_bytes().as_ptr(), ptr, 4),
        _ => std::ptr::copy_nonoverlapping((v as u64).to_ne_bytes().as_ptr(), ptr, 8),
    }
}

/// Decode one element laid out as `ty` at `ptr`.
unsafe fn load(ptr: *const u8, ty: &TypeDescriptor) -> Value {
    match ty {
        TypeDescriptor::Integer(t) => Value::Int(load_int(ptr, t)),
        TypeDescriptor::Float(t) => match t.width() {
            4 => Value::Float((ptr as *const f32).read_unaligned() as f64),
            _ => Value::Float((ptr as *const f64).read_unaligned()),
        },
        TypeDescriptor::String(t) => match t.length() {
            StringLength::Variable => Value::Str((*(ptr as *const String)).clone()),
            StringLength::Fixed(n) => {
                let bytes = std::slice::from_raw_parts(ptr, n);
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(n);
                Value::Str(String::from_utf8_lossy(&bytes[..end]).into_owned())
            }
        },
        TypeDescriptor::Enum(t) => {
            let raw = load_int(ptr, &t.base()) as u64 & t.base().max_unsigned();
            match t.name_of(raw) {
                Some(name) => Value::Label(name.to_string()),
                None => Value::Int(raw as i128),
            }
        }
        TypeDescriptor::Compound(t) => Value::Record(
            t.fields()
                .iter()
                .map(|f| (f.name().to_string(), load(ptr.add(f.offset()), f.ty())))
                .collect(),
        ),
        TypeDescriptor::Array(t) => {
            let size = t.element().size().unwrap_or(0);
            Value::List(
                (0..t.len())
                    .map(|i| load(ptr.add(i * size), t.element()))
                    .collect(),
            )
        }
        other => {
            let size = other.size().unwrap_or(0);
            Value::Raw(std::slice::from_raw_parts(ptr, size).to_vec())
        }
    }
}

/// Encode `value` into the element laid out as `ty` at `ptr`. Members the
/// value does not carry are left untouched.
unsafe fn store(ptr: *mut u8, ty: &TypeDescriptor, value: &Value) {
    match (ty, value) {
        (TypeDescriptor::Integer(t), Value::Int(v)) => store_int(ptr, t, *v),
        (TypeDescriptor::Integer(t), Value::Float(v)) => store_int(ptr, t, *v as i128),
        (TypeDescriptor::Float(t), Value::Int(v)) => store_float(ptr, t.width(), *v as f64),
        (TypeDescriptor::Float(t), Value::Float(v)) => store_float(ptr, t.width(), *v),
        (TypeDescriptor::String(t), Value::Str(s)) => match t.length() {
            StringLength::Variable => *(ptr as *mut String) = s.clone(),
            StringLength::Fixed(n) => {
                let len = s.len().min(n);
                std::ptr::write_bytes(ptr, 0, n);
                std::ptr::copy_nonoverlapping(s.as_ptr(), ptr, len);
            }
        },
        (TypeDescriptor::Enum(t), Value::Label(name)) => {
            if let Some(v) = t.value_of(name) {
                store_int(ptr, &t.base(), v as i128);
            }
        }
        (TypeDescriptor::Enum(t), Value::Int(v)) => store_int(ptr, &t.base(), *v),
        (TypeDescriptor::Compound(t), Value::Record(members)) => {
            for f in t.fields() {
                if let Some(v) = members.get(f.name()) {
                    store(ptr.add(f.offset()), f.ty(), v);
                }
            }
        }
        (TypeDescriptor::Array(t), Value::List(items)) => {
            let size = t.element().size().unwrap_or(0);
            for (i, item) in items.iter().enumerate().take(t.len()) {
                store(ptr.add(i * size), t.element(), item);
            }
        }
        (_, Value::Raw(bytes)) => std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, bytes.len()),
        _ => {}
    }
}

unsafe fn store_float(ptr: *mut u8, width: usize, v: f64) {
    match width {
        4 => (ptr as *mut f32).write_unaligned(v as f32),
        _ => (ptr as *mut f64).write_unaligned(v),
    }
}

/// Shape a memory value to the stored type: drop members the stored
/// compound lacks and convert numbers to the stored class.
fn conform(value: Value, ty: &TypeDescriptor) -> Value {
    match (ty, value) {
        (TypeDescriptor::Float(_), Value::Int(v)) => Value::Float(v as f64),
        (TypeDescriptor::Integer(_), Value::Float(v)) => Value::Int(v as i128),
        (TypeDescriptor::Compound(t), Value::Record(mut members)) => Value::Record(
            t.fields()
                .iter()
                .filter_map(|f| {
                    members
                        .remove(f.name())
                        .map(|v| (f.name().to_string(), conform(v, f.ty())))
                })
                .collect(),
        ),
        (TypeDescriptor::Array(t), Value::List(items)) => Value::List(
            items
                .into_iter()
                .map(|v| conform(v, t.element()))
                .collect(),
        ),
        (_, value) => value,
    }
}

/// Overlay `new` on `old`, keeping members `new` does not carry.
fn merge(old: Value, new: Value) -> Value {
    match (old, new) {
        (Value::Record(mut base), Value::Record(update)) => {
            for (name, value) in update {
                let previous = base.remove(&name).unwrap_or(Value::Empty);
                base.insert(name, merge(previous, value));
            }
            Value::Record(base)
        }
        (_, new) => new,
    }
}
