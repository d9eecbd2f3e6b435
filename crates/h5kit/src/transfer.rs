// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Moving elements between memory and a stored dataset.
//!
//! The container performs the actual copy through the [`Transfer`] trait.
//! [`write`] and [`read`] are the safe entry points: they derive the memory
//! descriptor, validate both sides of the transfer, and only then hand a raw
//! [`Request`] to the collaborator.
//!
//! ```text
//! write::<T>(io, dataset, file, mem, &[T], cfg)
//!   describe::<T>()            memory descriptor
//!   check_conversion           memory -> stored
//!   resolve ALL                file side = whole current extent
//!   extent, bounds, counts     RankMismatch / OutOfBounds / SelectionMismatch
//!   engine::serialized         io.transfer(&Request)
//! ```
//!
//! Reads into element types with restricted bit patterns (`bool`, `char`,
//! unit enums) land in a scratch copy first. Each restricted member is
//! checked before the elements are moved into the caller's slice; members
//! holding an invalid pattern keep their previous value and the read fails.

use crate::config::TransferConfig;
use crate::derive;
use crate::engine;
use crate::error::{Error, Result};
use crate::handle::{Handle, Id, Resource, ResourceKind};
use crate::reflect::{Kind, Reflect, Shape};
use crate::space::{Dataspace, SpaceRef};
use crate::types::{check_conversion, TypeDescriptor};
use std::any::TypeId;
use std::fmt;
use std::mem::MaybeUninit;

/// Which way the elements move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Memory to container.
    Write,
    /// Container to memory.
    Read,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Write => "write",
            Self::Read => "read",
        })
    }
}

/// One validated transfer, as handed to the container.
///
/// # Memory layout
///
/// `buf` points at `len` elements of `elem_size` bytes laid out as described
/// by `mem_type`. Element `i` of the selection lives at:
///
/// - slot `i` when `mem_space` is [`SpaceRef::All`] (dense buffer);
/// - slot `mem_space.selected_offsets()[i]` otherwise.
///
/// Selected file elements are visited in `file_space.selected_coords()`
/// order. Variable-length strings occupy a `String` slot.
#[derive(Debug)]
pub struct Request<'a> {
    pub resource: Id,
    pub direction: Direction,
    /// Stored element type.
    pub file_type: &'a TypeDescriptor,
    /// Memory element type.
    pub mem_type: &'a TypeDescriptor,
    /// Always a concrete dataspace: `ALL` is resolved before dispatch.
    pub file_space: &'a Dataspace,
    pub mem_space: SpaceRef<'a>,
    pub config: &'a TransferConfig,
    pub buf: *mut u8,
    /// Capacity of `buf` in elements.
    pub len: usize,
    pub elem_size: usize,
    /// Number of selected elements on each side.
    pub count: u64,
}

impl Request<'_> {
    /// Elements that fit in the conversion buffer, at least one. Containers
    /// convert the selection in passes of this many elements.
    pub fn batch_len(&self) -> usize {
        (self.config.conversion_buffer() / self.elem_size.max(1)).max(1)
    }
}

/// Container side of a transfer.
pub trait Transfer {
    /// Copy the selected elements.
    ///
    /// # Safety
    ///
    /// Callers guarantee that `request.buf` is valid for `request.len`
    /// elements of `request.elem_size` bytes, initialized, and laid out as
    /// `request.mem_type`; for [`Direction::Read`] it is also exclusively
    /// borrowed for the duration of the call. Implementations must not
    /// write through `buf` on [`Direction::Write`]. On [`Direction::Read`]
    /// they write each selected slot as laid out by `mem_type`; members the
    /// descriptor cannot restrict (`bool`, `char`, enum discriminants, all
    /// integer-coded) are validated by [`read`] before the caller sees them.
    unsafe fn transfer(&self, request: &Request<'_>) -> Result<()>;

    /// Whether concurrent reentrant calls are tolerated. When `false` every
    /// call goes through the global engine lock.
    fn is_thread_safe(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

/// Stored datatype and dataspace of a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    datatype: TypeDescriptor,
    dataspace: Dataspace,
}

impl Target {
    pub fn new(datatype: TypeDescriptor, dataspace: Dataspace) -> Self {
        Self {
            datatype,
            dataspace,
        }
    }

    pub fn datatype(&self) -> &TypeDescriptor {
        &self.datatype
    }

    pub fn dataspace(&self) -> &Dataspace {
        &self.dataspace
    }

    /// Grow or shrink the current extent within the maximum extent.
    pub fn set_extent(&mut self, dims: &[u64]) -> Result<()> {
        self.dataspace.set_extent(dims)
    }
}

impl Resource for Target {
    const KIND: ResourceKind = ResourceKind::Dataset;
}

/// Registered handle to a dataset.
pub type Dataset = Handle<Target>;

// ---------------------------------------------------------------------------
// Typed helpers
// ---------------------------------------------------------------------------

/// Write `data` into the selected elements of `dataset`.
pub fn write<T: Reflect>(
    io: &dyn Transfer,
    dataset: &Dataset,
    file_space: SpaceRef<'_>,
    mem_space: SpaceRef<'_>,
    data: &[T],
    config: &TransferConfig,
) -> Result<()> {
    let mem_type = memory_type(&T::shape())?;
    check_conversion(&mem_type, dataset.datatype())?;
    dispatch(
        io,
        dataset,
        Direction::Write,
        &mem_type,
        file_space,
        mem_space,
        data.as_ptr() as *mut u8,
        data.len(),
        std::mem::size_of::<T>(),
        config,
    )
}

/// Read the selected elements of `dataset` into `data`.
///
/// Fails with `IncompatibleTypes` when a stored value has no valid
/// representation in `T` (a `bool` byte other than 0 or 1, a surrogate
/// `char`, an unknown enum discriminant). The other elements are still
/// delivered; the offending members keep their previous value.
pub fn read<T: Reflect>(
    io: &dyn Transfer,
    dataset: &Dataset,
    file_space: SpaceRef<'_>,
    mem_space: SpaceRef<'_>,
    data: &mut [T],
    config: &TransferConfig,
) -> Result<()> {
    let shape = T::shape();
    let mem_type = memory_type(&shape)?;
    check_conversion(dataset.datatype(), &mem_type)?;
    let checks = restricted_members(&shape);
    let len = data.len();
    if checks.is_empty() {
        return dispatch(
            io,
            dataset,
            Direction::Read,
            &mem_type,
            file_space,
            mem_space,
            data.as_mut_ptr() as *mut u8,
            len,
            std::mem::size_of::<T>(),
            config,
        );
    }

    let mut staged = Staged::new(data, checks);
    let outcome = dispatch(
        io,
        dataset,
        Direction::Read,
        &mem_type,
        file_space,
        mem_space,
        staged.as_mut_ptr(),
        len,
        std::mem::size_of::<T>(),
        config,
    );
    let rejected = staged.settle();
    outcome?;
    if rejected > 0 {
        log::debug!(
            "[transfer] {} invalid member value(s) rejected on {}",
            rejected,
            dataset.id()
        );
        return Err(Error::IncompatibleTypes(format!(
            "{} stored value(s) have no valid representation in {}",
            rejected, shape.name
        )));
    }
    Ok(())
}

/// Descriptor of a memory element type.
fn memory_type(shape: &Shape) -> Result<TypeDescriptor> {
    let ty = derive::describe_shape(shape, None)?;
    check_inline(shape, shape.short_name())?;
    Ok(ty)
}

/// Reject memory shapes whose elements are not stored in place.
fn check_inline(shape: &Shape, path: &str) -> Result<()> {
    let reject = |what: &str| {
        Err(Error::InvalidArgument(format!(
            "memory type {} holds {} at `{}`, which is not stored in place",
            shape.name, what, path
        )))
    };
    match &shape.kind {
        Kind::Str if shape.id != TypeId::of::<String>() => reject("a borrowed string"),
        Kind::Pointer { .. } => reject("a pointer"),
        Kind::Sequence { .. } => reject("a sequence"),
        Kind::Array { elem, .. } => check_inline(&elem(), &format!("{}[]", path)),
        Kind::Record { fields } => fields
            .iter()
            .filter(|f| !f.tags.ignore)
            .filter_map(|f| f.shape.map(|s| (f, s)))
            .try_for_each(|(f, s)| check_inline(&s(), &format!("{}.{}", path, f.name))),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Restricted members
// ---------------------------------------------------------------------------

/// A member whose valid bit patterns are a strict subset of its width.
#[derive(Debug, Clone)]
struct Check {
    /// Byte offset inside the element.
    offset: usize,
    rule: Rule,
}

#[derive(Debug, Clone)]
enum Rule {
    Bool,
    Char,
    /// Only the listed discriminants, zero-extended from `width` bytes.
    Discriminant { width: usize, values: Vec<u64> },
}

impl Rule {
    fn width(&self) -> usize {
        match self {
            Self::Bool => 1,
            Self::Char => 4,
            Self::Discriminant { width, .. } => *width,
        }
    }

    /// # Safety
    ///
    /// `ptr` must be readable for `self.width()` bytes.
    unsafe fn admits(&self, ptr: *const u8) -> bool {
        match self {
            Self::Bool => ptr.read() <= 1,
            Self::Char => char::from_u32(ptr.cast::<u32>().read_unaligned()).is_some(),
            Self::Discriminant { width, values } => {
                let raw = match width {
                    1 => u64::from(ptr.read()),
                    2 => u64::from(ptr.cast::<u16>().read_unaligned()),
                    4 => u64::from(ptr.cast::<u32>().read_unaligned()),
                    8 => ptr.cast::<u64>().read_unaligned(),
                    _ => return false,
                };
                values.contains(&raw)
            }
        }
    }
}

/// Restricted members of `shape`, offsets relative to the element start.
fn restricted_members(shape: &Shape) -> Vec<Check> {
    let single = |rule| vec![Check { offset: 0, rule }];
    match &shape.kind {
        Kind::Bool => single(Rule::Bool),
        Kind::Char => single(Rule::Char),
        Kind::Enumeration {
            width, variants, ..
        } => single(Rule::Discriminant {
            width: *width,
            values: variants.iter().map(|v| v.value).collect(),
        }),
        Kind::Array { len, elem } => {
            let elem = elem();
            let inner = restricted_members(&elem);
            if inner.is_empty() {
                return inner;
            }
            let size = elem.size;
            (0..*len)
                .flat_map(|i| {
                    inner.iter().map(move |c| Check {
                        offset: i * size + c.offset,
                        rule: c.rule.clone(),
                    })
                })
                .collect()
        }
        Kind::Record { fields } => fields
            .iter()
            .filter(|f| !f.tags.ignore)
            .filter_map(|f| f.shape.map(|s| (f.offset, s())))
            .flat_map(|(base, s)| {
                restricted_members(&s).into_iter().map(move |c| Check {
                    offset: base + c.offset,
                    rule: c.rule,
                })
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Scratch copy of a read buffer. The container writes into the scratch
/// elements; [`Staged::settle`] validates them and moves them back.
struct Staged<'a, T> {
    data: &'a mut [T],
    scratch: Vec<MaybeUninit<T>>,
    checks: Vec<Check>,
    rejected: usize,
    settled: bool,
}

impl<'a, T> Staged<'a, T> {
    fn new(data: &'a mut [T], checks: Vec<Check>) -> Self {
        let mut scratch: Vec<MaybeUninit<T>> = Vec::with_capacity(data.len());
        // SAFETY: the capacity covers `data.len()` elements. The bitwise copy
        // is only ever moved back over `data`, never dropped on its own.
        unsafe {
            std::ptr::copy_nonoverlapping(
                data.as_ptr(),
                scratch.as_mut_ptr().cast::<T>(),
                data.len(),
            );
            scratch.set_len(data.len());
        }
        Self {
            data,
            scratch,
            checks,
            rejected: 0,
            settled: false,
        }
    }

    fn as_mut_ptr(&mut self) -> *mut u8 {
        self.scratch.as_mut_ptr().cast()
    }

    /// Restore rejected members from the previous contents, then move every
    /// scratch element back. Returns the number of rejected members.
    fn settle(&mut self) -> usize {
        if self.settled {
            return self.rejected;
        }
        self.settled = true;
        let size = std::mem::size_of::<T>();
        let scratch = self.scratch.as_mut_ptr().cast::<u8>();
        let previous = self.data.as_ptr().cast::<u8>();
        for i in 0..self.data.len() {
            for check in &self.checks {
                let at = i * size + check.offset;
                // SAFETY: `check` lies inside element `i` of both buffers.
                unsafe {
                    if !check.rule.admits(scratch.add(at)) {
                        std::ptr::copy_nonoverlapping(
                            previous.add(at),
                            scratch.add(at),
                            check.rule.width(),
                        );
                        self.rejected += 1;
                    }
                }
            }
        }
        // SAFETY: every restricted member now holds a valid pattern and the
        // container only stores valid values elsewhere. The old elements of
        // `data` were either moved into the scratch copy or left identical.
        unsafe {
            std::ptr::copy_nonoverlapping(
                self.scratch.as_ptr().cast::<T>(),
                self.data.as_mut_ptr(),
                self.data.len(),
            );
        }
        self.rejected
    }
}

impl<T> Drop for Staged<'_, T> {
    fn drop(&mut self) {
        self.settle();
    }
}

#[allow(clippy::too_many_arguments)]
fn dispatch(
    io: &dyn Transfer,
    dataset: &Dataset,
    direction: Direction,
    mem_type: &TypeDescriptor,
    file_space: SpaceRef<'_>,
    mem_space: SpaceRef<'_>,
    buf: *mut u8,
    len: usize,
    elem_size: usize,
    config: &TransferConfig,
) -> Result<()> {
    let whole;
    let file = match file_space {
        SpaceRef::All => {
            let mut space = dataset.dataspace().clone();
            space.select_all();
            whole = space;
            &whole
        }
        SpaceRef::Space(space) => {
            check_file_space(dataset.dataspace(), space)?;
            space
        }
    };
    let count = file.selected_count();

    match mem_space {
        SpaceRef::All => check_capacity(count, len)?,
        SpaceRef::Space(mem) => {
            check_capacity(mem.element_count(), len)?;
            if !mem.selection_within_extent() {
                return Err(Error::InvalidArgument(
                    "memory selection extends past the memory extent".to_string(),
                ));
            }
            let selected = mem.selected_count();
            if selected != count {
                return Err(Error::SelectionMismatch {
                    file: count,
                    memory: selected,
                });
            }
        }
    }

    let request = Request {
        resource: dataset.id(),
        direction,
        file_type: dataset.datatype(),
        mem_type,
        file_space: file,
        mem_space,
        config,
        buf,
        len,
        elem_size,
        count,
    };
    log::trace!(
        "[transfer] {} of {} element(s) on {} as {}",
        direction,
        count,
        dataset.id(),
        mem_type
    );
    // SAFETY: `buf` covers `len` elements of the type that `mem_type`
    // describes (the caller's slice or its scratch copy), borrowed for this
    // call (mutably for reads), and
    // `check_inline` ruled out members the container could not address.
    engine::serialized(io.is_thread_safe(), || unsafe { io.transfer(&request) })
}

/// A file-side dataspace must have the dataset's current extent, so its
/// coordinates linearize the same way, and select only elements inside it.
fn check_file_space(stored: &Dataspace, space: &Dataspace) -> Result<()> {
    if space.rank() != stored.rank() {
        return Err(Error::RankMismatch {
            expected: stored.rank(),
            got: space.rank(),
        });
    }
    if space.dims() != stored.dims() {
        return Err(Error::InvalidArgument(format!(
            "file dataspace extent {:?} differs from dataset extent {:?}",
            space.dims(),
            stored.dims()
        )));
    }
    if let Some((_, hi)) = space.selection_bounds() {
        for (dim, (&coord, &limit)) in hi.iter().zip(stored.dims()).enumerate() {
            if coord >= limit {
                return Err(Error::OutOfBounds { dim, coord, limit });
            }
        }
    }
    Ok(())
}

fn check_capacity(needed: u64, len: usize) -> Result<()> {
    if needed > len as u64 {
        return Err(Error::InvalidArgument(format!(
            "memory buffer holds {} element(s), {} needed",
            len, needed
        )));
    }
    Ok(())
}
