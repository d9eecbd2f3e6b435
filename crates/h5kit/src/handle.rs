// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Opaque identifiers and owned resource handles.
//!
//! Every live resource (datatype, dataspace, and whatever the external
//! container registers: datasets, groups, files) is known to the process-wide
//! [`Registry`] under an opaque [`Id`]. The registry speaks status codes the
//! way the underlying engine does; [`Handle`] is the owning wrapper that turns
//! them into [`Result`]s.
//!
//! # Ownership
//!
//! ```text
//! Handle<R>::new(value)   -> register(KIND)        (acquire)
//! handle.duplicate()      -> register(KIND) again  (fresh, independent id)
//! handle.close()          -> release(id)           (explicit, reports status)
//! drop(handle)            -> release(id)           (implicit, logs on failure)
//! ```
//!
//! A handle is never `Clone`: copying a resource is always explicit.

use crate::error::{status, Result};
use dashmap::DashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::OnceLock;

/// Opaque identifier of a live resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(i64);

impl Id {
    /// Identifier that never refers to a live resource.
    pub const INVALID: Id = Id(-1);

    /// Raw integer value.
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Whether this identifier could refer to a resource.
    pub const fn is_valid(self) -> bool {
        self.0 >= 0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of resource tracked by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Datatype,
    Dataspace,
    Dataset,
    Group,
    File,
}

impl ResourceKind {
    /// Lower-case name used in error contexts.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Datatype => "datatype",
            Self::Dataspace => "dataspace",
            Self::Dataset => "dataset",
            Self::Group => "group",
            Self::File => "file",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Process-wide table of live identifiers.
#[derive(Debug)]
pub struct Registry {
    next: AtomicI64,
    live: DashMap<Id, ResourceKind>,
}

impl Registry {
    fn new() -> Self {
        Self {
            next: AtomicI64::new(1),
            live: DashMap::new(),
        }
    }

    /// Allocate a fresh identifier for a resource of `kind`.
    pub fn register(&self, kind: ResourceKind) -> Id {
        let id = Id(self.next.fetch_add(1, Ordering::Relaxed));
        self.live.insert(id, kind);
        log::trace!("[handle] register {} {}", kind, id);
        id
    }

    /// Release an identifier.
    ///
    /// Returns `0` on success and a negative status when `id` is not live.
    pub fn release(&self, id: Id) -> i64 {
        match self.live.remove(&id) {
            Some((_, kind)) => {
                log::trace!("[handle] release {} {}", kind, id);
                0
            }
            None => -1,
        }
    }

    /// Kind of a live identifier.
    pub fn kind_of(&self, id: Id) -> Option<ResourceKind> {
        self.live.get(&id).map(|entry| *entry.value())
    }

    /// Whether `id` is currently live.
    pub fn is_live(&self, id: Id) -> bool {
        self.live.contains_key(&id)
    }

    /// Number of live resources of `kind`.
    pub fn live_count(&self, kind: ResourceKind) -> usize {
        self.live.iter().filter(|entry| *entry.value() == kind).count()
    }
}

/// Process-wide registry.
pub fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(Registry::new)
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// A value that lives behind a registered identifier.
pub trait Resource {
    /// Registry kind of this resource.
    const KIND: ResourceKind;
}

/// Owning handle: registers on construction, releases exactly once.
pub struct Handle<R: Resource> {
    id: Id,
    value: R,
}

impl<R: Resource> Handle<R> {
    /// Register `value` and take ownership of it.
    pub fn new(value: R) -> Self {
        Self {
            id: registry().register(R::KIND),
            value,
        }
    }

    /// Opaque identifier of this resource.
    pub fn id(&self) -> Id {
        self.id
    }

    /// Release the resource, reporting the release status.
    ///
    /// The handle is disposed whatever the outcome; a failed release is not
    /// retried.
    pub fn close(mut self) -> Result<()> {
        let id = std::mem::replace(&mut self.id, Id::INVALID);
        status(
            registry().release(id),
            format_args!("closing {} {}", R::KIND, id),
        )?;
        Ok(())
    }

    /// Release the identifier and hand back the owned value.
    pub fn into_inner(mut self) -> R
    where
        R: Default,
    {
        let id = std::mem::replace(&mut self.id, Id::INVALID);
        if registry().release(id) < 0 {
            log::warn!("[handle] {} {} was not live on release", R::KIND, id);
        }
        std::mem::take(&mut self.value)
    }
}

impl<R: Resource + Clone> Handle<R> {
    /// Acquire an independent resource holding the same logical value.
    pub fn duplicate(&self) -> Result<Self> {
        let live = if registry().is_live(self.id) { 0 } else { -1 };
        status(live, format_args!("copying {} {}", R::KIND, self.id))?;
        Ok(Self::new(self.value.clone()))
    }
}

impl<R: Resource> Deref for Handle<R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.value
    }
}

impl<R: Resource> DerefMut for Handle<R> {
    fn deref_mut(&mut self) -> &mut R {
        &mut self.value
    }
}

impl<R: Resource> AsRef<R> for Handle<R> {
    fn as_ref(&self) -> &R {
        &self.value
    }
}

impl<R: Resource + fmt::Debug> fmt::Debug for Handle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("kind", &R::KIND)
            .field("id", &self.id)
            .field("value", &self.value)
            .finish()
    }
}

impl<R: Resource> Drop for Handle<R> {
    fn drop(&mut self) {
        if !self.id.is_valid() {
            return;
        }
        if registry().release(self.id) < 0 {
            log::warn!("[handle] {} {} was not live on drop", R::KIND, self.id);
        }
    }
}
