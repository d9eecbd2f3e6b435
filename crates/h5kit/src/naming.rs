// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Naming context: where committed datatypes live.
//!
//! The container that owns the namespace is an external collaborator; it only
//! needs to store and load opaque schema blobs under `/`-separated paths.
//! Encoding and decoding happen here, so every context sees the same blobs.
//!
//! ```text
//! commit_type(ctx, path, ty)  -> codec::encode(ty) -> ctx.store_schema(path, bytes)
//! open_type(ctx, path)        -> ctx.load_schema(path) -> codec::decode(bytes) -> Datatype
//! ```

use crate::codec;
use crate::config::{AccessConfig, CreateConfig};
use crate::engine;
use crate::error::{Error, Result};
use crate::path::Path;
use crate::types::{Datatype, TypeDescriptor};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::fmt;

// ---------------------------------------------------------------------------
// NamingContext trait
// ---------------------------------------------------------------------------

/// Namespace root used to resolve and commit named datatypes.
pub trait NamingContext {
    /// Load the schema blob committed at `path`.
    fn load_schema(&self, path: &Path, access: &AccessConfig) -> Result<Vec<u8>>;

    /// Commit `schema` under `path`.
    fn store_schema(&self, path: &Path, schema: &[u8], create: &CreateConfig) -> Result<()>;

    /// Whether concurrent reentrant calls are tolerated. When `false` every
    /// call goes through the global engine lock.
    fn is_thread_safe(&self) -> bool {
        false
    }
}

/// Resolve and decode the datatype committed at `path`.
pub fn load_type(
    ctx: &dyn NamingContext,
    path: &Path,
    access: &AccessConfig,
) -> Result<TypeDescriptor> {
    let bytes = engine::serialized(ctx.is_thread_safe(), || ctx.load_schema(path, access))?;
    let ty = codec::decode(&bytes)?;
    log::debug!("[naming] opened {} as {}", path, ty);
    Ok(ty)
}

/// Resolve the datatype committed at `path` into a registered handle.
pub fn open_type(ctx: &dyn NamingContext, path: &Path, access: &AccessConfig) -> Result<Datatype> {
    load_type(ctx, path, access).map(Datatype::new)
}

/// Encode `ty` and commit it under `path`.
pub fn commit_type(
    ctx: &dyn NamingContext,
    path: &Path,
    ty: &TypeDescriptor,
    create: &CreateConfig,
) -> Result<()> {
    let bytes = codec::encode(ty)?;
    engine::serialized(ctx.is_thread_safe(), || {
        ctx.store_schema(path, &bytes, create)
    })?;
    log::debug!("[naming] committed {} ({} bytes) at {}", ty, bytes.len(), path);
    Ok(())
}

// ---------------------------------------------------------------------------
// MemoryNamespace
// ---------------------------------------------------------------------------

/// Status returned by the namespace for a refused operation.
const REFUSED: i64 = -1;

fn refused(context: fmt::Arguments<'_>) -> Error {
    Error::EngineStatus {
        code: REFUSED,
        context: context.to_string(),
    }
}

#[derive(Debug, Default)]
struct Tree {
    schemas: HashMap<Path, Vec<u8>>,
    links: HashMap<Path, Path>,
    groups: HashSet<Path>,
}

impl Tree {
    fn occupied(&self, path: &Path) -> bool {
        self.schemas.contains_key(path) || self.links.contains_key(path) || self.groups.contains(path)
    }

    fn parent_exists(&self, path: &Path) -> bool {
        match path.parent() {
            Some(parent) => parent == Path::root() || self.groups.contains(&parent),
            None => true,
        }
    }

    fn add_ancestors(&mut self, path: &Path) {
        let mut cursor = path.parent();
        while let Some(parent) = cursor {
            if parent == Path::root() {
                break;
            }
            cursor = parent.parent();
            self.groups.insert(parent);
        }
    }
}

/// In-process [`NamingContext`] backed by a map of absolute paths.
///
/// Relative paths resolve against the root. Soft links are followed up to
/// the access configuration's `max_link_depth`.
#[derive(Debug, Default)]
pub struct MemoryNamespace {
    tree: RwLock<Tree>,
}

impl MemoryNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    fn absolute(path: &Path) -> Path {
        Path::root().join(path)
    }

    fn check_names(path: &Path, create: &CreateConfig) -> Result<()> {
        let encoding = create.name_encoding();
        match path.components().find(|atom| !encoding.accepts(atom)) {
            Some(atom) => Err(Error::InvalidArgument(format!(
                "name `{}` is not representable as {:?}",
                atom, encoding
            ))),
            None => Ok(()),
        }
    }

    fn prepare(tree: &mut Tree, path: &Path, create: &CreateConfig, what: &str) -> Result<()> {
        Self::check_names(path, create)?;
        if tree.occupied(path) {
            log::debug!("[naming] {} already exists", path);
            return Err(refused(format_args!("creating {} at {}", what, path)));
        }
        if create.create_intermediate_groups() {
            tree.add_ancestors(path);
        } else if !tree.parent_exists(path) {
            return Err(refused(format_args!("creating {} at {}", what, path)));
        }
        Ok(())
    }

    /// Create an empty group.
    pub fn create_group(&self, path: impl Into<Path>, create: &CreateConfig) -> Result<()> {
        let path = Self::absolute(&path.into());
        let mut tree = self.tree.write();
        Self::prepare(&mut tree, &path, create, "group")?;
        tree.groups.insert(path);
        Ok(())
    }

    /// Create a soft link at `link` pointing to `target`.
    pub fn create_soft_link(
        &self,
        link: impl Into<Path>,
        target: impl Into<Path>,
        create: &CreateConfig,
    ) -> Result<()> {
        let link = Self::absolute(&link.into());
        let target = Self::absolute(&target.into());
        let mut tree = self.tree.write();
        Self::prepare(&mut tree, &link, create, "link")?;
        tree.links.insert(link, target);
        Ok(())
    }

    /// Whether something (schema, group or link) exists at `path`.
    pub fn exists(&self, path: impl Into<Path>) -> bool {
        self.tree.read().occupied(&Self::absolute(&path.into()))
    }

    /// Committed datatype paths, sorted.
    pub fn datatype_paths(&self) -> Vec<Path> {
        let mut paths: Vec<Path> = self.tree.read().schemas.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.tree.read().schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NamingContext for MemoryNamespace {
    fn load_schema(&self, path: &Path, access: &AccessConfig) -> Result<Vec<u8>> {
        let tree = self.tree.read();
        let mut current = Self::absolute(path);
        let mut hops = 0u32;
        while let Some(target) = tree.links.get(&current) {
            hops += 1;
            if hops > access.max_link_depth() {
                log::debug!("[naming] link depth exceeded resolving {}", path);
                return Err(refused(format_args!("resolving link {}", path)));
            }
            current = target.clone();
        }
        tree.schemas
            .get(&current)
            .cloned()
            .ok_or_else(|| refused(format_args!("opening datatype at {}", path)))
    }

    fn store_schema(&self, path: &Path, schema: &[u8], create: &CreateConfig) -> Result<()> {
        let path = Self::absolute(path);
        let mut tree = self.tree.write();
        Self::prepare(&mut tree, &path, create, "datatype")?;
        tree.schemas.insert(path, schema.to_vec());
        Ok(())
    }

    fn is_thread_safe(&self) -> bool {
        true
    }
}
