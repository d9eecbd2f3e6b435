// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # h5kit - Typed schemas and selections for hierarchical array containers
//!
//! h5kit derives self-describing element schemas from Rust types, encodes
//! them into versioned blobs, and models the N-dimensional dataspaces and
//! selections used to move elements between memory and a container.
//!
//! ## Quick Start
//!
//! ```rust
//! use h5kit::space::{Dataspace, Hyperslab, SelectOp};
//! use h5kit::{codec, derive, Reflect, Result};
//!
//! #[derive(Reflect)]
//! struct Sample {
//!     id: u32,
//!     #[hdf("temperature")]
//!     temp: f64,
//!     #[hdf(ignore)]
//!     scratch: Vec<u8>,
//! }
//!
//! fn main() -> Result<()> {
//!     // Schema of one element
//!     let ty = derive::describe::<Sample>(None)?;
//!     let blob = codec::encode(&ty)?;
//!     assert_eq!(codec::decode(&blob)?, ty);
//!
//!     // Which elements take part in a transfer
//!     let mut space = Dataspace::simple(&[100], Some(&[-1]))?;
//!     space.select_hyperslab(SelectOp::Set, &Hyperslab::new(vec![10], vec![5]))?;
//!     assert_eq!(space.selected_count(), 5);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |   #[derive(Reflect)] -> reflect::Shape -> derive -> TypeDescriptor  |
//! +---------------------------------------------------------------------+
//! |   codec (H5KT / H5KS blobs)   |   space (Dataspace, Selection)      |
//! +---------------------------------------------------------------------+
//! |   handle (Id, Registry, Handle<R>)   |   engine (global lock)       |
//! +---------------------------------------------------------------------+
//! |   naming::NamingContext   |   transfer::Transfer   (container side) |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Modules Overview
//!
//! - [`types`] - Type descriptors and the conversion check
//! - [`reflect`] / [`derive`] - Host shapes and the derivation engine
//! - [`space`] - Dataspaces, hyperslabs, point selections
//! - [`codec`] - Binary encoding of descriptors and dataspaces
//! - [`naming`] / [`transfer`] - Traits implemented by the container
//! - [`config`] - Creation, access and transfer configuration

// Allow the derive macro to work inside this crate's tests
extern crate self as h5kit;

/// Binary encoding of descriptors and dataspaces.
pub mod codec;
/// Creation, access and transfer configuration with process-wide defaults.
pub mod config;
/// Derivation engine: host shapes to type descriptors.
pub mod derive;
/// Global critical section for non-reentrant collaborators.
pub mod engine;
/// Error type and status-code conversion.
pub mod error;
/// Opaque identifiers and owned resource handles.
pub mod handle;
/// Named datatypes in the container namespace.
pub mod naming;
/// Hierarchical `/`-separated names.
pub mod path;
/// Structural description of host types.
pub mod reflect;
/// Dataspaces and selections.
pub mod space;
/// Moving elements between memory and a dataset.
pub mod transfer;
/// Type descriptors.
pub mod types;

pub use error::{Error, Result};
pub use handle::{Handle, Id, ResourceKind};
pub use path::Path;
pub use reflect::Reflect;
pub use space::{Dataspace, SelectOp, Space, SpaceRef, UNLIMITED};
pub use transfer::{Dataset, Target};
pub use types::{Datatype, TypeDescriptor};

/// h5kit version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
