// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error type shared by every h5kit component.
//!
//! Derivation and codec failures abort the whole call: no partial descriptor
//! is ever returned next to an error. Raw status codes coming from the
//! underlying engine (or from a collaborator that speaks status codes) are
//! converted with [`status`].

use crate::space::SelectOp;
use std::fmt;
use thiserror::Error;

/// Errors returned by h5kit operations.
#[derive(Debug, Error)]
pub enum Error {
    // ========================================================================
    // Derivation Errors
    // ========================================================================
    /// The type cannot be represented at all (maps, raw pointers).
    #[error("{kind} is not supported (at `{path}`)")]
    UnsupportedKind { kind: &'static str, path: String },

    /// A function, channel or invalid type was met during derivation.
    #[error("{kind} is not serializable (at `{path}`)")]
    NotSerializable { kind: &'static str, path: String },

    /// A type-reference annotation could not be resolved in the naming context.
    #[error("named type `{path}` could not be resolved: {reason}")]
    NamedTypeLookupFailed { path: String, reason: String },

    /// A type contains itself through pointers or options.
    #[error("cyclic type `{type_name}` (at `{path}`)")]
    CyclicType { type_name: &'static str, path: String },

    // ========================================================================
    // Model Errors
    // ========================================================================
    /// Two shape-dependent arguments disagree on dimensionality.
    #[error("rank mismatch: expected {expected}, got {got}")]
    RankMismatch { expected: usize, got: usize },

    /// An enum value does not fit in the underlying integer width.
    #[error("enum value {value} does not fit in {width} byte(s)")]
    EnumValueOutOfRange { value: u64, width: usize },

    /// A member name is used twice in the same compound or enum.
    #[error("duplicate member name `{0}`")]
    DuplicateName(String),

    /// A descriptor layout violates its invariants.
    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    /// An argument failed validation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A configuration object failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ========================================================================
    // Selection Errors
    // ========================================================================
    /// A coordinate lies beyond a finite maximum extent.
    #[error("coordinate {coord} out of bounds in dimension {dim} (limit {limit})")]
    OutOfBounds { dim: usize, coord: u64, limit: u64 },

    /// The operator does not apply to the current selection kind.
    #[error("operator {op} cannot be applied to a {target} selection")]
    InvalidOperator { op: SelectOp, target: &'static str },

    /// File and memory selections do not select the same number of elements.
    #[error("selection mismatch: file side selects {file} element(s), memory side {memory}")]
    SelectionMismatch { file: u64, memory: u64 },

    /// Stored and memory types cannot be converted into each other.
    #[error("incompatible types: {0}")]
    IncompatibleTypes(String),

    // ========================================================================
    // Codec Errors
    // ========================================================================
    /// Decode was called on zero-length data.
    #[error("empty input")]
    EmptyInput,

    /// The encoded blob is truncated, corrupted or of an unknown version.
    #[error("malformed encoding: {0}")]
    Malformed(String),

    // ========================================================================
    // Engine Errors
    // ========================================================================
    /// A negative status code returned by the engine or a collaborator.
    #[error("Error while {context} [status: {code}]")]
    EngineStatus { code: i64, context: String },
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Convert a raw status code into a [`Result`].
///
/// Negative codes become [`Error::EngineStatus`] carrying the formatted
/// context; the context is only rendered on failure.
///
/// ```
/// use h5kit::error::{status, Error};
///
/// let path = "/data/points";
/// assert_eq!(status(3, format_args!("creating dataset at {}", path)).unwrap(), 3);
///
/// match status(-1, format_args!("creating dataset at {}", path)) {
///     Err(Error::EngineStatus { code, context }) => {
///         assert_eq!(code, -1);
///         assert_eq!(context, "creating dataset at /data/points");
///     }
///     _ => unreachable!(),
/// }
/// ```
pub fn status(code: i64, context: fmt::Arguments<'_>) -> Result<i64> {
    if code < 0 {
        return Err(Error::EngineStatus {
            code,
            context: context.to_string(),
        });
    }
    Ok(code)
}
