// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Enumeration descriptors.

use super::IntegerType;
use crate::error::{Error, Result};

/// One named value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EnumMember {
    pub name: String,
    pub value: u64,
}

/// Ordered set of named unsigned values over an integer base.
///
/// Names are unique; values need not be.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EnumType {
    base: IntegerType,
    members: Vec<EnumMember>,
}

impl EnumType {
    pub fn new(base: IntegerType) -> Self {
        Self {
            base,
            members: Vec::new(),
        }
    }

    /// Build from `(name, value)` pairs, validating each insertion.
    pub fn from_members<I, S>(base: IntegerType, members: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let mut ty = Self::new(base);
        for (name, value) in members {
            ty.insert(name, value)?;
        }
        Ok(ty)
    }

    /// Append a member.
    ///
    /// Fails with `DuplicateName` when the name is taken, and with
    /// `EnumValueOutOfRange` when `value` does not fit the base width.
    pub fn insert(&mut self, name: impl Into<String>, value: u64) -> Result<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidArgument(
                "enum member name is empty".to_string(),
            ));
        }
        if self.members.iter().any(|m| m.name == name) {
            return Err(Error::DuplicateName(name));
        }
        if value > self.base.max_unsigned() {
            return Err(Error::EnumValueOutOfRange {
                value,
                width: self.base.width(),
            });
        }
        self.members.push(EnumMember { name, value });
        Ok(())
    }

    pub fn base(&self) -> IntegerType {
        self.base
    }

    pub fn members(&self) -> &[EnumMember] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Value of the member called exactly `name`.
    pub fn value_of(&self, name: &str) -> Option<u64> {
        self.members.iter().find(|m| m.name == name).map(|m| m.value)
    }

    /// Name of the first member holding exactly `value`.
    pub fn name_of(&self, value: u64) -> Option<&str> {
        self.members
            .iter()
            .find(|m| m.value == value)
            .map(|m| m.name.as_str())
    }
}
