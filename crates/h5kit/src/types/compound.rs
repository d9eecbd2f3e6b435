// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Compound (record) descriptors.

use super::TypeDescriptor;
use crate::error::{Error, Result};

/// A named member at a byte offset.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Field {
    name: String,
    ty: TypeDescriptor,
    offset: usize,
}

impl Field {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &TypeDescriptor {
        &self.ty
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Fixed-size record of named members.
///
/// Every member interval lies inside `[0, size)`. Overlap between members is
/// not checked.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CompoundType {
    size: usize,
    fields: Vec<Field>,
}

impl CompoundType {
    pub fn builder(size: usize) -> CompoundBuilder {
        CompoundBuilder::new(size)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Members in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// Builder for [`CompoundType`]; every `field` call is validated.
#[derive(Debug, Clone)]
pub struct CompoundBuilder {
    size: usize,
    fields: Vec<Field>,
}

impl CompoundBuilder {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            fields: Vec::new(),
        }
    }

    /// Append a member at `offset`.
    pub fn field(
        mut self,
        name: impl Into<String>,
        offset: usize,
        ty: TypeDescriptor,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidArgument(
                "compound member name is empty".to_string(),
            ));
        }
        if self.fields.iter().any(|f| f.name == name) {
            return Err(Error::DuplicateName(name));
        }
        let fits = match ty.size() {
            Some(len) => offset
                .checked_add(len)
                .is_some_and(|end| end <= self.size),
            None => offset < self.size,
        };
        if !fits {
            return Err(Error::InvalidLayout(format!(
                "member `{}` at offset {} (size {}) exceeds compound size {}",
                name,
                offset,
                ty.size().map_or_else(|| "variable".to_string(), |s| s.to_string()),
                self.size
            )));
        }
        self.fields.push(Field { name, ty, offset });
        Ok(self)
    }

    pub fn build(self) -> Result<CompoundType> {
        if self.size == 0 {
            return Err(Error::InvalidLayout(
                "compound size must be positive".to_string(),
            ));
        }
        Ok(CompoundType {
            size: self.size,
            fields: self.fields,
        })
    }
}
