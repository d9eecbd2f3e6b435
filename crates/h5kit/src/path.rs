// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `/`-separated names inside a container.
//!
//! A path is a sequence of atoms, `<atom>/<atom>/.../<atom>`, optionally
//! rooted at `/`. Joining concatenates and then normalizes lexically: repeated
//! separators collapse, `.` atoms vanish, `..` removes the previous atom
//! (and is dropped at the root of an absolute path), and the result never ends
//! in a separator.

use std::fmt;

/// Separator between path atoms.
pub const SEPARATOR: char = '/';

/// A hierarchical name inside a container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Path(String);

impl Path {
    /// Wrap `s` as-is (no normalization).
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Root of the hierarchy.
    pub fn root() -> Self {
        Self(SEPARATOR.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the path starts at the root.
    pub fn is_absolute(&self) -> bool {
        self.0.starts_with(SEPARATOR)
    }

    /// Concatenate `other` under `self` and normalize the result.
    ///
    /// ```
    /// use h5kit::path::Path;
    ///
    /// let base = Path::new("/data//runs/");
    /// assert_eq!(base.join("./a/../b").as_str(), "/data/runs/b");
    /// assert_eq!(Path::new("/").join("..").as_str(), "/");
    /// ```
    pub fn join(&self, other: impl AsRef<str>) -> Path {
        let other = other.as_ref();
        match (self.0.is_empty(), other.is_empty()) {
            (true, true) => Path::default(),
            (false, true) => normalize(&self.0),
            (true, false) => normalize(other),
            (false, false) => normalize(&format!("{}{}{}", self.0, SEPARATOR, other)),
        }
    }

    /// Lexically normalized copy of this path.
    pub fn normalized(&self) -> Path {
        normalize(&self.0)
    }

    /// Non-empty atoms, in order.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR).filter(|atom| !atom.is_empty())
    }

    /// Last atom, if any.
    pub fn name(&self) -> Option<&str> {
        self.components().last()
    }

    /// Path without its last atom, or `None` at the root or for a single
    /// relative atom.
    pub fn parent(&self) -> Option<Path> {
        let clean = self.normalized();
        let idx = clean.0.rfind(SEPARATOR)?;
        if clean.0.len() == 1 {
            return None;
        }
        if idx == 0 {
            return Some(Path::root());
        }
        Some(Path(clean.0[..idx].to_string()))
    }
}

/// Lexical normalization: the same rules as [`Path::join`] applied to a
/// single path. An empty relative result becomes `.`.
fn normalize(raw: &str) -> Path {
    let rooted = raw.starts_with(SEPARATOR);
    let mut out: Vec<&str> = Vec::new();

    for atom in raw.split(SEPARATOR) {
        match atom {
            "" | "." => {}
            ".." => match out.last() {
                Some(&last) if last != ".." => {
                    out.pop();
                }
                _ if rooted => {}
                _ => out.push(".."),
            },
            _ => out.push(atom),
        }
    }

    let body = out.join("/");
    match (rooted, body.is_empty()) {
        (true, _) => Path(format!("{}{}", SEPARATOR, body)),
        (false, true) => Path(".".to_string()),
        (false, false) => Path(body),
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Path {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for Path {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
