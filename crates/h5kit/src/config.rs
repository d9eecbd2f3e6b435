// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Configuration objects, one per concern.
//!
//! # Architecture
//!
//! - **Per call**: [`CreateConfig`] (committing names), [`AccessConfig`]
//!   (resolving names), [`TransferConfig`] (moving data). Each is a plain
//!   value validated by its builder and composed by value.
//! - **Process-wide**: [`Defaults`] groups the three and lives behind an
//!   `ArcSwap`; [`defaults()`] is a lock-free read.
//!
//! # Example
//!
//! ```
//! use h5kit::config::{self, AccessConfig, Defaults};
//!
//! let access = AccessConfig::builder().max_link_depth(32).build()?;
//! let custom = Defaults { access, ..Defaults::default() };
//! config::set_defaults(custom);
//! assert_eq!(config::defaults().access.max_link_depth(), 32);
//! # config::set_defaults(Defaults::default());
//! # Ok::<(), h5kit::Error>(())
//! ```

use crate::error::{Error, Result};
use arc_swap::ArcSwap;
use std::sync::{Arc, OnceLock};

// =======================================================================
// Limits
// =======================================================================

/// Default bound on soft/external link traversal.
pub const DEFAULT_MAX_LINK_DEPTH: u32 = 16;

/// Upper bound accepted for `max_link_depth`.
pub const MAX_LINK_DEPTH_LIMIT: u32 = 1024;

/// Smallest conversion buffer a transfer may use.
pub const MIN_CONVERSION_BUFFER: usize = 1024;

/// Default conversion buffer (1 MiB).
pub const DEFAULT_CONVERSION_BUFFER: usize = 1024 * 1024;

/// Character encoding of committed names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CharEncoding {
    #[default]
    Ascii,
    Utf8,
}

impl CharEncoding {
    /// Whether `name` is representable in this encoding.
    pub fn accepts(self, name: &str) -> bool {
        match self {
            Self::Ascii => name.is_ascii(),
            Self::Utf8 => true,
        }
    }
}

// =======================================================================
// Creation
// =======================================================================

/// Options used when committing a name into the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateConfig {
    create_intermediate_groups: bool,
    name_encoding: CharEncoding,
}

impl Default for CreateConfig {
    fn default() -> Self {
        Self {
            create_intermediate_groups: true,
            name_encoding: CharEncoding::Ascii,
        }
    }
}

impl CreateConfig {
    pub fn builder() -> CreateConfigBuilder {
        CreateConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn create_intermediate_groups(&self) -> bool {
        self.create_intermediate_groups
    }

    pub fn name_encoding(&self) -> CharEncoding {
        self.name_encoding
    }
}

/// Builder for [`CreateConfig`].
#[derive(Debug, Clone)]
pub struct CreateConfigBuilder {
    config: CreateConfig,
}

impl CreateConfigBuilder {
    pub fn create_intermediate_groups(mut self, enabled: bool) -> Self {
        self.config.create_intermediate_groups = enabled;
        self
    }

    pub fn name_encoding(mut self, encoding: CharEncoding) -> Self {
        self.config.name_encoding = encoding;
        self
    }

    pub fn build(self) -> Result<CreateConfig> {
        Ok(self.config)
    }
}

// =======================================================================
// Access
// =======================================================================

/// Options used when resolving a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessConfig {
    max_link_depth: u32,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            max_link_depth: DEFAULT_MAX_LINK_DEPTH,
        }
    }
}

impl AccessConfig {
    pub fn builder() -> AccessConfigBuilder {
        AccessConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn max_link_depth(&self) -> u32 {
        self.max_link_depth
    }
}

/// Builder for [`AccessConfig`].
#[derive(Debug, Clone)]
pub struct AccessConfigBuilder {
    config: AccessConfig,
}

impl AccessConfigBuilder {
    pub fn max_link_depth(mut self, depth: u32) -> Self {
        self.config.max_link_depth = depth;
        self
    }

    pub fn build(self) -> Result<AccessConfig> {
        let depth = self.config.max_link_depth;
        if depth == 0 || depth > MAX_LINK_DEPTH_LIMIT {
            return Err(Error::InvalidConfig(format!(
                "max_link_depth must be in 1..={}, got {}",
                MAX_LINK_DEPTH_LIMIT, depth
            )));
        }
        Ok(self.config)
    }
}

// =======================================================================
// Transfer
// =======================================================================

/// Options used when moving data between memory and the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferConfig {
    conversion_buffer: usize,
    preserve_partial: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            conversion_buffer: DEFAULT_CONVERSION_BUFFER,
            preserve_partial: false,
        }
    }
}

impl TransferConfig {
    pub fn builder() -> TransferConfigBuilder {
        TransferConfigBuilder {
            config: Self::default(),
        }
    }

    /// Size in bytes of the type-conversion buffer.
    pub fn conversion_buffer(&self) -> usize {
        self.conversion_buffer
    }

    /// Keep stored fields that the memory compound does not mention.
    pub fn preserve_partial(&self) -> bool {
        self.preserve_partial
    }
}

/// Builder for [`TransferConfig`].
#[derive(Debug, Clone)]
pub struct TransferConfigBuilder {
    config: TransferConfig,
}

impl TransferConfigBuilder {
    pub fn conversion_buffer(mut self, bytes: usize) -> Self {
        self.config.conversion_buffer = bytes;
        self
    }

    pub fn preserve_partial(mut self, enabled: bool) -> Self {
        self.config.preserve_partial = enabled;
        self
    }

    pub fn build(self) -> Result<TransferConfig> {
        if self.config.conversion_buffer < MIN_CONVERSION_BUFFER {
            return Err(Error::InvalidConfig(format!(
                "conversion_buffer must be at least {} bytes, got {}",
                MIN_CONVERSION_BUFFER, self.config.conversion_buffer
            )));
        }
        Ok(self.config)
    }
}

// =======================================================================
// Process-wide defaults
// =======================================================================

/// The configuration triple copied into every new location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Defaults {
    pub create: CreateConfig,
    pub access: AccessConfig,
    pub transfer: TransferConfig,
}

fn slot() -> &'static ArcSwap<Defaults> {
    static DEFAULTS: OnceLock<ArcSwap<Defaults>> = OnceLock::new();
    DEFAULTS.get_or_init(|| ArcSwap::from_pointee(Defaults::default()))
}

/// Current process-wide defaults.
pub fn defaults() -> Arc<Defaults> {
    slot().load_full()
}

/// Replace the process-wide defaults.
///
/// Mutating defaults while other threads are mid-call is a caller error:
/// in-flight calls keep the snapshot they already loaded.
pub fn set_defaults(defaults: Defaults) {
    log::debug!("[config] process defaults replaced");
    slot().store(Arc::new(defaults));
}

#[cfg(feature = "config-loaders")]
mod yaml {
    use super::*;
    use serde::Deserialize;

    /// Root YAML document.
    ///
    /// ```yaml
    /// create:
    ///   create_intermediate_groups: false
    ///   name_encoding: utf8
    /// access:
    ///   max_link_depth: 8
    /// transfer:
    ///   conversion_buffer: 65536
    ///   preserve_partial: true
    /// ```
    #[derive(Debug, Deserialize, Default)]
    #[serde(default)]
    struct YamlDefaults {
        create: YamlCreate,
        access: YamlAccess,
        transfer: YamlTransfer,
    }

    #[derive(Debug, Deserialize, Default)]
    #[serde(default)]
    struct YamlCreate {
        create_intermediate_groups: Option<bool>,
        name_encoding: Option<String>,
    }

    #[derive(Debug, Deserialize, Default)]
    #[serde(default)]
    struct YamlAccess {
        max_link_depth: Option<u32>,
    }

    #[derive(Debug, Deserialize, Default)]
    #[serde(default)]
    struct YamlTransfer {
        conversion_buffer: Option<usize>,
        preserve_partial: Option<bool>,
    }

    fn parse_encoding(raw: &str) -> Result<CharEncoding> {
        match raw.to_ascii_lowercase().as_str() {
            "ascii" => Ok(CharEncoding::Ascii),
            "utf8" | "utf-8" => Ok(CharEncoding::Utf8),
            other => Err(Error::InvalidConfig(format!(
                "unknown name_encoding '{}'",
                other
            ))),
        }
    }

    impl Defaults {
        /// Parse defaults from YAML; absent keys keep their default value.
        pub fn from_yaml_str(yaml: &str) -> Result<Defaults> {
            let doc: YamlDefaults = serde_yaml::from_str(yaml)
                .map_err(|e| Error::InvalidConfig(format!("failed to parse YAML: {}", e)))?;

            let mut create = CreateConfig::builder();
            if let Some(enabled) = doc.create.create_intermediate_groups {
                create = create.create_intermediate_groups(enabled);
            }
            if let Some(ref raw) = doc.create.name_encoding {
                create = create.name_encoding(parse_encoding(raw)?);
            }

            let mut access = AccessConfig::builder();
            if let Some(depth) = doc.access.max_link_depth {
                access = access.max_link_depth(depth);
            }

            let mut transfer = TransferConfig::builder();
            if let Some(bytes) = doc.transfer.conversion_buffer {
                transfer = transfer.conversion_buffer(bytes);
            }
            if let Some(enabled) = doc.transfer.preserve_partial {
                transfer = transfer.preserve_partial(enabled);
            }

            Ok(Defaults {
                create: create.build()?,
                access: access.build()?,
                transfer: transfer.build()?,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_depth_bounds() {
        assert!(AccessConfig::builder().max_link_depth(0).build().is_err());
        assert!(AccessConfig::builder().max_link_depth(1025).build().is_err());
        let cfg = AccessConfig::builder().max_link_depth(1024).build().unwrap();
        assert_eq!(cfg.max_link_depth(), 1024);
    }

    #[test]
    fn test_transfer_buffer_minimum() {
        let err = TransferConfig::builder()
            .conversion_buffer(512)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        let cfg = TransferConfig::builder()
            .conversion_buffer(4096)
            .preserve_partial(true)
            .build()
            .unwrap();
        assert_eq!(cfg.conversion_buffer(), 4096);
        assert!(cfg.preserve_partial());
    }

    #[test]
    fn test_configs_are_values() {
        let a = CreateConfig::builder()
            .name_encoding(CharEncoding::Utf8)
            .build()
            .unwrap();
        let mut b = a;
        b.create_intermediate_groups = false;
        assert!(a.create_intermediate_groups());
        assert_eq!(b.name_encoding(), CharEncoding::Utf8);
    }

    #[test]
    fn test_encoding_accepts() {
        assert!(CharEncoding::Ascii.accepts("plain"));
        assert!(!CharEncoding::Ascii.accepts("caf\u{e9}"));
        assert!(CharEncoding::Utf8.accepts("caf\u{e9}"));
    }

    #[cfg(feature = "config-loaders")]
    #[test]
    fn test_yaml_partial_document() {
        let yaml = "access:\n  max_link_depth: 8\ntransfer:\n  preserve_partial: true\n";
        let d = Defaults::from_yaml_str(yaml).unwrap();
        assert_eq!(d.access.max_link_depth(), 8);
        assert!(d.transfer.preserve_partial());
        assert_eq!(d.transfer.conversion_buffer(), DEFAULT_CONVERSION_BUFFER);
        assert_eq!(d.create, CreateConfig::default());
    }

    #[cfg(feature = "config-loaders")]
    #[test]
    fn test_yaml_rejects_invalid_values() {
        assert!(Defaults::from_yaml_str("access:\n  max_link_depth: 0\n").is_err());
        assert!(Defaults::from_yaml_str("create:\n  name_encoding: latin1\n").is_err());
        assert!(Defaults::from_yaml_str("access: [").is_err());
    }
}
