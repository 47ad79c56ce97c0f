//! Configuration for the Tight decoder.
//!
//! ```
//! use rfb_tight::TightConfig;
//!
//! let config = TightConfig::from_toml_str("jpeg_enabled = false").unwrap();
//! assert!(!config.jpeg_enabled);
//! assert_eq!(config.max_rect_width, 2048);
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Largest value a three-byte compact length can carry.
pub const MAX_COMPACT_LENGTH: usize = 0x3F_FFFF;

/// Decoder limits and feature switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TightConfig {
    /// Widest rectangle accepted; servers split anything wider.
    #[serde(default = "default_max_rect_width")]
    pub max_rect_width: u32,
    /// Ceiling for compact lengths of zlib and JPEG payloads.
    #[serde(default = "default_max_compressed_length")]
    pub max_compressed_length: usize,
    /// Accept the JPEG sub-encoding.
    #[serde(default = "default_true")]
    pub jpeg_enabled: bool,
}

fn default_max_rect_width() -> u32 {
    2048
}

fn default_max_compressed_length() -> usize {
    MAX_COMPACT_LENGTH
}

fn default_true() -> bool {
    true
}

impl Default for TightConfig {
    fn default() -> Self {
        Self {
            max_rect_width: default_max_rect_width(),
            max_compressed_length: default_max_compressed_length(),
            jpeg_enabled: default_true(),
        }
    }
}

impl TightConfig {
    /// Parse a configuration from TOML; absent keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).context("Failed to parse Tight decoder config")?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.max_rect_width == 0 {
            bail!("max_rect_width cannot be 0");
        }
        if self.max_compressed_length == 0 || self.max_compressed_length > MAX_COMPACT_LENGTH {
            bail!(
                "max_compressed_length must be between 1 and {:#x}, got {}",
                MAX_COMPACT_LENGTH,
                self.max_compressed_length
            );
        }
        Ok(())
    }
}
