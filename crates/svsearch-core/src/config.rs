//! Configuration types for svsearch.
//!
//! [`Config::load`] reads `~/.config/svsearch/config.toml`, creating it with
//! hardcoded defaults if it does not yet exist. [`Config::load_from`] layers a
//! given file over the defaults without writing anything, and
//! [`Config::defaults`] returns the defaults alone (useful in tests).

use crate::hierarchy::{Roots, CUSTOM_SVG_ROOT, SVG_ROOT};
use serde::Deserialize;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Embedded defaults
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"
[search]
default_limit = 1000
prefilter_cap = 3000

[hierarchy]
root               = "dc/g/Root"
custom_root        = "dc/g/Custom_Root"
ignored_groups     = ["dc/g/Establishment_Industry", "eia/g/Root", "dc/g/Uncategorized"]
blocklisted_groups = []

[synonyms]
"#;

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

/// Top-level configuration, loaded from `~/.config/svsearch/config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub hierarchy: HierarchyConfig,
    #[serde(default)]
    pub synonyms: SynonymsConfig,
}

/// `[search]` section of `config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Result bound when a request does not give one.
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    /// Candidates per list handed to existence filtering.
    #[serde(default = "default_prefilter_cap")]
    pub prefilter_cap: usize,
}

fn default_limit() -> usize { 1000 }
fn default_prefilter_cap() -> usize { 3000 }

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            prefilter_cap: default_prefilter_cap(),
        }
    }
}

/// `[hierarchy]` section of `config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct HierarchyConfig {
    #[serde(default = "default_root")]
    pub root: String,
    #[serde(default = "default_custom_root")]
    pub custom_root: String,
    /// Subtrees never indexed.
    #[serde(default = "default_ignored_groups")]
    pub ignored_groups: Vec<String>,
    /// Subtrees removed from the blocklist-aware index variant.
    #[serde(default)]
    pub blocklisted_groups: Vec<String>,
}

fn default_root() -> String { SVG_ROOT.to_string() }
fn default_custom_root() -> String { CUSTOM_SVG_ROOT.to_string() }
fn default_ignored_groups() -> Vec<String> {
    ["dc/g/Establishment_Industry", "eia/g/Root", "dc/g/Uncategorized"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            custom_root: default_custom_root(),
            ignored_groups: default_ignored_groups(),
            blocklisted_groups: Vec::new(),
        }
    }
}

impl HierarchyConfig {
    pub fn roots(&self) -> Roots {
        Roots {
            root: self.root.clone(),
            custom_root: self.custom_root.clone(),
        }
    }
}

/// `[synonyms]` section of `config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SynonymsConfig {
    /// JSON synonym resource. No synonyms when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Load from `~/.config/svsearch/config.toml`, layered on top of the
    /// built-in defaults. Creates the file with defaults if it does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path();

        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, DEFAULT_CONFIG.trim_start())?;
        }

        Self::load_from(&path)
    }

    /// Layer `path` over the built-in defaults. A missing file yields the
    /// defaults; nothing is written.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(config::File::from(path).required(false))
            .build()?
            .try_deserialize()
            .map_err(Into::into)
    }

    /// Return the built-in defaults without touching the filesystem.
    pub fn defaults() -> Self {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .build()
            .expect("built-in default config must be valid TOML")
            .try_deserialize()
            .expect("built-in default config must deserialize correctly")
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

fn config_path() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
                .join(".config")
        })
        .join("svsearch")
        .join("config.toml")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
