//! Global config with atomic reload support.
//!
//! Uses `arc-swap` for lock-free reads and atomic config replacement.
//! A reload never patches the live config: it parses a fresh `SiteConfig`
//! and swaps the pointer, so readers holding the old `Arc` stay consistent.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    CONFIG (ArcSwap)                         │
//! │                                                             │
//! │  ┌─────────────┐     ┌─────────────┐     ┌─────────────┐    │
//! │  │ HTTP server │     │ orchestrator│     │   watcher   │    │
//! │  └──────┬──────┘     └──────┬──────┘     └──────┬──────┘    │
//! │         │                   │                   │           │
//! │         ▼                   ▼                   ▼           │
//! │       cfg()              cfg()           reload_config()    │
//! │    (lock-free)         (lock-free)      (atomic replace)    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use super::{ConfigError, SiteConfig};
use crate::utils::hash;
use arc_swap::ArcSwap;
use std::{
    fs,
    sync::{
        Arc, LazyLock,
        atomic::{AtomicU64, Ordering},
    },
};

// =============================================================================
// Global State
// =============================================================================

/// Global config storage with atomic replacement support.
///
/// Initialized with default config, then replaced with loaded config in main.
pub static CONFIG: LazyLock<ArcSwap<SiteConfig>> =
    LazyLock::new(|| ArcSwap::from_pointee(SiteConfig::default()));

/// Hash of the config file content behind the current `CONFIG`.
static CONFIG_HASH: AtomicU64 = AtomicU64::new(0);

// =============================================================================
// Public API
// =============================================================================

/// Get current config as `Arc<SiteConfig>`. Thread-safe and wait-free.
#[inline]
pub fn cfg() -> Arc<SiteConfig> {
    CONFIG.load_full()
}

/// Replace config atomically (called when quire.toml changes).
///
/// Returns `true` if config was actually updated, `false` if the file content
/// matches the last load.
///
/// # Errors
///
/// Returns error if quire.toml can't be read, parsed or validated. The
/// current config stays in place in that case.
pub fn reload_config() -> anyhow::Result<bool> {
    let c = cfg();
    let Some(cli) = c.cli else {
        anyhow::bail!(ConfigError::Validation(
            "config was not loaded from the command line".into()
        ));
    };

    let content =
        fs::read_to_string(&c.config_path).map_err(|e| ConfigError::Io(c.config_path.clone(), e))?;
    let new_hash = hash::compute(content.as_bytes());

    if new_hash == CONFIG_HASH.load(Ordering::Relaxed) {
        return Ok(false);
    }

    let new_config = SiteConfig::load(cli)?;

    CONFIG.store(Arc::new(new_config));
    CONFIG_HASH.store(new_hash, Ordering::Relaxed);

    Ok(true)
}

/// Initialize global config (called once at startup).
#[inline]
pub fn init_config(config: SiteConfig) {
    if let Ok(content) = fs::read_to_string(&config.config_path) {
        CONFIG_HASH.store(hash::compute(content.as_bytes()), Ordering::Relaxed);
    }

    CONFIG.store(Arc::new(config));
}
