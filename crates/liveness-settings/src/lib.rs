//! # liveness-settings
//!
//! Configuration for the liveness gateway, loaded from three layers (in
//! priority order):
//! 1. **Compiled defaults**: [`LivenessSettings::default()`]
//! 2. **Settings file**: `~/.liveness/settings.json`, deep-merged over defaults
//! 3. **Environment variables**: `LIVENESS_*` overrides (highest priority)
//!
//! Settings are loaded once by the binary and passed down explicitly; there
//! is no process-wide instance.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, deep_merge, load_settings, load_settings_from_path, settings_path,
};
pub use types::{KeepaliveSettings, LivenessSettings, LoggingSettings, ServerSettings};
