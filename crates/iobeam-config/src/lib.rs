//! Configuration storage for the iobeam CLI.
//!
//! Provides JSON-backed profiles under a per-user config root:
//! - The active-profile pointer (`<root>/profile`)
//! - One directory per profile holding `profile.config` and cached tokens
//! - Replace-on-write file helpers shared with the token cache

pub mod error;
pub mod fsutil;
pub mod profile;

pub use error::{ConfigError, Result};
pub use profile::{
    CONFIG_DIR_ENV, ConfigStore, DEFAULT_API_SERVER, DEFAULT_PROFILE, Profile,
};
