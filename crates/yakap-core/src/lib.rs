//! # Yakap Core
//!
//! Core types, configuration, and registry storage for Yakap.
//!
//! This crate provides:
//! - Configuration loading and validation (JSON5 format)
//! - Shared identifier types
//! - Input validation and sanitization
//! - The sled-backed assistance-record registry

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod registry;
pub mod types;
pub mod validation;

pub use config::{Config, ConfigError};
pub use registry::{
    Brgy, BrgyRow, City, CityRow, DashboardSummary, Province, RegistryError, RegistryStore,
    YakapRecord,
};
pub use types::{BrgyId, CityId, ProvId, UserId, YakapId};
pub use validation::{ValidationError, sanitize_text};
