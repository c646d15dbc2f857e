//! Manifest loading, merging, and validation.
//!
//! - Schema definitions in [`schema`]
//! - File discovery and loading in [`loader`]
//! - Deep merging in [`merger`]
//! - Validation in [`validator`]
//! - Conversion into units and jobs in [`manifest`]
//!
//! # Example
//!
//! ```
//! use passflow::config::{load_merged_config, validate};
//! use tempfile::TempDir;
//! use std::fs;
//!
//! let temp = TempDir::new().unwrap();
//! let dir = temp.path().join(".passflow");
//! fs::create_dir_all(&dir).unwrap();
//! fs::write(dir.join("config.yml"), "units:\n  - id: compile\n").unwrap();
//!
//! let config = load_merged_config(temp.path()).unwrap();
//! validate(&config).unwrap();
//! assert_eq!(config.units[0].id, "compile");
//! ```
//!
//! # File Locations
//!
//! 1. Project manifest (`.passflow/config.yml`)
//! 2. Local overrides (`.passflow/config.local.yml`)

pub mod loader;
pub mod manifest;
pub mod merger;
pub mod schema;
pub mod validator;

pub use loader::{
    find_project_root, load_config, load_config_file, load_config_value, load_merged_config,
    parse_config, ConfigPaths, CONFIG_DIR,
};
pub use manifest::{Manifest, ManifestJob};
pub use merger::{deep_merge, merge_configs};
pub use schema::{JobConfig, PassflowConfig, Settings, StepConfig, UnitConfig};
pub use validator::{validate, validate_config, ValidationError};
