//! core
//!
//! Domain types, document schema, and configuration.
//!
//! # Modules
//!
//! - [`types`] - Validated newtypes: ProjectName, RepositoryUrl, VersionLabel, etc.
//! - [`document`] - Project document schema
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Inputs are validated once, at construction
//! - Unmodeled document fields are carried through untouched

pub mod config;
pub mod document;
pub mod types;
