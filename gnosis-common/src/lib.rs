//! # Gnosis Common Library
//!
//! Shared code for the Gnosis services:
//! - Error type used by the persistence layer
//! - Root folder and TOML configuration loading
//! - Database schema and entity queries (groups, profiles, images, memberships)

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
