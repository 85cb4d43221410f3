//! Core library for perfhub.
//!
//! This crate provides the OKR domain models, the key-result progress rollup
//! and the database operations, independent of any transport layer.
//!
//! # Usage
//!
//! ```no_run
//! use perfhub_core::db::Database;
//! use perfhub_core::models::*;
//!
//! let db = Database::open_default()?;
//! db.migrate()?;
//!
//! let okrs = db.list_okrs(&OkrFilter::default())?;
//! # Ok::<(), perfhub_core::Error>(())
//! ```

pub mod db;
pub mod error;
pub mod models;
pub mod progress;

// Re-export commonly used types at crate root
pub use db::Database;
pub use error::{Error, Result};
