//! Data layer for the hondenschool admin tools.
//!
//! - `sheets`: client for the spreadsheet-backed remote API
//! - `store`: local buckets of records, normalization and legacy migration
//! - `loader`: remote → static export → local bucket resolution
//! - `entity`: lesson, notice and series builders, and the agenda feed

pub mod collection;
pub mod config;
pub mod entity;
pub mod error;
pub mod id;
pub mod loader;
pub mod sheets;
pub mod store;

pub use collection::Collection;
pub use error::{HondenschoolError, HondenschoolResult};
pub use store::Record;
