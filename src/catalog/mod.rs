//! Catalog module
//!
//! This module contains the catalog, schema definitions, data types and row
//! storage.

pub mod catalog;
pub mod schema;
pub mod types;

pub use catalog::Catalog;
pub use schema::{ColumnDef, TableSchema};
pub use types::{DataType, Row, Value};
