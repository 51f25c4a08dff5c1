//! Schema definitions for tutordb
//!
//! This module defines table schemas and column metadata.

use super::types::DataType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Column definition in a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name
    pub name: String,
    /// Data type after normalisation
    pub data_type: DataType,
    /// Declared size, e.g. VARCHAR(20); parsed but not enforced
    pub size: Option<u32>,
    /// NOT NULL constraint
    pub not_null: bool,
    /// PRIMARY KEY constraint
    pub primary_key: bool,
    /// AUTO_INCREMENT constraint (Number columns only)
    pub auto_increment: bool,
}

impl ColumnDef {
    /// Create a new nullable column
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            size: None,
            not_null: false,
            primary_key: false,
            auto_increment: false,
        }
    }

    /// Set the declared size
    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Set the NOT NULL flag
    pub fn not_null(mut self, not_null: bool) -> Self {
        self.not_null = not_null;
        self
    }

    /// Mark as primary key (implies NOT NULL)
    pub fn primary_key(mut self, pk: bool) -> Self {
        self.primary_key = pk;
        if pk {
            self.not_null = true;
        }
        self
    }

    /// Mark as AUTO_INCREMENT (implies NOT NULL)
    pub fn auto_increment(mut self, ai: bool) -> Self {
        self.auto_increment = ai;
        if ai {
            self.not_null = true;
        }
        self
    }
}

/// Table schema: ordered columns plus the table-level constraint state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Ordered list of columns
    columns: Vec<ColumnDef>,
    /// Column name to index mapping
    name_to_index: HashMap<String, usize>,
    /// Primary key column, if any
    primary_key: Option<String>,
    /// Protected tables can be read but never mutated
    is_protected: bool,
    /// Last-issued value per AUTO_INCREMENT column
    counters: HashMap<String, i64>,
}

impl TableSchema {
    /// Create a new empty schema
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            name_to_index: HashMap::new(),
            primary_key: None,
            is_protected: false,
            counters: HashMap::new(),
        }
    }

    /// Create a schema from a list of columns.
    ///
    /// The primary key is taken from the column flagged `primary_key`, and
    /// an auto-increment counter is initialised at 0 for every
    /// AUTO_INCREMENT column.
    pub fn from_columns(columns: Vec<ColumnDef>) -> Self {
        let mut schema = Self::new();
        for col in columns {
            schema.add_column(col);
        }
        schema
    }

    /// Mark this schema as protected
    pub fn protect(mut self) -> Self {
        self.is_protected = true;
        self
    }

    /// Add a column to the schema.
    ///
    /// The caller is responsible for rejecting duplicate names and second
    /// primary keys before calling this.
    pub fn add_column(&mut self, column: ColumnDef) {
        self.name_to_index
            .insert(column.name.clone(), self.columns.len());
        if column.primary_key && self.primary_key.is_none() {
            self.primary_key = Some(column.name.clone());
        }
        if column.auto_increment {
            self.counters.insert(column.name.clone(), 0);
        }
        self.columns.push(column);
    }

    /// Get column by name
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.name_to_index.get(name).map(|&idx| &self.columns[idx])
    }

    /// Get column index by name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    /// All columns in declaration order
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Check if a column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.name_to_index.contains_key(name)
    }

    /// Column names in declaration order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// The primary key column, if any
    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    /// Index of the primary key column, if any
    pub fn primary_key_index(&self) -> Option<usize> {
        self.primary_key.as_ref().and_then(|pk| self.index_of(pk))
    }

    /// Whether this table is protected from mutation
    pub fn is_protected(&self) -> bool {
        self.is_protected
    }

    /// Issue the next value for an AUTO_INCREMENT column
    pub fn next_auto_increment(&mut self, column: &str) -> f64 {
        let counter = self.counters.entry(column.to_string()).or_insert(0);
        *counter += 1;
        *counter as f64
    }

    /// Record an explicit numeric write to an AUTO_INCREMENT column so the
    /// counter never falls behind stored values.
    pub fn observe_auto_increment(&mut self, column: &str, value: f64) {
        if let Some(counter) = self.counters.get_mut(column) {
            let seen = value.ceil() as i64;
            if seen > *counter {
                *counter = seen;
            }
        }
    }

    /// Last-issued counter value for an AUTO_INCREMENT column
    pub fn auto_increment_counter(&self, column: &str) -> Option<i64> {
        self.counters.get(column).copied()
    }
}

impl Default for TableSchema {
    fn default() -> Self {
        Self::new()
    }
}
