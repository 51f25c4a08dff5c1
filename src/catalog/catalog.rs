//! The tutordb catalog
//!
//! The catalog owns every table: its schema and its rows. The three seed
//! tables (`students`, `tutor_groups`, `grades`) are protected: statements
//! may read them but never mutate or drop them.

use super::schema::{ColumnDef, TableSchema};
use super::types::{DataType, Row, Value};
use crate::error::{ConstraintKind, Error, Result};
use std::collections::HashMap;

/// The catalog: schemas and row data, keyed by table name.
///
/// The schema map and the rows map always share the same key set.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    /// Table names in creation order
    order: Vec<String>,
    /// Table schemas by name
    schemas: HashMap<String, TableSchema>,
    /// Row data by name; scan order is insertion order
    rows: HashMap<String, Vec<Row>>,
}

impl Catalog {
    /// Create an empty catalog (no seed tables)
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            schemas: HashMap::new(),
            rows: HashMap::new(),
        }
    }

    /// Create the seed catalog with the protected `students`,
    /// `tutor_groups` and `grades` tables.
    pub fn seeded() -> Self {
        let mut catalog = Self::new();

        let students = TableSchema::from_columns(vec![
            ColumnDef::new("student_id", DataType::Number).primary_key(true),
            ColumnDef::new("forename", DataType::String),
            ColumnDef::new("surname", DataType::String),
            ColumnDef::new("tutor_group_id", DataType::Number),
        ])
        .protect();
        catalog.install("students", students, student_rows());

        let tutor_groups = TableSchema::from_columns(vec![
            ColumnDef::new("tutor_group_id", DataType::Number).primary_key(true),
            ColumnDef::new("tutor_name", DataType::String),
            ColumnDef::new("room", DataType::String),
        ])
        .protect();
        catalog.install("tutor_groups", tutor_groups, tutor_group_rows());

        let grades = TableSchema::from_columns(vec![
            ColumnDef::new("student_id", DataType::Number),
            ColumnDef::new("module", DataType::String),
            ColumnDef::new("paper", DataType::Number),
            ColumnDef::new("score", DataType::Number),
        ])
        .protect();
        catalog.install("grades", grades, Vec::new());

        catalog
    }

    fn install(&mut self, name: &str, schema: TableSchema, rows: Vec<Row>) {
        self.order.push(name.to_string());
        self.schemas.insert(name.to_string(), schema);
        self.rows.insert(name.to_string(), rows);
    }

    // ========== Predicates & read-only view ==========

    /// Check if a table exists
    pub fn has_table(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Check if a column exists in a table
    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.schemas
            .get(table)
            .is_some_and(|s| s.has_column(column))
    }

    /// Columns of a table in declaration order
    pub fn columns_of(&self, table: &str) -> Option<&[ColumnDef]> {
        self.schemas.get(table).map(|s| s.columns())
    }

    /// All table names in creation order
    pub fn tables(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Schema of a table
    pub fn schema_of(&self, name: &str) -> Option<&TableSchema> {
        self.schemas.get(name)
    }

    /// Rows of a table in insertion order
    pub fn rows_of(&self, name: &str) -> Option<&[Row]> {
        self.rows.get(name).map(|r| r.as_slice())
    }

    /// Formatted schema summary for a table (for a host's tables panel)
    pub fn describe(&self, name: &str) -> Result<String> {
        let schema = self.schemas.get(name).ok_or_else(|| Error::UnknownTable {
            name: name.to_string(),
            offset: None,
        })?;

        let mut info = format!("Table: {}", name);
        if schema.is_protected() {
            info.push_str(" (protected)");
        }
        info.push_str("\nColumns:\n");

        for col in schema.columns() {
            let mut flags = Vec::new();
            if col.primary_key {
                flags.push("PRIMARY KEY");
            }
            if col.auto_increment {
                flags.push("AUTO_INCREMENT");
            }
            if col.not_null && !col.primary_key && !col.auto_increment {
                flags.push("NOT NULL");
            }

            let rendered_type = match col.size {
                Some(size) => format!("{}({})", col.data_type, size),
                None => col.data_type.to_string(),
            };
            let flags_str = if flags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", flags.join(", "))
            };

            info.push_str(&format!("  {} {}{}\n", col.name, rendered_type, flags_str));
        }

        Ok(info)
    }

    // ========== Mutating helpers ==========

    /// Create a new table with no rows
    pub fn create_table(&mut self, name: &str, schema: TableSchema) -> Result<()> {
        if self.schemas.contains_key(name) {
            return Err(Error::constraint(ConstraintKind::DuplicateTable(
                name.to_string(),
            )));
        }
        self.install(name, schema, Vec::new());
        Ok(())
    }

    /// Drop a table: schema and rows
    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        if self.schemas.remove(name).is_none() {
            return Err(Error::UnknownTable {
                name: name.to_string(),
                offset: None,
            });
        }
        self.rows.remove(name);
        self.order.retain(|t| t != name);
        Ok(())
    }

    /// Append a row to a table directly, bypassing statement processing.
    ///
    /// This is how a host provides data for tables it owns (the `grades`
    /// seed). The row must have one value per schema column.
    pub fn insert_row(&mut self, table: &str, row: Row) -> Result<()> {
        let schema = self.schemas.get(table).ok_or_else(|| Error::UnknownTable {
            name: table.to_string(),
            offset: None,
        })?;
        if row.len() != schema.column_count() {
            return Err(Error::constraint(ConstraintKind::ColumnCountMismatch {
                columns: schema.column_count(),
                values: row.len(),
            }));
        }
        if let Some(rows) = self.rows.get_mut(table) {
            rows.push(row);
        }
        Ok(())
    }

    /// Clone a table's full state (schema + rows) for staging.
    ///
    /// DDL/DML works on the clone and commits it back only after every
    /// constraint check has passed, which is what makes statements
    /// all-or-nothing.
    pub fn table_state(&self, name: &str) -> Option<(TableSchema, Vec<Row>)> {
        let schema = self.schemas.get(name)?.clone();
        let rows = self.rows.get(name)?.clone();
        Some((schema, rows))
    }

    /// Swap a staged table state back into the catalog
    pub fn commit_table(&mut self, name: &str, schema: TableSchema, rows: Vec<Row>) {
        self.schemas.insert(name.to_string(), schema);
        self.rows.insert(name.to_string(), rows);
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

fn student_rows() -> Vec<Row> {
    [
        (1, "Alice", "Smith", 1),
        (2, "Bob", "Johnson", 1),
        (3, "Charlie", "Smith", 2),
        (4, "Diana", "Brown", 2),
        (5, "Eve", "Williams", 3),
        (6, "Frank", "Davis", 3),
        (7, "Grace", "Miller", 1),
        (8, "Henry", "Wilson", 2),
        (9, "Iris", "Moore", 3),
        (10, "Jack", "Taylor", 1),
    ]
    .into_iter()
    .map(|(id, forename, surname, group)| {
        Row::new(vec![
            Value::Number(id as f64),
            Value::String(forename.to_string()),
            Value::String(surname.to_string()),
            Value::Number(group as f64),
        ])
    })
    .collect()
}

fn tutor_group_rows() -> Vec<Row> {
    [
        (1, "Clive Anderson", "B12"),
        (2, "Amelia Bennett", "A5"),
        (3, "Sidney Carter", "C3"),
    ]
    .into_iter()
    .map(|(id, tutor, room)| {
        Row::new(vec![
            Value::Number(id as f64),
            Value::String(tutor.to_string()),
            Value::String(room.to_string()),
        ])
    })
    .collect()
}
