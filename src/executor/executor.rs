//! Statement execution
//!
//! Dispatches on statement kind. SELECT runs through the pure query
//! pipeline; DDL/DML stages every mutation on a clone of the target
//! table's schema and rows and swaps the clone in only after all
//! constraint checks pass, so a failed statement leaves the catalog
//! exactly as it was.

use super::select;
use crate::catalog::{Catalog, Row, TableSchema, Value};
use crate::error::{ConstraintKind, Error, Result};
use crate::sql::ast::{
    AlterTable, Assignment, CreateTable, Delete, DropTable, Ident, Insert, Predicate, Statement,
    Update,
};
use super::eval::Scope;
use serde::Serialize;
use std::collections::HashSet;

/// Result of executing one statement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Output {
    /// Column names
    pub columns: Vec<String>,
    /// Result rows
    pub rows: Vec<Vec<Value>>,
    /// Result metadata
    pub meta: OutputMeta,
}

/// Metadata attached to every result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputMeta {
    /// Result-row count for SELECT, affected-row count for mutations
    pub row_count: usize,
    /// Whether the statement changed the catalog
    pub modified: bool,
    /// Warnings for the host to surface (currently always empty)
    pub warnings: Vec<String>,
}

impl Output {
    /// A tabular result (SELECT)
    pub fn table(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            meta: OutputMeta {
                row_count,
                modified: false,
                warnings: Vec::new(),
            },
        }
    }

    /// A mutation result: a single `Result` column carrying one human
    /// message, with the affected-row count in the metadata.
    pub fn change(affected: usize, message: impl Into<String>) -> Self {
        Self {
            columns: vec!["Result".to_string()],
            rows: vec![vec![Value::String(message.into())]],
            meta: OutputMeta {
                row_count: affected,
                modified: true,
                warnings: Vec::new(),
            },
        }
    }
}

/// Statement executor over a mutable catalog
pub struct Executor<'a> {
    catalog: &'a mut Catalog,
}

impl<'a> Executor<'a> {
    /// Create an executor for one statement
    pub fn new(catalog: &'a mut Catalog) -> Self {
        Self { catalog }
    }

    /// Execute a parsed (and, for queries, validated) statement
    pub fn execute(&mut self, statement: Statement) -> Result<Output> {
        match statement {
            Statement::Query(query) => select::run(&query, self.catalog),
            Statement::CreateTable(create) => self.execute_create_table(create),
            Statement::AlterTable(alter) => self.execute_alter_table(alter),
            Statement::DropTable(drop) => self.execute_drop_table(drop),
            Statement::Insert(insert) => self.execute_insert(insert),
            Statement::Update(update) => self.execute_update(update),
            Statement::Delete(delete) => self.execute_delete(delete),
        }
    }

    // ========== DDL ==========

    fn execute_create_table(&mut self, create: CreateTable) -> Result<Output> {
        if self.catalog.has_table(&create.name.name) {
            return Err(Error::Constraint {
                kind: ConstraintKind::DuplicateTable(create.name.name),
                offset: Some(create.name.offset),
            });
        }

        let mut seen = HashSet::new();
        for column in &create.columns {
            if !seen.insert(column.name.clone()) {
                return Err(Error::Constraint {
                    kind: ConstraintKind::DuplicateColumn(column.name.clone()),
                    offset: Some(create.name.offset),
                });
            }
        }

        let name = create.name.name;
        let schema = TableSchema::from_columns(create.columns);
        self.catalog.create_table(&name, schema)?;

        Ok(Output::change(0, format!("Table '{}' created", name)))
    }

    fn execute_alter_table(&mut self, alter: AlterTable) -> Result<Output> {
        self.writable_table(&alter.name)?;

        let (mut schema, mut rows) = self
            .catalog
            .table_state(&alter.name.name)
            .ok_or_else(Error::internal)?;

        let column = alter.add_column;
        if schema.has_column(&column.name) {
            return Err(Error::Constraint {
                kind: ConstraintKind::DuplicateColumn(column.name),
                offset: Some(alter.name.offset),
            });
        }
        if column.primary_key && schema.primary_key().is_some() {
            return Err(Error::syntax(
                "multiple primary keys are not supported",
                alter.name.offset,
            ));
        }
        // Existing rows would be back-filled with NULL, which a NOT NULL
        // column (and so PRIMARY KEY) cannot accept. AUTO_INCREMENT can
        // back-fill from its counter instead.
        if !rows.is_empty() && column.not_null && !column.auto_increment {
            return Err(Error::Constraint {
                kind: ConstraintKind::NotNullViolation(column.name),
                offset: Some(alter.name.offset),
            });
        }

        let column_name = column.name.clone();
        let auto_increment = column.auto_increment;
        schema.add_column(column);

        for row in &mut rows {
            if auto_increment {
                row.push(Value::Number(schema.next_auto_increment(&column_name)));
            } else {
                row.push(Value::Null);
            }
        }

        let table = alter.name.name;
        self.catalog.commit_table(&table, schema, rows);

        Ok(Output::change(
            0,
            format!("Column '{}' added to table '{}'", column_name, table),
        ))
    }

    fn execute_drop_table(&mut self, drop: DropTable) -> Result<Output> {
        self.writable_table(&drop.name)?;
        self.catalog.drop_table(&drop.name.name)?;
        Ok(Output::change(
            0,
            format!("Table '{}' dropped", drop.name.name),
        ))
    }

    // ========== DML ==========

    fn execute_insert(&mut self, insert: Insert) -> Result<Output> {
        self.writable_table(&insert.table)?;

        let (mut schema, mut rows) = self
            .catalog
            .table_state(&insert.table.name)
            .ok_or_else(Error::internal)?;

        // Every supplied column must exist.
        let mut supplied = Vec::with_capacity(insert.columns.len());
        for column in &insert.columns {
            let index = schema
                .index_of(&column.name)
                .ok_or_else(|| Error::UnknownColumn {
                    name: column.name.clone(),
                    offset: Some(column.offset),
                })?;
            supplied.push(index);
        }

        let inserted = insert.rows.len();
        for literals in insert.rows {
            if literals.len() != supplied.len() {
                return Err(Error::constraint(ConstraintKind::ColumnCountMismatch {
                    columns: supplied.len(),
                    values: literals.len(),
                }));
            }

            let mut values = vec![Value::Null; schema.column_count()];
            for (&index, literal) in supplied.iter().zip(literals) {
                let column = &schema.columns()[index];
                let value = literal.to_value();
                check_assignable(column, &value)?;
                if column.auto_increment {
                    if let Value::Number(n) = value {
                        let name = column.name.clone();
                        schema.observe_auto_increment(&name, n);
                    }
                }
                values[index] = value;
            }

            // Unsupplied columns: AUTO_INCREMENT fills from its counter,
            // everything else stays NULL and must then pass NOT NULL.
            for index in 0..schema.column_count() {
                if supplied.contains(&index) {
                    continue;
                }
                let column = &schema.columns()[index];
                if column.auto_increment {
                    let name = column.name.clone();
                    values[index] = Value::Number(schema.next_auto_increment(&name));
                } else if column.not_null {
                    return Err(Error::constraint(ConstraintKind::NotNullViolation(
                        column.name.clone(),
                    )));
                }
            }

            if let Some(pk_index) = schema.primary_key_index() {
                let value = &values[pk_index];
                if !value.is_null() && rows.iter().any(|row| row.get(pk_index) == Some(value)) {
                    return Err(Error::constraint(ConstraintKind::PrimaryKeyDuplicate(
                        schema.columns()[pk_index].name.clone(),
                    )));
                }
            }

            rows.push(Row::new(values));
        }

        self.catalog.commit_table(&insert.table.name, schema, rows);

        Ok(Output::change(
            inserted,
            format!("{} row(s) inserted", inserted),
        ))
    }

    fn execute_update(&mut self, update: Update) -> Result<Output> {
        self.writable_table(&update.table)?;

        let (mut schema, mut rows) = self
            .catalog
            .table_state(&update.table.name)
            .ok_or_else(Error::internal)?;

        // Validate assignments up front: column exists, value type fits.
        let mut planned: Vec<(usize, Value)> = Vec::with_capacity(update.assignments.len());
        for Assignment { column, value } in &update.assignments {
            let index = schema
                .index_of(&column.name)
                .ok_or_else(|| Error::UnknownColumn {
                    name: column.name.clone(),
                    offset: Some(column.offset),
                })?;
            let value = value.to_value();
            check_assignable(&schema.columns()[index], &value)?;
            planned.push((index, value));
        }

        // Filter first, mutate after: the predicate sees the pre-update rows.
        let matching = self.matching_rows(&update.table, &schema, &rows, &update.where_clause)?;

        let pk_index = schema.primary_key_index();
        for &at in &matching {
            for (index, value) in &planned {
                // An update that lands a duplicate primary key on any other
                // row fails the whole statement.
                if Some(*index) == pk_index && !value.is_null() {
                    let clash = rows
                        .iter()
                        .enumerate()
                        .any(|(other, row)| other != at && row.get(*index) == Some(value));
                    if clash {
                        return Err(Error::constraint(ConstraintKind::PrimaryKeyDuplicate(
                            schema.columns()[*index].name.clone(),
                        )));
                    }
                }
                let column = &schema.columns()[*index];
                if column.auto_increment {
                    if let Value::Number(n) = value {
                        let name = column.name.clone();
                        schema.observe_auto_increment(&name, *n);
                    }
                }
                rows[at].set(*index, value.clone());
            }
        }

        let updated = matching.len();
        self.catalog.commit_table(&update.table.name, schema, rows);

        Ok(Output::change(updated, format!("{} row(s) updated", updated)))
    }

    fn execute_delete(&mut self, delete: Delete) -> Result<Output> {
        self.writable_table(&delete.table)?;

        let (schema, rows) = self
            .catalog
            .table_state(&delete.table.name)
            .ok_or_else(Error::internal)?;

        let matching = self.matching_rows(&delete.table, &schema, &rows, &delete.where_clause)?;
        let deleted = matching.len();

        let keep: Vec<Row> = rows
            .into_iter()
            .enumerate()
            .filter(|(index, _)| !matching.contains(index))
            .map(|(_, row)| row)
            .collect();

        self.catalog.commit_table(&delete.table.name, schema, keep);

        Ok(Output::change(deleted, format!("{} row(s) deleted", deleted)))
    }

    // ========== Helpers ==========

    /// Indices of the rows a WHERE clause selects; all of them when there
    /// is no WHERE clause. Same comparison semantics as SELECT.
    fn matching_rows(
        &self,
        table: &Ident,
        schema: &TableSchema,
        rows: &[Row],
        where_clause: &Option<Predicate>,
    ) -> Result<Vec<usize>> {
        let Some(predicate) = where_clause else {
            return Ok((0..rows.len()).collect());
        };

        let scope = Scope::single(&table.name, schema);
        let mut matching = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            let scoped = vec![row];
            if scope.eval_predicate(predicate, &scoped)? {
                matching.push(index);
            }
        }
        Ok(matching)
    }

    /// Reject mutations of unknown or protected tables
    fn writable_table(&self, table: &Ident) -> Result<()> {
        let schema = self
            .catalog
            .schema_of(&table.name)
            .ok_or_else(|| Error::UnknownTable {
                name: table.name.clone(),
                offset: Some(table.offset),
            })?;

        if schema.is_protected() {
            return Err(Error::Constraint {
                kind: ConstraintKind::ProtectedTable(table.name.clone()),
                offset: Some(table.offset),
            });
        }

        Ok(())
    }
}

/// NULL is assignable only to nullable columns; any other value must match
/// the column's declared type exactly.
fn check_assignable(column: &crate::catalog::ColumnDef, value: &Value) -> Result<()> {
    if value.is_null() {
        if column.not_null {
            return Err(Error::constraint(ConstraintKind::NotNullViolation(
                column.name.clone(),
            )));
        }
        return Ok(());
    }

    if !column.data_type.matches(value) {
        return Err(Error::constraint(ConstraintKind::TypeMismatch {
            column: column.name.clone(),
            expected: column.data_type.to_string(),
            found: value.type_name().to_string(),
        }));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::{Lexer, Parser};

    fn run(sql: &str, catalog: &mut Catalog) -> Result<Output> {
        let tokens = Lexer::new(sql).tokenize()?;
        let mut statement = Parser::new(tokens).parse()?;
        if let Statement::Query(query) = &mut statement {
            crate::sql::validate(query, catalog)?;
        }
        Executor::new(catalog).execute(statement)
    }

    #[test]
    fn test_create_insert_select_round_trip() {
        let mut catalog = Catalog::new();

        let out = run("CREATE TABLE notes (id INT PRIMARY KEY, body TEXT)", &mut catalog).unwrap();
        assert!(out.meta.modified);
        assert_eq!(out.columns, vec!["Result"]);

        let out = run(
            "INSERT INTO notes (id, body) VALUES (1, 'first'), (2, 'second')",
            &mut catalog,
        )
        .unwrap();
        assert_eq!(out.meta.row_count, 2);

        let out = run("SELECT * FROM notes", &mut catalog).unwrap();
        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.rows[0][1], Value::String("first".to_string()));
    }

    #[test]
    fn test_protected_tables_reject_all_mutations() {
        let mut catalog = Catalog::seeded();
        let before = catalog.clone();

        for sql in [
            "INSERT INTO students (student_id) VALUES (99)",
            "UPDATE students SET surname = 'X'",
            "DELETE FROM students",
            "DROP TABLE students",
            "ALTER TABLE students ADD nickname TEXT",
            "DELETE FROM grades",
            "DROP TABLE tutor_groups",
        ] {
            let err = run(sql, &mut catalog).unwrap_err();
            assert!(
                matches!(
                    err,
                    Error::Constraint {
                        kind: ConstraintKind::ProtectedTable(_),
                        ..
                    }
                ),
                "{sql} should hit the protected-table check, got {err:?}"
            );
            assert_eq!(catalog, before, "{sql} must leave the catalog unchanged");
        }
    }

    #[test]
    fn test_insert_not_null_violation_is_atomic() {
        let mut catalog = Catalog::new();
        run(
            "CREATE TABLE people (id INT PRIMARY KEY, name TEXT NOT NULL)",
            &mut catalog,
        )
        .unwrap();

        let err = run(
            "INSERT INTO people (id, name) VALUES (1, NULL)",
            &mut catalog,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Constraint {
                kind: ConstraintKind::NotNullViolation(ref col),
                ..
            } if col == "name"
        ));
        assert!(catalog.rows_of("people").unwrap().is_empty());
    }

    #[test]
    fn test_multi_row_insert_is_all_or_nothing() {
        let mut catalog = Catalog::new();
        run("CREATE TABLE t (id INT PRIMARY KEY)", &mut catalog).unwrap();

        // Second tuple duplicates the first: nothing lands.
        let err = run("INSERT INTO t (id) VALUES (1), (1)", &mut catalog).unwrap_err();
        assert!(matches!(
            err,
            Error::Constraint {
                kind: ConstraintKind::PrimaryKeyDuplicate(_),
                ..
            }
        ));
        assert!(catalog.rows_of("t").unwrap().is_empty());
    }

    #[test]
    fn test_auto_increment_fills_and_tracks() {
        let mut catalog = Catalog::new();
        run(
            "CREATE TABLE statuses (id INT AUTO_INCREMENT PRIMARY KEY, active BOOLEAN NOT NULL)",
            &mut catalog,
        )
        .unwrap();

        run("INSERT INTO statuses (active) VALUES (TRUE)", &mut catalog).unwrap();
        run("INSERT INTO statuses (active) VALUES (FALSE)", &mut catalog).unwrap();

        let rows = catalog.rows_of("statuses").unwrap();
        assert_eq!(rows[0].get(0), Some(&Value::Number(1.0)));
        assert_eq!(rows[1].get(0), Some(&Value::Number(2.0)));

        // An explicit id pushes the counter past it
        run(
            "INSERT INTO statuses (id, active) VALUES (10, TRUE)",
            &mut catalog,
        )
        .unwrap();
        run("INSERT INTO statuses (active) VALUES (TRUE)", &mut catalog).unwrap();
        let rows = catalog.rows_of("statuses").unwrap();
        assert_eq!(rows[3].get(0), Some(&Value::Number(11.0)));
    }

    #[test]
    fn test_auto_increment_rolls_back_with_failed_statement() {
        let mut catalog = Catalog::new();
        run(
            "CREATE TABLE t (id INT AUTO_INCREMENT PRIMARY KEY, n INT NOT NULL)",
            &mut catalog,
        )
        .unwrap();
        run("INSERT INTO t (n) VALUES (1)", &mut catalog).unwrap();

        // The statement advances the counter on its staged schema, then
        // fails on NOT NULL; the live counter must be untouched.
        let before = catalog.schema_of("t").unwrap().auto_increment_counter("id");
        assert!(run("INSERT INTO t (n) VALUES (NULL)", &mut catalog).is_err());
        let after = catalog.schema_of("t").unwrap().auto_increment_counter("id");
        assert_eq!(before, after);

        run("INSERT INTO t (n) VALUES (2)", &mut catalog).unwrap();
        let rows = catalog.rows_of("t").unwrap();
        assert_eq!(rows[1].get(0), Some(&Value::Number(2.0)));
    }

    #[test]
    fn test_type_mismatch() {
        let mut catalog = Catalog::new();
        run("CREATE TABLE t (n INT, s TEXT)", &mut catalog).unwrap();

        let err = run("INSERT INTO t (n, s) VALUES ('five', 'ok')", &mut catalog).unwrap_err();
        assert!(matches!(
            err,
            Error::Constraint {
                kind: ConstraintKind::TypeMismatch { .. },
                ..
            }
        ));

        let err = run("INSERT INTO t (n, s) VALUES (5, 6)", &mut catalog).unwrap_err();
        assert!(matches!(
            err,
            Error::Constraint {
                kind: ConstraintKind::TypeMismatch { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_column_count_mismatch() {
        let mut catalog = Catalog::new();
        run("CREATE TABLE t (a INT, b INT)", &mut catalog).unwrap();

        let err = run("INSERT INTO t (a, b) VALUES (1)", &mut catalog).unwrap_err();
        assert!(matches!(
            err,
            Error::Constraint {
                kind: ConstraintKind::ColumnCountMismatch {
                    columns: 2,
                    values: 1
                },
                ..
            }
        ));
    }

    #[test]
    fn test_update_with_where() {
        let mut catalog = Catalog::new();
        run("CREATE TABLE t (id INT PRIMARY KEY, n INT)", &mut catalog).unwrap();
        run(
            "INSERT INTO t (id, n) VALUES (1, 10), (2, 20), (3, 30)",
            &mut catalog,
        )
        .unwrap();

        let out = run("UPDATE t SET n = 0 WHERE n > 15", &mut catalog).unwrap();
        assert_eq!(out.meta.row_count, 2);

        let rows = catalog.rows_of("t").unwrap();
        assert_eq!(rows[0].get(1), Some(&Value::Number(10.0)));
        assert_eq!(rows[1].get(1), Some(&Value::Number(0.0)));
        assert_eq!(rows[2].get(1), Some(&Value::Number(0.0)));
    }

    #[test]
    fn test_update_primary_key_duplicate() {
        let mut catalog = Catalog::new();
        run("CREATE TABLE t (id INT PRIMARY KEY)", &mut catalog).unwrap();
        run("INSERT INTO t (id) VALUES (1), (2)", &mut catalog).unwrap();

        let before = catalog.clone();
        let err = run("UPDATE t SET id = 1 WHERE id = 2", &mut catalog).unwrap_err();
        assert!(matches!(
            err,
            Error::Constraint {
                kind: ConstraintKind::PrimaryKeyDuplicate(_),
                ..
            }
        ));
        assert_eq!(catalog, before);

        // Updating a row's key to itself is fine
        assert!(run("UPDATE t SET id = 2 WHERE id = 2", &mut catalog).is_ok());
    }

    #[test]
    fn test_delete_with_and_without_where() {
        let mut catalog = Catalog::new();
        run("CREATE TABLE t (id INT)", &mut catalog).unwrap();
        run("INSERT INTO t (id) VALUES (1), (2), (3)", &mut catalog).unwrap();

        let out = run("DELETE FROM t WHERE id = 2", &mut catalog).unwrap();
        assert_eq!(out.meta.row_count, 1);
        assert_eq!(catalog.rows_of("t").unwrap().len(), 2);

        let out = run("DELETE FROM t", &mut catalog).unwrap();
        assert_eq!(out.meta.row_count, 2);
        assert!(catalog.rows_of("t").unwrap().is_empty());
    }

    #[test]
    fn test_alter_table_add_column() {
        let mut catalog = Catalog::new();
        run("CREATE TABLE t (id INT)", &mut catalog).unwrap();
        run("INSERT INTO t (id) VALUES (1), (2)", &mut catalog).unwrap();

        run("ALTER TABLE t ADD COLUMN label TEXT", &mut catalog).unwrap();
        let rows = catalog.rows_of("t").unwrap();
        assert_eq!(rows[0].len(), 2);
        assert_eq!(rows[0].get(1), Some(&Value::Null));

        // NOT NULL cannot back-fill a non-empty table
        let err = run("ALTER TABLE t ADD flag BOOLEAN NOT NULL", &mut catalog).unwrap_err();
        assert!(matches!(
            err,
            Error::Constraint {
                kind: ConstraintKind::NotNullViolation(_),
                ..
            }
        ));

        // AUTO_INCREMENT back-fills from its counter
        run("ALTER TABLE t ADD seq INT AUTO_INCREMENT", &mut catalog).unwrap();
        let rows = catalog.rows_of("t").unwrap();
        assert_eq!(rows[0].get(2), Some(&Value::Number(1.0)));
        assert_eq!(rows[1].get(2), Some(&Value::Number(2.0)));

        // Duplicate column
        let err = run("ALTER TABLE t ADD label TEXT", &mut catalog).unwrap_err();
        assert!(matches!(
            err,
            Error::Constraint {
                kind: ConstraintKind::DuplicateColumn(_),
                ..
            }
        ));
    }

    #[test]
    fn test_drop_table_restores_pre_create_state() {
        let mut catalog = Catalog::seeded();
        let before = catalog.clone();

        run("CREATE TABLE scratch (id INT)", &mut catalog).unwrap();
        run("INSERT INTO scratch (id) VALUES (1)", &mut catalog).unwrap();
        run("DROP TABLE scratch", &mut catalog).unwrap();

        assert_eq!(catalog, before);
    }

    #[test]
    fn test_unknown_tables_and_columns() {
        let mut catalog = Catalog::new();
        assert!(matches!(
            run("DELETE FROM missing", &mut catalog),
            Err(Error::UnknownTable { .. })
        ));

        run("CREATE TABLE t (id INT)", &mut catalog).unwrap();
        assert!(matches!(
            run("INSERT INTO t (nope) VALUES (1)", &mut catalog),
            Err(Error::UnknownColumn { .. })
        ));
        assert!(matches!(
            run("UPDATE t SET nope = 1", &mut catalog),
            Err(Error::UnknownColumn { .. })
        ));
    }

    #[test]
    fn test_duplicate_table_and_columns_in_create() {
        let mut catalog = Catalog::seeded();
        let err = run("CREATE TABLE students (id INT)", &mut catalog).unwrap_err();
        assert!(matches!(
            err,
            Error::Constraint {
                kind: ConstraintKind::DuplicateTable(_),
                ..
            }
        ));

        let err = run("CREATE TABLE t (a INT, a TEXT)", &mut catalog).unwrap_err();
        assert!(matches!(
            err,
            Error::Constraint {
                kind: ConstraintKind::DuplicateColumn(_),
                ..
            }
        ));
    }
}
