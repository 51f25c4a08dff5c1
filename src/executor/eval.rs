//! Predicate evaluation
//!
//! Scoped rows, column lookup and the comparison semantics shared by
//! WHERE, JOIN ON and UPDATE/DELETE filtering. The NULL rule lives here:
//! NULL on either side of any comparison makes the comparison false.

use crate::catalog::{Row, TableSchema, Value};
use crate::error::{Error, Result};
use crate::sql::ast::{ColumnRef, CompareOp, Operand, Predicate};
use regex::Regex;
use std::cmp::Ordering;

/// One row per in-scope table, in scope order (FROM first, then JOIN)
pub type ScopedRow<'a> = Vec<&'a Row>;

/// The tables a statement reads, in scope order
pub struct Scope<'a> {
    tables: Vec<(String, &'a TableSchema)>,
}

impl<'a> Scope<'a> {
    pub fn new(tables: Vec<(String, &'a TableSchema)>) -> Self {
        Self { tables }
    }

    /// Scope of a single-table statement (UPDATE/DELETE)
    pub fn single(name: &str, schema: &'a TableSchema) -> Self {
        Self {
            tables: vec![(name.to_string(), schema)],
        }
    }

    /// Tables in scope order
    pub fn tables(&self) -> &[(String, &'a TableSchema)] {
        &self.tables
    }

    /// Whether more than one table is in scope
    pub fn is_multi_table(&self) -> bool {
        self.tables.len() > 1
    }

    /// Locate a column reference: (table index, column index).
    ///
    /// Validated references carry their resolved table. Unvalidated ones
    /// (predicates in UPDATE/DELETE) resolve here against the scope with
    /// the same rules the validator applies.
    pub fn lookup(&self, col: &ColumnRef) -> Result<(usize, usize)> {
        if let Some(table) = col.table_name() {
            let table_index = self
                .tables
                .iter()
                .position(|(name, _)| name == table)
                .ok_or_else(|| Error::UnknownTable {
                    name: table.to_string(),
                    offset: Some(col.offset),
                })?;
            let column_index = self.tables[table_index]
                .1
                .index_of(&col.column)
                .ok_or_else(|| Error::UnknownColumn {
                    name: col.column.clone(),
                    offset: Some(col.offset),
                })?;
            return Ok((table_index, column_index));
        }

        let mut matches = self.tables.iter().enumerate().filter_map(|(ti, (_, schema))| {
            schema.index_of(&col.column).map(|ci| (ti, ci))
        });

        match (matches.next(), matches.next()) {
            (None, _) => Err(Error::UnknownColumn {
                name: col.column.clone(),
                offset: Some(col.offset),
            }),
            (Some(found), None) => Ok(found),
            (Some(_), Some(_)) => Err(Error::AmbiguousColumn {
                name: col.column.clone(),
                tables: self
                    .tables
                    .iter()
                    .filter(|(_, schema)| schema.has_column(&col.column))
                    .map(|(name, _)| name.clone())
                    .collect(),
                offset: Some(col.offset),
            }),
        }
    }

    /// The value a column reference has in a scoped row
    pub fn value(&self, row: &ScopedRow<'_>, col: &ColumnRef) -> Result<Value> {
        let (table_index, column_index) = self.lookup(col)?;
        let value = row
            .get(table_index)
            .and_then(|r| r.get(column_index))
            .ok_or_else(Error::internal)?;
        Ok(value.clone())
    }

    fn operand_value(&self, row: &ScopedRow<'_>, operand: &Operand) -> Result<Value> {
        match operand {
            Operand::Column(col) => self.value(row, col),
            Operand::Literal(lit) => Ok(lit.to_value()),
        }
    }

    /// Evaluate an AND-of-comparisons predicate against a scoped row
    pub fn eval_predicate(&self, predicate: &Predicate, row: &ScopedRow<'_>) -> Result<bool> {
        for comparison in &predicate.comparisons {
            let left = self.operand_value(row, &comparison.left)?;
            let right = self.operand_value(row, &comparison.right)?;
            if !compare(&left, comparison.op, &right)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Evaluate one comparison.
///
/// NULL on either side is false, whatever the operator. When both sides
/// read as finite numbers the comparison is numeric, otherwise both sides
/// compare as strings.
pub fn compare(left: &Value, op: CompareOp, right: &Value) -> Result<bool> {
    if left.is_null() || right.is_null() {
        return Ok(false);
    }

    if op == CompareOp::Like {
        return like_matches(&left.to_string(), &right.to_string());
    }

    let ordering = match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        _ => left.to_string().cmp(&right.to_string()),
    };

    Ok(match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Neq => ordering != Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Lte => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Gte => ordering != Ordering::Less,
        CompareOp::Like => false, // handled above
    })
}

/// LIKE matching: `%` matches any sequence of characters (including the
/// empty one), everything else is literal. Case-insensitive and anchored
/// to the whole string.
fn like_matches(value: &str, pattern: &str) -> Result<bool> {
    let mut source = String::with_capacity(pattern.len() * 2);
    for ch in pattern.chars() {
        if ch == '%' {
            source.push_str(".*");
        } else {
            source.push_str(&regex::escape(&ch.to_string()));
        }
    }

    let re = Regex::new(&format!("(?is)^{}$", source)).map_err(|_| Error::internal())?;
    Ok(re.is_match(value))
}

/// Ordering used by ORDER BY: NULL sorts first, numbers compare
/// numerically, everything else compares as strings.
pub fn order_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
        _ => left.to_string().cmp(&right.to_string()),
    }
}
