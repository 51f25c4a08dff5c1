//! SQL Abstract Syntax Tree (AST)
//!
//! This module defines the AST produced by the parser: a closed sum type of
//! the seven statement kinds, built from small sum types for column
//! references, literals and operands.

use crate::catalog::{ColumnDef, Value};
use std::fmt;

/// A SQL statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// SELECT query
    Query(Query),
    /// CREATE TABLE statement
    CreateTable(CreateTable),
    /// ALTER TABLE ... ADD COLUMN statement
    AlterTable(AlterTable),
    /// DROP TABLE statement
    DropTable(DropTable),
    /// INSERT statement
    Insert(Insert),
    /// UPDATE statement
    Update(Update),
    /// DELETE statement
    Delete(Delete),
}

/// An identifier together with its byte offset in the statement text
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub offset: usize,
}

/// SELECT query
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// DISTINCT flag
    pub distinct: bool,
    /// Select list
    pub select: SelectList,
    /// FROM table
    pub from: Ident,
    /// Optional INNER JOIN
    pub join: Option<Join>,
    /// WHERE clause
    pub where_clause: Option<Predicate>,
    /// GROUP BY columns
    pub group_by: Vec<ColumnRef>,
    /// ORDER BY clause
    pub order_by: Option<OrderBy>,
    /// LIMIT row count
    pub limit: Option<usize>,
}

/// The select list: `*` or explicit items
#[derive(Debug, Clone, PartialEq)]
pub enum SelectList {
    /// All columns of all in-scope tables
    Star,
    /// Explicit items
    Items(Vec<SelectItem>),
}

/// A single item in the select list
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: SelectExpr,
    pub alias: Option<String>,
}

/// What a select item projects
#[derive(Debug, Clone, PartialEq)]
pub enum SelectExpr {
    /// Column reference
    Column(ColumnRef),
    /// Aggregate function call
    Aggregate(Aggregate),
}

/// Aggregate function call
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub func: AggregateFunc,
    pub arg: AggregateArg,
}

/// Aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

/// Argument of an aggregate: `*` is valid only inside COUNT
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateArg {
    Star,
    Column(ColumnRef),
}

/// Column reference, optionally qualified with a table name
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    /// Qualifying table, if written
    pub table: Option<String>,
    /// Column name
    pub column: String,
    /// Byte offset of the reference in the statement text
    pub offset: usize,
    /// Table this reference resolves to; attached by the validator
    pub resolved: Option<String>,
}

impl ColumnRef {
    /// The reference in its written form: `table.column` when qualified,
    /// bare `column` otherwise. Used for output column naming.
    pub fn written(&self) -> String {
        match &self.table {
            Some(table) => format!("{}.{}", table, self.column),
            None => self.column.clone(),
        }
    }

    /// The table this reference names: the explicit qualifier if written,
    /// otherwise the table attached by the validator.
    pub fn table_name(&self) -> Option<&str> {
        self.table.as_deref().or(self.resolved.as_deref())
    }
}

/// INNER JOIN clause: `JOIN table ON left = right`
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub table: Ident,
    pub left: ColumnRef,
    pub right: ColumnRef,
}

/// ORDER BY clause
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: ColumnRef,
    pub descending: bool,
}

/// WHERE/ON predicate: comparisons joined by AND
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub comparisons: Vec<Comparison>,
}

/// A single comparison
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub left: Operand,
    pub op: CompareOp,
    pub right: Operand,
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
}

/// One side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Column(ColumnRef),
    Literal(Literal),
}

/// Literal value as written in the statement
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Number(f64),
    String(String),
    Boolean(bool),
}

impl Literal {
    /// Convert to a runtime value
    pub fn to_value(&self) -> Value {
        match self {
            Literal::Null => Value::Null,
            Literal::Number(n) => Value::Number(*n),
            Literal::String(s) => Value::String(s.clone()),
            Literal::Boolean(b) => Value::Boolean(*b),
        }
    }
}

/// CREATE TABLE statement
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    /// Table name
    pub name: Ident,
    /// Column definitions, types already normalised
    pub columns: Vec<ColumnDef>,
    /// Primary key column, if one was declared
    pub primary_key: Option<String>,
}

/// ALTER TABLE ... ADD COLUMN statement
#[derive(Debug, Clone, PartialEq)]
pub struct AlterTable {
    pub name: Ident,
    pub add_column: ColumnDef,
}

/// DROP TABLE statement
#[derive(Debug, Clone, PartialEq)]
pub struct DropTable {
    pub name: Ident,
}

/// INSERT statement
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    /// Target table
    pub table: Ident,
    /// Supplied column names
    pub columns: Vec<Ident>,
    /// Value tuples, one per inserted row
    pub rows: Vec<Vec<Literal>>,
}

/// UPDATE statement
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: Ident,
    pub assignments: Vec<Assignment>,
    pub where_clause: Option<Predicate>,
}

/// Column assignment (for UPDATE)
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: Ident,
    pub value: Literal,
}

/// DELETE statement
#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: Ident,
    pub where_clause: Option<Predicate>,
}

impl fmt::Display for AggregateFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateFunc::Count => write!(f, "COUNT"),
            AggregateFunc::Sum => write!(f, "SUM"),
            AggregateFunc::Avg => write!(f, "AVG"),
            AggregateFunc::Min => write!(f, "MIN"),
            AggregateFunc::Max => write!(f, "MAX"),
        }
    }
}

impl fmt::Display for Aggregate {
    /// Canonical form, used as the output column name when no alias is
    /// given: `COUNT(*)`, `AVG(score)`, `MIN(grades.score)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.arg {
            AggregateArg::Star => write!(f, "{}(*)", self.func),
            AggregateArg::Column(col) => write!(f, "{}({})", self.func, col.written()),
        }
    }
}
