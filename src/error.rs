//! Error types for tutordb
//!
//! Every failure the engine can produce is one of these tagged kinds. Each
//! carries a human-readable message and, when known, the byte offset into
//! the original statement text where the problem was detected.

use thiserror::Error;

/// The main error type for tutordb
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed statement text (also wraps internal invariant breaches)
    #[error("Syntax error: {message}")]
    Syntax {
        message: String,
        offset: Option<usize>,
    },

    /// Referenced table does not exist in the catalog
    #[error("Unknown table '{name}' (check the table list for available tables)")]
    UnknownTable { name: String, offset: Option<usize> },

    /// Referenced column does not exist in any table in scope
    #[error("Unknown column '{name}'")]
    UnknownColumn { name: String, offset: Option<usize> },

    /// Unqualified column matches more than one table in scope
    #[error("Ambiguous column '{name}' (found in tables {tables:?}; qualify it as table.column)")]
    AmbiguousColumn {
        name: String,
        tables: Vec<String>,
        offset: Option<usize>,
    },

    /// Recognised SQL that this engine deliberately does not implement
    #[error("{feature} is not supported by this engine")]
    Unsupported {
        feature: String,
        offset: Option<usize>,
    },

    /// A literal that cannot be interpreted where it appears
    #[error("Invalid literal: {message}")]
    InvalidLiteral {
        message: String,
        offset: Option<usize>,
    },

    /// A DDL/DML statement violated a catalog constraint
    #[error("Constraint violation: {kind}")]
    Constraint {
        kind: ConstraintKind,
        offset: Option<usize>,
    },
}

/// Sub-reasons for [`Error::Constraint`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstraintKind {
    #[error("column '{0}' cannot be NULL (provide a value or drop the NOT NULL constraint)")]
    NotNullViolation(String),

    #[error("duplicate value for primary key column '{0}'")]
    PrimaryKeyDuplicate(String),

    #[error("type mismatch for column '{column}': expected {expected}, got {found}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },

    #[error("table '{0}' is protected and cannot be modified (create your own table to experiment)")]
    ProtectedTable(String),

    #[error("table '{0}' already exists")]
    DuplicateTable(String),

    #[error("column '{0}' already exists")]
    DuplicateColumn(String),

    #[error("{columns} column(s) supplied but {values} value(s) given")]
    ColumnCountMismatch { columns: usize, values: usize },
}

impl Error {
    /// Build a syntax error at a known byte offset
    pub fn syntax(message: impl Into<String>, offset: usize) -> Self {
        Error::Syntax {
            message: message.into(),
            offset: Some(offset),
        }
    }

    /// Wrap an internal invariant breach. The engine never lets a panic
    /// cross its boundary; anything unexplainable becomes this error.
    pub fn internal() -> Self {
        Error::Syntax {
            message: "internal".to_string(),
            offset: Some(0),
        }
    }

    /// Build a constraint violation without a position
    pub fn constraint(kind: ConstraintKind) -> Self {
        Error::Constraint { kind, offset: None }
    }

    /// The byte offset into the statement text, when known
    pub fn offset(&self) -> Option<usize> {
        match self {
            Error::Syntax { offset, .. }
            | Error::UnknownTable { offset, .. }
            | Error::UnknownColumn { offset, .. }
            | Error::AmbiguousColumn { offset, .. }
            | Error::Unsupported { offset, .. }
            | Error::InvalidLiteral { offset, .. }
            | Error::Constraint { offset, .. } => *offset,
        }
    }
}

/// Result type alias for tutordb operations
pub type Result<T> = std::result::Result<T, Error>;
