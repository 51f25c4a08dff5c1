//! Semantic validation for SELECT queries
//!
//! After a query passes validation it executes with no name-resolution
//! errors: every table exists, every column reference carries the table it
//! resolves to, and the select list obeys the GROUP BY discipline. DDL/DML
//! statements skip this pass; the executor checks them against the catalog
//! directly.

use super::ast::{Aggregate, AggregateArg, ColumnRef, Ident, Operand, Query, SelectExpr, SelectList};
use crate::catalog::Catalog;
use crate::error::{Error, Result};

/// Validate a query against the catalog and attach resolved table names to
/// every column reference. Returns the first failing check.
pub fn validate(query: &mut Query, catalog: &Catalog) -> Result<()> {
    let scope = build_scope(query, catalog)?;

    match &mut query.select {
        SelectList::Star => {
            if !query.group_by.is_empty() {
                return Err(Error::syntax(
                    "SELECT * cannot be combined with GROUP BY; list the grouped columns instead",
                    query.group_by[0].offset,
                ));
            }
        }
        SelectList::Items(items) => {
            for item in items {
                match &mut item.expr {
                    SelectExpr::Column(col) => resolve(col, &scope, catalog)?,
                    SelectExpr::Aggregate(Aggregate {
                        arg: AggregateArg::Column(col),
                        ..
                    }) => resolve(col, &scope, catalog)?,
                    SelectExpr::Aggregate(_) => {}
                }
            }
        }
    }

    if let Some(join) = &mut query.join {
        resolve(&mut join.left, &scope, catalog)?;
        resolve(&mut join.right, &scope, catalog)?;
    }

    if let Some(predicate) = &mut query.where_clause {
        for comparison in &mut predicate.comparisons {
            for operand in [&mut comparison.left, &mut comparison.right] {
                if let Operand::Column(col) = operand {
                    resolve(col, &scope, catalog)?;
                }
            }
        }
    }

    for col in &mut query.group_by {
        resolve(col, &scope, catalog)?;
    }

    if let Some(order_by) = &mut query.order_by {
        // An unqualified ORDER BY name may refer to a select-list alias
        // rather than a real column; those sort by the projected value and
        // stay unresolved here.
        let names_alias = match (&query.select, &order_by.column.table) {
            (SelectList::Items(items), None) => items
                .iter()
                .any(|item| item.alias.as_deref() == Some(order_by.column.column.as_str())),
            _ => false,
        };
        if !names_alias {
            resolve(&mut order_by.column, &scope, catalog)?;
        }
    }

    check_grouping(query)
}

/// The ordered list of tables a query reads: FROM first, then JOIN.
fn build_scope(query: &Query, catalog: &Catalog) -> Result<Vec<String>> {
    let mut scope = Vec::new();

    ensure_table(&query.from, catalog)?;
    scope.push(query.from.name.clone());

    if let Some(join) = &query.join {
        ensure_table(&join.table, catalog)?;
        scope.push(join.table.name.clone());
    }

    Ok(scope)
}

fn ensure_table(table: &Ident, catalog: &Catalog) -> Result<()> {
    if catalog.has_table(&table.name) {
        Ok(())
    } else {
        Err(Error::UnknownTable {
            name: table.name.clone(),
            offset: Some(table.offset),
        })
    }
}

/// Resolve one column reference against the scope.
///
/// Qualified references must name a table in scope that has the column.
/// Unqualified references must match exactly one table in scope.
fn resolve(col: &mut ColumnRef, scope: &[String], catalog: &Catalog) -> Result<()> {
    match &col.table {
        Some(table) => {
            if !scope.iter().any(|t| t == table) {
                return Err(Error::UnknownTable {
                    name: table.clone(),
                    offset: Some(col.offset),
                });
            }
            if !catalog.has_column(table, &col.column) {
                return Err(Error::UnknownColumn {
                    name: col.column.clone(),
                    offset: Some(col.offset),
                });
            }
            col.resolved = Some(table.clone());
        }
        None => {
            let matches: Vec<&String> = scope
                .iter()
                .filter(|table| catalog.has_column(table, &col.column))
                .collect();

            match matches.as_slice() {
                [] => {
                    return Err(Error::UnknownColumn {
                        name: col.column.clone(),
                        offset: Some(col.offset),
                    });
                }
                [table] => col.resolved = Some((*table).clone()),
                _ => {
                    return Err(Error::AmbiguousColumn {
                        name: col.column.clone(),
                        tables: matches.into_iter().cloned().collect(),
                        offset: Some(col.offset),
                    });
                }
            }
        }
    }

    Ok(())
}

/// Enforce the aggregate/GROUP BY discipline: every bare column in the
/// select list must appear in GROUP BY, and bare columns cannot mix with
/// aggregates when there is no GROUP BY at all.
fn check_grouping(query: &Query) -> Result<()> {
    let SelectList::Items(items) = &query.select else {
        return Ok(());
    };

    let bare: Vec<&ColumnRef> = items
        .iter()
        .filter_map(|item| match &item.expr {
            SelectExpr::Column(col) => Some(col),
            SelectExpr::Aggregate(_) => None,
        })
        .collect();
    let has_aggregate = items
        .iter()
        .any(|item| matches!(item.expr, SelectExpr::Aggregate(_)));

    if query.group_by.is_empty() {
        if has_aggregate && !bare.is_empty() {
            return Err(Error::syntax(
                format!(
                    "column '{}' cannot be selected alongside aggregates without GROUP BY",
                    bare[0].written()
                ),
                bare[0].offset,
            ));
        }
        return Ok(());
    }

    for col in bare {
        let grouped = query.group_by.iter().any(|g| {
            g.column == col.column && g.resolved == col.resolved
        });
        if !grouped {
            return Err(Error::syntax(
                format!("column '{}' must appear in GROUP BY", col.written()),
                col.offset,
            ));
        }
    }

    Ok(())
}
