//! SELECT execution
//!
//! The query pipeline, run strictly in order: scope rows, WHERE filter,
//! aggregation, projection, DISTINCT, ORDER BY, LIMIT. Pure over the
//! catalog.

use super::eval::{self, Scope, ScopedRow};
use super::executor::Output;
use crate::catalog::{Catalog, Value};
use crate::error::{Error, Result};
use crate::sql::ast::{
    Aggregate, AggregateArg, AggregateFunc, CompareOp, Query, SelectExpr, SelectItem, SelectList,
};
use std::collections::HashMap;

/// A projected row plus the value ORDER BY falls back to when its column
/// is not part of the projection.
struct ProjectedRow {
    values: Vec<Value>,
    sort_fallback: Option<Value>,
}

/// Execute a validated query against the catalog
pub fn run(query: &Query, catalog: &Catalog) -> Result<Output> {
    let mut tables = Vec::new();
    for name in std::iter::once(&query.from)
        .chain(query.join.as_ref().map(|join| &join.table))
    {
        let schema = catalog.schema_of(&name.name).ok_or_else(|| Error::UnknownTable {
            name: name.name.clone(),
            offset: Some(name.offset),
        })?;
        tables.push((name.name.clone(), schema));
    }
    let scope = Scope::new(tables);

    // 1. Build scoped rows: FROM rows, crossed with JOIN rows that pass
    //    the ON comparison.
    let from_rows = catalog
        .rows_of(&query.from.name)
        .ok_or_else(Error::internal)?;

    let mut scoped: Vec<ScopedRow> = Vec::new();
    match &query.join {
        Some(join) => {
            let join_rows = catalog
                .rows_of(&join.table.name)
                .ok_or_else(Error::internal)?;
            for left in from_rows {
                for right in join_rows {
                    let row = vec![left, right];
                    let lhs = scope.value(&row, &join.left)?;
                    let rhs = scope.value(&row, &join.right)?;
                    if eval::compare(&lhs, CompareOp::Eq, &rhs)? {
                        scoped.push(row);
                    }
                }
            }
        }
        None => scoped.extend(from_rows.iter().map(|row| vec![row])),
    }

    // 2. WHERE filter
    if let Some(predicate) = &query.where_clause {
        let mut kept = Vec::with_capacity(scoped.len());
        for row in scoped {
            if scope.eval_predicate(predicate, &row)? {
                kept.push(row);
            }
        }
        scoped = kept;
    }

    // ORDER BY may reference a column the projection drops; resolve its
    // scope position up front so rows can carry the fallback value. When
    // the reference is unresolvable (an alias), sorting uses the projected
    // column or gives up.
    let fallback = query
        .order_by
        .as_ref()
        .and_then(|order_by| scope.lookup(&order_by.column).ok());

    // 3+4. Aggregation and projection
    let (columns, mut rows) = if needs_grouping(query) {
        project_groups(query, &scope, scoped, fallback)?
    } else {
        project_rows(query, &scope, scoped, fallback)?
    };

    // 5. DISTINCT
    if query.distinct {
        let mut seen: Vec<Vec<Value>> = Vec::new();
        rows.retain(|row| {
            if seen.contains(&row.values) {
                false
            } else {
                seen.push(row.values.clone());
                true
            }
        });
    }

    // 6. ORDER BY (stable; DESC reverses the comparator, not the rows, so
    //    ties keep their pre-sort order)
    if let Some(order_by) = &query.order_by {
        let written = order_by.column.written();
        let key_index = columns.iter().position(|name| *name == written);
        let sortable = key_index.is_some() || rows.iter().any(|row| row.sort_fallback.is_some());

        if sortable {
            rows.sort_by(|a, b| {
                let left = sort_key(a, key_index);
                let right = sort_key(b, key_index);
                let ordering = eval::order_values(left, right);
                if order_by.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }
    }

    // 7. LIMIT
    if let Some(limit) = query.limit {
        rows.truncate(limit);
    }

    Ok(Output::table(
        columns,
        rows.into_iter().map(|row| row.values).collect(),
    ))
}

fn sort_key(row: &ProjectedRow, key_index: Option<usize>) -> &Value {
    key_index
        .and_then(|index| row.values.get(index))
        .or(row.sort_fallback.as_ref())
        .unwrap_or(&Value::Null)
}

/// Whether the query goes through the aggregation path
fn needs_grouping(query: &Query) -> bool {
    if !query.group_by.is_empty() {
        return true;
    }
    match &query.select {
        SelectList::Items(items) => items
            .iter()
            .any(|item| matches!(item.expr, SelectExpr::Aggregate(_))),
        SelectList::Star => false,
    }
}

/// Output column name for a select item: the alias when given, else the
/// aggregate's canonical form or the column reference. Column references
/// render as `table.column` when qualified or when more than one table is
/// in scope, bare otherwise.
fn item_name(item: &SelectItem, scope: &Scope<'_>) -> String {
    match &item.alias {
        Some(alias) => alias.clone(),
        None => match &item.expr {
            SelectExpr::Column(col) => {
                if scope.is_multi_table() {
                    match col.table_name() {
                        Some(table) => format!("{}.{}", table, col.column),
                        None => col.written(),
                    }
                } else {
                    col.written()
                }
            }
            SelectExpr::Aggregate(agg) => agg.to_string(),
        },
    }
}

/// `*` expansion: all columns of all in-scope tables in scope order,
/// schema order within each table. Qualified names only when more than one
/// table is in scope.
fn star_columns(scope: &Scope<'_>) -> Vec<String> {
    let multi = scope.is_multi_table();
    let mut names = Vec::new();
    for (table, schema) in scope.tables() {
        for col in schema.columns() {
            if multi {
                names.push(format!("{}.{}", table, col.name));
            } else {
                names.push(col.name.clone());
            }
        }
    }
    names
}

fn fallback_value(
    row: &ScopedRow<'_>,
    fallback: Option<(usize, usize)>,
) -> Result<Option<Value>> {
    match fallback {
        Some((table_index, column_index)) => {
            let value = row
                .get(table_index)
                .and_then(|r| r.get(column_index))
                .ok_or_else(Error::internal)?;
            Ok(Some(value.clone()))
        }
        None => Ok(None),
    }
}

/// Projection without aggregation: one output row per scoped row
fn project_rows(
    query: &Query,
    scope: &Scope<'_>,
    scoped: Vec<ScopedRow<'_>>,
    fallback: Option<(usize, usize)>,
) -> Result<(Vec<String>, Vec<ProjectedRow>)> {
    let columns = match &query.select {
        SelectList::Star => star_columns(scope),
        SelectList::Items(items) => items.iter().map(|item| item_name(item, scope)).collect(),
    };

    let mut rows = Vec::with_capacity(scoped.len());
    for row in &scoped {
        let values = match &query.select {
            SelectList::Star => row
                .iter()
                .flat_map(|table_row| table_row.values().iter().cloned())
                .collect(),
            SelectList::Items(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    match &item.expr {
                        SelectExpr::Column(col) => values.push(scope.value(row, col)?),
                        // Aggregates never reach the plain path
                        SelectExpr::Aggregate(_) => return Err(Error::internal()),
                    }
                }
                values
            }
        };

        rows.push(ProjectedRow {
            values,
            sort_fallback: fallback_value(row, fallback)?,
        });
    }

    Ok((columns, rows))
}

/// Projection with aggregation: one output row per group
fn project_groups(
    query: &Query,
    scope: &Scope<'_>,
    scoped: Vec<ScopedRow<'_>>,
    fallback: Option<(usize, usize)>,
) -> Result<(Vec<String>, Vec<ProjectedRow>)> {
    // The validator rejects SELECT * on this path.
    let SelectList::Items(items) = &query.select else {
        return Err(Error::internal());
    };

    // Partition into groups keyed by the grouping values coerced to
    // strings, preserving first-seen order. Without GROUP BY the whole
    // rowset is one group, even when it is empty.
    let groups: Vec<Vec<ScopedRow<'_>>> = if query.group_by.is_empty() {
        vec![scoped]
    } else {
        let mut index: HashMap<Vec<String>, usize> = HashMap::new();
        let mut groups: Vec<Vec<ScopedRow<'_>>> = Vec::new();
        for row in scoped {
            let mut key = Vec::with_capacity(query.group_by.len());
            for col in &query.group_by {
                key.push(scope.value(&row, col)?.to_string());
            }
            match index.get(&key) {
                Some(&at) => groups[at].push(row),
                None => {
                    index.insert(key, groups.len());
                    groups.push(vec![row]);
                }
            }
        }
        groups
    };

    let columns: Vec<String> = items.iter().map(|item| item_name(item, scope)).collect();

    let mut rows = Vec::with_capacity(groups.len());
    for group in &groups {
        let representative = group.first();

        let mut values = Vec::with_capacity(items.len());
        for item in items {
            let value = match &item.expr {
                SelectExpr::Column(col) => match representative {
                    // Grouping columns are constant within a group
                    Some(row) => scope.value(row, col)?,
                    None => Value::Null,
                },
                SelectExpr::Aggregate(agg) => aggregate_over(agg, scope, group)?,
            };
            values.push(value);
        }

        let sort_fallback = match representative {
            Some(row) => fallback_value(row, fallback)?,
            None => None,
        };

        rows.push(ProjectedRow {
            values,
            sort_fallback,
        });
    }

    Ok((columns, rows))
}

/// Compute one aggregate over a group.
///
/// SUM/AVG/MIN/MAX see only non-NULL numeric values and return NULL for an
/// empty input; COUNT(*) is the group size and COUNT(col) the non-NULL
/// count. AVG rounds to 2 decimal places, half away from zero.
fn aggregate_over(
    agg: &Aggregate,
    scope: &Scope<'_>,
    group: &[ScopedRow<'_>],
) -> Result<Value> {
    let column = match (&agg.func, &agg.arg) {
        (AggregateFunc::Count, AggregateArg::Star) => {
            return Ok(Value::Number(group.len() as f64));
        }
        (_, AggregateArg::Star) => return Err(Error::internal()), // parser rejects
        (_, AggregateArg::Column(col)) => col,
    };

    if agg.func == AggregateFunc::Count {
        let mut count = 0usize;
        for row in group {
            if !scope.value(row, column)?.is_null() {
                count += 1;
            }
        }
        return Ok(Value::Number(count as f64));
    }

    let mut numbers = Vec::new();
    for row in group {
        if let Value::Number(n) = scope.value(row, column)? {
            numbers.push(n);
        }
    }

    if numbers.is_empty() {
        return Ok(Value::Null);
    }

    let result = match agg.func {
        AggregateFunc::Sum => numbers.iter().sum(),
        AggregateFunc::Avg => {
            let mean = numbers.iter().sum::<f64>() / numbers.len() as f64;
            (mean * 100.0).round() / 100.0
        }
        AggregateFunc::Min => numbers.iter().cloned().fold(f64::INFINITY, f64::min),
        AggregateFunc::Max => numbers.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        AggregateFunc::Count => return Err(Error::internal()), // handled above
    };

    Ok(Value::Number(result))
}
