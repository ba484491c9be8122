/// Query executor
///
/// Runs a parsed SELECT against a table snapshot as a fixed sequence of
/// clause stages: FROM/JOIN, WHERE, GROUP BY, ORDER BY, LIMIT, projection.
use std::cmp::Ordering;
use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use super::ast::*;
use super::eval::{compare_values, evaluate, is_aggregate_function, type_name, Scope};
use crate::error::{Error, Result};
use crate::tables::{Row, Table, TablesSnapshot};

/// Intermediate result between stages
enum Relation {
    /// Plain rows, before or without grouping
    Rows(Vec<Row>),
    /// One entry per group
    Groups(Vec<Group>),
}

impl Relation {
    fn len(&self) -> usize {
        match self {
            Relation::Rows(rows) => rows.len(),
            Relation::Groups(groups) => groups.len(),
        }
    }
}

/// A group: its key fields plus the member rows aggregates read
struct Group {
    key: Row,
    members: Vec<Row>,
}

/// Query executor
pub struct Executor<'a> {
    tables: &'a dyn TablesSnapshot,
    context: &'a Row,
}

impl<'a> Executor<'a> {
    /// Create an executor reading from `tables`, with `context` as the
    /// outermost name scope
    pub fn new(tables: &'a dyn TablesSnapshot, context: &'a Row) -> Self {
        Self { tables, context }
    }

    /// Execute a SELECT statement
    pub fn execute(&self, select: &Select) -> Result<Vec<Row>> {
        let rows = self.execute_from(select.from.as_ref())?;
        debug!(rows = rows.len(), "from");

        let rows = match select.where_clause {
            Some(ref where_clause) => {
                let rows = self.execute_filter(&where_clause.condition, rows)?;
                debug!(rows = rows.len(), "where");
                rows
            }
            None => rows,
        };

        let relation = match select.group_by {
            Some(ref group_by) => Relation::Groups(self.execute_group_by(&group_by.fields, rows)?),
            None if has_aggregates(&select.fields) => {
                Relation::Groups(self.execute_group_by(&[], rows)?)
            }
            None => Relation::Rows(rows),
        };
        if let Relation::Groups(ref groups) = relation {
            debug!(groups = groups.len(), "group by");
        }

        let relation = match select.order_by {
            Some(ref order_by) => self.execute_sort(order_by, relation)?,
            None => relation,
        };

        let relation = match select.limit {
            Some(ref limit) => {
                let relation = execute_limit(limit, relation);
                debug!(rows = relation.len(), "limit");
                relation
            }
            None => relation,
        };

        self.execute_project(&select.fields, relation)
    }

    fn fetch_table(&self, name: &str) -> Result<Table> {
        self.tables
            .get_table(name)?
            .ok_or_else(|| Error::UnknownTable(name.to_string()))
    }

    fn execute_from(&self, from: Option<&FromClause>) -> Result<Vec<Row>> {
        let from = match from {
            Some(from) => from,
            None => return Ok(vec![Row::new()]),
        };

        let mut rows = self.fetch_table(&from.table)?.data;

        for join in &from.joins {
            if join.kind != JoinKind::Inner {
                debug!(kind = %join.kind, table = %join.table, "executing join as inner join");
            }
            let right = self.fetch_table(&join.table)?;
            rows = self.nested_loop_join(&rows, &right.data, &join.on)?;
            debug!(table = %join.table, rows = rows.len(), "join");
        }

        Ok(rows)
    }

    /// Keep every (left, right) pair whose merged fields satisfy `condition`.
    /// Right fields overwrite left ones on merge.
    fn nested_loop_join(&self, left: &[Row], right: &[Row], condition: &Expression) -> Result<Vec<Row>> {
        let mut result = Vec::new();

        for left_row in left {
            for right_row in right {
                let scope = Scope::new(self.context)
                    .with_row(left_row)
                    .with_row(right_row);
                if predicate(condition, &scope, "JOIN")? {
                    let mut merged = left_row.clone();
                    merged.extend(right_row.clone());
                    result.push(merged);
                }
            }
        }

        Ok(result)
    }

    fn execute_filter(&self, condition: &Expression, rows: Vec<Row>) -> Result<Vec<Row>> {
        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            let keep = predicate(condition, &Scope::new(self.context).with_row(&row), "WHERE")?;
            if keep {
                result.push(row);
            }
        }
        Ok(result)
    }

    /// Partition rows by the values of `fields`. Groups come out in the
    /// order their first member was seen. No input rows still yields one
    /// group, with null keys and no members.
    fn execute_group_by(&self, fields: &[Expression], rows: Vec<Row>) -> Result<Vec<Group>> {
        if rows.is_empty() {
            let key = fields
                .iter()
                .map(|field| (field.output_name().to_string(), Value::Null))
                .collect();
            return Ok(vec![Group {
                key,
                members: Vec::new(),
            }]);
        }

        let mut groups: Vec<Group> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for row in rows {
            let values = {
                let scope = Scope::new(self.context).with_row(&row);
                fields
                    .iter()
                    .map(|field| evaluate(field, &scope))
                    .collect::<Result<Vec<_>>>()?
            };
            let signature = Value::Array(values.clone()).to_string();

            match positions.get(&signature) {
                Some(&position) => groups[position].members.push(row),
                None => {
                    let key = fields
                        .iter()
                        .zip(values)
                        .map(|(field, value)| (field.output_name().to_string(), value))
                        .collect();
                    positions.insert(signature, groups.len());
                    groups.push(Group {
                        key,
                        members: vec![row],
                    });
                }
            }
        }

        Ok(groups)
    }

    /// One stable sort per ORDER BY key in declared order, so the last key
    /// is the primary one.
    fn execute_sort(&self, order_by: &OrderByClause, mut relation: Relation) -> Result<Relation> {
        for field in &order_by.fields {
            relation = match relation {
                Relation::Rows(rows) => {
                    let keys = rows
                        .iter()
                        .map(|row| {
                            evaluate(&field.expression, &Scope::new(self.context).with_row(row))
                        })
                        .collect::<Result<Vec<_>>>()?;
                    Relation::Rows(sort_by_keys(rows, keys, field.direction)?)
                }
                Relation::Groups(groups) => {
                    let keys = groups
                        .iter()
                        .map(|group| {
                            let scope = Scope::new(self.context)
                                .with_row(&group.key)
                                .with_group(&group.members);
                            evaluate(&field.expression, &scope)
                        })
                        .collect::<Result<Vec<_>>>()?;
                    Relation::Groups(sort_by_keys(groups, keys, field.direction)?)
                }
            };
        }
        Ok(relation)
    }

    fn execute_project(&self, fields: &[SelectField], relation: Relation) -> Result<Vec<Row>> {
        match relation {
            Relation::Rows(ref rows) => rows
                .iter()
                .map(|row| {
                    let scope = Scope::new(self.context).with_group(rows).with_row(row);
                    project_row(fields, row, &scope)
                })
                .collect(),
            Relation::Groups(ref groups) => groups
                .iter()
                .map(|group| {
                    let scope = Scope::new(self.context)
                        .with_row(&group.key)
                        .with_group(&group.members);
                    project_row(fields, &group.key, &scope)
                })
                .collect(),
        }
    }
}

/// Execute `select` against `tables`, resolving unknown names in `context`
pub fn execute(select: &Select, tables: &dyn TablesSnapshot, context: &Row) -> Result<Vec<Row>> {
    Executor::new(tables, context).execute(select)
}

fn has_aggregates(fields: &[SelectField]) -> bool {
    fields
        .iter()
        .any(|field| field.expression.any_function(&is_aggregate_function))
}

fn predicate(condition: &Expression, scope: &Scope<'_>, clause: &str) -> Result<bool> {
    match evaluate(condition, scope)? {
        Value::Bool(b) => Ok(b),
        other => Err(Error::TypeError(format!(
            "{} condition must be boolean, got {}",
            clause,
            type_name(&other)
        ))),
    }
}

fn sort_by_keys<T>(items: Vec<T>, keys: Vec<Value>, direction: OrderDirection) -> Result<Vec<T>> {
    check_sortable(&keys)?;
    let mut keyed: Vec<(Value, T)> = keys.into_iter().zip(items).collect();

    keyed.sort_by(|(a, _), (b, _)| {
        let ordering = compare_values(a, b).unwrap_or(Ordering::Equal);
        match direction {
            OrderDirection::Asc => ordering,
            OrderDirection::Desc => ordering.reverse(),
        }
    });

    Ok(keyed.into_iter().map(|(_, item)| item).collect())
}

/// Non-null keys must be pairwise comparable, so the sort comparator is a
/// total order.
fn check_sortable(keys: &[Value]) -> Result<()> {
    let mut non_null = keys.iter().filter(|key| !key.is_null());
    if let Some(first) = non_null.next() {
        for key in non_null {
            compare_values(first, key)?;
        }
    }
    Ok(())
}

fn execute_limit(limit: &LimitClause, relation: Relation) -> Relation {
    fn window<T>(items: Vec<T>, limit: &LimitClause) -> Vec<T> {
        items
            .into_iter()
            .skip(limit.offset)
            .take(limit.limit)
            .collect()
    }

    match relation {
        Relation::Rows(rows) => Relation::Rows(window(rows, limit)),
        Relation::Groups(groups) => Relation::Groups(window(groups, limit)),
    }
}

fn project_row(fields: &[SelectField], row: &Row, scope: &Scope<'_>) -> Result<Row> {
    let mut output = Row::new();
    for field in fields {
        if matches!(field.expression, Expression::Wildcard) {
            for (key, value) in row {
                output.insert(key.clone(), value.clone());
            }
        } else {
            let value = evaluate(&field.expression, scope)?;
            output.insert(field.output_name().to_string(), value);
        }
    }
    Ok(output)
}
