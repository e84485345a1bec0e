//! Query Scope Module
//!
//! A small query description that caller scopes narrow before the repository
//! renders it to SQL. Placeholders in filter fragments are written as `?` and
//! rendered as positional `$n` parameters, which both the Postgres and SQLite
//! drivers accept.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

// == Column Value ==
/// A bindable column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Text(v.to_string())
    }
}

/// Timestamps are stored as Unix milliseconds.
impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Int(v.timestamp_millis())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// == Ordering ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    fn as_sql(self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Condition {
    clause: String,
    args: Vec<Value>,
    /// Column spliced into `clause` by `eq`, checked on render.
    column: Option<String>,
}

// == Query ==
/// Query shape that scopes transform. Conditions are ANDed in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    table: Option<String>,
    conditions: Vec<Condition>,
    order: Vec<(String, Order)>,
    limit: Option<i64>,
    offset: Option<i64>,
    with_deleted: bool,
}

impl Query {
    /// An unfiltered query over the entity's own table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a raw condition. Every `?` in `clause` consumes one of `args`.
    pub fn filter<I>(mut self, clause: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.conditions.push(Condition {
            clause: clause.into(),
            args: args.into_iter().map(Into::into).collect(),
            column: None,
        });
        self
    }

    /// Adds `column = value`. `column` must be a plain identifier.
    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition {
            clause: format!("{column} = ?"),
            args: vec![value.into()],
            column: Some(column.to_string()),
        });
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, order: Order) -> Self {
        self.order.push((column.into(), order));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Runs the statement against `table` instead of the entity's own table.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Includes soft-deleted rows.
    pub fn with_deleted(mut self) -> Self {
        self.with_deleted = true;
        self
    }

    pub fn includes_deleted(&self) -> bool {
        self.with_deleted
    }

    /// Resolves the target table, falling back to `default`.
    pub(crate) fn table_or<'a>(&'a self, default: &'a str) -> DbResult<&'a str> {
        let table = self.table.as_deref().unwrap_or(default);
        if is_identifier(table) {
            Ok(table)
        } else {
            Err(DbError::Query(format!("invalid table name: {table:?}")))
        }
    }
}

// == Scope ==
/// A caller-supplied query transformation.
pub type Scope = Box<dyn Fn(Query) -> Query + Send + Sync>;

/// Boxes a closure as a [`Scope`].
pub fn scope<F>(f: F) -> Scope
where
    F: Fn(Query) -> Query + Send + Sync + 'static,
{
    Box::new(f)
}

/// Applies scopes left to right.
pub fn apply_scopes(query: Query, scopes: &[Scope]) -> Query {
    scopes.iter().fold(query, |query, scope| scope(query))
}

/// Storage-addressable name: non-empty ASCII alphanumerics, `_` and `.`.
pub(crate) fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        && !name.starts_with(|c: char| c.is_ascii_digit())
}

// == SQL Builder ==
/// Accumulates SQL text and its positional arguments.
#[derive(Debug, Default)]
pub(crate) struct SqlBuilder {
    sql: String,
    args: Vec<Value>,
}

impl SqlBuilder {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
        }
    }

    pub fn push(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    pub fn push_bind(&mut self, value: Value) -> &mut Self {
        self.args.push(value);
        let _ = write!(self.sql, "${}", self.args.len());
        self
    }

    /// Pushes `clause`, replacing each `?` with the next bound argument.
    fn push_fragment(&mut self, clause: &str, args: &[Value]) -> DbResult<()> {
        let placeholders = clause.matches('?').count();
        if placeholders != args.len() {
            return Err(DbError::Query(format!(
                "condition {clause:?} has {placeholders} placeholders but {} arguments",
                args.len()
            )));
        }

        let mut args = args.iter();
        for (i, part) in clause.split('?').enumerate() {
            if i > 0 {
                if let Some(arg) = args.next() {
                    self.push_bind(arg.clone());
                }
            }
            self.sql.push_str(part);
        }
        Ok(())
    }

    /// Renders the WHERE clause: scope conditions, then `extra`, then the
    /// soft-delete filter when it applies.
    pub fn push_where(
        &mut self,
        query: &Query,
        soft_delete: bool,
        extra: Option<(&str, Value)>,
    ) -> DbResult<()> {
        let mut first = true;
        let mut and = |builder: &mut Self| {
            builder.push(if first { " WHERE " } else { " AND " });
            first = false;
        };

        for condition in &query.conditions {
            if let Some(column) = condition.column.as_deref().filter(|c| !is_identifier(c)) {
                return Err(DbError::Query(format!("invalid filter column: {column:?}")));
            }
            and(self);
            self.push("(");
            self.push_fragment(&condition.clause, &condition.args)?;
            self.push(")");
        }

        if let Some((column, value)) = extra {
            and(self);
            self.push(column).push(" = ").push_bind(value);
        }

        if soft_delete && !query.with_deleted {
            and(self);
            self.push("deleted_at IS NULL");
        }

        Ok(())
    }

    /// Renders ORDER BY, LIMIT and OFFSET.
    pub fn push_tail(&mut self, query: &Query) -> DbResult<()> {
        for (i, (column, order)) in query.order.iter().enumerate() {
            if !is_identifier(column) {
                return Err(DbError::Query(format!("invalid order column: {column:?}")));
            }
            self.push(if i == 0 { " ORDER BY " } else { ", " });
            self.push(column).push(" ").push(order.as_sql());
        }

        if let Some(limit) = query.limit {
            let _ = write!(self.sql, " LIMIT {}", limit.max(0));
        }
        if let Some(offset) = query.offset {
            let _ = write!(self.sql, " OFFSET {}", offset.max(0));
        }

        Ok(())
    }

    pub fn finish(self) -> (String, Vec<Value>) {
        (self.sql, self.args)
    }
}

/// Binds `Value`s onto a sqlx query, query_as or query_scalar.
macro_rules! bind_values {
    ($query:expr, $args:expr) => {{
        let mut query = $query;
        for value in $args {
            query = match value {
                $crate::db::Value::Null => query.bind(None::<String>),
                $crate::db::Value::Int(v) => query.bind(v),
                $crate::db::Value::Float(v) => query.bind(v),
                $crate::db::Value::Text(v) => query.bind(v),
            };
        }
        query
    }};
}

pub(crate) use bind_values;
