//! Entity Module
//!
//! The capability contract every persisted record type implements, and the
//! identity/audit fields shared by all of them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::any::AnyRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use crate::db::Value;

// == Entity ==
/// A record type stored in a named table.
///
/// Implementors embed a [`Base`] and decode themselves from an [`AnyRow`]
/// (usually by calling [`Base::from_row`] for the shared columns).
pub trait Entity: for<'r> FromRow<'r, AnyRow> + Send + Sync + Unpin + 'static {
    /// Whether removal sets `deleted_at` instead of deleting the row.
    const SOFT_DELETE: bool = true;

    /// Storage location of this entity. Must be a plain SQL identifier.
    fn table_name() -> &'static str;

    fn base(&self) -> &Base;

    fn base_mut(&mut self) -> &mut Base;

    /// The entity's own columns, excluding the [`Base`] columns.
    ///
    /// `Value::Null` entries are skipped on insert and update, so optional
    /// fields left unset keep their stored or default value.
    fn values(&self) -> Vec<(&'static str, Value)>;

    /// Identifier, once assigned.
    fn id(&self) -> Option<Uuid> {
        self.base().id
    }
}

// == Base ==
/// Identity and audit columns shared by every entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Base {
    pub id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Base {
    // == Before Create ==
    /// Assigns an identifier if none is set and stamps the audit times.
    ///
    /// Returns the identifier the record will be persisted under.
    pub fn before_create(&mut self, now: DateTime<Utc>) -> Uuid {
        let id = *self.id.get_or_insert_with(Uuid::new_v4);
        if self.created_at == DateTime::<Utc>::default() {
            self.created_at = now;
        }
        self.updated_at = now;
        id
    }

    /// Columns written on insert, in table order.
    pub(crate) fn insert_values(&self) -> Vec<(&'static str, Value)> {
        let mut values = vec![
            ("id", Value::from(self.id)),
            ("created_at", Value::from(self.created_at)),
            ("updated_at", Value::from(self.updated_at)),
        ];
        if let Some(deleted_at) = self.deleted_at {
            values.push(("deleted_at", Value::from(deleted_at)));
        }
        values
    }

    // == From Row ==
    /// Decodes `id`, `created_at`, `updated_at` and `deleted_at`.
    pub fn from_row(row: &AnyRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let id = Uuid::parse_str(&id).map_err(|e| sqlx::Error::ColumnDecode {
            index: "id".to_string(),
            source: Box::new(e),
        })?;

        let deleted_at: Option<i64> = row.try_get("deleted_at")?;

        Ok(Self {
            id: Some(id),
            created_at: millis_to_datetime("created_at", row.try_get("created_at")?)?,
            updated_at: millis_to_datetime("updated_at", row.try_get("updated_at")?)?,
            deleted_at: deleted_at
                .map(|ms| millis_to_datetime("deleted_at", ms))
                .transpose()?,
        })
    }
}

fn millis_to_datetime(column: &str, ms: i64) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: format!("timestamp out of range: {ms}").into(),
    })
}

/// Current time truncated to the millisecond precision the store keeps.
pub(crate) fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}
