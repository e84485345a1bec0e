//! Generic Repository Module
//!
//! CRUD over any [`Entity`], narrowed by caller scopes and paginated with
//! [`PaginationMetadata`].

use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Any, AnyConnection};
use tracing::debug;
use uuid::Uuid;

use crate::db::entity::now_millis;
use crate::db::query::{bind_values, SqlBuilder};
use crate::db::{apply_scopes, DbHandle, Entity, PaginationMetadata, Query, Scope, Value};
use crate::error::{DbError, DbResult};

// == Repository Trait ==
/// CRUD contract over an entity type.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Returns one page of records and fills in `meta`.
    async fn find_all(&self, meta: &mut PaginationMetadata, scopes: &[Scope]) -> DbResult<Vec<T>>;

    /// Returns the record with `id`.
    async fn find_one(&self, id: Uuid, scopes: &[Scope]) -> DbResult<T>;

    /// Inserts `entity`, assigning an identifier when it has none.
    async fn create(&self, entity: &mut T, scopes: &[Scope]) -> DbResult<()>;

    /// Writes the non-null columns of `entity` to the record with `id`, then
    /// reloads the record into `entity`.
    async fn update(&self, id: Uuid, entity: &mut T, scopes: &[Scope]) -> DbResult<()>;

    /// Removes the record with `id` and returns it as it was read.
    async fn delete(&self, id: Uuid, scopes: &[Scope]) -> DbResult<T>;

    /// The handle statements run through.
    fn handle(&self) -> &DbHandle;
}

// == Generic Repository ==
/// [`Repository`] implementation over a [`DbHandle`].
pub struct GenericRepository<T> {
    handle: DbHandle,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for GenericRepository<T> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> GenericRepository<T> {
    // == Constructor ==
    /// Creates a repository that runs its statements through `handle`.
    pub fn new(handle: DbHandle) -> Self {
        Self {
            handle,
            _entity: PhantomData,
        }
    }

    // == Count ==
    /// Number of records matching `scopes`.
    pub async fn count(&self, scopes: &[Scope]) -> DbResult<i64> {
        let query = apply_scopes(Query::new(), scopes);
        self.handle
            .run(async {
                let mut conn = self.handle.acquire().await?;
                Self::count_on(&mut conn, &query).await
            })
            .await
    }

    // == Update Without Result ==
    /// Partial update of the record with `id`, without reloading it.
    pub async fn update_without_result(&self, id: Uuid, entity: &T, scopes: &[Scope]) -> DbResult<()> {
        let query = apply_scopes(Query::new(), scopes);
        self.handle
            .run(async {
                let mut conn = self.handle.acquire().await?;
                Self::update_on(&mut conn, id, entity, &query).await
            })
            .await
    }

    // == Delete Without Result ==
    /// Removes the record with `id` without reading it first.
    pub async fn delete_without_result(&self, id: Uuid, scopes: &[Scope]) -> DbResult<()> {
        let query = apply_scopes(Query::new(), scopes);
        self.handle
            .run(async {
                let mut conn = self.handle.acquire().await?;
                Self::delete_on(&mut conn, id, &query, now_millis()).await
            })
            .await
    }

    // == Statement Helpers ==
    async fn count_on(conn: &mut AnyConnection, query: &Query) -> DbResult<i64> {
        let table = query.table_or(T::table_name())?;
        let mut sql = SqlBuilder::new(format!("SELECT COUNT(*) FROM {table}"));
        sql.push_where(query, T::SOFT_DELETE, None)?;
        let (sql, args) = sql.finish();

        debug!(table, %sql, "count");
        let count = bind_values!(sqlx::query_scalar::<Any, i64>(&sql), args)
            .fetch_one(&mut *conn)
            .await?;
        Ok(count)
    }

    async fn select_on(conn: &mut AnyConnection, query: &Query, id: Option<Uuid>) -> DbResult<Vec<T>> {
        let table = query.table_or(T::table_name())?;
        let mut sql = SqlBuilder::new(format!("SELECT * FROM {table}"));
        sql.push_where(query, T::SOFT_DELETE, id.map(|id| ("id", Value::from(id))))?;
        sql.push_tail(query)?;
        let (sql, args) = sql.finish();

        debug!(table, %sql, "select");
        let rows = bind_values!(sqlx::query_as::<Any, T>(&sql), args)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows)
    }

    async fn find_one_on(conn: &mut AnyConnection, id: Uuid, query: &Query) -> DbResult<T> {
        let table = query.table_or(T::table_name())?.to_string();
        Self::select_on(conn, &query.clone().limit(1), Some(id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DbError::RecordNotFound(format!("{table} {id}")))
    }

    async fn update_on(conn: &mut AnyConnection, id: Uuid, entity: &T, query: &Query) -> DbResult<()> {
        let table = query.table_or(T::table_name())?;
        let mut sql = SqlBuilder::new(format!("UPDATE {table} SET "));
        let columns = entity
            .values()
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .chain([("updated_at", Value::from(now_millis()))]);
        for (i, (column, value)) in columns.enumerate() {
            if i > 0 {
                sql.push(", ");
            }
            sql.push(column).push(" = ").push_bind(value);
        }
        sql.push_where(query, T::SOFT_DELETE, Some(("id", Value::from(id))))?;
        let (sql, args) = sql.finish();

        debug!(table, %id, %sql, "update");
        let result = bind_values!(sqlx::query::<Any>(&sql), args)
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::RecordNotFound(format!("{table} {id}")));
        }
        Ok(())
    }

    /// Removes the record. Soft deletes stamp `deleted_at` with `now`.
    async fn delete_on(
        conn: &mut AnyConnection,
        id: Uuid,
        query: &Query,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let table = query.table_or(T::table_name())?;
        let mut sql = if T::SOFT_DELETE {
            let mut sql = SqlBuilder::new(format!("UPDATE {table} SET deleted_at = "));
            sql.push_bind(Value::from(now));
            sql
        } else {
            SqlBuilder::new(format!("DELETE FROM {table}"))
        };
        sql.push_where(query, T::SOFT_DELETE, Some(("id", Value::from(id))))?;
        let (sql, args) = sql.finish();

        debug!(table, %id, soft = T::SOFT_DELETE, "delete");
        let result = bind_values!(sqlx::query::<Any>(&sql), args)
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::RecordNotFound(format!("{table} {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for GenericRepository<T> {
    async fn find_all(&self, meta: &mut PaginationMetadata, scopes: &[Scope]) -> DbResult<Vec<T>> {
        meta.normalize();
        let query = apply_scopes(Query::new(), scopes);

        self.handle
            .run(async {
                let mut conn = self.handle.acquire().await?;

                let total = Self::count_on(&mut conn, &query).await?;
                meta.apply_count(total);

                let page = query.clone().offset(meta.offset()).limit(meta.items_per_page);
                let records = Self::select_on(&mut conn, &page, None).await?;
                meta.apply_page_len(records.len());
                Ok(records)
            })
            .await
    }

    async fn find_one(&self, id: Uuid, scopes: &[Scope]) -> DbResult<T> {
        let query = apply_scopes(Query::new(), scopes);
        self.handle
            .run(async {
                let mut conn = self.handle.acquire().await?;
                Self::find_one_on(&mut conn, id, &query).await
            })
            .await
    }

    async fn create(&self, entity: &mut T, scopes: &[Scope]) -> DbResult<()> {
        let query = apply_scopes(Query::new(), scopes);
        let table = query.table_or(T::table_name())?;
        let id = entity.base_mut().before_create(now_millis());

        let mut columns = entity.base().insert_values();
        columns.extend(entity.values().into_iter().filter(|(_, value)| !value.is_null()));

        let mut sql = SqlBuilder::new(format!("INSERT INTO {table} ("));
        for (i, (column, _)) in columns.iter().enumerate() {
            if i > 0 {
                sql.push(", ");
            }
            sql.push(column);
        }
        sql.push(") VALUES (");
        for (i, (_, value)) in columns.into_iter().enumerate() {
            if i > 0 {
                sql.push(", ");
            }
            sql.push_bind(value);
        }
        sql.push(")");
        let (sql, args) = sql.finish();

        debug!(table, %id, "create");
        self.handle
            .run(async {
                let mut conn = self.handle.acquire().await?;
                bind_values!(sqlx::query::<Any>(&sql), args)
                    .execute(&mut *conn)
                    .await?;
                Ok(())
            })
            .await
    }

    async fn update(&self, id: Uuid, entity: &mut T, scopes: &[Scope]) -> DbResult<()> {
        let query = apply_scopes(Query::new(), scopes);
        let reloaded = self
            .handle
            .run(async {
                let mut conn = self.handle.acquire().await?;
                Self::update_on(&mut conn, id, entity, &query).await?;
                Self::find_one_on(&mut conn, id, &query).await
            })
            .await?;
        *entity = reloaded;
        Ok(())
    }

    async fn delete(&self, id: Uuid, scopes: &[Scope]) -> DbResult<T> {
        let query = apply_scopes(Query::new(), scopes);
        self.handle
            .run(async {
                let mut conn = self.handle.acquire().await?;
                let mut record = Self::find_one_on(&mut conn, id, &query).await?;
                let now = now_millis();
                Self::delete_on(&mut conn, id, &query, now).await?;
                if T::SOFT_DELETE {
                    record.base_mut().deleted_at = Some(now);
                }
                Ok(record)
            })
            .await
    }

    fn handle(&self) -> &DbHandle {
        &self.handle
    }
}
