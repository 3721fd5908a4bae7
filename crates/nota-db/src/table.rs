//! Generic relation accessor.
//!
//! [`Table`] executes the statements produced by [`crate::statement`]
//! against a pooled connection or a caller-supplied transaction. It is
//! relation-agnostic: repositories configure it with a table name and the
//! identity column list and speak in [`FieldMap`]s.

use std::time::Instant;

use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};
use tracing::{debug, warn};

use nota_core::{Error, FieldState, Result};

use crate::statement::{self, BindValue, FieldMap, Statement};

/// Read a three-state field out of a row: a NULL column decodes to
/// `FieldState::Null`, a value to `FieldState::Value`.
pub fn field_from_row<'r, T>(row: &'r PgRow, column: &str) -> Result<FieldState<T>>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    use sqlx::Row;
    let value: Option<T> = row.try_get(column).map_err(Error::Database)?;
    Ok(value.into())
}

fn apply_binds<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[BindValue],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            BindValue::BigInt(v) => query.bind(*v),
            BindValue::Text(v) => query.bind(v.clone()),
            BindValue::Bool(v) => query.bind(*v),
            BindValue::Timestamp(v) => query.bind(*v),
            BindValue::Vector(v) => query.bind(v.clone()),
        };
    }
    query
}

/// Generic parameterized accessor for one relation.
pub struct Table {
    pool: PgPool,
    name: &'static str,
    key_columns: &'static [&'static str],
}

impl Table {
    /// Create a new accessor for `name`, whose identity is formed by
    /// `key_columns`.
    pub fn new(pool: PgPool, name: &'static str, key_columns: &'static [&'static str]) -> Self {
        Self {
            pool,
            name,
            key_columns,
        }
    }

    /// The relation this accessor targets.
    pub fn name(&self) -> &'static str {
        self.name
    }

    // ── pool-level operations ──────────────────────────────────────────

    /// Insert the populated fields as one row, returning it.
    pub async fn insert(&self, fields: &FieldMap) -> Result<PgRow> {
        self.insert_on(&self.pool, fields).await
    }

    /// Update rows matching `filter`, returning the first updated row.
    pub async fn update(&self, set: &FieldMap, filter: &FieldMap) -> Result<PgRow> {
        self.update_on(&self.pool, set, filter).await
    }

    /// Delete rows matching `filter`, returning the first deleted row.
    pub async fn delete(&self, filter: &FieldMap) -> Result<PgRow> {
        self.delete_on(&self.pool, filter).await
    }

    /// Delete every row matching `filter`, returning the match count.
    /// Zero matches is not an error; used for child-row cascades.
    pub async fn delete_all(&self, filter: &FieldMap) -> Result<u64> {
        self.delete_all_on(&self.pool, filter).await
    }

    /// Select all rows matching `filter`; an empty filter selects the
    /// whole relation.
    pub async fn select(&self, filter: &FieldMap) -> Result<Vec<PgRow>> {
        self.select_on(&self.pool, filter).await
    }

    /// Select a single row by its identity columns. `key` values must
    /// match the configured `key_columns` in order.
    pub async fn select_by_key(&self, key: &[BindValue]) -> Result<Option<PgRow>> {
        let filter = self.key_filter(key)?;
        let stmt = statement::build_select(self.name, &filter);
        let rows = self.run_fetch_all(&self.pool, &stmt, "select_by_key").await?;
        Ok(rows.into_iter().next())
    }

    // ── transaction-level operations ───────────────────────────────────

    pub async fn insert_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        fields: &FieldMap,
    ) -> Result<PgRow> {
        self.insert_on(&mut **tx, fields).await
    }

    pub async fn update_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        set: &FieldMap,
        filter: &FieldMap,
    ) -> Result<PgRow> {
        self.update_on(&mut **tx, set, filter).await
    }

    pub async fn delete_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        filter: &FieldMap,
    ) -> Result<PgRow> {
        self.delete_on(&mut **tx, filter).await
    }

    pub async fn delete_all_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        filter: &FieldMap,
    ) -> Result<u64> {
        self.delete_all_on(&mut **tx, filter).await
    }

    // ── executor-generic internals ─────────────────────────────────────

    async fn insert_on<'e, E: PgExecutor<'e>>(
        &self,
        executor: E,
        fields: &FieldMap,
    ) -> Result<PgRow> {
        let stmt = statement::build_insert(self.name, fields)?;
        let row = self.run_fetch_optional(executor, &stmt, "insert").await?;
        row.ok_or_else(|| self.write_failed("insert"))
    }

    async fn update_on<'e, E: PgExecutor<'e>>(
        &self,
        executor: E,
        set: &FieldMap,
        filter: &FieldMap,
    ) -> Result<PgRow> {
        let stmt = statement::build_update(self.name, set, filter)?;
        let row = self.run_fetch_optional(executor, &stmt, "update").await?;
        row.ok_or_else(|| self.write_failed("update"))
    }

    async fn delete_on<'e, E: PgExecutor<'e>>(
        &self,
        executor: E,
        filter: &FieldMap,
    ) -> Result<PgRow> {
        let stmt = statement::build_delete(self.name, filter)?;
        let row = self.run_fetch_optional(executor, &stmt, "delete").await?;
        row.ok_or_else(|| self.write_failed("delete"))
    }

    async fn delete_all_on<'e, E: PgExecutor<'e>>(
        &self,
        executor: E,
        filter: &FieldMap,
    ) -> Result<u64> {
        let stmt = statement::build_delete(self.name, filter)?;
        let start = Instant::now();
        let result = apply_binds(sqlx::query(&stmt.sql), &stmt.params)
            .execute(executor)
            .await
            .map_err(Error::Database)?;
        debug!(
            subsystem = "database",
            component = "table",
            op = "delete_all",
            db_table = self.name,
            result_count = result.rows_affected(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Statement executed"
        );
        Ok(result.rows_affected())
    }

    async fn select_on<'e, E: PgExecutor<'e>>(
        &self,
        executor: E,
        filter: &FieldMap,
    ) -> Result<Vec<PgRow>> {
        let stmt = statement::build_select(self.name, filter);
        self.run_fetch_all(executor, &stmt, "select").await
    }

    async fn run_fetch_optional<'e, E: PgExecutor<'e>>(
        &self,
        executor: E,
        stmt: &Statement,
        op: &'static str,
    ) -> Result<Option<PgRow>> {
        let start = Instant::now();
        let row = apply_binds(sqlx::query(&stmt.sql), &stmt.params)
            .fetch_optional(executor)
            .await
            .map_err(Error::Database)?;
        debug!(
            subsystem = "database",
            component = "table",
            op = op,
            db_table = self.name,
            duration_ms = start.elapsed().as_millis() as u64,
            "Statement executed"
        );
        Ok(row)
    }

    async fn run_fetch_all<'e, E: PgExecutor<'e>>(
        &self,
        executor: E,
        stmt: &Statement,
        op: &'static str,
    ) -> Result<Vec<PgRow>> {
        let start = Instant::now();
        let rows = apply_binds(sqlx::query(&stmt.sql), &stmt.params)
            .fetch_all(executor)
            .await
            .map_err(Error::Database)?;
        debug!(
            subsystem = "database",
            component = "table",
            op = op,
            db_table = self.name,
            result_count = rows.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Statement executed"
        );
        Ok(rows)
    }

    fn key_filter(&self, key: &[BindValue]) -> Result<FieldMap> {
        if key.len() != self.key_columns.len() {
            return Err(Error::InvalidInput(format!(
                "{} expects {} key values, got {}",
                self.name,
                self.key_columns.len(),
                key.len()
            )));
        }
        let mut filter = FieldMap::new();
        for (column, value) in self.key_columns.iter().zip(key) {
            filter = match value {
                BindValue::BigInt(Some(v)) => filter.value(*column, v),
                BindValue::Text(Some(v)) => filter.value(*column, v),
                BindValue::Bool(Some(v)) => filter.value(*column, v),
                BindValue::Timestamp(Some(v)) => filter.value(*column, v),
                BindValue::Vector(Some(v)) => filter.value(*column, v),
                _ => {
                    return Err(Error::InvalidInput(format!(
                        "NULL key value for {}.{}",
                        self.name, column
                    )))
                }
            };
        }
        Ok(filter)
    }

    fn write_failed(&self, op: &str) -> Error {
        warn!(
            subsystem = "database",
            component = "table",
            op = op,
            db_table = self.name,
            "Statement matched no rows"
        );
        Error::WriteFailed(format!("{} on {} matched no rows", op, self.name))
    }
}
