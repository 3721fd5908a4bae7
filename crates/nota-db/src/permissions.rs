//! Note permission repository implementation.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use sqlx::{Postgres, Transaction};

use nota_core::{NotePermission, NotePermissionRepository, Result};

use crate::statement::FieldMap;
use crate::table::{field_from_row, Table};

/// The `note.permission` relation.
pub const PERMISSION_TABLE: &str = "note.permission";

/// Both columns participate in writes and filters; the pair is the
/// composite identity.
pub(crate) fn permission_field_map(permission: &NotePermission) -> FieldMap {
    FieldMap::new()
        .field("note_id", &permission.note_id)
        .field("role_id", &permission.role_id)
}

pub(crate) fn permission_from_row(row: &PgRow) -> Result<NotePermission> {
    Ok(NotePermission {
        note_id: field_from_row(row, "note_id")?,
        role_id: field_from_row(row, "role_id")?,
    })
}

/// PostgreSQL implementation of [`NotePermissionRepository`].
pub struct PgNotePermissionRepository {
    table: Table,
}

impl PgNotePermissionRepository {
    /// Create a new repository over the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            table: Table::new(pool, PERMISSION_TABLE, &["note_id", "role_id"]),
        }
    }

    /// Insert within an existing transaction.
    pub async fn insert_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        permission: &NotePermission,
    ) -> Result<NotePermission> {
        let row = self
            .table
            .insert_tx(tx, &permission_field_map(permission))
            .await?;
        permission_from_row(&row)
    }

    /// Remove every permission row of a note; zero rows is fine.
    pub async fn delete_for_note_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        note_id: i64,
    ) -> Result<u64> {
        self.table
            .delete_all_tx(tx, &permission_field_map(&NotePermission::for_note(note_id)))
            .await
    }
}

#[async_trait]
impl NotePermissionRepository for PgNotePermissionRepository {
    async fn insert(&self, permission: &NotePermission) -> Result<NotePermission> {
        let row = self.table.insert(&permission_field_map(permission)).await?;
        permission_from_row(&row)
    }

    async fn update(
        &self,
        set: &NotePermission,
        filter: &NotePermission,
    ) -> Result<NotePermission> {
        let row = self
            .table
            .update(&permission_field_map(set), &permission_field_map(filter))
            .await?;
        permission_from_row(&row)
    }

    async fn delete(&self, filter: &NotePermission) -> Result<NotePermission> {
        let row = self.table.delete(&permission_field_map(filter)).await?;
        permission_from_row(&row)
    }

    async fn select(&self, filter: &NotePermission) -> Result<Vec<NotePermission>> {
        let rows = self.table.select(&permission_field_map(filter)).await?;
        rows.iter().map(permission_from_row).collect()
    }

    async fn select_for_note(&self, note_id: i64) -> Result<Vec<NotePermission>> {
        self.select(&NotePermission::for_note(note_id)).await
    }
}
