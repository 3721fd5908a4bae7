//! Note content repository implementation.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use sqlx::{Postgres, Transaction};

use nota_core::{Error, FieldState, NoteContentRepository, NoteEntity, Result};

use crate::statement::FieldMap;
use crate::table::{field_from_row, Table};

/// The `note.content` relation.
pub const CONTENT_TABLE: &str = "note.content";

/// Writable column subset of a note entity. The primary key is excluded:
/// ids are server-assigned and never SET.
pub(crate) fn content_set_map(note: &NoteEntity) -> FieldMap {
    FieldMap::new()
        .field("title", &note.title)
        .field("content", &note.content)
        .field("author_id", &note.author_id)
        .field("updated_at", &note.updated_at)
}

/// Filter over all content columns, including the primary key.
pub(crate) fn content_filter_map(note: &NoteEntity) -> FieldMap {
    FieldMap::new()
        .field("id", &note.note_id)
        .field("title", &note.title)
        .field("content", &note.content)
        .field("author_id", &note.author_id)
        .field("updated_at", &note.updated_at)
}

/// Map a content row back to an entity. Child collections stay `Unset`;
/// only the facade resolves them.
pub(crate) fn note_from_row(row: &PgRow) -> Result<NoteEntity> {
    Ok(NoteEntity {
        note_id: field_from_row(row, "id")?,
        title: field_from_row(row, "title")?,
        content: field_from_row(row, "content")?,
        author_id: field_from_row(row, "author_id")?,
        updated_at: field_from_row(row, "updated_at")?,
        embeddings: FieldState::Unset,
        permissions: FieldState::Unset,
    })
}

/// PostgreSQL implementation of [`NoteContentRepository`].
pub struct PgNoteContentRepository {
    table: Table,
}

impl PgNoteContentRepository {
    /// Create a new repository over the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            table: Table::new(pool, CONTENT_TABLE, &["id"]),
        }
    }

    /// Insert within an existing transaction.
    pub async fn insert_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        note: &NoteEntity,
    ) -> Result<NoteEntity> {
        let row = self.table.insert_tx(tx, &content_set_map(note)).await?;
        note_from_row(&row)
    }

    /// Delete within an existing transaction.
    pub async fn delete_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        filter: &NoteEntity,
    ) -> Result<NoteEntity> {
        let row = self.table.delete_tx(tx, &content_filter_map(filter)).await?;
        note_from_row(&row)
    }
}

#[async_trait]
impl NoteContentRepository for PgNoteContentRepository {
    async fn insert(&self, note: &NoteEntity) -> Result<NoteEntity> {
        let row = self.table.insert(&content_set_map(note)).await?;
        note_from_row(&row)
    }

    async fn update(&self, set: &NoteEntity, filter: &NoteEntity) -> Result<NoteEntity> {
        let row = self
            .table
            .update(&content_set_map(set), &content_filter_map(filter))
            .await
            .map_err(|e| with_note_context(e, filter))?;
        note_from_row(&row)
    }

    async fn delete(&self, filter: &NoteEntity) -> Result<NoteEntity> {
        let row = self
            .table
            .delete(&content_filter_map(filter))
            .await
            .map_err(|e| with_note_context(e, filter))?;
        note_from_row(&row)
    }

    async fn select(&self, filter: &NoteEntity) -> Result<Vec<NoteEntity>> {
        let rows = self.table.select(&content_filter_map(filter)).await?;
        rows.iter().map(note_from_row).collect()
    }

    async fn select_by_id(&self, note_id: i64) -> Result<Option<NoteEntity>> {
        let row = self
            .table
            .select_by_key(&[crate::statement::BindValue::BigInt(Some(note_id))])
            .await?;
        row.as_ref().map(note_from_row).transpose()
    }
}

/// Attach the filter's note id to write failures so callers can log which
/// entity the statement missed.
fn with_note_context(err: Error, filter: &NoteEntity) -> Error {
    match err {
        Error::WriteFailed(msg) => match filter.note_id.value() {
            Some(id) => Error::WriteFailed(format!("{} (note {})", msg, id)),
            None => Error::WriteFailed(msg),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::BindValue;
    use chrono::{TimeZone, Utc};

    fn sample_note() -> NoteEntity {
        NoteEntity {
            note_id: FieldState::Value(9),
            title: FieldState::Value("groceries".to_string()),
            content: FieldState::Null,
            author_id: FieldState::Value(7),
            updated_at: FieldState::Value(Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap()),
            embeddings: FieldState::Unset,
            permissions: FieldState::Unset,
        }
    }

    /// Reconstruct an entity from a filter map the way a row mapper would,
    /// to check the field-map round-trip law.
    fn note_from_filter_map(map: &FieldMap) -> NoteEntity {
        let mut note = NoteEntity::default();
        for (column, value) in map.iter() {
            match (*column, value) {
                ("id", BindValue::BigInt(v)) => note.note_id = (*v).into(),
                ("title", BindValue::Text(v)) => note.title = v.clone().into(),
                ("content", BindValue::Text(v)) => note.content = v.clone().into(),
                ("author_id", BindValue::BigInt(v)) => note.author_id = (*v).into(),
                ("updated_at", BindValue::Timestamp(v)) => note.updated_at = (*v).into(),
                other => panic!("unexpected entry {:?}", other),
            }
        }
        note
    }

    #[test]
    fn test_field_map_round_trip_preserves_non_unset_fields() {
        let note = sample_note();
        let rebuilt = note_from_filter_map(&content_filter_map(&note));
        assert_eq!(rebuilt, note);
    }

    #[test]
    fn test_field_map_skips_unset_fields() {
        let note = NoteEntity {
            title: FieldState::Value("only title".to_string()),
            ..Default::default()
        };
        let map = content_filter_map(&note);
        assert_eq!(map.len(), 1);
        let rebuilt = note_from_filter_map(&map);
        assert!(rebuilt.note_id.is_unset());
        assert!(rebuilt.content.is_unset());
        assert_eq!(rebuilt.title, note.title);
    }

    #[test]
    fn test_set_map_excludes_primary_key() {
        let note = sample_note();
        let columns: Vec<&str> = content_set_map(&note).columns().collect();
        assert!(!columns.contains(&"id"));
        assert_eq!(columns, vec!["title", "content", "author_id", "updated_at"]);
    }

    #[test]
    fn test_null_content_round_trips_as_null() {
        let note = sample_note();
        let rebuilt = note_from_filter_map(&content_filter_map(&note));
        assert!(rebuilt.content.is_null());
    }
}
