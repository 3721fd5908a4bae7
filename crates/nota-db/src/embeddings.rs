//! Note embedding repository implementation.
//!
//! Owns the embedding backend: callers hand it text, it stores the
//! generated vector. One row per `(note_id, model)`.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use sqlx::{Postgres, Transaction};
use tracing::debug;

use nota_core::{
    text_to_vector, EmbeddingBackend, FieldState, NoteEmbedding, NoteEmbeddingRepository, Result,
    Vector,
};

use crate::statement::FieldMap;
use crate::table::{field_from_row, Table};

/// The `note.embedding` relation.
pub const EMBEDDING_TABLE: &str = "note.embedding";

pub(crate) fn embedding_field_map(embedding: &NoteEmbedding) -> FieldMap {
    FieldMap::new()
        .field("note_id", &embedding.note_id)
        .field("model", &embedding.model)
        .field("embedding", &embedding.embedding)
}

/// Decode the stored vector. The column is a pgvector value, but a row
/// sourced from a text-typed context decodes through the storage-string
/// codec instead; an already-decoded vector passes through unchanged.
fn embedding_from_column(row: &PgRow) -> Result<FieldState<Vector>> {
    use sqlx::Row;
    match row.try_get::<Option<Vector>, _>("embedding") {
        Ok(value) => Ok(value.into()),
        Err(_) => {
            let text: Option<String> = row.try_get("embedding").map_err(nota_core::Error::Database)?;
            match text {
                Some(s) => Ok(FieldState::Value(text_to_vector(&s)?)),
                None => Ok(FieldState::Null),
            }
        }
    }
}

pub(crate) fn embedding_from_row(row: &PgRow) -> Result<NoteEmbedding> {
    Ok(NoteEmbedding {
        note_id: field_from_row(row, "note_id")?,
        model: field_from_row(row, "model")?,
        embedding: embedding_from_column(row)?,
    })
}

/// PostgreSQL implementation of [`NoteEmbeddingRepository`].
pub struct PgNoteEmbeddingRepository {
    table: Table,
    backend: Arc<dyn EmbeddingBackend>,
}

impl PgNoteEmbeddingRepository {
    /// Create a new repository over the given connection pool and
    /// embedding backend.
    pub fn new(pool: PgPool, backend: Arc<dyn EmbeddingBackend>) -> Self {
        Self {
            table: Table::new(pool, EMBEDDING_TABLE, &["note_id", "model"]),
            backend,
        }
    }

    /// Handle on the embedding backend, shared with the semantic search
    /// strategy.
    pub fn backend(&self) -> Arc<dyn EmbeddingBackend> {
        Arc::clone(&self.backend)
    }

    /// Generate the embedding for a note's text and store it, within an
    /// existing transaction. The document is the title and content
    /// joined; an empty title contributes nothing.
    pub async fn generate_and_insert_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        note_id: i64,
        title: &str,
        content: &str,
    ) -> Result<NoteEmbedding> {
        let document = if title.is_empty() {
            content.to_string()
        } else {
            format!("{}\n\n{}", title, content)
        };
        let vector = self.backend.embed(&document).await?;
        debug!(
            subsystem = "database",
            component = "embeddings",
            op = "generate",
            note_id = note_id,
            model = self.backend.model_name(),
            "Generated embedding for note"
        );

        let embedding = NoteEmbedding {
            note_id: FieldState::Value(note_id),
            model: FieldState::Value(self.backend.model_name().to_string()),
            embedding: FieldState::Value(vector),
        };
        let row = self
            .table
            .insert_tx(tx, &embedding_field_map(&embedding))
            .await?;
        embedding_from_row(&row)
    }

    /// Remove every embedding row of a note; zero rows is fine.
    pub async fn delete_for_note_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        note_id: i64,
    ) -> Result<u64> {
        self.table
            .delete_all_tx(tx, &embedding_field_map(&NoteEmbedding::for_note(note_id)))
            .await
    }
}

#[async_trait]
impl NoteEmbeddingRepository for PgNoteEmbeddingRepository {
    async fn insert(&self, embedding: &NoteEmbedding) -> Result<NoteEmbedding> {
        let row = self.table.insert(&embedding_field_map(embedding)).await?;
        embedding_from_row(&row)
    }

    async fn update(&self, set: &NoteEmbedding, filter: &NoteEmbedding) -> Result<NoteEmbedding> {
        let row = self
            .table
            .update(&embedding_field_map(set), &embedding_field_map(filter))
            .await?;
        embedding_from_row(&row)
    }

    async fn delete(&self, filter: &NoteEmbedding) -> Result<NoteEmbedding> {
        let row = self.table.delete(&embedding_field_map(filter)).await?;
        embedding_from_row(&row)
    }

    async fn select(&self, filter: &NoteEmbedding) -> Result<Vec<NoteEmbedding>> {
        let rows = self.table.select(&embedding_field_map(filter)).await?;
        rows.iter().map(embedding_from_row).collect()
    }

    async fn select_for_note(&self, note_id: i64) -> Result<Vec<NoteEmbedding>> {
        self.select(&NoteEmbedding::for_note(note_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_map_skips_unset_vector() {
        let e = NoteEmbedding {
            note_id: FieldState::Value(1),
            model: FieldState::Value("nomic-embed-text".to_string()),
            embedding: FieldState::Unset,
        };
        let columns: Vec<&str> = embedding_field_map(&e).columns().collect();
        assert_eq!(columns, vec!["note_id", "model"]);
    }

    #[test]
    fn test_field_map_carries_vector_param() {
        let e = NoteEmbedding {
            note_id: FieldState::Value(1),
            model: FieldState::Value("nomic-embed-text".to_string()),
            embedding: FieldState::Value(Vector::from(vec![0.5, 0.25])),
        };
        let map = embedding_field_map(&e);
        assert_eq!(map.len(), 3);
    }
}
