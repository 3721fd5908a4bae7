//! Note aggregate store.
//!
//! The single place that understands "a note" as the union of the
//! content, embedding, and permission relations. Multi-relation writes
//! run inside one transaction, so a failed insert leaves no partial
//! aggregate and a refused delete restores its children.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, info};

use nota_core::{
    EmbeddingBackend, Error, FieldState, NoteContentRepository, NoteEntity, NoteStore, Pagination,
    Result, SearchType, UserContext,
};

use crate::content::PgNoteContentRepository;
use crate::embeddings::PgNoteEmbeddingRepository;
use crate::permissions::PgNotePermissionRepository;
use crate::search::{NoteSearchStrategy, SearchParams};

use nota_core::{NoteEmbeddingRepository, NotePermissionRepository};

/// PostgreSQL implementation of [`NoteStore`], composing the three
/// per-relation repositories.
pub struct PgNoteStore {
    pool: PgPool,
    content: PgNoteContentRepository,
    embeddings: PgNoteEmbeddingRepository,
    permissions: PgNotePermissionRepository,
}

impl PgNoteStore {
    /// Create a new store over the given connection pool and embedding
    /// backend.
    pub fn new(pool: PgPool, backend: Arc<dyn EmbeddingBackend>) -> Self {
        Self {
            content: PgNoteContentRepository::new(pool.clone()),
            embeddings: PgNoteEmbeddingRepository::new(pool.clone(), backend),
            permissions: PgNotePermissionRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl NoteStore for PgNoteStore {
    async fn insert(&self, mut note: NoteEntity) -> Result<NoteEntity> {
        // Embeddings are derived from content, never accepted as input.
        if let FieldState::Value(embeddings) = &note.embeddings {
            if !embeddings.is_empty() {
                return Err(Error::InvalidInput(
                    "embeddings are derived on insert and must not be supplied".to_string(),
                ));
            }
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let mut inserted = self.content.insert_tx(&mut tx, &note).await?;
        let note_id = inserted
            .note_id
            .value()
            .copied()
            .ok_or_else(|| Error::WriteFailed("note.content insert returned no id".to_string()))?;
        debug!(
            subsystem = "database",
            component = "note_store",
            op = "insert",
            note_id = note_id,
            "Inserted content row"
        );

        let mut embeddings = Vec::new();
        let content_text = inserted.content.value().cloned().unwrap_or_default();
        if !content_text.is_empty() {
            let title_text = inserted.title.value().cloned().unwrap_or_default();
            let embedding = self
                .embeddings
                .generate_and_insert_tx(&mut tx, note_id, &title_text, &content_text)
                .await?;
            embeddings.push(embedding);
        }

        let mut permissions = Vec::new();
        if let FieldState::Value(requested) = note.permissions.take() {
            for mut permission in requested {
                permission.note_id = FieldState::Value(note_id);
                let stored = self.permissions.insert_tx(&mut tx, &permission).await?;
                permissions.push(stored);
            }
        }

        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "database",
            component = "note_store",
            op = "insert",
            note_id = note_id,
            result_count = permissions.len(),
            "Inserted note aggregate"
        );

        inserted.embeddings = FieldState::Value(embeddings);
        inserted.permissions = FieldState::Value(permissions);
        Ok(inserted)
    }

    async fn update(&self, note: NoteEntity, _ctx: &UserContext) -> Result<NoteEntity> {
        // Content subset only; the key and the child collections never
        // reach the SET clause.
        let mut set = note.clone();
        set.note_id = FieldState::Unset;
        set.embeddings = FieldState::Unset;
        set.permissions = FieldState::Unset;

        let filter = NoteEntity {
            note_id: note.note_id,
            ..Default::default()
        };
        let mut updated = self.content.update(&set, &filter).await?;

        // Children echo the caller's view, they are not re-read from
        // storage.
        updated.embeddings = FieldState::Value(note.embeddings.into_value().unwrap_or_default());
        updated.permissions = FieldState::Value(note.permissions.into_value().unwrap_or_default());
        Ok(updated)
    }

    async fn delete(&self, note_id: i64, ctx: &UserContext) -> Result<NoteEntity> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        self.embeddings.delete_for_note_tx(&mut tx, note_id).await?;
        self.permissions.delete_for_note_tx(&mut tx, note_id).await?;

        let filter = NoteEntity {
            note_id: FieldState::Value(note_id),
            author_id: FieldState::Value(ctx.user_id),
            ..Default::default()
        };
        let deleted = match self.content.delete_tx(&mut tx, &filter).await {
            Ok(entity) => entity,
            // No matching row: wrong id or wrong owner. The dropped
            // transaction restores the children.
            Err(Error::WriteFailed(_)) => {
                return Err(Error::NotFound(format!(
                    "note {} owned by user {}",
                    note_id, ctx.user_id
                )))
            }
            Err(other) => return Err(other),
        };

        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "database",
            component = "note_store",
            op = "delete",
            note_id = note_id,
            user_id = ctx.user_id,
            "Deleted note aggregate"
        );
        Ok(deleted)
    }

    async fn select_by_id(&self, note_id: i64, _ctx: &UserContext) -> Result<Option<NoteEntity>> {
        let Some(mut note) = self.content.select_by_id(note_id).await? else {
            return Ok(None);
        };

        note.embeddings = FieldState::Value(self.embeddings.select_for_note(note_id).await?);
        note.permissions = FieldState::Value(self.permissions.select_for_note(note_id).await?);
        Ok(Some(note))
    }

    async fn search_notes(
        &self,
        search_type: SearchType,
        query: &str,
        ctx: &UserContext,
        pagination: Pagination,
    ) -> Result<Vec<NoteEntity>> {
        let params = SearchParams {
            query: query.to_string(),
            limit: pagination.limit,
            offset: pagination.offset,
            user_id: ctx.user_id,
        };
        debug!(
            subsystem = "database",
            component = "note_store",
            op = "search",
            user_id = ctx.user_id,
            query = query,
            "Dispatching {} search",
            search_type
        );

        let strategy = NoteSearchStrategy::for_type(
            search_type,
            self.pool.clone(),
            params,
            self.embeddings.backend(),
        );
        strategy.search().await
    }
}
