//! Core traits for nota abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability. The
//! Postgres implementations live in `nota-db`; the embedding backends
//! in `nota-inference`.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// PER-RELATION REPOSITORY TRAITS
// =============================================================================

/// Repository over the `note.content` relation.
///
/// Filters are expressed as entities: every non-`Unset` field becomes an
/// equality predicate. `select` with zero matches yields an empty vector,
/// never an error.
#[async_trait]
pub trait NoteContentRepository: Send + Sync {
    /// Insert a content row; the returned entity carries the
    /// server-assigned id.
    async fn insert(&self, note: &NoteEntity) -> Result<NoteEntity>;

    /// Update the non-`Unset` fields of `set` on every row matching
    /// `filter`. An all-`Unset` filter is rejected.
    async fn update(&self, set: &NoteEntity, filter: &NoteEntity) -> Result<NoteEntity>;

    /// Delete the row matching `filter`. An all-`Unset` filter is rejected.
    async fn delete(&self, filter: &NoteEntity) -> Result<NoteEntity>;

    /// Select all rows matching `filter`.
    async fn select(&self, filter: &NoteEntity) -> Result<Vec<NoteEntity>>;

    /// Select a single row by primary key.
    async fn select_by_id(&self, note_id: i64) -> Result<Option<NoteEntity>>;
}

/// Repository over the `note.permission` relation.
#[async_trait]
pub trait NotePermissionRepository: Send + Sync {
    async fn insert(&self, permission: &NotePermission) -> Result<NotePermission>;

    async fn update(
        &self,
        set: &NotePermission,
        filter: &NotePermission,
    ) -> Result<NotePermission>;

    async fn delete(&self, filter: &NotePermission) -> Result<NotePermission>;

    async fn select(&self, filter: &NotePermission) -> Result<Vec<NotePermission>>;

    /// All permission rows of one note.
    async fn select_for_note(&self, note_id: i64) -> Result<Vec<NotePermission>>;
}

/// Repository over the `note.embedding` relation.
#[async_trait]
pub trait NoteEmbeddingRepository: Send + Sync {
    async fn insert(&self, embedding: &NoteEmbedding) -> Result<NoteEmbedding>;

    async fn update(&self, set: &NoteEmbedding, filter: &NoteEmbedding) -> Result<NoteEmbedding>;

    async fn delete(&self, filter: &NoteEmbedding) -> Result<NoteEmbedding>;

    async fn select(&self, filter: &NoteEmbedding) -> Result<Vec<NoteEmbedding>>;

    /// All embedding rows of one note.
    async fn select_for_note(&self, note_id: i64) -> Result<Vec<NoteEmbedding>>;
}

/// Repository over the `app_user` relation.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, user: &UserEntity) -> Result<UserEntity>;

    /// Update the non-`Unset` fields, keyed by `user.id`.
    async fn update(&self, user: &UserEntity) -> Result<UserEntity>;

    async fn select(&self, id: i64) -> Result<Option<UserEntity>>;

    async fn select_by_discord_id(&self, discord_id: i64) -> Result<Option<UserEntity>>;
}

// =============================================================================
// NOTE AGGREGATE FACADE
// =============================================================================

/// Note operations that span the three relations making up the aggregate.
///
/// Each call is a single request/response cycle; no state is held between
/// calls. Multi-relation writes run inside one transaction.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Insert a full note: content row, one derived embedding when the
    /// content is non-empty, and the caller's permission rows with
    /// `note_id` back-filled. Pre-supplied embeddings are rejected —
    /// embeddings are always derived. Returns the fully-resolved entity.
    async fn insert(&self, note: NoteEntity) -> Result<NoteEntity>;

    /// Update the content row only, keyed by `note_id`. Embeddings and
    /// permissions are excluded from the write and echoed back from the
    /// argument verbatim — they are NOT re-read from storage.
    async fn update(&self, note: NoteEntity, ctx: &UserContext) -> Result<NoteEntity>;

    /// Delete a note owned by the requesting user, cascading embedding
    /// and permission children. Fails with `NotFound` when no content row
    /// matches `(note_id, ctx.user_id)`.
    async fn delete(&self, note_id: i64, ctx: &UserContext) -> Result<NoteEntity>;

    /// Fetch the whole aggregate by id, or `None` when the content row
    /// does not exist.
    async fn select_by_id(&self, note_id: i64, ctx: &UserContext) -> Result<Option<NoteEntity>>;

    /// Rank notes visible to the requesting user with the selected
    /// strategy.
    async fn search_notes(
        &self,
        search_type: SearchType,
        query: &str,
        ctx: &UserContext,
        pagination: Pagination,
    ) -> Result<Vec<NoteEntity>>;
}

// =============================================================================
// INFERENCE TRAITS
// =============================================================================

/// Backend for generating text embeddings.
///
/// Implementations are deterministic for a fixed model and input and do
/// not retry: an inference failure propagates as `Error::Embedding` and
/// aborts the calling insert/search.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Generate the embedding vector for one text.
    async fn embed(&self, text: &str) -> Result<Vector>;

    /// Expected dimension of generated vectors.
    fn dimension(&self) -> usize;

    /// Name of the model producing the vectors.
    fn model_name(&self) -> &str;
}
