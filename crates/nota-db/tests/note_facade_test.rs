//! Integration tests for the note facade: multi-relation insert, partial
//! update, ownership-scoped delete, and aggregate reads.
//!
//! Run against a live PostgreSQL with pgvector and pg_trgm; ignored in
//! the default suite.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;
use nota_core::{
    Error, FieldState, NoteEmbeddingRepository, NoteEntity, NotePermission, NoteStore, UserContext,
};
use nota_db::test_fixtures::connect_test;
use nota_db::{PgNoteEmbeddingRepository, PgNoteStore};
use nota_inference::MockEmbeddingBackend;

fn unique_id() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_micros() as i64
}

fn backend() -> Arc<MockEmbeddingBackend> {
    Arc::new(MockEmbeddingBackend::new().with_dimension(64))
}

fn note_for(author_id: i64, title: &str, content: &str) -> NoteEntity {
    NoteEntity {
        title: FieldState::Value(title.to_string()),
        content: FieldState::Value(content.to_string()),
        author_id: FieldState::Value(author_id),
        updated_at: FieldState::Value(Utc::now()),
        ..Default::default()
    }
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL with pgvector"]
async fn test_insert_resolves_full_aggregate() {
    let pool = connect_test().await.unwrap();
    let store = PgNoteStore::new(pool, backend());
    let author = unique_id();
    let ctx = UserContext::new(author);

    let mut note = note_for(author, "reading list", "papers to read this month");
    note.permissions = FieldState::Value(vec![
        NotePermission::for_role(1),
        NotePermission::for_role(2),
    ]);

    let inserted = store.insert(note).await.unwrap();
    let id = *inserted.note_id.value().expect("server-assigned id");

    // Content row plus exactly one derived embedding and both permissions.
    let embeddings = inserted.embeddings.value().unwrap();
    assert_eq!(embeddings.len(), 1);
    assert_eq!(
        embeddings[0].model,
        FieldState::Value("mock-embed".to_string())
    );
    assert_eq!(embeddings[0].note_id, FieldState::Value(id));

    let permissions = inserted.permissions.value().unwrap();
    assert_eq!(permissions.len(), 2);
    assert!(permissions
        .iter()
        .all(|p| p.note_id == FieldState::Value(id)));

    // The aggregate read sees the same state.
    let fetched = store.select_by_id(id, &ctx).await.unwrap().unwrap();
    assert_eq!(fetched.title, inserted.title);
    assert_eq!(fetched.content, inserted.content);
    assert_eq!(fetched.embeddings.value().unwrap().len(), 1);
    assert_eq!(fetched.permissions.value().unwrap().len(), 2);

    store.delete(id, &ctx).await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL with pgvector"]
async fn test_insert_empty_content_skips_embedding() {
    let pool = connect_test().await.unwrap();
    let store = PgNoteStore::new(pool, backend());
    let author = unique_id();
    let ctx = UserContext::new(author);

    let inserted = store
        .insert(note_for(author, "placeholder", ""))
        .await
        .unwrap();
    let id = *inserted.note_id.value().unwrap();

    assert!(inserted.embeddings.value().unwrap().is_empty());
    // Unset permissions resolve to an empty list, same as the stored state.
    assert!(inserted.permissions.value().unwrap().is_empty());

    let fetched = store.select_by_id(id, &ctx).await.unwrap().unwrap();
    assert!(fetched.embeddings.value().unwrap().is_empty());

    store.delete(id, &ctx).await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL with pgvector"]
async fn test_insert_rejects_supplied_embeddings() {
    let pool = connect_test().await.unwrap();
    let store = PgNoteStore::new(pool, backend());
    let author = unique_id();

    let mut note = note_for(author, "smuggled", "vectors from outside");
    note.embeddings = FieldState::Value(vec![nota_core::NoteEmbedding::for_note(1)]);

    let err = store.insert(note).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL with pgvector"]
async fn test_select_missing_note_is_none() {
    let pool = connect_test().await.unwrap();
    let store = PgNoteStore::new(pool, backend());
    let ctx = UserContext::new(1);

    assert!(store.select_by_id(-1, &ctx).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL with pgvector"]
async fn test_update_touches_content_only_and_echoes_children() {
    let pool = connect_test().await.unwrap();
    let store = PgNoteStore::new(pool, backend());
    let author = unique_id();
    let ctx = UserContext::new(author);

    let inserted = store
        .insert(note_for(author, "draft", "first version"))
        .await
        .unwrap();
    let id = *inserted.note_id.value().unwrap();

    let patch = NoteEntity {
        note_id: FieldState::Value(id),
        title: FieldState::Value("final".to_string()),
        ..Default::default()
    };
    let updated = store.update(patch, &ctx).await.unwrap();

    assert_eq!(updated.title, FieldState::Value("final".to_string()));
    // Content untouched by the partial update.
    assert_eq!(updated.content, FieldState::Value("first version".to_string()));
    // Children come back as the caller supplied them (here: nothing),
    // regardless of what storage holds.
    assert!(updated.embeddings.value().unwrap().is_empty());
    assert!(updated.permissions.value().unwrap().is_empty());

    // Storage still has the derived embedding.
    let fetched = store.select_by_id(id, &ctx).await.unwrap().unwrap();
    assert_eq!(fetched.embeddings.value().unwrap().len(), 1);

    store.delete(id, &ctx).await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL with pgvector"]
async fn test_update_without_id_is_precondition_failure() {
    let pool = connect_test().await.unwrap();
    let store = PgNoteStore::new(pool, backend());
    let ctx = UserContext::new(1);

    let patch = NoteEntity {
        title: FieldState::Value("orphan patch".to_string()),
        ..Default::default()
    };
    let err = store.update(patch, &ctx).await.unwrap_err();
    assert!(matches!(err, Error::Precondition(_)));
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL with pgvector"]
async fn test_delete_by_non_owner_is_not_found_and_keeps_note() {
    let pool = connect_test().await.unwrap();
    let store = PgNoteStore::new(pool.clone(), backend());
    let author = unique_id();
    let owner = UserContext::new(author);
    let stranger = UserContext::new(author + 1);

    let inserted = store
        .insert(note_for(author, "mine", "hands off"))
        .await
        .unwrap();
    let id = *inserted.note_id.value().unwrap();

    let err = store.delete(id, &stranger).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    // Whole aggregate still present, children included.
    let fetched = store.select_by_id(id, &owner).await.unwrap().unwrap();
    assert_eq!(fetched.embeddings.value().unwrap().len(), 1);

    store.delete(id, &owner).await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL with pgvector"]
async fn test_delete_cascades_children() {
    let pool = connect_test().await.unwrap();
    let store = PgNoteStore::new(pool.clone(), backend());
    let embeddings = PgNoteEmbeddingRepository::new(pool, backend());
    let author = unique_id();
    let ctx = UserContext::new(author);

    let mut note = note_for(author, "ephemeral", "soon gone");
    note.permissions = FieldState::Value(vec![NotePermission::for_role(9)]);
    let inserted = store.insert(note).await.unwrap();
    let id = *inserted.note_id.value().unwrap();

    store.delete(id, &ctx).await.unwrap();

    assert!(store.select_by_id(id, &ctx).await.unwrap().is_none());
    assert!(embeddings.select_for_note(id).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL with pgvector"]
async fn test_embedding_failure_aborts_insert() {
    let pool = connect_test().await.unwrap();
    let failing = Arc::new(MockEmbeddingBackend::new().with_dimension(64).with_failure());
    let store = PgNoteStore::new(pool.clone(), failing);
    let working = PgNoteStore::new(pool, backend());
    let author = unique_id();
    let ctx = UserContext::new(author);

    let err = store
        .insert(note_for(author, "doomed", "never stored"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Embedding(_)));

    // The content row was rolled back with the rest of the aggregate.
    let leftovers = working
        .search_notes(
            nota_core::SearchType::NoSearch,
            "",
            &ctx,
            nota_core::Pagination::default(),
        )
        .await
        .unwrap();
    assert!(leftovers.is_empty());
}
