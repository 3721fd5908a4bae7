//! # nota-db
//!
//! PostgreSQL + pgvector database layer for the nota note service.
//!
//! This crate provides:
//! - Connection pool management
//! - A generic parameterized statement builder and relation accessor
//! - Repository implementations for the note aggregate's three relations
//! - The note facade composing them into one logical entity
//! - Four note search strategies, including vector similarity search
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use nota_db::Database;
//! use nota_core::{NoteEntity, NoteStore, FieldState};
//! use nota_inference::OllamaBackend;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = Arc::new(OllamaBackend::from_env());
//!     let db = Database::connect("postgres://localhost/nota", backend).await?;
//!
//!     let note = db.notes.insert(NoteEntity {
//!         title: FieldState::Value("Hello".to_string()),
//!         content: FieldState::Value("world".to_string()),
//!         author_id: FieldState::Value(1),
//!         ..Default::default()
//!     }).await?;
//!
//!     println!("Created note: {:?}", note.note_id);
//!     Ok(())
//! }
//! ```

pub mod content;
pub mod embeddings;
pub mod notes;
pub mod permissions;
pub mod pool;
pub mod search;
pub mod statement;
pub mod table;
pub mod users;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use
// DEFAULT_TEST_DATABASE_URL and setup_schema.
pub mod test_fixtures;

// Re-export core types
pub use nota_core::*;

// Re-export repository implementations
pub use content::PgNoteContentRepository;
pub use embeddings::PgNoteEmbeddingRepository;
pub use notes::PgNoteStore;
pub use permissions::PgNotePermissionRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use search::{NoteSearchStrategy, SearchParams};
pub use statement::{BindValue, FieldMap, Statement};
pub use table::Table;
pub use users::PgUserRepository;

use std::sync::Arc;

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Author registry.
    pub users: PgUserRepository,
    /// Content rows of the note aggregate.
    pub note_content: PgNoteContentRepository,
    /// Permission rows of the note aggregate.
    pub note_permissions: PgNotePermissionRepository,
    /// Embedding rows of the note aggregate.
    pub note_embeddings: PgNoteEmbeddingRepository,
    /// The note facade: aggregate insert/update/delete/select/search.
    pub notes: PgNoteStore,
}

impl Database {
    /// Create a new Database instance from a connection pool and an
    /// embedding backend.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>, backend: Arc<dyn EmbeddingBackend>) -> Self {
        Self {
            users: PgUserRepository::new(pool.clone()),
            note_content: PgNoteContentRepository::new(pool.clone()),
            note_permissions: PgNotePermissionRepository::new(pool.clone()),
            note_embeddings: PgNoteEmbeddingRepository::new(pool.clone(), Arc::clone(&backend)),
            notes: PgNoteStore::new(pool.clone(), backend),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str, backend: Arc<dyn EmbeddingBackend>) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool, backend))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(
        url: &str,
        config: PoolConfig,
        backend: Arc<dyn EmbeddingBackend>,
    ) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool, backend))
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }
}
