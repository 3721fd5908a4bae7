//! Note search strategies.
//!
//! Four interchangeable ranking algorithms behind one closed enum. Every
//! strategy returns content rows only (child collections stay `Unset`),
//! paginates with `(limit, offset)`, and applies the same user scoping
//! predicate (`author_id = $user`) inside its query.

use std::sync::Arc;
use std::time::Instant;

use sqlx::postgres::PgRow;
use sqlx::PgPool;
use tracing::debug;

use nota_core::{EmbeddingBackend, Error, NoteEntity, Result, SearchType};

use crate::content::note_from_row;

/// Parameters common to every strategy.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub query: String,
    pub limit: i64,
    pub offset: i64,
    pub user_id: i64,
}

/// One of the four ranking algorithms, selected per request.
pub enum NoteSearchStrategy {
    /// Newest first; the query text is ignored.
    Date(DateSearch),
    /// Lexical web-search match against the title.
    TitleFullText(TitleFullTextSearch),
    /// Trigram similarity across title and content.
    Fuzzy(FuzzySearch),
    /// Embedding-vector cosine similarity.
    Semantic(SemanticSearch),
}

impl NoteSearchStrategy {
    /// Select the strategy for a search type. The match is exhaustive:
    /// an unknown type cannot reach this point, it is rejected when the
    /// transport code decodes [`SearchType`].
    pub fn for_type(
        search_type: SearchType,
        pool: PgPool,
        params: SearchParams,
        backend: Arc<dyn EmbeddingBackend>,
    ) -> Self {
        match search_type {
            SearchType::NoSearch => Self::Date(DateSearch { pool, params }),
            SearchType::FullTextTitle => {
                Self::TitleFullText(TitleFullTextSearch { pool, params })
            }
            SearchType::Fuzzy => Self::Fuzzy(FuzzySearch { pool, params }),
            SearchType::Context => Self::Semantic(SemanticSearch {
                pool,
                params,
                backend,
            }),
        }
    }

    /// Run the strategy, producing an ordered, paginated note list.
    pub async fn search(&self) -> Result<Vec<NoteEntity>> {
        let start = Instant::now();
        let (name, notes) = match self {
            Self::Date(s) => ("date", s.search().await?),
            Self::TitleFullText(s) => ("title_fts", s.search().await?),
            Self::Fuzzy(s) => ("fuzzy", s.search().await?),
            Self::Semantic(s) => ("semantic", s.search().await?),
        };
        debug!(
            subsystem = "search",
            component = name,
            op = "search",
            result_count = notes.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Search complete"
        );
        Ok(notes)
    }
}

fn notes_from_rows(rows: Vec<PgRow>) -> Result<Vec<NoteEntity>> {
    rows.iter().map(note_from_row).collect()
}

/// Date ordering for "no search": most recently updated first.
pub struct DateSearch {
    pub(crate) pool: PgPool,
    pub(crate) params: SearchParams,
}

impl DateSearch {
    async fn search(&self) -> Result<Vec<NoteEntity>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.title, c.content, c.author_id, c.updated_at
            FROM note.content c
            WHERE c.author_id = $1
            ORDER BY c.updated_at DESC NULLS LAST
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(self.params.user_id)
        .bind(self.params.limit)
        .bind(self.params.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        notes_from_rows(rows)
    }
}

/// Lexical title search using the web-search query operator; ranked by
/// `ts_rank`, ties broken by recency.
pub struct TitleFullTextSearch {
    pub(crate) pool: PgPool,
    pub(crate) params: SearchParams,
}

impl TitleFullTextSearch {
    async fn search(&self) -> Result<Vec<NoteEntity>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.title, c.content, c.author_id, c.updated_at,
                   ts_rank(
                       to_tsvector('english', COALESCE(c.title, '')),
                       websearch_to_tsquery('english', $1)
                   ) AS score
            FROM note.content c
            WHERE to_tsvector('english', COALESCE(c.title, ''))
                      @@ websearch_to_tsquery('english', $1)
              AND c.author_id = $2
            ORDER BY score DESC, c.updated_at DESC NULLS LAST
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(&self.params.query)
        .bind(self.params.user_id)
        .bind(self.params.limit)
        .bind(self.params.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        notes_from_rows(rows)
    }
}

/// Approximate match across title and content via pg_trgm; the `%`
/// operator prefilters at the extension's similarity threshold.
pub struct FuzzySearch {
    pub(crate) pool: PgPool,
    pub(crate) params: SearchParams,
}

impl FuzzySearch {
    async fn search(&self) -> Result<Vec<NoteEntity>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.title, c.content, c.author_id, c.updated_at,
                   GREATEST(
                       similarity(COALESCE(c.title, ''), $1),
                       similarity(COALESCE(c.content, ''), $1)
                   ) AS score
            FROM note.content c
            WHERE (COALESCE(c.title, '') % $1 OR COALESCE(c.content, '') % $1)
              AND c.author_id = $2
            ORDER BY score DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(&self.params.query)
        .bind(self.params.user_id)
        .bind(self.params.limit)
        .bind(self.params.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        notes_from_rows(rows)
    }
}

/// Semantic search: embed the query, rank stored note embeddings by
/// cosine distance ascending. One hit per note even when several models
/// have embedded it.
pub struct SemanticSearch {
    pub(crate) pool: PgPool,
    pub(crate) params: SearchParams,
    pub(crate) backend: Arc<dyn EmbeddingBackend>,
}

impl SemanticSearch {
    async fn search(&self) -> Result<Vec<NoteEntity>> {
        let query_vec = self.backend.embed(&self.params.query).await?;
        debug!(
            subsystem = "search",
            component = "semantic",
            op = "embed_query",
            model = self.backend.model_name(),
            "Query vectorized"
        );

        let rows = sqlx::query(
            r#"
            SELECT id, title, content, author_id, updated_at
            FROM (
                SELECT DISTINCT ON (e.note_id)
                       c.id, c.title, c.content, c.author_id, c.updated_at,
                       e.embedding <=> $1::vector AS distance
                FROM note.embedding e
                JOIN note.content c ON c.id = e.note_id
                WHERE c.author_id = $2
                ORDER BY e.note_id, e.embedding <=> $1::vector
            ) sub
            ORDER BY distance ASC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(&query_vec)
        .bind(self.params.user_id)
        .bind(self.params.limit)
        .bind(self.params.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        notes_from_rows(rows)
    }
}
