//! Core data models for the nota note service.
//!
//! A "note" is an aggregate of three relations joined only by `note_id`:
//! one `note.content` row, zero-or-more `note.embedding` rows, and
//! zero-or-more `note.permission` rows. Nothing in the storage layer
//! enforces that boundary; the facade in `nota-db` is the single place
//! that understands the aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{Error, Result};
use crate::field::FieldState;

// Re-export the pgvector vector type used throughout the workspace.
pub use pgvector::Vector;

/// One logical note. Every field is three-state so the same type expresses
/// full rows, partial updates, and filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteEntity {
    /// Server-assigned primary key of the content row.
    #[serde(default, skip_serializing_if = "FieldState::is_unset")]
    pub note_id: FieldState<i64>,
    #[serde(default, skip_serializing_if = "FieldState::is_unset")]
    pub title: FieldState<String>,
    #[serde(default, skip_serializing_if = "FieldState::is_unset")]
    pub content: FieldState<String>,
    #[serde(default, skip_serializing_if = "FieldState::is_unset")]
    pub author_id: FieldState<i64>,
    #[serde(default, skip_serializing_if = "FieldState::is_unset")]
    pub updated_at: FieldState<DateTime<Utc>>,
    /// Child rows of `note.embedding`. Derived on insert, never accepted
    /// from the caller.
    #[serde(default, skip_serializing_if = "FieldState::is_unset")]
    pub embeddings: FieldState<Vec<NoteEmbedding>>,
    /// Child rows of `note.permission`.
    #[serde(default, skip_serializing_if = "FieldState::is_unset")]
    pub permissions: FieldState<Vec<NotePermission>>,
}

impl NoteEntity {
    /// Filter entity matching a single note by id.
    pub fn by_id(note_id: i64) -> Self {
        Self {
            note_id: FieldState::Value(note_id),
            ..Default::default()
        }
    }
}

/// One record of `note.embedding`: the model which created the embedding,
/// the embedding itself, and the note it belongs to. Composite identity
/// `(note_id, model)` — one embedding per model per note.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteEmbedding {
    #[serde(default, skip_serializing_if = "FieldState::is_unset")]
    pub note_id: FieldState<i64>,
    #[serde(default, skip_serializing_if = "FieldState::is_unset")]
    pub model: FieldState<String>,
    #[serde(default, skip_serializing_if = "FieldState::is_unset")]
    pub embedding: FieldState<Vector>,
}

impl NoteEmbedding {
    /// Filter entity matching all embedding rows of a note.
    pub fn for_note(note_id: i64) -> Self {
        Self {
            note_id: FieldState::Value(note_id),
            ..Default::default()
        }
    }
}

/// One record of `note.permission`, granting a role access to a note.
/// Composite identity `(note_id, role_id)`; rows have no independent
/// lifecycle and are managed by the facade alongside the content row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotePermission {
    #[serde(default, skip_serializing_if = "FieldState::is_unset")]
    pub note_id: FieldState<i64>,
    #[serde(default, skip_serializing_if = "FieldState::is_unset")]
    pub role_id: FieldState<i64>,
}

impl NotePermission {
    /// Permission row for a role; `note_id` is back-filled by the facade
    /// on insert.
    pub fn for_role(role_id: i64) -> Self {
        Self {
            note_id: FieldState::Unset,
            role_id: FieldState::Value(role_id),
        }
    }

    /// Filter entity matching all permission rows of a note.
    pub fn for_note(note_id: i64) -> Self {
        Self {
            note_id: FieldState::Value(note_id),
            role_id: FieldState::Unset,
        }
    }
}

/// A registered author. Notes reference users through
/// `note.content.author_id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserEntity {
    #[serde(default, skip_serializing_if = "FieldState::is_unset")]
    pub id: FieldState<i64>,
    #[serde(default, skip_serializing_if = "FieldState::is_unset")]
    pub discord_id: FieldState<i64>,
    #[serde(default, skip_serializing_if = "FieldState::is_unset")]
    pub avatar_url: FieldState<String>,
}

/// Access bits carried by a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RolePermissions(u8);

impl RolePermissions {
    pub const NONE: Self = Self(0);
    pub const READ: Self = Self(0b0001);
    pub const WRITE: Self = Self(0b0010);
    pub const EXECUTE: Self = Self(0b0100);
    pub const ALL: Self = Self(0b0111);

    /// Raw bit representation.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Reconstruct from raw bits, masking unknown bits off.
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// True if every bit of `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for RolePermissions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Pagination parameters shared by list and search operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Pagination {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: defaults::PAGE_LIMIT,
            offset: defaults::PAGE_OFFSET,
        }
    }
}

/// The requesting user, threaded through every facade operation for
/// ownership and access scoping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserContext {
    pub user_id: i64,
}

impl UserContext {
    pub fn new(user_id: i64) -> Self {
        Self { user_id }
    }
}

/// The four interchangeable note-ranking algorithms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    /// No query ranking; newest first.
    NoSearch,
    /// Lexical web-search match against the title.
    FullTextTitle,
    /// Trigram similarity across title and content.
    Fuzzy,
    /// Embedding-vector cosine similarity. Default when the caller leaves
    /// the type unspecified.
    #[default]
    Context,
}

impl SearchType {
    /// Decode a transport-level search type code.
    ///
    /// Code 0 means "unspecified" and resolves to [`SearchType::Context`].
    /// Unknown codes are rejected before any query is issued.
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(SearchType::Context),
            1 => Ok(SearchType::NoSearch),
            2 => Ok(SearchType::FullTextTitle),
            3 => Ok(SearchType::Fuzzy),
            4 => Ok(SearchType::Context),
            other => Err(Error::InvalidInput(format!(
                "unknown search type code: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for SearchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSearch => write!(f, "no_search"),
            Self::FullTextTitle => write!(f, "full_text_title"),
            Self::Fuzzy => write!(f, "fuzzy"),
            Self::Context => write!(f, "context"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_entity_default_is_all_unset() {
        let note = NoteEntity::default();
        assert!(note.note_id.is_unset());
        assert!(note.title.is_unset());
        assert!(note.content.is_unset());
        assert!(note.author_id.is_unset());
        assert!(note.updated_at.is_unset());
        assert!(note.embeddings.is_unset());
        assert!(note.permissions.is_unset());
    }

    #[test]
    fn test_note_by_id_sets_only_the_key() {
        let note = NoteEntity::by_id(42);
        assert_eq!(note.note_id, FieldState::Value(42));
        assert!(note.title.is_unset());
        assert!(note.permissions.is_unset());
    }

    #[test]
    fn test_permission_for_role_leaves_note_unset() {
        let p = NotePermission::for_role(3);
        assert!(p.note_id.is_unset());
        assert_eq!(p.role_id, FieldState::Value(3));
    }

    #[test]
    fn test_role_permissions_bits() {
        let rw = RolePermissions::READ | RolePermissions::WRITE;
        assert!(rw.contains(RolePermissions::READ));
        assert!(rw.contains(RolePermissions::WRITE));
        assert!(!rw.contains(RolePermissions::EXECUTE));
        assert!(RolePermissions::ALL.contains(rw));
        assert_eq!(RolePermissions::from_bits_truncate(0xFF), RolePermissions::ALL);
    }

    #[test]
    fn test_search_type_from_code() {
        assert_eq!(SearchType::from_code(0).unwrap(), SearchType::Context);
        assert_eq!(SearchType::from_code(1).unwrap(), SearchType::NoSearch);
        assert_eq!(SearchType::from_code(2).unwrap(), SearchType::FullTextTitle);
        assert_eq!(SearchType::from_code(3).unwrap(), SearchType::Fuzzy);
        assert_eq!(SearchType::from_code(4).unwrap(), SearchType::Context);
    }

    #[test]
    fn test_search_type_unknown_code_is_invalid_input() {
        let err = SearchType::from_code(9).unwrap_err();
        match err {
            Error::InvalidInput(msg) => assert!(msg.contains("9")),
            other => panic!("Expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_search_type_display() {
        assert_eq!(SearchType::NoSearch.to_string(), "no_search");
        assert_eq!(SearchType::Context.to_string(), "context");
    }

    #[test]
    fn test_pagination_default() {
        let p = Pagination::default();
        assert_eq!(p.limit, defaults::PAGE_LIMIT);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_note_entity_serde_round_trip() {
        let note = NoteEntity {
            note_id: FieldState::Value(1),
            title: FieldState::Null,
            content: FieldState::Value("body".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&note).unwrap();
        let back: NoteEntity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, note);
        // Unset fields never hit the wire.
        assert!(!json.contains("author_id"));
        assert!(json.contains(r#""title":null"#));
    }
}
