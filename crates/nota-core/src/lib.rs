//! # nota-core
//!
//! Core types, traits, and abstractions for the nota note service.
//!
//! This crate provides the foundational data structures and trait definitions
//! that the other nota crates depend on: the three-state field model used for
//! partial mutations, the note aggregate entities, the error taxonomy, and
//! the repository/backend traits implemented by `nota-db` and
//! `nota-inference`.

pub mod defaults;
pub mod error;
pub mod field;
pub mod logging;
pub mod models;
pub mod traits;
pub mod vector_codec;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use field::FieldState;
pub use models::*;
pub use traits::*;
pub use vector_codec::{text_to_vector, vector_to_text};
