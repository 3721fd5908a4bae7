//! # nota-inference
//!
//! Embedding backend abstraction for the nota note service.
//!
//! This crate provides:
//! - The Ollama implementation of [`nota_core::EmbeddingBackend`]
//! - A deterministic mock backend for tests (feature `mock`)
//!
//! # Example
//!
//! ```rust,no_run
//! use nota_inference::OllamaBackend;
//! use nota_core::EmbeddingBackend;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = OllamaBackend::from_env();
//!     let vector = backend.embed("Hello").await.unwrap();
//!     assert_eq!(vector.as_slice().len(), backend.dimension());
//! }
//! ```

pub mod ollama;

// Mock embedding backend for deterministic testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export core types
pub use nota_core::*;

pub use ollama::OllamaBackend;

#[cfg(any(test, feature = "mock"))]
pub use mock::MockEmbeddingBackend;
