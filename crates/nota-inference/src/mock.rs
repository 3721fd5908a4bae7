//! Mock embedding backend for deterministic testing.
//!
//! Produces the same unit-length vector for the same input text, so
//! ranking assertions are reproducible: a query equal to a stored text
//! embeds to the identical vector and sorts first under cosine distance.
//!
//! ## Usage
//!
//! ```rust
//! use nota_inference::mock::MockEmbeddingBackend;
//! use nota_core::EmbeddingBackend;
//!
//! #[tokio::test]
//! async fn test_with_mock_backend() {
//!     let backend = MockEmbeddingBackend::new().with_dimension(8);
//!     let a = backend.embed("alpha").await.unwrap();
//!     let b = backend.embed("alpha").await.unwrap();
//!     assert_eq!(a, b);
//! }
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use nota_core::{EmbeddingBackend, Error, Result, Vector};

#[derive(Debug, Clone)]
struct MockConfig {
    dimension: usize,
    model_name: String,
    fail: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            dimension: 384,
            model_name: "mock-embed".to_string(),
            fail: false,
        }
    }
}

/// Mock embedding backend for testing.
#[derive(Clone, Default)]
pub struct MockEmbeddingBackend {
    config: Arc<MockConfig>,
    call_log: Arc<Mutex<Vec<String>>>,
}

impl MockEmbeddingBackend {
    /// Create a new mock backend with default configuration.
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig::default()),
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the embedding dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        Arc::make_mut(&mut self.config).dimension = dimension;
        self
    }

    /// Set the reported model name.
    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).model_name = name.into();
        self
    }

    /// Make every embed call fail, for error-path testing.
    pub fn with_failure(mut self) -> Self {
        Arc::make_mut(&mut self.config).fail = true;
        self
    }

    /// All texts embedded so far, in call order.
    pub fn embedded_texts(&self) -> Vec<String> {
        self.call_log.lock().unwrap().clone()
    }

    /// Number of embed calls.
    pub fn embed_call_count(&self) -> usize {
        self.call_log.lock().unwrap().len()
    }

    /// Clear the call log.
    pub fn clear_calls(&self) {
        self.call_log.lock().unwrap().clear()
    }

    /// The vector this backend produces for `text`; exposed so tests can
    /// compute expected distances.
    pub fn vector_for(&self, text: &str) -> Vector {
        deterministic_vector(text, self.config.dimension)
    }
}

/// Fold the text's bytes into a fixed-dimension vector and normalize to
/// unit length.
fn deterministic_vector(text: &str, dimension: usize) -> Vector {
    let mut values = vec![0.0f32; dimension];
    for (i, byte) in text.bytes().enumerate() {
        values[i % dimension] += f32::from(byte) / 255.0;
    }
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut values {
            *v /= norm;
        }
    }
    Vector::from(values)
}

#[async_trait]
impl EmbeddingBackend for MockEmbeddingBackend {
    async fn embed(&self, text: &str) -> Result<Vector> {
        self.call_log.lock().unwrap().push(text.to_string());
        if self.config.fail {
            return Err(Error::Embedding("mock backend failure".to_string()));
        }
        Ok(deterministic_vector(text, self.config.dimension))
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }
}
