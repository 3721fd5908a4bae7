//! Text codec for stored embedding vectors.
//!
//! The store keeps vectors in a bracketed, comma-separated text form with
//! no spaces: `"[1.0,2.0,3.0]"`. Flat vectors only.

use pgvector::Vector;

use crate::error::{Error, Result};

/// Encode a vector as `"[v0,v1,...]"`. An empty vector encodes as `"[]"`.
pub fn vector_to_text(vector: &Vector) -> String {
    let parts: Vec<String> = vector.as_slice().iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(","))
}

/// Decode the text form back into a vector. Exact inverse of
/// [`vector_to_text`] up to f32 print precision; the empty string and
/// `"[]"` both decode to an empty vector.
pub fn text_to_vector(text: &str) -> Result<Vector> {
    let inner = text
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']');
    if inner.is_empty() {
        return Ok(Vector::from(Vec::new()));
    }
    let values = inner
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f32>()
                .map_err(|e| Error::InvalidInput(format!("bad vector component {:?}: {}", part, e)))
        })
        .collect::<Result<Vec<f32>>>()?;
    Ok(Vector::from(values))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_has_no_spaces() {
        let v = Vector::from(vec![1.0, 2.5, -3.0]);
        assert_eq!(vector_to_text(&v), "[1,2.5,-3]");
    }

    #[test]
    fn test_round_trip() {
        let v = Vector::from(vec![0.125, -7.5, 3.0, 0.0]);
        let decoded = text_to_vector(&vector_to_text(&v)).unwrap();
        assert_eq!(decoded, v);
    }

    #[test]
    fn test_round_trip_fractional() {
        let v = Vector::from(vec![0.1, 0.2, 0.30000001]);
        let decoded = text_to_vector(&vector_to_text(&v)).unwrap();
        assert_eq!(decoded.as_slice(), v.as_slice());
    }

    #[test]
    fn test_empty_string_is_empty_vector() {
        assert_eq!(text_to_vector("").unwrap(), Vector::from(Vec::new()));
        assert_eq!(text_to_vector("[]").unwrap(), Vector::from(Vec::new()));
    }

    #[test]
    fn test_decode_tolerates_whitespace() {
        let v = text_to_vector(" [1.0, 2.0 ,3.0] ").unwrap();
        assert_eq!(v, Vector::from(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(text_to_vector("[1.0,abc]").is_err());
    }
}
