//! Text → vector strategies.
//!
//! `HashVectorizer` is a placeholder: feature-hashed token counts, useful for
//! lexical overlap but carrying no semantics. A real embedding model plugs in
//! by implementing `Vectorizer`.

use sha2::{Digest, Sha256};

use crate::vector_math::normalize;

pub trait Vectorizer: Send + Sync {
    /// Length of every vector this vectorizer produces.
    fn dimension(&self) -> usize;

    /// Deterministic and infallible.
    fn vectorize(&self, text: &str) -> Vec<f32>;
}

#[derive(Debug, Clone)]
pub struct HashVectorizer {
    dimension: usize,
}

impl HashVectorizer {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn bucket(&self, token: &str) -> (usize, f32) {
        let digest = Sha256::digest(token.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        let hash = u64::from_le_bytes(head);

        let index = (hash % self.dimension as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }
}

impl Vectorizer for HashVectorizer {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in tokenize(text) {
            let (index, sign) = self.bucket(&token);
            vector[index] += sign;
        }
        normalize(&mut vector);
        vector
    }
}

/// Lowercased alphanumeric words. Words containing non-ASCII characters
/// also contribute each character on its own, so unsegmented scripts still
/// share features.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let word = word.to_lowercase();
        if !word.is_ascii() {
            tokens.extend(word.chars().map(String::from));
        }
        tokens.push(word);
    }
    tokens
}
