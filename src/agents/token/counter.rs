//! Token counting utilities

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{PoisonError, RwLock};
use tiktoken_rs::CoreBPE;
use tracing::warn;

use crate::agents::domain::Message;

/// Token counter with caching
///
/// Uses the BPE of the configured model when tiktoken knows it, `cl100k_base`
/// otherwise, and a characters-per-token estimate when no encoding loads.
pub struct TokenCounter {
    /// Cache of text hash -> token count
    cache: RwLock<HashMap<u64, u32>>,
    bpe: Option<CoreBPE>,
    /// Approximate chars per token, used without an encoding
    chars_per_token: f32,
}

impl TokenCounter {
    /// Create a counter with the default encoding
    pub fn new() -> Self {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| warn!("Failed to load cl100k_base encoding: {}", e))
            .ok();
        Self::with_bpe(bpe)
    }

    /// Create a counter matching a model's encoding
    pub fn for_model(model: &str) -> Self {
        match tiktoken_rs::get_bpe_from_model(model) {
            Ok(bpe) => Self::with_bpe(Some(bpe)),
            Err(_) => Self::new(),
        }
    }

    /// Create an estimating counter with a specific chars-per-token ratio
    pub fn with_ratio(chars_per_token: f32) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            bpe: None,
            chars_per_token,
        }
    }

    fn with_bpe(bpe: Option<CoreBPE>) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            bpe,
            chars_per_token: 4.0,
        }
    }

    /// Count tokens in text
    pub fn count(&self, text: &str) -> u32 {
        let hash = Self::hash_text(text);

        if let Some(&count) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&hash)
        {
            return count;
        }

        let count = match &self.bpe {
            Some(bpe) => bpe.encode_with_special_tokens(text).len() as u32,
            None => (text.len() as f32 / self.chars_per_token).ceil() as u32,
        };

        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(hash, count);

        count
    }

    /// Sum of the content tokens of every message
    pub fn count_messages(&self, messages: &[Message]) -> u32 {
        messages.iter().map(|m| self.count(&m.content)).sum()
    }

    fn hash_text(text: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        hasher.finish()
    }

    /// Clear the cache
    pub fn clear_cache(&self) {
        self.cache.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_counter_estimates() {
        let counter = TokenCounter::with_ratio(4.0);
        assert_eq!(counter.count("abcdefgh"), 2);
        assert_eq!(counter.count("abcdefghi"), 3);
        assert_eq!(counter.count(""), 0);
    }

    #[test]
    fn test_bpe_counter_counts_words() {
        let counter = TokenCounter::new();
        let count = counter.count("Hello, I'm here to help!");
        assert!(count > 3 && count < 15);
        assert_eq!(counter.count("Hello, I'm here to help!"), count);
    }

    #[test]
    fn test_count_messages_sums_contents() {
        let counter = TokenCounter::with_ratio(1.0);
        let messages = vec![Message::user("abc"), Message::assistant("de")];
        assert_eq!(counter.count_messages(&messages), 5);
    }
}
