//! Bounded answer cache keyed by question and `k`.
//!
//! Entries are tagged with the index version they were computed against and
//! are never served for another version.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use crate::document::Answer;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    question: String,
    k: usize,
}

impl CacheKey {
    fn new(question: &str, k: usize) -> Self {
        let question = question.split_whitespace().collect::<Vec<_>>().join(" ");
        Self { question, k }
    }
}

#[derive(Debug)]
struct CachedAnswer {
    version: u64,
    answer: Answer,
}

/// Whether a query may read from and write to the answer cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Serve cached answers and store new ones.
    #[default]
    Use,
    /// Always run the full pipeline; the result is still stored.
    Bypass,
}

/// An LRU side-table of answers. A capacity of zero disables it.
#[derive(Debug)]
pub struct AnswerCache {
    entries: Option<Mutex<LruCache<CacheKey, CachedAnswer>>>,
}

impl AnswerCache {
    /// Create a cache holding at most `capacity` answers.
    pub fn new(capacity: usize) -> Self {
        Self { entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))) }
    }

    /// Look up the answer for `(question, k)` computed against `version`.
    pub fn get(&self, question: &str, k: usize, version: u64) -> Option<Answer> {
        let mut entries = self.entries.as_ref()?.lock().unwrap_or_else(|e| e.into_inner());
        let key = CacheKey::new(question, k);
        let stale = match entries.get(&key) {
            Some(cached) if cached.version == version => return Some(cached.answer.clone()),
            Some(_) => true,
            None => false,
        };
        if stale {
            entries.pop(&key);
        }
        None
    }

    /// Store the answer for `(question, k)` computed against `version`.
    pub fn insert(&self, question: &str, k: usize, version: u64, answer: Answer) {
        if let Some(entries) = &self.entries {
            let mut entries = entries.lock().unwrap_or_else(|e| e.into_inner());
            entries.put(CacheKey::new(question, k), CachedAnswer { version, answer });
        }
    }

    /// Drop every entry.
    pub fn clear(&self) {
        if let Some(entries) = &self.entries {
            entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
        }
    }

    /// Number of cached answers.
    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |e| e.lock().unwrap_or_else(|e| e.into_inner()).len())
    }

    /// Whether the cache holds no answers.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(text: &str) -> Answer {
        Answer { text: text.to_string(), sources: Vec::new() }
    }

    #[test]
    fn hit_requires_same_version() {
        let cache = AnswerCache::new(4);
        cache.insert("What reduces fever?", 3, 1, answer("aspirin"));
        assert_eq!(cache.get("What reduces fever?", 3, 1), Some(answer("aspirin")));
        assert_eq!(cache.get("What reduces fever?", 3, 2), None);
        // stale entry was evicted on the mismatched lookup
        assert!(cache.is_empty());
    }

    #[test]
    fn key_includes_k_and_normalises_whitespace() {
        let cache = AnswerCache::new(4);
        cache.insert("  What   reduces fever? ", 3, 1, answer("a"));
        assert!(cache.get("What reduces fever?", 3, 1).is_some());
        assert!(cache.get("What reduces fever?", 4, 1).is_none());
    }

    #[test]
    fn capacity_is_bounded() {
        let cache = AnswerCache::new(2);
        cache.insert("a", 1, 1, answer("a"));
        cache.insert("b", 1, 1, answer("b"));
        cache.insert("c", 1, 1, answer("c"));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a", 1, 1).is_none());
    }

    #[test]
    fn zero_capacity_disables_caching() {
        let cache = AnswerCache::new(0);
        cache.insert("a", 1, 1, answer("a"));
        assert!(cache.get("a", 1, 1).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn clear_empties_cache() {
        let cache = AnswerCache::new(2);
        cache.insert("a", 1, 1, answer("a"));
        cache.clear();
        assert!(cache.is_empty());
    }
}
