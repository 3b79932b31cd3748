//! Response Cache
//!
//! Short-TTL cache keyed by (user, normalized question), so an identical
//! question asked twice within a couple of minutes reuses the first answer
//! instead of re-running the tool loop and another LLM round trip.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// TTL response cache. A zero TTL disables caching entirely.
pub struct ResponseCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, (Instant, String)>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    fn enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Normalized key: trimmed, lowercased, whitespace collapsed
    fn key(user_id: &str, question: &str) -> String {
        let normalized = question
            .trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        format!("{}\u{1f}{}", user_id, normalized)
    }

    pub fn get(&self, user_id: &str, question: &str) -> Option<String> {
        if !self.enabled() {
            return None;
        }

        let key = Self::key(user_id, question);
        {
            let entries = self.entries.read().unwrap();
            if let Some((at, answer)) = entries.get(&key) {
                if at.elapsed() < self.ttl {
                    return Some(answer.clone());
                }
            } else {
                return None;
            }
        }

        // Entry exists but expired: drop it
        self.entries.write().unwrap().remove(&key);
        None
    }

    pub fn put(&self, user_id: &str, question: &str, answer: &str) {
        if !self.enabled() {
            return;
        }

        let mut entries = self.entries.write().unwrap();
        // Lazy eviction keeps the map from accumulating dead answers
        entries.retain(|_, (at, _)| at.elapsed() < self.ttl);
        entries.insert(Self::key(user_id, question), (Instant::now(), answer.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_within_ttl_and_normalization() {
        let cache = ResponseCache::from_secs(60);
        cache.put("u1", "Analyze BTC  short-term", "report");

        assert_eq!(
            cache.get("u1", "  analyze btc short-term ").as_deref(),
            Some("report")
        );
        // Different user misses
        assert!(cache.get("u2", "analyze btc short-term").is_none());
    }

    #[test]
    fn test_expiry() {
        let cache = ResponseCache::new(Duration::from_millis(40));
        cache.put("u1", "q", "a");
        assert!(cache.get("u1", "q").is_some());

        std::thread::sleep(Duration::from_millis(60));
        assert!(cache.get("u1", "q").is_none());
    }

    #[test]
    fn test_zero_ttl_disables() {
        let cache = ResponseCache::from_secs(0);
        cache.put("u1", "q", "a");
        assert!(cache.get("u1", "q").is_none());
    }
}
