use dashmap::DashMap;
use sha2::{Digest, Sha256};

/// Model responses keyed by a digest of the full prompt.
pub struct ResponseCache {
    responses: DashMap<String, String>,
    max_entries: usize,
}

impl ResponseCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            responses: DashMap::new(),
            max_entries,
        }
    }

    pub fn get(&self, system: &str, user: &str) -> Option<String> {
        let key = prompt_key(system, user);
        self.responses.get(&key).map(|r| r.value().clone())
    }

    pub fn insert(&self, system: &str, user: &str, response: String) {
        if self.max_entries == 0 {
            return;
        }
        if self.responses.len() >= self.max_entries {
            // Simple eviction: clear 25% when full
            let to_remove: Vec<_> = self
                .responses
                .iter()
                .take((self.max_entries / 4).max(1))
                .map(|r| r.key().clone())
                .collect();
            for key in to_remove {
                self.responses.remove(&key);
            }
        }
        self.responses.insert(prompt_key(system, user), response);
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn clear(&self) {
        self.responses.clear();
    }
}

fn prompt_key(system: &str, user: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(system.as_bytes());
    hasher.update([0u8]);
    hasher.update(user.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyed_by_both_prompts() {
        let cache = ResponseCache::new(10);
        cache.insert("system", "user", "answer".to_string());

        assert_eq!(cache.get("system", "user").as_deref(), Some("answer"));
        assert_eq!(cache.get("system", "other"), None);
        assert_eq!(cache.get("systemuser", ""), None);
    }

    #[test]
    fn evicts_a_quarter_when_full() {
        let cache = ResponseCache::new(8);
        for i in 0..8 {
            cache.insert("s", &i.to_string(), i.to_string());
        }
        assert_eq!(cache.len(), 8);

        cache.insert("s", "new", "new".to_string());
        assert_eq!(cache.len(), 7);
        assert_eq!(cache.get("s", "new").as_deref(), Some("new"));
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let cache = ResponseCache::new(0);
        cache.insert("s", "u", "r".to_string());
        assert!(cache.is_empty());
    }
}
