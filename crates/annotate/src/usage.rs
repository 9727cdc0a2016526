use anyhow::{Context, Result};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, info, warn};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("daily token limit exceeded for {client}: used {used} of {limit}")]
    DailyTokenLimitExceeded { client: String, used: u64, limit: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct DailyUsage {
    day: u64,
    tokens: u64,
}

/// Per-client token spend, reset at UTC midnight.
///
/// The spend lives in memory. `load` and `save` carry it across process
/// runs through a JSON file keyed by client.
pub struct TokenBudget {
    limit: u64,
    usage: DashMap<String, DailyUsage>,
}

impl TokenBudget {
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            usage: DashMap::new(),
        }
    }

    /// Budget with the usage stored at `path`. A missing file starts empty.
    pub fn load(limit: u64, path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new(limit));
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read token usage {}", path.display()))?;
        let stored: BTreeMap<String, DailyUsage> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse token usage {}", path.display()))?;
        info!(path = %path.display(), clients = stored.len(), "Loaded token usage");
        Ok(Self {
            limit,
            usage: stored.into_iter().collect(),
        })
    }

    /// Write today's usage to `path`, dropping earlier days.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.save_on(path, today())
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Fails once today's recorded usage is over the limit. Usage equal to
    /// the limit still passes.
    pub fn check(&self, client: &str) -> Result<(), UsageError> {
        self.check_on(client, today())
    }

    pub fn record(&self, client: &str, tokens: u64) {
        self.record_on(client, tokens, today())
    }

    pub fn used(&self, client: &str) -> u64 {
        self.used_on(client, today())
    }

    fn check_on(&self, client: &str, day: u64) -> Result<(), UsageError> {
        let used = self.used_on(client, day);
        if used > self.limit {
            warn!(client, used, limit = self.limit, "Daily token limit exceeded");
            return Err(UsageError::DailyTokenLimitExceeded {
                client: client.to_string(),
                used,
                limit: self.limit,
            });
        }
        Ok(())
    }

    fn record_on(&self, client: &str, tokens: u64, day: u64) {
        let mut entry = self
            .usage
            .entry(client.to_string())
            .or_insert(DailyUsage { day, tokens: 0 });
        if entry.day != day {
            *entry = DailyUsage { day, tokens: 0 };
        }
        entry.tokens += tokens;
        debug!(client, tokens, total = entry.tokens, "Recorded token usage");
    }

    fn save_on(&self, path: &Path, day: u64) -> Result<()> {
        let current: BTreeMap<String, DailyUsage> = self
            .usage
            .iter()
            .filter(|entry| entry.day == day)
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        let json = serde_json::to_string_pretty(&current)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write token usage {}", path.display()))?;
        debug!(path = %path.display(), clients = current.len(), "Saved token usage");
        Ok(())
    }

    fn used_on(&self, client: &str, day: u64) -> u64 {
        self.usage
            .get(client)
            .filter(|u| u.day == day)
            .map_or(0, |u| u.tokens)
    }
}

fn today() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs() / SECS_PER_DAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_inclusive() {
        let budget = TokenBudget::new(100);
        budget.record_on("127.0.0.1", 100, 7);
        assert!(budget.check_on("127.0.0.1", 7).is_ok());

        budget.record_on("127.0.0.1", 1, 7);
        assert_eq!(
            budget.check_on("127.0.0.1", 7),
            Err(UsageError::DailyTokenLimitExceeded {
                client: "127.0.0.1".to_string(),
                used: 101,
                limit: 100,
            })
        );
    }

    #[test]
    fn clients_are_tracked_separately() {
        let budget = TokenBudget::new(10);
        budget.record_on("a", 50, 1);
        assert!(budget.check_on("a", 1).is_err());
        assert!(budget.check_on("b", 1).is_ok());
    }

    #[test]
    fn usage_resets_on_a_new_day() {
        let budget = TokenBudget::new(10);
        budget.record_on("a", 50, 1);
        assert!(budget.check_on("a", 2).is_ok());

        budget.record_on("a", 3, 2);
        assert_eq!(budget.used_on("a", 2), 3);
        assert_eq!(budget.used_on("a", 1), 0);
    }

    #[test]
    fn usage_survives_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.json");

        let budget = TokenBudget::load(10, &path).unwrap();
        budget.record("a", 8);
        budget.save(&path).unwrap();

        let reloaded = TokenBudget::load(10, &path).unwrap();
        assert_eq!(reloaded.used("a"), 8);
        assert!(reloaded.check("a").is_ok());

        reloaded.record("a", 5);
        reloaded.save(&path).unwrap();
        let third = TokenBudget::load(10, &path).unwrap();
        assert_eq!(
            third.check("a"),
            Err(UsageError::DailyTokenLimitExceeded {
                client: "a".to_string(),
                used: 13,
                limit: 10,
            })
        );
    }

    #[test]
    fn stale_days_are_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.json");

        let budget = TokenBudget::new(10);
        budget.record_on("old", 50, 1);
        budget.record_on("new", 4, 2);
        budget.save_on(&path, 2).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("old"));
        let reloaded = TokenBudget::load(10, &path).unwrap();
        assert_eq!(reloaded.used_on("new", 2), 4);
    }

    #[test]
    fn corrupt_usage_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(TokenBudget::load(10, &path).is_err());
    }
}
