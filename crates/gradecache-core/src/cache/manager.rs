use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::models::ParseResult;

use super::GradeLedger;

/// Consider cache stale after 1 hour.
const CACHE_STALE_MINUTES: i64 = 60;

/// File name of the last fetched grades.
const GRADES_CACHE: &str = "grades";

/// Prefix of per-subject ledger files.
const LEDGER_PREFIX: &str = "grades_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        let now = Utc::now();
        (now - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Includes negative ages from clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }

    pub fn is_stale(&self) -> bool {
        self.age_minutes() > CACHE_STALE_MINUTES
    }
}

pub struct CacheManager {
    cache_dir: PathBuf,
}

impl CacheManager {
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)?;
        Ok(Self { cache_dir })
    }

    fn cache_path(&self, name: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", name))
    }

    fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<CachedData<T>>> {
        let path = self.cache_path(name);
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache file: {}", name))?;

        let cached: CachedData<T> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache file: {}", name))?;

        Ok(Some(cached))
    }

    fn save<T: Serialize>(&self, name: &str, data: &T) -> Result<()> {
        let cached = CachedData::new(data);
        let path = self.cache_path(name);
        let contents = serde_json::to_string_pretty(&cached)?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write cache file: {}", name))?;
        Ok(())
    }

    // ===== Grades =====

    /// Last fetched grades. Each save replaces the previous snapshot whole.
    pub fn load_grades(&self) -> Result<Option<CachedData<ParseResult>>> {
        self.load(GRADES_CACHE)
    }

    pub fn save_grades(&self, grades: &ParseResult) -> Result<()> {
        self.save(GRADES_CACHE, grades)
    }

    /// "5m ago" style age of the grades snapshot, or "never".
    pub fn grades_age(&self) -> String {
        match self.load_grades() {
            Ok(Some(cached)) => cached.age_display(),
            Ok(None) => "never".to_string(),
            Err(e) => {
                debug!(error = %e, "Failed to load grades cache for age display");
                "never".to_string()
            }
        }
    }

    pub fn is_grades_stale(&self) -> bool {
        match self.load_grades() {
            Ok(Some(cached)) => cached.is_stale(),
            Ok(None) => true,
            Err(e) => {
                debug!(error = %e, "Failed to load grades cache for staleness check");
                true
            }
        }
    }

    // ===== Ledgers =====

    /// Manual ledger for a subject; empty when missing or unreadable.
    pub fn load_ledger(&self, subject: &str) -> GradeLedger {
        let key = Self::ledger_key(subject);
        match self.load::<GradeLedger>(&key) {
            Ok(Some(cached)) => cached.data,
            Ok(None) => GradeLedger::new(),
            Err(e) => {
                debug!(subject, error = %e, "Failed to load ledger, starting empty");
                GradeLedger::new()
            }
        }
    }

    pub fn save_ledger(&self, subject: &str, ledger: &GradeLedger) -> Result<()> {
        self.save(&Self::ledger_key(subject), ledger)
    }

    /// Storage key for a subject's ledger: `grades_<subject>` with anything
    /// but ASCII letters, digits, `-` and `_` replaced by `_`.
    pub fn ledger_key(subject: &str) -> String {
        let safe: String = subject
            .trim()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        format!("{}{}", LEDGER_PREFIX, safe)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GradeRecord;
    use chrono::{Duration, NaiveDate};

    #[test]
    fn test_cached_data_age_display() {
        let mut cached = CachedData::new(vec![1, 2, 3]);
        assert_eq!(cached.age_display(), "just now");

        cached.cached_at = Utc::now() - Duration::minutes(5);
        assert_eq!(cached.age_display(), "5m ago");

        cached.cached_at = Utc::now() - Duration::minutes(95);
        assert_eq!(cached.age_display(), "2h ago");

        cached.cached_at = Utc::now() - Duration::days(3);
        assert_eq!(cached.age_display(), "3d ago");

        cached.cached_at = Utc::now() + Duration::minutes(10);
        assert_eq!(cached.age_display(), "just now");
    }

    #[test]
    fn test_cached_data_is_stale() {
        let fresh = CachedData::new(vec![1]);
        assert!(!fresh.is_stale());

        let mut old = CachedData::new(vec![1]);
        old.cached_at = Utc::now() - Duration::minutes(61);
        assert!(old.is_stale());
    }

    #[test]
    fn test_grades_snapshot_replaced_whole() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheManager::new(dir.path().to_path_buf()).unwrap();
        assert!(cache.load_grades().unwrap().is_none());
        assert_eq!(cache.grades_age(), "never");
        assert!(cache.is_grades_stale());

        let date = NaiveDate::from_ymd_opt(2024, 10, 12).unwrap();
        let mut first = ParseResult::new();
        first.insert("ARTE".to_string(), vec![GradeRecord::new(date, 8.0)]);
        cache.save_grades(&first).unwrap();

        let mut second = ParseResult::new();
        second.insert("FISICA".to_string(), vec![GradeRecord::new(date, 6.5)]);
        cache.save_grades(&second).unwrap();

        let loaded = cache.load_grades().unwrap().unwrap();
        assert_eq!(loaded.data, second);
        assert_eq!(cache.grades_age(), "just now");
        assert!(!cache.is_grades_stale());
    }

    #[test]
    fn test_ledger_roundtrip_per_subject() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheManager::new(dir.path().to_path_buf()).unwrap();

        let mut ledger = cache.load_ledger("MATEMATICA");
        assert!(ledger.is_empty());
        ledger.push(7.0).unwrap();
        cache.save_ledger("MATEMATICA", &ledger).unwrap();

        assert_eq!(cache.load_ledger("MATEMATICA").values(), vec![7.0]);
        assert!(cache.load_ledger("FISICA").is_empty());
    }

    #[test]
    fn test_corrupt_ledger_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheManager::new(dir.path().to_path_buf()).unwrap();
        std::fs::write(dir.path().join("grades_ARTE.json"), "[[[").unwrap();
        assert!(cache.load_ledger("ARTE").is_empty());
    }

    #[test]
    fn test_ledger_key() {
        assert_eq!(CacheManager::ledger_key("MATEMATICA"), "grades_MATEMATICA");
        assert_eq!(
            CacheManager::ledger_key("LINGUA E LETT. ITALIANA"),
            "grades_LINGUA_E_LETT__ITALIANA"
        );
        assert_eq!(CacheManager::ledger_key("../etc"), "grades____etc");
    }
}
