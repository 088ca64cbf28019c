// src/services/cache.rs
use async_trait::async_trait;
use chrono::{Local, NaiveDate, Utc};
use chrono_tz::Tz;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::fs;

use crate::models::CacheEntry;

pub const SENTIMENT_CACHE_KEY: &str = "sentiment-cache-v1";
pub const PARTICIPATION_CACHE_KEY: &str = "spx-participation-cache-v2";

/// String-keyed persistent slots.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
}

/// One JSON file per key under `base_dir`.
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        FileStore {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", key))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        fs::create_dir_all(&self.base_dir).await?;
        let final_path = self.path_for(key);
        // readers only ever see a complete file
        let tmp_path = self.base_dir.join(format!("{}.json.tmp", key));
        fs::write(&tmp_path, value).await?;
        fs::rename(tmp_path, final_path).await?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let slots = self
            .slots
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        Ok(slots.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Calendar day in `zone`, or in the machine's local zone when `None`.
pub fn local_today(zone: Option<Tz>) -> NaiveDate {
    match zone {
        Some(tz) => Utc::now().with_timezone(&tz).date_naive(),
        None => Local::now().date_naive(),
    }
}

pub fn date_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Entries stay valid until the calendar day changes. Storage problems are
/// logged and otherwise ignored: a failed read is a miss, a failed write is
/// dropped.
pub struct SameDayCache<S> {
    store: S,
    zone: Option<Tz>,
}

impl<S: KeyValueStore> SameDayCache<S> {
    pub fn new(store: S, zone: Option<Tz>) -> Self {
        SameDayCache { store, zone }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let today = date_key(local_today(self.zone));

        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read cache {}: {}", key, e);
                return None;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Discarding unreadable cache {}: {}", key, e);
                return None;
            }
        };

        if entry.date != today {
            debug!("Cache {} is from {}, today is {}", key, entry.date, today);
            return None;
        }
        Some(entry.values)
    }

    pub async fn save<T: Serialize>(&self, key: &str, values: &T) {
        let entry = CacheEntry {
            date: date_key(local_today(self.zone)),
            values,
        };
        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to encode cache {}: {}", key, e);
                return;
            }
        };
        if let Err(e) = self.store.set(key, &raw).await {
            warn!("Failed to write cache {}: {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MarketMetrics;
    use chrono::Duration;

    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            Err(anyhow::anyhow!("disk on fire"))
        }

        async fn set(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("quota exceeded"))
        }
    }

    fn sample() -> MarketMetrics {
        MarketMetrics {
            cnn_fear_greed: Some(54.0),
            crypto_fear_greed: Some(48.0),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn entry_written_today_reads_back() {
        let cache = SameDayCache::new(MemoryStore::default(), None);
        cache.save(SENTIMENT_CACHE_KEY, &sample()).await;

        let loaded: Option<MarketMetrics> = cache.load(SENTIMENT_CACHE_KEY).await;
        assert_eq!(loaded, Some(sample()));
    }

    #[tokio::test]
    async fn entry_from_another_day_is_a_miss() {
        let cache = SameDayCache::new(MemoryStore::default(), None);
        for offset in [-1, 1, -400] {
            let day = local_today(None) + Duration::days(offset);
            let raw = serde_json::to_string(&CacheEntry {
                date: date_key(day),
                values: sample(),
            })
            .unwrap();
            cache.store().set(SENTIMENT_CACHE_KEY, &raw).await.unwrap();

            let loaded: Option<MarketMetrics> = cache.load(SENTIMENT_CACHE_KEY).await;
            assert_eq!(loaded, None, "offset {} should be stale", offset);
        }
    }

    #[tokio::test]
    async fn malformed_and_missing_entries_are_misses() {
        let cache = SameDayCache::new(MemoryStore::default(), None);
        assert_eq!(cache.load::<MarketMetrics>("nothing-here").await, None);

        cache.store().set("junk", "{not json").await.unwrap();
        assert_eq!(cache.load::<MarketMetrics>("junk").await, None);

        cache.store().set("no-date", r#"{"values":{}}"#).await.unwrap();
        assert_eq!(cache.load::<MarketMetrics>("no-date").await, None);
    }

    #[tokio::test]
    async fn storage_failures_are_swallowed() {
        let cache = SameDayCache::new(BrokenStore, None);
        cache.save(PARTICIPATION_CACHE_KEY, &sample()).await;
        assert_eq!(cache.load::<MarketMetrics>(PARTICIPATION_CACHE_KEY).await, None);
    }

    #[tokio::test]
    async fn save_overwrites_previous_entry() {
        let cache = SameDayCache::new(MemoryStore::default(), None);
        cache.save(SENTIMENT_CACHE_KEY, &sample()).await;
        let replacement = MarketMetrics {
            vix: Some(18.0),
            ..Default::default()
        };
        cache.save(SENTIMENT_CACHE_KEY, &replacement).await;

        let loaded: Option<MarketMetrics> = cache.load(SENTIMENT_CACHE_KEY).await;
        assert_eq!(loaded, Some(replacement));
    }

    #[tokio::test]
    async fn file_store_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));
        assert_eq!(store.get("slot").await.unwrap(), None);

        store.set("slot", "payload").await.unwrap();
        assert_eq!(store.get("slot").await.unwrap().as_deref(), Some("payload"));
        assert!(dir.path().join("nested").join("slot.json").exists());
    }
}
