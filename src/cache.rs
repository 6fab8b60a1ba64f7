use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory response cache with a fixed time-to-live.
///
/// Values are stored as JSON so one cache serves every endpoint. Producer
/// failures are passed through and never stored.
pub struct TtlCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, (Instant, Value)>>,
}

impl TtlCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get_or_compute<F, Fut, E>(&self, key: &str, producer: F) -> Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        if let Some(value) = self.get(key).await {
            debug!(key, "Cache hit");
            return Ok(value);
        }

        let value = producer().await?;

        let mut entries = self.entries.write().await;
        entries.retain(|_, (inserted, _)| inserted.elapsed() < self.ttl);
        entries.insert(key.to_string(), (Instant::now(), value.clone()));
        Ok(value)
    }

    async fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|(inserted, _)| inserted.elapsed() < self.ttl)
            .map(|(_, value)| value.clone())
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
