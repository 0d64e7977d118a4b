// src/utils/cache.rs

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::RwLock;

/// Single-slot value cache with a fixed time-to-live.
#[derive(Clone)]
pub struct TtlCache<T> {
    ttl: Duration,
    slot: Arc<RwLock<Option<(Instant, T)>>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the cached value unless it has expired.
    pub async fn get(&self) -> Option<T> {
        let slot = self.slot.read().await;
        match slot.as_ref() {
            Some((stored_at, value)) if stored_at.elapsed() < self.ttl => Some(value.clone()),
            _ => None,
        }
    }

    pub async fn set(&self, value: T) {
        *self.slot.write().await = Some((Instant::now(), value));
    }

    pub async fn invalidate(&self) {
        *self.slot.write().await = None;
    }
}
