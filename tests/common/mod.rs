//! In-process fakes shared by the integration tests.
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use shopscout::cache::CacheKey;
use shopscout::clients::{AdapterError, DealsAdapter, ScrapeAdapter};
use shopscout::db::{CacheEntry, DealsStore, ResultStore, StoreError};
use shopscout::domain::{DealsSnapshot, Listing, Platform};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn listing(platform: Platform, title: &str) -> Listing {
    Listing {
        title: title.to_string(),
        price: "₹499".to_string(),
        link: format!("{}/p/{}", platform.site_url(), title.replace(' ', "-")),
        image: None,
        discount: Some("20% off".to_string()),
        platform,
    }
}

pub struct FakeAdapter {
    platform: Platform,
    outcome: Result<Vec<Listing>, AdapterError>,
    delay: Duration,
    calls: AtomicUsize,
}

impl FakeAdapter {
    pub fn returning(platform: Platform, count: usize) -> Self {
        let listings = (0..count)
            .map(|i| listing(platform, &format!("{} item {i}", platform.slug())))
            .collect();
        Self {
            platform,
            outcome: Ok(listings),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(platform: Platform, message: &str) -> Self {
        Self {
            platform,
            outcome: Err(AdapterError::Failed(message.to_string())),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ScrapeAdapter for FakeAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn fetch(&self, _query: &str, _timeout: Duration) -> Result<Vec<Listing>, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcome.clone()
    }
}

/// One healthy adapter per platform, each returning two listings.
pub fn healthy_adapters() -> Vec<Arc<FakeAdapter>> {
    Platform::ALL
        .into_iter()
        .map(|p| Arc::new(FakeAdapter::returning(p, 2)))
        .collect()
}

pub fn as_dyn(adapters: &[Arc<FakeAdapter>]) -> Vec<Arc<dyn ScrapeAdapter>> {
    adapters
        .iter()
        .map(|a| Arc::clone(a) as Arc<dyn ScrapeAdapter>)
        .collect()
}

pub fn total_calls(adapters: &[Arc<FakeAdapter>]) -> usize {
    adapters.iter().map(|a| a.calls()).sum()
}

pub struct FakeDeals {
    outcome: Mutex<Result<Vec<Listing>, AdapterError>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl FakeDeals {
    pub fn returning(count: usize) -> Self {
        let deals = (0..count)
            .map(|i| listing(Platform::Amazon, &format!("deal {i}")))
            .collect();
        Self {
            outcome: Mutex::new(Ok(deals)),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Mutex::new(Err(AdapterError::Failed(message.to_string()))),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DealsAdapter for FakeDeals {
    async fn fetch_deals(&self, _timeout: Duration) -> Result<Vec<Listing>, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcome.lock().unwrap().clone()
    }
}

/// Map-backed store that counts traffic and can be told to fail.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    deals: Mutex<Option<DealsSnapshot>>,
    upserts: AtomicUsize,
    deals_saves: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, entry: CacheEntry) {
        self.entries.lock().unwrap().insert(entry.key.clone(), entry);
    }

    pub fn seed_deals(&self, snapshot: DealsSnapshot) {
        *self.deals.lock().unwrap() = Some(snapshot);
    }

    pub fn stored(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn stored_deals(&self) -> Option<DealsSnapshot> {
        self.deals.lock().unwrap().clone()
    }

    pub fn upserts(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn deals_saves(&self) -> usize {
        self.deals_saves.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check(&self, flag: &AtomicBool) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl ResultStore for MemoryStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError> {
        self.check(&self.fail_reads)?;
        Ok(self.stored(key))
    }

    async fn upsert(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        self.check(&self.fail_writes)?;
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.seed(entry.clone());
        Ok(())
    }

    async fn list(&self, limit: u64) -> Result<Vec<CacheEntry>, StoreError> {
        self.check(&self.fail_reads)?;
        let mut entries: Vec<CacheEntry> = self.entries.lock().unwrap().values().cloned().collect();
        entries.sort_by(|a, b| b.stored_at.cmp(&a.stored_at));
        entries.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(entries)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.check(&self.fail_reads)?;
        Ok(self.entries.lock().unwrap().len() as u64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check(&self.fail_reads)
    }
}

#[async_trait::async_trait]
impl DealsStore for MemoryStore {
    async fn load_deals(&self) -> Result<Option<DealsSnapshot>, StoreError> {
        self.check(&self.fail_reads)?;
        Ok(self.stored_deals())
    }

    async fn save_deals(&self, snapshot: &DealsSnapshot) -> Result<(), StoreError> {
        self.check(&self.fail_writes)?;
        self.deals_saves.fetch_add(1, Ordering::SeqCst);
        self.seed_deals(snapshot.clone());
        Ok(())
    }
}

pub fn snapshot_at(fetched_at: DateTime<Utc>, count: usize) -> DealsSnapshot {
    DealsSnapshot {
        listings: (0..count)
            .map(|i| listing(Platform::Amazon, &format!("old deal {i}")))
            .collect(),
        fetched_at,
        expires_at: None,
    }
}
