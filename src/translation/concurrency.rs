/*!
 * Request coordination per document.
 *
 * At most one translation pass runs at a time for a given
 * `(url, source locale, target locale)`. Locks are leases kept in a
 * [`LockStore`]: process-local in memory, or in the shared SQLite database
 * so several processes using the same store file serialize as well. A lease
 * that outlives its holder expires and can be taken over.
 */

use anyhow::{Context, Result};
use log::{debug, warn};
use parking_lot::Mutex;
use rusqlite::params;
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

use crate::app_config::{LockConfig, LockStoreKind};
use crate::database::DatabaseConnection;
use crate::errors::TranslationError;

/// Identity of one logical document translation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentProcessKey {
    pub url: String,
    pub source_locale: String,
    pub target_locale: String,
}

impl DocumentProcessKey {
    pub fn new(
        url: impl Into<String>,
        source_locale: impl Into<String>,
        target_locale: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            source_locale: source_locale.into(),
            target_locale: target_locale.into(),
        }
    }

    /// Key under which the lease is stored
    pub fn lock_key(&self) -> String {
        format!("{}|{}|{}", self.url, self.source_locale, self.target_locale)
    }
}

impl fmt::Display for DocumentProcessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} -> {})", self.url, self.source_locale, self.target_locale)
    }
}

/// Storage for lock leases
pub trait LockStore: Send + Sync + Debug {
    /// Take the lease on `key` unless another holder has an unexpired one
    fn try_acquire(&self, key: &str, holder: &str, lease: Duration) -> Result<bool>;

    /// Drop the lease on `key` if `holder` owns it
    fn release(&self, key: &str, holder: &str) -> Result<bool>;

    /// Whether `key` has an unexpired lease
    fn contains(&self, key: &str) -> Result<bool>;

    /// Number of unexpired leases
    fn held_count(&self) -> Result<usize>;
}

#[derive(Debug, Clone)]
struct Lease {
    holder: String,
    expires_at: Instant,
}

/// Process-local lease store
#[derive(Debug, Default)]
pub struct InMemoryLockStore {
    leases: Mutex<HashMap<String, Lease>>,
}

impl InMemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LockStore for InMemoryLockStore {
    fn try_acquire(&self, key: &str, holder: &str, lease: Duration) -> Result<bool> {
        let now = Instant::now();
        let mut leases = self.leases.lock();

        if let Some(current) = leases.get(key) {
            if current.holder != holder && current.expires_at > now {
                return Ok(false);
            }
            if current.holder != holder {
                warn!("Taking over expired lock {} from {}", key, current.holder);
            }
        }

        leases.insert(
            key.to_string(),
            Lease {
                holder: holder.to_string(),
                expires_at: now + lease,
            },
        );
        Ok(true)
    }

    fn release(&self, key: &str, holder: &str) -> Result<bool> {
        let mut leases = self.leases.lock();
        match leases.get(key) {
            Some(current) if current.holder == holder => {
                leases.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn contains(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        Ok(self
            .leases
            .lock()
            .get(key)
            .is_some_and(|lease| lease.expires_at > now))
    }

    fn held_count(&self) -> Result<usize> {
        let now = Instant::now();
        Ok(self
            .leases
            .lock()
            .values()
            .filter(|lease| lease.expires_at > now)
            .count())
    }
}

/// Lease store in the `document_locks` table
#[derive(Debug, Clone)]
pub struct SqliteLockStore {
    db: DatabaseConnection,
}

impl SqliteLockStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn now_millis() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

impl LockStore for SqliteLockStore {
    fn try_acquire(&self, key: &str, holder: &str, lease: Duration) -> Result<bool> {
        let now = Self::now_millis();
        let expires_at = now + lease.as_millis() as i64;

        self.db.execute(|conn| {
            let changed = conn.execute(
                r#"
                INSERT INTO document_locks (lock_key, holder, acquired_at, expires_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(lock_key) DO UPDATE SET
                    holder = excluded.holder,
                    acquired_at = excluded.acquired_at,
                    expires_at = excluded.expires_at
                WHERE document_locks.expires_at <= ?3 OR document_locks.holder = excluded.holder
                "#,
                params![key, holder, now, expires_at],
            )?;
            Ok(changed > 0)
        })
    }

    fn release(&self, key: &str, holder: &str) -> Result<bool> {
        self.db.execute(|conn| {
            let deleted = conn.execute(
                "DELETE FROM document_locks WHERE lock_key = ?1 AND holder = ?2",
                params![key, holder],
            )?;
            Ok(deleted > 0)
        })
    }

    fn contains(&self, key: &str) -> Result<bool> {
        let now = Self::now_millis();
        self.db.execute(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM document_locks WHERE lock_key = ?1 AND expires_at > ?2",
                params![key, now],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    fn held_count(&self) -> Result<usize> {
        let now = Self::now_millis();
        self.db.execute(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM document_locks WHERE expires_at > ?1",
                [now],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        })
    }
}

/// Holds a lease; releases it when dropped unless already released
struct LockGuard {
    store: Arc<dyn LockStore>,
    released: Arc<Notify>,
    key: String,
    holder: String,
    active: bool,
}

impl LockGuard {
    /// Release on the blocking pool and wake waiters
    async fn release(mut self) {
        let store = self.store.clone();
        let key = self.key.clone();
        let holder = self.holder.clone();
        let outcome = tokio::task::spawn_blocking(move || store.release(&key, &holder)).await;
        match outcome {
            Ok(Ok(true)) => debug!("Released lock {}", self.key),
            Ok(Ok(false)) => warn!("Lock {} was no longer held by {}", self.key, self.holder),
            Ok(Err(e)) => warn!("Failed to release lock {}: {:#}", self.key, e),
            Err(e) => warn!("Release task for lock {} failed: {}", self.key, e),
        }
        self.active = false;
        self.released.notify_waiters();
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        // Only reached when the with_lock future is dropped mid-flight
        match self.store.release(&self.key, &self.holder) {
            Ok(true) => debug!("Released lock {}", self.key),
            Ok(false) => warn!("Lock {} was no longer held by {}", self.key, self.holder),
            Err(e) => warn!("Failed to release lock {}: {:#}", self.key, e),
        }
        self.released.notify_waiters();
    }
}

/// Serializes translation passes per document
#[derive(Debug, Clone)]
pub struct DocumentProcessManager {
    store: Arc<dyn LockStore>,
    lease: Duration,
    acquire_timeout: Duration,
    poll_interval: Duration,
    released: Arc<Notify>,
}

impl DocumentProcessManager {
    pub fn new(
        store: Arc<dyn LockStore>,
        lease: Duration,
        acquire_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            store,
            lease,
            acquire_timeout,
            poll_interval,
            released: Arc::new(Notify::new()),
        }
    }

    /// Manager over a process-local store with default timings
    pub fn in_memory() -> Self {
        Self::from_config(&LockConfig::default(), None)
    }

    /// Build the store selected by configuration
    ///
    /// The database store falls back to memory when no connection is given.
    pub fn from_config(config: &LockConfig, db: Option<&DatabaseConnection>) -> Self {
        let store: Arc<dyn LockStore> = match (config.store, db) {
            (LockStoreKind::Database, Some(db)) => Arc::new(SqliteLockStore::new(db.clone())),
            (LockStoreKind::Database, None) => {
                warn!("No database available for document locks, using memory");
                Arc::new(InMemoryLockStore::new())
            }
            (LockStoreKind::Memory, _) => Arc::new(InMemoryLockStore::new()),
        };

        Self::new(
            store,
            Duration::from_secs(config.lease_secs),
            Duration::from_secs(config.acquire_timeout_secs),
            Duration::from_millis(config.poll_interval_ms),
        )
    }

    /// Run `body` while holding the lock for `key`
    ///
    /// Waits until the key is free, or fails with `LockTimeout` once the
    /// acquire timeout has passed. The lease is renewed every third of its
    /// length while `body` runs; if a renewal is refused the body is dropped
    /// and `LockTimeout` is returned. The lock is released however `body`
    /// ends, including when the returned future is dropped.
    pub async fn with_lock<F, T>(&self, key: &DocumentProcessKey, body: F) -> Result<T, TranslationError>
    where
        F: Future<Output = Result<T, TranslationError>>,
    {
        let guard = self.acquire(key).await?;
        let result = self.run_renewing(key, &guard, body).await;
        guard.release().await;
        result
    }

    async fn run_renewing<F, T>(
        &self,
        key: &DocumentProcessKey,
        guard: &LockGuard,
        body: F,
    ) -> Result<T, TranslationError>
    where
        F: Future<Output = Result<T, TranslationError>>,
    {
        tokio::pin!(body);
        let period = (self.lease / 3).max(Duration::from_millis(1));
        let mut renewals = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

        loop {
            tokio::select! {
                biased;
                result = &mut body => return result,
                _ = renewals.tick() => {
                    let (lock_key, holder, lease) = (guard.key.clone(), guard.holder.clone(), self.lease);
                    let renewed = self
                        .blocking(move |store| store.try_acquire(&lock_key, &holder, lease))
                        .await?;
                    if !renewed {
                        warn!("Lost lock {} while translating", guard.key);
                        return Err(TranslationError::LockTimeout(key.to_string()));
                    }
                    debug!("Renewed lock {}", guard.key);
                }
            }
        }
    }

    async fn acquire(&self, key: &DocumentProcessKey) -> Result<LockGuard, TranslationError> {
        let lock_key = key.lock_key();
        let holder = uuid::Uuid::new_v4().to_string();
        let deadline = Instant::now() + self.acquire_timeout;

        loop {
            // Registered before trying so a release in between is not missed
            let notified = self.released.notified();

            let acquired = {
                let (lock_key, holder, lease) = (lock_key.clone(), holder.clone(), self.lease);
                self.blocking(move |store| store.try_acquire(&lock_key, &holder, lease))
                    .await?
            };
            if acquired {
                debug!("Acquired lock {}", lock_key);
                return Ok(LockGuard {
                    store: self.store.clone(),
                    released: self.released.clone(),
                    key: lock_key,
                    holder,
                    active: true,
                });
            }

            let now = Instant::now();
            if now >= deadline {
                warn!("Timed out waiting for lock {}", lock_key);
                return Err(TranslationError::LockTimeout(key.to_string()));
            }

            debug!("Waiting for lock {}", lock_key);
            let wait = self.poll_interval.min(deadline - now);
            tokio::select! {
                _ = notified => {}
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// Run a store call on the blocking pool
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn LockStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .context("Lock store task panicked")?
    }

    /// Whether a translation pass currently holds `key`
    pub async fn is_locked(&self, key: &DocumentProcessKey) -> bool {
        let lock_key = key.lock_key();
        self.blocking(move |store| store.contains(&lock_key))
            .await
            .unwrap_or_else(|e| {
                warn!("Failed to check lock {}: {:#}", key, e);
                false
            })
    }

    /// Number of keys currently held
    pub async fn total_lock_count(&self) -> usize {
        self.blocking(|store| store.held_count())
            .await
            .unwrap_or_else(|e| {
                warn!("Failed to count locks: {:#}", e);
                0
            })
    }
}
