//! Keyed pool registry
//!
//! Lazily builds one pool per `(tenant, read_only)` key and keeps it until
//! the registry is cleared.
//!
//! ```text
//! get(read_only)
//!   → look up slot for (tenant, read_only)       (map lock, no await)
//!     → slot constructed → return pool
//!     → slot empty → one caller builds, others wait on the slot's build lock
//!   → slot still registered? yes → return pool
//!                             no  → cleared meanwhile: close it, retry
//! ```
//!
//! Each key owns its own slot, so construction for one key never blocks
//! lookups for another. A failed construction is reported to the callers
//! that were already waiting on it and leaves the slot empty, so the next
//! call starts a fresh attempt.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, OnceCell};
use tracing::{debug, info, warn};

use crate::config::TenantPoolConfig;
use crate::error::{PoolError, Result};
use crate::factory::{MySqlPoolFactory, PoolFactory, PoolSettings};
use crate::key::PoolKey;

type Slot<P> = Arc<PoolSlot<P>>;

/// Per-key construction state.
pub(crate) struct PoolSlot<P> {
    entry: OnceCell<Arc<PoolEntry<P>>>,
    /// Held by the caller running the factory
    build: AsyncMutex<()>,
    /// Incremented after every failed construction
    failures: AtomicU64,
    last_failure: Mutex<String>,
}

impl<P> Default for PoolSlot<P> {
    fn default() -> Self {
        Self {
            entry: OnceCell::new(),
            build: AsyncMutex::new(()),
            failures: AtomicU64::new(0),
            last_failure: Mutex::new(String::new()),
        }
    }
}

impl<P> PoolSlot<P> {
    fn get(&self) -> Option<&Arc<PoolEntry<P>>> {
        self.entry.get()
    }

    fn record_failure(&self, error: &PoolError) {
        *self
            .last_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = error.to_string();
        self.failures.fetch_add(1, Ordering::Release);
    }

    fn last_failure(&self) -> String {
        self.last_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// A live pool together with the settings it was built from.
pub(crate) struct PoolEntry<P> {
    key: PoolKey,
    pool: P,
    settings: PoolSettings,
    closed: AtomicBool,
}

impl<P> PoolEntry<P> {
    fn summary(&self) -> PoolSummary {
        PoolSummary {
            tenant: self.key.tenant().to_string(),
            read_only: self.key.is_read_only(),
            pool_name: self.settings.pool_name.clone(),
            host: self.settings.host.clone(),
        }
    }
}

/// Diagnostic view of one live pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolSummary {
    pub tenant: String,
    pub read_only: bool,
    pub pool_name: String,
    pub host: String,
}

/// A pool that failed to close during `clear_all`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeardownFailure {
    pub pool_name: String,
    pub error: String,
}

/// Outcome of `clear_all`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClearReport {
    /// Pools closed by this call
    pub closed: usize,
    pub failures: Vec<TeardownFailure>,
}

/// Concurrent cache from `PoolKey` to a live pool.
///
/// Construct one per process and share it behind an `Arc`. Callers see pools
/// and `PoolSummary` values; the entries themselves stay inside the registry:
///
/// ```compile_fail
/// use tenantpool_core::registry::PoolEntry;
/// ```
pub struct PoolRegistry<F: PoolFactory = MySqlPoolFactory> {
    tenant: String,
    factory: F,
    slots: Mutex<HashMap<PoolKey, Slot<F::Pool>>>,
}

impl PoolRegistry<MySqlPoolFactory> {
    /// Registry for the configured tenant backed by sqlx MySQL pools.
    pub fn from_config(config: &TenantPoolConfig) -> Self {
        Self::new(
            config.tenant.clone(),
            MySqlPoolFactory::new(config.db.clone()),
        )
    }
}

impl<F: PoolFactory> PoolRegistry<F> {
    pub fn new(tenant: impl Into<String>, factory: F) -> Self {
        Self {
            tenant: tenant.into(),
            factory,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Tenant served by `get`
    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Pool for the registry tenant, replica when `read_only`.
    pub async fn get(&self, read_only: bool) -> Result<F::Pool> {
        let key = PoolKey::new(self.tenant.clone(), read_only);
        self.get_for(&key).await
    }

    /// Pool for an arbitrary key, built on first use.
    ///
    /// Concurrent misses on the same key share a single construction. When
    /// it fails, every caller that was waiting on it gets an error
    /// (`PoolError::Unavailable` for all but the builder) and nothing is
    /// remembered: the next call tries again.
    ///
    /// If `clear_all` runs while this call is building or reading a pool,
    /// that pool is closed and the lookup starts over, so one call may
    /// invoke the factory twice.
    pub async fn get_for(&self, key: &PoolKey) -> Result<F::Pool> {
        loop {
            let slot = self.slot(key);

            let entry = match slot.get() {
                Some(entry) => {
                    debug!(key = %key, "pool cache hit");
                    Arc::clone(entry)
                }
                None => self.build(key, &slot).await?,
            };

            if self.is_registered(key, &slot) {
                return Ok(entry.pool.clone());
            }

            // clear_all took the slot while we were building or reading it
            warn!(
                pool = %entry.settings.pool_name,
                "registry cleared during lookup, closing orphaned pool and retrying"
            );
            if let Err(e) = self.retire(&entry).await {
                warn!(pool = %entry.settings.pool_name, error = %e, "failed to close orphaned pool");
            }
        }
    }

    /// Empty the registry and close every pool it held.
    ///
    /// The map is swapped out before anything is closed, so lookups racing
    /// with this call build fresh pools. Close failures are isolated per pool.
    pub async fn clear_all(&self) -> ClearReport {
        let drained: Vec<Slot<F::Pool>> = self.lock_slots().drain().map(|(_, slot)| slot).collect();

        let entries: Vec<Arc<PoolEntry<F::Pool>>> = drained
            .iter()
            .filter_map(|slot| slot.get().cloned())
            .collect();

        info!(pools = entries.len(), "clearing connection pools");

        let results = join_all(entries.iter().map(|entry| async move {
            let result = self.retire(entry).await;
            (entry, result)
        }))
        .await;

        let mut report = ClearReport::default();
        for (entry, result) in results {
            match result {
                Ok(true) => report.closed += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(pool = %entry.settings.pool_name, error = %e, "failed to close pool");
                    report.failures.push(TeardownFailure {
                        pool_name: entry.settings.pool_name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            closed = report.closed,
            failed = report.failures.len(),
            "connection pools cleared"
        );
        report
    }

    /// Live pools, ordered by tenant then role.
    pub fn describe(&self) -> Vec<PoolSummary> {
        let mut summaries: Vec<PoolSummary> = self
            .lock_slots()
            .values()
            .filter_map(|slot| slot.get())
            .map(|entry| entry.summary())
            .collect();
        summaries.sort_by(|a, b| (&a.tenant, a.read_only).cmp(&(&b.tenant, b.read_only)));
        summaries
    }

    /// Summary of the live pool for `key`, if one has been built.
    pub fn summary(&self, key: &PoolKey) -> Option<PoolSummary> {
        self.lock_slots()
            .get(key)
            .and_then(|slot| slot.get())
            .map(|entry| entry.summary())
    }

    /// Number of constructed pools
    pub fn len(&self) -> usize {
        self.lock_slots()
            .values()
            .filter(|slot| slot.entry.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_slots(&self) -> MutexGuard<'_, HashMap<PoolKey, Slot<F::Pool>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, key: &PoolKey) -> Slot<F::Pool> {
        let mut slots = self.lock_slots();
        if let Some(slot) = slots.get(key) {
            return Arc::clone(slot);
        }
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    fn is_registered(&self, key: &PoolKey, slot: &Slot<F::Pool>) -> bool {
        self.lock_slots()
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
    }

    /// Build the pool for `slot`, or wait for the caller already doing so.
    async fn build(
        &self,
        key: &PoolKey,
        slot: &PoolSlot<F::Pool>,
    ) -> Result<Arc<PoolEntry<F::Pool>>> {
        let seen_failures = slot.failures.load(Ordering::Acquire);
        let _building = slot.build.lock().await;

        if let Some(entry) = slot.get() {
            return Ok(Arc::clone(entry));
        }

        // The attempt we were waiting on failed
        if slot.failures.load(Ordering::Acquire) != seen_failures {
            return Err(PoolError::Unavailable {
                key: key.to_string(),
                reason: slot.last_failure(),
            });
        }

        match self.create(key).await {
            Ok(entry) => {
                // Only the build lock holder sets the cell
                let entry = slot.entry.get_or_init(|| async move { entry }).await;
                Ok(Arc::clone(entry))
            }
            Err(e) => {
                slot.record_failure(&e);
                Err(e)
            }
        }
    }

    async fn create(&self, key: &PoolKey) -> Result<Arc<PoolEntry<F::Pool>>> {
        let settings = self.factory.settings(key)?;

        info!(
            pool = %settings.pool_name,
            host = %settings.host,
            read_only = settings.read_only,
            "creating connection pool"
        );

        let pool = match self.factory.connect(&settings).await {
            Ok(pool) => pool,
            Err(e) => {
                warn!(pool = %settings.pool_name, error = %e, "pool creation failed");
                return Err(e);
            }
        };

        Ok(Arc::new(PoolEntry {
            key: key.clone(),
            pool,
            settings,
            closed: AtomicBool::new(false),
        }))
    }

    /// Close `entry` unless someone already did. Returns whether this call
    /// performed the close.
    async fn retire(&self, entry: &PoolEntry<F::Pool>) -> Result<bool> {
        if entry.closed.swap(true, Ordering::AcqRel) {
            return Ok(false);
        }
        self.factory
            .close(entry.pool.clone(), &entry.settings)
            .await?;
        debug!(pool = %entry.settings.pool_name, "closed connection pool");
        Ok(true)
    }
}
