//! Asset Registry
//!
//! In-memory store of uploaded and processed assets with TTL expiry and
//! capacity limits. Every piece of state (assets, cached visualizations, byte
//! accounting) sits behind one mutex, so a deletion is observed atomically by
//! all readers.
//!
//! Lifecycle: `Active -> Expired -> Deleted`, or `Active -> Deleted` on an
//! explicit delete. Expired assets are removed lazily on lookup and eagerly by
//! [`AssetRegistry::sweep`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::engine::PcmBuffer;
use crate::error::{LabError, Result};
use crate::state::asset::{Asset, AssetId, AssetOrigin, EncodedAudio};
use crate::state::clock::{Clock, SystemClock};
use crate::visual::VisualizationResult;

/// Default time-to-live for assets.
pub const DEFAULT_TTL_MINUTES: i64 = 30;

/// Default maximum number of live assets.
pub const DEFAULT_MAX_ASSETS: usize = 256;

/// Default byte budget across all assets (1 GiB).
pub const DEFAULT_MAX_TOTAL_BYTES: usize = 1 << 30;

/// Capacity and expiry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryLimits {
    pub ttl: Duration,
    pub max_assets: usize,
    pub max_total_bytes: usize,
}

impl Default for RegistryLimits {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(DEFAULT_TTL_MINUTES),
            max_assets: DEFAULT_MAX_ASSETS,
            max_total_bytes: DEFAULT_MAX_TOTAL_BYTES,
        }
    }
}

/// Snapshot of registry usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    pub assets: usize,
    pub total_bytes: usize,
    pub cached_visualizations: usize,
    /// Memory held by cached visualizations; not charged to the byte budget
    pub cached_visualization_bytes: usize,
}

#[derive(Default)]
struct RegistryState {
    assets: HashMap<AssetId, Arc<Asset>>,
    visualizations: HashMap<AssetId, Arc<VisualizationResult>>,
    total_bytes: usize,
}

impl RegistryState {
    /// Drop an asset and its cached visualization, keeping byte accounting
    /// in step.
    fn remove(&mut self, id: &AssetId) -> Option<Arc<Asset>> {
        let asset = self.assets.remove(id)?;
        self.visualizations.remove(id);

        let size = asset.size_bytes();
        if size > self.total_bytes {
            warn!(
                asset = %id,
                size,
                total = self.total_bytes,
                "byte accounting underflow, resetting"
            );
        }
        self.total_bytes = self.total_bytes.saturating_sub(size);
        Some(asset)
    }

    /// Remove everything expired at `now`.
    fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let expired: Vec<AssetId> = self
            .assets
            .values()
            .filter(|asset| asset.is_expired(now))
            .map(|asset| asset.id)
            .collect();

        for id in &expired {
            self.remove(id);
            debug!(asset = %id, "asset expired");
        }
        expired.len()
    }
}

/// Thread-safe registry of assets keyed by [`AssetId`].
///
/// Shared as `Arc<AssetRegistry>` between request handlers and the background
/// sweeper.
pub struct AssetRegistry {
    state: Mutex<RegistryState>,
    limits: RegistryLimits,
    clock: Arc<dyn Clock>,
}

impl AssetRegistry {
    /// Create a registry driven by the system clock.
    pub fn new(limits: RegistryLimits) -> Self {
        Self::with_clock(limits, Arc::new(SystemClock))
    }

    /// Create a registry with an injected clock.
    pub fn with_clock(limits: RegistryLimits, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            limits,
            clock,
        }
    }

    pub fn limits(&self) -> &RegistryLimits {
        &self.limits
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        // A panic while holding the lock cannot leave a half-applied update:
        // every mutation completes its bookkeeping before returning.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store a new asset under a freshly generated id and return it.
    ///
    /// Expired assets are purged first; live assets are never evicted to make
    /// room.
    ///
    /// # Errors
    /// * `InvalidConfig` if the TTL is not positive or pushes the expiry time
    ///   out of range
    /// * `RegistryFull` if the asset count or the byte budget would be exceeded
    pub fn register(
        &self,
        pcm: PcmBuffer,
        encoded: EncodedAudio,
        origin: AssetOrigin,
    ) -> Result<Arc<Asset>> {
        let now = self.clock.now();
        let expires_at = self.expiry_from(now)?;
        let mut state = self.lock();
        state.purge_expired(now);

        if state.assets.len() >= self.limits.max_assets {
            return Err(LabError::RegistryFull {
                reason: format!(
                    "{} assets stored (limit {})",
                    state.assets.len(),
                    self.limits.max_assets
                ),
            });
        }

        let size = pcm.size_bytes() + encoded.len();
        if state.total_bytes + size > self.limits.max_total_bytes {
            return Err(LabError::RegistryFull {
                reason: format!(
                    "storing {} more bytes would exceed the {} byte budget ({} in use)",
                    size, self.limits.max_total_bytes, state.total_bytes
                ),
            });
        }

        let mut id = AssetId::new();
        while state.assets.contains_key(&id) {
            id = AssetId::new();
        }

        let asset = Asset {
            id,
            pcm,
            encoded,
            origin,
            created_at: now,
            expires_at,
        };
        let asset = Arc::new(asset);

        state.total_bytes += size;
        state.assets.insert(id, Arc::clone(&asset));

        debug!(asset = %id, size, live = state.assets.len(), "asset registered");
        Ok(asset)
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let ttl = self.limits.ttl;
        if ttl <= Duration::zero() {
            return Err(LabError::InvalidConfig {
                reason: format!("asset ttl must be positive, got {}", ttl),
            });
        }
        now.checked_add_signed(ttl).ok_or_else(|| LabError::InvalidConfig {
            reason: format!("asset ttl {} puts the expiry time out of range", ttl),
        })
    }

    /// Look up a live asset.
    ///
    /// # Errors
    /// `AssetNotFound` if the id is unknown or the asset has expired (the
    /// expired entry is removed on the way out).
    pub fn get(&self, id: &AssetId) -> Result<Arc<Asset>> {
        let now = self.clock.now();
        let mut state = self.lock();

        match state.assets.get(id) {
            Some(asset) if !asset.is_expired(now) => Ok(Arc::clone(asset)),
            Some(_) => {
                state.remove(id);
                debug!(asset = %id, "asset expired on lookup");
                Err(not_found(id))
            }
            None => Err(not_found(id)),
        }
    }

    /// True if `id` refers to a live asset.
    pub fn contains(&self, id: &AssetId) -> bool {
        self.get(id).is_ok()
    }

    /// Remove an asset. Idempotent; returns whether anything was removed.
    pub fn delete(&self, id: &AssetId) -> bool {
        let removed = self.lock().remove(id).is_some();
        if removed {
            debug!(asset = %id, "asset deleted");
        }
        removed
    }

    /// Remove every asset whose expiry time has passed.
    ///
    /// Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let removed = self.lock().purge_expired(now);
        if removed > 0 {
            info!(removed, "expired assets swept");
        }
        removed
    }

    /// Attach a visualization to a live asset.
    ///
    /// # Errors
    /// `AssetNotFound` if the asset is gone, so the cache never outlives it.
    pub fn cache_visualization(
        &self,
        id: &AssetId,
        result: Arc<VisualizationResult>,
    ) -> Result<()> {
        let now = self.clock.now();
        let mut state = self.lock();
        match state.assets.get(id) {
            Some(asset) if !asset.is_expired(now) => {
                state.visualizations.insert(*id, result);
                Ok(())
            }
            _ => Err(not_found(id)),
        }
    }

    /// Cached visualization for a live asset, if one was stored.
    pub fn cached_visualization(&self, id: &AssetId) -> Option<Arc<VisualizationResult>> {
        let now = self.clock.now();
        let state = self.lock();
        match state.assets.get(id) {
            Some(asset) if !asset.is_expired(now) => state.visualizations.get(id).cloned(),
            _ => None,
        }
    }

    /// Number of stored entries (including expired ones not yet swept).
    pub fn len(&self) -> usize {
        self.lock().assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> RegistryStats {
        let state = self.lock();
        RegistryStats {
            assets: state.assets.len(),
            total_bytes: state.total_bytes,
            cached_visualizations: state.visualizations.len(),
            cached_visualization_bytes: state
                .visualizations
                .values()
                .map(|result| result.size_bytes())
                .sum(),
        }
    }
}

fn not_found(id: &AssetId) -> LabError {
    LabError::AssetNotFound { id: id.to_string() }
}
