//! Registry of running balance monitors.

use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::Address;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::bridge::BridgeHandle;
use crate::monitor::balance::{
    BalanceMonitor, ChainHandle, MonitorError, MonitorKey, MonitorResult, MonitorSettings,
};
use crate::observability::metrics;

/// Owns every monitor, at most one per `(chain, address)`.
pub struct MonitorRegistry {
    chains: HashMap<String, ChainHandle>,
    settings: MonitorSettings,
    bridge: BridgeHandle,
    monitors: DashMap<MonitorKey, Arc<BalanceMonitor>>,
}

impl MonitorRegistry {
    pub fn new(
        chains: impl IntoIterator<Item = ChainHandle>,
        settings: MonitorSettings,
        bridge: BridgeHandle,
    ) -> Self {
        let chains = chains
            .into_iter()
            .map(|chain| (chain.name().to_string(), chain))
            .collect();

        Self {
            chains,
            settings,
            bridge,
            monitors: DashMap::new(),
        }
    }

    /// Look up a chain by name (case-insensitive).
    pub fn chain(&self, name: &str) -> Option<&ChainHandle> {
        self.chains.get(&name.trim().to_ascii_lowercase())
    }

    /// All configured chains, sorted by name.
    pub fn chains(&self) -> Vec<&ChainHandle> {
        let mut chains: Vec<_> = self.chains.values().collect();
        chains.sort_by(|a, b| a.name().cmp(b.name()));
        chains
    }

    /// Address watched when a caller does not name one.
    pub fn default_address(&self) -> Option<Address> {
        self.bridge.credential().map(|c| c.address())
    }

    /// Start monitoring `address` on `chain`.
    ///
    /// An existing monitor for the key is returned untouched. A new monitor
    /// is reserved in the map before it starts, so concurrent callers share
    /// one instance; if its start fails the reservation is removed.
    pub async fn start_monitoring(
        &self,
        chain: &str,
        address: Address,
        user_id: u64,
    ) -> MonitorResult<Arc<BalanceMonitor>> {
        let key = MonitorKey::new(chain, address);
        let handle = self
            .chains
            .get(&key.chain)
            .ok_or_else(|| MonitorError::UnknownChain(key.chain.clone()))?;

        let monitor = match self.monitors.entry(key.clone()) {
            Entry::Occupied(existing) => {
                tracing::debug!(monitor = %key, "Monitor already registered");
                return Ok(existing.get().clone());
            }
            Entry::Vacant(slot) => {
                let monitor = Arc::new(BalanceMonitor::new(
                    key.clone(),
                    user_id,
                    handle,
                    self.settings.clone(),
                    self.bridge.clone(),
                )?);
                slot.insert(monitor.clone());
                monitor
            }
        };

        if let Err(e) = monitor.start().await {
            self.monitors
                .remove_if(&key, |_, current| Arc::ptr_eq(current, &monitor));
            tracing::error!(monitor = %key, error = %e, "Failed to start monitor");
            self.record_size();
            return Err(e);
        }

        self.record_size();
        Ok(monitor)
    }

    pub fn get(&self, chain: &str, address: Address) -> Option<Arc<BalanceMonitor>> {
        self.monitors
            .get(&MonitorKey::new(chain, address))
            .map(|m| m.value().clone())
    }

    /// All monitors, sorted by key.
    pub fn list(&self) -> Vec<Arc<BalanceMonitor>> {
        let mut monitors: Vec<_> = self.monitors.iter().map(|m| m.value().clone()).collect();
        monitors.sort_by(|a, b| a.key().cmp(b.key()));
        monitors
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    /// Stop and remove a monitor. Returns false if none was registered.
    pub async fn stop_monitoring(&self, chain: &str, address: Address) -> bool {
        let Some((_, monitor)) = self.monitors.remove(&MonitorKey::new(chain, address)) else {
            return false;
        };
        monitor.stop().await;
        self.record_size();
        true
    }

    /// Stop and remove every monitor.
    pub async fn stop_all(&self) {
        let keys: Vec<MonitorKey> = self.monitors.iter().map(|m| m.key().clone()).collect();
        for key in keys {
            if let Some((_, monitor)) = self.monitors.remove(&key) {
                monitor.stop().await;
            }
        }
        self.record_size();
        tracing::info!("All monitors stopped");
    }

    fn record_size(&self) {
        metrics::record_active_monitors(self.monitors.len());
    }
}

impl std::fmt::Debug for MonitorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorRegistry")
            .field("chains", &self.chains.keys().collect::<Vec<_>>())
            .field("monitors", &self.monitors.len())
            .finish_non_exhaustive()
    }
}
