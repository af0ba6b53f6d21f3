//! Coordinators keyed by a stable subscription id.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use crate::coordinator::Coordinator;

/// Owns one coordinator per subscription id, usually
/// [`FilterConfig::unique_id`](crate::config::FilterConfig::unique_id).
pub struct CoordinatorRegistry<C> {
    coordinators: BTreeMap<String, Arc<Coordinator<C>>>,
}

impl<C> Default for CoordinatorRegistry<C> {
    fn default() -> Self {
        Self {
            coordinators: BTreeMap::new(),
        }
    }
}

impl<C> CoordinatorRegistry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `coordinator` under `id`, returning any coordinator it replaced.
    pub fn insert(
        &mut self,
        id: impl Into<String>,
        coordinator: Arc<Coordinator<C>>,
    ) -> Option<Arc<Coordinator<C>>> {
        let id = id.into();
        info!(%id, "Coordinator registered");
        self.coordinators.insert(id, coordinator)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Coordinator<C>>> {
        self.coordinators.get(id).cloned()
    }

    pub fn remove(&mut self, id: &str) -> Option<Arc<Coordinator<C>>> {
        let removed = self.coordinators.remove(id);
        if removed.is_some() {
            info!(%id, "Coordinator removed");
        }
        removed
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.coordinators.keys().map(String::as_str)
    }
}
