use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::config::UpstreamConfig;
use crate::error::Result;

use super::Balancer;

/// Per-service balancer cache.
///
/// One balancer is created per service name on first dispatch and reused for
/// the lifetime of the server, so round-robin cursors persist across
/// requests. The map is sharded (`DashMap`), so first-creation races for the
/// same name converge on one instance without serializing unrelated services
/// through a global lock. Entries are never evicted.
#[derive(Debug, Default)]
pub struct BalancerRegistry {
    balancers: DashMap<String, Arc<Balancer>>,
}

impl BalancerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached balancer for `service`, constructing it on first use.
    pub fn get_or_create(&self, service: &str, upstream: &UpstreamConfig) -> Result<Arc<Balancer>> {
        if let Some(existing) = self.balancers.get(service) {
            return Ok(existing.clone());
        }

        match self.balancers.entry(service.to_string()) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let balancer = Arc::new(Balancer::new(upstream.balancing, service)?);
                debug!(service, strategy = %upstream.balancing, "created balancer");
                Ok(entry.insert(balancer).clone())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.balancers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balancers.is_empty()
    }
}
