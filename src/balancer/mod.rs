pub mod registry;
pub mod round_robin;

pub use registry::BalancerRegistry;
pub use round_robin::RoundRobin;

use crate::config::BalancingStrategy;
use crate::error::{GatewayError, Result};

/// Target election strategy.
///
/// Modeled as a closed set of variants rather than a trait object; adding a
/// strategy means adding a variant here and an arm to `elect`.
#[derive(Debug)]
pub enum Balancer {
    RoundRobin(RoundRobin),
}

impl Balancer {
    /// Construct the balancer for a service's configured strategy.
    ///
    /// `least_conn` and `ip_hash` are accepted by the configuration schema
    /// but have no implementation yet; asking for one is a configuration
    /// defect surfaced per request.
    pub fn new(strategy: BalancingStrategy, service: &str) -> Result<Self> {
        match strategy {
            BalancingStrategy::RoundRobin => Ok(Balancer::RoundRobin(RoundRobin::new())),
            other => Err(GatewayError::UnsupportedStrategy {
                service: service.to_string(),
                strategy: other,
            }),
        }
    }

    /// Elect one target from a non-empty ordered target list.
    pub fn elect<'a>(&self, targets: &'a [String]) -> Result<&'a str> {
        match self {
            Balancer::RoundRobin(round_robin) => round_robin.elect(targets),
        }
    }
}
