use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::config::ServiceConfig;

/// Prefix route table mapping listen paths to service definitions.
///
/// Built once at startup from the validated service list and read-only for
/// the lifetime of the server. Matching is byte-wise literal prefix, not
/// segment-aware: the prefix `/api` matches `/api/users` and also `/apiv2`.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: BTreeMap<String, ServiceConfig>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a route table from a service list, skipping disabled services.
    pub fn from_services(services: &[ServiceConfig]) -> Self {
        let mut table = Self::new();
        for service in services {
            if !service.enabled {
                debug!(service = %service.name, "skipping disabled service");
                continue;
            }
            info!(
                service = %service.name,
                listen_path = %service.proxy.listen_path,
                targets = service.proxy.upstream.targets.len(),
                "registered route"
            );
            table.insert(service.proxy.listen_path.clone(), service.clone());
        }
        table
    }

    /// Register a prefix. Inserting the same prefix twice keeps the last
    /// service registered under it.
    pub fn insert(&mut self, prefix: impl Into<String>, service: ServiceConfig) {
        self.routes.insert(prefix.into(), service);
    }

    /// Return the longest registered prefix that is a literal prefix of
    /// `path`, together with its service, or `None` if nothing matches.
    pub fn longest_match(&self, path: &str) -> Option<(&str, &ServiceConfig)> {
        self.routes
            .iter()
            .filter(|(prefix, _)| path.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(prefix, service)| (prefix.as_str(), service))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BalancingStrategy, ProxyOptions, UpstreamConfig};

    fn service(name: &str, listen_path: &str, enabled: bool) -> ServiceConfig {
        ServiceConfig {
            name: name.to_string(),
            enabled,
            description: None,
            proxy: ProxyOptions {
                listen_path: listen_path.to_string(),
                upstream: UpstreamConfig {
                    balancing: BalancingStrategy::RoundRobin,
                    targets: vec![format!("http://{}.internal:8080", name)],
                },
                strip_path: false,
                append_path: false,
                methods: vec![],
            },
        }
    }

    #[test]
    fn test_longest_prefix_wins() {
        let mut table = RouteTable::new();
        table.insert("/api", service("api", "/api", true));
        table.insert("/api/v1", service("api-v1", "/api/v1", true));

        let (prefix, matched) = table.longest_match("/api/v1/orders").unwrap();
        assert_eq!(prefix, "/api/v1");
        assert_eq!(matched.name, "api-v1");

        let (prefix, matched) = table.longest_match("/api/v2/orders").unwrap();
        assert_eq!(prefix, "/api");
        assert_eq!(matched.name, "api");
    }

    #[test]
    fn test_literal_prefix_is_not_segment_aware() {
        let mut table = RouteTable::new();
        table.insert("/api", service("api", "/api", true));

        // No implicit trailing-slash boundary: /api matches /apiv2 too.
        let (prefix, _) = table.longest_match("/apiv2/users").unwrap();
        assert_eq!(prefix, "/api");
    }

    #[test]
    fn test_no_match_reports_not_found() {
        let mut table = RouteTable::new();
        table.insert("/orders", service("orders", "/orders", true));

        assert!(table.longest_match("/payments").is_none());
    }

    #[test]
    fn test_duplicate_prefix_last_insert_wins() {
        let mut table = RouteTable::new();
        table.insert("/api", service("first", "/api", true));
        table.insert("/api", service("second", "/api", true));

        assert_eq!(table.len(), 1);
        let (_, matched) = table.longest_match("/api/x").unwrap();
        assert_eq!(matched.name, "second");
    }

    #[test]
    fn test_disabled_services_are_not_registered() {
        let services = vec![
            service("live", "/live", true),
            service("dark", "/dark", false),
        ];
        let table = RouteTable::from_services(&services);

        assert_eq!(table.len(), 1);
        assert!(table.longest_match("/live/ping").is_some());
        assert!(table.longest_match("/dark/ping").is_none());
    }

    #[test]
    fn test_root_prefix_matches_everything() {
        let mut table = RouteTable::new();
        table.insert("/", service("catch-all", "/", true));
        table.insert("/api", service("api", "/api", true));

        let (prefix, _) = table.longest_match("/anything").unwrap();
        assert_eq!(prefix, "/");
        let (prefix, _) = table.longest_match("/api/users").unwrap();
        assert_eq!(prefix, "/api");
    }
}
