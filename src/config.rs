use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use url::Url;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub gateway: GatewaySettings,
    pub services: Vec<ServiceConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct GatewaySettings {
    pub port: u16,
    #[serde(default)]
    pub log_level: LogLevel,
    /// When set, the dispatcher adds X-Gateway and X-Gateway-Request-Id
    /// headers to forwarded requests.
    #[serde(default)]
    pub gateway_headers: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Configuration for one backend service reachable through the gateway
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    pub name: String,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub proxy: ProxyOptions,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ProxyOptions {
    pub listen_path: String,
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub strip_path: bool,
    #[serde(default)]
    pub append_path: bool,
    /// Allowed HTTP methods; parsed for forward compatibility, not enforced.
    #[serde(default)]
    pub methods: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamConfig {
    #[serde(default)]
    pub balancing: BalancingStrategy,
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum BalancingStrategy {
    #[default]
    #[serde(rename = "roundrobin")]
    RoundRobin,
    #[serde(rename = "least_conn")]
    LeastConn,
    #[serde(rename = "ip_hash")]
    IpHash,
}

impl BalancingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BalancingStrategy::RoundRobin => "roundrobin",
            BalancingStrategy::LeastConn => "least_conn",
            BalancingStrategy::IpHash => "ip_hash",
        }
    }
}

impl fmt::Display for BalancingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl GatewayConfig {
    /// Load configuration from a JSON file
    pub async fn load(path: &str) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: GatewayConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.gateway.port == 0 {
            anyhow::bail!("Gateway port cannot be zero");
        }

        if self.services.is_empty() {
            anyhow::bail!("No services defined in configuration");
        }

        let mut names = HashSet::new();
        for (index, service) in self.services.iter().enumerate() {
            if service.name.is_empty() {
                anyhow::bail!("Service at index {} has no name", index);
            }

            if !names.insert(service.name.as_str()) {
                anyhow::bail!("Duplicate service name: '{}'", service.name);
            }

            if service.proxy.listen_path.is_empty() {
                anyhow::bail!("Service '{}' has no listen path", service.name);
            }

            if !service.proxy.listen_path.starts_with('/') {
                anyhow::bail!(
                    "Service '{}' listen path must start with a '/'",
                    service.name
                );
            }

            validate_upstream(&service.proxy.upstream, &service.name)?;
        }

        Ok(())
    }
}

fn validate_upstream(upstream: &UpstreamConfig, service_name: &str) -> Result<()> {
    if upstream.targets.is_empty() {
        anyhow::bail!("Service '{}' has no upstream targets", service_name);
    }

    for (index, target) in upstream.targets.iter().enumerate() {
        Url::parse(target).with_context(|| {
            format!(
                "Service '{}' has invalid target URL at index {}: {}",
                service_name, index, target
            )
        })?;
    }

    Ok(())
}
