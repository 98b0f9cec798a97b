use ipnetwork::IpNetwork;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// A single configured upstream registry, as read from the environment.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub name: String,
    pub url: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub read_only: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub registries: Vec<RegistryConfig>,
    pub default_registry: String,
    pub global_read_only: bool,
    pub request_timeout: Duration,
    pub retry_count: u32,
    pub gateway_host: String,
    pub gateway_port: u16,
    pub allowed_networks: Vec<IpNetwork>,
}

/// Highest index probed for REGISTRY_NAME_{n} style variables.
const MAX_INDEXED_REGISTRIES: u32 = 8;

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let mut registries = Vec::new();

        // Indexed multi-registry set: REGISTRY_NAME_1..8 with matching
        // REGISTRY_URL_n, optional REGISTRY_USER_n / REGISTRY_PASSWORD_n /
        // REGISTRY_READONLY_n.
        for i in 1..=MAX_INDEXED_REGISTRIES {
            let name = match env::var(format!("REGISTRY_NAME_{}", i)) {
                Ok(name) => name,
                Err(_) => continue,
            };

            let url = env::var(format!("REGISTRY_URL_{}", i)).map_err(|_| {
                anyhow::anyhow!("REGISTRY_NAME_{} is set but REGISTRY_URL_{} is missing", i, i)
            })?;

            registries.push(RegistryConfig {
                name,
                url,
                user: env::var(format!("REGISTRY_USER_{}", i)).ok(),
                password: env::var(format!("REGISTRY_PASSWORD_{}", i)).ok(),
                read_only: parse_bool(&format!("REGISTRY_READONLY_{}", i)),
            });
        }

        // Single-registry shorthand: SCHEMA_REGISTRY_URL registers one
        // upstream named "default" when no indexed set is present.
        if registries.is_empty() {
            if let Ok(url) = env::var("SCHEMA_REGISTRY_URL") {
                registries.push(RegistryConfig {
                    name: "default".to_string(),
                    url,
                    user: env::var("SCHEMA_REGISTRY_USER").ok(),
                    password: env::var("SCHEMA_REGISTRY_PASSWORD").ok(),
                    read_only: parse_bool("SCHEMA_REGISTRY_READONLY"),
                });
            }
        }

        let default_registry = env::var("DEFAULT_REGISTRY").unwrap_or_else(|_| {
            registries
                .first()
                .map(|r| r.name.clone())
                .unwrap_or_else(|| "default".to_string())
        });

        let global_read_only = parse_bool("GLOBAL_READONLY");

        let request_timeout_secs: u64 = env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        let retry_count = env::var("RETRY_COUNT")
            .unwrap_or_else(|_| "2".to_string())
            .parse()
            .unwrap_or(2);

        let gateway_host = env::var("GATEWAY_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let gateway_port = env::var("GATEWAY_PORT")
            .unwrap_or_else(|_| "9000".to_string())
            .parse()
            .unwrap_or(9000);

        let allowed_networks_str =
            env::var("ALLOWED_NETWORKS").unwrap_or_else(|_| "127.0.0.0/8,::1/128".to_string());

        let allowed_networks = allowed_networks_str
            .split(',')
            .filter_map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    IpNetwork::from_str(trimmed).ok()
                }
            })
            .collect();

        Ok(Config {
            registries,
            default_registry,
            global_read_only,
            request_timeout: Duration::from_secs(request_timeout_secs),
            retry_count,
            gateway_host,
            gateway_port,
            allowed_networks,
        })
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.gateway_host, self.gateway_port);
        addr.parse()
            .map_err(|e| anyhow::anyhow!("Invalid socket address: {}", e))
    }
}

fn parse_bool(var: &str) -> bool {
    env::var(var)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
