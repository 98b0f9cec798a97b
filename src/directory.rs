//! Registry Directory
//!
//! Holds the set of configured upstream registries. Built once from the
//! process configuration and read-only thereafter; concurrent calls share
//! it without synchronization.

use crate::config::Config;
use crate::error::{GatewayError, Result};
use serde::Serialize;
use std::collections::HashMap;

/// A configured upstream Schema Registry instance.
#[derive(Debug, Clone)]
pub struct RegistryDescriptor {
    pub name: String,
    pub base_url: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub read_only: bool,
}

/// Wire shape for directory listings. Credentials never leave the process.
#[derive(Debug, Serialize)]
pub struct RegistrySummary {
    pub name: String,
    pub url: String,
    pub read_only: bool,
    pub is_default: bool,
}

#[derive(Debug)]
pub struct RegistryDirectory {
    registries: HashMap<String, RegistryDescriptor>,
    default_name: String,
}

impl RegistryDirectory {
    /// Build the directory from startup configuration. Fails when zero
    /// registries are configured, a name appears twice, or the designated
    /// default is not among the configured set.
    pub fn from_config(config: &Config) -> Result<Self> {
        if config.registries.is_empty() {
            return Err(GatewayError::Configuration {
                message: "no registries configured".to_string(),
            });
        }

        let mut registries = HashMap::new();

        for rc in &config.registries {
            if !is_valid_registry_name(&rc.name) {
                return Err(GatewayError::Configuration {
                    message: format!(
                        "Invalid registry name: '{}'. Must be alphanumeric with underscores or hyphens.",
                        rc.name
                    ),
                });
            }

            let descriptor = RegistryDescriptor {
                name: rc.name.clone(),
                base_url: rc.url.trim_end_matches('/').to_string(),
                user: rc.user.clone(),
                password: rc.password.clone(),
                read_only: rc.read_only,
            };

            if registries.insert(rc.name.clone(), descriptor).is_some() {
                return Err(GatewayError::Configuration {
                    message: format!("Duplicate registry name: '{}'", rc.name),
                });
            }
        }

        if !registries.contains_key(&config.default_registry) {
            return Err(GatewayError::Configuration {
                message: format!(
                    "Default registry '{}' is not among the configured registries",
                    config.default_registry
                ),
            });
        }

        Ok(Self {
            registries,
            default_name: config.default_registry.clone(),
        })
    }

    /// Resolve a registry by name; an omitted name resolves to the default.
    pub fn resolve(&self, name: Option<&str>) -> Result<&RegistryDescriptor> {
        let name = name.unwrap_or(&self.default_name);
        self.registries
            .get(name)
            .ok_or_else(|| GatewayError::UnknownRegistry {
                name: name.to_string(),
            })
    }

    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registries.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.registries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registries.is_empty()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &RegistryDescriptor> {
        self.registries.values()
    }

    pub fn summaries(&self) -> Vec<RegistrySummary> {
        let mut summaries: Vec<RegistrySummary> = self
            .registries
            .values()
            .map(|d| RegistrySummary {
                name: d.name.clone(),
                url: d.base_url.clone(),
                read_only: d.read_only,
                is_default: d.name == self.default_name,
            })
            .collect();

        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }
}

/// Check registry names: alphanumeric plus underscore and hyphen.
fn is_valid_registry_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
