//! Context Resolver
//!
//! Maps an incoming operation (optional registry name, optional schema
//! context) to a concrete registry descriptor plus the effective context
//! string. Resolution failures are terminal for the operation and are
//! never retried.

use crate::directory::{RegistryDescriptor, RegistryDirectory};
use crate::error::{GatewayError, Result};

/// The root schema context of a registry, substituted when the caller
/// omits a context.
pub const ROOT_CONTEXT: &str = ".";

pub struct ContextResolver<'a> {
    directory: &'a RegistryDirectory,
}

impl<'a> ContextResolver<'a> {
    pub fn new(directory: &'a RegistryDirectory) -> Self {
        Self { directory }
    }

    /// Resolve registry name and schema context to a descriptor and the
    /// effective context string.
    pub fn resolve(
        &self,
        registry: Option<&str>,
        context: Option<&str>,
    ) -> Result<(&'a RegistryDescriptor, String)> {
        let descriptor = self.directory.resolve(registry)?;
        let effective = match context {
            Some(ctx) => {
                validate_context(ctx)?;
                ctx.to_string()
            }
            None => ROOT_CONTEXT.to_string(),
        };
        Ok((descriptor, effective))
    }
}

/// Validate a schema-context string: non-empty, no path separators, no
/// traversal sequences, no whitespace or control characters. A leading
/// dot is allowed (Confluent context notation).
pub fn validate_context(context: &str) -> Result<()> {
    if context.is_empty() {
        return Err(GatewayError::InvalidContext {
            context: context.to_string(),
            cause: "empty context".to_string(),
        });
    }

    if context.contains('/') || context.contains('\\') {
        return Err(GatewayError::InvalidContext {
            context: context.to_string(),
            cause: "contains path separator".to_string(),
        });
    }

    if context.contains("..") {
        return Err(GatewayError::InvalidContext {
            context: context.to_string(),
            cause: "contains traversal sequence".to_string(),
        });
    }

    if context.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(GatewayError::InvalidContext {
            context: context.to_string(),
            cause: "contains whitespace or control characters".to_string(),
        });
    }

    Ok(())
}
