//! Policy Enforcer
//!
//! Access-mode and authorization checks, evaluated strictly before any
//! upstream dispatch. A denied operation never reaches a registry client,
//! so a read-only registry never observes a write attempt.

use crate::directory::RegistryDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// The fixed set of gateway operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    GetSchema,
    ListSubjects,
    ListVersions,
    ListContexts,
    GetCompatibility,
    CheckCompatibility,
    ExportSubject,
    RegisterSchema,
    DeleteSubject,
    UpdateCompatibility,
    ImportSubject,
    DeleteContext,
}

impl OperationKind {
    /// Mutating kinds change upstream state and are never auto-retried.
    /// Compatibility checks post a candidate schema but mutate nothing.
    pub fn is_mutating(self) -> bool {
        matches!(
            self,
            OperationKind::RegisterSchema
                | OperationKind::DeleteSubject
                | OperationKind::UpdateCompatibility
                | OperationKind::ImportSubject
                | OperationKind::DeleteContext
        )
    }

    pub fn required_scope(self) -> Scope {
        match self {
            OperationKind::DeleteContext => Scope::Admin,
            kind if kind.is_mutating() => Scope::Write,
            _ => Scope::Read,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::GetSchema => "get-schema",
            OperationKind::ListSubjects => "list-subjects",
            OperationKind::ListVersions => "list-versions",
            OperationKind::ListContexts => "list-contexts",
            OperationKind::GetCompatibility => "get-compatibility",
            OperationKind::CheckCompatibility => "check-compatibility",
            OperationKind::ExportSubject => "export-subject",
            OperationKind::RegisterSchema => "register-schema",
            OperationKind::DeleteSubject => "delete-subject",
            OperationKind::UpdateCompatibility => "update-compatibility",
            OperationKind::ImportSubject => "import-subject",
            OperationKind::DeleteContext => "delete-context",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authorization tiers. Scopes are an explicit set on each call: holding
/// `admin` does not imply `write`, and `write` does not imply `read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Read,
    Write,
    Admin,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Read => "read",
            Scope::Write => "write",
            Scope::Admin => "admin",
        }
    }
}

/// Outcome of a policy check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    ReadOnlyRegistry,
    ReadOnlyMode,
    InsufficientScope { required: Scope },
}

pub struct PolicyEnforcer {
    global_read_only: bool,
}

impl PolicyEnforcer {
    pub fn new(global_read_only: bool) -> Self {
        Self { global_read_only }
    }

    /// Ordered decision table, first match wins:
    /// 1. mutating against a read-only registry
    /// 2. mutating while the gateway is globally read-only
    /// 3. required scope not held
    /// 4. allow
    pub fn authorize(
        &self,
        kind: OperationKind,
        registry: &RegistryDescriptor,
        scopes: &[Scope],
    ) -> Decision {
        if kind.is_mutating() && registry.read_only {
            warn!(
                "Denied {} on read-only registry '{}'",
                kind, registry.name
            );
            return Decision::Deny(DenyReason::ReadOnlyRegistry);
        }

        if kind.is_mutating() && self.global_read_only {
            warn!("Denied {} while gateway is in global read-only mode", kind);
            return Decision::Deny(DenyReason::ReadOnlyMode);
        }

        let required = kind.required_scope();
        if !scopes.contains(&required) {
            warn!(
                "Denied {}: caller lacks '{}' scope",
                kind,
                required.as_str()
            );
            return Decision::Deny(DenyReason::InsufficientScope { required });
        }

        Decision::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::RegistryDescriptor;

    fn descriptor(read_only: bool) -> RegistryDescriptor {
        RegistryDescriptor {
            name: "staging".to_string(),
            base_url: "http://staging.example.com:8081".to_string(),
            user: None,
            password: None,
            read_only,
        }
    }

    const MUTATING: [OperationKind; 5] = [
        OperationKind::RegisterSchema,
        OperationKind::DeleteSubject,
        OperationKind::UpdateCompatibility,
        OperationKind::ImportSubject,
        OperationKind::DeleteContext,
    ];

    #[test]
    fn test_read_only_registry_denies_all_mutations() {
        let enforcer = PolicyEnforcer::new(false);
        let registry = descriptor(true);

        // Scopes are irrelevant: the read-only flag dominates.
        let all = [Scope::Read, Scope::Write, Scope::Admin];
        for kind in MUTATING {
            assert_eq!(
                enforcer.authorize(kind, &registry, &all),
                Decision::Deny(DenyReason::ReadOnlyRegistry),
                "{} should be denied on a read-only registry",
                kind
            );
        }
    }

    #[test]
    fn test_read_only_registry_still_serves_reads() {
        let enforcer = PolicyEnforcer::new(false);
        let registry = descriptor(true);

        assert_eq!(
            enforcer.authorize(OperationKind::GetSchema, &registry, &[Scope::Read]),
            Decision::Allow
        );
        assert_eq!(
            enforcer.authorize(OperationKind::CheckCompatibility, &registry, &[Scope::Read]),
            Decision::Allow
        );
    }

    #[test]
    fn test_global_read_only_mode() {
        let enforcer = PolicyEnforcer::new(true);
        let registry = descriptor(false);

        assert_eq!(
            enforcer.authorize(OperationKind::RegisterSchema, &registry, &[Scope::Write]),
            Decision::Deny(DenyReason::ReadOnlyMode)
        );
        // Reads pass through in global read-only mode.
        assert_eq!(
            enforcer.authorize(OperationKind::ListSubjects, &registry, &[Scope::Read]),
            Decision::Allow
        );
    }

    #[test]
    fn test_read_only_registry_checked_before_global_mode() {
        let enforcer = PolicyEnforcer::new(true);
        let registry = descriptor(true);

        assert_eq!(
            enforcer.authorize(OperationKind::DeleteSubject, &registry, &[Scope::Write]),
            Decision::Deny(DenyReason::ReadOnlyRegistry)
        );
    }

    #[test]
    fn test_scope_requirements() {
        let enforcer = PolicyEnforcer::new(false);
        let registry = descriptor(false);

        assert_eq!(
            enforcer.authorize(OperationKind::GetSchema, &registry, &[]),
            Decision::Deny(DenyReason::InsufficientScope {
                required: Scope::Read
            })
        );
        assert_eq!(
            enforcer.authorize(OperationKind::RegisterSchema, &registry, &[Scope::Read]),
            Decision::Deny(DenyReason::InsufficientScope {
                required: Scope::Write
            })
        );
        assert_eq!(
            enforcer.authorize(OperationKind::DeleteContext, &registry, &[Scope::Write]),
            Decision::Deny(DenyReason::InsufficientScope {
                required: Scope::Admin
            })
        );
        assert_eq!(
            enforcer.authorize(OperationKind::DeleteContext, &registry, &[Scope::Admin]),
            Decision::Allow
        );
    }

    #[test]
    fn test_scopes_are_not_tiered() {
        let enforcer = PolicyEnforcer::new(false);
        let registry = descriptor(false);

        // Holding admin alone does not grant read or write.
        assert_eq!(
            enforcer.authorize(OperationKind::GetSchema, &registry, &[Scope::Admin]),
            Decision::Deny(DenyReason::InsufficientScope {
                required: Scope::Read
            })
        );
        assert_eq!(
            enforcer.authorize(OperationKind::RegisterSchema, &registry, &[Scope::Admin]),
            Decision::Deny(DenyReason::InsufficientScope {
                required: Scope::Write
            })
        );
    }

    #[test]
    fn test_kind_wire_names() {
        let kind: OperationKind = serde_json::from_str("\"register-schema\"").unwrap();
        assert_eq!(kind, OperationKind::RegisterSchema);
        assert_eq!(kind.as_str(), "register-schema");

        let kind: OperationKind = serde_json::from_str("\"check-compatibility\"").unwrap();
        assert!(!kind.is_mutating());
    }
}
