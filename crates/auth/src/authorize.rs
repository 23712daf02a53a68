//! Pure authorization policy checks.

use std::collections::HashSet;

use thiserror::Error;

use stockpilot_core::TenantId;

use crate::{Permission, PrincipalId, TenantMembership};

/// A fully resolved principal for authorization decisions.
///
/// Construction is decoupled from storage and transport: the API layer
/// derives memberships from verified claims and its role policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub principal_id: PrincipalId,
    pub active_tenant_id: TenantId,
    pub membership: TenantMembership,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("tenant mismatch")]
    TenantMismatch,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Command-side authorization contract (checked at the command boundary).
///
/// Implement this on commands that require permissions. The API layer
/// enforces the requirements before dispatching.
pub trait CommandAuthorization {
    fn required_permissions(&self) -> &[Permission];
}

/// Authorize a principal within its active tenant context.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    if principal.active_tenant_id != principal.membership.tenant_id {
        return Err(AuthzError::TenantMismatch);
    }

    let perms: HashSet<&str> = principal
        .membership
        .permissions
        .iter()
        .map(|p| p.as_str())
        .collect();

    if perms.contains("*") || perms.contains(required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;

    fn principal_with(perms: Vec<Permission>) -> Principal {
        let tenant_id = TenantId::new();
        Principal {
            principal_id: PrincipalId::new(),
            active_tenant_id: tenant_id,
            membership: TenantMembership {
                tenant_id,
                roles: vec![Role::new("clerk")],
                permissions: perms,
            },
        }
    }

    #[test]
    fn explicit_permission_is_granted() {
        let p = principal_with(vec![Permission::new("products.create")]);
        assert!(authorize(&p, &Permission::new("products.create")).is_ok());
    }

    #[test]
    fn wildcard_grants_everything() {
        let p = principal_with(vec![Permission::new("*")]);
        assert!(authorize(&p, &Permission::new("purchases.orders.approve")).is_ok());
    }

    #[test]
    fn missing_permission_is_forbidden() {
        let p = principal_with(vec![Permission::new("products.read")]);
        match authorize(&p, &Permission::new("products.create")) {
            Err(AuthzError::Forbidden(perm)) => assert_eq!(perm, "products.create"),
            other => panic!("Expected Forbidden, got {other:?}"),
        }
    }

    #[test]
    fn tenant_mismatch_is_rejected_before_permission_checks() {
        let mut p = principal_with(vec![Permission::new("*")]);
        p.active_tenant_id = TenantId::new();
        assert_eq!(
            authorize(&p, &Permission::new("products.read")),
            Err(AuthzError::TenantMismatch)
        );
    }
}
