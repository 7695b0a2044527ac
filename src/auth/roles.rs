// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.

use serde::{Deserialize, Serialize};

/// User roles for authorization.
///
/// ## Role Hierarchy
///
/// - `Admin` - Full access to every user, listing, agreement and record
/// - `Landlord` - Publishes and manages own property listings
/// - `Tenant` - Signs rental agreements and records own payments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Rents properties (default for new accounts)
    #[default]
    Tenant,
    /// Lists properties
    Landlord,
    /// Full administrative access
    Admin,
}

impl Role {
    /// Check if this role has at least the privileges of the required role.
    pub fn has_privilege(&self, required: Role) -> bool {
        match (self, required) {
            // Admin can do anything
            (Role::Admin, _) => true,
            (Role::Landlord, Role::Landlord) => true,
            (Role::Tenant, Role::Tenant) => true,
            _ => false,
        }
    }

    /// Whether this role may publish property listings.
    pub fn can_list_properties(&self) -> bool {
        self.has_privilege(Role::Landlord)
    }

    /// Parse role from string (case-insensitive).
    pub fn from_str(s: &str) -> Option<Role> {
        match s.to_lowercase().as_str() {
            "tenant" => Some(Role::Tenant),
            "landlord" => Some(Role::Landlord),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Tenant => write!(f, "tenant"),
            Role::Landlord => write!(f, "landlord"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_has_all_privileges() {
        assert!(Role::Admin.has_privilege(Role::Admin));
        assert!(Role::Admin.has_privilege(Role::Landlord));
        assert!(Role::Admin.has_privilege(Role::Tenant));
    }

    #[test]
    fn tenant_only_has_tenant_privilege() {
        assert!(!Role::Tenant.has_privilege(Role::Admin));
        assert!(!Role::Tenant.has_privilege(Role::Landlord));
        assert!(Role::Tenant.has_privilege(Role::Tenant));
        assert!(!Role::Tenant.can_list_properties());
        assert!(Role::Landlord.can_list_properties());
    }

    #[test]
    fn from_str_parses_correctly() {
        assert_eq!(Role::from_str("landlord"), Some(Role::Landlord));
        assert_eq!(Role::from_str("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::from_str("Tenant"), Some(Role::Tenant));
        assert_eq!(Role::from_str("client"), None);
    }

    #[test]
    fn default_role_is_tenant() {
        assert_eq!(Role::default(), Role::Tenant);
        assert_eq!(Role::Landlord.to_string(), "landlord");
    }
}
