// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership enforcement for row-level writes.
//!
//! Handlers resolve the caller to a stored [`User`] and pass it here before
//! touching a row they do not own. Admins bypass every check.

use super::repository::{Property, RentalAgreement, Transaction, User};
use super::{StorageError, StorageResult};
use crate::auth::Role;

/// Trait for resources that have an owner.
pub trait OwnedResource {
    /// Get the owner's user ID.
    fn owner_user_id(&self) -> &str;

    /// Resource name used in permission errors.
    fn resource_name(&self) -> &'static str;
}

/// Trait for enforcing ownership on storage operations.
pub trait OwnershipEnforcer {
    /// Verify that the user owns this resource or is an admin.
    ///
    /// # Errors
    /// Returns `StorageError::PermissionDenied` otherwise.
    fn verify_ownership(&self, user: &User) -> StorageResult<()>;
}

impl<T: OwnedResource> OwnershipEnforcer for T {
    fn verify_ownership(&self, user: &User) -> StorageResult<()> {
        if self.owner_user_id() == user.id || user.role.has_privilege(Role::Admin) {
            Ok(())
        } else {
            Err(StorageError::PermissionDenied {
                user_id: user.id.clone(),
                resource: self.resource_name().to_string(),
            })
        }
    }
}

/// Verify ownership on a lookup result and hand the resource back.
pub trait OwnershipCheck<T> {
    fn verify_owner(self, user: &User) -> StorageResult<T>;
}

impl<T: OwnedResource> OwnershipCheck<T> for StorageResult<T> {
    fn verify_owner(self, user: &User) -> StorageResult<T> {
        let resource = self?;
        resource.verify_ownership(user)?;
        Ok(resource)
    }
}

impl OwnedResource for User {
    fn owner_user_id(&self) -> &str {
        &self.id
    }

    fn resource_name(&self) -> &'static str {
        "user"
    }
}

impl OwnedResource for Property {
    fn owner_user_id(&self) -> &str {
        &self.owner_id
    }

    fn resource_name(&self) -> &'static str {
        "property"
    }
}

impl OwnedResource for RentalAgreement {
    fn owner_user_id(&self) -> &str {
        &self.tenant_id
    }

    fn resource_name(&self) -> &'static str {
        "rental agreement"
    }
}

impl OwnedResource for Transaction {
    fn owner_user_id(&self) -> &str {
        &self.user_id
    }

    fn resource_name(&self) -> &'static str {
        "transaction"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_user(role: Role) -> User {
        User::new("someone@example.com", "Someone", "$argon2id$stub", role, None)
    }

    #[test]
    fn ownership_verification_passes_for_owner() {
        let user = make_user(Role::Landlord);
        let property = Property::new(&user.id, "Loft", 100.0, 1, 1, 20.0);
        assert!(property.verify_ownership(&user).is_ok());
    }

    #[test]
    fn ownership_verification_fails_for_non_owner() {
        let owner = make_user(Role::Landlord);
        let other = make_user(Role::Landlord);
        let property = Property::new(&owner.id, "Loft", 100.0, 1, 1, 20.0);

        let result = property.verify_ownership(&other);
        assert!(matches!(
            result,
            Err(StorageError::PermissionDenied { ref resource, .. }) if resource == "property"
        ));
    }

    #[test]
    fn admin_bypasses_ownership() {
        let owner = make_user(Role::Tenant);
        let admin = make_user(Role::Admin);
        let tx = Transaction::new(&owner.id);
        assert!(tx.verify_ownership(&admin).is_ok());
    }

    #[test]
    fn ownership_check_on_result() {
        let user = make_user(Role::Tenant);
        let other = make_user(Role::Tenant);

        let result: StorageResult<Transaction> = Ok(Transaction::new(&user.id));
        assert!(result.verify_owner(&user).is_ok());

        let result: StorageResult<Transaction> = Ok(Transaction::new(&user.id));
        assert!(result.verify_owner(&other).is_err());

        let missing: StorageResult<Transaction> = Err(StorageError::NotFound("tx".into()));
        assert!(matches!(missing.verify_owner(&user), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn user_owns_itself() {
        let user = make_user(Role::Tenant);
        let other = make_user(Role::Tenant);
        assert!(user.verify_ownership(&user).is_ok());
        assert!(user.verify_ownership(&other).is_err());
    }
}
