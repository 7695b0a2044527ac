// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User repository.
//!
//! Users own properties and transactions and act as tenants on rental
//! agreements. Deleting a user removes all of those rows in the same write
//! transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::constraints::{
    ensure, is_email_shape, is_wallet_address, normalize_address, normalize_email, CheckResult,
    ConstraintViolation,
};
use super::super::database::{
    all_rows, children, claim_unique, get_row, put_row, swap_unique, Database, StorageError,
    StorageResult, Tables, USERS, USERS_EMAIL, USERS_WALLET,
};
use super::{agreements, properties, transactions};
use crate::auth::Role;

const TABLE: &str = "users";

/// Stored user account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Unique user identifier (UUID)
    pub id: String,
    /// Normalized email address (unique)
    pub email: String,
    pub full_name: String,
    /// Argon2id PHC string
    pub password_hash: String,
    pub role: Role,
    /// Ethereum wallet address (unique, case-insensitive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new active, unverified user.
    pub fn new(
        email: &str,
        full_name: impl Into<String>,
        password_hash: impl Into<String>,
        role: Role,
        wallet_address: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email: normalize_email(email),
            full_name: full_name.into(),
            password_hash: password_hash.into(),
            role,
            wallet_address,
            is_active: true,
            is_verified: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Row-level check constraints.
    pub fn validate(&self) -> CheckResult {
        ensure(is_email_shape(&self.email), TABLE, "ck_users_email_format")?;
        ensure(!self.full_name.trim().is_empty(), TABLE, "ck_users_full_name_not_empty")?;
        ensure(!self.password_hash.is_empty(), TABLE, "ck_users_password_hash_not_empty")?;
        if let Some(wallet) = &self.wallet_address {
            ensure(is_wallet_address(wallet), TABLE, "ck_users_wallet_address_format")?;
        }
        Ok(())
    }

    fn wallet_key(&self) -> Option<String> {
        self.wallet_address.as_deref().map(normalize_address)
    }
}

// =============================================================================
// Write-side helpers (shared with cascades)
// =============================================================================

pub(crate) fn exists(tables: &Tables<'_>, user_id: &str) -> StorageResult<bool> {
    Ok(get_row::<User, _>(&tables.users, user_id)?.is_some())
}

/// Delete a user and everything that references it.
pub(crate) fn remove(tables: &mut Tables<'_>, user_id: &str) -> StorageResult<User> {
    let user: User = get_row(&tables.users, user_id)?
        .ok_or_else(|| StorageError::NotFound(format!("User {user_id}")))?;

    for property_id in children(&tables.properties_by_owner, user_id)? {
        properties::remove(tables, &property_id)?;
    }
    // Re-read after the property cascade, which may already have removed some
    for agreement_id in children(&tables.agreements_by_tenant, user_id)? {
        agreements::remove(tables, &agreement_id)?;
    }
    for transaction_id in children(&tables.transactions_by_user, user_id)? {
        transactions::remove(tables, &transaction_id)?;
    }

    tables.users_email.remove(user.email.as_str())?;
    if let Some(wallet) = user.wallet_key() {
        tables.users_wallet.remove(wallet.as_str())?;
    }
    tables.users.remove(user_id)?;
    Ok(user)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for user accounts.
pub struct UserRepository<'a> {
    db: &'a Database,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a new user, enforcing email and wallet uniqueness.
    pub fn create(&self, user: &User) -> StorageResult<()> {
        let mut user = user.clone();
        user.email = normalize_email(&user.email);
        user.validate()?;
        self.db.write(|t| {
            if exists(t, &user.id)? {
                return Err(ConstraintViolation::unique(TABLE, "id").into());
            }
            claim_unique(
                &mut t.users_email,
                &user.email,
                &user.id,
                ConstraintViolation::unique(TABLE, "email"),
            )?;
            if let Some(wallet) = user.wallet_key() {
                claim_unique(
                    &mut t.users_wallet,
                    &wallet,
                    &user.id,
                    ConstraintViolation::unique(TABLE, "wallet_address"),
                )?;
            }
            put_row(&mut t.users, &user.id, &user)
        })
    }

    /// Get a user by ID.
    pub fn get(&self, user_id: &str) -> StorageResult<User> {
        let read_txn = self.db.read()?;
        let table = read_txn.open_table(USERS)?;
        get_row(&table, user_id)?.ok_or_else(|| StorageError::NotFound(format!("User {user_id}")))
    }

    /// Look up a user by email (normalized before lookup).
    pub fn find_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let read_txn = self.db.read()?;
        let index = read_txn.open_table(USERS_EMAIL)?;
        let user_id = index
            .get(normalize_email(email).as_str())?
            .map(|v| v.value().to_string());
        match user_id {
            Some(id) => {
                let table = read_txn.open_table(USERS)?;
                get_row(&table, &id)
            }
            None => Ok(None),
        }
    }

    /// Look up a user by wallet address (case-insensitive).
    pub fn find_by_wallet(&self, wallet_address: &str) -> StorageResult<Option<User>> {
        let read_txn = self.db.read()?;
        let index = read_txn.open_table(USERS_WALLET)?;
        let user_id = index
            .get(normalize_address(wallet_address).as_str())?
            .map(|v| v.value().to_string());
        match user_id {
            Some(id) => {
                let table = read_txn.open_table(USERS)?;
                get_row(&table, &id)
            }
            None => Ok(None),
        }
    }

    /// List users, optionally restricted to one role, ordered by creation time.
    pub fn list(&self, role: Option<Role>) -> StorageResult<Vec<User>> {
        let read_txn = self.db.read()?;
        let table = read_txn.open_table(USERS)?;
        let mut users: Vec<User> = all_rows(&table)?;
        if let Some(role) = role {
            users.retain(|u| u.role == role);
        }
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }

    /// Replace an existing user, re-checking constraints and moving index entries.
    pub fn update(&self, user: &User) -> StorageResult<()> {
        let mut user = user.clone();
        user.email = normalize_email(&user.email);
        user.validate()?;
        self.db.write(|t| {
            let existing: User = get_row(&t.users, &user.id)?
                .ok_or_else(|| StorageError::NotFound(format!("User {}", user.id)))?;

            swap_unique(
                &mut t.users_email,
                Some(existing.email.as_str()),
                Some(user.email.as_str()),
                &user.id,
                ConstraintViolation::unique(TABLE, "email"),
            )?;
            let old_wallet = existing.wallet_key();
            let new_wallet = user.wallet_key();
            swap_unique(
                &mut t.users_wallet,
                old_wallet.as_deref(),
                new_wallet.as_deref(),
                &user.id,
                ConstraintViolation::unique(TABLE, "wallet_address"),
            )?;

            user.created_at = existing.created_at;
            user.updated_at = Utc::now();
            put_row(&mut t.users, &user.id, &user)
        })
    }

    /// Delete a user, cascading to owned properties, tenancies and transactions.
    pub fn delete(&self, user_id: &str) -> StorageResult<()> {
        self.db.write(|t| remove(t, user_id).map(|user| {
            tracing::info!(user_id = %user.id, "User deleted with dependent rows");
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("users.redb")).unwrap();
        (db, dir)
    }

    fn test_user(email: &str) -> User {
        User::new(email, "Test User", "$argon2id$stub", Role::Tenant, None)
    }

    #[test]
    fn create_and_get_user() {
        let (db, _dir) = temp_db();
        let repo = UserRepository::new(&db);

        let user = test_user("Alice@Example.com");
        repo.create(&user).unwrap();

        let loaded = repo.get(&user.id).unwrap();
        assert_eq!(loaded.email, "alice@example.com");
        assert_eq!(loaded.role, Role::Tenant);
        assert!(loaded.is_active);
        assert!(!loaded.is_verified);
    }

    #[test]
    fn duplicate_email_is_a_unique_violation() {
        let (db, _dir) = temp_db();
        let repo = UserRepository::new(&db);

        repo.create(&test_user("alice@example.com")).unwrap();
        let err = repo.create(&test_user("ALICE@example.com")).unwrap_err();
        assert_eq!(
            err.constraint(),
            Some(&ConstraintViolation::unique("users", "email"))
        );
        assert_eq!(repo.list(None).unwrap().len(), 1);
    }

    #[test]
    fn create_normalizes_hand_built_emails() {
        let (db, _dir) = temp_db();
        let repo = UserRepository::new(&db);

        let mut shouting = test_user("bob@example.com");
        shouting.email = "  BOB@Example.com ".to_string();
        repo.create(&shouting).unwrap();
        assert_eq!(repo.get(&shouting.id).unwrap().email, "bob@example.com");

        let err = repo.create(&test_user("bob@example.com")).unwrap_err();
        assert_eq!(
            err.constraint(),
            Some(&ConstraintViolation::unique("users", "email"))
        );
        assert!(repo.find_by_email("Bob@example.com").unwrap().is_some());
    }

    #[test]
    fn duplicate_wallet_is_rejected_case_insensitively() {
        let (db, _dir) = temp_db();
        let repo = UserRepository::new(&db);

        let mut first = test_user("a@example.com");
        first.wallet_address = Some("0xABCDEFabcdef0123456789abcdef0123456789ab".to_string());
        repo.create(&first).unwrap();

        let mut second = test_user("b@example.com");
        second.wallet_address = Some("0xabcdefabcdef0123456789abcdef0123456789ab".to_string());
        let err = repo.create(&second).unwrap_err();
        assert_eq!(
            err.constraint(),
            Some(&ConstraintViolation::unique("users", "wallet_address"))
        );

        // A rejected insert leaves no index entry behind
        assert!(repo.find_by_email("b@example.com").unwrap().is_none());
    }

    #[test]
    fn malformed_wallet_fails_check() {
        let (db, _dir) = temp_db();
        let repo = UserRepository::new(&db);

        let mut user = test_user("a@example.com");
        user.wallet_address = Some("abcdef".to_string());
        let err = repo.create(&user).unwrap_err();
        assert_eq!(
            err.constraint(),
            Some(&ConstraintViolation::check("users", "ck_users_wallet_address_format"))
        );
    }

    #[test]
    fn malformed_email_fails_check() {
        let (db, _dir) = temp_db();
        let repo = UserRepository::new(&db);
        let err = repo.create(&test_user("not-an-email")).unwrap_err();
        assert!(matches!(err, StorageError::Constraint(ConstraintViolation::Check { .. })));
    }

    #[test]
    fn update_moves_unique_indexes() {
        let (db, _dir) = temp_db();
        let repo = UserRepository::new(&db);

        let mut user = test_user("old@example.com");
        repo.create(&user).unwrap();

        user.email = "new@example.com".to_string();
        user.wallet_address = Some("0x1111111111111111111111111111111111111111".to_string());
        user.role = Role::Landlord;
        repo.update(&user).unwrap();

        assert!(repo.find_by_email("old@example.com").unwrap().is_none());
        let found = repo.find_by_email("new@example.com").unwrap().unwrap();
        assert_eq!(found.role, Role::Landlord);
        let by_wallet = repo
            .find_by_wallet("0x1111111111111111111111111111111111111111")
            .unwrap()
            .unwrap();
        assert_eq!(by_wallet.id, user.id);

        // The old email is free again
        repo.create(&test_user("old@example.com")).unwrap();
    }

    #[test]
    fn update_rejects_email_taken_by_another_user() {
        let (db, _dir) = temp_db();
        let repo = UserRepository::new(&db);

        repo.create(&test_user("taken@example.com")).unwrap();
        let mut user = test_user("mine@example.com");
        repo.create(&user).unwrap();

        user.email = "taken@example.com".to_string();
        assert!(repo.update(&user).is_err());
        assert_eq!(repo.get(&user.id).unwrap().email, "mine@example.com");
    }

    #[test]
    fn delete_missing_user_is_not_found() {
        let (db, _dir) = temp_db();
        let repo = UserRepository::new(&db);
        assert!(matches!(repo.delete("nope"), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn list_filters_by_role() {
        let (db, _dir) = temp_db();
        let repo = UserRepository::new(&db);

        repo.create(&test_user("t@example.com")).unwrap();
        let mut landlord = test_user("l@example.com");
        landlord.role = Role::Landlord;
        repo.create(&landlord).unwrap();

        assert_eq!(repo.list(None).unwrap().len(), 2);
        let landlords = repo.list(Some(Role::Landlord)).unwrap();
        assert_eq!(landlords.len(), 1);
        assert_eq!(landlords[0].email, "l@example.com");
    }
}
