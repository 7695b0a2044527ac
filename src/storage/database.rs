// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded relational store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! Row tables (`id` → JSON bytes):
//! - `users`, `properties`, `rental_agreements`, `transactions`
//!
//! Unique indexes (normalized value → owning row id):
//! - `users_email`, `users_wallet`, `properties_blockchain_id`,
//!   `rental_agreements_blockchain_id`
//!
//! Foreign-key indexes (`parent_id|child_id` → child id):
//! - `properties_by_owner`, `agreements_by_property`, `agreements_by_tenant`,
//!   `transactions_by_user`, `transactions_by_property`
//!
//! Every mutation runs inside a single write transaction through
//! [`Database::write`]; returning an error from the closure drops the
//! transaction, which aborts it.

use std::path::Path;

use redb::{
    Database as RedbDatabase, ReadTransaction, ReadableDatabase, ReadableTable, Table,
    TableDefinition, WriteTransaction,
};
use serde::{de::DeserializeOwned, Serialize};

use super::constraints::ConstraintViolation;

// =============================================================================
// Table Definitions
// =============================================================================

pub(crate) type RowTable<'txn> = Table<'txn, &'static str, &'static [u8]>;
pub(crate) type IndexTable<'txn> = Table<'txn, &'static str, &'static str>;

pub(crate) const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");
pub(crate) const PROPERTIES: TableDefinition<&str, &[u8]> = TableDefinition::new("properties");
pub(crate) const AGREEMENTS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("rental_agreements");
pub(crate) const TRANSACTIONS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("transactions");

pub(crate) const USERS_EMAIL: TableDefinition<&str, &str> = TableDefinition::new("users_email");
pub(crate) const USERS_WALLET: TableDefinition<&str, &str> = TableDefinition::new("users_wallet");
pub(crate) const PROPERTIES_BLOCKCHAIN_ID: TableDefinition<&str, &str> =
    TableDefinition::new("properties_blockchain_id");
pub(crate) const AGREEMENTS_BLOCKCHAIN_ID: TableDefinition<&str, &str> =
    TableDefinition::new("rental_agreements_blockchain_id");

pub(crate) const PROPERTIES_BY_OWNER: TableDefinition<&str, &str> =
    TableDefinition::new("properties_by_owner");
pub(crate) const AGREEMENTS_BY_PROPERTY: TableDefinition<&str, &str> =
    TableDefinition::new("agreements_by_property");
pub(crate) const AGREEMENTS_BY_TENANT: TableDefinition<&str, &str> =
    TableDefinition::new("agreements_by_tenant");
pub(crate) const TRANSACTIONS_BY_USER: TableDefinition<&str, &str> =
    TableDefinition::new("transactions_by_user");
pub(crate) const TRANSACTIONS_BY_PROPERTY: TableDefinition<&str, &str> =
    TableDefinition::new("transactions_by_property");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: user {user_id} cannot access {resource}")]
    PermissionDenied { user_id: String, resource: String },

    #[error("constraint violation: {0}")]
    Constraint(#[from] ConstraintViolation),
}

impl StorageError {
    /// The violated constraint, if this error is one.
    pub fn constraint(&self) -> Option<&ConstraintViolation> {
        match self {
            StorageError::Constraint(violation) => Some(violation),
            _ => None,
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Composite key for a foreign-key index: `parent_id|child_id`.
pub(crate) fn link_key(parent_id: &str, child_id: &str) -> String {
    format!("{parent_id}|{child_id}")
}

/// Start of the range holding every child of `parent_id`.
fn make_prefix(parent_id: &str) -> String {
    format!("{parent_id}|")
}

/// End of the range holding every child of `parent_id` (`}` sorts after `|`).
fn make_prefix_end(parent_id: &str) -> String {
    format!("{parent_id}}}")
}

/// Collect the child ids linked to `parent_id` in a foreign-key index.
pub(crate) fn children<T>(index: &T, parent_id: &str) -> StorageResult<Vec<String>>
where
    T: ReadableTable<&'static str, &'static str>,
{
    let start = make_prefix(parent_id);
    let end = make_prefix_end(parent_id);
    let mut ids = Vec::new();
    for entry in index.range(start.as_str()..end.as_str())? {
        let entry = entry?;
        ids.push(entry.1.value().to_string());
    }
    Ok(ids)
}

/// Read and deserialize a JSON row.
pub(crate) fn get_row<R, T>(table: &T, id: &str) -> StorageResult<Option<R>>
where
    R: DeserializeOwned,
    T: ReadableTable<&'static str, &'static [u8]>,
{
    match table.get(id)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

/// Serialize and store a JSON row.
pub(crate) fn put_row<R: Serialize>(table: &mut RowTable<'_>, id: &str, row: &R) -> StorageResult<()> {
    let json = serde_json::to_vec(row)?;
    table.insert(id, json.as_slice())?;
    Ok(())
}

/// Deserialize every row of a table.
pub(crate) fn all_rows<R, T>(table: &T) -> StorageResult<Vec<R>>
where
    R: DeserializeOwned,
    T: ReadableTable<&'static str, &'static [u8]>,
{
    let mut rows = Vec::new();
    for entry in table.iter()? {
        let entry = entry?;
        rows.push(serde_json::from_slice(entry.1.value())?);
    }
    Ok(rows)
}

/// Point a unique index entry at `row_id`, failing if another row holds it.
pub(crate) fn claim_unique(
    index: &mut IndexTable<'_>,
    value: &str,
    row_id: &str,
    violation: ConstraintViolation,
) -> StorageResult<()> {
    let holder = index.get(value)?.map(|v| v.value().to_string());
    match holder {
        Some(existing) if existing != row_id => Err(violation.into()),
        _ => {
            index.insert(value, row_id)?;
            Ok(())
        }
    }
}

/// Move a unique index entry from `old` to `new` for the same row.
pub(crate) fn swap_unique(
    index: &mut IndexTable<'_>,
    old: Option<&str>,
    new: Option<&str>,
    row_id: &str,
    violation: ConstraintViolation,
) -> StorageResult<()> {
    if old == new {
        return Ok(());
    }
    if let Some(value) = new {
        claim_unique(index, value, row_id, violation)?;
    }
    if let Some(value) = old {
        index.remove(value)?;
    }
    Ok(())
}

// =============================================================================
// Tables (write side)
// =============================================================================

/// Every table opened inside one write transaction.
///
/// redb refuses to open the same table twice in a transaction, so cascading
/// deletes thread this struct through instead of reopening tables.
pub(crate) struct Tables<'txn> {
    pub users: RowTable<'txn>,
    pub properties: RowTable<'txn>,
    pub agreements: RowTable<'txn>,
    pub transactions: RowTable<'txn>,
    pub users_email: IndexTable<'txn>,
    pub users_wallet: IndexTable<'txn>,
    pub properties_blockchain_id: IndexTable<'txn>,
    pub agreements_blockchain_id: IndexTable<'txn>,
    pub properties_by_owner: IndexTable<'txn>,
    pub agreements_by_property: IndexTable<'txn>,
    pub agreements_by_tenant: IndexTable<'txn>,
    pub transactions_by_user: IndexTable<'txn>,
    pub transactions_by_property: IndexTable<'txn>,
}

impl<'txn> Tables<'txn> {
    fn open(txn: &'txn WriteTransaction) -> StorageResult<Self> {
        Ok(Self {
            users: txn.open_table(USERS)?,
            properties: txn.open_table(PROPERTIES)?,
            agreements: txn.open_table(AGREEMENTS)?,
            transactions: txn.open_table(TRANSACTIONS)?,
            users_email: txn.open_table(USERS_EMAIL)?,
            users_wallet: txn.open_table(USERS_WALLET)?,
            properties_blockchain_id: txn.open_table(PROPERTIES_BLOCKCHAIN_ID)?,
            agreements_blockchain_id: txn.open_table(AGREEMENTS_BLOCKCHAIN_ID)?,
            properties_by_owner: txn.open_table(PROPERTIES_BY_OWNER)?,
            agreements_by_property: txn.open_table(AGREEMENTS_BY_PROPERTY)?,
            agreements_by_tenant: txn.open_table(AGREEMENTS_BY_TENANT)?,
            transactions_by_user: txn.open_table(TRANSACTIONS_BY_USER)?,
            transactions_by_property: txn.open_table(TRANSACTIONS_BY_PROPERTY)?,
        })
    }
}

// =============================================================================
// Database
// =============================================================================

/// Embedded ACID database holding the rental registry schema.
pub struct Database {
    db: RedbDatabase,
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = RedbDatabase::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        drop(Tables::open(&write_txn)?);
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Run `f` inside a write transaction, committing only if it succeeds.
    pub(crate) fn write<R>(
        &self,
        f: impl FnOnce(&mut Tables<'_>) -> StorageResult<R>,
    ) -> StorageResult<R> {
        let write_txn = self.db.begin_write()?;
        let result = {
            let mut tables = Tables::open(&write_txn)?;
            f(&mut tables)?
        };
        write_txn.commit()?;
        Ok(result)
    }

    /// Begin a read-only snapshot.
    pub(crate) fn read(&self) -> StorageResult<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    /// Verify the database answers a read transaction.
    pub fn health_check(&self) -> StorageResult<()> {
        let read_txn = self.read()?;
        let table = read_txn.open_table(USERS)?;
        table.get("__health__")?;
        Ok(())
    }
}
