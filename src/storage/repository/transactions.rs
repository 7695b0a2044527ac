// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction repository for payment and chain records.
//!
//! A transaction belongs to a user (cascade on delete) and may reference a
//! property (cleared when the property is deleted).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::constraints::{
    ensure, is_non_negative_amount, is_transaction_hash, is_wallet_address, CheckResult,
    ConstraintViolation,
};
use super::super::database::{
    all_rows, children, get_row, link_key, put_row, Database, StorageError, StorageResult, Tables,
    TRANSACTIONS, TRANSACTIONS_BY_PROPERTY, TRANSACTIONS_BY_USER,
};
use super::{properties, users};

const TABLE: &str = "transactions";

/// Transaction status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    /// Submitted but not yet confirmed
    #[default]
    Pending,
    /// Included in a block
    Confirmed,
    /// Reverted or dropped
    Failed,
}

/// What the transaction pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    #[default]
    Payment,
    Deposit,
    Refund,
    Purchase,
    Rent,
}

/// Stored transaction record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: String,
    /// Owning user (FK, cascade)
    pub user_id: String,
    /// Related property (FK, set null)
    #[serde(default)]
    pub property_id: Option<String>,
    pub kind: TxKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    pub status: TxStatus,
    /// Transaction hash (0x + 64 hex)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmations: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new pending payment record for `user_id`.
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            property_id: None,
            kind: TxKind::Payment,
            amount: None,
            status: TxStatus::Pending,
            hash: None,
            from_address: None,
            to_address: None,
            confirmations: None,
            block_number: None,
            metadata: serde_json::Value::Object(serde_json::Map::new()),
            created_at: now,
            updated_at: now,
        }
    }

    /// Record chain confirmation.
    pub fn mark_confirmed(&mut self, block_number: u64, confirmations: i64) {
        self.status = TxStatus::Confirmed;
        self.block_number = Some(block_number);
        self.confirmations = Some(confirmations);
        self.updated_at = Utc::now();
    }

    /// Mark the transaction as failed.
    pub fn mark_failed(&mut self) {
        self.status = TxStatus::Failed;
        self.updated_at = Utc::now();
    }

    /// Row-level check constraints.
    pub fn validate(&self) -> CheckResult {
        if let Some(hash) = &self.hash {
            ensure(is_transaction_hash(hash), TABLE, "ck_transactions_hash_format")?;
        }
        if let Some(from) = &self.from_address {
            ensure(is_wallet_address(from), TABLE, "ck_transactions_from_address_format")?;
        }
        if let Some(to) = &self.to_address {
            ensure(is_wallet_address(to), TABLE, "ck_transactions_to_address_format")?;
        }
        if let Some(confirmations) = self.confirmations {
            ensure(confirmations >= 0, TABLE, "ck_transactions_confirmations_non_negative")?;
        }
        if let Some(amount) = self.amount {
            ensure(is_non_negative_amount(amount), TABLE, "ck_transactions_amount_non_negative")?;
        }
        Ok(())
    }
}

/// Optional filters for [`TransactionRepository::list`].
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub user_id: Option<String>,
    pub property_id: Option<String>,
}

// =============================================================================
// Write-side helpers (shared with cascades)
// =============================================================================

/// Delete one transaction and its index entries.
pub(crate) fn remove(tables: &mut Tables<'_>, transaction_id: &str) -> StorageResult<Transaction> {
    let tx: Transaction = get_row(&tables.transactions, transaction_id)?
        .ok_or_else(|| StorageError::NotFound(format!("Transaction {transaction_id}")))?;

    tables
        .transactions_by_user
        .remove(link_key(&tx.user_id, transaction_id).as_str())?;
    if let Some(property_id) = &tx.property_id {
        tables
            .transactions_by_property
            .remove(link_key(property_id, transaction_id).as_str())?;
    }
    tables.transactions.remove(transaction_id)?;
    Ok(tx)
}

/// Clear the property reference of a transaction whose property is going away.
pub(crate) fn detach_property(tables: &mut Tables<'_>, transaction_id: &str) -> StorageResult<()> {
    let Some(mut tx) = get_row::<Transaction, _>(&tables.transactions, transaction_id)? else {
        return Ok(());
    };
    if let Some(property_id) = tx.property_id.take() {
        tables
            .transactions_by_property
            .remove(link_key(&property_id, transaction_id).as_str())?;
        tx.updated_at = Utc::now();
        put_row(&mut tables.transactions, transaction_id, &tx)?;
    }
    Ok(())
}

fn check_references(tables: &Tables<'_>, tx: &Transaction) -> StorageResult<()> {
    if !users::exists(tables, &tx.user_id)? {
        return Err(ConstraintViolation::foreign_key(TABLE, "user_id").into());
    }
    if let Some(property_id) = &tx.property_id {
        if !properties::exists(tables, property_id)? {
            return Err(ConstraintViolation::foreign_key(TABLE, "property_id").into());
        }
    }
    Ok(())
}

fn link(tables: &mut Tables<'_>, tx: &Transaction) -> StorageResult<()> {
    tables
        .transactions_by_user
        .insert(link_key(&tx.user_id, &tx.id).as_str(), tx.id.as_str())?;
    if let Some(property_id) = &tx.property_id {
        tables
            .transactions_by_property
            .insert(link_key(property_id, &tx.id).as_str(), tx.id.as_str())?;
    }
    Ok(())
}

fn unlink(tables: &mut Tables<'_>, tx: &Transaction) -> StorageResult<()> {
    tables
        .transactions_by_user
        .remove(link_key(&tx.user_id, &tx.id).as_str())?;
    if let Some(property_id) = &tx.property_id {
        tables
            .transactions_by_property
            .remove(link_key(property_id, &tx.id).as_str())?;
    }
    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for transaction records.
pub struct TransactionRepository<'a> {
    db: &'a Database,
}

impl<'a> TransactionRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn create(&self, tx: &Transaction) -> StorageResult<()> {
        tx.validate()?;
        self.db.write(|t| {
            if get_row::<Transaction, _>(&t.transactions, &tx.id)?.is_some() {
                return Err(ConstraintViolation::unique(TABLE, "id").into());
            }
            check_references(t, tx)?;
            link(t, tx)?;
            put_row(&mut t.transactions, &tx.id, tx)
        })
    }

    pub fn get(&self, transaction_id: &str) -> StorageResult<Transaction> {
        let read_txn = self.db.read()?;
        let table = read_txn.open_table(TRANSACTIONS)?;
        get_row(&table, transaction_id)?
            .ok_or_else(|| StorageError::NotFound(format!("Transaction {transaction_id}")))
    }

    /// List transactions for a user and/or property, newest first.
    ///
    /// At least one filter is required; unfiltered scans go through
    /// [`TransactionRepository::list_all`].
    pub fn list(&self, filter: &TransactionFilter) -> StorageResult<Vec<Transaction>> {
        let read_txn = self.db.read()?;
        let table = read_txn.open_table(TRANSACTIONS)?;

        let ids = match (&filter.user_id, &filter.property_id) {
            (Some(user_id), _) => {
                let index = read_txn.open_table(TRANSACTIONS_BY_USER)?;
                children(&index, user_id)?
            }
            (None, Some(property_id)) => {
                let index = read_txn.open_table(TRANSACTIONS_BY_PROPERTY)?;
                children(&index, property_id)?
            }
            (None, None) => return self.list_all(),
        };

        let mut transactions = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(tx) = get_row::<Transaction, _>(&table, &id)? {
                transactions.push(tx);
            }
        }
        if let Some(property_id) = &filter.property_id {
            transactions.retain(|tx| tx.property_id.as_ref() == Some(property_id));
        }
        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(transactions)
    }

    /// Every transaction, newest first.
    pub fn list_all(&self) -> StorageResult<Vec<Transaction>> {
        let read_txn = self.db.read()?;
        let table = read_txn.open_table(TRANSACTIONS)?;
        let mut transactions: Vec<Transaction> = all_rows(&table)?;
        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(transactions)
    }

    /// Replace an existing transaction.
    pub fn update(&self, tx: &Transaction) -> StorageResult<()> {
        tx.validate()?;
        self.db.write(|t| {
            let existing: Transaction = get_row(&t.transactions, &tx.id)?
                .ok_or_else(|| StorageError::NotFound(format!("Transaction {}", tx.id)))?;

            if existing.user_id != tx.user_id || existing.property_id != tx.property_id {
                check_references(t, tx)?;
                unlink(t, &existing)?;
                link(t, tx)?;
            }

            let mut updated = tx.clone();
            updated.created_at = existing.created_at;
            updated.updated_at = Utc::now();
            put_row(&mut t.transactions, &updated.id, &updated)
        })
    }

    pub fn delete(&self, transaction_id: &str) -> StorageResult<()> {
        self.db.write(|t| remove(t, transaction_id).map(|_| ()))
    }

    /// Apply a chain lookup to the current row, leaving other fields as stored.
    pub fn record_chain_result(
        &self,
        transaction_id: &str,
        block_number: u64,
        confirmations: i64,
        success: bool,
    ) -> StorageResult<Transaction> {
        self.db.write(|t| {
            let mut tx: Transaction = get_row(&t.transactions, transaction_id)?
                .ok_or_else(|| StorageError::NotFound(format!("Transaction {transaction_id}")))?;

            if success {
                tx.mark_confirmed(block_number, confirmations);
            } else {
                tx.block_number = Some(block_number);
                tx.mark_failed();
            }
            tx.validate()?;
            put_row(&mut t.transactions, transaction_id, &tx)?;
            Ok(tx)
        })
    }
}
