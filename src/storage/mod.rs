// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Relational schema for users, property listings, rental agreements and
//! transaction records, persisted in an embedded redb database.
//!
//! ## Integrity
//!
//! - Check constraints run on every insert and update ([`constraints`])
//! - Unique columns: `users.email`, `users.wallet_address`,
//!   `properties.blockchain_id`, `rental_agreements.blockchain_id`
//! - Foreign keys are verified on write and maintained in index tables
//! - Deleting a user cascades to its properties, tenancies and transactions
//! - Deleting a property cascades to its agreements and clears
//!   `transactions.property_id`
//!
//! Any violation aborts the whole write transaction and surfaces as
//! [`StorageError::Constraint`].

pub mod constraints;
pub mod database;
pub mod ownership;
pub mod repository;

pub use constraints::ConstraintViolation;
pub use database::{Database, StorageError, StorageResult};
pub use ownership::{OwnedResource, OwnershipCheck, OwnershipEnforcer};
pub use repository::{
    AgreementFilter, AgreementRepository, AgreementStatus, Property, PropertyFilter,
    PropertyRepository, PropertyStatus, RentalAgreement, Transaction, TransactionFilter,
    TransactionRepository, TxKind, TxStatus, User, UserRepository,
};
