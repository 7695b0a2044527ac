// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the relational store.
//!
//! Each repository provides CRUD operations for one entity. Referential
//! actions run through the crate-private `remove` functions, which share the
//! open [`Tables`](super::database::Tables) of a single write transaction.

pub mod agreements;
pub mod properties;
pub mod transactions;
pub mod users;

pub use agreements::{AgreementFilter, AgreementRepository, AgreementStatus, RentalAgreement};
pub use properties::{Property, PropertyFilter, PropertyRepository, PropertyStatus};
pub use transactions::{Transaction, TransactionFilter, TransactionRepository, TxKind, TxStatus};
pub use users::{User, UserRepository};
