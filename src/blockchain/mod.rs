// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EVM chain access for syncing stored transaction records.
//!
//! Only reads are performed: receipts and the current block number.

pub mod client;

pub use client::{confirmations_from, ChainClient, ChainConfirmation, ChainError};
