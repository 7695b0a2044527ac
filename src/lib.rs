// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Rental Registry - Property, Lease and Payment Record Service
//!
//! REST backend for rental listings, rental agreements and chain-anchored
//! payment records, with identity-token plus wallet-signature login.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Google ID token, EIP-191 wallet signature and session tokens
//! - `blockchain` - EVM receipt lookups for confirmation sync
//! - `middleware` - Security headers, request logging, rate limiting
//! - `storage` - Relational schema and constraints on redb

pub mod api;
pub mod auth;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod state;
pub mod storage;
