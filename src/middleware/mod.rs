// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP middleware applied to the whole router.

pub mod rate_limit;
pub mod request_logger;
pub mod security_headers;

pub use rate_limit::{client_key, rate_limit, RateLimiter};
pub use request_logger::request_logger;
pub use security_headers::security_headers;
