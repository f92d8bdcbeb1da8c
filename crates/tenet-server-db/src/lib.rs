// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite Grant Store for Tenet.
//!
//! Persists permissions, roles, role → permission links and per-workspace
//! role assignments, and implements the store traits from
//! [`tenet_server_authz`] over them.

pub mod error;
pub mod grant;
pub mod pool;
pub mod readiness;
pub mod testing;

pub use error::{DbError, Result};
pub use grant::GrantRepository;
pub use pool::{connect_existing, create_pool, run_migrations, AUTHZ_TABLES};
pub use readiness::check_readiness;
