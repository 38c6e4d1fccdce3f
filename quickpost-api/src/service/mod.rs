//! Operations behind the HTTP handlers, independent of axum.
//!
//! Everything here is synchronous. Callers run the password-hashing paths
//! (`accounts::register`, `accounts::login`) on a blocking thread.

pub mod access;
pub mod accounts;
pub mod posts;
