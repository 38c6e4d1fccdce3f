//! In-memory storage for users and posts.
//!
//! [`client::DbClient`] is the only writer of both collections. Nothing is
//! persisted; dropping the client or calling [`client::DbClient::reset`]
//! discards everything.

pub mod client;
pub mod record;
pub mod seed;
