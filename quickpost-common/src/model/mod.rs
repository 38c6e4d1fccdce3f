pub mod auth;
pub mod page;
pub mod password;
pub mod post;
pub mod user;

use derive_where::derive_where;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Debug, Display},
    marker::PhantomData,
    num::ParseIntError,
    str::FromStr,
};
use thiserror::Error;

/// Sequential numeric id, tagged with the kind of record it refers to.
///
/// Ids start at 1. The marker keeps a post id from being passed where a user
/// id is expected.
#[derive_where(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<Marker>(u64, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id, PhantomData)
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> From<u64> for Id<Marker> {
    fn from(value: u64) -> Self {
        Id::new(value)
    }
}

impl<Marker> From<Id<Marker>> for u64 {
    fn from(value: Id<Marker>) -> Self {
        value.get()
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Invalid id: {0}")]
pub struct InvalidIdError(#[from] ParseIntError);

impl<Marker> FromStr for Id<Marker> {
    type Err = InvalidIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(u64::from_str(s)?))
    }
}
