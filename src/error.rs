use thiserror::Error;

/// The error returned by a strict lookup of a key that is not present.
///
/// Removing an absent key is not an error; see [`AvlMap::remove`](crate::AvlMap::remove).
#[derive(Copy, Clone, Debug, Error, PartialEq, Eq, Hash)]
#[error("key not found")]
pub struct KeyNotFound;
