//! Data carried across the gateway boundary.
//!
//! Nothing here is persisted: the object store is the only source of truth,
//! and these values live for the duration of one request.

pub mod object;
