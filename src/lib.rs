//! TTL-bucketed delayed-element store.
//!
//! Stash a payload under an identifier for a bounded number of seconds,
//! then either reclaim it early by identifier ([`Store::pull`]) or collect
//! everything whose time is up in one sweep ([`Store::poll`]). Elements
//! sharing a delay live in one bucket, in expiry order, so the sweep costs
//! O(buckets + newly due elements) regardless of how many elements are
//! still waiting.
//!
//! Expiry is evaluated lazily: there is no timer thread, and every
//! time-dependent operation takes `now` explicitly. Hosts typically drive
//! polling off [`Store::time_to_next`].
//!
//! [`encode`]/[`decode`] give a durable snapshot of a store for restart
//! recovery; [`Registry`] holds many named stores with create-on-miss
//! lifecycle.

mod arena;
mod codec;
mod list;
mod registry;
mod store;

pub use codec::{decode, encode, CodecError, SNAPSHOT_VERSION};
pub use registry::Registry;
pub use store::{unix_now, Store, StoreError};
