//! Reconciles object graphs against the ADC over REST.
//!
//! A worker pops changed model names off the shared queue, snapshots the
//! graph under its lock, serializes nodes in dependency order, and issues
//! create/update/delete calls through the [`AdcSession`] trait. A local cache
//! mirrors ADC state (uuid, checksum, back-references) so the reconciler can
//! pick PUT over POST and compute deletions without re-reading the ADC.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod cache;
mod client;
mod error;
mod queue;
mod reconciler;
mod serialize;
mod session;
#[cfg(test)]
mod tests;

pub use self::{
    cache::{AdcCache, CacheTable, ObjCacheEntry, VsCacheEntry},
    client::AdcRestClient,
    error::AdcError,
    queue::{Controller, ModelQueue},
    reconciler::RestReconciler,
    session::AdcSession,
};
