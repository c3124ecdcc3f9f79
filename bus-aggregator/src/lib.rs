//! Bus route aggregator server.
//!
//! Searches intercity bus routes across the GDS gateway and the Paybilet
//! API at once, reconciling each provider's station catalogue into one set
//! of places a traveller can name.

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod domain;
pub mod gds;
pub mod paybilet;
pub mod provider;
pub mod reconcile;
pub mod store;
pub mod sync;
pub mod web;
