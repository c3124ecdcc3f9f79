//! Aggregation engine.
//!
//! Answers every query by asking both providers concurrently and merging
//! what comes back. A provider that fails or runs past the deadline is
//! reported in the outcome's statuses instead of failing the request; only
//! when every provider that was asked fails does the request fail.

mod engine;
mod error;
mod merge;


pub use engine::{
    Aggregator, AggregatorConfig, Availability, ConnectionReport, ProviderState, ProviderStatus,
    SearchOutcome, StationListing,
};
pub use error::AggregateError;
pub use merge::{merge_routes, merge_stations};
