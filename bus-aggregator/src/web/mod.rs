//! Web layer for the bus route aggregator.
//!
//! A thin JSON API over the aggregation engine and the reconciler.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::{AppAggregator, AppState};
