//! Cross-provider station reconciliation.
//!
//! The two providers name the same physical bus station differently
//! ("Южно-Сахалинск" vs "южно сахалинск"). This module links such stations
//! through [`StationMapping`](crate::domain::StationMapping)s, found
//! automatically by normalized-name matching or created by hand, optionally
//! collects them into groups, and resolves a user-supplied name or id into
//! the set of equivalent stations across both providers.

mod error;
mod matcher;
mod normalize;
mod reconciler;


pub use error::ReconcileError;
pub use matcher::{MatchConfidence, propose_mappings};
pub use normalize::normalize_name;
pub use reconciler::{ReconcileReport, Reconciler, ReconcilerConfig};
