//! Reconciler error type.

use crate::domain::{GroupId, MappingId, StationId};
use crate::store::StoreError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReconcileError {
    /// The caller named a station, mapping, or group that does not exist or
    /// cannot be used that way.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("duplicate mapping: already covered by {existing}")]
    DuplicateMapping { existing: MappingId },

    #[error("station {station} already belongs to group {group}")]
    StationAlreadyGrouped { station: StationId, group: GroupId },

    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for ReconcileError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateMapping { existing } => {
                ReconcileError::DuplicateMapping { existing }
            }
            StoreError::StationAlreadyGrouped { station, group } => {
                ReconcileError::StationAlreadyGrouped { station, group }
            }
            StoreError::MappingNotFound(id) => {
                ReconcileError::InvalidReference(format!("mapping {id}"))
            }
            StoreError::GroupNotFound(id) => ReconcileError::InvalidReference(format!("group {id}")),
            other => ReconcileError::Store(other),
        }
    }
}
