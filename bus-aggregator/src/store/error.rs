//! Persistence error type.

use crate::domain::{GroupId, MappingId, StationId};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// An active mapping already covers the pair (or, for manual mappings,
    /// one of its stations).
    #[error("duplicate mapping: already covered by {existing}")]
    DuplicateMapping { existing: MappingId },

    #[error("station {station} already belongs to group {group}")]
    StationAlreadyGrouped { station: StationId, group: GroupId },

    #[error("mapping {0} not found")]
    MappingNotFound(MappingId),

    #[error("group {0} not found")]
    GroupNotFound(GroupId),

    /// Reading or writing the backing file failed.
    #[error("storage I/O error: {message}")]
    Io { message: String },

    /// The backing file exists but cannot be decoded.
    #[error("corrupt store snapshot: {message}")]
    Corrupt { message: String },
}
