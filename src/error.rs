//! Failure taxonomy shared by every table operation.

/// Errors reported by [`PointerTable`](crate::pointer_table::PointerTable)
/// and [`ManagedTable`](crate::storage::ManagedTable).
///
/// Only [`TableError::Overflow`] is recoverable (grow the backing buffer and
/// retry). The other variants indicate a logic error in the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error("pointer table is full at {capacity} slots; grow the backing buffer and retry")]
    Overflow { capacity: usize },

    #[error("free-list link at slot {index} points to itself (double free)")]
    DoubleFree { index: usize },

    #[error("slot {index} is already free")]
    AlreadyFreed { index: usize },

    #[error("slot {index} does not hold a valid free-list link")]
    CorruptedMetadata { index: usize },

    #[error("index {index} is past the last occupied slot {last_occupied}")]
    IndexOutOfRange { index: usize, last_occupied: usize },

    /// No backing buffer is attached to the table.
    #[error("no backing buffer is attached")]
    Detached,

    #[error("backing buffer holds {len} slots but the table capacity is {capacity}")]
    BufferTooSmall { len: usize, capacity: usize },

    #[error("capacity {requested} would cut off occupied slot {last_occupied}")]
    ShrinkBelowOccupied { requested: usize, last_occupied: usize },

    #[error("capacity {requested} exceeds the largest encodable offset {max}")]
    CapacityTooLarge { requested: usize, max: usize },

    #[error("{bits}-bit cells have no room for a guard tag")]
    GuardUnavailable { bits: u32 },

    #[error("allocator could not provide {requested} slots")]
    AllocationFailed { requested: usize },
}
