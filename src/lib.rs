//! # ptable
//!
//! A pointer table: a free-list slot allocator over an array of
//! pointer-sized cells owned by the caller. Appends and deletes run in
//! constant time; freed slots are reused last-in, first-out.
//!
//! Free slots hold the *relative* offset to the next free slot, optionally
//! tagged with a guard pattern in the high half of the cell. Relative links
//! let the caller move the buffer between calls, and the guard turns double
//! frees and stray overwrites into errors instead of a corrupted free list.
//!
//! - [`pointer_table`]: the table itself.
//! - [`encoding`]: how links are packed into cells of each width.
//! - [`stack`]: `push`/`pop` on top of the same free list.
//! - [`storage`]: allocators and a self-growing [`ManagedTable`].
//!
//! The table is single-threaded; wrap it in a mutex to share it.

pub mod encoding;
pub mod error;
pub mod pointer_table;
pub mod stack;
pub mod storage;

pub use encoding::{Cell, Link, Protection, Word};
pub use error::TableError;
pub use pointer_table::{byte_size, Appended, PointerTable, TableConfig};
pub use storage::{Bounded, Heap, ManagedTable, SlotAllocator};
