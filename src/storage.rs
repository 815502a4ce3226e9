//! Backing memory for pointer tables.
//!
//! A [`PointerTable`] only borrows its cells. [`ManagedTable`] pairs one with
//! a [`SlotAllocator`] and grows the buffer whenever the table reports it is
//! full, doubling the capacity each time.

use log::{debug, warn};

use crate::encoding::Word;
use crate::error::TableError;
use crate::pointer_table::{Appended, PointerTable, TableConfig};

/// Source of zeroed cell buffers.
pub trait SlotAllocator<W: Word> {
    /// Returns a zeroed buffer of exactly `cap` cells.
    fn allocate(&mut self, cap: usize) -> Result<Vec<W>, TableError>;

    /// Grows `slots` to `new_cap` cells, zeroing the new ones.
    ///
    /// The buffer may move; tables only hold offsets into it.
    fn grow(&mut self, slots: &mut Vec<W>, new_cap: usize) -> Result<(), TableError>;

    /// Takes back a buffer handed out by this allocator.
    fn release(&mut self, slots: Vec<W>) {
        drop(slots);
    }
}

impl<W: Word, A: SlotAllocator<W> + ?Sized> SlotAllocator<W> for &mut A {
    fn allocate(&mut self, cap: usize) -> Result<Vec<W>, TableError> {
        (**self).allocate(cap)
    }

    fn grow(&mut self, slots: &mut Vec<W>, new_cap: usize) -> Result<(), TableError> {
        (**self).grow(slots, new_cap)
    }

    fn release(&mut self, slots: Vec<W>) {
        (**self).release(slots)
    }
}

/// Allocates buffers on the global heap.
#[derive(Copy, Clone, Debug, Default)]
pub struct Heap;

impl<W: Word> SlotAllocator<W> for Heap {
    fn allocate(&mut self, cap: usize) -> Result<Vec<W>, TableError> {
        Ok(vec![W::ZERO; cap])
    }

    fn grow(&mut self, slots: &mut Vec<W>, new_cap: usize) -> Result<(), TableError> {
        if new_cap > slots.len() {
            slots.resize(new_cap, W::ZERO);
        }
        Ok(())
    }
}

/// Refuses to hand out more than `max_slots` cells in a single buffer.
#[derive(Clone, Debug)]
pub struct Bounded<A> {
    inner: A,
    max_slots: usize,
}

impl<A> Bounded<A> {
    /// Wraps `inner`, capping every buffer at `max_slots` cells.
    pub fn new(inner: A, max_slots: usize) -> Self {
        Self { inner, max_slots }
    }

    /// Largest buffer, in cells, this allocator hands out.
    pub fn max_slots(&self) -> usize {
        self.max_slots
    }
}

impl<W: Word, A: SlotAllocator<W>> SlotAllocator<W> for Bounded<A> {
    fn allocate(&mut self, cap: usize) -> Result<Vec<W>, TableError> {
        if cap > self.max_slots {
            return Err(TableError::AllocationFailed { requested: cap });
        }
        self.inner.allocate(cap)
    }

    fn grow(&mut self, slots: &mut Vec<W>, new_cap: usize) -> Result<(), TableError> {
        if new_cap > self.max_slots {
            return Err(TableError::AllocationFailed { requested: new_cap });
        }
        self.inner.grow(slots, new_cap)
    }

    fn release(&mut self, slots: Vec<W>) {
        self.inner.release(slots)
    }
}

/// A [`PointerTable`] that owns its buffer and grows it on demand.
pub struct ManagedTable<W: Word = usize, A: SlotAllocator<W> = Heap> {
    table: PointerTable<W, Vec<W>>,
    allocator: A,
}

impl<W: Word> ManagedTable<W, Heap> {
    /// Creates a heap-backed table with room for `capacity` values.
    pub fn new(capacity: usize) -> Result<Self, TableError> {
        Self::with_allocator(TableConfig::new(capacity), Heap)
    }
}

impl<W: Word, A: SlotAllocator<W>> ManagedTable<W, A> {
    /// Creates a table configured by `config`, taking its buffer from `allocator`.
    pub fn with_allocator(config: TableConfig, mut allocator: A) -> Result<Self, TableError> {
        let mut table = config.build::<W, Vec<W>>()?;
        let slots = allocator.allocate(table.capacity())?;
        table.attach(slots)?;
        Ok(Self { table, allocator })
    }

    /// Read access to the underlying table.
    pub fn table(&self) -> &PointerTable<W, Vec<W>> {
        &self.table
    }

    /// Current total number of slots.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether no slot holds a live value.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Stores `value` and returns its slot, growing the buffer as needed.
    ///
    /// Growth happens right after the write that fills the table. If that
    /// growth fails the value is still stored; the next append retries the
    /// growth and reports its error.
    pub fn append(&mut self, value: W) -> Result<usize, TableError> {
        let Appended { index, full } = match self.table.append(value) {
            Err(TableError::Overflow { .. }) => {
                self.grow()?;
                self.table.append(value)?
            }
            other => other?,
        };
        if full {
            if let Err(err) = self.grow() {
                warn!("could not grow past {} slots: {err}", self.table.capacity());
            }
        }
        Ok(index)
    }

    /// Frees `index`; see [`PointerTable::delete`].
    pub fn delete(&mut self, index: usize) -> Result<(), TableError> {
        self.table.delete(index)
    }

    /// Frees `index` and returns the value it held.
    pub fn take(&mut self, index: usize) -> Result<W, TableError> {
        let last_occupied = self.table.last_occupied();
        let value = self
            .table
            .get(index)
            .ok_or(TableError::IndexOutOfRange { index, last_occupied })?;
        self.table.delete(index)?;
        Ok(value)
    }

    /// Returns the value in a live slot.
    pub fn get(&self, index: usize) -> Option<W> {
        self.table.get(index)
    }

    /// Overwrites the value in a live slot, returning the old one.
    pub fn set(&mut self, index: usize, value: W) -> Result<W, TableError> {
        self.table.set(index, value)
    }

    /// Same as [`append`](Self::append).
    pub fn push(&mut self, value: W) -> Result<usize, TableError> {
        self.append(value)
    }

    /// Removes and returns the value in the highest live slot.
    pub fn pop(&mut self) -> Result<Option<W>, TableError> {
        self.table.pop()
    }

    /// Doubles the capacity, staying within the encodable offset range.
    fn grow(&mut self) -> Result<(), TableError> {
        let old_cap = self.table.capacity();
        let max = W::max_offset(self.table.protection());
        if old_cap >= max {
            return Err(TableError::CapacityTooLarge { requested: old_cap + 1, max });
        }
        let new_cap = old_cap.saturating_mul(2).clamp(1, max);

        let mut slots = self.table.detach().ok_or(TableError::Detached)?;
        if let Err(err) = self.allocator.grow(&mut slots, new_cap) {
            // The old buffer still covers the old capacity.
            self.table.attach(slots)?;
            return Err(err);
        }
        self.table.attach(slots)?;
        self.table.set_capacity(new_cap)?;
        debug!("grew table {old_cap} -> {new_cap} slots");
        Ok(())
    }
}

impl<W: Word, A: SlotAllocator<W>> Drop for ManagedTable<W, A> {
    fn drop(&mut self) {
        if let Some(slots) = self.table.detach() {
            self.allocator.release(slots);
        }
    }
}
