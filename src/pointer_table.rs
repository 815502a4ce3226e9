//! # PointerTable
//!
//! A slot allocator over an array of pointer-sized cells that the caller
//! owns. Free slots are chained into a LIFO free list whose links are stored
//! inside the free cells themselves, as *relative* offsets. Because no link
//! holds an address, the caller may move the backing buffer (`realloc`,
//! `mremap`, copying into a new `Vec`) and the free list stays valid.
//!
//! The table never allocates. When [`PointerTable::append`] reports that the
//! table is full, the caller grows the buffer, updates the capacity with
//! [`PointerTable::set_capacity`] and carries on. [`ManagedTable`] does this
//! automatically through a [`SlotAllocator`].
//!
//! ## Example
//!
//! ```rust
//! use ptable::pointer_table::PointerTable;
//!
//! let mut table: PointerTable<u64> = PointerTable::new(4);
//! table.attach(vec![0; 4]).unwrap();
//!
//! let a = table.append(0xA).unwrap().index;
//! let b = table.append(0xB).unwrap().index;
//! assert_eq!(table.get(a), Some(0xA));
//!
//! // Freed slots are reused last-in, first-out.
//! table.delete(a).unwrap();
//! table.delete(b).unwrap();
//! assert_eq!(table.append(0xC).unwrap().index, b);
//! assert_eq!(table.append(0xD).unwrap().index, a);
//! ```
//!
//! [`ManagedTable`]: crate::storage::ManagedTable
//! [`SlotAllocator`]: crate::storage::SlotAllocator

use std::fmt;
use std::marker::PhantomData;
use std::mem;

use log::{debug, trace, warn};

use crate::encoding::{Cell, Link, Protection, Word};
use crate::error::TableError;

/// Number of bytes a buffer of `cap` cells of type `W` occupies.
#[inline]
pub fn byte_size<W: Word>(cap: usize) -> usize {
    cap * mem::size_of::<W>()
}

/// Outcome of a successful [`PointerTable::append`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Appended {
    /// Slot the value was written to.
    pub index: usize,
    /// The write consumed the last free slot: the next append fails with
    /// [`TableError::Overflow`] unless the buffer grows first.
    pub full: bool,
}

impl fmt::Display for Appended {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.full {
            write!(f, "slot {} (table full)", self.index)
        } else {
            write!(f, "slot {}", self.index)
        }
    }
}

/// Builder for a [`PointerTable`] with non-default settings.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TableConfig {
    capacity: usize,
    protection: Option<Protection>,
}

impl TableConfig {
    /// Settings for a table of `capacity` slots with default protection.
    pub fn new(capacity: usize) -> Self {
        Self { capacity, protection: None }
    }

    /// Overrides the word's default protection.
    pub fn protection(mut self, protection: Protection) -> Self {
        self.protection = Some(protection);
        self
    }

    /// Validates the settings for cells of type `W` and creates an
    /// unattached table.
    pub fn build<W: Word, S>(self) -> Result<PointerTable<W, S>, TableError> {
        let protection = self.protection.unwrap_or_else(W::default_protection);
        if protection == Protection::Guarded && !W::GUARDABLE {
            return Err(TableError::GuardUnavailable { bits: W::BITS });
        }
        let max = W::max_offset(protection);
        if self.capacity > max {
            return Err(TableError::CapacityTooLarge { requested: self.capacity, max });
        }
        Ok(PointerTable {
            slots: None,
            cap: self.capacity,
            first_free: 0,
            last_occupied: 0,
            len: 0,
            protection,
            _word: PhantomData,
        })
    }
}

/// Free-list slot allocator over a caller-owned buffer `S` of `W` cells.
///
/// `S` is anything that derefs to a slice of cells: a `Vec<W>` handed over
/// by the caller, a `Box<[W]>`, or a borrowed `&mut [W]`.
pub struct PointerTable<W: Word = usize, S = Vec<W>> {
    slots: Option<S>,
    cap: usize,
    first_free: usize,
    last_occupied: usize,
    len: usize,
    protection: Protection,
    _word: PhantomData<W>,
}

fn view<W, S: AsRef<[W]>>(slots: &Option<S>, cap: usize) -> Result<&[W], TableError> {
    let slots = AsRef::<[W]>::as_ref(slots.as_ref().ok_or(TableError::Detached)?);
    let len = slots.len();
    slots
        .get(..cap)
        .ok_or(TableError::BufferTooSmall { len, capacity: cap })
}

fn view_mut<W, S: AsMut<[W]>>(slots: &mut Option<S>, cap: usize) -> Result<&mut [W], TableError> {
    let slots = AsMut::<[W]>::as_mut(slots.as_mut().ok_or(TableError::Detached)?);
    let len = slots.len();
    slots
        .get_mut(..cap)
        .ok_or(TableError::BufferTooSmall { len, capacity: cap })
}

impl<W: Word, S> PointerTable<W, S> {
    /// Creates an unattached table of `capacity` slots with the word's
    /// default protection.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` exceeds [`Word::max_offset`]; use
    /// [`TableConfig::build`] to get an error instead.
    pub fn new(capacity: usize) -> Self {
        match TableConfig::new(capacity).build() {
            Ok(table) => table,
            Err(err) => panic!("invalid table capacity: {err}"),
        }
    }

    /// Current total number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Bytes the backing buffer must provide for the current capacity.
    #[inline]
    pub fn byte_size(&self) -> usize {
        byte_size::<W>(self.cap)
    }

    /// Slot the next append writes to.
    #[inline]
    pub fn first_free(&self) -> usize {
        self.first_free
    }

    /// Upper bound of the slots that may hold live values.
    #[inline]
    pub fn last_occupied(&self) -> usize {
        self.last_occupied
    }

    /// Number of live values.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no slot holds a live value.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live values divided by capacity.
    #[inline]
    pub fn load_factor(&self) -> f64 {
        if self.cap == 0 {
            return 0.0;
        }
        self.len as f64 / self.cap as f64
    }

    /// Whether free-list links carry a guard tag.
    #[inline]
    pub fn protection(&self) -> Protection {
        self.protection
    }

    /// Whether a backing buffer is attached.
    #[inline]
    pub fn is_attached(&self) -> bool {
        self.slots.is_some()
    }

    /// Hands the backing buffer back to the caller.
    ///
    /// Bookkeeping is kept, so the same buffer (or a moved copy of it) can be
    /// attached again.
    pub fn detach(&mut self) -> Option<S> {
        if self.slots.is_some() {
            debug!("detaching buffer of {} slots", self.cap);
        }
        self.slots.take()
    }

    // Appends write here without consulting the free list. `(0, 0)` is the
    // empty table: slot 0 has never been written, or was the last value freed.
    #[inline]
    fn at_tail(&self) -> bool {
        self.first_free > self.last_occupied || (self.first_free == 0 && self.last_occupied == 0)
    }
}

impl<W, S> PointerTable<W, S>
where
    W: Word,
    S: AsRef<[W]> + AsMut<[W]>,
{
    /// Attaches the backing buffer, returning the previously attached one.
    ///
    /// The buffer must hold at least [`capacity`](Self::capacity) cells.
    /// Cells that were never written should be zeroed: a stray guard tag
    /// there makes `delete` report the slot as already free. A rejected
    /// buffer is dropped.
    pub fn attach(&mut self, slots: S) -> Result<Option<S>, TableError> {
        let len = slots.as_ref().len();
        if len < self.cap {
            return Err(TableError::BufferTooSmall { len, capacity: self.cap });
        }
        debug!("attaching buffer of {len} slots (capacity {})", self.cap);
        Ok(self.slots.replace(slots))
    }

    /// Updates the capacity after the caller resized the backing buffer.
    ///
    /// Shrinking is allowed down to `last_occupied + 1` while values are
    /// live. Shrinking an empty table discards its free list.
    pub fn set_capacity(&mut self, cap: usize) -> Result<(), TableError> {
        let max = W::max_offset(self.protection);
        if cap > max {
            return Err(TableError::CapacityTooLarge { requested: cap, max });
        }
        if let Some(slots) = &self.slots {
            let len = slots.as_ref().len();
            if len < cap {
                return Err(TableError::BufferTooSmall { len, capacity: cap });
            }
        }
        if cap <= self.last_occupied || cap < self.first_free {
            if !self.is_empty() {
                return Err(TableError::ShrinkBelowOccupied {
                    requested: cap,
                    last_occupied: self.last_occupied,
                });
            }
            self.first_free = 0;
            self.last_occupied = 0;
        }
        debug!("capacity {} -> {cap}", self.cap);
        self.cap = cap;
        Ok(())
    }

    /// Stores `value` in the next free slot.
    ///
    /// Reports [`Appended::full`] when this write took the last slot, and
    /// fails with [`TableError::Overflow`] without writing when there was no
    /// slot left.
    pub fn append(&mut self, value: W) -> Result<Appended, TableError> {
        let cap = self.cap;
        let protection = self.protection;
        let at_tail = self.at_tail();
        let slots = view_mut(&mut self.slots, cap)?;
        let index = self.first_free;

        if at_tail {
            if index >= cap {
                trace!("append: overflow at capacity {cap}");
                return Err(TableError::Overflow { capacity: cap });
            }
            slots[index] = value;
            self.last_occupied = index;
            self.first_free = index + 1;
            // Stamp the new tail with a zero-offset sentinel. A freed top
            // slot sitting there keeps its real link.
            if protection == Protection::Guarded && self.first_free < cap {
                let tail = &mut slots[self.first_free];
                if !Cell::decode(*tail, protection).is_free() {
                    *tail = W::pack_link(0, protection);
                }
            }
        } else {
            let link = slots[index].unpack_link(protection);
            if !link.intact {
                warn!("append: slot {index} holds {:#x}, not a free-list link", slots[index]);
                return Err(TableError::CorruptedMetadata { index });
            }
            if link.offset == 0 {
                warn!("append: slot {index} links to itself");
                return Err(TableError::DoubleFree { index });
            }
            let next = match link.target(index) {
                Some(next) if next <= self.last_occupied + 1 => next,
                _ => {
                    warn!("append: slot {index} links outside the table (offset {})", link.offset);
                    return Err(TableError::CorruptedMetadata { index });
                }
            };
            slots[index] = value;
            if index >= self.last_occupied {
                self.last_occupied = index;
            }
            self.first_free = next;
        }

        self.len += 1;
        let full = self.first_free >= cap;
        trace!(
            "append: slot {index}, first_free={} last_occupied={}{}",
            self.first_free,
            self.last_occupied,
            if full { " (full)" } else { "" }
        );
        Ok(Appended { index, full })
    }

    /// Frees slot `index`, pushing it onto the free list.
    ///
    /// The stored value is overwritten by a free-list link; read it first if
    /// it is still needed. The table does not release whatever it pointed to.
    pub fn delete(&mut self, index: usize) -> Result<(), TableError> {
        let cap = self.cap;
        let protection = self.protection;
        let last_occupied = self.last_occupied;
        let out_of_range = TableError::IndexOutOfRange { index, last_occupied };
        let slots = view_mut(&mut self.slots, cap)?;

        if index >= cap {
            return Err(out_of_range);
        }
        let past_bound = self.len == 0 || index > last_occupied;
        if let Cell::Free(link) = Cell::decode(slots[index], protection) {
            // Past the bound a zero offset is the tail sentinel, never a deleted slot.
            if !(past_bound && link.offset == 0) {
                warn!("delete: slot {index} is already free");
                return Err(TableError::AlreadyFreed { index });
            }
        }
        if past_bound {
            return Err(out_of_range);
        }

        // first_free and index are both bounded by cap, which fits the offset range.
        let offset = self.first_free as isize - index as isize;
        slots[index] = W::pack_link(offset, protection);

        // With an empty free list the top slot just becomes the new tail.
        if index == last_occupied && self.first_free > last_occupied && last_occupied > 0 {
            self.last_occupied -= 1;
        }
        self.first_free = index;
        self.len = self.len.saturating_sub(1);
        trace!(
            "delete: slot {index} (offset {offset}), first_free={} last_occupied={}",
            self.first_free,
            self.last_occupied
        );
        Ok(())
    }

    /// Returns the value in a live slot.
    ///
    /// Under [`Protection::Unguarded`] free slots cannot be recognised and
    /// their raw link is returned.
    pub fn get(&self, index: usize) -> Option<W> {
        if self.is_empty() || index > self.last_occupied {
            return None;
        }
        let slots = view(&self.slots, self.cap).ok()?;
        match Cell::decode(*slots.get(index)?, self.protection) {
            Cell::Occupied(value) => Some(value),
            Cell::Free(_) => None,
        }
    }

    /// Overwrites the value in a live slot, returning the old one.
    pub fn set(&mut self, index: usize, value: W) -> Result<W, TableError> {
        let last_occupied = self.last_occupied;
        if self.is_empty() || index > last_occupied {
            return Err(TableError::IndexOutOfRange { index, last_occupied });
        }
        let protection = self.protection;
        let slots = view_mut(&mut self.slots, self.cap)?;
        match Cell::decode(slots[index], protection) {
            Cell::Occupied(old) => {
                slots[index] = value;
                Ok(old)
            }
            Cell::Free(_) => Err(TableError::AlreadyFreed { index }),
        }
    }

    /// Decodes slot `index` as a free-list link, whatever it holds.
    pub fn link_at(&self, index: usize) -> Option<Link> {
        let slots = view(&self.slots, self.cap).ok()?;
        slots.get(index).map(|raw| raw.unpack_link(self.protection))
    }

    /// Follows the free-list link stored in slot `index`.
    ///
    /// Returns `None` at the end of the list, for slots past
    /// `last_occupied`, and for any link that fails to decode.
    pub fn prev_free_index(&self, index: usize) -> Option<usize> {
        if index > self.last_occupied {
            return None;
        }
        let link = self.link_at(index)?;
        if !link.intact || link.offset == 0 {
            return None;
        }
        link.target(index).filter(|&next| next <= self.last_occupied)
    }

    /// Walks the free list from `first_free`.
    ///
    /// Stops silently on a broken link, like [`prev_free_index`](Self::prev_free_index).
    pub fn free_chain(&self) -> FreeChain<'_, W, S> {
        let start = if self.at_tail() { None } else { Some(self.first_free) };
        FreeChain {
            table: self,
            next: start,
            steps: 0,
        }
    }

    // One flag per slot up to last_occupied, set for slots on the free list.
    pub(crate) fn free_mask(&self) -> Result<Vec<bool>, TableError> {
        let mut free = vec![false; self.last_occupied + 1];
        if self.at_tail() {
            return Ok(free);
        }
        let slots = view(&self.slots, self.cap)?;
        let mut index = self.first_free;
        while index <= self.last_occupied {
            if free[index] {
                warn!("free list loops back to slot {index}");
                return Err(TableError::CorruptedMetadata { index });
            }
            free[index] = true;
            let link = slots[index].unpack_link(self.protection);
            if !link.intact || link.offset == 0 {
                return Err(TableError::CorruptedMetadata { index });
            }
            index = link
                .target(index)
                .ok_or(TableError::CorruptedMetadata { index })?;
        }
        Ok(free)
    }

    /// Iterates over live `(index, value)` pairs in index order.
    pub fn iter(&self) -> Result<impl Iterator<Item = (usize, W)> + '_, TableError> {
        let slots = view(&self.slots, self.cap)?;
        let (free, live) = if self.is_empty() {
            (Vec::new(), &slots[..0])
        } else {
            (self.free_mask()?, &slots[..=self.last_occupied])
        };
        Ok(live
            .iter()
            .copied()
            .enumerate()
            .filter(move |&(index, _)| !free[index]))
    }
}

/// Iterator over the free list, see [`PointerTable::free_chain`].
pub struct FreeChain<'a, W: Word, S> {
    table: &'a PointerTable<W, S>,
    next: Option<usize>,
    steps: usize,
}

impl<W, S> Iterator for FreeChain<'_, W, S>
where
    W: Word,
    S: AsRef<[W]> + AsMut<[W]>,
{
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let index = self.next.filter(|&index| index <= self.table.last_occupied)?;
        // A well-formed chain visits each slot at most once.
        self.steps += 1;
        if self.steps > self.table.last_occupied + 1 {
            self.next = None;
            return None;
        }
        self.next = self.table.prev_free_index(index);
        Some(index)
    }
}

impl<W: Word, S> fmt::Debug for PointerTable<W, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointerTable")
            .field("cap", &self.cap)
            .field("first_free", &self.first_free)
            .field("last_occupied", &self.last_occupied)
            .field("len", &self.len)
            .field("protection", &self.protection)
            .field("attached", &self.slots.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attached(cap: usize) -> PointerTable<u64> {
        let mut table = PointerTable::new(cap);
        table.attach(vec![0; cap]).unwrap();
        table
    }

    /// Tests that values written by append read back unchanged.
    #[test]
    fn test_append_get() {
        let mut table = attached(4);
        assert_eq!(table.capacity(), 4);
        assert_eq!(table.load_factor(), 0.0);

        let a = table.append(10).unwrap();
        let b = table.append(20).unwrap();
        assert_eq!(a, Appended { index: 0, full: false });
        assert_eq!(b.index, 1);
        assert_eq!(b.to_string(), "slot 1");
        assert_eq!(table.get(0), Some(10));
        assert_eq!(table.get(1), Some(20));
        assert_eq!(table.get(2), None);
        assert_eq!(table.len(), 2);
        assert_eq!(table.load_factor(), 0.5);
    }

    /// Tests the look-ahead overflow: the write that fills the table succeeds
    /// and says so, the next one fails without writing.
    #[test]
    fn test_overflow_boundary() {
        let mut table = attached(2);
        assert!(!table.append(1).unwrap().full);
        let last = table.append(2).unwrap();
        assert_eq!(last, Appended { index: 1, full: true });
        assert_eq!(last.to_string(), "slot 1 (table full)");

        assert_eq!(table.append(3), Err(TableError::Overflow { capacity: 2 }));
        assert_eq!(table.first_free(), 2);
        assert_eq!(table.last_occupied(), 1);
        assert_eq!(table.len(), 2);

        let mut slots = table.detach().unwrap();
        slots.resize(4, 0);
        table.set_capacity(4).unwrap();
        table.attach(slots).unwrap();
        assert_eq!(table.append(3).unwrap().index, 2);
        assert_eq!(table.get(0), Some(1));
    }

    /// Tests that reusing the last free slot through the free list reports
    /// a full table too.
    #[test]
    fn test_full_after_reuse() {
        let mut table = attached(3);
        for v in 0..3 {
            table.append(v).unwrap();
        }
        table.delete(1).unwrap();
        assert_eq!(table.append(7).unwrap(), Appended { index: 1, full: true });
    }

    #[test]
    fn test_delete_encodes_relative_offsets() {
        let mut table = attached(8);
        for v in 0..5 {
            table.append(v).unwrap();
        }
        table.delete(3).unwrap();
        assert_eq!(table.link_at(3), Some(Link { offset: 2, intact: true }));
        table.delete(0).unwrap();
        assert_eq!(table.link_at(0), Some(Link { offset: 3, intact: true }));
        assert_eq!(table.first_free(), 0);
        assert_eq!(table.free_chain().collect::<Vec<_>>(), vec![0, 3]);
        assert_eq!(table.prev_free_index(0), Some(3));
        assert_eq!(table.prev_free_index(3), None);
    }

    #[test]
    fn test_double_delete_is_detected() {
        let mut table = attached(8);
        for v in 0..4 {
            table.append(v).unwrap();
        }
        table.delete(1).unwrap();
        let (first_free, last_occupied) = (table.first_free(), table.last_occupied());

        assert_eq!(table.delete(1), Err(TableError::AlreadyFreed { index: 1 }));
        assert_eq!(table.first_free(), first_free);
        assert_eq!(table.last_occupied(), last_occupied);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_delete_top_shrinks_bound() {
        let mut table = attached(8);
        for v in 0..4 {
            table.append(v).unwrap();
        }
        table.delete(3).unwrap();
        assert_eq!(table.last_occupied(), 2);
        assert_eq!(table.first_free(), 3);
        // Still recognised as free through its guard tag.
        assert_eq!(table.delete(3), Err(TableError::AlreadyFreed { index: 3 }));
        assert_eq!(table.append(9).unwrap().index, 3);
        assert_eq!(table.last_occupied(), 3);
    }

    /// Deleting the top while holes exist keeps the holes reachable.
    #[test]
    fn test_delete_top_with_holes() {
        let mut table = attached(8);
        for v in 0..4 {
            table.append(v).unwrap();
        }
        table.delete(1).unwrap();
        table.delete(3).unwrap();
        assert_eq!(table.last_occupied(), 3);
        assert_eq!(table.first_free(), 3);
        assert_eq!(table.append(30).unwrap().index, 3);
        assert_eq!(table.append(10).unwrap().index, 1);
        assert_eq!(table.append(40).unwrap().index, 4);
    }

    #[test]
    fn test_out_of_range() {
        let mut table = attached(8);
        assert_eq!(
            table.delete(0),
            Err(TableError::IndexOutOfRange { index: 0, last_occupied: 0 })
        );
        table.append(1).unwrap();
        table.append(2).unwrap();
        assert_eq!(
            table.delete(5),
            Err(TableError::IndexOutOfRange { index: 5, last_occupied: 1 })
        );
        assert_eq!(
            table.delete(8),
            Err(TableError::IndexOutOfRange { index: 8, last_occupied: 1 })
        );
    }

    /// Tests that the cell just past the last append was never freed.
    #[test]
    fn test_delete_fresh_tail_is_out_of_range() {
        let mut table = attached(8);
        table.append(1).unwrap();
        table.append(2).unwrap();
        assert_eq!(table.link_at(2), Some(Link { offset: 0, intact: true }));
        assert_eq!(
            table.delete(2),
            Err(TableError::IndexOutOfRange { index: 2, last_occupied: 1 })
        );
        assert_eq!(table.first_free(), 2);
        assert_eq!(table.len(), 2);
    }

    /// Tests that a tail append does not stamp over a freed top slot above it.
    #[test]
    fn test_tail_append_keeps_freed_top() {
        let mut table = attached(8);
        for v in 0..4 {
            table.append(v).unwrap();
        }
        table.delete(3).unwrap();
        table.delete(2).unwrap();
        assert_eq!(table.append(20).unwrap().index, 2);
        assert_eq!(table.link_at(3), Some(Link { offset: 1, intact: true }));
        assert_eq!(table.delete(3), Err(TableError::AlreadyFreed { index: 3 }));
        assert_eq!(table.append(30).unwrap().index, 3);
    }

    #[test]
    fn test_detached_table() {
        let mut table: PointerTable<u64> = PointerTable::new(4);
        assert!(!table.is_attached());
        assert_eq!(table.append(1), Err(TableError::Detached));
        assert_eq!(table.delete(0), Err(TableError::Detached));
        assert_eq!(table.get(0), None);
        assert!(table.iter().is_err());
    }

    #[test]
    fn test_attach_checks_length() {
        let mut table: PointerTable<u64> = PointerTable::new(4);
        assert_eq!(
            table.attach(vec![0; 3]).unwrap_err(),
            TableError::BufferTooSmall { len: 3, capacity: 4 }
        );
        assert_eq!(table.attach(vec![0; 4]), Ok(None));
        assert_eq!(table.byte_size(), 32);
        assert_eq!(byte_size::<u32>(4), 16);
    }

    #[test]
    fn test_set_capacity_rules() {
        let mut table = attached(8);
        for v in 0..4 {
            table.append(v).unwrap();
        }
        assert_eq!(
            table.set_capacity(16),
            Err(TableError::BufferTooSmall { len: 8, capacity: 16 })
        );
        assert_eq!(
            table.set_capacity(3),
            Err(TableError::ShrinkBelowOccupied { requested: 3, last_occupied: 3 })
        );
        table.set_capacity(4).unwrap();
        assert!(table.append(5).is_err());

        for index in (0..4).rev() {
            table.delete(index).unwrap();
        }
        table.set_capacity(1).unwrap();
        assert_eq!(table.first_free(), 0);
        assert_eq!(table.append(5).unwrap(), Appended { index: 0, full: true });
    }

    #[test]
    fn test_config_validation() {
        let err = TableConfig::new(40_000).build::<u32, Vec<u32>>().unwrap_err();
        assert_eq!(err, TableError::CapacityTooLarge { requested: 40_000, max: i16::MAX as usize });

        let table = TableConfig::new(40_000)
            .protection(Protection::Unguarded)
            .build::<u32, Vec<u32>>()
            .unwrap();
        assert_eq!(table.protection(), Protection::Unguarded);

        let err = TableConfig::new(8)
            .protection(Protection::Guarded)
            .build::<u16, Vec<u16>>()
            .unwrap_err();
        assert_eq!(err, TableError::GuardUnavailable { bits: 16 });
    }

    #[test]
    fn test_set_and_iter() {
        let mut table = attached(8);
        for v in [5, 6, 7, 8] {
            table.append(v).unwrap();
        }
        table.delete(2).unwrap();
        assert_eq!(table.set(1, 60), Ok(6));
        assert_eq!(table.set(2, 70), Err(TableError::AlreadyFreed { index: 2 }));
        let live: Vec<_> = table.iter().unwrap().collect();
        assert_eq!(live, vec![(0, 5), (1, 60), (3, 8)]);
    }

    #[test]
    fn test_borrowed_buffer() {
        let mut cells = [0u64; 4];
        {
            let mut table: PointerTable<u64, &mut [u64]> = PointerTable::new(4);
            table.attach(&mut cells[..]).unwrap();
            table.append(0xAB).unwrap();
        }
        assert_eq!(cells[0], 0xAB);
    }
}
