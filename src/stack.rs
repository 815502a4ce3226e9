//! Stack view of a [`PointerTable`]: `push` appends, `pop` removes the
//! value in the highest live slot. No extra state is kept; both go through
//! the same free list as `append`/`delete`.

use log::trace;

use crate::encoding::{Protection, Word};
use crate::error::TableError;
use crate::pointer_table::{Appended, PointerTable};

impl<W, S> PointerTable<W, S>
where
    W: Word,
    S: AsRef<[W]> + AsMut<[W]>,
{
    /// Same as [`append`](Self::append).
    #[inline]
    pub fn push(&mut self, value: W) -> Result<Appended, TableError> {
        self.append(value)
    }

    /// Removes and returns the value in the highest live slot, or `None`
    /// when the table is empty.
    ///
    /// Reading the top slot is enough when it is live. If it was freed while
    /// lower slots were also free (or, without a guard tag, cannot be told
    /// apart from a link), the free list is walked to find the highest live
    /// one.
    pub fn pop(&mut self) -> Result<Option<W>, TableError> {
        if self.is_empty() {
            return Ok(None);
        }
        let last = self.last_occupied();
        let top = if self.first_free() > last {
            last
        } else if self.protection() == Protection::Guarded && self.get(last).is_some() {
            last
        } else {
            let free = self.free_mask()?;
            match free.iter().rposition(|&is_free| !is_free) {
                Some(top) => top,
                None => return Ok(None),
            }
        };
        let value = match self.get(top) {
            Some(value) => value,
            None => return Err(TableError::AlreadyFreed { index: top }),
        };
        self.delete(top)?;
        trace!("pop: slot {top}");
        Ok(Some(value))
    }
}
