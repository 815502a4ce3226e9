//! # Free-list cell encoding
//!
//! A free slot stores the signed distance to the next free slot directly in
//! its own cell. With [`Protection::Guarded`] the distance lives in the low
//! half of the word and a fixed guard pattern fills the high half, so a cell
//! that was overwritten (or freed twice) decodes as a broken link instead of
//! silently steering the free list somewhere else.
//!
//! | word  | guard tag       | offset | unguarded offset |
//! |-------|-----------------|--------|------------------|
//! | `u8`  | -               | -      | `i8`             |
//! | `u16` | -               | -      | `i16`            |
//! | `u32` | `0xFEED`        | `i16`  | `i32`            |
//! | `u64` | `0xFEED_FACE`   | `i32`  | `i64`            |
//!
//! `usize` follows the row matching `target_pointer_width`.
//!
//! Guarding halves the representable offset range, which bounds the table
//! capacity (see [`Word::max_offset`]). A caller value whose high half happens
//! to equal the guard pattern is indistinguishable from a free link.

use std::fmt;

/// Guard pattern stamped into the high half of 64-bit free cells.
pub const GUARD_32: u32 = 0xFEED_FACE;
/// Guard pattern stamped into the high half of 32-bit free cells.
pub const GUARD_16: u16 = 0xFEED;

/// Whether free-list links carry a guard tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Protection {
    /// Offset in the low half, guard pattern in the high half.
    Guarded,
    /// Offset occupies the whole word; misuse goes undetected.
    Unguarded,
}

/// A decoded free-list link.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Link {
    /// Signed distance, in slots, to the next free slot.
    pub offset: isize,
    /// `false` when the guard tag did not match.
    pub intact: bool,
}

impl Link {
    /// Index this link points to, if it stays non-negative.
    #[inline]
    pub fn target(&self, from: usize) -> Option<usize> {
        from.checked_add_signed(self.offset)
    }
}

/// Content of a slot as seen through the guard tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Cell<W> {
    Occupied(W),
    Free(Link),
}

impl<W: Word> Cell<W> {
    /// Classifies a raw cell.
    ///
    /// Without a guard tag every cell looks occupied, since nothing in the
    /// word tells a value apart from a link.
    pub fn decode(raw: W, protection: Protection) -> Self {
        match protection {
            Protection::Guarded => {
                let link = raw.unpack_link(protection);
                if link.intact {
                    Cell::Free(link)
                } else {
                    Cell::Occupied(raw)
                }
            }
            Protection::Unguarded => Cell::Occupied(raw),
        }
    }

    /// Whether the cell holds an intact free-list link.
    #[inline]
    pub fn is_free(&self) -> bool {
        matches!(self, Cell::Free(_))
    }
}

/// An unsigned integer wide enough to serve as a table cell.
pub trait Word: Copy + Eq + fmt::Debug + fmt::LowerHex + 'static {
    /// Width of the cell in bits.
    const BITS: u32;
    /// Whether the word has room for a guard tag next to the offset.
    const GUARDABLE: bool;
    /// A zeroed cell.
    const ZERO: Self;

    /// Largest offset magnitude representable under `protection`.
    ///
    /// A table's capacity must not exceed this value.
    fn max_offset(protection: Protection) -> usize;

    /// Encodes `offset` as a free-list link.
    ///
    /// `offset` must lie within `-(max_offset + 1)..=max_offset`.
    fn pack_link(offset: isize, protection: Protection) -> Self;

    /// Decodes a cell as a free-list link, preserving the offset's sign.
    fn unpack_link(self, protection: Protection) -> Link;

    /// The protection a table built on this word gets by default.
    fn default_protection() -> Protection {
        if Self::GUARDABLE {
            Protection::Guarded
        } else {
            Protection::Unguarded
        }
    }
}

fn clamp_offset(max: u128) -> usize {
    max.min(isize::MAX as u128) as usize
}

macro_rules! guarded_word {
    ($word:ty, $signed:ty, $half:ty, $half_signed:ty, $guard:expr) => {
        impl Word for $word {
            const BITS: u32 = <$word>::BITS;
            const GUARDABLE: bool = true;
            const ZERO: Self = 0;

            fn max_offset(protection: Protection) -> usize {
                match protection {
                    Protection::Guarded => clamp_offset(<$half_signed>::MAX as u128),
                    Protection::Unguarded => clamp_offset(<$signed>::MAX as u128),
                }
            }

            #[inline]
            fn pack_link(offset: isize, protection: Protection) -> Self {
                match protection {
                    Protection::Guarded => {
                        let low = (offset as $half_signed) as $half as $word;
                        (($guard as $word) << <$half>::BITS) | low
                    }
                    Protection::Unguarded => (offset as $signed) as $word,
                }
            }

            #[inline]
            fn unpack_link(self, protection: Protection) -> Link {
                match protection {
                    Protection::Guarded => {
                        let tag = (self >> <$half>::BITS) as $half;
                        Link {
                            offset: (self as $half) as $half_signed as isize,
                            intact: tag == $guard,
                        }
                    }
                    Protection::Unguarded => Link {
                        offset: (self as $signed) as isize,
                        intact: true,
                    },
                }
            }
        }
    };
}

// Too narrow to spare tag bits: the protection argument is ignored.
macro_rules! unguarded_word {
    ($word:ty, $signed:ty) => {
        impl Word for $word {
            const BITS: u32 = <$word>::BITS;
            const GUARDABLE: bool = false;
            const ZERO: Self = 0;

            fn max_offset(_: Protection) -> usize {
                clamp_offset(<$signed>::MAX as u128)
            }

            #[inline]
            fn pack_link(offset: isize, _: Protection) -> Self {
                (offset as $signed) as $word
            }

            #[inline]
            fn unpack_link(self, _: Protection) -> Link {
                Link {
                    offset: (self as $signed) as isize,
                    intact: true,
                }
            }
        }
    };
}

unguarded_word!(u8, i8);
unguarded_word!(u16, i16);
guarded_word!(u32, i32, u16, i16, GUARD_16);
guarded_word!(u64, i64, u32, i32, GUARD_32);

#[cfg(target_pointer_width = "64")]
guarded_word!(usize, isize, u32, i32, GUARD_32);
#[cfg(target_pointer_width = "32")]
guarded_word!(usize, isize, u16, i16, GUARD_16);
#[cfg(target_pointer_width = "16")]
unguarded_word!(usize, isize);
