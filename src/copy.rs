//! Byte copy used on the sampling path.
//!
//! For short blocks a word loop beats a general `memcpy` call on small cores,
//! but only when size, source and destination are all word aligned.
//! Otherwise the copy falls back to one byte per iteration. Reads are
//! volatile: the source is a live variable that other code may be writing.

use core::mem::size_of;

/// Native word width in bytes.
pub const WORD_SIZE: usize = size_of::<usize>();

/// Whether a copy of `size` bytes between these addresses takes the word path.
#[inline]
pub fn is_word_aligned(size: usize, src: *const u8, dst: *const u8) -> bool {
    size % WORD_SIZE == 0 && (src as usize) % WORD_SIZE == 0 && (dst as usize) % WORD_SIZE == 0
}

/// Copies `size` bytes from `src` to `dst`.
///
/// # Safety
///
/// `size` must be non-zero. `src` must be valid for reads and `dst` valid for
/// writes of `size` bytes, and the two ranges must not overlap. No other
/// thread may write `src` non-atomically during the copy: volatile reads do
/// not make a concurrent write race-free.
#[inline]
pub unsafe fn copy_bytes(size: usize, src: *const u8, dst: *mut u8) {
    debug_assert!(size > 0);

    if is_word_aligned(size, src, dst) {
        let words = size / WORD_SIZE;
        let src = src as *const usize;
        let dst = dst as *mut usize;
        for i in 0..words {
            // SAFETY: both ranges cover `words` aligned words.
            unsafe { dst.add(i).write(src.add(i).read_volatile()) };
        }
    } else {
        for i in 0..size {
            // SAFETY: both ranges cover `size` bytes.
            unsafe { dst.add(i).write(src.add(i).read_volatile()) };
        }
    }
}
