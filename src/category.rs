//! Probe categories.
//!
//! One [`Category`] exists per distinct (name, type) pair. It keeps a bounded
//! stack of the addresses of currently live variables of that category, so
//! that nested, recursive and re-entrant probes with the same name behave
//! correctly: the most recently pushed location is the one that gets sampled.
//!
//! All stack mutation and every sample read happen inside the configured
//! critical section. Nothing in this module allocates after construction,
//! except [`Category::sample`], which sizes its output buffer before entering
//! the critical section.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::UnsafeCell;
use core::fmt;
use core::marker::PhantomData;
use core::ptr::{self, NonNull};

use crate::config::{Config, CriticalSection};
use crate::copy::copy_bytes;
use crate::descriptor::TypeDescriptor;
use crate::identifier::Identifier;

/// Timestamped snapshot of a category's current variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample<T> {
    /// Time read from the clock inside the critical section.
    pub timestamp: T,
    /// Variable bytes in native layout, or empty if nothing was live.
    pub bytes: Vec<u8>,
}

impl<T> Sample<T> {
    /// Whether no variable was live when the sample was taken.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Bounded stack of live-variable locations.
struct LiveStack {
    slots: Box<[*const u8]>,
    len: usize,
    /// Pushes beyond capacity that were not stored.
    overflow: usize,
    /// Location being sampled, null when empty.
    top: *const u8,
}

impl LiveStack {
    fn new(capacity: usize) -> Self {
        Self {
            slots: vec![ptr::null(); capacity].into_boxed_slice(),
            len: 0,
            overflow: 0,
            top: ptr::null(),
        }
    }

    fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    /// Returns false if the stack was full.
    fn push(&mut self, location: *const u8) -> bool {
        self.top = location;
        if self.len < self.slots.len() && self.overflow == 0 {
            self.slots[self.len] = location;
            self.len += 1;
            true
        } else {
            self.overflow += 1;
            false
        }
    }

    /// Removes the newest stored entry equal to `location`, or one overflowed
    /// push if none is stored. Returns false, leaving the stack untouched, if
    /// `location` is not held at all.
    fn pop(&mut self, location: *const u8) -> bool {
        match self.slots[..self.len].iter().rposition(|s| *s == location) {
            Some(pos) => {
                self.slots.copy_within(pos + 1..self.len, pos);
                self.len -= 1;
            }
            None if self.overflow > 0 => self.overflow -= 1,
            None => return false,
        }

        // Overflowed locations are not stored, so fall back to the newest
        // stored one even if an overflowed probe is still live.
        self.top = if self.len > 0 {
            self.slots[self.len - 1]
        } else {
            ptr::null()
        };
        true
    }
}

/// Registry entry for one probe name and type.
///
/// Categories are created by a [`Registry`](crate::Registry), live for the rest
/// of the process, and are never moved.
pub struct Category<C: Config> {
    name: Identifier,
    descriptor: TypeDescriptor,
    live: UnsafeCell<LiveStack>,
    _config: PhantomData<fn() -> C>,
}

// SAFETY: `live` is only touched inside `C::CriticalSection`, whose contract
// guarantees exclusion across every context that can reach this category.
unsafe impl<C: Config> Sync for Category<C> {}
unsafe impl<C: Config> Send for Category<C> {}

impl<C: Config> Category<C> {
    pub(crate) fn new(name: Identifier, descriptor: TypeDescriptor) -> Self {
        assert!(
            descriptor.size() <= C::MAX_VARIABLE_SIZE,
            "The type is too large to be traceable: {} > {}",
            descriptor.size(),
            C::MAX_VARIABLE_SIZE
        );
        Self {
            name,
            descriptor,
            live: UnsafeCell::new(LiveStack::new(C::MAX_COEXISTENT_PROBES)),
            _config: PhantomData,
        }
    }

    /// Name shared by all probes of this category.
    pub fn name(&self) -> &Identifier {
        &self.name
    }

    /// Type of all variables traced by this category.
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// Runs `f` on the live stack inside the critical section.
    #[inline]
    fn with_live<R>(&self, f: impl FnOnce(&mut LiveStack) -> R) -> R {
        let _cs = C::CriticalSection::enter();
        // SAFETY: the critical section excludes every other access to `live`.
        f(unsafe { &mut *self.live.get() })
    }

    /// Makes `location` the sampled variable until the matching [`pop`].
    ///
    /// Pushing more than `C::MAX_COEXISTENT_PROBES` locations is a
    /// configuration error: debug builds panic; release builds sample the
    /// newest location but cannot restore the overflowed ones on pop.
    ///
    /// # Safety
    ///
    /// `location` must be valid for reads of `self.descriptor().size()` bytes
    /// until the matching `pop` returns.
    ///
    /// [`pop`]: Category::pop
    pub unsafe fn push(&self, location: NonNull<u8>) {
        let stored = self.with_live(|live| {
            // Checked builds leave the stack untouched so unwinding probes
            // still pop in order.
            if cfg!(debug_assertions) && live.is_full() {
                return false;
            }
            live.push(location.as_ptr())
        });
        if !stored {
            error!(
                "Probe category '{}' exceeded {} coexistent probes",
                self.name,
                C::MAX_COEXISTENT_PROBES
            );
            if cfg!(debug_assertions) {
                panic!("Too many coexistent probes of category '{}'", self.name);
            }
        }
    }

    /// Removes `location`, the one the caller pushed.
    ///
    /// Within one context pops are LIFO and remove the top. Probes of one
    /// category on different threads may end in any order; each pop removes
    /// its own entry and the newest remaining one becomes the sampled
    /// variable. Popping a location that is not held leaves the stack
    /// untouched and panics in debug builds.
    pub fn pop(&self, location: NonNull<u8>) {
        let held = self.with_live(|live| live.pop(location.as_ptr()));
        debug_assert!(
            held,
            "Probe category '{}' popped a location it does not hold",
            self.name
        );
    }

    /// Samples the current variable.
    ///
    /// The clock is read and the bytes are copied within one critical
    /// section. The returned bytes are empty if no variable is live.
    pub fn sample(&self) -> Sample<C::Timestamp> {
        let size = self.descriptor.size();
        let mut bytes = vec![0u8; size];
        let dst = bytes.as_mut_ptr();

        let (timestamp, live) = self.with_live(|live| {
            let timestamp = C::now();
            if live.top.is_null() {
                return (timestamp, false);
            }
            // SAFETY: `top` was pushed with `size` readable bytes and is live
            // until popped, which cannot happen while we hold the section.
            unsafe { copy_bytes(size, live.top, dst) };
            (timestamp, true)
        });

        if !live {
            bytes.clear();
        }
        Sample { timestamp, bytes }
    }

    /// Allocation-free form of [`sample`](Category::sample). Copies into the
    /// front of `out` and returns the number of bytes written (0 if nothing
    /// is live).
    ///
    /// Panics if `out` is shorter than `self.descriptor().size()`.
    pub fn sample_into(&self, out: &mut [u8]) -> (C::Timestamp, usize) {
        let size = self.descriptor.size();
        assert!(out.len() >= size, "Sample buffer too small: {} < {}", out.len(), size);
        let dst = out.as_mut_ptr();

        self.with_live(|live| {
            let timestamp = C::now();
            if live.top.is_null() {
                return (timestamp, 0);
            }
            // SAFETY: see `sample`.
            unsafe { copy_bytes(size, live.top, dst) };
            (timestamp, size)
        })
    }

    /// Number of live variables, including overflowed ones.
    pub fn depth(&self) -> usize {
        self.with_live(|live| live.len + live.overflow)
    }

    /// Number of live variables pushed beyond capacity.
    pub fn overflow(&self) -> usize {
        self.with_live(|live| live.overflow)
    }

    /// Whether any variable of this category is live.
    pub fn is_live(&self) -> bool {
        self.with_live(|live| !live.top.is_null())
    }
}

impl<C: Config> fmt::Debug for Category<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Category")
            .field("name", &self.name)
            .field("descriptor", &self.descriptor)
            .finish()
    }
}
