//! Embedder-supplied configuration.
//!
//! The registry, categories and probes are generic over a [`Config`] that
//! provides the critical section, the clock, and the two size limits.

#[cfg(any(test, feature = "std", feature = "test-utils"))]
use crate::platform::{self, SpinCriticalSection};

/// Scoped mutual exclusion. Entered by [`CriticalSection::enter`], released
/// when the returned value is dropped.
///
/// # Safety
///
/// While a value returned by `enter` is alive, no other context (thread or
/// interrupt handler) that can reach the same categories may hold one.
/// Categories rely on this to mutate their live-variable stacks through a
/// shared reference.
pub unsafe trait CriticalSection: Sized {
    fn enter() -> Self;
}

/// Compile-time configuration of the probe engine.
pub trait Config: 'static {
    /// Bracket for every live-stack mutation and every sample read.
    type CriticalSection: CriticalSection;

    /// Sample timestamp, as returned by [`Config::now`].
    type Timestamp: Copy;

    /// Largest traceable variable in bytes. Must be positive.
    const MAX_VARIABLE_SIZE: usize;

    /// How many probes of one category may be live at once. Must be positive.
    ///
    /// Exceeding it panics in debug builds. In release builds nested
    /// variables are traced incorrectly until the probe that overflowed is
    /// dropped.
    const MAX_COEXISTENT_PROBES: usize;

    /// Current time. Always called with the critical section held.
    fn now() -> Self::Timestamp;
}

/// Spin-lock critical section, nanosecond timestamps from the platform clock.
///
/// Only available when a platform clock is: with `std`, or with `test-utils`
/// (mock clock).
#[cfg(any(test, feature = "std", feature = "test-utils"))]
pub struct DefaultConfig;

#[cfg(any(test, feature = "std", feature = "test-utils"))]
impl Config for DefaultConfig {
    type CriticalSection = SpinCriticalSection;
    type Timestamp = u64;

    const MAX_VARIABLE_SIZE: usize = 256;
    const MAX_COEXISTENT_PROBES: usize = 10;

    fn now() -> u64 {
        platform::time_ns()
    }
}
