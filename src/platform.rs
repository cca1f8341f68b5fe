//! Platform abstraction layer.
//!
//! This module provides the clock and the critical sections the probe engine
//! needs. The host clock needs `std`; the mock clock is only built for tests
//! or with the `test-utils` feature.

#[cfg(any(test, feature = "test-utils"))]
use core::sync::atomic::{AtomicU64, Ordering};

use spin::{Mutex, MutexGuard};

use crate::config::CriticalSection;

/// Platform operations trait.
///
/// Abstracts over platform-specific operations to enable mock testing.
pub trait PlatformOps {
    /// Get current monotonic time in nanoseconds.
    fn time_ns() -> u64;
}

// =============================================================================
// Host Implementation (std)
// =============================================================================

/// Host platform operations using `std::time`.
#[cfg(all(not(test), feature = "std"))]
pub struct StdPlatform;

#[cfg(all(not(test), feature = "std"))]
impl PlatformOps for StdPlatform {
    fn time_ns() -> u64 {
        static EPOCH: spin::Once<std::time::Instant> = spin::Once::new();
        let epoch = EPOCH.call_once(std::time::Instant::now);
        epoch.elapsed().as_nanos() as u64
    }
}

// =============================================================================
// Mock Implementation (test environment or test-utils)
// =============================================================================

/// Mock time value for testing.
#[cfg(any(test, feature = "test-utils"))]
static MOCK_TIME_NS: AtomicU64 = AtomicU64::new(1_000_000_000); // 1 second

/// Mock platform operations for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockPlatform;

#[cfg(any(test, feature = "test-utils"))]
impl PlatformOps for MockPlatform {
    fn time_ns() -> u64 {
        MOCK_TIME_NS.load(Ordering::Relaxed)
    }
}

/// Set mock time for testing.
#[cfg(any(test, feature = "test-utils"))]
pub fn set_mock_time(ns: u64) {
    MOCK_TIME_NS.store(ns, Ordering::Relaxed);
}

/// Advance mock time by given nanoseconds.
#[cfg(any(test, feature = "test-utils"))]
pub fn advance_mock_time(ns: u64) {
    MOCK_TIME_NS.fetch_add(ns, Ordering::Relaxed);
}

// =============================================================================
// Platform Type Alias
// =============================================================================

/// The active platform implementation.
///
/// With std: StdPlatform (monotonic time since first use)
/// In test environment, or with test-utils and no std: MockPlatform
///
/// Without either there is no platform clock; implement [`Config::now`]
/// directly.
///
/// [`Config::now`]: crate::Config::now
#[cfg(all(not(test), feature = "std"))]
pub type Platform = StdPlatform;

#[cfg(any(test, all(feature = "test-utils", not(feature = "std"))))]
pub type Platform = MockPlatform;

/// Get current time in nanoseconds.
#[cfg(any(test, feature = "std", feature = "test-utils"))]
#[inline]
pub fn time_ns() -> u64 {
    Platform::time_ns()
}

// =============================================================================
// Critical Sections
// =============================================================================

static GLOBAL_LOCK: Mutex<()> = Mutex::new(());

/// Critical section backed by one process-wide spin lock.
///
/// Not reentrant, and not safe against interrupt handlers that sample on the
/// core holding the lock; use [`IrqCriticalSection`] there.
pub struct SpinCriticalSection {
    _guard: MutexGuard<'static, ()>,
}

unsafe impl CriticalSection for SpinCriticalSection {
    fn enter() -> Self {
        Self {
            _guard: GLOBAL_LOCK.lock(),
        }
    }
}

/// Critical section that does nothing.
///
/// Only sound when every probe, sample and registry call happens from a
/// single context with no interrupts touching the categories.
pub struct NoopCriticalSection;

unsafe impl CriticalSection for NoopCriticalSection {
    fn enter() -> Self {
        Self
    }
}

/// Critical section that masks local interrupts and restores the previous
/// mask on drop. Single-core targets only; runs at a privilege level that
/// may change the mask.
#[cfg(all(
    feature = "irq-lock",
    any(target_arch = "aarch64", target_arch = "x86_64")
))]
pub struct IrqCriticalSection {
    saved: usize,
}

#[cfg(all(feature = "irq-lock", target_arch = "aarch64"))]
unsafe impl CriticalSection for IrqCriticalSection {
    fn enter() -> Self {
        let saved: usize;
        unsafe {
            core::arch::asm!(
                "mrs {0}, daif",        // Save current mask
                "msr daifset, #2",      // Mask IRQ
                out(reg) saved,
                options(nostack, preserves_flags)
            );
        }
        Self { saved }
    }
}

#[cfg(all(feature = "irq-lock", target_arch = "aarch64"))]
impl Drop for IrqCriticalSection {
    fn drop(&mut self) {
        unsafe {
            core::arch::asm!(
                "msr daif, {0}",
                in(reg) self.saved,
                options(nostack, preserves_flags)
            );
        }
    }
}

#[cfg(all(feature = "irq-lock", target_arch = "x86_64"))]
unsafe impl CriticalSection for IrqCriticalSection {
    fn enter() -> Self {
        let saved: usize;
        unsafe {
            core::arch::asm!(
                "pushfq",
                "pop {0}",
                "cli",
                out(reg) saved,
            );
        }
        Self { saved }
    }
}

#[cfg(all(feature = "irq-lock", target_arch = "x86_64"))]
impl Drop for IrqCriticalSection {
    fn drop(&mut self) {
        // Re-enable only if IF was set on entry.
        if self.saved & 0x200 != 0 {
            unsafe {
                core::arch::asm!("sti", options(nomem, nostack));
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
