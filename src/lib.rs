//! Variable Probe Framework
//!
//! This crate lets real-time code mark selected variables as probed so that an
//! external agent (debugger, telemetry exporter, on-device console) can list
//! them by name and type and sample their current bytes with a timestamp. The
//! traced code does nothing beyond declaring the probe.
//!
//! # Features
//!
//! - `std` (default) - Host monotonic clock for `platform::time_ns` and
//!   [`DefaultConfig`]
//! - `irq-lock` - Interrupt-masking critical section (`platform::IrqCriticalSection`)
//! - `test-utils` - Mock clock (`platform::set_mock_time`) for downstream tests
//!
//! Without `std` or `test-utils` there is no built-in clock: implement
//! [`Config`] with the target's timer.
//!
//! # Quick Start
//!
//! ```ignore
//! use varprobe::{DefaultConfig, Identifier, Registry, probe};
//!
//! static PROBES: Registry<DefaultConfig> = Registry::new();
//!
//! fn motor_task(rpm: &core::cell::Cell<u32>) {
//!     probe!(&PROBES, "rpm", *rpm);
//!     // ... runs while consumers can sample "rpm"
//! }
//!
//! // Consumer side
//! for info in PROBES.list() {
//!     log::info!("{}", info);
//! }
//! if let Some(category) = PROBES.by_name(&Identifier::encode("rpm")) {
//!     let sample = category.sample();
//!     log::info!("t={} bytes={:?}", sample.timestamp, sample.bytes);
//! }
//! ```

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

#[macro_use]
extern crate log;

// =============================================================================
// Platform Abstraction (for testing support)
// =============================================================================

pub mod config;
pub mod platform;

// =============================================================================
// Names and Types
// =============================================================================

pub mod descriptor;
pub mod identifier;

// =============================================================================
// Registry and Sampling
// =============================================================================

pub mod category;
pub mod copy;
pub mod registry;

// =============================================================================
// Probes
// =============================================================================

pub mod macros;
pub mod probe;

// Re-export key types for convenience
pub use category::{Category, Sample};
pub use config::{Config, CriticalSection};
#[cfg(any(test, feature = "std", feature = "test-utils"))]
pub use config::DefaultConfig;
pub use descriptor::{Element, Kind, Traceable, TypeDescriptor};
pub use identifier::{Identifier, NameError};
pub use probe::{Probe, ProbeSite};
pub use registry::{CategoryInfo, Registry};
