//! Runtime description of a traced variable's byte layout.
//!
//! `float`, `[f32; 4]` and a user matrix type holding four `f32` are all the
//! same thing to a consumer: four 4-byte reals. [`TypeDescriptor`] keeps only
//! that, and [`Traceable`] derives it from static type information.

use core::cell::Cell;
use core::fmt;
use core::ptr::NonNull;
use core::sync::atomic::{
    AtomicBool, AtomicI8, AtomicI16, AtomicI32, AtomicIsize, AtomicU8, AtomicU16, AtomicU32,
    AtomicUsize,
};
#[cfg(target_has_atomic = "64")]
use core::sync::atomic::{AtomicI64, AtomicU64};

/// Element kind.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Boolean = 0,
    /// Signed integer.
    Integer = 1,
    /// Unsigned integer.
    Unsigned = 2,
    /// Floating point.
    Real = 3,
}

impl Kind {
    /// Short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Kind::Boolean => "bool",
            Kind::Integer => "int",
            Kind::Unsigned => "uint",
            Kind::Real => "real",
        }
    }
}

/// Layout of a traced variable: `element_count` elements of `element_size`
/// bytes each. Equality is structural.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    pub kind: Kind,
    pub element_size: usize,
    pub element_count: usize,
}

impl TypeDescriptor {
    /// Panics (at compile time, in const context) if either dimension is zero.
    pub const fn new(kind: Kind, element_size: usize, element_count: usize) -> Self {
        assert!(element_size > 0, "Element size must be positive");
        assert!(element_count > 0, "Number of elements must be positive");
        Self {
            kind,
            element_size,
            element_count,
        }
    }

    /// Descriptor of a single scalar.
    pub const fn scalar<E: Element>() -> Self {
        Self::new(E::KIND, core::mem::size_of::<E>(), 1)
    }

    /// Descriptor of a homogeneous container of `count` elements of `E`.
    pub const fn container<E: Element>(count: usize) -> Self {
        Self::new(E::KIND, core::mem::size_of::<E>(), count)
    }

    /// Total size in bytes.
    pub const fn size(&self) -> usize {
        self.element_size * self.element_count
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.element_count == 1 {
            write!(f, "{}{}", self.kind.label(), self.element_size * 8)
        } else {
            write!(
                f,
                "{}{}[{}]",
                self.kind.label(),
                self.element_size * 8,
                self.element_count
            )
        }
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Scalar element types a probe can trace.
pub trait Element: sealed::Sealed + Copy + 'static {
    const KIND: Kind;
}

/// A value whose bytes can be sampled by a probe.
///
/// Sampling reads the bytes with plain volatile loads, not atomics. A
/// sampler on another thread therefore races with any write the owning
/// thread makes through a `Cell` (or other interior mutability) while the
/// probe is live, which is undefined behavior. Trace a `Cell` only when the
/// samples come from the same thread, or from an interrupt handler that
/// preempts it. For values written while other threads sample them, trace an
/// atomic type instead, so the owning thread's accesses stay atomic. The
/// sample itself is still a plain byte copy: it may mix bytes of the old and
/// new value, and the Rust memory model still counts it as racing with the
/// store. Values that must be sampled across threads with full guarantees
/// should not be written while their probe is live.
///
/// # Safety
///
/// `base_ptr()` must point at `DESCRIPTOR.size()` readable bytes that stay
/// valid for as long as `self` is borrowed, laid out as
/// `DESCRIPTOR.element_count` contiguous elements.
pub unsafe trait Traceable {
    const DESCRIPTOR: TypeDescriptor;

    /// Address of the first element.
    fn base_ptr(&self) -> NonNull<u8>;
}

macro_rules! impl_element {
    ($kind:ident: $($t:ty),+) => {$(
        impl sealed::Sealed for $t {}

        impl Element for $t {
            const KIND: Kind = Kind::$kind;
        }

        unsafe impl Traceable for $t {
            const DESCRIPTOR: TypeDescriptor = TypeDescriptor::scalar::<$t>();

            fn base_ptr(&self) -> NonNull<u8> {
                NonNull::from(self).cast()
            }
        }

        unsafe impl<const N: usize> Traceable for [$t; N] {
            const DESCRIPTOR: TypeDescriptor = TypeDescriptor::container::<$t>(N);

            fn base_ptr(&self) -> NonNull<u8> {
                NonNull::from(self).cast()
            }
        }

        // Cell<T> is repr(transparent) over T. Writes through the cell are
        // not synchronized with samplers; see the `Traceable` docs.
        unsafe impl Traceable for Cell<$t> {
            const DESCRIPTOR: TypeDescriptor = TypeDescriptor::scalar::<$t>();

            fn base_ptr(&self) -> NonNull<u8> {
                NonNull::from(self).cast()
            }
        }

        unsafe impl<const N: usize> Traceable for Cell<[$t; N]> {
            const DESCRIPTOR: TypeDescriptor = TypeDescriptor::container::<$t>(N);

            fn base_ptr(&self) -> NonNull<u8> {
                NonNull::from(self).cast()
            }
        }
    )+};
}

impl_element!(Boolean: bool);
impl_element!(Integer: i8, i16, i32, i64, i128, isize);
impl_element!(Unsigned: u8, u16, u32, u64, u128, usize);
impl_element!(Real: f32, f64);

macro_rules! impl_atomic {
    ($($atomic:ty => $t:ty),+ $(,)?) => {$(
        // Atomic types have the same size as their underlying integer.
        unsafe impl Traceable for $atomic {
            const DESCRIPTOR: TypeDescriptor = TypeDescriptor::scalar::<$t>();

            fn base_ptr(&self) -> NonNull<u8> {
                NonNull::from(self).cast()
            }
        }
    )+};
}

impl_atomic!(
    AtomicBool => bool,
    AtomicI8 => i8,
    AtomicI16 => i16,
    AtomicI32 => i32,
    AtomicIsize => isize,
    AtomicU8 => u8,
    AtomicU16 => u16,
    AtomicU32 => u32,
    AtomicUsize => usize,
);

#[cfg(target_has_atomic = "64")]
impl_atomic!(AtomicI64 => i64, AtomicU64 => u64);
