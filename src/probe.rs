//! Probe sites and probe handles.
//!
//! A [`ProbeSite`] is a declaration point in the source: a name plus a lazily
//! bound category. A [`Probe`] is the scope-bound handle that makes one
//! variable the sampled instance of that category for as long as it lives.
//!
//! Use the [`probe!`](crate::probe!) macro rather than these types directly;
//! it declares the site as a `static` and keeps the handle in a binding the
//! caller cannot leak.

use core::marker::PhantomData;
use core::ptr::NonNull;

use spin::Once;

use crate::category::Category;
use crate::config::Config;
use crate::descriptor::{Traceable, TypeDescriptor};
use crate::identifier::Identifier;
use crate::registry::Registry;

struct Binding {
    /// Address of the `'static` registry the category came from.
    registry: usize,
    descriptor: TypeDescriptor,
    /// Type-erased `&'static Category<C>` for that registry's `C`.
    category: NonNull<()>,
}

// SAFETY: `category` points at a leaked, `Sync` category.
unsafe impl Send for Binding {}
unsafe impl Sync for Binding {}

/// A probe declaration point.
///
/// Binds to a category the first time it is used and reuses that binding
/// afterwards. The first registry and type to use the site win; using the
/// same site with another registry or type (e.g. inside a generic function)
/// still resolves the right category, through a registry lookup.
pub struct ProbeSite {
    name: Identifier,
    binding: Once<Binding>,
}

impl ProbeSite {
    /// Declare a site. Panics on an invalid name, at compile time when used
    /// to initialize a `static`.
    pub const fn new(name: &str) -> Self {
        assert!(Identifier::is_valid(name), "Invalid probe name");
        Self {
            name: Identifier::encode(name),
            binding: Once::new(),
        }
    }

    pub fn name(&self) -> &Identifier {
        &self.name
    }

    /// Whether the site has bound to a category yet.
    pub fn is_bound(&self) -> bool {
        self.binding.is_completed()
    }

    /// The category this site uses for values of type `T` in `registry`,
    /// registering it if needed.
    ///
    /// Call ahead of time to make a category visible to consumers before the
    /// site first executes.
    pub fn bind<C: Config, T: Traceable>(
        &self,
        registry: &'static Registry<C>,
    ) -> &'static Category<C> {
        const {
            assert!(
                T::DESCRIPTOR.size() <= C::MAX_VARIABLE_SIZE,
                "The type is too large to be traceable"
            );
        }

        let addr = registry as *const Registry<C> as usize;
        let binding = self.binding.call_once(|| {
            let category = registry.get_or_register(self.name, T::DESCRIPTOR);
            debug!(
                "Probe site '{}' bound to category {} at {:p}",
                self.name, T::DESCRIPTOR, category
            );
            Binding {
                registry: addr,
                descriptor: T::DESCRIPTOR,
                category: NonNull::from(category).cast(),
            }
        });

        if binding.registry == addr && binding.descriptor == T::DESCRIPTOR {
            // SAFETY: the binding was made from this registry, a `'static`
            // `Registry<C>` that never moves, so the category is a leaked
            // `Category<C>`.
            unsafe { binding.category.cast::<Category<C>>().as_ref() }
        } else {
            registry.get_or_register(self.name, T::DESCRIPTOR)
        }
    }

    /// [`bind`](ProbeSite::bind) with `T` inferred from `target`.
    pub fn category_for<C: Config, T: Traceable>(
        &self,
        registry: &'static Registry<C>,
        _target: &T,
    ) -> &'static Category<C> {
        self.bind::<C, T>(registry)
    }
}

/// Scope-bound handle marking one variable as the live instance of its
/// category. Dropping it restores the previous instance, if any.
///
/// Within one thread, probes of one category end in reverse order of creation,
/// which holds automatically for scoped locals. Probes on different threads
/// may end in any order; each removes only its own variable.
pub struct Probe<'a, C: Config> {
    category: &'static Category<C>,
    location: NonNull<u8>,
    _target: PhantomData<&'a ()>,
}

impl<'a, C: Config> Probe<'a, C> {
    /// Push `target` onto `category`'s live stack.
    ///
    /// Panics if `T`'s layout differs from the category's.
    ///
    /// # Safety
    ///
    /// The returned probe must be dropped before `target`'s memory is reused;
    /// it must not be leaked with `mem::forget` or a reference cycle.
    pub unsafe fn new<T: Traceable>(category: &'static Category<C>, target: &'a T) -> Self {
        const {
            assert!(
                T::DESCRIPTOR.size() <= C::MAX_VARIABLE_SIZE,
                "The type is too large to be traceable"
            );
        }
        assert_eq!(
            category.descriptor(),
            &T::DESCRIPTOR,
            "Probe type does not match its category"
        );

        let location = target.base_ptr();
        // SAFETY: `Traceable` guarantees `size()` readable bytes at the base
        // pointer while `target` is borrowed, and the caller guarantees the
        // probe is dropped (popping the location) before the borrow ends.
        unsafe { category.push(location) };
        Self {
            category,
            location,
            _target: PhantomData,
        }
    }

    /// Runs `f` with `target` traced under `category`.
    pub fn scope<T: Traceable, R>(
        category: &'static Category<C>,
        target: &'a T,
        f: impl FnOnce() -> R,
    ) -> R {
        // SAFETY: the probe is dropped at the end of this function, while
        // `target` is still borrowed.
        let _probe = unsafe { Self::new(category, target) };
        f()
    }

    pub fn category(&self) -> &'static Category<C> {
        self.category
    }
}

impl<C: Config> Drop for Probe<'_, C> {
    fn drop(&mut self) {
        self.category.pop(self.location);
    }
}
