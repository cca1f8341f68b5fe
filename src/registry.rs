//! Category registry.
//!
//! Holds every [`Category`] of one embedding application, newest first. The
//! order is stable: registering appends at the head, unregistering removes
//! one entry and keeps the relative order of the rest. Queries are linear
//! scans; the number of categories and the query rate are both small.
//!
//! # Lifecycle
//!
//! Categories are added during startup or on the first execution of each probe
//! site, and normally stay registered until the process exits. A category
//! removed with [`Registry::unregister`] is only unlinked: its memory lives on,
//! so probes still holding it stay valid.

use alloc::boxed::Box;
use alloc::string::ToString;
use alloc::vec::Vec;
use core::fmt;

use spin::RwLock;

use crate::category::Category;
use crate::config::Config;
use crate::descriptor::TypeDescriptor;
use crate::identifier::Identifier;

/// Summary of one registered category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryInfo {
    /// Position in registry order.
    pub index: usize,
    pub name: Identifier,
    pub descriptor: TypeDescriptor,
    /// Number of live variables.
    pub depth: usize,
}

impl fmt::Display for CategoryInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>3} {:<36} {:<12} depth={}",
            self.index,
            self.name,
            self.descriptor.to_string(),
            self.depth
        )
    }
}

/// Collection of all categories, newest first.
pub struct Registry<C: Config> {
    /// Oldest first; iterated in reverse.
    entries: RwLock<Vec<&'static Category<C>>>,
}

impl<C: Config> Registry<C> {
    /// Create an empty registry.
    pub const fn new() -> Self {
        const {
            assert!(C::MAX_VARIABLE_SIZE > 0, "MAX_VARIABLE_SIZE must be positive");
            assert!(
                C::MAX_COEXISTENT_PROBES > 0,
                "MAX_COEXISTENT_PROBES must be positive"
            );
        }
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Creates a new category and links it at the head, even if one with the
    /// same name and type already exists.
    ///
    /// Panics if `descriptor` is larger than `C::MAX_VARIABLE_SIZE`.
    pub fn register(&self, name: Identifier, descriptor: TypeDescriptor) -> &'static Category<C> {
        let category = Self::allocate(name, descriptor);
        let mut entries = self.entries.write();
        entries.push(category);
        info!(
            "Registered probe category '{}' ({}), {} total",
            name,
            descriptor,
            entries.len()
        );
        category
    }

    /// Returns the category with this name and type, registering it first if
    /// there is none.
    pub fn get_or_register(
        &self,
        name: Identifier,
        descriptor: TypeDescriptor,
    ) -> &'static Category<C> {
        if let Some(category) = self.find(&name, &descriptor) {
            return category;
        }

        let mut entries = self.entries.write();
        // Another context may have registered it since the read above.
        if let Some(category) = entries
            .iter()
            .rev()
            .find(|c| c.name() == &name && c.descriptor() == &descriptor)
        {
            return category;
        }
        let category = Self::allocate(name, descriptor);
        entries.push(category);
        info!(
            "Registered probe category '{}' ({}), {} total",
            name,
            descriptor,
            entries.len()
        );
        category
    }

    fn allocate(name: Identifier, descriptor: TypeDescriptor) -> &'static Category<C> {
        Box::leak(Box::new(Category::new(name, descriptor)))
    }

    /// Unlinks `category`. Returns false if it was not registered here.
    pub fn unregister(&self, category: &Category<C>) -> bool {
        let mut entries = self.entries.write();
        match entries.iter().position(|c| core::ptr::eq(*c, category)) {
            Some(pos) => {
                entries.remove(pos);
                info!(
                    "Unregistered probe category '{}' ({}), {} left",
                    category.name(),
                    category.descriptor(),
                    entries.len()
                );
                true
            }
            None => {
                warn!(
                    "Probe category '{}' is not in this registry",
                    category.name()
                );
                false
            }
        }
    }

    /// The category at `index` in registry order.
    pub fn by_index(&self, index: usize) -> Option<&'static Category<C>> {
        self.entries.read().iter().rev().nth(index).copied()
    }

    /// The first category in registry order named `name`. If several types
    /// share the name, only the newest is reachable this way.
    pub fn by_name(&self, name: &Identifier) -> Option<&'static Category<C>> {
        self.entries
            .read()
            .iter()
            .rev()
            .find(|c| c.name() == name)
            .copied()
    }

    /// The category with this name and type.
    pub fn find(
        &self,
        name: &Identifier,
        descriptor: &TypeDescriptor,
    ) -> Option<&'static Category<C>> {
        self.entries
            .read()
            .iter()
            .rev()
            .find(|c| c.name() == name && c.descriptor() == descriptor)
            .copied()
    }

    /// Number of registered categories.
    pub fn count(&self) -> usize {
        self.entries.read().len()
    }

    /// The first name shared by two distinct categories, i.e. the same name
    /// used with different types.
    ///
    /// Quadratic in the number of categories; meant for debug assertions,
    /// not hot paths.
    pub fn first_duplicate_name(&self) -> Option<Identifier> {
        let entries = self.entries.read();
        for outer in entries.iter().rev() {
            for inner in entries.iter().rev() {
                if !core::ptr::eq(*outer, *inner) && outer.name() == inner.name() {
                    warn!(
                        "Probe name '{}' is used by {} and {}",
                        inner.name(),
                        outer.descriptor(),
                        inner.descriptor()
                    );
                    return Some(*inner.name());
                }
            }
        }
        None
    }

    /// Snapshot of all categories in registry order.
    pub fn categories(&self) -> Vec<&'static Category<C>> {
        self.entries.read().iter().rev().copied().collect()
    }

    /// Summary of all categories in registry order.
    pub fn list(&self) -> Vec<CategoryInfo> {
        self.categories()
            .into_iter()
            .enumerate()
            .map(|(index, c)| CategoryInfo {
                index,
                name: *c.name(),
                descriptor: *c.descriptor(),
                depth: c.depth(),
            })
            .collect()
    }
}

impl<C: Config> Default for Registry<C> {
    fn default() -> Self {
        Self::new()
    }
}
