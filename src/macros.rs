//! Probe declaration macro.
//!
//! ```ignore
//! use varprobe::{DefaultConfig, Registry, probe};
//!
//! static PROBES: Registry<DefaultConfig> = Registry::new();
//!
//! fn control_step(setpoint: f32) {
//!     let error = setpoint - measure();
//!     probe!(&PROBES, "ctl_error", error);
//!
//!     // `error` is sampled by consumers until the end of this scope.
//!     actuate(error);
//! }
//! ```

/// Traces a variable until the end of the enclosing block.
///
/// `probe!(registry, name, variable)` declares a probe site named `name`
/// (a constant string, validated at compile time), binds it on first use to
/// the category for `variable`'s type in `registry` (a
/// `&'static Registry<C>`), and pushes `variable` as the category's live
/// instance. The handle lives in a hidden binding, dropped at the end of the
/// enclosing block, so it cannot be leaked.
///
/// Must be used in statement position. `variable` is borrowed for the rest of
/// the block; trace a `Cell` or an atomic to keep mutating it.
#[macro_export]
macro_rules! probe {
    ($registry:expr, $name:expr, $target:expr $(,)?) => {
        let _probe = {
            static SITE: $crate::ProbeSite = $crate::ProbeSite::new($name);
            let target = &$target;
            let category = SITE.category_for($registry, target);
            // SAFETY: `_probe` is a hygienic local the caller cannot name, so
            // it is dropped at the end of the enclosing block, before the
            // borrow of the target ends.
            unsafe { $crate::Probe::new(category, target) }
        };
    };
}
