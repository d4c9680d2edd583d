//! Engine limits applied to every context of a runtime.
//!
//! Boa exposes its execution limits through `RuntimeLimits`. This module keeps
//! the host-side view of those limits so a [`Runtime`](crate::Runtime) can
//! apply the same settings to each context it creates.

use boa_engine::Context as BoaContext;

/// Limits for JavaScript execution.
///
/// A `None` field leaves the engine default in place.
///
/// # Example
///
/// ```
/// use jsbind::RuntimeConfig;
///
/// let config = RuntimeConfig::new()
///     .with_loop_iteration_limit(1_000_000)
///     .with_recursion_limit(256);
/// assert_eq!(config.loop_iteration_limit, Some(1_000_000));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Maximum number of iterations a single loop may run
    pub loop_iteration_limit: Option<u64>,
    /// Maximum call depth
    pub recursion_limit: Option<usize>,
    /// Maximum size of the engine's value stack
    pub stack_size_limit: Option<usize>,
}

impl RuntimeConfig {
    /// Creates a configuration that keeps every engine default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of iterations per loop.
    pub fn with_loop_iteration_limit(mut self, limit: u64) -> Self {
        self.loop_iteration_limit = Some(limit);
        self
    }

    /// Sets the maximum call depth.
    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = Some(limit);
        self
    }

    /// Sets the maximum value stack size.
    pub fn with_stack_size_limit(mut self, limit: usize) -> Self {
        self.stack_size_limit = Some(limit);
        self
    }

    pub(crate) fn apply(&self, boa: &mut BoaContext) {
        let limits = boa.runtime_limits_mut();
        if let Some(limit) = self.loop_iteration_limit {
            limits.set_loop_iteration_limit(limit);
        }
        if let Some(limit) = self.recursion_limit {
            limits.set_recursion_limit(limit);
        }
        if let Some(limit) = self.stack_size_limit {
            limits.set_stack_size_limit(limit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_keeps_engine_limits() {
        let config = RuntimeConfig::default();
        assert_eq!(config.loop_iteration_limit, None);
        assert_eq!(config.recursion_limit, None);
        assert_eq!(config.stack_size_limit, None);
    }

    #[test]
    fn test_builder_chaining() {
        let config = RuntimeConfig::new()
            .with_loop_iteration_limit(10)
            .with_recursion_limit(20)
            .with_stack_size_limit(30);

        assert_eq!(config.loop_iteration_limit, Some(10));
        assert_eq!(config.recursion_limit, Some(20));
        assert_eq!(config.stack_size_limit, Some(30));
    }

    #[test]
    fn test_apply_sets_engine_limits() {
        let mut boa = BoaContext::default();
        RuntimeConfig::new()
            .with_loop_iteration_limit(42)
            .with_recursion_limit(7)
            .apply(&mut boa);

        assert_eq!(boa.runtime_limits().loop_iteration_limit(), 42);
        assert_eq!(boa.runtime_limits().recursion_limit(), 7);
    }
}
