/// Optional passes run by [`crate::analysis::cfg::ControlFlowGraphBuilder`].
///
/// Block delimitation and connection always run. Stack simulation and simplification are
/// opt-in; both are off by default.
///
/// # Examples
///
/// ```rust,no_run
/// use cilflow::analysis::cfg::CfgOptions;
///
/// let options = CfgOptions::default().with_stack_data(true);
/// assert!(options.compute_stack_data);
/// assert!(!options.simplify);
///
/// assert_eq!(CfgOptions::full(), options.with_simplification(true));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CfgOptions {
    /// Simulate the evaluation stack and record the height before and after every reachable
    /// instruction
    pub compute_stack_data: bool,
    /// Fold single-entry fallthrough blocks into their only predecessor
    pub simplify: bool,
}

impl CfgOptions {
    /// Options with every optional pass enabled.
    #[must_use]
    pub const fn full() -> Self {
        CfgOptions {
            compute_stack_data: true,
            simplify: true,
        }
    }

    /// Enable or disable stack simulation.
    #[must_use]
    pub const fn with_stack_data(mut self, enabled: bool) -> Self {
        self.compute_stack_data = enabled;
        self
    }

    /// Enable or disable block simplification.
    #[must_use]
    pub const fn with_simplification(mut self, enabled: bool) -> Self {
        self.simplify = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_off() {
        let options = CfgOptions::default();
        assert!(!options.compute_stack_data);
        assert!(!options.simplify);
    }

    #[test]
    fn builders() {
        let options = CfgOptions::full().with_simplification(false);
        assert!(options.compute_stack_data);
        assert!(!options.simplify);
    }
}
