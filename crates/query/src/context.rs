//! Evaluation settings and counters.

/// Settings for an [`Evaluator`](crate::executor::Evaluator).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvalConfig {
    /// Whether completed frames are cached. The cycle guard and open
    /// components are always tracked.
    pub memoize: bool,
    /// Maximum number of nested frames before evaluation fails.
    pub max_depth: Option<usize>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            memoize: true,
            max_depth: None,
        }
    }
}

impl EvalConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Turns result caching on or off.
    pub fn with_memoize(mut self, memoize: bool) -> Self {
        self.memoize = memoize;
        self
    }

    /// Bounds the recursion depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }
}

/// Counters collected while evaluating.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EvalStats {
    /// Frames that were actually expanded.
    pub frames_expanded: usize,
    /// Frames answered from the cache.
    pub cache_hits: usize,
    /// Walks cut because they re-entered an open frame.
    pub cycle_cuts: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = EvalConfig::new();
        assert!(config.memoize);
        assert_eq!(config.max_depth, None);

        let config = EvalConfig::new().with_memoize(false).with_max_depth(8);
        assert!(!config.memoize);
        assert_eq!(config.max_depth, Some(8));
    }
}
