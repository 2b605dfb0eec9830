use crate::render::Numbering;

/// Solutions printed for an ad-hoc query when no limit is given
pub const DEFAULT_LIMIT: usize = 10;

/// Settings for running example blocks and ad-hoc queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerConfig {
    /// How unbound variables are numbered when solutions are rendered
    pub numbering: Numbering,
    /// Stop at the first failing block
    pub fail_fast: bool,
    /// Maximum solutions pulled for a query without its own count
    pub limit: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            numbering: Numbering::default(),
            fail_fast: false,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl RunnerConfig {
    /// Create the default configuration (shared numbering, run every block)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the numbering mode
    #[must_use]
    pub fn with_numbering(mut self, numbering: Numbering) -> Self {
        self.numbering = numbering;
        self
    }

    /// Sets whether to stop at the first failing block
    #[must_use]
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Sets the solution limit for ad-hoc queries
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let config = RunnerConfig::new();
        assert_eq!(config.numbering, Numbering::Shared);
        assert!(!config.fail_fast);
        assert_eq!(config.limit, DEFAULT_LIMIT);

        let config = config
            .with_numbering(Numbering::PerVariable)
            .with_fail_fast(true)
            .with_limit(3);
        assert_eq!(config.numbering, Numbering::PerVariable);
        assert!(config.fail_fast);
        assert_eq!(config.limit, 3);
    }
}
