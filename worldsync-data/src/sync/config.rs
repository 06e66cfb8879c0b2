//! Run-level settings for [`super::SyncOrchestrator`].

/// Countries handled per batch when none is configured.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Settings for bulk runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    batch_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl SyncConfig {
    /// Set the number of countries per batch. Zero is raised to one.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Countries per batch; never zero.
    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 1)]
    #[case(1, 1)]
    #[case(30, 30)]
    fn batch_size_is_never_zero(#[case] requested: usize, #[case] expected: usize) {
        assert_eq!(
            SyncConfig::default().with_batch_size(requested).batch_size(),
            expected
        );
    }

    #[rstest]
    fn defaults_to_fifty() {
        assert_eq!(SyncConfig::default().batch_size(), DEFAULT_BATCH_SIZE);
    }
}
