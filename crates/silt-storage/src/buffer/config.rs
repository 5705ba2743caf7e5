//! Buffer pool configuration.

use silt_common::constants::{
    DEFAULT_PAGE_SIZE, DEFAULT_POOL_FRAMES, DEFAULT_REPLACER_K, MAX_PAGE_SIZE, MIN_PAGE_SIZE,
};

/// Configuration for the buffer pool.
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Number of page frames in the buffer pool.
    pub pool_size: usize,
    /// Look-back window for the LRU-K replacer.
    pub replacer_k: usize,
    /// Page size in bytes; must match the device's.
    pub page_size: usize,
}

impl BufferPoolConfig {
    /// Creates a configuration with the specified number of frames.
    pub fn new(pool_size: usize) -> Self {
        Self {
            pool_size,
            replacer_k: DEFAULT_REPLACER_K,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Sets the LRU-K look-back window.
    pub fn with_replacer_k(mut self, k: usize) -> Self {
        self.replacer_k = k;
        self
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Returns the total payload memory the pool will hold.
    pub fn memory_usage(&self) -> usize {
        self.pool_size * self.page_size
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.pool_size == 0 {
            return Err("pool_size must be > 0");
        }
        if self.replacer_k == 0 {
            return Err("replacer_k must be >= 1");
        }
        if !self.page_size.is_power_of_two() {
            return Err("page_size must be a power of 2");
        }
        if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err("page_size out of supported range");
        }
        Ok(())
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_FRAMES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = BufferPoolConfig::default();
        assert_eq!(config.pool_size, DEFAULT_POOL_FRAMES);
        assert_eq!(config.replacer_k, DEFAULT_REPLACER_K);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = BufferPoolConfig::new(16).with_replacer_k(3).with_page_size(4096);
        assert_eq!(config.pool_size, 16);
        assert_eq!(config.replacer_k, 3);
        assert_eq!(config.page_size, 4096);
        assert_eq!(config.memory_usage(), 16 * 4096);
    }

    #[test]
    fn test_validation() {
        assert!(BufferPoolConfig::new(0).validate().is_err());
        assert!(BufferPoolConfig::new(8).with_replacer_k(0).validate().is_err());
        assert!(BufferPoolConfig::new(8).with_page_size(1000).validate().is_err());
        assert!(BufferPoolConfig::new(8).with_page_size(16).validate().is_err());
    }
}
