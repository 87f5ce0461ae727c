//! # Engine Configuration
//!
//! Limits for subscriptions and filter compilation.

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum rooms a single connection may join
    pub max_rooms_per_connection: usize,

    /// Maximum nesting depth of a filter expression
    pub max_filter_depth: usize,

    /// Maximum number of leaf conditions in one filter
    pub max_conditions: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_rooms_per_connection: 100,
            max_filter_depth: 32,
            max_conditions: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_rooms_per_connection, 100);
        assert_eq!(config.max_filter_depth, 32);
        assert_eq!(config.max_conditions, 256);
    }
}
