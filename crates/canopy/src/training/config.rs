//! Tree induction configuration with builder pattern.
//!
//! [`TreeConfig`] uses the `bon` crate for builder generation; the public
//! `build()` validates the result.
//!
//! # Example
//!
//! ```
//! use canopy::training::TreeConfig;
//!
//! // All defaults
//! let config = TreeConfig::builder().build().unwrap();
//! assert_eq!(config.max_depth, None);
//!
//! // Updatable, shallow trees
//! let config = TreeConfig::builder()
//!     .max_depth(4)
//!     .updatable(true)
//!     .min_leaf_instances(2)
//!     .build()
//!     .unwrap();
//! assert!(config.updatable);
//! ```

use bon::Builder;

use super::logger::Verbosity;

// =============================================================================
// ConfigError
// =============================================================================

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A probability outside [0, 1].
    #[error("{field} must be in [0, 1], got {value}")]
    InvalidProbability { field: &'static str, value: f64 },

    /// A count that must be at least 1.
    #[error("{field} must be at least 1")]
    ZeroCount { field: &'static str },

    /// A weight floor that must be non-negative and not NaN.
    #[error("{field} must be >= 0, got {value}")]
    NegativeValue { field: &'static str, value: f64 },

    #[error("minimum_score must not be NaN")]
    NanMinimumScore,
}

// =============================================================================
// TreeConfig
// =============================================================================

/// Configuration for tree induction and update.
///
/// # Example
///
/// ```
/// use canopy::training::{TreeConfig, Verbosity};
///
/// let config = TreeConfig::builder()
///     .ordinal_test_splits(8)
///     .seed(7)
///     .verbosity(Verbosity::Info)
///     .build()
///     .unwrap();
/// assert_eq!(config.ordinal_test_splits, 8);
/// ```
#[derive(Debug, Clone, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct TreeConfig {
    // === Stopping ===
    /// Maximum depth of any node. `None` leaves depth unbounded.
    pub max_depth: Option<u32>,

    /// A split is rejected if either side gets fewer instances. Default: 0.
    #[builder(default)]
    pub min_leaf_instances: usize,

    /// Splits scoring below this become leaves. Default: 1e-14.
    #[builder(default = 1e-14)]
    pub minimum_score: f64,

    // === Attribute selection ===
    /// Probability of ignoring each attribute at each node. Default: 0.
    #[builder(default)]
    pub ignore_attribute_at_node_probability: f64,

    /// Minimum weight every label present for a categorical value must reach
    /// before that value may join an in-set. Default: 5.
    #[builder(default = 5.0)]
    pub min_categorical_attribute_value_occurrences: f64,

    // === Numeric thresholds ===
    /// Number of quantile buckets for numeric thresholds. Default: 5.
    #[builder(default = 5)]
    pub ordinal_test_splits: usize,

    /// Nodes with at most this many rows use their distinct values as
    /// thresholds instead of quantiles. Default: 10.
    #[builder(default = 10)]
    pub small_training_set_limit: usize,

    /// Reservoir capacity for quantile estimation. Default: 1000.
    #[builder(default = 1000)]
    pub reservoir_size: usize,

    // === Updates ===
    /// Keep row indices in leaves so the tree can be updated. Default: false.
    #[builder(default)]
    pub updatable: bool,

    // === Resources ===
    /// Number of threads. 0 uses rayon's global pool, 1 runs sequentially.
    #[builder(default)]
    pub n_threads: usize,

    // === Reproducibility ===
    /// Random seed. Default: 42.
    #[builder(default = 42)]
    pub seed: u64,

    // === Logging ===
    /// Verbosity level. Default: `Silent`.
    #[builder(default)]
    pub verbosity: Verbosity,
}

/// Custom finishing function that validates the config.
impl<S: tree_config_builder::IsComplete> TreeConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if:
    /// - `ignore_attribute_at_node_probability` is outside [0, 1]
    /// - `ordinal_test_splits` or `reservoir_size` is 0
    /// - `min_categorical_attribute_value_occurrences` is negative or NaN
    /// - `minimum_score` is NaN
    pub fn build(self) -> Result<TreeConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl TreeConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let p = self.ignore_attribute_at_node_probability;
        if !(0.0..=1.0).contains(&p) {
            return Err(ConfigError::InvalidProbability {
                field: "ignore_attribute_at_node_probability",
                value: p,
            });
        }
        if self.ordinal_test_splits == 0 {
            return Err(ConfigError::ZeroCount {
                field: "ordinal_test_splits",
            });
        }
        if self.reservoir_size == 0 {
            return Err(ConfigError::ZeroCount {
                field: "reservoir_size",
            });
        }
        let floor = self.min_categorical_attribute_value_occurrences;
        if floor.is_nan() || floor < 0.0 {
            return Err(ConfigError::NegativeValue {
                field: "min_categorical_attribute_value_occurrences",
                value: floor,
            });
        }
        if self.minimum_score.is_nan() {
            return Err(ConfigError::NanMinimumScore);
        }
        Ok(())
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_leaf_instances: 0,
            minimum_score: 1e-14,
            ignore_attribute_at_node_probability: 0.0,
            min_categorical_attribute_value_occurrences: 5.0,
            ordinal_test_splits: 5,
            small_training_set_limit: 10,
            reservoir_size: 1000,
            updatable: false,
            n_threads: 0,
            seed: 42,
            verbosity: Verbosity::Silent,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_builder() {
        let built = TreeConfig::builder().build().unwrap();
        let default = TreeConfig::default();
        assert_eq!(built.max_depth, default.max_depth);
        assert_eq!(built.min_leaf_instances, default.min_leaf_instances);
        assert_eq!(built.minimum_score, default.minimum_score);
        assert_eq!(built.ordinal_test_splits, default.ordinal_test_splits);
        assert_eq!(built.small_training_set_limit, default.small_training_set_limit);
        assert_eq!(built.reservoir_size, default.reservoir_size);
        assert_eq!(built.seed, default.seed);
        assert_eq!(built.verbosity, default.verbosity);
        assert!(!built.updatable);
    }

    #[test]
    fn invalid_probability() {
        let result = TreeConfig::builder()
            .ignore_attribute_at_node_probability(1.5)
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidProbability { .. })
        ));
    }

    #[test]
    fn probability_boundaries_are_valid() {
        for p in [0.0, 1.0] {
            let result = TreeConfig::builder()
                .ignore_attribute_at_node_probability(p)
                .build();
            assert!(result.is_ok());
        }
    }

    #[test]
    fn zero_splits_rejected() {
        let result = TreeConfig::builder().ordinal_test_splits(0).build();
        assert_eq!(
            result.unwrap_err(),
            ConfigError::ZeroCount {
                field: "ordinal_test_splits"
            }
        );
    }

    #[test]
    fn zero_reservoir_rejected() {
        let result = TreeConfig::builder().reservoir_size(0).build();
        assert!(matches!(result, Err(ConfigError::ZeroCount { .. })));
    }

    #[test]
    fn negative_occurrence_floor_rejected() {
        let result = TreeConfig::builder()
            .min_categorical_attribute_value_occurrences(-1.0)
            .build();
        assert!(matches!(result, Err(ConfigError::NegativeValue { .. })));
    }

    #[test]
    fn nan_minimum_score_rejected() {
        let result = TreeConfig::builder().minimum_score(f64::NAN).build();
        assert_eq!(result.unwrap_err(), ConfigError::NanMinimumScore);
    }

    #[test]
    fn error_messages() {
        let err = ConfigError::ZeroCount {
            field: "reservoir_size",
        };
        assert_eq!(err.to_string(), "reservoir_size must be at least 1");
    }
}
