//! Weights, limits, and feature flags for the scoring engine.

use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

/// Relative weight of each component in the base score. The defaults sum
/// to one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentWeights {
    pub engagement: f64,
    pub meeting: f64,
    pub recency: f64,
    pub frequency: f64,
    pub initiation: f64,
    pub response_time: f64,
}

impl Default for ComponentWeights {
    fn default() -> Self {
        Self {
            engagement: 0.25,
            meeting: 0.25,
            recency: 0.18,
            frequency: 0.14,
            initiation: 0.10,
            response_time: 0.08,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub weights: ComponentWeights,
    /// Rows returned when the caller passes no limit.
    pub default_limit: usize,
    /// Hard cap on a saved VIP selection.
    pub max_selection: usize,
    pub refinements_enabled: bool,
    pub domain_scoring_enabled: bool,
    pub identity_enabled: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ComponentWeights::default(),
            default_limit: 50,
            max_selection: 20,
            refinements_enabled: true,
            domain_scoring_enabled: false,
            identity_enabled: false,
        }
    }
}

impl From<&AppConfig> for ScoringConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            refinements_enabled: config.refinements_enabled,
            domain_scoring_enabled: config.domain_scoring_enabled,
            identity_enabled: config.identity_enabled,
            ..Self::default()
        }
    }
}
