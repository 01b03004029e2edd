//! Validation for user-saved VIP selections.

use std::collections::HashSet;

use thiserror::Error;

use crate::domain::ContactHash;
use crate::scoring::ScoringConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("at least one contact must be selected")]
    Empty,
    #[error("at most {max} contacts can be selected, got {found}")]
    TooMany { max: usize, found: usize },
}

/// Size bounds checked before any persistence happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionPolicy {
    pub max_selection: usize,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self { max_selection: 20 }
    }
}

impl From<&ScoringConfig> for SelectionPolicy {
    fn from(config: &ScoringConfig) -> Self {
        Self {
            max_selection: config.max_selection,
        }
    }
}

impl SelectionPolicy {
    /// Drops duplicates while keeping first-seen order, then checks the
    /// size bounds against the deduplicated list.
    pub fn validate(&self, hashes: &[ContactHash]) -> Result<Vec<ContactHash>, SelectionError> {
        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        for hash in hashes {
            if seen.insert(hash) {
                unique.push(hash.clone());
            }
        }
        if unique.is_empty() {
            return Err(SelectionError::Empty);
        }
        if unique.len() > self.max_selection {
            return Err(SelectionError::TooMany {
                max: self.max_selection,
                found: unique.len(),
            });
        }
        Ok(unique)
    }
}
