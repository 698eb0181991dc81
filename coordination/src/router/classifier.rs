//! Tier classification — mean dimension score to model tier, per role.

use serde::{Deserialize, Serialize};

use super::scorer::DimensionSet;
use super::tiers::ModelTier;
use crate::debate::state::Role;

/// Classify a mean dimension score into a model tier.
///
/// Boundaries are inclusive on the lower bound and exclusive on the upper,
/// with the top tier unbounded above.
pub fn classify(mean: f64) -> ModelTier {
    if mean < 0.3 {
        ModelTier::Simple
    } else if mean < 0.6 {
        ModelTier::Medium
    } else if mean < 0.85 {
        ModelTier::Complex
    } else {
        ModelTier::Reasoning
    }
}

/// Per-role tier assignment for one session.
///
/// Fixed at session creation from the dimension scores of the topic plus
/// context; it never changes afterwards, even when a fallback model is
/// substituted mid-session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierAssignment {
    pub proposer: ModelTier,
    pub critic: ModelTier,
    pub consensus: ModelTier,
}

impl TierAssignment {
    /// Assign each role independently from the session's dimension scores.
    pub fn from_scores(scores: &DimensionSet) -> Self {
        let mean = scores.mean();
        Self {
            proposer: classify(mean),
            critic: classify(mean),
            consensus: classify(mean),
        }
    }

    /// Tier assigned to a role.
    pub fn for_role(&self, role: Role) -> ModelTier {
        match role {
            Role::Proposer => self.proposer,
            Role::Critic => self.critic,
            Role::Consensus => self.consensus,
        }
    }

    /// Compact summary for logging.
    pub fn summary(&self) -> String {
        format!(
            "proposer={} critic={} consensus={}",
            self.proposer, self.critic, self.consensus
        )
    }
}
