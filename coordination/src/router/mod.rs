//! Request routing — dimension scoring and tier classification.
//!
//! Runs once per session, before any model call: score the request text
//! across seven deterministic dimensions, then bind each debate role to a
//! cost-appropriate model tier.

pub mod classifier;
pub mod scorer;
pub mod tiers;

pub use classifier::{classify, TierAssignment};
pub use scorer::{score, Dimension, DimensionScore, DimensionSet};
pub use tiers::{ModelTier, TierConfig, TierTable, DEGRADED_MODEL};
