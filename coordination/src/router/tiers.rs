//! Model tier definitions and the immutable tier table.
//!
//! The table is constructed once at process start and shared read-only
//! across all sessions. Pricing is configuration, never a baked-in constant.

use serde::{Deserialize, Serialize};

/// Model-used marker recorded when the fallback chain is exhausted.
pub const DEGRADED_MODEL: &str = "none";

/// Named model class a request can be routed to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelTier {
    /// Cheap, fast model for low-signal requests.
    Simple,
    /// Mid-range model for routine analysis.
    Medium,
    /// Strong model for dense multi-signal requests.
    Complex,
    /// Deep-reasoning model for saturated requests.
    Reasoning,
}

impl ModelTier {
    /// All tiers, cheapest first.
    pub const ALL: [ModelTier; 4] = [
        Self::Simple,
        Self::Medium,
        Self::Complex,
        Self::Reasoning,
    ];

    /// Environment-variable segment for this tier (e.g. `SIMPLE`).
    pub fn env_key(self) -> &'static str {
        match self {
            Self::Simple => "SIMPLE",
            Self::Medium => "MEDIUM",
            Self::Complex => "COMPLEX",
            Self::Reasoning => "REASONING",
        }
    }
}

impl std::fmt::Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simple => write!(f, "simple"),
            Self::Medium => write!(f, "medium"),
            Self::Complex => write!(f, "complex"),
            Self::Reasoning => write!(f, "reasoning"),
        }
    }
}

/// Configuration for a single tier: bound model, token budget, pricing,
/// and the fallback model substituted when the primary fails after retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierConfig {
    pub tier: ModelTier,
    pub model_id: String,
    pub max_output_tokens: u32,
    pub price_per_million_tokens: f64,
    pub fallback_model_id: Option<String>,
}

/// Immutable table of the four tier configurations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierTable {
    pub simple: TierConfig,
    pub medium: TierConfig,
    pub complex: TierConfig,
    pub reasoning: TierConfig,
}

impl TierTable {
    /// Get the configuration bound to a tier.
    pub fn get(&self, tier: ModelTier) -> &TierConfig {
        match tier {
            ModelTier::Simple => &self.simple,
            ModelTier::Medium => &self.medium,
            ModelTier::Complex => &self.complex,
            ModelTier::Reasoning => &self.reasoning,
        }
    }

    /// Price per million tokens for a recorded model id.
    ///
    /// Resolves against tier primaries first. A model id that is no tier's
    /// primary (a fallback id) is billed at the invoking role's assigned
    /// tier price. Degraded outputs cost nothing.
    pub fn price_for_model(&self, model_id: &str, assigned: ModelTier) -> f64 {
        if model_id == DEGRADED_MODEL {
            return 0.0;
        }
        for tier in ModelTier::ALL {
            let cfg = self.get(tier);
            if cfg.model_id == model_id {
                return cfg.price_per_million_tokens;
            }
        }
        self.get(assigned).price_per_million_tokens
    }

    /// Load the table from `DEBATE_<TIER>_{MODEL,MAX_TOKENS,PRICE,FALLBACK}`
    /// environment variables, with built-in defaults.
    pub fn from_env() -> Self {
        Self {
            simple: tier_from_env(ModelTier::Simple, "gemini-2.0-flash-lite", 1024, 0.30, "gpt-4o-mini"),
            medium: tier_from_env(ModelTier::Medium, "gpt-4o-mini", 2048, 0.60, "gemini-2.0-flash"),
            complex: tier_from_env(ModelTier::Complex, "claude-sonnet-4-20250514", 4096, 3.00, "gpt-4o"),
            reasoning: tier_from_env(ModelTier::Reasoning, "o1", 8192, 15.00, "claude-sonnet-4-20250514"),
        }
    }
}

impl Default for TierTable {
    fn default() -> Self {
        Self::from_env()
    }
}

fn tier_from_env(
    tier: ModelTier,
    model: &str,
    max_tokens: u32,
    price: f64,
    fallback: &str,
) -> TierConfig {
    let key = tier.env_key();
    TierConfig {
        tier,
        model_id: std::env::var(format!("DEBATE_{}_MODEL", key))
            .unwrap_or_else(|_| model.to_string()),
        max_output_tokens: std::env::var(format!("DEBATE_{}_MAX_TOKENS", key))
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(max_tokens),
        price_per_million_tokens: std::env::var(format!("DEBATE_{}_PRICE", key))
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(price),
        fallback_model_id: std::env::var(format!("DEBATE_{}_FALLBACK", key))
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| Some(fallback.to_string())),
    }
}
