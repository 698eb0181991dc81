//! Cost estimation over role outputs, rounds, and stored sessions.
//!
//! Cost for an output is `token_count * price_per_million / 1_000_000`,
//! priced by the model that actually served the call. Degraded outputs
//! price at zero.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::debate::state::{DebateSession, Role, Round};
use crate::router::classifier::TierAssignment;
use crate::router::tiers::{ModelTier, TierTable};
use crate::store::{SessionStore, StoreError};

/// Cost of one role output in configured cost units.
pub fn output_cost(
    output: &crate::invoker::RoleOutput,
    assigned: ModelTier,
    tiers: &TierTable,
) -> f64 {
    let price = tiers.price_for_model(&output.model_used, assigned);
    output.token_count as f64 * price / 1_000_000.0
}

/// Cost of one round: sum over whatever role outputs it holds.
pub fn round_cost(round: &Round, assignment: &TierAssignment, tiers: &TierTable) -> f64 {
    Role::ALL
        .iter()
        .filter_map(|&role| {
            round
                .output(role)
                .map(|out| output_cost(out, assignment.for_role(role), tiers))
        })
        .sum()
}

/// Recompute a session's total cost from its recorded rounds.
pub fn session_cost(session: &DebateSession, tiers: &TierTable) -> f64 {
    session
        .rounds
        .iter()
        .map(|round| round_cost(round, &session.tier_assignment, tiers))
        .sum()
}

/// Aggregate view over every stored session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostSummary {
    pub sessions: u64,
    pub total_cost_units: f64,
    pub average_cost_units: f64,
    pub average_latency_ms: f64,
    /// Role-assignment counts per tier, across all sessions.
    pub tier_usage: BTreeMap<ModelTier, u64>,
}

/// Summarizes spend across the session log. Reads only what the store
/// returns; aggregation never mutates stored sessions.
pub struct CostAggregator {
    tiers: Arc<TierTable>,
}

impl CostAggregator {
    pub fn new(tiers: Arc<TierTable>) -> Self {
        Self { tiers }
    }

    pub async fn summarize<S: SessionStore + ?Sized>(
        &self,
        store: &S,
    ) -> Result<CostSummary, StoreError> {
        let sessions = store.list().await?;
        let count = sessions.len() as u64;

        let mut total_cost = 0.0;
        let mut total_latency = 0u64;
        let mut tier_usage: BTreeMap<ModelTier, u64> = BTreeMap::new();
        for session in &sessions {
            total_cost += session_cost(session, &self.tiers);
            total_latency += session.total_latency_ms;
            for role in Role::ALL {
                *tier_usage
                    .entry(session.tier_assignment.for_role(role))
                    .or_insert(0) += 1;
            }
        }

        Ok(CostSummary {
            sessions: count,
            total_cost_units: total_cost,
            average_cost_units: if count == 0 { 0.0 } else { total_cost / count as f64 },
            average_latency_ms: if count == 0 {
                0.0
            } else {
                total_latency as f64 / count as f64
            },
            tier_usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoker::test_support::test_tiers;
    use crate::invoker::RoleOutput;
    use crate::store::MemorySessionStore;

    fn assignment(tier: ModelTier) -> TierAssignment {
        TierAssignment {
            proposer: tier,
            critic: tier,
            consensus: tier,
        }
    }

    fn output(model: &str, tokens: u32) -> RoleOutput {
        RoleOutput {
            text: "text".to_string(),
            token_count: tokens,
            model_used: model.to_string(),
            latency_ms: 100,
        }
    }

    fn session_with_round(tier: ModelTier, tokens: u32, model: &str) -> DebateSession {
        let mut session = DebateSession::new("topic", None, assignment(tier), 3);
        let mut round = Round::new(0);
        for role in Role::ALL {
            round.set_output(role, output(model, tokens));
        }
        // record_round accrues the 300ms of role latency itself.
        session.record_round(round);
        session
    }

    #[test]
    fn test_session_latency_counted_once() {
        // Three roles at 100ms each; record_round is the only accrual point.
        let session = session_with_round(ModelTier::Simple, 100, "m-simple");
        assert_eq!(session.total_latency_ms, 300);
    }

    #[test]
    fn test_output_cost_exact_formula() {
        let tiers = test_tiers();
        // 1000 tokens at 2.0 per million.
        let cost = output_cost(&output("m-medium", 1000), ModelTier::Medium, &tiers);
        assert!((cost - 0.002).abs() < 1e-12);
    }

    #[test]
    fn test_degraded_output_costs_nothing() {
        let tiers = test_tiers();
        let cost = output_cost(&RoleOutput::degraded(), ModelTier::Reasoning, &tiers);
        assert_eq!(cost, 0.0);
    }

    #[test]
    fn test_fallback_model_priced_by_assigned_tier() {
        let tiers = test_tiers();
        // m-medium-fb is not a primary; it prices at the assigned tier's rate.
        let cost = output_cost(&output("m-medium-fb", 1_000_000), ModelTier::Medium, &tiers);
        assert!((cost - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_round_cost_sums_roles_and_skips_missing() {
        let tiers = test_tiers();
        let mut round = Round::new(0);
        round.set_output(Role::Proposer, output("m-simple", 500_000));
        round.set_output(Role::Consensus, output("m-simple", 500_000));
        let cost = round_cost(&round, &assignment(ModelTier::Simple), &tiers);
        // Two outputs at 0.5/M over half a million tokens each.
        assert!((cost - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_session_cost_over_rounds() {
        let tiers = test_tiers();
        let session = session_with_round(ModelTier::Complex, 1_000_000, "m-complex");
        // 3 roles * 1M tokens * 8.0/M.
        assert!((session_cost(&session, &tiers) - 24.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_summarize_empty_store() {
        let store = MemorySessionStore::new();
        let agg = CostAggregator::new(Arc::new(test_tiers()));
        let summary = agg.summarize(&store).await.unwrap();
        assert_eq!(summary.sessions, 0);
        assert_eq!(summary.total_cost_units, 0.0);
        assert_eq!(summary.average_cost_units, 0.0);
        assert!(summary.tier_usage.is_empty());
    }

    #[tokio::test]
    async fn test_summarize_aggregates_sessions() {
        let store = MemorySessionStore::new();
        store
            .append(&session_with_round(ModelTier::Simple, 1_000_000, "m-simple"))
            .await
            .unwrap();
        store
            .append(&session_with_round(ModelTier::Medium, 1_000_000, "m-medium"))
            .await
            .unwrap();

        let agg = CostAggregator::new(Arc::new(test_tiers()));
        let summary = agg.summarize(&store).await.unwrap();
        assert_eq!(summary.sessions, 2);
        // 3 * 0.5 + 3 * 2.0
        assert!((summary.total_cost_units - 7.5).abs() < 1e-9);
        assert!((summary.average_cost_units - 3.75).abs() < 1e-9);
        assert!((summary.average_latency_ms - 300.0).abs() < 1e-9);
        assert_eq!(summary.tier_usage[&ModelTier::Simple], 3);
        assert_eq!(summary.tier_usage[&ModelTier::Medium], 3);
    }

    #[tokio::test]
    async fn test_summarize_is_idempotent() {
        let store = MemorySessionStore::new();
        store
            .append(&session_with_round(ModelTier::Simple, 100, "m-simple"))
            .await
            .unwrap();
        let agg = CostAggregator::new(Arc::new(test_tiers()));
        let first = agg.summarize(&store).await.unwrap();
        let second = agg.summarize(&store).await.unwrap();
        assert_eq!(first.sessions, second.sessions);
        assert_eq!(first.total_cost_units, second.total_cost_units);
    }
}
