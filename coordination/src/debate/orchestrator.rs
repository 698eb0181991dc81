//! Debate orchestration — drives a session from creation to terminal status.
//!
//! One round is proposer, then critic, then consensus builder, each invoked
//! through the tier-bound model invoker. The loop ends on the early-stop
//! marker, on the round cap, or on the session deadline. A role whose
//! fallback chain is exhausted is recorded as a degraded output and the
//! round continues; only state-machine violations fail the session.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::debate::prompts;
use crate::debate::state::{DebateSession, Phase, Role, Round, TransitionError};
use crate::invoker::{InvokeError, ModelInvoker, RoleOutput};
use crate::router::classifier::TierAssignment;
use crate::router::scorer;
use crate::router::tiers::TierTable;
use crate::store::SessionStore;

/// Session-level debate policy.
#[derive(Debug, Clone)]
pub struct DebateConfig {
    /// Hard cap on rounds per session.
    pub max_rounds: u32,
    /// Wall-clock bound on the whole session.
    pub session_timeout: Duration,
    /// Marker the consensus builder emits to stop early.
    pub early_stop_marker: String,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            session_timeout: Duration::from_secs(300),
            early_stop_marker: "FINAL_CONSENSUS".to_string(),
        }
    }
}

/// A caller's request to debate one topic.
#[derive(Debug, Clone)]
pub struct DebateRequest {
    pub topic: String,
    pub context: Option<String>,
    /// Overrides the configured round cap when set.
    pub max_rounds: Option<u32>,
}

impl DebateRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            context: None,
            max_rounds: None,
        }
    }
}

/// Result of running one debate: the terminal session plus persistence
/// status. A persistence failure never un-finalizes the session.
#[derive(Debug)]
pub struct DebateOutcome {
    pub session: DebateSession,
    pub persisted: bool,
    pub warnings: Vec<String>,
}

/// Runs debates end to end: scoring, tier assignment, the round loop, and
/// persistence of the terminal session.
pub struct DebateOrchestrator<S: SessionStore> {
    invoker: ModelInvoker,
    store: Arc<S>,
    tiers: Arc<TierTable>,
    config: DebateConfig,
}

impl<S: SessionStore> DebateOrchestrator<S> {
    pub fn new(
        invoker: ModelInvoker,
        store: Arc<S>,
        tiers: Arc<TierTable>,
        config: DebateConfig,
    ) -> Self {
        Self {
            invoker,
            store,
            tiers,
            config,
        }
    }

    /// Run one debate to a terminal status and persist it.
    pub async fn run(&self, request: DebateRequest) -> DebateOutcome {
        let mut scored_text = request.topic.clone();
        if let Some(context) = &request.context {
            scored_text.push(' ');
            scored_text.push_str(context);
        }
        let scores = scorer::score(&scored_text);
        let assignment = TierAssignment::from_scores(&scores);
        let max_rounds = request.max_rounds.unwrap_or(self.config.max_rounds).max(1);

        let mut session = DebateSession::new(
            &request.topic,
            request.context.as_deref(),
            assignment,
            max_rounds,
        );
        tracing::info!(
            session_id = %session.id,
            mean_score = scores.mean(),
            tiers = %assignment.summary(),
            max_rounds,
            "debate session created"
        );

        let deadline = Instant::now() + self.config.session_timeout;
        let mut warnings = Vec::new();

        if let Err(e) = self.drive(&mut session, deadline, &mut warnings).await {
            tracing::error!(session_id = %session.id, error = %e, "debate loop aborted");
            warnings.push(format!("debate aborted: {e}"));
            if !session.is_terminal() {
                // Terminal exactly once; ignore a second violation here.
                let _ = session.transition(Phase::Failed, &e.to_string());
            }
        }

        tracing::info!(session_id = %session.id, "{}", session.status_line());

        let persisted = match self.store.append(&session).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(session_id = %session.id, error = %e, "session not persisted");
                warnings.push(format!(
                    "session {} reached {} but was not persisted: {e}",
                    session.id, session.status
                ));
                false
            }
        };

        DebateOutcome {
            session,
            persisted,
            warnings,
        }
    }

    async fn drive(
        &self,
        session: &mut DebateSession,
        deadline: Instant,
        warnings: &mut Vec<String>,
    ) -> Result<(), TransitionError> {
        let mut prior_consensus: Option<String> = None;

        while session.rounds.len() < session.max_rounds as usize {
            if Instant::now() >= deadline {
                session.transition(Phase::TimedOut, "session deadline reached")?;
                return Ok(());
            }

            let index = session.next_round_index();
            let mut round = Round::new(index);
            tracing::info!(session_id = %session.id, round = index, "round started");

            session.transition(Phase::Proposing, "round started")?;
            let prompt = prompts::proposer_prompt(
                &session.topic,
                session.context.as_deref(),
                prior_consensus.as_deref(),
            );
            let Some(proposal) = self
                .role_output(session, Role::Proposer, &prompt, deadline, warnings)
                .await
            else {
                return self.timed_out_mid_round(session, round);
            };
            round.set_output(Role::Proposer, proposal.clone());

            session.transition(Phase::Critiquing, "proposal recorded")?;
            let prompt =
                prompts::critic_prompt(&session.topic, &proposal.text, prior_consensus.as_deref());
            let Some(critique) = self
                .role_output(session, Role::Critic, &prompt, deadline, warnings)
                .await
            else {
                return self.timed_out_mid_round(session, round);
            };
            round.set_output(Role::Critic, critique.clone());

            session.transition(Phase::BuildingConsensus, "critique recorded")?;
            let prompt = prompts::consensus_prompt(
                &session.topic,
                &proposal.text,
                &critique.text,
                &self.config.early_stop_marker,
            );
            let Some(consensus) = self
                .role_output(session, Role::Consensus, &prompt, deadline, warnings)
                .await
            else {
                return self.timed_out_mid_round(session, round);
            };
            round.set_output(Role::Consensus, consensus.clone());
            round.completed_at = Some(chrono::Utc::now());

            let cost = crate::cost::round_cost(&round, &session.tier_assignment, &self.tiers);
            session.add_cost(cost);
            session.record_round(round);
            tracing::info!(
                session_id = %session.id,
                round = index,
                cost_units = cost,
                "round completed"
            );

            if consensus.text.contains(&self.config.early_stop_marker) {
                session.transition(Phase::Finalized, "early-stop marker emitted")?;
                return Ok(());
            }
            if session.rounds.len() >= session.max_rounds as usize {
                session.transition(Phase::Finalized, "max rounds reached")?;
                return Ok(());
            }

            prior_consensus = Some(consensus.text);
        }

        // max_rounds >= 1, so the loop body always runs at least once; this
        // is unreachable in practice but keeps the signature honest.
        session.transition(Phase::Finalized, "max rounds reached")
    }

    /// Invoke one role. Fallback exhaustion degrades in place; `None` means
    /// the session deadline passed and the round must stop.
    async fn role_output(
        &self,
        session: &DebateSession,
        role: Role,
        prompt: &str,
        deadline: Instant,
        warnings: &mut Vec<String>,
    ) -> Option<RoleOutput> {
        let tier = session.tier_assignment.for_role(role);
        match self.invoker.invoke(tier, prompt, deadline).await {
            Ok(output) => Some(output),
            Err(InvokeError::DeadlineExceeded) => None,
            Err(e) => {
                tracing::warn!(
                    session_id = %session.id,
                    role = %role,
                    tier = %tier,
                    error = %e,
                    "role degraded"
                );
                warnings.push(format!("{role} degraded: {e}"));
                Some(RoleOutput::degraded())
            }
        }
    }

    /// Record whatever the round produced, then time the session out.
    fn timed_out_mid_round(
        &self,
        session: &mut DebateSession,
        round: Round,
    ) -> Result<(), TransitionError> {
        let cost = crate::cost::round_cost(&round, &session.tier_assignment, &self.tiers);
        session.add_cost(cost);
        session.record_round(round);
        session.transition(Phase::TimedOut, "session deadline reached mid-round")
    }
}
