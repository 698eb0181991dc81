//! Debate state machine — roles, phases, rounds, and session tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::invoker::RoleOutput;
use crate::router::classifier::TierAssignment;

/// Fixed debate participant positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Opens each round with an analysis proposal.
    Proposer,
    /// Challenges the proposal.
    Critic,
    /// Merges proposal and critique into a consensus view.
    Consensus,
}

impl Role {
    /// All roles, in invocation order within a round.
    pub const ALL: [Role; 3] = [Self::Proposer, Self::Critic, Self::Consensus];
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Proposer => write!(f, "proposer"),
            Self::Critic => write!(f, "critic"),
            Self::Consensus => write!(f, "consensus"),
        }
    }
}

/// Orchestration phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Session created; tiers assigned, no round started.
    Init,
    /// Proposer is producing this round's analysis.
    Proposing,
    /// Critic is evaluating the proposal.
    Critiquing,
    /// Consensus role is merging the round.
    BuildingConsensus,
    /// Debate concluded (early stop or max rounds).
    Finalized,
    /// Session-level wall-clock bound exceeded.
    TimedOut,
    /// Unrecoverable orchestration error.
    Failed,
}

impl Phase {
    /// Whether this is a terminal phase.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finalized | Self::TimedOut | Self::Failed)
    }

    /// Valid transitions from this phase.
    pub fn valid_transitions(self) -> &'static [Phase] {
        match self {
            Self::Init => &[Self::Proposing, Self::TimedOut, Self::Failed],
            Self::Proposing => &[Self::Critiquing, Self::TimedOut, Self::Failed],
            Self::Critiquing => &[Self::BuildingConsensus, Self::TimedOut, Self::Failed],
            Self::BuildingConsensus => &[
                Self::Proposing,
                Self::Finalized,
                Self::TimedOut,
                Self::Failed,
            ],
            Self::Finalized | Self::TimedOut | Self::Failed => &[],
        }
    }

    /// Session status implied by this phase.
    pub fn status(self) -> SessionStatus {
        match self {
            Self::Finalized => SessionStatus::Finalized,
            Self::TimedOut => SessionStatus::TimedOut,
            Self::Failed => SessionStatus::Failed,
            _ => SessionStatus::InProgress,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::Proposing => write!(f, "proposing"),
            Self::Critiquing => write!(f, "critiquing"),
            Self::BuildingConsensus => write!(f, "building_consensus"),
            Self::Finalized => write!(f, "finalized"),
            Self::TimedOut => write!(f, "timed_out"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Caller-visible session status; terminal exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    InProgress,
    Finalized,
    TimedOut,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        self != Self::InProgress
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InProgress => write!(f, "in_progress"),
            Self::Finalized => write!(f, "finalized"),
            Self::TimedOut => write!(f, "timed_out"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A recorded phase transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: Phase,
    pub to: Phase,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

/// Error for invalid state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: Phase,
    pub to: Phase,
    pub reason: String,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid transition {} → {}: {}",
            self.from, self.to, self.reason
        )
    }
}

impl std::error::Error for TransitionError {}

/// One pass of proposer → critic → consensus.
///
/// Complete only when all three role outputs are populated; degraded
/// outputs (fallback exhausted) count as populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    /// 0-based sequence number, gap-free within a session.
    pub index: u32,
    pub proposer_output: Option<RoleOutput>,
    pub critic_output: Option<RoleOutput>,
    pub consensus_output: Option<RoleOutput>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Round {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            proposer_output: None,
            critic_output: None,
            consensus_output: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn output(&self, role: Role) -> Option<&RoleOutput> {
        match role {
            Role::Proposer => self.proposer_output.as_ref(),
            Role::Critic => self.critic_output.as_ref(),
            Role::Consensus => self.consensus_output.as_ref(),
        }
    }

    pub fn set_output(&mut self, role: Role, output: RoleOutput) {
        match role {
            Role::Proposer => self.proposer_output = Some(output),
            Role::Critic => self.critic_output = Some(output),
            Role::Consensus => self.consensus_output = Some(output),
        }
    }

    pub fn is_complete(&self) -> bool {
        Role::ALL.iter().all(|&role| self.output(role).is_some())
    }

    /// Sum of recorded role latencies.
    pub fn latency_ms(&self) -> u64 {
        Role::ALL
            .iter()
            .filter_map(|&role| self.output(role).map(|o| o.latency_ms))
            .sum()
    }
}

/// The full record of one debate from creation to terminal status.
///
/// Rounds are append-only: never reordered or mutated after append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateSession {
    pub id: String,
    pub topic: String,
    pub context: Option<String>,
    pub created_at: DateTime<Utc>,
    pub tier_assignment: TierAssignment,
    pub rounds: Vec<Round>,
    pub max_rounds: u32,
    pub phase: Phase,
    pub status: SessionStatus,
    pub transitions: Vec<PhaseTransition>,
    pub estimated_cost_units: f64,
    pub total_latency_ms: u64,
}

impl DebateSession {
    pub fn new(
        topic: &str,
        context: Option<&str>,
        tier_assignment: TierAssignment,
        max_rounds: u32,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            topic: topic.to_string(),
            context: context.map(String::from),
            created_at: Utc::now(),
            tier_assignment,
            rounds: Vec::new(),
            max_rounds,
            phase: Phase::Init,
            status: SessionStatus::InProgress,
            transitions: Vec::new(),
            estimated_cost_units: 0.0,
            total_latency_ms: 0,
        }
    }

    /// Transition to a new phase with a reason, recording the step.
    pub fn transition(&mut self, to: Phase, reason: &str) -> Result<(), TransitionError> {
        if !self.phase.valid_transitions().contains(&to) {
            return Err(TransitionError {
                from: self.phase,
                to,
                reason: format!(
                    "not a valid transition (allowed: {:?})",
                    self.phase.valid_transitions()
                ),
            });
        }
        self.transitions.push(PhaseTransition {
            from: self.phase,
            to,
            timestamp: Utc::now(),
            reason: reason.to_string(),
        });
        self.phase = to;
        self.status = to.status();
        Ok(())
    }

    /// Index the next appended round must carry.
    pub fn next_round_index(&self) -> u32 {
        self.rounds.len() as u32
    }

    /// Append a round and accrue its latency. Round indexes are strictly
    /// ordered from 0 with no gaps; the caller builds rounds from
    /// `next_round_index`.
    pub fn record_round(&mut self, round: Round) {
        self.total_latency_ms += round.latency_ms();
        self.rounds.push(round);
    }

    /// Accrue cost for a recorded round; the total never decreases.
    pub fn add_cost(&mut self, delta: f64) {
        self.estimated_cost_units += delta.max(0.0);
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Compact status line for logging.
    pub fn status_line(&self) -> String {
        format!(
            "[{}] {}/{} rounds | cost {:.6} | id={}",
            self.phase,
            self.rounds.len(),
            self.max_rounds,
            self.estimated_cost_units,
            self.id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::tiers::ModelTier;

    fn assignment() -> TierAssignment {
        TierAssignment {
            proposer: ModelTier::Simple,
            critic: ModelTier::Simple,
            consensus: ModelTier::Simple,
        }
    }

    fn session() -> DebateSession {
        DebateSession::new("topic", Some("context"), assignment(), 3)
    }

    fn output(text: &str) -> RoleOutput {
        RoleOutput {
            text: text.to_string(),
            token_count: 5,
            model_used: "m-simple".to_string(),
            latency_ms: 40,
        }
    }

    #[test]
    fn test_new_session() {
        let s = session();
        assert_eq!(s.phase, Phase::Init);
        assert_eq!(s.status, SessionStatus::InProgress);
        assert!(s.rounds.is_empty());
        assert_eq!(s.estimated_cost_units, 0.0);
        assert!(!s.is_terminal());
        assert!(!s.id.is_empty());
    }

    #[test]
    fn test_full_round_cycle() {
        let mut s = session();
        s.transition(Phase::Proposing, "round started").unwrap();
        s.transition(Phase::Critiquing, "proposal recorded").unwrap();
        s.transition(Phase::BuildingConsensus, "critique recorded")
            .unwrap();
        s.transition(Phase::Proposing, "next round").unwrap();
        s.transition(Phase::Critiquing, "proposal recorded").unwrap();
        s.transition(Phase::BuildingConsensus, "critique recorded")
            .unwrap();
        s.transition(Phase::Finalized, "max rounds reached").unwrap();
        assert!(s.is_terminal());
        assert_eq!(s.status, SessionStatus::Finalized);
        assert_eq!(s.transitions.len(), 7);
    }

    #[test]
    fn test_invalid_transition() {
        let mut s = session();
        let err = s.transition(Phase::Finalized, "skip").unwrap_err();
        assert_eq!(err.from, Phase::Init);
        assert_eq!(err.to, Phase::Finalized);
        assert!(err.to_string().contains("invalid transition"));
    }

    #[test]
    fn test_terminal_phase_is_sticky() {
        let mut s = session();
        s.transition(Phase::Proposing, "start").unwrap();
        s.transition(Phase::TimedOut, "deadline").unwrap();
        let err = s.transition(Phase::Proposing, "resume").unwrap_err();
        assert_eq!(err.from, Phase::TimedOut);
        assert_eq!(s.status, SessionStatus::TimedOut);
    }

    #[test]
    fn test_failed_reachable_from_any_active_phase() {
        for phase in [Phase::Init, Phase::Proposing, Phase::Critiquing, Phase::BuildingConsensus] {
            assert!(phase.valid_transitions().contains(&Phase::Failed));
            assert!(phase.valid_transitions().contains(&Phase::TimedOut));
        }
    }

    #[test]
    fn test_round_completeness() {
        let mut round = Round::new(0);
        assert!(!round.is_complete());
        round.set_output(Role::Proposer, output("proposal"));
        round.set_output(Role::Critic, output("critique"));
        assert!(!round.is_complete());
        // A degraded output still completes the round.
        round.set_output(Role::Consensus, RoleOutput::degraded());
        assert!(round.is_complete());
        assert_eq!(round.latency_ms(), 80);
    }

    #[test]
    fn test_round_indexes_are_gap_free() {
        let mut s = session();
        for i in 0..3 {
            let index = s.next_round_index();
            assert_eq!(index, i);
            s.record_round(Round::new(index));
        }
        for (i, round) in s.rounds.iter().enumerate() {
            assert_eq!(round.index as usize, i);
        }
    }

    #[test]
    fn test_cost_accrual_is_monotone() {
        let mut s = session();
        s.add_cost(0.5);
        s.add_cost(0.0);
        s.add_cost(-1.0); // clamped, never decreases
        s.add_cost(0.25);
        assert_eq!(s.estimated_cost_units, 0.75);
    }

    #[test]
    fn test_latency_accrues_on_record() {
        let mut s = session();
        let mut round = Round::new(0);
        round.set_output(Role::Proposer, output("p"));
        round.set_output(Role::Critic, output("c"));
        round.set_output(Role::Consensus, output("x"));
        s.record_round(round);
        assert_eq!(s.total_latency_ms, 120);
    }

    #[test]
    fn test_status_serde_names() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::TimedOut).unwrap(),
            "\"TIMED_OUT\""
        );
        assert_eq!(
            serde_json::to_string(&Phase::BuildingConsensus).unwrap(),
            "\"BUILDING_CONSENSUS\""
        );
        assert_eq!(
            serde_json::to_string(&Role::Proposer).unwrap(),
            "\"PROPOSER\""
        );
    }

    #[test]
    fn test_session_serde_roundtrip() {
        let mut s = session();
        s.transition(Phase::Proposing, "start").unwrap();
        let mut round = Round::new(0);
        round.set_output(Role::Proposer, output("p"));
        s.record_round(round);
        let json = serde_json::to_string(&s).unwrap();
        let parsed: DebateSession = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, s.id);
        assert_eq!(parsed.phase, Phase::Proposing);
        assert_eq!(parsed.rounds.len(), 1);
        assert_eq!(parsed.transitions.len(), 1);
    }

    #[test]
    fn test_status_line() {
        let s = session();
        let line = s.status_line();
        assert!(line.contains("[init]"));
        assert!(line.contains("0/3 rounds"));
        assert!(line.contains(&s.id));
    }

    #[test]
    fn test_display_names() {
        assert_eq!(Role::Consensus.to_string(), "consensus");
        assert_eq!(Phase::BuildingConsensus.to_string(), "building_consensus");
        assert_eq!(SessionStatus::TimedOut.to_string(), "timed_out");
    }
}
