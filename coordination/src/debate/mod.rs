//! Multi-role debate: state machine, role prompts, and orchestration.

pub mod orchestrator;
pub mod prompts;
pub mod state;

pub use orchestrator::{DebateConfig, DebateOrchestrator, DebateOutcome, DebateRequest};
pub use state::{DebateSession, Phase, PhaseTransition, Role, Round, SessionStatus, TransitionError};
