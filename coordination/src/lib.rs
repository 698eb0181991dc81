//! Tiered multi-role debate engine for trading analysis requests.
//!
//! A request is scored across seven deterministic complexity dimensions and
//! routed to a model tier. Three fixed roles (proposer, critic, consensus
//! builder) then debate the topic in bounded rounds, with per-call retries,
//! fallback model substitution, and a session-level deadline. Terminal
//! sessions land in an append-only store that feeds cost aggregation.

pub mod config;
pub mod cost;
pub mod debate;
pub mod invoker;
pub mod router;
pub mod store;

pub use config::{EndpointConfig, EngineConfig};
pub use cost::{CostAggregator, CostSummary};
pub use debate::{
    DebateConfig, DebateOrchestrator, DebateOutcome, DebateRequest, DebateSession, Phase, Role,
    Round, SessionStatus,
};
pub use invoker::{
    Completion, HttpModelClient, InvokeError, InvokerConfig, ModelClient, ModelInvoker, RoleOutput,
};
pub use router::{
    classify, score, Dimension, DimensionSet, ModelTier, TierAssignment, TierConfig, TierTable,
};
pub use store::{JsonlSessionStore, MemorySessionStore, SessionStore, StoreError};
