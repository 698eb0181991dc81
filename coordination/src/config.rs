//! Engine configuration from environment variables.
//!
//! Every knob has a default suitable for local runs; `DEBATE_*` variables
//! override individual fields. Tier model/price settings live in
//! [`TierTable::from_env`](crate::router::tiers::TierTable::from_env).

use std::path::PathBuf;
use std::time::Duration;

use crate::debate::orchestrator::DebateConfig;
use crate::invoker::InvokerConfig;
use crate::router::tiers::TierTable;

/// Model endpoint connection settings.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl EndpointConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("DEBATE_ENDPOINT_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            api_key: std::env::var("DEBATE_API_KEY").ok(),
        }
    }
}

/// Full engine configuration: tiers, endpoint, invocation policy, debate
/// policy, and the session log location.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub tiers: TierTable,
    pub endpoint: EndpointConfig,
    pub invoker: InvokerConfig,
    pub debate: DebateConfig,
    pub session_log: PathBuf,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self {
            tiers: TierTable::from_env(),
            endpoint: EndpointConfig::from_env(),
            invoker: InvokerConfig {
                per_call_timeout: Duration::from_secs(env_u64("DEBATE_CALL_TIMEOUT_SECS", 60)),
                max_retries: env_u64("DEBATE_MAX_RETRIES", 2) as u32,
                backoff_base: Duration::from_millis(env_u64("DEBATE_BACKOFF_MS", 1000)),
            },
            debate: DebateConfig {
                max_rounds: env_u64("DEBATE_MAX_ROUNDS", 3) as u32,
                session_timeout: Duration::from_secs(env_u64("DEBATE_SESSION_TIMEOUT_SECS", 300)),
                early_stop_marker: std::env::var("DEBATE_EARLY_STOP_MARKER")
                    .unwrap_or_else(|_| "FINAL_CONSENSUS".to_string()),
            },
            session_log: PathBuf::from(
                std::env::var("DEBATE_SESSION_LOG")
                    .unwrap_or_else(|_| "sessions.jsonl".to_string()),
            ),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
