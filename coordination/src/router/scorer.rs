//! Dimension scoring — seven deterministic complexity signals from text.
//!
//! Each evaluator is an independent, side-effect-free rule over the request
//! text. Raw counts are normalized into [0,1] and clamped; an evaluator that
//! finds no signal returns 0.0 rather than failing.

use serde::{Deserialize, Serialize};

/// One of the seven rule-based complexity signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    TokenCount,
    CodeBlocks,
    MathematicalOperations,
    TechnicalIndicators,
    ReasoningDepth,
    RiskAnalysis,
    MultiStepLogic,
}

impl Dimension {
    /// All seven dimensions, in scoring order.
    pub const ALL: [Dimension; 7] = [
        Self::TokenCount,
        Self::CodeBlocks,
        Self::MathematicalOperations,
        Self::TechnicalIndicators,
        Self::ReasoningDepth,
        Self::RiskAnalysis,
        Self::MultiStepLogic,
    ];
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TokenCount => write!(f, "token_count"),
            Self::CodeBlocks => write!(f, "code_blocks"),
            Self::MathematicalOperations => write!(f, "mathematical_operations"),
            Self::TechnicalIndicators => write!(f, "technical_indicators"),
            Self::ReasoningDepth => write!(f, "reasoning_depth"),
            Self::RiskAnalysis => write!(f, "risk_analysis"),
            Self::MultiStepLogic => write!(f, "multi_step_logic"),
        }
    }
}

/// A normalized signal score for one dimension.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DimensionScore {
    pub name: Dimension,
    pub value: f64,
}

/// Exactly seven scores, one per dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionSet {
    scores: Vec<DimensionScore>,
}

impl DimensionSet {
    pub fn scores(&self) -> &[DimensionScore] {
        &self.scores
    }

    /// Value for a named dimension.
    pub fn get(&self, name: Dimension) -> f64 {
        self.scores
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.value)
            .unwrap_or(0.0)
    }

    /// Arithmetic mean over all seven dimensions.
    pub fn mean(&self) -> f64 {
        if self.scores.is_empty() {
            return 0.0;
        }
        self.scores.iter().map(|s| s.value).sum::<f64>() / self.scores.len() as f64
    }
}

/// Score a request text across all seven dimensions.
///
/// Deterministic: identical input yields identical scores on every call.
pub fn score(text: &str) -> DimensionSet {
    DimensionSet {
        scores: Dimension::ALL
            .iter()
            .map(|&name| DimensionScore {
                name,
                value: evaluate(name, text),
            })
            .collect(),
    }
}

/// Named technical indicators recognized in trading requests.
const INDICATOR_TERMS: &[&str] = &[
    "rsi", "macd", "ema", "sma", "bollinger", "atr", "vwap", "stochastic", "obv", "adx",
    "ichimoku", "fibonacci",
];

const STAT_TERMS: &[&str] = &[
    "sum", "mean", "average", "median", "stddev", "variance", "percentage", "ratio",
    "correlation",
];

const REASONING_TERMS: &[&str] = &[
    "first", "second", "third", "then", "therefore", "because", "hence", "thus", "analyze",
    "evaluate", "consider", "step",
];

const RISK_TERMS: &[&str] = &[
    "risk", "drawdown", "exposure", "hedge", "volatility", "liquidation", "margin",
    "downside", "leverage", "var",
];

const CONNECTIVE_TERMS: &[&str] = &[
    "if", "then", "else", "when", "unless", "after", "before", "next", "finally",
];

const MATH_OPERATORS: &[char] = &['+', '-', '*', '/', '%', '=', '^', '<', '>'];

fn evaluate(name: Dimension, text: &str) -> f64 {
    if text.trim().is_empty() {
        return 0.0;
    }
    let lower = text.to_lowercase();

    let value = match name {
        Dimension::TokenCount => lower.split_whitespace().count() as f64 / 400.0,
        Dimension::CodeBlocks => (lower.matches("```").count() / 2) as f64 / 3.0,
        Dimension::MathematicalOperations => {
            let operators = lower.chars().filter(|c| MATH_OPERATORS.contains(c)).count();
            let words = count_terms(&lower, STAT_TERMS);
            (operators + words) as f64 / 20.0
        }
        Dimension::TechnicalIndicators => distinct_terms(&lower, INDICATOR_TERMS) as f64 / 5.0,
        Dimension::ReasoningDepth => count_terms(&lower, REASONING_TERMS) as f64 / 8.0,
        Dimension::RiskAnalysis => {
            let mut hits = count_terms(&lower, RISK_TERMS);
            hits += lower.matches("stop loss").count() + lower.matches("stop-loss").count();
            hits as f64 / 6.0
        }
        Dimension::MultiStepLogic => count_terms(&lower, CONNECTIVE_TERMS) as f64 / 10.0,
    };

    value.clamp(0.0, 1.0)
}

/// Count word-token occurrences of any term; whole tokens only, so
/// "shift" never matches "if".
fn count_terms(lower: &str, terms: &[&str]) -> usize {
    lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty() && terms.contains(t))
        .count()
}

/// Count distinct terms that appear at least once as a word token.
fn distinct_terms(lower: &str, terms: &[&str]) -> usize {
    terms
        .iter()
        .filter(|term| {
            lower
                .split(|c: char| !c.is_alphanumeric())
                .any(|t| t == **term)
        })
        .count()
}

/// Text engineered to saturate all seven evaluators.
#[cfg(test)]
pub(crate) fn saturated_text() -> String {
    let mut text = String::new();
    for _ in 0..3 {
        text.push_str("```\nlet edge = a + b * c / d - e % f;\n```\n");
    }
    for _ in 0..12 {
        text.push_str(
            "First analyze the rsi and macd, then evaluate ema sma bollinger atr vwap \
             signals; if volatility rises then hedge the exposure because drawdown risk \
             and margin liquidation leverage downside grow, therefore consider each step \
             next when unless after before finally else; compute sum mean average stddev \
             variance ratio correlation percentage = 1 + 2 * 3. ",
        );
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_scores_in_unit_range() {
        let inputs = [
            "",
            "buy",
            "Should I rebalance into bonds?",
            "``` a+b ``` rsi macd risk risk risk if then else",
            &saturated_text(),
        ];
        for input in inputs {
            let set = score(input);
            assert_eq!(set.scores().len(), 7);
            for s in set.scores() {
                assert!(
                    (0.0..=1.0).contains(&s.value),
                    "{} out of range for {:?}: {}",
                    s.name,
                    input,
                    s.value
                );
            }
        }
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let text = saturated_text();
        let a = score(&text);
        let b = score(&text);
        for (x, y) in a.scores().iter().zip(b.scores()) {
            assert_eq!(x.name, y.name);
            assert_eq!(x.value, y.value);
        }
    }

    #[test]
    fn test_empty_text_scores_zero() {
        let set = score("");
        for s in set.scores() {
            assert_eq!(s.value, 0.0, "{} should be 0 for empty text", s.name);
        }
        assert_eq!(set.mean(), 0.0);
    }

    #[test]
    fn test_short_low_signal_text() {
        let set = score("Is gold up today?");
        assert!(set.mean() < 0.3, "mean {} should be low", set.mean());
        assert_eq!(set.get(Dimension::CodeBlocks), 0.0);
        assert_eq!(set.get(Dimension::TechnicalIndicators), 0.0);
    }

    #[test]
    fn test_saturated_text_hits_ceiling() {
        let set = score(&saturated_text());
        for s in set.scores() {
            assert_eq!(s.value, 1.0, "{} should saturate", s.name);
        }
        assert_eq!(set.mean(), 1.0);
    }

    #[test]
    fn test_code_blocks_counted_in_pairs() {
        let one_block = score("```\ncode\n```");
        assert!(one_block.get(Dimension::CodeBlocks) > 0.0);
        let unclosed = score("```");
        assert_eq!(unclosed.get(Dimension::CodeBlocks), 0.0);
    }

    #[test]
    fn test_whole_token_matching() {
        // "shift" must not count as the connective "if".
        let set = score("shift the position");
        assert_eq!(set.get(Dimension::MultiStepLogic), 0.0);
        // "plasma" must not count as the indicator "sma".
        let set = score("plasma display");
        assert_eq!(set.get(Dimension::TechnicalIndicators), 0.0);
    }

    #[test]
    fn test_indicator_terms_counted_distinct() {
        let repeated = score("rsi rsi rsi rsi rsi rsi");
        let varied = score("rsi macd ema");
        assert!(varied.get(Dimension::TechnicalIndicators) > repeated.get(Dimension::TechnicalIndicators));
    }

    #[test]
    fn test_get_and_mean() {
        let set = score("if volatility spikes then hedge");
        assert!(set.get(Dimension::RiskAnalysis) > 0.0);
        assert!(set.get(Dimension::MultiStepLogic) > 0.0);
        let expected: f64 = set.scores().iter().map(|s| s.value).sum::<f64>() / 7.0;
        assert!((set.mean() - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn test_dimension_serde_names() {
        let json = serde_json::to_string(&Dimension::MultiStepLogic).unwrap();
        assert_eq!(json, "\"multi_step_logic\"");
        assert_eq!(Dimension::RiskAnalysis.to_string(), "risk_analysis");
    }
}
