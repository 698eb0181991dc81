//! Role prompt construction.
//!
//! Each role gets a distinct preamble plus the inputs its position needs:
//! the proposer sees the topic and any prior consensus, the critic sees the
//! current proposal, and the consensus builder sees both sides along with
//! the early-stop marker it may emit once positions have converged.

/// Prompt for the proposer opening a round.
pub fn proposer_prompt(topic: &str, context: Option<&str>, prior_consensus: Option<&str>) -> String {
    let mut prompt = String::from(
        "You are the PROPOSER in a structured trading analysis debate. \
         Present a concrete, well-argued analysis of the topic below. \
         Commit to a position and support it with specific evidence.\n\n",
    );
    prompt.push_str("## Topic\n");
    prompt.push_str(topic);
    prompt.push('\n');
    if let Some(context) = context {
        prompt.push_str("\n## Context\n");
        prompt.push_str(context);
        prompt.push('\n');
    }
    if let Some(prior) = prior_consensus {
        prompt.push_str("\n## Prior round consensus\n");
        prompt.push_str(prior);
        prompt.push_str("\n\nRefine or extend this consensus; do not repeat it verbatim.\n");
    }
    prompt
}

/// Prompt for the critic challenging the current proposal.
pub fn critic_prompt(topic: &str, proposer_output: &str, prior_consensus: Option<&str>) -> String {
    let mut prompt = String::from(
        "You are the CRITIC in a structured trading analysis debate. \
         Challenge the proposal below: identify weak assumptions, missing \
         risks, and overlooked alternatives. Be specific, not contrarian \
         for its own sake.\n\n",
    );
    prompt.push_str("## Topic\n");
    prompt.push_str(topic);
    prompt.push_str("\n\n## Proposal under review\n");
    prompt.push_str(proposer_output);
    prompt.push('\n');
    if let Some(prior) = prior_consensus {
        prompt.push_str("\n## Prior round consensus\n");
        prompt.push_str(prior);
        prompt.push('\n');
    }
    prompt
}

/// Prompt for the consensus builder merging a round.
///
/// Instructs the model to emit `early_stop_marker` verbatim when the debate
/// has converged; the orchestrator finalizes the session on that marker.
pub fn consensus_prompt(
    topic: &str,
    proposer_output: &str,
    critic_output: &str,
    early_stop_marker: &str,
) -> String {
    let mut prompt = String::from(
        "You are the CONSENSUS BUILDER in a structured trading analysis \
         debate. Weigh the proposal against the critique and produce a \
         single merged position that honestly reflects both.\n\n",
    );
    prompt.push_str("## Topic\n");
    prompt.push_str(topic);
    prompt.push_str("\n\n## Proposal\n");
    prompt.push_str(proposer_output);
    prompt.push_str("\n\n## Critique\n");
    prompt.push_str(critic_output);
    prompt.push_str(&format!(
        "\n\nIf the proposal and critique have genuinely converged and \
         further rounds would not change the conclusion, include the exact \
         marker {marker} on its own line at the end of your response. \
         Otherwise omit the marker entirely.\n",
        marker = early_stop_marker
    ));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proposer_prompt_includes_topic_and_context() {
        let prompt = proposer_prompt("Rotate into energy?", Some("Q3 portfolio"), None);
        assert!(prompt.contains("PROPOSER"));
        assert!(prompt.contains("## Topic\nRotate into energy?"));
        assert!(prompt.contains("## Context\nQ3 portfolio"));
        assert!(!prompt.contains("Prior round consensus"));
    }

    #[test]
    fn test_proposer_prompt_carries_prior_consensus() {
        let prompt = proposer_prompt("topic", None, Some("hold steady"));
        assert!(prompt.contains("## Prior round consensus\nhold steady"));
    }

    #[test]
    fn test_critic_prompt_includes_proposal() {
        let prompt = critic_prompt("topic", "buy the dip", None);
        assert!(prompt.contains("CRITIC"));
        assert!(prompt.contains("## Proposal under review\nbuy the dip"));
    }

    #[test]
    fn test_consensus_prompt_includes_both_sides_and_marker() {
        let prompt = consensus_prompt("topic", "buy", "too risky", "FINAL_CONSENSUS");
        assert!(prompt.contains("CONSENSUS BUILDER"));
        assert!(prompt.contains("## Proposal\nbuy"));
        assert!(prompt.contains("## Critique\ntoo risky"));
        assert!(prompt.contains("FINAL_CONSENSUS"));
    }

    #[test]
    fn test_prompts_are_role_distinct() {
        let p = proposer_prompt("t", None, None);
        let c = critic_prompt("t", "x", None);
        let s = consensus_prompt("t", "x", "y", "M");
        assert_ne!(p, c);
        assert_ne!(c, s);
        assert!(!p.contains("CRITIC"));
        assert!(!c.contains("CONSENSUS BUILDER"));
    }
}
