//! Three-tier board resolution.

use std::sync::Arc;

use tracing::{debug, info, warn};

use pinsmith_protocols::matcher::BoardMatcher;
use pinsmith_protocols::types::MatchDecision;

/// Decides whether a pin reuses an existing board or creates a new one.
///
/// Strict order, short-circuiting on the first success:
///
/// 1. exact case-insensitive match — free and unambiguous;
/// 2. semantic match via the external capability — costly and
///    probabilistic, so its answer is only accepted when byte-identical
///    to a scraped candidate;
/// 3. create the requested board — the safe fallback that never misfiles
///    a pin into an unrelated board.
///
/// Resolution itself never fails: capability errors degrade to creation.
pub struct BoardResolver {
    matcher: Arc<dyn BoardMatcher>,
}

impl BoardResolver {
    pub fn new(matcher: Arc<dyn BoardMatcher>) -> Self {
        Self { matcher }
    }

    /// Resolve a target board name against the boards scraped from the
    /// composer. Exactly one decision is produced per publish attempt.
    pub async fn resolve(&self, target: &str, candidates: &[String]) -> MatchDecision {
        if let Some(exact) = candidates.iter().find(|b| b.eq_ignore_ascii_case(target)) {
            debug!(board = %exact, "exact board match");
            return MatchDecision::Reuse(exact.clone());
        }

        if candidates.is_empty() {
            debug!(board = target, "no existing boards; creating");
            return MatchDecision::Create(target.to_string());
        }

        match self.matcher.best_match(target, candidates).await {
            Ok(Some(answer)) => {
                if candidates.contains(&answer) {
                    info!(target, board = %answer, "semantic board match");
                    MatchDecision::Reuse(answer)
                } else {
                    warn!(
                        target,
                        answer = %answer,
                        "matcher answered outside the candidate list; treating as no match"
                    );
                    MatchDecision::Create(target.to_string())
                }
            }
            Ok(None) => {
                debug!(target, "no semantic match; creating board");
                MatchDecision::Create(target.to_string())
            }
            Err(e) => {
                warn!(target, error = %e, "semantic matching failed; creating board");
                MatchDecision::Create(target.to_string())
            }
        }
    }
}
