//! Semantic board-matching capability.

use async_trait::async_trait;

use crate::error::MatchError;

/// External text-matching capability used as the second tier of board
/// resolution.
///
/// Implementations receive the desired board name and the full candidate
/// list and answer with one candidate or `None`. The answer is untrusted:
/// the resolver only accepts values byte-identical to a candidate, so an
/// implementation returning a paraphrased or invented name is treated as
/// "no match". Swappable with a deterministic stub in tests.
#[async_trait]
pub trait BoardMatcher: Send + Sync {
    /// Pick the candidate the target name semantically belongs to, or
    /// `None` when no candidate is a good fit.
    async fn best_match(
        &self,
        target: &str,
        candidates: &[String],
    ) -> Result<Option<String>, MatchError>;
}

/// Matcher that never proposes a candidate.
///
/// Used when no AI backend is configured: resolution degrades to
/// exact-match-or-create.
pub struct NoSemanticMatch;

#[async_trait]
impl BoardMatcher for NoSemanticMatch {
    async fn best_match(
        &self,
        _target: &str,
        _candidates: &[String],
    ) -> Result<Option<String>, MatchError> {
        Ok(None)
    }
}
