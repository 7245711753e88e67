//! Candidate selection among provider search results.

use crate::models::ProviderCandidate;

/// How the selected candidate relates to the query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Name equals the query, ignoring case and surrounding whitespace
    Exact,
    /// First result in provider order; no exact name match existed
    Closest,
}

/// Pick the best candidate for `query`.
///
/// Prefers the first exact (case-insensitive) name match, else the first
/// candidate since the provider already ranks by relevance. `None` means
/// "not found", not an error.
pub fn select_best_candidate<'a>(
    query: &str,
    candidates: &'a [ProviderCandidate],
) -> Option<(&'a ProviderCandidate, MatchKind)> {
    let wanted = query.trim().to_lowercase();

    candidates
        .iter()
        .find(|c| c.name.trim().to_lowercase() == wanted)
        .map(|c| (c, MatchKind::Exact))
        .or_else(|| candidates.first().map(|c| (c, MatchKind::Closest)))
}
