//! Page identifiers and per-page outcomes

use crate::traits::{FailureKind, FetchError};
use serde::{Deserialize, Serialize};

/// An opaque item record from the remote collection
pub type Record = serde_json::Value;

/// Zero-based page number
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PageIndex(pub u64);

impl PageIndex {
    /// The first page
    pub const FIRST: PageIndex = PageIndex(0);

    /// The page after this one
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for PageIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PageIndex {
    fn from(page: u64) -> Self {
        Self(page)
    }
}

/// Result of fetching one page
#[derive(Debug)]
pub enum PageOutcome {
    /// Non-empty batch of records
    Items(Vec<Record>),
    /// Empty page: the expected end of pagination
    Exhausted,
    /// The fetch failed
    Failed(FetchError),
}

impl PageOutcome {
    /// Classify a fetch result
    pub fn from_fetch(result: Result<Vec<Record>, FetchError>) -> Self {
        match result {
            Ok(items) if items.is_empty() => PageOutcome::Exhausted,
            Ok(items) => PageOutcome::Items(items),
            Err(e) => PageOutcome::Failed(e),
        }
    }

    /// Status without the payload
    pub fn status(&self) -> PageStatus {
        match self {
            PageOutcome::Items(items) => PageStatus::Items(items.len()),
            PageOutcome::Exhausted => PageStatus::Exhausted,
            PageOutcome::Failed(e) => PageStatus::Failed(e.failure_kind()),
        }
    }
}

impl From<Result<Vec<Record>, FetchError>> for PageOutcome {
    fn from(result: Result<Vec<Record>, FetchError>) -> Self {
        Self::from_fetch(result)
    }
}

/// What became of one dispatched page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    /// Page returned this many records, all enqueued
    Items(usize),
    /// Page was empty
    Exhausted,
    /// Page fetch failed
    Failed(FailureKind),
    /// Records were fetched but the result queue was already closed
    Undelivered(usize),
}

impl PageStatus {
    /// Check if this page ends pagination under the given policy
    pub fn stops_run(&self, policy: crate::config::StopPolicy) -> bool {
        match self {
            PageStatus::Exhausted => true,
            PageStatus::Failed(_) => policy.stops_on_failure(),
            PageStatus::Items(_) | PageStatus::Undelivered(_) => false,
        }
    }
}

/// Report returned by a finished page task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    /// Page that was fetched
    pub page: PageIndex,
    /// Outcome
    pub status: PageStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StopPolicy;
    use serde_json::json;

    #[test]
    fn test_page_index_next_and_display() {
        let page: PageIndex = 41u64.into();
        assert_eq!(page.next(), PageIndex(42));
        assert_eq!(page.next().to_string(), "42");
        assert_eq!(PageIndex::FIRST, PageIndex(0));
    }

    #[test]
    fn test_outcome_empty_is_exhausted() {
        let outcome = PageOutcome::from_fetch(Ok(Vec::new()));
        assert!(matches!(outcome, PageOutcome::Exhausted));
        assert_eq!(outcome.status(), PageStatus::Exhausted);
    }

    #[test]
    fn test_outcome_items() {
        let outcome: PageOutcome = Ok(vec![json!({"id": "a"}), json!({"id": "b"})]).into();
        assert_eq!(outcome.status(), PageStatus::Items(2));
    }

    #[test]
    fn test_outcome_failure_kinds() {
        let throttled = PageOutcome::from_fetch(Err(FetchError::RateLimited { retry_after: None }));
        assert_eq!(
            throttled.status(),
            PageStatus::Failed(FailureKind::Throttled)
        );

        let decode = PageOutcome::from_fetch(Err(FetchError::Decode("eof".into())));
        assert_eq!(decode.status(), PageStatus::Failed(FailureKind::Transport));
    }

    #[test]
    fn test_status_stops_run_by_policy() {
        let failed = PageStatus::Failed(FailureKind::Transport);
        assert!(failed.stops_run(StopPolicy::AnyAnomaly));
        assert!(!failed.stops_run(StopPolicy::ExhaustionOnly));

        assert!(PageStatus::Exhausted.stops_run(StopPolicy::AnyAnomaly));
        assert!(PageStatus::Exhausted.stops_run(StopPolicy::ExhaustionOnly));

        assert!(!PageStatus::Items(100).stops_run(StopPolicy::AnyAnomaly));
    }
}
