//! Transcript count and browse queries with client-side fallback
//!
//! Both operations try the transcript store's own endpoint first. When it
//! fails with a 404, a 5xx or a transport error, a bounded window of recent
//! transcripts is fetched and the same predicate is replayed locally. The
//! fallback is an approximation: it only sees the recent window.

mod refresh;

pub use refresh::{CountRefresher, CountStatus};

use crate::api::TranscriptApi;
use crate::config::AnalysisConfig;
use crate::error::GemmaResult;
use crate::fallback::{FallbackOutcome, run_chain};
use crate::filter::{FilterSpec, sort_items};
use crate::transcript::{BrowsePage, ResultItem};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// How a count or page was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStrategy {
    /// The store's own endpoint
    Primary,
    /// Predicate replayed over the recent-transcript window
    RecentWindow,
}

impl QueryStrategy {
    pub fn is_approximate(&self) -> bool {
        matches!(self, Self::RecentWindow)
    }
}

impl fmt::Display for QueryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::RecentWindow => write!(f, "recent-window"),
        }
    }
}

const CHAIN: [QueryStrategy; 2] = [QueryStrategy::Primary, QueryStrategy::RecentWindow];

/// Count and browse client
#[derive(Clone)]
pub struct TranscriptQueryClient {
    api: Arc<dyn TranscriptApi>,
    recent_min: u32,
}

impl TranscriptQueryClient {
    pub fn new(api: Arc<dyn TranscriptApi>, config: &AnalysisConfig) -> Self {
        Self {
            api,
            recent_min: config.fallback_recent_min,
        }
    }

    /// Size of the recent window fetched for a fallback
    pub fn recent_window(&self, requested: u32) -> u32 {
        requested.max(self.recent_min)
    }

    /// Number of transcripts matching `filters`
    #[instrument(skip(self, filters), level = "debug")]
    pub async fn count(
        &self,
        filters: &FilterSpec,
    ) -> GemmaResult<FallbackOutcome<u64, QueryStrategy>> {
        run_chain(&CHAIN, |strategy| async move {
            match strategy {
                QueryStrategy::Primary => self.api.count(filters).await,
                QueryStrategy::RecentWindow => {
                    let recent = self.fetch_recent(filters.page_size).await?;
                    let count = filters.count_matches(&recent);
                    debug!(window = recent.len(), count, "Count recomputed from recent window");
                    Ok(count)
                }
            }
        })
        .await
    }

    /// One page of matching transcripts starting at `offset`
    #[instrument(skip(self, filters), level = "debug")]
    pub async fn browse(
        &self,
        filters: &FilterSpec,
        offset: u32,
    ) -> GemmaResult<FallbackOutcome<BrowsePage, QueryStrategy>> {
        run_chain(&CHAIN, |strategy| async move {
            match strategy {
                QueryStrategy::Primary => self.api.query(filters, offset).await,
                QueryStrategy::RecentWindow => {
                    let limit = offset.saturating_add(filters.page_size);
                    let recent = self.fetch_recent(limit).await?;
                    Ok(page_locally(filters, recent, offset))
                }
            }
        })
        .await
    }

    async fn fetch_recent(&self, requested: u32) -> GemmaResult<Vec<ResultItem>> {
        self.api.recent(self.recent_window(requested)).await
    }
}

/// Filter, sort and slice one page out of `items`
fn page_locally(filters: &FilterSpec, items: Vec<ResultItem>, offset: u32) -> BrowsePage {
    let mut matching: Vec<ResultItem> = items.into_iter().filter(|i| filters.matches(i)).collect();
    sort_items(&mut matching, filters.sort_by, filters.order);

    let total = matching.len();
    let start = (offset as usize).min(total);
    let end = start.saturating_add(filters.page_size as usize).min(total);
    BrowsePage {
        items: matching.drain(start..end).collect(),
        has_more: end < total,
        total: Some(total as u64),
    }
}
