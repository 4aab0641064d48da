//! Debounced count refresh

use super::{QueryStrategy, TranscriptQueryClient};
use crate::debounce::Debouncer;
use crate::filter::FilterSpec;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::warn;

/// Latest known count for the current filters
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CountStatus {
    #[default]
    Unknown,
    /// A refresh is scheduled or in flight
    Pending,
    Ready {
        count: u64,
        strategy: QueryStrategy,
    },
    Failed {
        message: String,
    },
}

impl CountStatus {
    /// Text for the count badge
    pub fn label(&self) -> String {
        match self {
            Self::Unknown => "-".to_string(),
            Self::Pending => "Counting...".to_string(),
            Self::Ready { count, strategy } if strategy.is_approximate() => {
                format!("~{} transcripts (recent window)", count)
            }
            Self::Ready { count, .. } => format!("{} transcripts", count),
            Self::Failed { message } => format!("Count unavailable: {}", message),
        }
    }
}

/// Refreshes the count after the filters settle
///
/// Each call restarts the quiet period, so a burst of edits sends one request
/// for the final filters. Results are published on a watch channel.
pub struct CountRefresher {
    client: Arc<TranscriptQueryClient>,
    debouncer: Debouncer,
    status: Arc<watch::Sender<CountStatus>>,
}

impl CountRefresher {
    pub fn new(client: Arc<TranscriptQueryClient>, delay: Duration) -> Self {
        let (status, _) = watch::channel(CountStatus::Unknown);
        Self {
            client,
            debouncer: Debouncer::new(delay),
            status: Arc::new(status),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CountStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> CountStatus {
        self.status.borrow().clone()
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Refresh once `filters` have been stable for the quiet period
    pub fn update_count(&self, filters: FilterSpec) {
        self.status.send_replace(CountStatus::Pending);
        self.debouncer
            .schedule(refresh(self.client.clone(), self.status.clone(), filters));
    }

    /// Refresh immediately and wait for the result
    pub async fn update_count_now(&self, filters: FilterSpec) -> CountStatus {
        self.debouncer.cancel();
        self.status.send_replace(CountStatus::Pending);
        refresh(self.client.clone(), self.status.clone(), filters).await;
        self.status()
    }

    pub fn cancel(&self) {
        self.debouncer.cancel();
    }
}

async fn refresh(
    client: Arc<TranscriptQueryClient>,
    status: Arc<watch::Sender<CountStatus>>,
    filters: FilterSpec,
) {
    let next = match client.count(&filters).await {
        Ok(outcome) => CountStatus::Ready {
            count: outcome.value,
            strategy: outcome.strategy,
        },
        Err(e) => {
            warn!(error = %e, "Count refresh failed");
            CountStatus::Failed {
                message: e.user_message(),
            }
        }
    };
    status.send_replace(next);
}
