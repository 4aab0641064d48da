//! Archive listing, paging and preview

use super::artifact::{Artifact, ArtifactSummary};
use super::local_store::LocalArtifactStore;
use crate::api::ArchiveApi;
use crate::config::ArchiveConfig;
use crate::error::GemmaResult;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of previewing an artifact
#[derive(Debug, Clone, PartialEq)]
pub enum Preview {
    Ready(Artifact),
    /// Missing on the server or empty; shown as an explicit state, never a blank pane
    Unavailable { artifact_id: String, reason: String },
}

impl Preview {
    pub fn artifact(&self) -> Option<&Artifact> {
        match self {
            Self::Ready(artifact) => Some(artifact),
            Self::Unavailable { .. } => None,
        }
    }
}

/// Where a local artifact was stored and what its eviction displaced
#[derive(Debug, Clone, PartialEq)]
pub struct LocalRegistration {
    pub id: String,
    /// Id of the previewed artifact the store evicted, if any
    pub evicted_active: Option<String>,
}

/// Session view of the archive: local artifacts plus the remote pages loaded so far
pub struct ArchiveBrowser {
    api: Arc<dyn ArchiveApi>,
    local: LocalArtifactStore,
    remote: Vec<ArtifactSummary>,
    remote_ids: HashSet<String>,
    has_more: bool,
    page_size: u32,
    active: Option<Artifact>,
}

impl ArchiveBrowser {
    pub fn new(api: Arc<dyn ArchiveApi>, config: &ArchiveConfig) -> Self {
        Self {
            api,
            local: LocalArtifactStore::new(config.local_capacity),
            remote: Vec::new(),
            remote_ids: HashSet::new(),
            has_more: true,
            page_size: config.page_size.max(1),
            active: None,
        }
    }

    /// Drop the remote list and fetch its first page
    pub async fn load_first_page(&mut self) -> GemmaResult<usize> {
        self.remote.clear();
        self.remote_ids.clear();
        self.has_more = true;
        self.load_more().await
    }

    /// Append the next remote page; earlier entries never move
    ///
    /// Returns how many new entries were appended.
    pub async fn load_more(&mut self) -> GemmaResult<usize> {
        if !self.has_more {
            return Ok(0);
        }

        let offset = self.remote.len() as u32;
        let page = self.api.list_artifacts(offset, self.page_size).await?;
        let mut appended = 0;
        for summary in page.items {
            if self.remote_ids.insert(summary.artifact_id.clone()) {
                self.remote.push(summary);
                appended += 1;
            }
        }
        // A page with nothing new means the server is repeating itself
        self.has_more = page.has_more && appended > 0;

        debug!(offset, appended, has_more = self.has_more, "Archive page loaded");
        Ok(appended)
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Local artifacts newest first, then remote ones in server order
    pub fn listing(&self) -> Vec<ArtifactSummary> {
        let mut rows = self.local.summaries();
        rows.extend(self.remote.iter().cloned());
        rows
    }

    /// Keep a locally synthesized artifact
    ///
    /// When the eviction this causes removes the previewed artifact, the
    /// returned registration names it and nothing is active afterwards.
    pub fn register_local(&mut self, artifact: Artifact) -> LocalRegistration {
        let (id, evicted) = self.local.register(artifact);
        let evicted_active = evicted
            .map(|old| old.artifact_id)
            .filter(|old| self.active_id() == Some(old.as_str()));
        if evicted_active.is_some() {
            self.active = None;
        }
        info!(artifact_id = %id, stored = self.local.len(), "Local artifact registered");
        LocalRegistration { id, evicted_active }
    }

    pub fn local(&self) -> &LocalArtifactStore {
        &self.local
    }

    /// Load an artifact for display and make it the active one
    ///
    /// Local artifacts are served from memory without a request. A 404 or an
    /// empty body yields [`Preview::Unavailable`] and clears the active artifact.
    pub async fn preview_artifact(&mut self, artifact_id: &str) -> GemmaResult<Preview> {
        if let Some(artifact) = self.local.get(artifact_id) {
            let artifact = artifact.clone();
            self.active = Some(artifact.clone());
            return Ok(Preview::Ready(artifact));
        }

        if Artifact::is_local_id(artifact_id) {
            self.active = None;
            return Ok(Preview::Unavailable {
                artifact_id: artifact_id.to_string(),
                reason: "This local artifact is no longer in memory".to_string(),
            });
        }

        let fetched = match self.api.get_artifact(artifact_id).await {
            Ok(fetched) => fetched,
            Err(e) if e.status() == Some(404) => None,
            Err(e) => {
                self.active = None;
                return Err(e);
            }
        };

        match fetched {
            Some(artifact) => {
                self.active = Some(artifact.clone());
                Ok(Preview::Ready(artifact))
            }
            None => {
                warn!(artifact_id, "Artifact unavailable");
                self.active = None;
                Ok(Preview::Unavailable {
                    artifact_id: artifact_id.to_string(),
                    reason: "Artifact not found or empty".to_string(),
                })
            }
        }
    }

    pub fn active(&self) -> Option<&Artifact> {
        self.active.as_ref()
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.artifact_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockArchiveApi;
    use crate::archive::ArtifactPage;
    use crate::error::GemmaError;

    fn summary(id: &str) -> ArtifactSummary {
        ArtifactSummary {
            artifact_id: id.to_string(),
            title: id.to_string(),
            created_at: String::new(),
            is_local: false,
        }
    }

    fn local(id: &str) -> Artifact {
        Artifact {
            artifact_id: id.to_string(),
            title: "local".to_string(),
            body: "summary".to_string(),
            created_at: String::new(),
            is_local: true,
        }
    }

    fn config() -> ArchiveConfig {
        ArchiveConfig {
            page_size: 2,
            ..ArchiveConfig::default()
        }
    }

    #[tokio::test]
    async fn test_local_preview_makes_no_request() {
        // No expectations: any call would panic
        let api = MockArchiveApi::new();
        let mut browser = ArchiveBrowser::new(Arc::new(api), &config());
        browser.register_local(local("local-1"));

        let preview = browser.preview_artifact("local-1").await.unwrap();
        assert_eq!(preview.artifact().map(|a| a.body.as_str()), Some("summary"));
        assert_eq!(browser.active_id(), Some("local-1"));
    }

    #[tokio::test]
    async fn test_missing_remote_artifact_is_unavailable() {
        let mut api = MockArchiveApi::new();
        api.expect_get_artifact()
            .withf(|id| id == "a-404")
            .returning(|_| Err(GemmaError::http(404, "no such artifact")));
        api.expect_get_artifact()
            .withf(|id| id == "a-empty")
            .returning(|_| Ok(None));

        let mut browser = ArchiveBrowser::new(Arc::new(api), &config());
        assert!(matches!(
            browser.preview_artifact("a-404").await.unwrap(),
            Preview::Unavailable { .. }
        ));
        assert!(matches!(
            browser.preview_artifact("a-empty").await.unwrap(),
            Preview::Unavailable { .. }
        ));
        assert_eq!(browser.active_id(), None);
    }

    #[tokio::test]
    async fn test_paging_appends_without_reordering() {
        let mut api = MockArchiveApi::new();
        api.expect_list_artifacts()
            .withf(|offset, limit| *offset == 0 && *limit == 2)
            .returning(|_, _| {
                Ok(ArtifactPage {
                    items: vec![summary("a-1"), summary("a-2")],
                    has_more: true,
                    total: Some(3),
                })
            });
        api.expect_list_artifacts()
            .withf(|offset, _| *offset == 2)
            .returning(|_, _| {
                Ok(ArtifactPage {
                    items: vec![summary("a-2"), summary("a-3")],
                    has_more: false,
                    total: Some(3),
                })
            });

        let mut browser = ArchiveBrowser::new(Arc::new(api), &config());
        browser.register_local(local("local-1"));
        assert_eq!(browser.load_first_page().await.unwrap(), 2);
        assert_eq!(browser.load_more().await.unwrap(), 1);
        assert!(!browser.has_more());
        assert_eq!(browser.load_more().await.unwrap(), 0);

        let ids: Vec<String> = browser.listing().into_iter().map(|s| s.artifact_id).collect();
        assert_eq!(ids, vec!["local-1", "a-1", "a-2", "a-3"]);
    }

    #[tokio::test]
    async fn test_evicting_active_local_artifact_clears_it() {
        let api = MockArchiveApi::new();
        let mut browser = ArchiveBrowser::new(
            Arc::new(api),
            &ArchiveConfig {
                local_capacity: 1,
                ..ArchiveConfig::default()
            },
        );
        browser.register_local(local("local-1"));
        browser.preview_artifact("local-1").await.unwrap();

        let registration = browser.register_local(local("local-2"));
        assert_eq!(registration.id, "local-2");
        assert_eq!(registration.evicted_active.as_deref(), Some("local-1"));
        assert_eq!(browser.active_id(), None);
        assert!(matches!(
            browser.preview_artifact("local-1").await.unwrap(),
            Preview::Unavailable { .. }
        ));
    }
}
