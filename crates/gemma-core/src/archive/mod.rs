//! Artifact archive
//!
//! Remote artifacts are paged from the backend into an append-only list for
//! the session. Local artifacts exist only in memory, created when a finished
//! run came back without a server-side artifact.

mod artifact;
mod browser;
mod local_store;

pub use artifact::{Artifact, ArtifactPage, ArtifactSummary, LOCAL_ID_PREFIX};
pub use browser::{ArchiveBrowser, LocalRegistration, Preview};
pub use local_store::LocalArtifactStore;
