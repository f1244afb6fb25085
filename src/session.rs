//! The discovery workflow as a state machine.
//!
//! A [`Session`] holds one working engagement: the discovery answers, the
//! generated artifacts, the documents staged for import, and which view is
//! active. Store access goes through an [`EngagementCache`] so the list of
//! saved engagements is refetched after every save and delete.
//!
//! ```text
//! Home ──start_new──▶ Discovery ──generate──▶ Artifacts
//!   ▲                    ▲                        │
//!   └──── back_home ─────┴──── load_engagement ◀──┘
//! ```
//!
//! Every operation leaves a [`Notification`] describing its outcome. Failed
//! operations keep the prior in-memory state.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;

use crate::cache::EngagementCache;
use crate::error::AppError;
use crate::extract::infer_media_type;
use crate::gateway::ModelGateway;
use crate::merge::merge_discovery;
use crate::models::{
    ArtifactBundle, DiscoveryRecord, DocumentStatus, EngagementRecord, ExtractedDiscovery,
    IncomingFile, UploadedDocument,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Home,
    Discovery,
    Artifacts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

pub const IMPORT_MERGED: &str =
    "Discovery data imported and merged successfully! Review and edit as needed.";
pub const NO_FILES_PROCESSED: &str = "No files could be processed";

pub struct Session {
    gateway: Arc<ModelGateway>,
    cache: EngagementCache,
    view: View,
    engagement_id: Option<String>,
    discovery: DiscoveryRecord,
    artifacts: Option<ArtifactBundle>,
    documents: Vec<UploadedDocument>,
    notification: Option<Notification>,
}

impl Session {
    pub fn new(gateway: Arc<ModelGateway>, cache: EngagementCache) -> Self {
        Self {
            gateway,
            cache,
            view: View::Home,
            engagement_id: None,
            discovery: DiscoveryRecord::default(),
            artifacts: None,
            documents: Vec::new(),
            notification: None,
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn engagement_id(&self) -> Option<&str> {
        self.engagement_id.as_deref()
    }

    pub fn discovery(&self) -> &DiscoveryRecord {
        &self.discovery
    }

    /// Direct edits to the discovery answers.
    pub fn discovery_mut(&mut self) -> &mut DiscoveryRecord {
        &mut self.discovery
    }

    pub fn artifacts(&self) -> Option<&ArtifactBundle> {
        self.artifacts.as_ref()
    }

    pub fn documents(&self) -> &[UploadedDocument] {
        &self.documents
    }

    pub fn engagements(&self) -> &[EngagementRecord] {
        self.cache.engagements()
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    pub fn take_notification(&mut self) -> Option<Notification> {
        self.notification.take()
    }

    fn notify(&mut self, kind: NotificationKind, message: impl Into<String>) {
        let message = message.into();
        match kind {
            NotificationKind::Success => tracing::info!(%message, "notification"),
            NotificationKind::Error => tracing::warn!(%message, "notification"),
        }
        self.notification = Some(Notification { message, kind });
    }

    /// Reload the saved engagement list.
    pub async fn refresh(&mut self) -> Result<(), AppError> {
        let refreshed = self.cache.refresh().await.map(|_| ());
        if let Err(e) = refreshed {
            tracing::error!(error = %e, "loading engagements failed");
            self.notify(NotificationKind::Error, "Failed to load engagements");
            return Err(e);
        }
        Ok(())
    }

    pub fn back_home(&mut self) {
        self.view = View::Home;
    }

    /// Clear the working engagement and open an empty discovery form.
    pub fn start_new(&mut self) {
        self.engagement_id = None;
        self.discovery = DiscoveryRecord::default();
        self.artifacts = None;
        self.documents.clear();
        self.view = View::Discovery;
    }

    /// Make a saved engagement the working one.
    pub fn load_engagement(&mut self, id: &str) -> Result<(), AppError> {
        let record = self
            .cache
            .find(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("engagement {} not found", id)))?;

        self.engagement_id = Some(record.id.clone());
        self.discovery = record.discovery();
        self.view = if record.artifacts.is_some() {
            View::Artifacts
        } else {
            View::Discovery
        };
        self.artifacts = record.artifacts;
        self.documents.clear();
        Ok(())
    }

    /// Stage documents for import. Files with unsupported extensions are
    /// dropped; returns how many were accepted.
    pub fn add_documents(&mut self, documents: impl IntoIterator<Item = UploadedDocument>) -> usize {
        let before = self.documents.len();
        for doc in documents {
            if UploadedDocument::is_accepted_filename(&doc.filename) {
                self.documents.push(doc);
            } else {
                tracing::info!(filename = %doc.filename, "unsupported file type, skipping");
            }
        }
        self.documents.len() - before
    }

    /// Read and stage a file from disk. An unreadable file is staged in the
    /// error state so it shows up next to the others.
    pub fn attach_path(&mut self, path: &Path) -> bool {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let media_type = infer_media_type(&filename);

        match std::fs::read(path) {
            Ok(bytes) => self.add_documents([UploadedDocument::new(filename, media_type, bytes)]) == 1,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read file");
                if !UploadedDocument::is_accepted_filename(&filename) {
                    return false;
                }
                let mut doc = UploadedDocument::new(filename, media_type, Vec::new());
                doc.status = DocumentStatus::Error;
                doc.error = Some("Failed to read file".into());
                self.documents.push(doc);
                true
            }
        }
    }

    pub fn remove_document(&mut self, id: &str) {
        self.documents.retain(|d| d.id != id);
    }

    /// Send every pending document to the analysis call and merge the
    /// result into the discovery answers.
    pub async fn import_documents(&mut self) -> Result<ExtractedDiscovery, AppError> {
        let mut files: Vec<IncomingFile> = Vec::new();
        for doc in &mut self.documents {
            if doc.status == DocumentStatus::Pending {
                doc.status = DocumentStatus::Processing;
                files.push(doc.encode());
            }
        }
        if files.is_empty() {
            self.notify(NotificationKind::Error, NO_FILES_PROCESSED);
            return Err(AppError::BadRequest(NO_FILES_PROCESSED.into()));
        }

        tracing::info!(count = files.len(), "analyzing documents");
        match self.gateway.analyze_documents(&files).await {
            Ok(extracted) => {
                self.set_processing_status(DocumentStatus::Complete, None);
                self.import_complete(&extracted.discovery);
                self.documents.clear();
                Ok(extracted)
            }
            Err(e) => {
                self.set_processing_status(DocumentStatus::Error, Some("Analysis failed"));
                self.notify(NotificationKind::Error, e.to_string());
                Err(e)
            }
        }
    }

    fn set_processing_status(&mut self, status: DocumentStatus, error: Option<&str>) {
        for doc in &mut self.documents {
            if doc.status == DocumentStatus::Processing {
                doc.status = status;
                doc.error = error.map(str::to_string);
            }
        }
    }

    /// Merge extracted fields into the working discovery answers.
    pub fn import_complete(&mut self, extracted: &DiscoveryRecord) {
        self.discovery = merge_discovery(&self.discovery, extracted);
        self.notify(NotificationKind::Success, IMPORT_MERGED);
    }

    /// Generate artifacts, save the engagement, and switch to the artifacts
    /// view. A failed save still shows the new artifacts.
    pub async fn generate(&mut self) -> Result<(), AppError> {
        tracing::info!(company = %self.discovery.company_name, "generating artifacts");
        let artifacts = match self.gateway.generate_artifacts(&self.discovery).await {
            Ok(artifacts) => artifacts,
            Err(e) => {
                self.notify(NotificationKind::Error, format!("Failed: {}", e));
                return Err(e);
            }
        };

        self.artifacts = Some(artifacts);
        let saved = self.save().await;
        self.view = View::Artifacts;
        saved?;
        self.notify(NotificationKind::Success, "Artifacts generated!");
        Ok(())
    }

    /// Upsert the working engagement, minting an id on first save.
    pub async fn save(&mut self) -> Result<String, AppError> {
        let id = self
            .engagement_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let record =
            EngagementRecord::from_discovery(id, Utc::now(), &self.discovery, self.artifacts.clone());

        match self.cache.save(&record).await {
            Ok(()) => {
                tracing::info!(id = %record.id, "engagement saved");
                self.engagement_id = Some(record.id.clone());
                self.notify(NotificationKind::Success, "Engagement saved!");
                Ok(record.id)
            }
            Err(e) => {
                tracing::error!(error = %e, "saving engagement failed");
                self.notify(NotificationKind::Error, "Failed to save engagement");
                Err(e)
            }
        }
    }

    pub async fn delete(&mut self, id: &str) -> Result<bool, AppError> {
        match self.cache.delete(id).await {
            Ok(removed) => {
                self.notify(NotificationKind::Success, "Engagement deleted");
                Ok(removed)
            }
            Err(e) => {
                tracing::error!(error = %e, "deleting engagement failed");
                self.notify(NotificationKind::Error, "Failed to delete engagement");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::{gateway, QueuedReplies};
    use crate::store::{EngagementStore, MemoryStore};
    use async_trait::async_trait;
    use serde_json::json;

    fn session_with(replies: Arc<QueuedReplies>, store: Arc<dyn EngagementStore>) -> Session {
        Session::new(Arc::new(gateway(replies)), EngagementCache::new(store))
    }

    fn session() -> (Arc<QueuedReplies>, Arc<MemoryStore>, Session) {
        let replies = Arc::new(QueuedReplies::default());
        let store = Arc::new(MemoryStore::new());
        let session = session_with(replies.clone(), store.clone());
        (replies, store, session)
    }

    fn text_doc(name: &str, body: &str) -> UploadedDocument {
        UploadedDocument::new(name, "text/plain", body.as_bytes().to_vec())
    }

    #[test]
    fn start_new_resets_and_opens_discovery() {
        let (_, _, mut s) = session();
        assert_eq!(s.view(), View::Home);
        s.discovery_mut().company_name = "Old".into();
        s.start_new();
        assert_eq!(s.view(), View::Discovery);
        assert_eq!(s.discovery(), &DiscoveryRecord::default());
        assert!(s.engagement_id().is_none());
        assert!(s.artifacts().is_none());
        s.back_home();
        assert_eq!(s.view(), View::Home);
    }

    #[test]
    fn unsupported_documents_are_dropped() {
        let (_, _, mut s) = session();
        let accepted = s.add_documents([text_doc("notes.txt", "a"), text_doc("photo.png", "b")]);
        assert_eq!(accepted, 1);
        assert_eq!(s.documents().len(), 1);
        assert_eq!(s.documents()[0].status, DocumentStatus::Pending);
    }

    #[test]
    fn unreadable_path_is_staged_as_error() {
        let (_, _, mut s) = session();
        let dir = tempfile::tempdir().unwrap();
        assert!(s.attach_path(&dir.path().join("missing.pdf")));
        assert_eq!(s.documents()[0].status, DocumentStatus::Error);
        assert_eq!(s.documents()[0].error.as_deref(), Some("Failed to read file"));

        std::fs::write(dir.path().join("brief.txt"), "Acme brief").unwrap();
        assert!(s.attach_path(&dir.path().join("brief.txt")));
        assert_eq!(s.documents()[1].media_type, "text/plain");
        assert_eq!(s.documents()[1].bytes, b"Acme brief");
    }

    #[tokio::test]
    async fn import_with_nothing_readable_fails_without_calling_model() {
        let (replies, _, mut s) = session();
        let mut doc = text_doc("a.txt", "x");
        doc.status = DocumentStatus::Error;
        s.add_documents([doc]);

        let err = s.import_documents().await.unwrap_err();
        assert_eq!(err.to_string(), NO_FILES_PROCESSED);
        assert_eq!(replies.calls(), 0);
        assert_eq!(s.notification().unwrap().kind, NotificationKind::Error);
    }

    #[tokio::test]
    async fn import_merges_into_existing_answers() {
        let (replies, _, mut s) = session();
        s.start_new();
        s.discovery_mut().company_name = "Acme".into();
        s.discovery_mut().business_context = "Global manufacturer".into();
        replies.push_text(
            &json!({
                "companyName": "",
                "industry": "Manufacturing",
                "businessContext": "Expanding into EMEA",
                "systems": [{"name": "SAP", "type": "ERP"}]
            })
            .to_string(),
        );
        s.add_documents([text_doc("brief.txt", "Acme expands")]);

        let extracted = s.import_documents().await.unwrap();
        assert_eq!(extracted.systems.len(), 1);
        assert_eq!(s.discovery().company_name, "Acme");
        assert_eq!(s.discovery().industry, "Manufacturing");
        assert_eq!(
            s.discovery().business_context,
            "Global manufacturer\n\nExpanding into EMEA"
        );
        assert!(s.documents().is_empty());
        assert_eq!(s.notification().unwrap().message, IMPORT_MERGED);
    }

    #[tokio::test]
    async fn failed_analysis_marks_documents_and_keeps_answers() {
        let (replies, _, mut s) = session();
        s.start_new();
        s.discovery_mut().industry = "Retail".into();
        replies.push_status(400, r#"{"error":"bad"}"#);
        s.add_documents([text_doc("a.txt", "x"), text_doc("b.txt", "y")]);

        assert!(matches!(
            s.import_documents().await,
            Err(AppError::Upstream(_))
        ));
        assert!(s
            .documents()
            .iter()
            .all(|d| d.status == DocumentStatus::Error && d.error.as_deref() == Some("Analysis failed")));
        assert_eq!(s.discovery().industry, "Retail");
        assert_eq!(s.notification().unwrap().kind, NotificationKind::Error);
    }

    #[tokio::test]
    async fn generate_saves_and_switches_view() {
        let (replies, store, mut s) = session();
        s.start_new();
        s.discovery_mut().company_name = "Acme".into();
        s.discovery_mut().technical_landscape = "SAP, Oracle".into();
        replies.push_text(
            &json!({
                "capabilityMap": {"businessDrivers": ["Growth"]},
                "prioritizationMatrix": [],
                "strategicRoadmap": []
            })
            .to_string(),
        );

        s.generate().await.unwrap();
        assert_eq!(s.view(), View::Artifacts);
        let id = s.engagement_id().unwrap().to_string();
        let saved = store.get(&id).await.unwrap().unwrap();
        assert_eq!(saved.company_name, "Acme");
        let artifacts = saved.artifacts.unwrap();
        assert!(artifacts.is_fully_shaped());
        assert!(artifacts.current_state_architecture.unwrap().synthesized);
        assert_eq!(s.engagements().len(), 1);
        assert_eq!(s.notification().unwrap().message, "Artifacts generated!");
    }

    #[tokio::test]
    async fn failed_generation_keeps_discovery_view() {
        let (replies, store, mut s) = session();
        s.start_new();
        replies.push_text("no json here");
        assert!(matches!(
            s.generate().await,
            Err(AppError::MalformedModelOutput { .. })
        ));
        assert_eq!(s.view(), View::Discovery);
        assert!(s.artifacts().is_none());
        assert!(store.list().await.unwrap().is_empty());
        assert!(s.notification().unwrap().message.starts_with("Failed: "));
    }

    #[tokio::test]
    async fn second_save_reuses_the_id() {
        let (_, store, mut s) = session();
        s.start_new();
        s.discovery_mut().company_name = "Acme".into();
        let first = s.save().await.unwrap();
        s.discovery_mut().company_name = "Acme Corp".into();
        let second = s.save().await.unwrap();
        assert_eq!(first, second);
        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].company_name, "Acme Corp");
        assert_eq!(s.notification().unwrap().message, "Engagement saved!");
    }

    #[tokio::test]
    async fn load_picks_view_from_artifacts() {
        let (_, _, mut s) = session();
        s.start_new();
        s.discovery_mut().company_name = "Plain".into();
        let plain = s.save().await.unwrap();

        s.start_new();
        s.discovery_mut().company_name = "Done".into();
        s.artifacts = Some(ArtifactBundle::default());
        let done = s.save().await.unwrap();

        s.back_home();
        s.load_engagement(&plain).unwrap();
        assert_eq!(s.view(), View::Discovery);
        assert_eq!(s.discovery().company_name, "Plain");

        s.load_engagement(&done).unwrap();
        assert_eq!(s.view(), View::Artifacts);
        assert!(s.artifacts().unwrap().is_fully_shaped());

        assert!(matches!(
            s.load_engagement("nope"),
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_refreshes_list() {
        let (_, _, mut s) = session();
        s.start_new();
        let id = s.save().await.unwrap();
        assert_eq!(s.engagements().len(), 1);
        assert!(s.delete(&id).await.unwrap());
        assert!(s.engagements().is_empty());
        assert_eq!(s.notification().unwrap().message, "Engagement deleted");
    }

    struct ReadOnlyStore(MemoryStore);

    #[async_trait]
    impl EngagementStore for ReadOnlyStore {
        async fn list(&self) -> Result<Vec<EngagementRecord>, AppError> {
            self.0.list().await
        }
        async fn get(&self, id: &str) -> Result<Option<EngagementRecord>, AppError> {
            self.0.get(id).await
        }
        async fn upsert(&self, _record: &EngagementRecord) -> Result<(), AppError> {
            Err(AppError::Persistence("read-only".into()))
        }
        async fn delete(&self, _id: &str) -> Result<bool, AppError> {
            Err(AppError::Persistence("read-only".into()))
        }
    }

    #[tokio::test]
    async fn persistence_failure_keeps_state() {
        let replies = Arc::new(QueuedReplies::default());
        let mut s = session_with(replies, Arc::new(ReadOnlyStore(MemoryStore::new())));
        s.start_new();
        s.discovery_mut().company_name = "Acme".into();

        assert!(matches!(s.save().await, Err(AppError::Persistence(_))));
        assert!(s.engagement_id().is_none());
        assert_eq!(s.discovery().company_name, "Acme");
        assert_eq!(
            s.take_notification().unwrap(),
            Notification {
                message: "Failed to save engagement".into(),
                kind: NotificationKind::Error,
            }
        );
        assert!(s.notification().is_none());

        assert!(s.delete("x").await.is_err());
        assert_eq!(s.notification().unwrap().message, "Failed to delete engagement");
    }

    /// Store whose first `list` fails after writes have gone through.
    #[derive(Default)]
    struct SlowListStore {
        inner: MemoryStore,
        listed: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl EngagementStore for SlowListStore {
        async fn list(&self) -> Result<Vec<EngagementRecord>, AppError> {
            if !self.listed.swap(true, std::sync::atomic::Ordering::SeqCst) {
                return Err(AppError::Persistence("list timed out".into()));
            }
            self.inner.list().await
        }
        async fn get(&self, id: &str) -> Result<Option<EngagementRecord>, AppError> {
            self.inner.get(id).await
        }
        async fn upsert(&self, record: &EngagementRecord) -> Result<(), AppError> {
            self.inner.upsert(record).await
        }
        async fn delete(&self, id: &str) -> Result<bool, AppError> {
            self.inner.delete(id).await
        }
    }

    #[tokio::test]
    async fn failed_reload_after_save_keeps_the_id() {
        let store = Arc::new(SlowListStore::default());
        let replies = Arc::new(QueuedReplies::default());
        let mut s = session_with(replies, store.clone());
        s.start_new();
        s.discovery_mut().company_name = "Acme".into();

        let first = s.save().await.unwrap();
        assert_eq!(s.engagement_id(), Some(first.as_str()));
        s.discovery_mut().company_name = "Acme Corp".into();
        let second = s.save().await.unwrap();

        assert_eq!(first, second);
        let rows = store.inner.list().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].company_name, "Acme Corp");
    }
}
