//! `ead analyze` and `ead discover`: the document import and generation
//! workflow from the command line.
//!
//! `discover` drives a [`Session`] through the same steps as the HTTP
//! client would: open or start an engagement, import documents, generate
//! artifacts (which saves), then optionally write the export document and
//! diagrams to a directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::cache::EngagementCache;
use crate::config::Config;
use crate::export::{write_diagrams, write_export, ExportDocument};
use crate::extract::infer_media_type;
use crate::gateway::ModelGateway;
use crate::models::{DiscoveryRecord, IncomingFile, UploadedDocument};
use crate::session::{NotificationKind, Session};
use crate::store::open_store;

/// Options for `ead discover`.
#[derive(Debug, Default, Clone)]
pub struct DiscoverOptions {
    pub files: Vec<PathBuf>,
    /// Continue an existing engagement instead of starting a new one.
    pub id: Option<String>,
    /// JSON file with discovery answers (camelCase keys).
    pub answers: Option<PathBuf>,
    pub company: Option<String>,
    pub industry: Option<String>,
    pub skip_generate: bool,
    /// Directory for the export document and diagrams.
    pub out: Option<PathBuf>,
}

fn load_answers(path: &Path) -> Result<DiscoveryRecord> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read answers file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse answers file: {}", path.display()))
}

/// Read files for a one-shot analysis. Unreadable or unsupported files are
/// reported and skipped.
fn read_uploads(paths: &[PathBuf]) -> Vec<IncomingFile> {
    let mut files = Vec::new();
    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !UploadedDocument::is_accepted_filename(&name) {
            eprintln!("Skipping {} (unsupported file type)", path.display());
            continue;
        }
        match std::fs::read(path) {
            Ok(bytes) => {
                files.push(UploadedDocument::new(name.clone(), infer_media_type(&name), bytes).encode())
            }
            Err(e) => eprintln!("Skipping {}: {}", path.display(), e),
        }
    }
    files
}

pub async fn run_analyze(config: &Config, paths: &[PathBuf]) -> Result<()> {
    let gateway = ModelGateway::from_config(&config.model)?;
    let files = read_uploads(paths);
    let extracted = gateway.analyze_documents(&files).await?;
    println!("{}", serde_json::to_string_pretty(&extracted)?);
    Ok(())
}

fn report(session: &mut Session) {
    if let Some(n) = session.take_notification() {
        match n.kind {
            NotificationKind::Success => println!("{}", n.message),
            NotificationKind::Error => eprintln!("Error: {}", n.message),
        }
    }
}

pub async fn run_discover(config: &Config, options: DiscoverOptions) -> Result<()> {
    let gateway = Arc::new(ModelGateway::from_config(&config.model)?);
    let store = open_store(config).await?;
    let mut session = Session::new(gateway, EngagementCache::new(store));
    session.refresh().await?;

    match &options.id {
        Some(id) => session.load_engagement(id)?,
        None => session.start_new(),
    }

    if let Some(path) = &options.answers {
        let answers = load_answers(path)?;
        session.import_complete(&answers);
    }
    if let Some(company) = &options.company {
        session.discovery_mut().company_name = company.clone();
    }
    if let Some(industry) = &options.industry {
        session.discovery_mut().industry = industry.clone();
    }

    if !options.files.is_empty() {
        for path in &options.files {
            if !session.attach_path(path) {
                eprintln!("Skipping {} (unsupported file type)", path.display());
            }
        }
        for doc in session.documents() {
            if let Some(error) = &doc.error {
                eprintln!("  {}: {}", doc.filename, error);
            }
        }
        let result = session.import_documents().await;
        report(&mut session);
        result?;
    }

    if options.skip_generate {
        session.save().await?;
    } else {
        let result = session.generate().await;
        report(&mut session);
        result?;
    }
    report(&mut session);

    let Some(id) = session.engagement_id().map(str::to_string) else {
        bail!("engagement was not saved");
    };
    println!("Engagement: {}", id);

    if let Some(out) = &options.out {
        let document = ExportDocument::new(session.discovery(), session.artifacts());
        write_export(&document, Some(&out.join(document.filename())))?;
        if let Some(artifacts) = session.artifacts() {
            for path in write_diagrams(session.discovery(), artifacts, out)? {
                println!("Wrote {}", path.display());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_uploads_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("brief.txt"), "hello").unwrap();
        std::fs::write(dir.path().join("photo.png"), "png").unwrap();
        let files = read_uploads(&[
            dir.path().join("brief.txt"),
            dir.path().join("photo.png"),
            dir.path().join("gone.pdf"),
        ]);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "brief.txt");
        assert_eq!(files[0].media_type, "text/plain");
        assert_eq!(files[0].base64_data, "aGVsbG8=");
    }

    #[test]
    fn answers_file_is_camel_case_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("answers.json");
        std::fs::write(&path, r#"{"companyName": "Acme", "budget": 250000}"#).unwrap();
        let answers = load_answers(&path).unwrap();
        assert_eq!(answers.company_name, "Acme");
        assert_eq!(answers.budget, "250000");
        assert!(load_answers(&dir.path().join("missing.json")).is_err());
    }
}
