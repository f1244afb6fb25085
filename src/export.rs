//! Export an engagement as a JSON document and as SVG diagram files.
//!
//! The export document mirrors what the discovery screen shows:
//!
//! ```json
//! { "project": "Acme Corp", "discoveryData": { ... }, "artifacts": { ... } }
//! ```
//!
//! File names are derived from the company name with whitespace runs
//! replaced by `-`, falling back to `engagement` when the name is empty.
//! The name comes from model output, so path separators, `..` and
//! characters not allowed in file names are replaced the same way and the
//! result always stays inside the output directory.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{bail, Result};
use regex::Regex;
use serde::Serialize;

use crate::get::get_engagement;
use crate::models::{ArtifactBundle, DiscoveryRecord, EngagementRecord};
use crate::store::EngagementStore;
use crate::svg::DiagramKind;

static UNSAFE_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:[\s/\\:*?"<>|\x00-\x1F\x7F]|\.{2,})+"#).expect("valid regex")
});

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub project: String,
    pub discovery_data: DiscoveryRecord,
    pub artifacts: Option<ArtifactBundle>,
}

impl ExportDocument {
    pub fn new(discovery: &DiscoveryRecord, artifacts: Option<&ArtifactBundle>) -> Self {
        Self {
            project: discovery.company_name.clone(),
            discovery_data: discovery.clone(),
            artifacts: artifacts.cloned(),
        }
    }

    pub fn from_record(record: &EngagementRecord) -> Self {
        Self::new(&record.discovery(), record.artifacts.as_ref())
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn filename(&self) -> String {
        export_filename(&self.project)
    }
}

/// Company name with whitespace and unsafe runs as `-`, or `engagement`
/// when nothing usable is left. Leading dots are dropped.
pub fn file_stem(company_name: &str) -> String {
    let stem = UNSAFE_RUN.replace_all(company_name, "-");
    let stem = stem.trim_start_matches('.');
    if stem.is_empty() {
        "engagement".to_string()
    } else {
        stem.to_string()
    }
}

pub fn export_filename(company_name: &str) -> String {
    format!("{}.json", file_stem(company_name))
}

/// Write the export document.
///
/// If `output` is `Some`, writes to that file path. Otherwise writes
/// to stdout for piping.
pub fn write_export(document: &ExportDocument, output: Option<&Path>) -> Result<()> {
    let json = document.to_pretty_json()?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &json)?;
            eprintln!("Exported {} to {}", document.project, path.display());
        }
        None => {
            println!("{}", json);
        }
    }
    Ok(())
}

/// Render every available diagram into `dir`, returning the written paths.
/// Diagrams whose section is absent are skipped.
pub fn write_diagrams(
    discovery: &DiscoveryRecord,
    artifacts: &ArtifactBundle,
    dir: &Path,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    for kind in DiagramKind::ALL {
        let Some(svg) = kind.render(artifacts, discovery) else {
            tracing::info!(kind = %kind, "section missing, skipping diagram");
            continue;
        };
        let path = dir.join(kind.filename(&discovery.company_name));
        std::fs::write(&path, svg)?;
        written.push(path);
    }
    Ok(written)
}

/// CLI entry point for `ead export`.
pub async fn run_export(store: &dyn EngagementStore, id: &str, output: Option<&Path>) -> Result<()> {
    let record = get_engagement(store, id).await?;
    write_export(&ExportDocument::from_record(&record), output)
}

/// CLI entry point for `ead render`.
pub async fn run_render(store: &dyn EngagementStore, id: &str, out_dir: &Path) -> Result<()> {
    let record = get_engagement(store, id).await?;
    let Some(artifacts) = record.artifacts.as_ref() else {
        bail!("engagement {} has no generated artifacts", id);
    };
    for path in write_diagrams(&record.discovery(), artifacts, out_dir)? {
        println!("Wrote {}", path.display());
    }
    Ok(())
}
