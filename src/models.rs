//! Core data models used throughout EA Discovery.
//!
//! These types represent the discovery intake, the artifact bundle returned by
//! the model, and the persisted engagement record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::label::{lenient_option, lenient_string, lenient_vec, Label};

/// Free-text intake answers about a client engagement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscoveryRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub company_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub industry: String,
    #[serde(deserialize_with = "lenient_string")]
    pub business_context: String,
    #[serde(deserialize_with = "lenient_string")]
    pub current_challenges: String,
    #[serde(deserialize_with = "lenient_string")]
    pub strategic_goals: String,
    #[serde(deserialize_with = "lenient_string")]
    pub technical_landscape: String,
    #[serde(deserialize_with = "lenient_string")]
    pub constraints: String,
    #[serde(deserialize_with = "lenient_string")]
    pub timeline: String,
    #[serde(deserialize_with = "lenient_string")]
    pub budget: String,
}

/// A system mentioned in the uploaded documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveredSystem {
    pub name: Label,
    pub vendor: Label,
    #[serde(rename = "type")]
    pub system_type: Label,
    pub notes: Label,
}

/// Fields extracted from uploaded documents by the analysis call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractedDiscovery {
    #[serde(flatten)]
    pub discovery: DiscoveryRecord,
    #[serde(deserialize_with = "lenient_vec")]
    pub systems: Vec<DiscoveredSystem>,
    #[serde(deserialize_with = "lenient_vec")]
    pub manufacturing_processes: Vec<Label>,
    #[serde(deserialize_with = "lenient_vec")]
    pub explicit_capabilities: Vec<Label>,
    #[serde(deserialize_with = "lenient_vec")]
    pub document_summaries: Vec<Label>,
}

/// One business capability inside a capability-map category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Capability {
    pub capability: Label,
    pub description: Label,
    #[serde(deserialize_with = "lenient_vec")]
    pub salesforce_products: Vec<Label>,
}

/// The six fixed capability categories, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityCategory {
    Sales,
    Service,
    Marketing,
    Commerce,
    PlatformData,
    IndustrySpecific,
}

impl CapabilityCategory {
    pub const ALL: [CapabilityCategory; 6] = [
        CapabilityCategory::Sales,
        CapabilityCategory::Service,
        CapabilityCategory::Marketing,
        CapabilityCategory::Commerce,
        CapabilityCategory::PlatformData,
        CapabilityCategory::IndustrySpecific,
    ];

    pub fn title(self) -> &'static str {
        match self {
            CapabilityCategory::Sales => "Sales",
            CapabilityCategory::Service => "Service",
            CapabilityCategory::Marketing => "Marketing",
            CapabilityCategory::Commerce => "Commerce",
            CapabilityCategory::PlatformData => "Platform & Data",
            CapabilityCategory::IndustrySpecific => "Industry-Specific",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CapabilityMap {
    #[serde(deserialize_with = "lenient_vec")]
    pub business_drivers: Vec<Label>,
    #[serde(deserialize_with = "lenient_vec")]
    pub sales: Vec<Capability>,
    #[serde(deserialize_with = "lenient_vec")]
    pub service: Vec<Capability>,
    #[serde(deserialize_with = "lenient_vec")]
    pub marketing: Vec<Capability>,
    #[serde(deserialize_with = "lenient_vec")]
    pub commerce: Vec<Capability>,
    #[serde(deserialize_with = "lenient_vec")]
    pub platform_data: Vec<Capability>,
    #[serde(deserialize_with = "lenient_vec")]
    pub industry_specific: Vec<Capability>,
}

impl CapabilityMap {
    pub fn category(&self, category: CapabilityCategory) -> &[Capability] {
        match category {
            CapabilityCategory::Sales => &self.sales,
            CapabilityCategory::Service => &self.service,
            CapabilityCategory::Marketing => &self.marketing,
            CapabilityCategory::Commerce => &self.commerce,
            CapabilityCategory::PlatformData => &self.platform_data,
            CapabilityCategory::IndustrySpecific => &self.industry_specific,
        }
    }
}

/// A system box in a pace-layered architecture.
///
/// Current-state and future-state entries use different field names; both
/// sets live here and renderers pick the relevant ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemEntry {
    #[serde(skip_serializing_if = "Label::is_missing")]
    pub name: Label,
    #[serde(skip_serializing_if = "Label::is_missing")]
    pub business_capability: Label,
    #[serde(skip_serializing_if = "Label::is_missing")]
    pub emerging_capability: Label,
    #[serde(skip_serializing_if = "Label::is_missing")]
    pub salesforce_opportunity: Label,
    #[serde(
        deserialize_with = "lenient_vec",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub recommended_salesforce_products: Vec<Label>,
    #[serde(skip_serializing_if = "Label::is_missing")]
    pub future_vision: Label,
    #[serde(
        deserialize_with = "lenient_vec",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub salesforce_products: Vec<Label>,
    #[serde(skip_serializing_if = "Label::is_missing")]
    pub timeline: Label,
    #[serde(
        deserialize_with = "lenient_vec",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub benefits: Vec<Label>,
    /// Set when the entry was synthesized rather than returned by the model.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub inferred: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlatformComponents {
    pub data_unification: Label,
    pub integration: Label,
    pub analytics: Label,
    pub ai_automation: Label,
}

/// Pace-layer tiers, from fastest to slowest rate of change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Innovation,
    Differentiation,
    Record,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Innovation, Tier::Differentiation, Tier::Record];
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Architecture {
    pub overview: Label,
    #[serde(
        deserialize_with = "lenient_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub platform_components: Option<PlatformComponents>,
    #[serde(deserialize_with = "lenient_vec")]
    pub systems_of_record: Vec<SystemEntry>,
    #[serde(deserialize_with = "lenient_vec")]
    pub systems_of_differentiation: Vec<SystemEntry>,
    #[serde(deserialize_with = "lenient_vec")]
    pub systems_of_innovation: Vec<SystemEntry>,
    /// Set when the whole section was filled in locally.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub synthesized: bool,
}

impl Architecture {
    pub fn tier(&self, tier: Tier) -> &[SystemEntry] {
        match tier {
            Tier::Innovation => &self.systems_of_innovation,
            Tier::Differentiation => &self.systems_of_differentiation,
            Tier::Record => &self.systems_of_record,
        }
    }

    pub fn tier_mut(&mut self, tier: Tier) -> &mut Vec<SystemEntry> {
        match tier {
            Tier::Innovation => &mut self.systems_of_innovation,
            Tier::Differentiation => &mut self.systems_of_differentiation,
            Tier::Record => &mut self.systems_of_record,
        }
    }

    pub fn has_systems(&self) -> bool {
        Tier::ALL.iter().any(|t| !self.tier(*t).is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PriorityItem {
    pub initiative: Label,
    pub business_value: Label,
    pub effort: Label,
    pub roi: Label,
    pub priority: Label,
    pub description: Label,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadmapPhase {
    pub phase: Label,
    #[serde(deserialize_with = "lenient_vec")]
    pub initiatives: Vec<Label>,
    #[serde(deserialize_with = "lenient_vec")]
    pub outcomes: Vec<Label>,
}

/// The generated planning documents for one engagement.
///
/// Sections are optional on the way in; [`ArtifactBundle::normalized`]
/// fills every absent section with an empty one before the bundle is stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArtifactBundle {
    #[serde(deserialize_with = "lenient_option")]
    pub capability_map: Option<CapabilityMap>,
    #[serde(deserialize_with = "lenient_option")]
    pub current_state_architecture: Option<Architecture>,
    #[serde(deserialize_with = "lenient_option")]
    pub future_state_architecture: Option<Architecture>,
    #[serde(deserialize_with = "lenient_option")]
    pub prioritization_matrix: Option<Vec<PriorityItem>>,
    #[serde(deserialize_with = "lenient_option")]
    pub strategic_roadmap: Option<Vec<RoadmapPhase>>,
}

impl ArtifactBundle {
    /// Every section present, empty where the model gave nothing.
    pub fn normalized(mut self) -> Self {
        self.capability_map.get_or_insert_with(CapabilityMap::default);
        self.current_state_architecture
            .get_or_insert_with(Architecture::default);
        self.future_state_architecture
            .get_or_insert_with(Architecture::default);
        self.prioritization_matrix.get_or_insert_with(Vec::new);
        self.strategic_roadmap.get_or_insert_with(Vec::new);
        self
    }

    pub fn is_fully_shaped(&self) -> bool {
        self.capability_map.is_some()
            && self.current_state_architecture.is_some()
            && self.future_state_architecture.is_some()
            && self.prioritization_matrix.is_some()
            && self.strategic_roadmap.is_some()
    }

    pub fn architecture(&self, current: bool) -> Option<&Architecture> {
        if current {
            self.current_state_architecture.as_ref()
        } else {
            self.future_state_architecture.as_ref()
        }
    }
}

/// Processing state of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Complete,
    Error,
}

/// A file selected for import.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub id: String,
    pub filename: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
    pub status: DocumentStatus,
    pub error: Option<String>,
}

/// File extensions accepted by the import step.
pub const ACCEPTED_EXTENSIONS: &[&str] = &[
    ".pdf", ".docx", ".doc", ".pptx", ".ppt", ".xlsx", ".xls", ".txt",
];

impl UploadedDocument {
    pub fn new(filename: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            filename: filename.into(),
            media_type: media_type.into(),
            bytes,
            status: DocumentStatus::Pending,
            error: None,
        }
    }

    /// Base64-encode the payload for transport.
    pub fn encode(&self) -> IncomingFile {
        use base64::Engine;
        IncomingFile {
            id: self.id.clone(),
            name: self.filename.clone(),
            media_type: self.media_type.clone(),
            base64_data: base64::engine::general_purpose::STANDARD.encode(&self.bytes),
        }
    }

    pub fn is_accepted_filename(filename: &str) -> bool {
        let lower = filename.to_lowercase();
        ACCEPTED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
    }
}

/// An upload as it travels to the analysis endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingFile {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub media_type: String,
    #[serde(default)]
    pub base64_data: String,
}

impl IncomingFile {
    /// Approximate decoded size: `ceil(len * 3 / 4)`.
    pub fn approx_decoded_bytes(&self) -> u64 {
        (self.base64_data.len() as u64 * 3).div_ceil(4)
    }
}

/// Persisted engagement row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub business_context: String,
    #[serde(default)]
    pub current_challenges: String,
    #[serde(default)]
    pub strategic_goals: String,
    #[serde(default)]
    pub technical_landscape: String,
    #[serde(default)]
    pub constraints: String,
    #[serde(default)]
    pub timeline: String,
    #[serde(default)]
    pub budget: String,
    #[serde(default)]
    pub artifacts: Option<ArtifactBundle>,
}

impl EngagementRecord {
    /// Build a record from the working state. Artifacts are normalized so a
    /// stored bundle always carries all five sections.
    pub fn from_discovery(
        id: String,
        created_at: DateTime<Utc>,
        discovery: &DiscoveryRecord,
        artifacts: Option<ArtifactBundle>,
    ) -> Self {
        Self {
            id,
            created_at,
            company_name: discovery.company_name.clone(),
            industry: discovery.industry.clone(),
            business_context: discovery.business_context.clone(),
            current_challenges: discovery.current_challenges.clone(),
            strategic_goals: discovery.strategic_goals.clone(),
            technical_landscape: discovery.technical_landscape.clone(),
            constraints: discovery.constraints.clone(),
            timeline: discovery.timeline.clone(),
            budget: discovery.budget.clone(),
            artifacts: artifacts.map(ArtifactBundle::normalized),
        }
    }

    pub fn discovery(&self) -> DiscoveryRecord {
        DiscoveryRecord {
            company_name: self.company_name.clone(),
            industry: self.industry.clone(),
            business_context: self.business_context.clone(),
            current_challenges: self.current_challenges.clone(),
            strategic_goals: self.strategic_goals.clone(),
            technical_landscape: self.technical_landscape.clone(),
            constraints: self.constraints.clone(),
            timeline: self.timeline.clone(),
            budget: self.budget.clone(),
        }
    }
}
