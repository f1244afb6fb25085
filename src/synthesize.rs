//! Local fill-in for architecture sections the model left out.
//!
//! Generated bundles sometimes arrive without a current-state or
//! future-state architecture, or with one whose tiers are all empty. Rather
//! than render nothing, those sections are rebuilt from the discovery record
//! and the rest of the bundle. Every rebuilt entry carries `inferred: true`
//! and the section carries `synthesized: true` so a reader can tell it apart
//! from model output.

use crate::label::Label;
use crate::models::{
    ArtifactBundle, Architecture, CapabilityCategory, CapabilityMap, DiscoveryRecord, SystemEntry,
    Tier,
};

/// Upper bound on systems pulled out of the technical landscape text.
const MAX_INFERRED_SYSTEMS: usize = 8;

const PLACEHOLDER_SYSTEM: &str = "Existing systems (to be confirmed)";

/// Fill missing or empty architecture sections. Other sections are untouched.
pub fn fill_missing_architecture(
    mut bundle: ArtifactBundle,
    discovery: &DiscoveryRecord,
) -> ArtifactBundle {
    if !bundle
        .current_state_architecture
        .as_ref()
        .is_some_and(Architecture::has_systems)
    {
        tracing::info!("current-state architecture missing, synthesizing from discovery data");
        let existing = bundle.current_state_architecture.take();
        bundle.current_state_architecture = Some(current_state(discovery, existing));
    }

    if !bundle
        .future_state_architecture
        .as_ref()
        .is_some_and(Architecture::has_systems)
    {
        tracing::info!("future-state architecture missing, synthesizing from capability map");
        let existing = bundle.future_state_architecture.take();
        bundle.future_state_architecture = Some(future_state(
            discovery,
            bundle.capability_map.as_ref(),
            existing,
        ));
    }

    bundle
}

/// Split a free-text landscape description into candidate system names.
pub fn landscape_systems(landscape: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for part in landscape.split([',', ';', '\n']) {
        let name = part
            .trim()
            .trim_start_matches(['-', '*', '•'])
            .trim()
            .trim_end_matches('.');
        if name.is_empty() {
            continue;
        }
        if names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            continue;
        }
        names.push(name.to_string());
        if names.len() == MAX_INFERRED_SYSTEMS {
            break;
        }
    }
    names
}

fn overview_or(existing: Option<&Architecture>, fallback: String) -> Label {
    match existing {
        Some(arch) if !arch.overview.is_blank() => arch.overview.clone(),
        _ => Label::Text(fallback),
    }
}

fn company(discovery: &DiscoveryRecord) -> &str {
    if discovery.company_name.trim().is_empty() {
        "the client"
    } else {
        discovery.company_name.trim()
    }
}

fn current_state(discovery: &DiscoveryRecord, existing: Option<Architecture>) -> Architecture {
    let mut systems = landscape_systems(&discovery.technical_landscape);
    if systems.is_empty() {
        systems.push(PLACEHOLDER_SYSTEM.to_string());
    }

    let systems_of_record = systems
        .into_iter()
        .map(|name| SystemEntry {
            name: Label::Text(name),
            business_capability: Label::from("Inferred from technical landscape"),
            salesforce_opportunity: Label::from("Assess during discovery workshops"),
            inferred: true,
            ..Default::default()
        })
        .collect();

    Architecture {
        overview: overview_or(
            existing.as_ref(),
            format!(
                "Inferred current state for {} based on the technical landscape provided during discovery.",
                company(discovery)
            ),
        ),
        platform_components: existing.and_then(|a| a.platform_components),
        systems_of_record,
        synthesized: true,
        ..Default::default()
    }
}

fn tier_for(category: CapabilityCategory) -> Tier {
    match category {
        CapabilityCategory::Sales | CapabilityCategory::Service | CapabilityCategory::Commerce => {
            Tier::Record
        }
        CapabilityCategory::Marketing | CapabilityCategory::IndustrySpecific => {
            Tier::Differentiation
        }
        CapabilityCategory::PlatformData => Tier::Innovation,
    }
}

fn future_state(
    discovery: &DiscoveryRecord,
    capability_map: Option<&CapabilityMap>,
    existing: Option<Architecture>,
) -> Architecture {
    let mut arch = Architecture {
        overview: overview_or(
            existing.as_ref(),
            format!(
                "Inferred future state for {} derived from the capability map.",
                company(discovery)
            ),
        ),
        platform_components: existing.and_then(|a| a.platform_components),
        synthesized: true,
        ..Default::default()
    };

    if let Some(map) = capability_map {
        for category in CapabilityCategory::ALL {
            let Some(first) = map.category(category).first() else {
                continue;
            };
            let products: Vec<Label> = first
                .salesforce_products
                .iter()
                .filter(|p| !p.is_blank())
                .cloned()
                .collect();
            let name = products
                .first()
                .map(|p| p.as_str().into_owned())
                .unwrap_or_else(|| category.title().to_string());
            arch.tier_mut(tier_for(category)).push(SystemEntry {
                name: Label::Text(name),
                future_vision: first.capability.or_label(&first.description).clone(),
                salesforce_products: products,
                inferred: true,
                ..Default::default()
            });
        }
    }

    if !arch.has_systems() {
        let vision = if discovery.strategic_goals.trim().is_empty() {
            "To be defined with stakeholders".to_string()
        } else {
            discovery.strategic_goals.trim().to_string()
        };
        arch.systems_of_record.push(SystemEntry {
            name: Label::from("Salesforce Platform"),
            future_vision: Label::Text(vision),
            inferred: true,
            ..Default::default()
        });
    }

    arch
}
