//! Pace-layered architecture: innovation, differentiation and record bands.

use super::{truncate_chars, SvgDoc, TextStyle, FOOTER};
use crate::models::{Architecture, DiscoveryRecord, SystemEntry, Tier};

const WIDTH: u32 = 1400;
const HEIGHT: u32 = 900;

const MAX_SYSTEMS: usize = 4;
const NAME_CHARS: usize = 30;
const SUBTITLE_CHARS: usize = 35;
const OVERVIEW_CHARS: usize = 100;

struct Band {
    y: f64,
    title: &'static str,
    pace: &'static str,
    fill: &'static str,
    stroke: &'static str,
    caption: &'static str,
}

fn band(tier: Tier) -> Band {
    match tier {
        Tier::Innovation => Band {
            y: 120.0,
            title: "Systems of Innovation",
            pace: "Fast pace | Experimentation | 6-12 months lifecycle",
            fill: "#4CAF50",
            stroke: "#2E7D32",
            caption: "#E8F5E9",
        },
        Tier::Differentiation => Band {
            y: 360.0,
            title: "Systems of Differentiation",
            pace: "Medium pace | Competitive advantage | 1-3 years lifecycle",
            fill: "#FF9800",
            stroke: "#E65100",
            caption: "#FFF3E0",
        },
        Tier::Record => Band {
            y: 600.0,
            title: "Systems of Record",
            pace: "Slow pace | Core operations | 3-10 years lifecycle",
            fill: "#2196F3",
            stroke: "#0D47A1",
            caption: "#E3F2FD",
        },
    }
}

/// Secondary line under a system name.
fn subtitle(system: &SystemEntry, tier: Tier, is_current: bool) -> String {
    let label = match (tier, is_current) {
        (Tier::Innovation, true) => &system.emerging_capability,
        (Tier::Innovation, false) => &system.future_vision,
        _ => system.business_capability.or_label(&system.future_vision),
    };
    label.or("").into_owned()
}

/// Render the current (`is_current`) or future state architecture.
pub fn render(arch: &Architecture, is_current: bool, discovery: &DiscoveryRecord) -> String {
    let mut doc = SvgDoc::new(WIDTH, HEIGHT);

    let title = if is_current {
        "Current State Architecture"
    } else {
        "Future State Architecture"
    };
    doc.text(
        700.0,
        50.0,
        TextStyle::new(32, "#1a1a1a").bold().centered(),
        &format!("{title} - Pace Layered Architecture"),
    );
    doc.text(
        700.0,
        80.0,
        TextStyle::new(16, "#666").centered(),
        &truncate_chars(&arch.overview.or(""), OVERVIEW_CHARS),
    );

    for tier in Tier::ALL {
        let b = band(tier);
        let systems: Vec<&SystemEntry> = arch.tier(tier).iter().take(MAX_SYSTEMS).collect();

        doc.element(format!(
            "<rect x=\"50\" y=\"{}\" width=\"1300\" height=\"220\" fill=\"{}\" opacity=\"0.2\" stroke=\"{}\" stroke-width=\"3\" rx=\"10\"/>",
            b.y, b.fill, b.fill
        ));
        doc.text(70.0, b.y + 30.0, TextStyle::new(24, b.stroke).bold(), b.title);
        doc.text(
            70.0,
            b.y + 55.0,
            TextStyle::new(13, "#555"),
            &format!("{} | {} system(s)", b.pace, systems.len()),
        );

        for (i, system) in systems.iter().enumerate() {
            let col = (i % 4) as f64;
            let row = (i / 4) as f64;
            doc.element(format!(
                "<rect x=\"{}\" y=\"{}\" width=\"300\" height=\"60\" fill=\"{}\" stroke=\"{}\" stroke-width=\"2\" rx=\"5\"/>",
                70.0 + col * 320.0,
                b.y + 75.0 + row * 65.0,
                b.fill,
                b.stroke
            ));
            doc.text(
                80.0 + col * 320.0,
                b.y + 95.0 + row * 65.0,
                TextStyle::new(14, "white").bold(),
                &truncate_chars(&system.name.or(""), NAME_CHARS),
            );
            doc.text(
                80.0 + col * 320.0,
                b.y + 113.0 + row * 65.0,
                TextStyle::new(11, b.caption),
                &truncate_chars(&subtitle(system, tier, is_current), SUBTITLE_CHARS),
            );
        }
    }

    doc.text(
        50.0,
        870.0,
        TextStyle::new(12, "#666"),
        &format!("{FOOTER} | {}", discovery.company_name),
    );
    doc.finish()
}
