//! Strategic roadmap: numbered phases along a timeline.

use super::{truncate_chars, SvgDoc, TextStyle, FOOTER};
use crate::models::{DiscoveryRecord, RoadmapPhase};

const WIDTH: u32 = 1400;
const HEIGHT: u32 = 800;

const MAX_PHASES: usize = 4;
const MAX_ITEMS: usize = 4;
const ITEM_CHARS: usize = 30;
const BRAND_BLUE: &str = "#0176D3";

pub fn phase_x(index: usize) -> f64 {
    150.0 + index as f64 * 300.0
}

pub fn render(phases: &[RoadmapPhase], discovery: &DiscoveryRecord) -> String {
    let mut doc = SvgDoc::new(WIDTH, HEIGHT);

    doc.text(
        700.0,
        50.0,
        TextStyle::new(32, "#1a1a1a").bold().centered(),
        "Strategic Roadmap",
    );
    doc.text(
        700.0,
        80.0,
        TextStyle::new(18, "#666").centered(),
        &format!(
            "{} - Salesforce Implementation Journey",
            discovery.company_name
        ),
    );
    doc.element(format!(
        "<line x1=\"100\" y1=\"150\" x2=\"1300\" y2=\"150\" stroke=\"{BRAND_BLUE}\" stroke-width=\"4\"/>"
    ));

    let item_style = TextStyle::new(12, "#333");
    for (i, phase) in phases.iter().take(MAX_PHASES).enumerate() {
        let x = phase_x(i);
        let left = x - 115.0;

        doc.element(format!(
            "<circle cx=\"{x}\" cy=\"150\" r=\"20\" fill=\"{BRAND_BLUE}\" stroke=\"#fff\" stroke-width=\"3\"/>"
        ));
        doc.text(
            x,
            155.0,
            TextStyle::new(14, "white").bold().centered(),
            &(i + 1).to_string(),
        );
        doc.element(format!(
            "<rect x=\"{}\" y=\"200\" width=\"250\" height=\"500\" fill=\"white\" stroke=\"{BRAND_BLUE}\" stroke-width=\"2\" rx=\"8\"/>",
            x - 125.0
        ));
        doc.element(format!(
            "<rect x=\"{}\" y=\"200\" width=\"250\" height=\"60\" fill=\"{BRAND_BLUE}\" rx=\"8\"/>",
            x - 125.0
        ));
        doc.text(
            x,
            235.0,
            TextStyle::new(18, "white").bold().centered(),
            &phase.phase.or(""),
        );

        doc.text(left, 290.0, TextStyle::new(14, BRAND_BLUE).bold(), "Initiatives:");
        for (j, initiative) in phase.initiatives.iter().take(MAX_ITEMS).enumerate() {
            doc.text(
                left,
                310.0 + j as f64 * 25.0,
                item_style,
                &format!("• {}", truncate_chars(&initiative.or(""), ITEM_CHARS)),
            );
        }

        doc.text(left, 430.0, TextStyle::new(14, "#2E844A").bold(), "Outcomes:");
        for (j, outcome) in phase.outcomes.iter().take(MAX_ITEMS).enumerate() {
            doc.text(
                left,
                450.0 + j as f64 * 25.0,
                item_style,
                &format!("✓ {}", truncate_chars(&outcome.or(""), ITEM_CHARS)),
            );
        }
    }

    doc.text(50.0, 780.0, TextStyle::new(12, "#666"), FOOTER);
    doc.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::Label;

    fn phase(name: &str) -> RoadmapPhase {
        RoadmapPhase {
            phase: name.into(),
            initiatives: vec![
                "Deploy Sales Cloud to all regional sales teams".into(),
                Label::Missing,
            ],
            outcomes: vec!["Unified CRM".into()],
        }
    }

    #[test]
    fn phases_are_numbered_and_capped() {
        let phases: Vec<_> = (1..=5).map(|i| phase(&format!("Phase {i}"))).collect();
        let svg = render(&phases, &DiscoveryRecord::default());
        assert_eq!(svg.matches("<circle").count(), 4);
        assert!(svg.contains(">Phase 4</text>"));
        assert!(!svg.contains(">Phase 5</text>"));
        assert!(svg.contains("<circle cx=\"1050\" cy=\"150\""));
    }

    #[test]
    fn items_are_prefixed_and_truncated() {
        let svg = render(&[phase("Foundation")], &DiscoveryRecord::default());
        assert!(svg.contains(">• Deploy Sales Cloud to all regi</text>"));
        assert!(svg.contains(">✓ Unified CRM</text>"));
        assert!(svg.contains("<text x=\"35\" y=\"310\""));
        assert!(svg.contains("<text x=\"35\" y=\"450\""));
    }

    #[test]
    fn empty_roadmap_still_renders_frame() {
        let svg = render(&[], &DiscoveryRecord::default());
        assert!(svg.contains("Strategic Roadmap"));
        assert!(!svg.contains("<circle"));
    }
}
