//! Business capability map: a row of driver boxes above six category panels.

use super::{wrap_text, SvgDoc, TextStyle, FOOTER};
use crate::models::{CapabilityCategory, CapabilityMap, DiscoveryRecord};

const WIDTH: u32 = 1400;
const HEIGHT: u32 = 1000;

const MAX_DRIVERS: usize = 6;
const DRIVER_WRAP: usize = 25;
const DRIVER_SPACING: f64 = 20.0;
const DRIVER_Y: f64 = 145.0;

const MAX_CAPABILITIES: usize = 4;
const CAPABILITY_WRAP: usize = 40;
const PRODUCT_WRAP: usize = 45;
const MAX_PRODUCTS: usize = 3;

const BRAND_BLUE: &str = "#0176D3";

fn panel(category: CapabilityCategory) -> (f64, f64, &'static str) {
    match category {
        CapabilityCategory::Sales => (50.0, 230.0, "#0176D3"),
        CapabilityCategory::Service => (470.0, 230.0, "#2E844A"),
        CapabilityCategory::Marketing => (890.0, 230.0, "#8B46FF"),
        CapabilityCategory::Commerce => (50.0, 550.0, "#FF6B35"),
        CapabilityCategory::PlatformData => (470.0, 550.0, "#00A1E0"),
        CapabilityCategory::IndustrySpecific => (890.0, 550.0, "#FFB75D"),
    }
}

struct DriverBox {
    lines: Vec<String>,
    width: f64,
    height: f64,
}

fn driver_box(text: &str) -> DriverBox {
    let lines = wrap_text(text, DRIVER_WRAP);
    let width = (text.chars().count() as f64 * 8.0).clamp(180.0, 280.0);
    let height = f64::max(60.0, 25.0 + lines.len() as f64 * 18.0);
    DriverBox {
        lines,
        width,
        height,
    }
}

pub fn render(map: &CapabilityMap, discovery: &DiscoveryRecord) -> String {
    let mut doc = SvgDoc::new(WIDTH, HEIGHT);

    doc.text(
        700.0,
        50.0,
        TextStyle::new(32, "#1a1a1a").bold().centered(),
        "Salesforce Business Capability Map",
    );
    doc.text(
        700.0,
        80.0,
        TextStyle::new(18, "#666").centered(),
        &format!("{} - {}", discovery.company_name, discovery.industry),
    );
    doc.text(
        50.0,
        130.0,
        TextStyle::new(20, BRAND_BLUE).bold(),
        "Business Drivers",
    );

    let boxes: Vec<DriverBox> = map
        .business_drivers
        .iter()
        .take(MAX_DRIVERS)
        .map(|d| driver_box(&d.or("")))
        .collect();
    let total: f64 = boxes.iter().map(|b| b.width).sum::<f64>()
        + DRIVER_SPACING * boxes.len().saturating_sub(1) as f64;
    let mut x = (WIDTH as f64 - total) / 2.0;

    let driver_text = TextStyle::new(14, "white").bold().centered();
    for b in &boxes {
        doc.element(format!(
            "<rect x=\"{x}\" y=\"{DRIVER_Y}\" width=\"{}\" height=\"{}\" fill=\"{BRAND_BLUE}\" rx=\"5\"/>",
            b.width, b.height
        ));
        for (li, line) in b.lines.iter().enumerate() {
            doc.text(x + b.width / 2.0, 165.0 + li as f64 * 18.0, driver_text, line);
        }
        x += b.width + DRIVER_SPACING;
    }

    for category in CapabilityCategory::ALL {
        let (px, py, color) = panel(category);
        doc.element(format!(
            "<rect x=\"{px}\" y=\"{py}\" width=\"400\" height=\"300\" fill=\"{color}\" opacity=\"0.1\" stroke=\"{color}\" stroke-width=\"2\" rx=\"8\"/>"
        ));
        doc.text(
            px + 10.0,
            py + 30.0,
            TextStyle::new(18, color).bold(),
            category.title(),
        );

        for (i, cap) in map
            .category(category)
            .iter()
            .take(MAX_CAPABILITIES)
            .enumerate()
        {
            let row = i as f64 * 60.0;
            doc.element(format!(
                "<rect x=\"{}\" y=\"{}\" width=\"380\" height=\"50\" fill=\"white\" stroke=\"{color}\" stroke-width=\"1\" rx=\"4\"/>",
                px + 10.0,
                py + 50.0 + row
            ));

            let title = cap.capability.or("");
            for (li, line) in wrap_text(&title, CAPABILITY_WRAP).iter().take(2).enumerate() {
                doc.text(
                    px + 20.0,
                    py + 68.0 + row + li as f64 * 14.0,
                    TextStyle::new(12, "#333").bold(),
                    line,
                );
            }

            let products = cap
                .salesforce_products
                .iter()
                .take(MAX_PRODUCTS)
                .map(|p| p.or("").into_owned())
                .collect::<Vec<_>>()
                .join(", ");
            if let Some(line) = wrap_text(&products, PRODUCT_WRAP).first() {
                doc.text(px + 20.0, py + 88.0 + row, TextStyle::new(10, "#666"), line);
            }
        }
    }

    doc.text(50.0, 980.0, TextStyle::new(12, "#666"), FOOTER);
    doc.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::Label;
    use crate::models::Capability;

    fn sample() -> CapabilityMap {
        CapabilityMap {
            business_drivers: vec!["Growth".into(), "Operational excellence across plants".into()],
            sales: vec![Capability {
                capability: "Lead & Opportunity Management".into(),
                description: "desc".into(),
                salesforce_products: vec![
                    "Sales Cloud".into(),
                    "CPQ".into(),
                    "Einstein".into(),
                    "Slack".into(),
                ],
            }],
            service: vec![Capability {
                capability: Label::Missing,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn discovery() -> DiscoveryRecord {
        DiscoveryRecord {
            company_name: "Acme".into(),
            industry: "Manufacturing".into(),
            ..Default::default()
        }
    }

    #[test]
    fn renders_are_byte_identical() {
        assert_eq!(
            render(&sample(), &discovery()),
            render(&sample(), &discovery())
        );
    }

    #[test]
    fn driver_row_is_centered() {
        let svg = render(&sample(), &discovery());
        // "Growth" → 180 wide; 36 chars → 280 wide; total 480 → start 460.
        assert!(svg.contains("<rect x=\"460\" y=\"145\" width=\"180\" height=\"60\""));
        assert!(svg.contains("<rect x=\"660\" y=\"145\" width=\"280\" height=\"61\""));
    }

    #[test]
    fn products_are_capped_and_text_escaped() {
        let svg = render(&sample(), &discovery());
        assert!(svg.contains(">Sales Cloud, CPQ, Einstein</text>"));
        assert!(!svg.contains("Slack"));
        assert!(svg.contains("Lead &amp; Opportunity Management"));
        assert!(svg.contains(">Platform &amp; Data</text>"));
        assert!(svg.contains(">Acme - Manufacturing</text>"));
    }

    #[test]
    fn missing_labels_never_leak_placeholders() {
        let svg = render(&sample(), &discovery());
        assert!(!svg.contains("undefined"));
        assert!(!svg.contains("[object Object]"));
        assert!(svg.ends_with("</svg>\n"));
    }
}
