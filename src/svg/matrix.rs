//! Value/effort prioritization matrix.

use super::{truncate_chars, SvgDoc, TextStyle, FOOTER};
use crate::models::{DiscoveryRecord, PriorityItem};

const WIDTH: u32 = 1200;
const HEIGHT: u32 = 900;

const CENTER: (f64, f64) = (600.0, 500.0);
const INITIATIVE_CHARS: usize = 20;

/// Marker x for a business-value rating.
pub fn value_x(value: &str) -> Option<f64> {
    match value {
        "Low" => Some(250.0),
        "Medium" => Some(600.0),
        "High" => Some(950.0),
        _ => None,
    }
}

/// Marker y for an effort rating. Low effort sits at the bottom.
pub fn effort_y(effort: &str) -> Option<f64> {
    match effort {
        "Low" => Some(750.0),
        "Medium" => Some(500.0),
        "High" => Some(250.0),
        _ => None,
    }
}

/// Marker position; unknown ratings fall back to the center per axis.
pub fn position(item: &PriorityItem) -> (f64, f64) {
    let value = item.business_value.as_str();
    let effort = item.effort.as_str();
    (
        value_x(value.trim()).unwrap_or(CENTER.0),
        effort_y(effort.trim()).unwrap_or(CENTER.1),
    )
}

pub fn marker_color(value: &str, effort: &str) -> &'static str {
    match (value, effort) {
        ("High", "Low") => "#2e7d32",
        ("Low", "Low") => "#558b2f",
        ("High", "High") => "#f57f17",
        ("Low", "High") => "#c62828",
        ("High", _) => "#2e7d32",
        ("Medium", _) => "#f57f17",
        _ => "#666",
    }
}

const QUADRANTS: [(f64, f64, &str, &str); 4] = [
    (150.0, 150.0, "#ffcdd2", "0.3"),
    (600.0, 150.0, "#fff9c4", "0.3"),
    (150.0, 500.0, "#c8e6c9", "0.3"),
    (600.0, 500.0, "#a5d6a7", "0.5"),
];

const QUADRANT_LABELS: [(f64, f64, &str, &str, &str); 4] = [
    (375.0, 300.0, "#c62828", "🔴 Avoid", "Low Value, High Effort"),
    (825.0, 300.0, "#f57f17", "🟡 Consider", "High Value, High Effort"),
    (375.0, 650.0, "#558b2f", "🟢 Quick Wins", "Low Value, Low Effort"),
    (825.0, 650.0, "#2e7d32", "🟢 Strategic", "High Value, Low Effort"),
];

pub fn render(items: &[PriorityItem], discovery: &DiscoveryRecord) -> String {
    let mut doc = SvgDoc::new(WIDTH, HEIGHT);

    doc.text(
        600.0,
        50.0,
        TextStyle::new(32, "#1a1a1a").bold().centered(),
        "Initiative Prioritization Matrix",
    );
    doc.text(
        600.0,
        80.0,
        TextStyle::new(16, "#666").centered(),
        &discovery.company_name,
    );

    for (x, y, fill, opacity) in QUADRANTS {
        doc.element(format!(
            "<rect x=\"{x}\" y=\"{y}\" width=\"450\" height=\"350\" fill=\"{fill}\" opacity=\"{opacity}\"/>"
        ));
    }

    doc.element("<line x1=\"150\" y1=\"150\" x2=\"150\" y2=\"850\" stroke=\"#333\" stroke-width=\"3\"/>");
    doc.element("<line x1=\"150\" y1=\"850\" x2=\"1050\" y2=\"850\" stroke=\"#333\" stroke-width=\"3\"/>");
    doc.element("<polygon points=\"150,140 145,155 155,155\" fill=\"#333\"/>");
    doc.element("<polygon points=\"1060,850 1045,845 1045,855\" fill=\"#333\"/>");

    let axis = TextStyle::new(18, "#333").bold();
    let tick = TextStyle::new(14, "#666");
    doc.text_with(
        50.0,
        500.0,
        axis,
        "transform=\"rotate(-90 50 500)\"",
        "Complexity / Effort",
    );
    doc.text(70.0, 200.0, tick, "High");
    doc.text(70.0, 830.0, tick, "Low");
    doc.text(600.0, 890.0, axis.centered(), "Business Impact / Value");
    doc.text(180.0, 870.0, tick, "Low");
    doc.text(1010.0, 870.0, tick, "High");

    for (x, y, color, label, hint) in QUADRANT_LABELS {
        doc.text(x, y, TextStyle::new(18, color).bold().centered(), label);
        doc.text(x, y + 25.0, TextStyle::new(12, "#666").centered(), hint);
    }

    for item in items {
        let (x, y) = position(item);
        let value = item.business_value.as_str();
        let effort = item.effort.as_str();
        let color = marker_color(value.trim(), effort.trim());
        doc.element(format!(
            "<circle cx=\"{x}\" cy=\"{y}\" r=\"40\" fill=\"{color}\" opacity=\"0.9\" stroke=\"#fff\" stroke-width=\"3\"/>"
        ));
        doc.text(
            x,
            y + 8.0,
            TextStyle::new(20, "white").bold().centered(),
            &item.priority.or(""),
        );
        doc.text(
            x,
            y - 50.0,
            TextStyle::new(13, "#333").bold().centered(),
            &truncate_chars(&item.initiative.or(""), INITIATIVE_CHARS),
        );
    }

    doc.text(50.0, 890.0, TextStyle::new(11, "#999"), FOOTER);
    doc.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::Label;

    fn item(value: &str, effort: &str) -> PriorityItem {
        PriorityItem {
            initiative: "Deploy CRM".into(),
            business_value: value.into(),
            effort: effort.into(),
            priority: Label::from(1i64),
            ..Default::default()
        }
    }

    #[test]
    fn high_value_low_effort_lands_bottom_right() {
        let svg = render(&[item("High", "Low")], &DiscoveryRecord::default());
        assert_eq!(svg.matches("<circle").count(), 1);
        assert!(svg.contains("<circle cx=\"950\" cy=\"750\" r=\"40\" fill=\"#2e7d32\""));
        assert!(svg.contains(
            "<text x=\"950\" y=\"758\" font-family=\"Arial, sans-serif\" font-size=\"20\" font-weight=\"bold\" text-anchor=\"middle\" fill=\"white\">1</text>"
        ));
        assert!(svg.contains("<text x=\"950\" y=\"700\""));
        assert!(svg.contains(">Deploy CRM</text>"));
    }

    #[test]
    fn unknown_ratings_fall_back_to_center() {
        assert_eq!(position(&item("Huge", "")), (600.0, 500.0));
        assert_eq!(position(&item("Low", "Unknown")), (250.0, 500.0));
        assert_eq!(position(&PriorityItem::default()), (600.0, 500.0));
    }

    #[test]
    fn color_table() {
        assert_eq!(marker_color("High", "Low"), "#2e7d32");
        assert_eq!(marker_color("Low", "Low"), "#558b2f");
        assert_eq!(marker_color("High", "High"), "#f57f17");
        assert_eq!(marker_color("Low", "High"), "#c62828");
        assert_eq!(marker_color("High", "Medium"), "#2e7d32");
        assert_eq!(marker_color("Medium", "Low"), "#f57f17");
        assert_eq!(marker_color("Low", "Medium"), "#666");
        assert_eq!(marker_color("", ""), "#666");
    }

    #[test]
    fn long_initiatives_are_truncated() {
        let mut long = item("Medium", "Medium");
        long.initiative = "Customer 360 data unification program".into();
        let svg = render(&[long], &DiscoveryRecord::default());
        assert!(svg.contains(">Customer 360 data un</text>"));
    }
}
