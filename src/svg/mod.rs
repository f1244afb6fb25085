//! Deterministic SVG rendering of generated artifacts.
//!
//! Four renderers turn sections of an [`ArtifactBundle`] into standalone SVG
//! documents on fixed canvases:
//!
//! | Kind | Canvas | Module |
//! |------|--------|--------|
//! | capability map | 1400×1000 | [`capability_map`] |
//! | current/future state | 1400×900 | [`pace_layer`] |
//! | prioritization matrix | 1200×900 | [`matrix`] |
//! | roadmap | 1400×800 | [`roadmap`] |
//!
//! Layout is a pure function of the input: no dates, no randomness, so the
//! same bundle always renders to the same bytes. All text passes through
//! [`escape_xml`].

pub mod capability_map;
pub mod matrix;
pub mod pace_layer;
pub mod roadmap;

use std::fmt;
use std::str::FromStr;

use crate::export::file_stem;
use crate::models::{ArtifactBundle, DiscoveryRecord};

pub const FONT_FAMILY: &str = "Arial, sans-serif";
pub const FOOTER: &str = "Generated by Salesforce EA Discovery Assistant";

/// Greedy word wrap on whitespace.
///
/// Words are never split; a word longer than `width` sits alone on its line.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len <= width {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// First `max` characters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// Styling for a `<text>` element.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TextStyle {
    pub size: u32,
    pub bold: bool,
    pub centered: bool,
    pub fill: &'static str,
}

impl TextStyle {
    pub const fn new(size: u32, fill: &'static str) -> Self {
        Self {
            size,
            bold: false,
            centered: false,
            fill,
        }
    }

    pub const fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub const fn centered(mut self) -> Self {
        self.centered = true;
        self
    }
}

/// Markup accumulator for one document.
pub(crate) struct SvgDoc {
    buf: String,
}

impl SvgDoc {
    /// Open a document with the XML prolog and a light background.
    pub fn new(width: u32, height: u32) -> Self {
        let mut buf = String::new();
        buf.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        buf.push_str(&format!(
            "<svg width=\"{width}\" height=\"{height}\" xmlns=\"http://www.w3.org/2000/svg\">\n"
        ));
        let mut doc = Self { buf };
        doc.element(format!(
            "<rect width=\"{width}\" height=\"{height}\" fill=\"#f8f9fa\"/>"
        ));
        doc
    }

    /// Append a pre-built element on its own line.
    pub fn element(&mut self, markup: impl AsRef<str>) {
        self.buf.push_str("  ");
        self.buf.push_str(markup.as_ref());
        self.buf.push('\n');
    }

    /// Append a `<text>` element; `content` is escaped here.
    pub fn text(&mut self, x: f64, y: f64, style: TextStyle, content: &str) {
        self.text_with(x, y, style, "", content);
    }

    /// Like [`SvgDoc::text`] with extra raw attributes.
    pub fn text_with(&mut self, x: f64, y: f64, style: TextStyle, extra: &str, content: &str) {
        let mut attrs = format!(
            "x=\"{x}\" y=\"{y}\" font-family=\"{FONT_FAMILY}\" font-size=\"{}\"",
            style.size
        );
        if style.bold {
            attrs.push_str(" font-weight=\"bold\"");
        }
        if style.centered {
            attrs.push_str(" text-anchor=\"middle\"");
        }
        attrs.push_str(&format!(" fill=\"{}\"", style.fill));
        if !extra.is_empty() {
            attrs.push(' ');
            attrs.push_str(extra);
        }
        self.element(format!("<text {attrs}>{}</text>", escape_xml(content)));
    }

    pub fn finish(mut self) -> String {
        self.buf.push_str("</svg>\n");
        self.buf
    }
}

/// The downloadable diagrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramKind {
    CapabilityMap,
    CurrentState,
    FutureState,
    PrioritizationMatrix,
    Roadmap,
}

impl DiagramKind {
    pub const ALL: [DiagramKind; 5] = [
        DiagramKind::CapabilityMap,
        DiagramKind::CurrentState,
        DiagramKind::FutureState,
        DiagramKind::PrioritizationMatrix,
        DiagramKind::Roadmap,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            DiagramKind::CapabilityMap => "capability-map",
            DiagramKind::CurrentState => "current-state",
            DiagramKind::FutureState => "future-state",
            DiagramKind::PrioritizationMatrix => "prioritization-matrix",
            DiagramKind::Roadmap => "roadmap",
        }
    }

    /// Download filename, e.g. `Acme-Corp-roadmap.svg`.
    pub fn filename(self, company_name: &str) -> String {
        format!("{}-{}.svg", file_stem(company_name), self.slug())
    }

    /// Render this diagram, or `None` when its section is absent.
    pub fn render(self, bundle: &ArtifactBundle, discovery: &DiscoveryRecord) -> Option<String> {
        match self {
            DiagramKind::CapabilityMap => bundle
                .capability_map
                .as_ref()
                .map(|map| capability_map::render(map, discovery)),
            DiagramKind::CurrentState => bundle
                .current_state_architecture
                .as_ref()
                .map(|arch| pace_layer::render(arch, true, discovery)),
            DiagramKind::FutureState => bundle
                .future_state_architecture
                .as_ref()
                .map(|arch| pace_layer::render(arch, false, discovery)),
            DiagramKind::PrioritizationMatrix => bundle
                .prioritization_matrix
                .as_deref()
                .map(|items| matrix::render(items, discovery)),
            DiagramKind::Roadmap => bundle
                .strategic_roadmap
                .as_deref()
                .map(|phases| roadmap::render(phases, discovery)),
        }
    }
}

impl fmt::Display for DiagramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for DiagramKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiagramKind::ALL
            .into_iter()
            .find(|k| k.slug() == s)
            .ok_or_else(|| format!("unknown diagram kind: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_never_exceeds_width_except_long_words() {
        let text = "Improve dealer visibility across regional distribution centers with supercalifragilisticexpialidocious tooling";
        for width in [5, 10, 25, 40] {
            for line in wrap_text(text, width) {
                let n = line.chars().count();
                assert!(
                    n <= width || !line.contains(' '),
                    "line {line:?} exceeds {width}"
                );
            }
        }
    }

    #[test]
    fn wrap_packs_greedily() {
        assert_eq!(
            wrap_text("one two three four", 9),
            vec!["one two", "three", "four"]
        );
        assert_eq!(wrap_text("exactly nine", 12), vec!["exactly nine"]);
        assert!(wrap_text("   ", 10).is_empty());
    }

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape_xml("R&D <\"core\"> 'ops'"),
            "R&amp;D &lt;&quot;core&quot;&gt; &apos;ops&apos;"
        );
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars("ab", 10), "ab");
    }

    #[test]
    fn kinds_round_trip_through_slugs() {
        for kind in DiagramKind::ALL {
            assert_eq!(kind.slug().parse::<DiagramKind>(), Ok(kind));
        }
        assert!("gantt".parse::<DiagramKind>().is_err());
        assert_eq!(
            DiagramKind::Roadmap.filename("Acme  Corp"),
            "Acme-Corp-roadmap.svg"
        );
    }

    #[test]
    fn missing_sections_render_nothing() {
        let bundle = ArtifactBundle::default();
        let discovery = DiscoveryRecord::default();
        for kind in DiagramKind::ALL {
            assert!(kind.render(&bundle, &discovery).is_none(), "{kind}");
        }
        let normalized = bundle.normalized();
        for kind in DiagramKind::ALL {
            assert!(kind.render(&normalized, &discovery).is_some(), "{kind}");
        }
    }
}
