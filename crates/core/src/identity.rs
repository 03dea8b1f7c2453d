//! Deterministic visual identity for a book: the instant fallback cover.
//!
//! The identity is a pure function of `(title, author)`: a 32-bit rolling hash
//! over the UTF-16 code units of `title + author` selects one of a fixed set of
//! palettes and patterns. No randomness, no clock, no I/O, so the same book
//! looks the same in every process and on every run.

use serde::Serialize;

/// Label shown (and hashed) when a book has no title.
pub const UNTITLED: &str = "제목 미정";
/// Label shown (and hashed) when a book has no author.
pub const UNKNOWN_AUTHOR: &str = "작자 미상";

/// Gradient colours for a fallback cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub from: &'static str,
    pub to: &'static str,
    pub text: &'static str,
}

/// A 20x20 SVG tile overlaid on the gradient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pattern {
    pub name: &'static str,
    #[serde(skip)]
    pub tile: &'static str,
}

pub const PALETTES: [Palette; 10] = [
    Palette { from: "#ff9a9e", to: "#fecfef", text: "#5e3449" },
    Palette { from: "#a1c4fd", to: "#c2e9fb", text: "#2c3e50" },
    Palette { from: "#84fab0", to: "#8fd3f4", text: "#13547a" },
    Palette { from: "#f6d365", to: "#fda085", text: "#8c520a" },
    Palette { from: "#d4fc79", to: "#96e6a1", text: "#2c522c" },
    Palette { from: "#c3a3f4", to: "#fbc2eb", text: "#4a2c52" },
    Palette { from: "#fccb90", to: "#d57eeb", text: "#522c4a" },
    Palette { from: "#48c6ef", to: "#6f86d6", text: "#073352" },
    Palette { from: "#ff758c", to: "#ff7eb3", text: "#6d1839" },
    Palette { from: "#56ab2f", to: "#a8e063", text: "#193a0d" },
];

pub const PATTERNS: [Pattern; 3] = [
    Pattern {
        name: "cross",
        tile: r##"<path fill="#FFFFFF" fill-opacity="0.3" d="M2 9h6V3h2v6h6v2H10v6H8V11H2V9z"/>"##,
    },
    Pattern {
        name: "dots",
        tile: r##"<g fill="#FFFFFF" fill-opacity="0.3" fill-rule="evenodd"><circle cx="3" cy="3" r="3"/><circle cx="13" cy="13" r="3"/></g>"##,
    },
    Pattern {
        name: "triangles",
        tile: r##"<path fill="#FFFFFF" fill-opacity="0.3" d="M0 0h20L0 20zM20 20H0L20 0z"/>"##,
    },
];

/// Indices into [`PALETTES`] and [`PATTERNS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct VisualIdentity {
    pub palette_index: usize,
    pub pattern_index: usize,
}

impl VisualIdentity {
    pub fn palette(&self) -> &'static Palette {
        &PALETTES[self.palette_index]
    }

    pub fn pattern(&self) -> &'static Pattern {
        &PATTERNS[self.pattern_index]
    }
}

/// `h = h * 31 + unit` over UTF-16 code units with 32-bit wraparound, then
/// the absolute value. The empty string hashes to 0.
pub fn string_hash<'a>(parts: impl IntoIterator<Item = &'a str>) -> u32 {
    let mut h: i32 = 0;
    for part in parts {
        for unit in part.encode_utf16() {
            h = h.wrapping_mul(31).wrapping_add(i32::from(unit));
        }
    }
    h.unsigned_abs()
}

/// Map a `(title, author)` pair to its visual identity. Pure and total.
pub fn identity_of(title: &str, author: &str) -> VisualIdentity {
    let h = string_hash([title, author]);
    VisualIdentity {
        palette_index: (h % PALETTES.len() as u32) as usize,
        pattern_index: (h % PATTERNS.len() as u32) as usize,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverSize {
    Small,
    #[default]
    Large,
}

impl CoverSize {
    fn dimensions(self) -> (u32, u32) {
        match self {
            CoverSize::Small => (56, 80),
            CoverSize::Large => (192, 288),
        }
    }

    fn tile(self) -> u32 {
        match self {
            CoverSize::Small => 10,
            CoverSize::Large => 20,
        }
    }
}

/// The fallback visual for one book: display labels plus identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackCover {
    pub title: String,
    pub author: String,
    pub identity: VisualIdentity,
}

impl FallbackCover {
    /// Empty labels are replaced by [`UNTITLED`] / [`UNKNOWN_AUTHOR`] before
    /// hashing, so untitled books still get a stable, labelled cover.
    pub fn new(title: &str, author: &str) -> Self {
        let title = if title.is_empty() { UNTITLED } else { title };
        let author = if author.is_empty() { UNKNOWN_AUTHOR } else { author };
        Self {
            title: title.to_string(),
            author: author.to_string(),
            identity: identity_of(title, author),
        }
    }

    pub fn palette(&self) -> &'static Palette {
        self.identity.palette()
    }

    pub fn pattern(&self) -> &'static Pattern {
        self.identity.pattern()
    }

    /// Standalone SVG document: gradient, pattern overlay, spine shade, labels.
    pub fn render_svg(&self, size: CoverSize) -> String {
        let (w, h) = size.dimensions();
        let tile = size.tile();
        let palette = self.palette();
        let (title_px, author_px) = match size {
            CoverSize::Small => (10, 8),
            CoverSize::Large => (18, 14),
        };
        let spine = (w as f32 * 0.04).round() as u32;
        let cx = w / 2;
        let cy = h / 2;

        let mut svg = String::with_capacity(1024);
        svg.push_str(&format!(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"##
        ));
        svg.push_str("<defs>");
        svg.push_str(&format!(
            r##"<linearGradient id="bg" x1="0" y1="0" x2="1" y2="1"><stop offset="0%" stop-color="{}"/><stop offset="100%" stop-color="{}"/></linearGradient>"##,
            palette.from, palette.to
        ));
        svg.push_str(&format!(
            r##"<pattern id="tile" width="{tile}" height="{tile}" patternUnits="userSpaceOnUse"><svg width="{tile}" height="{tile}" viewBox="0 0 20 20">{}</svg></pattern>"##,
            self.pattern().tile
        ));
        svg.push_str("</defs>");
        svg.push_str(r##"<rect width="100%" height="100%" fill="url(#bg)"/>"##);
        svg.push_str(r##"<rect width="100%" height="100%" fill="url(#tile)" opacity="0.3"/>"##);
        svg.push_str(&format!(
            r##"<rect width="{spine}" height="100%" fill="#000000" fill-opacity="0.1"/>"##
        ));
        svg.push_str(&format!(
            r##"<text x="{cx}" y="{cy}" text-anchor="middle" font-weight="bold" font-size="{title_px}" fill="{}">{}</text>"##,
            palette.text,
            xml_escape(&self.title)
        ));
        svg.push_str(&format!(
            r##"<text x="{cx}" y="{}" text-anchor="middle" font-size="{author_px}" fill="{}" fill-opacity="0.9">{}</text>"##,
            cy + title_px + 4,
            palette.text,
            xml_escape(&self.author)
        ));
        svg.push_str("</svg>");
        svg
    }
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
