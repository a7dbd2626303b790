use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxKind {
    HtmlTag,
    MarkdownInline,
}

impl SyntaxKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HtmlTag => "html",
            Self::MarkdownInline => "markdown",
        }
    }
}

/// One parsed image construct on a line. `source_locator` is `None` for an
/// `<img>` tag without a `src` attribute; callers must leave such lines
/// untouched for that syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub syntax: SyntaxKind,
    pub source_locator: Option<String>,
    pub alt_text: Option<String>,
    pub width: Option<String>,
    pub raw_match: String,
}

fn html_tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<img\b[^>]*>").expect("valid html image pattern"))
}

fn attribute_pattern(cell: &'static OnceLock<Regex>, name: &str) -> &'static Regex {
    cell.get_or_init(|| {
        Regex::new(&format!(r#"{name}="([^"]*)""#)).expect("valid attribute pattern")
    })
}

fn markdown_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"!\[([^\]]*)\]\(([^)]+)\)").expect("valid markdown pattern"))
}

/// Match the first `<img ...>` tag on the line, then re-match the `src`,
/// `alt` and `width` attributes independently inside the tag.
pub fn html_image(line: &str) -> Option<ImageReference> {
    static SRC: OnceLock<Regex> = OnceLock::new();
    static ALT: OnceLock<Regex> = OnceLock::new();
    static WIDTH: OnceLock<Regex> = OnceLock::new();

    let tag = html_tag_pattern().find(line)?;
    let raw = tag.as_str();
    let capture = |cell: &'static OnceLock<Regex>, name: &str| {
        attribute_pattern(cell, name)
            .captures(raw)
            .map(|captures| captures[1].to_string())
    };

    Some(ImageReference {
        syntax: SyntaxKind::HtmlTag,
        source_locator: capture(&SRC, "src"),
        alt_text: capture(&ALT, "alt"),
        width: capture(&WIDTH, "width"),
        raw_match: raw.to_string(),
    })
}

/// Match the first `![alt](locator)` image on the line. Alt text may be
/// empty; the locator is mandatory by the syntax.
pub fn markdown_image(line: &str) -> Option<ImageReference> {
    let captures = markdown_pattern().captures(line)?;
    Some(ImageReference {
        syntax: SyntaxKind::MarkdownInline,
        source_locator: Some(captures[2].to_string()),
        alt_text: Some(captures[1].to_string()),
        width: None,
        raw_match: captures[0].to_string(),
    })
}

/// Extract at most one reference per syntax kind, HTML first. Both syntaxes
/// are matched independently against the original line content; a line may
/// yield one of each.
pub fn extract_references(line: &str) -> Vec<ImageReference> {
    let mut references = Vec::new();
    if let Some(reference) = html_image(line) {
        references.push(reference);
    }
    if let Some(reference) = markdown_image(line) {
        references.push(reference);
    }
    references
}

/// Rebuild the markup for a reference with a new locator, preserving the
/// original alt text and width.
pub fn render_reference(reference: &ImageReference, locator: &str) -> String {
    match reference.syntax {
        SyntaxKind::HtmlTag => {
            let mut output = format!("<img src=\"{locator}\"");
            if let Some(alt) = &reference.alt_text {
                output.push_str(&format!(" alt=\"{alt}\""));
            }
            if let Some(width) = &reference.width {
                output.push_str(&format!(" width=\"{width}\""));
            }
            output.push_str(" />");
            output
        }
        SyntaxKind::MarkdownInline => {
            let alt = reference.alt_text.as_deref().unwrap_or("");
            format!("![{alt}]({locator})")
        }
    }
}
