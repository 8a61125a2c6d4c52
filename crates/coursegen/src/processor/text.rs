use std::sync::LazyLock;

use regex::Regex;
use serde_json::{json, Map, Value};

use crate::content::{ParsedContent, Section, SectionKind};
use crate::error::ParseError;
use crate::job::SourceType;
use crate::processor::SourceParser;

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+?)\s*#*\s*$").expect("valid heading regex"));

const BOM: char = '\u{feff}';

/// Plain text and Markdown. ATX headings become sections: `#` a module,
/// `##` a lesson, anything deeper a plain section.
pub struct TextParser;

impl TextParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TextParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceParser for TextParser {
    fn parse(
        &self,
        bytes: &[u8],
        source_type: SourceType,
        filename: &str,
    ) -> Result<ParsedContent, ParseError> {
        let text = std::str::from_utf8(bytes)?;
        let text = text.trim_start_matches(BOM);

        if text.trim().is_empty() {
            return Err(ParseError::EmptyContent {
                filename: filename.to_string(),
            });
        }

        let sections = split_sections(text);

        let mut metadata = Map::new();
        metadata.insert("filename".into(), json!(filename));
        metadata.insert("source_type".into(), json!(source_type.as_str()));
        metadata.insert("line_count".into(), json!(text.lines().count()));
        if let Some(title) = sections
            .iter()
            .find(|s| s.kind == SectionKind::Module && !s.title.is_empty())
            .map(|s| s.title.clone())
        {
            metadata.insert("title".into(), Value::String(title));
        }

        Ok(ParsedContent {
            raw_text: text.to_string(),
            sections,
            metadata,
        })
    }

    fn supports(&self, source_type: SourceType) -> bool {
        matches!(source_type, SourceType::Text | SourceType::Markdown)
    }
}

fn kind_for_level(level: usize) -> SectionKind {
    match level {
        1 => SectionKind::Module,
        2 => SectionKind::Lesson,
        _ => SectionKind::Section,
    }
}

fn split_sections(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current: Option<(SectionKind, String)> = None;
    let mut body: Vec<&str> = Vec::new();
    let mut in_fence = false;

    let flush = |sections: &mut Vec<Section>, head: Option<(SectionKind, String)>, body: &[&str]| {
        let content = body.join("\n").trim().to_string();
        match head {
            Some((kind, title)) => sections.push(Section::new(kind, title, content)),
            // Text before the first heading.
            None if !content.is_empty() => {
                sections.push(Section::new(SectionKind::Section, "", content))
            }
            None => {}
        }
    };

    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }
        let heading = if in_fence {
            None
        } else {
            HEADING_RE.captures(line)
        };
        match heading {
            Some(caps) => {
                flush(&mut sections, current.take(), &body);
                body.clear();
                current = Some((kind_for_level(caps[1].len()), caps[2].to_string()));
            }
            None => body.push(line),
        }
    }
    flush(&mut sections, current, &body);

    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str, source_type: SourceType) -> Result<ParsedContent, ParseError> {
        TextParser::new().parse(text.as_bytes(), source_type, "outline.md")
    }

    #[test]
    fn test_plain_text_is_single_section() {
        let parsed = parse("Just a paragraph\nabout borrowing.", SourceType::Text).unwrap();
        assert_eq!(parsed.sections.len(), 1);
        assert_eq!(parsed.sections[0].kind, SectionKind::Section);
        assert_eq!(parsed.sections[0].content, "Just a paragraph\nabout borrowing.");
        assert!(parsed.title_hint().is_none());
    }

    #[test]
    fn test_markdown_headings_become_sections() {
        let md = "Preface text\n\n# Ownership\nIntro\n## Moves\nBody\n### Detail\nMore\n# Lifetimes\n";
        let parsed = parse(md, SourceType::Markdown).unwrap();

        let kinds: Vec<_> = parsed.sections.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SectionKind::Section,
                SectionKind::Module,
                SectionKind::Lesson,
                SectionKind::Section,
                SectionKind::Module,
            ]
        );
        assert_eq!(parsed.sections[1].title, "Ownership");
        assert_eq!(parsed.sections[2].content, "Body");
        assert_eq!(parsed.sections[4].content, "");
        assert_eq!(parsed.title_hint(), Some("Ownership"));
    }

    #[test]
    fn test_headings_inside_code_fence_are_ignored() {
        let md = "# Shell\n```\n# not a heading\n```\n";
        let parsed = parse(md, SourceType::Markdown).unwrap();
        assert_eq!(parsed.sections.len(), 1);
        assert!(parsed.sections[0].content.contains("# not a heading"));
    }

    #[test]
    fn test_bom_is_stripped() {
        let parsed = parse("\u{feff}# Title\nx", SourceType::Markdown).unwrap();
        assert_eq!(parsed.sections[0].title, "Title");
        assert!(!parsed.raw_text.starts_with(BOM));
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert!(matches!(
            parse("  \n\t", SourceType::Text),
            Err(ParseError::EmptyContent { .. })
        ));
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        let result = TextParser::new().parse(&[0xff, 0xfe, 0x00], SourceType::Text, "bad.txt");
        assert!(matches!(result, Err(ParseError::InvalidEncoding(_))));
    }

    #[test]
    fn test_supports() {
        let parser = TextParser::new();
        assert!(parser.supports(SourceType::Text));
        assert!(parser.supports(SourceType::Markdown));
        assert!(!parser.supports(SourceType::Pdf));
        assert!(!parser.supports(SourceType::Topic));
    }
}
