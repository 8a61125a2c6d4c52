//! Stage 1 parsers. Format-specific parsers (PDF, DOCX, course packages)
//! are supplied by the embedding application through [`ParserRegistry::register`].

pub mod text;
pub mod topic;

use crate::content::ParsedContent;
use crate::error::ParseError;
use crate::job::SourceType;

pub trait SourceParser: Send + Sync {
    fn parse(
        &self,
        bytes: &[u8],
        source_type: SourceType,
        filename: &str,
    ) -> Result<ParsedContent, ParseError>;

    fn supports(&self, source_type: SourceType) -> bool;
}

pub struct ParserRegistry {
    parsers: Vec<Box<dyn SourceParser>>,
}

impl ParserRegistry {
    /// Registry with the built-in text/Markdown and topic parsers.
    pub fn new() -> Self {
        Self {
            parsers: vec![
                Box::new(text::TextParser::new()),
                Box::new(topic::TopicParser::new()),
            ],
        }
    }

    /// Registers a parser ahead of the existing ones, so it wins for the
    /// source types it supports.
    pub fn register(&mut self, parser: Box<dyn SourceParser>) {
        self.parsers.insert(0, parser);
    }

    pub fn supports(&self, source_type: SourceType) -> bool {
        self.parsers.iter().any(|p| p.supports(source_type))
    }

    pub fn parse(
        &self,
        bytes: &[u8],
        source_type: SourceType,
        filename: &str,
    ) -> Result<ParsedContent, ParseError> {
        for parser in &self.parsers {
            if parser.supports(source_type) {
                return parser.parse(bytes, source_type, filename);
            }
        }

        Err(ParseError::UnsupportedFormat(source_type.to_string()))
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Section, SectionKind};

    struct FakePdfParser;

    impl SourceParser for FakePdfParser {
        fn parse(
            &self,
            _bytes: &[u8],
            _source_type: SourceType,
            filename: &str,
        ) -> Result<ParsedContent, ParseError> {
            Ok(ParsedContent {
                raw_text: format!("pdf:{}", filename),
                sections: vec![Section::new(SectionKind::Section, "Page 1", "text")],
                metadata: Default::default(),
            })
        }

        fn supports(&self, source_type: SourceType) -> bool {
            source_type == SourceType::Pdf
        }
    }

    #[test]
    fn test_registry_routes_markdown() {
        let registry = ParserRegistry::new();
        let parsed = registry
            .parse(b"# Course\nIntro", SourceType::Markdown, "outline.md")
            .unwrap();
        assert_eq!(parsed.sections[0].kind, SectionKind::Module);
    }

    #[test]
    fn test_unsupported_format_error() {
        let registry = ParserRegistry::new();
        assert!(!registry.supports(SourceType::Pdf));

        match registry.parse(b"%PDF-1.7", SourceType::Pdf, "deck.pdf") {
            Err(ParseError::UnsupportedFormat(kind)) => assert_eq!(kind, "pdf"),
            other => panic!("Expected UnsupportedFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_registered_parser_is_used() {
        let mut registry = ParserRegistry::new();
        registry.register(Box::new(FakePdfParser));

        let parsed = registry
            .parse(b"%PDF-1.7", SourceType::Pdf, "deck.pdf")
            .unwrap();
        assert_eq!(parsed.raw_text, "pdf:deck.pdf");
        assert!(registry.supports(SourceType::Text));
    }
}
