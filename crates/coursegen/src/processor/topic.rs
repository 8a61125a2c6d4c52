use serde_json::{json, Map};

use crate::content::{ParsedContent, Section, SectionKind};
use crate::error::ParseError;
use crate::job::SourceType;
use crate::processor::SourceParser;

/// A bare topic string. Produces one section that the transformer expands.
pub struct TopicParser;

impl TopicParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TopicParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceParser for TopicParser {
    fn parse(
        &self,
        bytes: &[u8],
        _source_type: SourceType,
        filename: &str,
    ) -> Result<ParsedContent, ParseError> {
        let topic = std::str::from_utf8(bytes)?.trim();
        if topic.is_empty() {
            return Err(ParseError::EmptyContent {
                filename: filename.to_string(),
            });
        }

        let mut metadata = Map::new();
        metadata.insert("title".into(), json!(topic));
        metadata.insert("source_type".into(), json!(SourceType::Topic.as_str()));

        Ok(ParsedContent {
            raw_text: topic.to_string(),
            sections: vec![Section::new(SectionKind::Section, topic, topic)],
            metadata,
        })
    }

    fn supports(&self, source_type: SourceType) -> bool {
        source_type == SourceType::Topic
    }
}
