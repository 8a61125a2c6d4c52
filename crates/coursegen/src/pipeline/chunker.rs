//! Splits parsed content into bounded chunks at module boundaries.

use crate::content::{ParsedContent, Section, SectionKind};

pub const DEFAULT_MAX_CHUNK_CHARS: usize = 12_000;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContentChunk {
    pub sections: Vec<Section>,
    pub char_count: usize,
    pub text: String,
}

impl ContentChunk {
    fn push(&mut self, section: Section) {
        self.char_count += section.char_count();
        if !self.text.is_empty() {
            self.text.push_str("\n\n");
        }
        if !section.title.is_empty() {
            self.text.push_str(&section.title);
            self.text.push('\n');
        }
        self.text.push_str(&section.content);
        self.sections.push(section);
    }

    fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Splits `parsed` into chunks.
///
/// A new chunk starts only at a `module` section, and only once the running
/// chunk holds more than `max_chars / 2` characters. Sections are never
/// split, so a chunk may exceed `max_chars`. Content below `max_chars`, or
/// without sections, yields a single chunk.
pub fn chunk_content(parsed: &ParsedContent, max_chars: usize) -> Vec<ContentChunk> {
    if parsed.sections.is_empty() || parsed.total_chars() < max_chars {
        return vec![ContentChunk {
            sections: parsed.sections.clone(),
            char_count: parsed.total_chars(),
            text: parsed.raw_text.clone(),
        }];
    }

    let threshold = max_chars / 2;
    let mut chunks = Vec::new();
    let mut current = ContentChunk::default();

    for section in &parsed.sections {
        if section.kind == SectionKind::Module
            && current.char_count > threshold
            && !current.is_empty()
        {
            chunks.push(std::mem::take(&mut current));
        }
        current.push(section.clone());
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
