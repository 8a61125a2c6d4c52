//! Builders for test inputs.

#![allow(dead_code)]

use std::time::Duration;

use coursegen::PipelineConfig;

/// Builds a Markdown outline. `#` headings are modules, `##` headings lessons.
#[derive(Default)]
pub struct OutlineBuilder {
    text: String,
}

impl OutlineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a module whose body is `body_chars` characters of filler.
    pub fn module(mut self, title: &str, body_chars: usize) -> Self {
        self.push_heading("#", title);
        self.text.push_str(&filler(body_chars));
        self.text.push('\n');
        self
    }

    pub fn lesson(mut self, title: &str, body: &str) -> Self {
        self.push_heading("##", title);
        self.text.push_str(body);
        self.text.push('\n');
        self
    }

    pub fn exercise(mut self, title: &str, body: &str) -> Self {
        self.push_heading("###", title);
        self.text.push_str(body);
        self.text.push('\n');
        self
    }

    pub fn build(self) -> String {
        self.text
    }

    fn push_heading(&mut self, marks: &str, title: &str) {
        if !self.text.is_empty() {
            self.text.push('\n');
        }
        self.text.push_str(marks);
        self.text.push(' ');
        self.text.push_str(title);
        self.text.push('\n');
    }
}

/// Filler text of exactly `n` characters, without whitespace.
pub fn filler(n: usize) -> String {
    "abcdefghij".chars().cycle().take(n).collect()
}

/// Builder for `PipelineConfig` instances.
pub struct ConfigBuilder {
    config: PipelineConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    pub fn max_chunk_chars(mut self, chars: usize) -> Self {
        self.config.max_chunk_chars = chars;
        self
    }

    pub fn max_concurrent_chunks(mut self, n: usize) -> Self {
        self.config.max_concurrent_chunks = n;
        self
    }

    pub fn chunk_timeout(mut self, timeout: Duration) -> Self {
        self.config.chunk_timeout = timeout;
        self
    }

    pub fn require_review(mut self, require: bool) -> Self {
        self.config.require_review = require;
        self
    }

    pub fn build(self) -> PipelineConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
