use crate::domain::model::ChapterRef;
use crate::domain::ports::BookSource;
use crate::utils::error::{DigestError, Result};
use async_trait::async_trait;
use std::collections::HashMap;

/// A book assembled from in-memory chapter texts.
#[derive(Debug, Clone, Default)]
pub struct MemoryBook {
    title: String,
    author: Option<String>,
    toc: Vec<ChapterRef>,
    texts: HashMap<String, String>,
    // hrefs in reading order
    sections: Vec<String>,
}

impl MemoryBook {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    fn add_section(&mut self, text: impl Into<String>) -> String {
        let href = format!("section-{}.xhtml", self.sections.len() + 1);
        self.texts.insert(href.clone(), text.into());
        self.sections.push(href.clone());
        href
    }

    pub fn with_chapter(mut self, label: impl Into<String>, text: impl Into<String>) -> Self {
        let href = self.add_section(text);
        self.toc.push(ChapterRef::new(label, href));
        self
    }

    /// Adds a nested entry under the top-level chapter named `parent`.
    /// Ignored when no such chapter exists.
    pub fn with_subchapter(
        mut self,
        parent: &str,
        label: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        if self.toc.iter().any(|c| c.label == parent) {
            let href = self.add_section(text);
            if let Some(chapter) = self.toc.iter_mut().find(|c| c.label == parent) {
                chapter.children.push(ChapterRef::new(label, href));
            }
        }
        self
    }
}

#[async_trait]
impl BookSource for MemoryBook {
    fn title(&self) -> &str {
        &self.title
    }

    fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    fn table_of_contents(&self) -> &[ChapterRef] {
        &self.toc
    }

    async fn load_chapter_text(&self, href: &str) -> Result<String> {
        self.texts
            .get(href)
            .cloned()
            .ok_or_else(|| DigestError::ChapterNotFound {
                selector: href.to_string(),
            })
    }

    fn section_count(&self) -> usize {
        self.sections.len()
    }

    async fn load_section_text(&self, index: usize) -> Result<String> {
        let href = self
            .sections
            .get(index)
            .ok_or_else(|| DigestError::ChapterNotFound {
                selector: format!("section {}", index + 1),
            })?;
        self.load_chapter_text(href).await
    }
}
