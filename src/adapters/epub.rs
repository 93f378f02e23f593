use crate::domain::model::ChapterRef;
use crate::domain::ports::BookSource;
use crate::utils::error::{DigestError, Result};
use async_trait::async_trait;
use ::epub::doc::{EpubDoc, NavPoint};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Line width handed to html2text; wide enough that prose is not re-wrapped.
const TEXT_WIDTH: usize = 10_000;

/// An EPUB file opened from disk.
pub struct EpubBook {
    title: String,
    author: Option<String>,
    toc: Vec<ChapterRef>,
    spine_ids: Vec<String>,
    doc: Mutex<EpubDoc<BufReader<File>>>,
}

impl EpubBook {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut doc = EpubDoc::new(path).map_err(|e| DigestError::BookError {
            message: format!("{}: {:?}", path.display(), e),
        })?;

        let toc: Vec<ChapterRef> = doc.toc.iter().map(chapter_from_nav).collect();

        let mut spine_ids = Vec::new();
        loop {
            if let Some(id) = doc.get_current_id() {
                spine_ids.push(id);
            }
            if !doc.go_next() {
                break;
            }
        }

        let title = title_or_stem(doc.get_title(), path);
        let author = non_blank(doc.mdata("creator").map(|item| item.value.clone()));

        tracing::debug!(
            "Opened '{}': {} TOC entries, {} spine items",
            title,
            toc.len(),
            spine_ids.len()
        );

        Ok(Self {
            title,
            author,
            toc,
            spine_ids,
            doc: Mutex::new(doc),
        })
    }

    fn doc(&self) -> Result<MutexGuard<'_, EpubDoc<BufReader<File>>>> {
        self.doc.lock().map_err(|_| DigestError::BookError {
            message: "book reader is unavailable after an earlier failure".to_string(),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Metadata title, or the file name without extension when the book has none.
fn title_or_stem(metadata_title: Option<String>, path: &Path) -> String {
    non_blank(metadata_title).unwrap_or_else(|| {
        path.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Untitled".to_string())
    })
}

fn chapter_from_nav(nav: &NavPoint) -> ChapterRef {
    ChapterRef {
        label: nav.label.trim().to_string(),
        href: nav.content.to_string_lossy().into_owned(),
        children: nav.children.iter().map(chapter_from_nav).collect(),
    }
}

/// Archive path of a TOC href, without the `#fragment`.
fn resource_path(href: &str) -> &str {
    href.split('#').next().unwrap_or(href)
}

fn html_to_text(html: &str) -> Result<String> {
    html2text::from_read(html.as_bytes(), TEXT_WIDTH).map_err(|e| DigestError::BookError {
        message: format!("could not extract text: {}", e),
    })
}

#[async_trait]
impl BookSource for EpubBook {
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
        let html = self
            .doc()?
            .get_resource_str_by_path(resource_path(href))
            .ok_or_else(|| DigestError::ChapterNotFound {
                selector: href.to_string(),
            })?;
        html_to_text(&html)
    }

    fn section_count(&self) -> usize {
        self.spine_ids.len()
    }

    async fn load_section_text(&self, index: usize) -> Result<String> {
        let id = self
            .spine_ids
            .get(index)
            .ok_or_else(|| DigestError::ChapterNotFound {
                selector: format!("section {}", index + 1),
            })?;
        let (content, mimetype) =
            self.doc()?
                .get_resource_str(id)
                .ok_or_else(|| DigestError::ChapterNotFound {
                    selector: id.clone(),
                })?;

        match mimetype.as_str() {
            "application/xhtml+xml" | "text/html" => html_to_text(&content),
            other => {
                tracing::debug!("Skipping section '{}' with MIME type {}", id, other);
                Ok(String::new())
            }
        }
    }
}
