use crate::core::markdown::escape_html;
use crate::domain::model::BookSummary;
use crate::domain::ports::{BookSource, Storage};
use crate::utils::error::Result;

const TITLE_RULE_WIDTH: usize = 50;
const SECTION_RULE_WIDTH: usize = 30;

/// Plain text of the whole book in reading order, with a title header and a
/// rule between sections. Sections that fail to load are skipped.
pub async fn export_book_text<B: BookSource>(book: &B) -> String {
    let mut text = String::new();

    if !book.title().is_empty() {
        text.push_str(book.title());
        text.push('\n');
        if let Some(author) = book.author() {
            text.push_str(&format!("by {}\n", author));
        }
        text.push('\n');
        text.push_str(&"=".repeat(TITLE_RULE_WIDTH));
        text.push_str("\n\n");
    }

    let count = book.section_count();
    for index in 0..count {
        match book.load_section_text(index).await {
            Ok(section) => {
                let section = section.trim();
                if !section.is_empty() {
                    text.push_str(section);
                    text.push_str("\n\n");
                }
            }
            Err(e) => tracing::warn!("Could not load section {}: {}", index + 1, e),
        }

        if index + 1 < count {
            text.push_str(&"─".repeat(SECTION_RULE_WIDTH));
            text.push_str("\n\n");
        }
    }

    text
}

/// Standalone HTML page with the book summary followed by each chapter's.
pub fn summary_document_html(summary: &BookSummary) -> String {
    let title = escape_html(&summary.book_title);
    let mut html = format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title} - Summary</title>\n</head>\n<body>\n<h1>{title}</h1>\n"
    );
    html.push_str("<section class=\"book-summary\">\n");
    html.push_str(&summary.summary_html);
    html.push_str("\n</section>\n<section class=\"chapter-summaries\">\n<h1>Chapters</h1>\n");
    for chapter in &summary.chapters {
        html.push_str(&format!(
            "<article>\n<h2>{}</h2>\n{}\n</article>\n",
            escape_html(&chapter.title),
            crate::core::markdown::render(&chapter.summary_markdown)
        ));
    }
    html.push_str("</section>\n</body>\n</html>\n");
    html
}

pub fn summary_document_markdown(summary: &BookSummary) -> String {
    let mut markdown = format!(
        "# {}\n\n_Generated {}_\n\n{}\n\n# Chapters\n",
        summary.book_title,
        summary.generated_at.format("%Y-%m-%d %H:%M UTC"),
        summary.summary_markdown.trim()
    );
    for chapter in &summary.chapters {
        markdown.push_str(&format!(
            "\n## {}\n\n{}\n",
            chapter.title,
            chapter.summary_markdown.trim()
        ));
    }
    markdown
}

/// Writes `<stem>-summary.{md,html,json}` and returns the file names.
pub async fn save_book_summary<S: Storage>(
    storage: &S,
    stem: &str,
    summary: &BookSummary,
) -> Result<Vec<String>> {
    let files = vec![
        (format!("{stem}-summary.md"), summary_document_markdown(summary)),
        (format!("{stem}-summary.html"), summary_document_html(summary)),
        (
            format!("{stem}-summary.json"),
            serde_json::to_string_pretty(summary)?,
        ),
    ];

    let mut written = Vec::with_capacity(files.len());
    for (name, content) in files {
        tracing::debug!("Writing {} ({} bytes)", name, content.len());
        storage.write_file(&name, content.as_bytes()).await?;
        written.push(name);
    }
    Ok(written)
}
