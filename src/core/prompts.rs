/// Placeholders: `{title}`, `{text}`.
pub const DEFAULT_CHAPTER_PROMPT: &str = "\
Summarize the following chapter titled \"{title}\".

Write the summary in Markdown using only these elements: `##` and `###` headings, \
**bold**, *italic*, `-` bullet lists, `1.` numbered lists (nest with two spaces) \
and plain paragraphs separated by blank lines. Do not use tables, code blocks or links.

Cover the main events or arguments, the key people or concepts, and why the chapter \
matters to the rest of the book. Keep it under 300 words.

Chapter text:
{text}";

/// Placeholders: `{title}`, `{summaries}`.
pub const DEFAULT_BOOK_PROMPT: &str = "\
Below are summaries of every chapter of the book \"{title}\", in reading order.

Write a summary of the whole book in Markdown using only these elements: `##` and \
`###` headings, **bold**, *italic*, `-` bullet lists, `1.` numbered lists (nest with \
two spaces) and plain paragraphs separated by blank lines. Do not use tables, code \
blocks or links.

Start with a short overview, then the main themes, then the key takeaways.

Chapter summaries:
{summaries}";

pub fn chapter_prompt(template: Option<&str>, title: &str, text: &str) -> String {
    // text last so placeholders inside the chapter body are left alone
    template
        .unwrap_or(DEFAULT_CHAPTER_PROMPT)
        .replace("{title}", title)
        .replace("{text}", text)
}

pub fn book_prompt(template: Option<&str>, title: &str, summaries: &str) -> String {
    template
        .unwrap_or(DEFAULT_BOOK_PROMPT)
        .replace("{title}", title)
        .replace("{summaries}", summaries)
}

/// Cuts `text` to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chapter_prompt_fills_placeholders() {
        let prompt = chapter_prompt(None, "The Storm", "Rain fell.");
        assert!(prompt.contains("\"The Storm\""));
        assert!(prompt.ends_with("Rain fell."));
        assert!(!prompt.contains("{text}"));
    }

    #[test]
    fn test_custom_template() {
        let prompt = book_prompt(Some("Book {title}: {summaries}"), "Dune", "**One**\nsand");
        assert_eq!(prompt, "Book Dune: **One**\nsand");
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 100), "short");
        assert_eq!(truncate_chars("", 3), "");
    }
}
