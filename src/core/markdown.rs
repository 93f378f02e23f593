//! Renderer for the small Markdown dialect the summarization prompts ask for.
//!
//! Supported: `##`/`###` headings, `**bold**`, `*italic*`, `-`/`*` bullets,
//! `N.` ordered items nested in steps of two spaces, and blank-line separated
//! paragraphs. Anything else is rendered as paragraph text.

use regex::Regex;
use std::sync::LazyLock;

static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([ \t]*)([-*]|\d+\.)\s+(.*)$").expect("valid list regex"));
static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid bold regex"));
static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*]+)\*").expect("valid italic regex"));

/// Columns of indentation per nesting level.
const INDENT_STEP: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    fn tag(self) -> &'static str {
        match self {
            ListKind::Unordered => "ul",
            ListKind::Ordered => "ol",
        }
    }
}

#[derive(Debug)]
struct OpenList {
    kind: ListKind,
    level: usize,
    item_open: bool,
}

#[derive(Debug)]
struct ListItem<'a> {
    level: usize,
    kind: ListKind,
    text: &'a str,
}

#[derive(Debug, Default)]
struct RenderState {
    output: String,
    pending_paragraph: String,
    // levels strictly increase from bottom to top
    open_lists: Vec<OpenList>,
}

/// Renders constrained Markdown into an HTML fragment.
pub fn render(markdown: &str) -> String {
    let mut state = RenderState::default();
    for line in markdown.lines() {
        state.push_line(line);
    }
    state.finish()
}

/// Applies bold then italic substitution to already-escaped text.
pub fn render_inline(text: &str) -> String {
    let escaped = escape_html(text);
    let bold = BOLD.replace_all(&escaped, "<strong>$1</strong>");
    ITALIC.replace_all(&bold, "<em>$1</em>").into_owned()
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn parse_heading(trimmed: &str) -> Option<(u8, &str)> {
    if let Some(text) = trimmed.strip_prefix("### ") {
        Some((3, text.trim()))
    } else {
        trimmed.strip_prefix("## ").map(|text| (2, text.trim()))
    }
}

fn parse_list_item(line: &str) -> Option<ListItem<'_>> {
    let caps = LIST_ITEM.captures(line)?;
    let indent: usize = caps[1]
        .chars()
        .map(|c| if c == '\t' { INDENT_STEP } else { 1 })
        .sum();
    let kind = if caps[2].ends_with('.') {
        ListKind::Ordered
    } else {
        ListKind::Unordered
    };
    let text = caps.get(3).map_or("", |m| m.as_str()).trim_end();
    Some(ListItem {
        level: indent / INDENT_STEP,
        kind,
        text,
    })
}

impl RenderState {
    fn push_line(&mut self, line: &str) {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            self.flush_paragraph();
            return;
        }

        if let Some((depth, text)) = parse_heading(trimmed) {
            self.close_all_lists();
            self.flush_paragraph();
            self.output
                .push_str(&format!("<h{depth}>{}</h{depth}>\n", render_inline(text)));
            return;
        }

        if let Some(item) = parse_list_item(line) {
            self.flush_paragraph();
            self.push_list_item(item);
            return;
        }

        if !self.open_lists.is_empty() {
            self.close_all_lists();
        }

        let inline = render_inline(trimmed);
        if !self.pending_paragraph.is_empty() {
            self.pending_paragraph.push(' ');
        }
        self.pending_paragraph.push_str(&inline);
    }

    fn push_list_item(&mut self, item: ListItem<'_>) {
        while self
            .open_lists
            .last()
            .is_some_and(|list| list.level > item.level)
        {
            self.close_top_list();
        }

        match self.open_lists.last_mut() {
            // a kind change at the same level stays in the open list
            Some(list) if list.level == item.level => {
                if list.item_open {
                    self.output.push_str("</li>\n");
                }
            }
            parent => {
                // a child list closed earlier already ended the line
                if parent.is_some_and(|p| p.item_open) && !self.output.ends_with('\n') {
                    self.output.push('\n');
                }
                self.output.push_str(&format!("<{}>\n", item.kind.tag()));
                self.open_lists.push(OpenList {
                    kind: item.kind,
                    level: item.level,
                    item_open: false,
                });
            }
        }

        self.output
            .push_str(&format!("<li>{}", render_inline(item.text)));
        if let Some(list) = self.open_lists.last_mut() {
            list.item_open = true;
        }
    }

    fn close_top_list(&mut self) {
        if let Some(list) = self.open_lists.pop() {
            if list.item_open {
                self.output.push_str("</li>\n");
            }
            self.output.push_str(&format!("</{}>\n", list.kind.tag()));
        }
    }

    fn close_all_lists(&mut self) {
        while !self.open_lists.is_empty() {
            self.close_top_list();
        }
    }

    fn flush_paragraph(&mut self) {
        if self.pending_paragraph.is_empty() {
            return;
        }
        self.output
            .push_str(&format!("<p>{}</p>\n", self.pending_paragraph));
        self.pending_paragraph.clear();
    }

    fn finish(mut self) -> String {
        self.close_all_lists();
        self.flush_paragraph();
        let len = self.output.trim_end().len();
        self.output.truncate(len);
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    fn assert_balanced(html: &str) {
        for tag in ["ul", "ol", "li", "p", "h2", "h3"] {
            assert_eq!(
                count(html, &format!("<{tag}>")),
                count(html, &format!("</{tag}>")),
                "unbalanced <{tag}> in {html}"
            );
        }
    }

    #[test]
    fn test_nested_list_follows_indentation() {
        let html = render("- a\n  - b\n- c");
        assert_eq!(
            html,
            "<ul>\n<li>a\n<ul>\n<li>b</li>\n</ul>\n</li>\n<li>c</li>\n</ul>"
        );
    }

    #[test]
    fn test_sibling_nested_list_after_deeper_list_closes() {
        let html = render("- a\n    - c\n  - b");
        assert_eq!(
            html,
            "<ul>\n<li>a\n<ul>\n<li>c</li>\n</ul>\n<ul>\n<li>b</li>\n</ul>\n</li>\n</ul>"
        );
        assert!(!html.contains("\n\n"));
    }

    #[test]
    fn test_blank_only_input_renders_nothing() {
        assert_eq!(render(""), "");
        assert_eq!(render("\n\n   \n\t\n"), "");
    }

    #[test]
    fn test_bold_is_matched_before_italic() {
        assert_eq!(
            render("**a** *b*"),
            "<p><strong>a</strong> <em>b</em></p>"
        );
        assert_eq!(
            render_inline("**bold with *inner* text**"),
            "<strong>bold with <em>inner</em> text</strong>"
        );
    }

    #[test]
    fn test_paragraph_lines_are_joined_until_blank_line() {
        let html = render("First line\nsecond line\n\nNext paragraph");
        assert_eq!(html, "<p>First line second line</p>\n<p>Next paragraph</p>");
    }

    #[test]
    fn test_headings() {
        let html = render("## Overview\nText\n### Details");
        assert_eq!(
            html,
            "<h2>Overview</h2>\n<p>Text</p>\n<h3>Details</h3>"
        );
    }

    #[test]
    fn test_heading_closes_open_list() {
        let html = render("- one\n- two\n## After");
        assert_eq!(
            html,
            "<ul>\n<li>one</li>\n<li>two</li>\n</ul>\n<h2>After</h2>"
        );
    }

    #[test]
    fn test_blank_line_keeps_list_open() {
        let html = render("1. first\n\n2. second");
        assert_eq!(html, "<ol>\n<li>first</li>\n<li>second</li>\n</ol>");
    }

    #[test]
    fn test_plain_line_closes_list() {
        let html = render("- item\nplain text");
        assert_eq!(html, "<ul>\n<li>item</li>\n</ul>\n<p>plain text</p>");
    }

    #[test]
    fn test_pending_paragraph_flushed_before_list() {
        let html = render("Key points:\n- one");
        assert_eq!(html, "<p>Key points:</p>\n<ul>\n<li>one</li>\n</ul>");
    }

    #[test]
    fn test_mixed_kinds_at_same_level_share_one_list() {
        let html = render("- bullet\n1. numbered");
        assert_eq!(html, "<ul>\n<li>bullet</li>\n<li>numbered</li>\n</ul>");
    }

    #[test]
    fn test_ordered_list_nested_in_bullets() {
        let html = render("* Themes\n  1. Loss\n  2. Hope\n* Characters");
        assert_eq!(
            html,
            "<ul>\n<li>Themes\n<ol>\n<li>Loss</li>\n<li>Hope</li>\n</ol>\n</li>\n<li>Characters</li>\n</ul>"
        );
    }

    #[test]
    fn test_deep_indent_collapses_by_integer_division() {
        // 3 spaces is level 1, 5 spaces is level 2
        let html = render("- a\n   - b\n     - c\n- d");
        assert_eq!(count(&html, "<ul>"), 3);
        assert_balanced(&html);
        assert!(html.ends_with("<li>d</li>\n</ul>"));
    }

    #[test]
    fn test_starting_indented_then_outdenting_keeps_levels_ordered() {
        let html = render("    - deep\n- shallow");
        assert_eq!(
            html,
            "<ul>\n<li>deep</li>\n</ul>\n<ul>\n<li>shallow</li>\n</ul>"
        );
    }

    #[test]
    fn test_unknown_syntax_degrades_to_paragraph() {
        let html = render("# Title\n```\ncode\n```\n|a|b|");
        assert_eq!(html, "<p># Title ``` code ``` |a|b|</p>");
    }

    #[test]
    fn test_html_is_escaped() {
        assert_eq!(
            render("<script>alert(1)</script> & more"),
            "<p>&lt;script&gt;alert(1)&lt;/script&gt; &amp; more</p>"
        );
    }

    #[test]
    fn test_crlf_input() {
        assert_eq!(render("- a\r\n- b\r\n"), "<ul>\n<li>a</li>\n<li>b</li>\n</ul>");
    }

    #[test]
    fn test_list_tags_always_balanced() {
        let inputs = [
            "- a\n  - b\n    - c",
            "1. a\n  - b\n\ntext\n- c\n      - d",
            "## H\n- a\n  1. b\n## H2\n* c",
            "- a\n    - skip a level\n  - back\nend",
            "  - indented start\n- a\n  - b\n  - c\n\n\n",
        ];
        for input in inputs {
            assert_balanced(&render(input));
        }
    }
}
