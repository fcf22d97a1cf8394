//! Markdown-flavored text to structured HTML markup.
//!
//! The converter is pure and total: any input renders to some markup, and
//! malformed markdown degrades to a paragraph. It runs as an ordered pipeline
//! over an explicit segment/line sequence. Fenced code is split out first so
//! that no later stage can match inside it; inline rules then run per plain
//! segment, and a single line scan assembles the block sequence (headings,
//! lists, rules, paragraph runs) in input order.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref FENCE: Regex = Regex::new(r"```([\s\S]*?)```").unwrap();
    static ref INLINE_CODE: Regex = Regex::new(r"`([^`\n]+)`").unwrap();
    static ref HEADING: Regex = Regex::new(r"(?m)^(#{1,6}) (.*)$").unwrap();
    static ref HEADING_LINE: Regex = Regex::new(r"^<h[1-6]>.*</h[1-6]>$").unwrap();
    static ref BOLD_STAR: Regex = Regex::new(r"\*\*([^*\n]+)\*\*").unwrap();
    static ref BOLD_UNDERSCORE: Regex = Regex::new(r"__([^_\n]+)__").unwrap();
    static ref ITALIC_STAR: Regex = Regex::new(r"\*([^*\n]+)\*").unwrap();
    static ref ITALIC_UNDERSCORE: Regex = Regex::new(r"_([^_\n]+)_").unwrap();
    static ref STRIKETHROUGH: Regex = Regex::new(r"~~([^~\n]+)~~").unwrap();
    static ref LINK: Regex = Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap();
    static ref UNORDERED_ITEM: Regex = Regex::new(r"^\s*[-*+]\s+(.+)$").unwrap();
    static ref ORDERED_ITEM: Regex = Regex::new(r"^\s*\d+\.\s+(.+)$").unwrap();
    static ref RULE_LINE: Regex = Regex::new(r"^(-{3,}|\*{3,})$").unwrap();
}

/// Render markdown-flavored text to HTML markup.
pub fn render(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut assembler = Assembler::new();
    for segment in split_fences(text) {
        match segment {
            Segment::Code(code) => assembler.push_code(&code),
            Segment::Plain(plain) => {
                let inline = apply_inline(&plain);
                for line in inline.split('\n') {
                    assembler.push_line(line);
                }
            }
        }
    }
    let markup = assembler.finish();

    // Blank-only input still yields a (degenerate) paragraph.
    if markup.is_empty() {
        return "<p></p>".to_string();
    }
    markup
}

/// The characters a DOM `textContent` would contain for the given markup:
/// tags are stripped and the five escape entities are decoded.
pub fn visible_text(markup: &str) -> String {
    const ENTITIES: [(&str, char); 5] = [
        ("&amp;", '&'),
        ("&lt;", '<'),
        ("&gt;", '>'),
        ("&quot;", '"'),
        ("&#039;", '\''),
    ];

    let mut out = String::with_capacity(markup.len());
    let mut rest = markup;
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('<') {
            match after.find('>') {
                Some(end) => rest = &after[end + 1..],
                None => break,
            }
        } else if rest.starts_with('&') {
            match ENTITIES.iter().find(|(entity, _)| rest.starts_with(entity)) {
                Some((entity, ch)) => {
                    out.push(*ch);
                    rest = &rest[entity.len()..];
                }
                None => {
                    out.push('&');
                    rest = &rest[1..];
                }
            }
        } else {
            let ch = rest.chars().next().unwrap();
            out.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
    }
    out
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#039;")
}

enum Segment {
    /// Fenced code content, trimmed and escaped. Sealed against every later rule.
    Code(String),
    Plain(String),
}

fn split_fences(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;
    for caps in FENCE.captures_iter(text) {
        let whole = caps.get(0).unwrap();
        if whole.start() > last {
            segments.push(Segment::Plain(text[last..whole.start()].to_string()));
        }
        segments.push(Segment::Code(escape_html(caps[1].trim())));
        last = whole.end();
    }
    if last < text.len() {
        segments.push(Segment::Plain(text[last..].to_string()));
    }
    segments
}

/// Inline rules, in rule order: inline code, headings (longest hash run wins),
/// bold before italic, strikethrough, links. Link conversion never touches a
/// line-leading list marker, so running it here commutes with the line scan.
fn apply_inline(text: &str) -> String {
    let text = replace_guarded(text, &INLINE_CODE, '`', |caps| {
        format!(
            "<code class=\"inline-code\">{}</code>",
            escape_html(&caps[1])
        )
    });
    let text = HEADING.replace_all(&text, |caps: &Captures| {
        let level = caps[1].len();
        format!("<h{level}>{}</h{level}>", &caps[2])
    });
    let text = BOLD_STAR.replace_all(&text, "<strong>$1</strong>");
    let text = BOLD_UNDERSCORE.replace_all(&text, "<strong>$1</strong>");
    let text = replace_guarded(&text, &ITALIC_STAR, '*', |caps| {
        format!("<em>{}</em>", &caps[1])
    });
    let text = replace_guarded(&text, &ITALIC_UNDERSCORE, '_', |caps| {
        format!("<em>{}</em>", &caps[1])
    });
    let text = STRIKETHROUGH.replace_all(&text, "<del>$1</del>");
    LINK.replace_all(
        &text,
        "<a href=\"$2\" target=\"_blank\" rel=\"noopener noreferrer\" class=\"markdown-link\">$1</a>",
    )
    .into_owned()
}

/// Replace matches of `re` unless the match is immediately adjacent to
/// `guard`, so that doubled delimiters never half-trigger a single-delimiter
/// rule. Skipped spans stay literal.
fn replace_guarded(
    text: &str,
    re: &Regex,
    guard: char,
    render_match: impl Fn(&Captures) -> String,
) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in re.captures_iter(text) {
        let whole = caps.get(0).unwrap();
        let before = text[..whole.start()].chars().next_back();
        let after = text[whole.end()..].chars().next();
        if before == Some(guard) || after == Some(guard) {
            continue;
        }
        out.push_str(&text[last..whole.start()]);
        out.push_str(&render_match(&caps));
        last = whole.end();
    }
    out.push_str(&text[last..]);
    out
}

#[derive(PartialEq, Eq, Clone, Copy)]
enum ListKind {
    Ordered,
    Unordered,
}

/// Assembles the ordered block sequence. At most one list is open at a time;
/// an item of the other kind, a non-list line, or a blank line closes it.
struct Assembler {
    blocks: Vec<String>,
    open_list: Option<(ListKind, Vec<String>)>,
    paragraph: Vec<String>,
}

impl Assembler {
    fn new() -> Self {
        Assembler {
            blocks: Vec::new(),
            open_list: None,
            paragraph: Vec::new(),
        }
    }

    fn push_code(&mut self, escaped: &str) {
        self.close_list();
        self.close_paragraph();
        self.blocks
            .push(format!("<pre class=\"code-block\"><code>{escaped}</code></pre>"));
    }

    fn push_line(&mut self, line: &str) {
        if line.trim().is_empty() {
            // Blank lines are not content: they close an open list and mark a
            // paragraph boundary.
            self.close_list();
            self.close_paragraph();
        } else if RULE_LINE.is_match(line.trim()) {
            self.close_list();
            self.close_paragraph();
            self.blocks.push("<hr>".to_string());
        } else if let Some(caps) = UNORDERED_ITEM.captures(line) {
            self.push_item(ListKind::Unordered, &caps[1]);
        } else if let Some(caps) = ORDERED_ITEM.captures(line) {
            self.push_item(ListKind::Ordered, &caps[1]);
        } else if HEADING_LINE.is_match(line) {
            self.close_list();
            self.close_paragraph();
            self.blocks.push(line.to_string());
        } else {
            self.close_list();
            self.paragraph.push(line.to_string());
        }
    }

    fn push_item(&mut self, kind: ListKind, item: &str) {
        self.close_paragraph();
        match &mut self.open_list {
            Some((open_kind, items)) if *open_kind == kind => {
                items.push(item.to_string());
            }
            _ => {
                self.close_list();
                self.open_list = Some((kind, vec![item.to_string()]));
            }
        }
    }

    fn close_list(&mut self) {
        if let Some((kind, items)) = self.open_list.take() {
            let tag = match kind {
                ListKind::Ordered => "ol",
                ListKind::Unordered => "ul",
            };
            let body: String = items
                .iter()
                .map(|item| format!("<li>{item}</li>"))
                .collect();
            self.blocks.push(format!("<{tag}>{body}</{tag}>"));
        }
    }

    fn close_paragraph(&mut self) {
        if !self.paragraph.is_empty() {
            let body = self.paragraph.join("<br>");
            self.blocks.push(format!("<p>{body}</p>"));
            self.paragraph.clear();
        }
    }

    fn finish(mut self) -> String {
        self.close_list();
        self.close_paragraph();
        self.blocks.concat()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(render(""), "");
    }

    #[test]
    fn test_blank_only_input_is_a_degenerate_paragraph() {
        assert_eq!(render("\n\n"), "<p></p>");
    }

    #[test]
    fn test_render_is_deterministic() {
        let text = "# Title\n\nSome **bold** and `code` text\n\n- a\n- b";
        assert_eq!(render(text), render(text));
    }

    #[test]
    fn test_plain_text_becomes_a_paragraph() {
        assert_eq!(render("hello"), "<p>hello</p>");
    }

    #[test]
    fn test_single_newline_is_a_line_break() {
        assert_eq!(render("a\nb"), "<p>a<br>b</p>");
    }

    #[test]
    fn test_blank_line_is_a_paragraph_boundary() {
        assert_eq!(render("a\n\nb"), "<p>a</p><p>b</p>");
    }

    #[test]
    fn test_headings_all_levels() {
        for level in 1..=6 {
            let hashes = "#".repeat(level);
            assert_eq!(
                render(&format!("{hashes} Title")),
                format!("<h{level}>Title</h{level}>")
            );
        }
    }

    #[test]
    fn test_seven_hashes_is_not_a_heading() {
        assert_eq!(render("####### nope"), "<p>####### nope</p>");
    }

    #[test]
    fn test_bold_inside_heading() {
        assert_eq!(render("# **T**"), "<h1><strong>T</strong></h1>");
    }

    #[test]
    fn test_bold_before_italic() {
        assert_eq!(
            render("**bold** and *italic*"),
            "<p><strong>bold</strong> and <em>italic</em></p>"
        );
        assert_eq!(
            render("***both***"),
            "<p><em><strong>both</strong></em></p>"
        );
    }

    #[test]
    fn test_underscore_emphasis() {
        assert_eq!(
            render("__bold__ and _italic_"),
            "<p><strong>bold</strong> and <em>italic</em></p>"
        );
    }

    #[test]
    fn test_strikethrough() {
        assert_eq!(render("~~gone~~"), "<p><del>gone</del></p>");
    }

    #[test]
    fn test_inline_code_is_escaped_and_wrapped() {
        assert_eq!(
            render("use `a<b>` here"),
            "<p>use <code class=\"inline-code\">a&lt;b&gt;</code> here</p>"
        );
    }

    #[test]
    fn test_adjacent_backticks_do_not_double_trigger() {
        assert_eq!(render("``x``"), "<p>``x``</p>");
    }

    #[test]
    fn test_fenced_code_is_escaped() {
        let markup = render("```\n<script>alert(1)</script>\n```");
        assert_eq!(
            markup,
            "<pre class=\"code-block\"><code>&lt;script&gt;alert(1)&lt;/script&gt;</code></pre>"
        );
    }

    #[test]
    fn test_emphasis_never_fires_inside_a_fence() {
        let markup = render("```\n**not bold**\n```");
        assert!(!markup.contains("<strong>"));
        assert!(markup.contains("**not bold**"));
    }

    #[test]
    fn test_list_markers_inside_a_fence_stay_literal() {
        let markup = render("```\n- item\n1. item\n```");
        assert!(!markup.contains("<li>"));
    }

    #[test]
    fn test_unclosed_fence_degrades_to_text() {
        assert_eq!(render("```\nrest"), "<p>```<br>rest</p>");
    }

    #[test]
    fn test_scenario_heading_then_both_list_kinds() {
        let markup = render("# Title\n\n- a\n- b\n\n1. x\n2. y");
        assert_eq!(
            markup,
            "<h1>Title</h1><ul><li>a</li><li>b</li></ul><ol><li>x</li><li>y</li></ol>"
        );
    }

    #[test]
    fn test_alternating_list_kinds_never_merge() {
        let markup = render("- a\n1. b\n- c\n2. d");
        assert_eq!(
            markup,
            "<ul><li>a</li></ul><ol><li>b</li></ol><ul><li>c</li></ul><ol><li>d</li></ol>"
        );
    }

    #[test]
    fn test_contiguous_same_kind_items_collapse_into_one_list() {
        let markup = render("- a\n- b\n- c");
        assert_eq!(markup, "<ul><li>a</li><li>b</li><li>c</li></ul>");
    }

    #[test]
    fn test_non_list_line_closes_an_open_list() {
        let markup = render("- a\ntext\n- b");
        assert_eq!(markup, "<ul><li>a</li></ul><p>text</p><ul><li>b</li></ul>");
    }

    #[test]
    fn test_links_open_in_a_new_context() {
        assert_eq!(
            render("[docs](https://example.com)"),
            "<p><a href=\"https://example.com\" target=\"_blank\" rel=\"noopener noreferrer\" class=\"markdown-link\">docs</a></p>"
        );
    }

    #[test]
    fn test_link_inside_a_list_item() {
        let markup = render("- [a](b)");
        assert!(markup.starts_with("<ul><li><a href=\"b\""));
    }

    #[test]
    fn test_horizontal_rules() {
        assert_eq!(render("---"), "<hr>");
        assert_eq!(render("*****"), "<hr>");
        assert_eq!(render("a\n---\nb"), "<p>a</p><hr><p>b</p>");
    }

    #[test]
    fn test_visible_text_strips_tags_and_decodes_entities() {
        assert_eq!(visible_text("<p><strong>Normal</strong></p>"), "Normal");
        assert_eq!(visible_text("<code>a&lt;b&gt;&amp;</code>"), "a<b>&");
        assert_eq!(visible_text("x<br>y"), "xy");
    }

    #[test]
    fn test_visible_text_of_cjk_markup() {
        assert_eq!(visible_text(&render("**正常**。")), "正常。");
    }
}
