//! Incremental markdown rendering for assistant replies
//!
//! Converts reply text (complete or partial) into safe-to-display HTML.
//! Fenced code blocks are syntax-highlighted and wrapped with a copy
//! affordance. Partial documents with an unterminated code fence are shown
//! as an escaped preformatted block instead of being parsed, so an open
//! fence never swallows the rest of the render tree. Non-string input is
//! coerced to displayable text; the renderer never fails, it falls closed
//! to escaped plain text.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use serde_json::Value;
use std::sync::LazyLock;
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

// Syntax highlighting resources (loaded once)
static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

/// Highlighting theme for fenced code blocks
const CODE_THEME: &str = "base16-ocean.dark";

/// Markdown renderer for assistant reply text
///
/// # Examples
///
/// ```
/// use ragline::markdown::MarkdownRenderer;
///
/// let renderer = MarkdownRenderer::new();
/// let html = renderer.render_final_text("# Title");
/// assert!(html.contains("<h1>"));
/// ```
#[derive(Debug, Default, Clone)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    /// Create a new renderer
    pub fn new() -> Self {
        Self
    }

    /// Fully render `content` as markdown
    ///
    /// Non-string input is coerced first: objects and arrays become a fenced
    /// JSON block, every other value becomes its display form. This never
    /// fails; unparseable text ends up HTML-escaped.
    pub fn render_final(&self, content: &Value) -> String {
        self.render_final_text(&coerce_text(content))
    }

    /// Fully render already-stringified text as markdown
    pub fn render_final_text(&self, text: &str) -> String {
        self.render_document(text)
    }

    /// Render possibly-incomplete markdown
    ///
    /// When `content` contains an odd number of triple-backtick fence
    /// markers, a code fence is currently open and the whole text is
    /// emitted as an escaped preformatted block rather than parsed. The
    /// odd-count test is a cheap approximation: it does not understand
    /// nested or inline code, or other unterminated constructs.
    pub fn render_partial(&self, content: &Value) -> String {
        self.render_partial_text(&coerce_text(content))
    }

    /// Render possibly-incomplete already-stringified text
    pub fn render_partial_text(&self, text: &str) -> String {
        if has_unterminated_fence(text) {
            return format!(
                "<pre class=\"partial-markdown\">{}</pre>",
                escape_html(text)
            );
        }
        self.render_document(text)
    }

    /// Parse markdown into HTML, routing fenced code through the highlighter
    fn render_document(&self, text: &str) -> String {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        let parser = Parser::new_ext(text, options);

        let mut events: Vec<Event> = Vec::new();
        let mut in_code = false;
        let mut code_lang: Option<String> = None;
        let mut code_buf = String::new();

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    in_code = true;
                    code_buf.clear();
                    code_lang = match kind {
                        CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.to_string()),
                        _ => None,
                    };
                }
                Event::Text(t) if in_code => code_buf.push_str(&t),
                Event::End(TagEnd::CodeBlock) => {
                    in_code = false;
                    let block = render_code_block(&code_buf, code_lang.as_deref());
                    events.push(Event::Html(block.into()));
                }
                other => events.push(other),
            }
        }

        let mut html = String::new();
        pulldown_cmark::html::push_html(&mut html, events.into_iter());
        html
    }
}

/// Highlight one code block and wrap it with the copy affordance
fn render_code_block(code: &str, lang: Option<&str>) -> String {
    let syntax = lang
        .and_then(|l| SYNTAX_SET.find_syntax_by_token(l))
        .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text());
    let theme = &THEME_SET.themes[CODE_THEME];

    let highlighted = highlighted_html_for_string(code, &SYNTAX_SET, syntax, theme)
        .unwrap_or_else(|_| format!("<pre><code>{}</code></pre>", escape_html(code)));

    format!(
        "<div class=\"code-container\">\
         <button class=\"copy-btn\" title=\"Copy to clipboard\"><span>Copy</span></button>\
         {}\
         </div>",
        highlighted
    )
}

/// True when the text contains an odd number of ``` fence markers
///
/// A cheap, non-parsing heuristic for "a code fence is currently open".
pub fn has_unterminated_fence(text: &str) -> bool {
    text.matches("```").count() % 2 == 1
}

/// Coerce arbitrary JSON content into displayable text
///
/// Strings pass through; objects and arrays become a fenced JSON block so
/// they render as code; every other value becomes its JSON display form.
pub fn coerce_text(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Object(_) | Value::Array(_) => {
            tracing::warn!("renderer received non-string content, formatting as JSON block");
            let pretty = serde_json::to_string_pretty(content)
                .unwrap_or_else(|_| content.to_string());
            format!("```json\n{}\n```", pretty)
        }
        other => {
            tracing::warn!("renderer received non-string content: {}", other);
            other.to_string()
        }
    }
}

/// HTML-escape raw text for the fallback display paths
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fence_heuristic_counts() {
        assert!(!has_unterminated_fence("no code at all"));
        assert!(has_unterminated_fence("```rust\nlet x = 1;"));
        assert!(!has_unterminated_fence("```rust\nlet x = 1;\n```"));
        assert!(has_unterminated_fence("```a``` text ```"));
        assert!(!has_unterminated_fence(""));
    }

    #[test]
    fn test_render_partial_open_fence_is_escaped_pre() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render_partial_text("```rust\nlet x = <T>::new();");

        assert!(html.starts_with("<pre class=\"partial-markdown\">"));
        assert!(html.ends_with("</pre>"));
        // The raw angle brackets must be escaped, and nothing was parsed.
        assert!(html.contains("&lt;T&gt;"));
        assert!(!html.contains("<h1>"));
        assert!(!html.contains("code-container"));
    }

    #[test]
    fn test_render_partial_closed_fence_parses_normally() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render_partial_text("```rust\nlet x = 1;\n```\n");

        assert!(html.contains("code-container"));
        assert!(!html.contains("partial-markdown"));
    }

    #[test]
    fn test_render_final_headings_and_lists() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render_final_text("# Title\n\n- one\n- two\n");

        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<li>one</li>"));
    }

    #[test]
    fn test_render_final_code_block_has_copy_affordance() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render_final_text("```python\nprint('hi')\n```\n");

        assert!(html.contains("class=\"code-container\""));
        assert!(html.contains("class=\"copy-btn\""));
        assert!(html.contains("<span>Copy</span>"));
        // syntect emits an inline-styled <pre>
        assert!(html.contains("<pre"));
    }

    #[test]
    fn test_render_final_unknown_language_falls_back_to_plain() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render_final_text("```nosuchlang\nwords here\n```\n");

        assert!(html.contains("code-container"));
        assert!(html.contains("words here"));
    }

    #[test]
    fn test_coerce_string_passthrough() {
        assert_eq!(coerce_text(&json!("plain")), "plain");
    }

    #[test]
    fn test_coerce_object_becomes_json_block() {
        let text = coerce_text(&json!({"answer": 42}));
        assert!(text.starts_with("```json\n"));
        assert!(text.ends_with("\n```"));
        assert!(text.contains("\"answer\": 42"));
    }

    #[test]
    fn test_coerce_array_becomes_json_block() {
        let text = coerce_text(&json!([1, 2, 3]));
        assert!(text.starts_with("```json\n"));
    }

    #[test]
    fn test_coerce_scalars_become_display_form() {
        assert_eq!(coerce_text(&json!(42)), "42");
        assert_eq!(coerce_text(&json!(true)), "true");
        assert_eq!(coerce_text(&Value::Null), "null");
    }

    #[test]
    fn test_render_never_fails_on_any_input_type() {
        let renderer = MarkdownRenderer::new();
        let inputs = vec![json!("text"), json!({"k": "v"}), json!(3.5), Value::Null];

        for input in &inputs {
            let final_html = renderer.render_final(input);
            let partial_html = renderer.render_partial(input);
            assert!(!final_html.is_empty());
            assert!(!partial_html.is_empty());
        }
    }

    #[test]
    fn test_render_object_goes_through_code_path() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render_final(&json!({"k": "v"}));
        assert!(html.contains("code-container"));
    }

    #[test]
    fn test_escape_html_all_specials() {
        assert_eq!(
            escape_html(r#"<a href="x">&'"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;"
        );
        assert_eq!(escape_html("safe text"), "safe text");
    }

    #[test]
    fn test_render_partial_escapes_injected_markup() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render_partial_text("```\n<script>alert(1)</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_render_empty_string() {
        let renderer = MarkdownRenderer::new();
        assert_eq!(renderer.render_final_text(""), "");
        assert_eq!(renderer.render_partial_text(""), "");
    }
}
