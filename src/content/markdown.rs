//! Markdown to HTML.
//!
//! ```text
//! source ──► abbreviation pre-pass ──► comrak AST ──► rewrite ──► HTML
//!            (*[KEY]: title lines)                   ├─ code blocks → syntect spans
//!                                                    └─ text nodes  → <abbr>
//! ```
//!
//! Highlighted code uses CSS classes (`syntax-*`), the matching stylesheet is
//! written by the `build-css` task.

use anyhow::Result;
use comrak::{
    Arena, format_html,
    nodes::{AstNode, NodeHtmlBlock, NodeValue},
    options::Options,
    parse_document,
};
use regex::Regex;
use rustc_hash::FxHashMap;
use std::{borrow::Cow, sync::LazyLock};
use syntect::{
    html::{ClassStyle, ClassedHTMLGenerator},
    parsing::SyntaxSet,
    util::LinesWithEndings,
};

/// Class naming shared with the highlight stylesheet.
pub const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "syntax-" };

static ABBR_DEFINITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\*\[([^\]]+)\]:[ \t]*(.*?)[ \t]*(?:\r?\n|$)").unwrap());

pub struct MarkdownRenderer {
    options: Options<'static>,
    syntax_set: SyntaxSet,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        let mut options = Options::default();

        let ext = &mut options.extension;
        ext.strikethrough = true;
        ext.table = true;
        ext.autolink = true;
        ext.tasklist = true;
        ext.superscript = true;
        ext.subscript = true;
        ext.footnotes = true;
        ext.shortcodes = true;

        options.render.r#unsafe = true;

        Self {
            options,
            syntax_set: SyntaxSet::load_defaults_newlines(),
        }
    }

    pub fn render(&self, markdown: &str) -> Result<String> {
        let (markdown, abbreviations) = extract_abbreviations(markdown);

        let arena = Arena::new();
        let root = parse_document(&arena, &markdown, &self.options);
        self.rewrite(root, abbreviations.as_ref())?;

        let mut html = String::new();
        format_html(root, &self.options, &mut html)?;
        Ok(html)
    }

    fn rewrite(&self, node: &AstNode<'_>, abbreviations: Option<&Abbreviations>) -> Result<()> {
        if let Some((info, literal)) = code_block(node) {
            let html = self.highlight(&info, &literal)?;
            node.data.borrow_mut().value = NodeValue::HtmlBlock(NodeHtmlBlock {
                block_type: 0,
                literal: html,
            });
            return Ok(());
        }

        if let Some(abbreviations) = abbreviations
            && let Some(text) = text_of(node)
            && let Some(html) = abbreviations.expand(&text)
        {
            node.data.borrow_mut().value = NodeValue::HtmlInline(html);
        }

        let mut child = node.first_child();
        while let Some(next) = child {
            self.rewrite(next, abbreviations)?;
            child = next.next_sibling();
        }
        Ok(())
    }

    fn highlight(&self, info: &str, code: &str) -> Result<String> {
        let lang = info.split_whitespace().next().unwrap_or("text");
        let syntax = self
            .syntax_set
            .find_syntax_by_token(&lang.to_ascii_lowercase())
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let code: Cow<str> = if code.ends_with('\n') {
            Cow::Borrowed(code)
        } else {
            Cow::Owned(format!("{code}\n"))
        };

        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &self.syntax_set, CLASS_STYLE);
        for line in LinesWithEndings::from(&code) {
            generator.parse_html_for_line_which_includes_newline(line)?;
        }

        Ok(format!(
            "<pre class=\"syntax-highlight\"><code class=\"language-{}\">{}</code></pre>\n",
            tera::escape_html(lang),
            generator.finalize()
        ))
    }
}

fn code_block(node: &AstNode<'_>) -> Option<(String, String)> {
    let data = node.data.borrow();
    match &data.value {
        NodeValue::CodeBlock(block) => Some((block.info.trim().to_string(), block.literal.clone())),
        _ => None,
    }
}

fn text_of(node: &AstNode<'_>) -> Option<String> {
    let data = node.data.borrow();
    match &data.value {
        NodeValue::Text(text) => Some(text.to_string()),
        _ => None,
    }
}

// ============================================================================
// Abbreviations
// ============================================================================

/// `*[HTML]: Hyper Text Markup Language` definitions of one document.
struct Abbreviations {
    pattern: Regex,
    titles: FxHashMap<String, String>,
}

impl Abbreviations {
    /// Wrap every whole-word occurrence in `<abbr>`. `None` when nothing matches.
    fn expand(&self, text: &str) -> Option<String> {
        if !self.pattern.is_match(text) {
            return None;
        }

        let mut html = String::with_capacity(text.len() * 2);
        let mut last = 0;
        for m in self.pattern.find_iter(text) {
            html.push_str(&tera::escape_html(&text[last..m.start()]));
            let title = self.titles.get(m.as_str()).map_or("", String::as_str);
            html.push_str(&format!(
                "<abbr title=\"{}\">{}</abbr>",
                tera::escape_html(title),
                tera::escape_html(m.as_str())
            ));
            last = m.end();
        }
        html.push_str(&tera::escape_html(&text[last..]));
        Some(html)
    }
}

/// Remove definition lines from `markdown` and collect them.
fn extract_abbreviations(markdown: &str) -> (Cow<'_, str>, Option<Abbreviations>) {
    let titles: FxHashMap<String, String> = ABBR_DEFINITION
        .captures_iter(markdown)
        .map(|c| (c[1].to_string(), c[2].to_string()))
        .collect();

    if titles.is_empty() {
        return (Cow::Borrowed(markdown), None);
    }

    let mut keys: Vec<&str> = titles.keys().map(String::as_str).collect();
    keys.sort_by_key(|k| std::cmp::Reverse(k.len()));
    let alternatives = keys.iter().map(|k| regex::escape(k)).collect::<Vec<_>>().join("|");

    let stripped = ABBR_DEFINITION.replace_all(markdown, "");
    let abbreviations = Regex::new(&format!(r"\b(?:{alternatives})\b"))
        .ok()
        .map(|pattern| Abbreviations { pattern, titles });

    (stripped, abbreviations)
}
