use asset_views_core::present::markdown::MarkdownRenderer;

/// Terminal output has no HTML: show the Markdown source on one line.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainMarkdown;

impl MarkdownRenderer for PlainMarkdown {
    fn render(&self, markdown: &str) -> String {
        markdown.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}
