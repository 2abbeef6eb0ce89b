use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};

pub trait MarkdownRenderer: Send + Sync {
    /// Returns an HTML fragment that is safe to embed.
    fn render(&self, markdown: &str) -> String;
}

/// CommonMark via pulldown-cmark, sanitized at the event level.
///
/// Raw HTML in the source is reduced to its text content, links pointing at script or data
/// URLs lose their target, and images with such URLs collapse to their alt text. Everything else is
/// markup pulldown-cmark generates itself, which never carries event handler attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PulldownRenderer;

impl MarkdownRenderer for PulldownRenderer {
    fn render(&self, markdown: &str) -> String {
        if markdown.trim().is_empty() {
            return String::new();
        }
        // One flag per open image: unsafe images lose both tags and keep their alt text.
        let mut images: Vec<bool> = Vec::new();
        let parser = Parser::new_ext(markdown, Options::ENABLE_STRIKETHROUGH).filter_map(|event| {
            match event {
                Event::Start(Tag::Image { ref dest_url, .. }) => {
                    let unsafe_url = is_unsafe_url(dest_url);
                    images.push(unsafe_url);
                    (!unsafe_url).then_some(event)
                }
                Event::End(TagEnd::Image) => {
                    let unsafe_url = images.pop().unwrap_or(false);
                    (!unsafe_url).then_some(event)
                }
                other => sanitize(other),
            }
        });
        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, parser);
        out
    }
}

fn sanitize(event: Event<'_>) -> Option<Event<'_>> {
    match event {
        Event::Html(raw) | Event::InlineHtml(raw) => {
            let text = strip_tags(&raw);
            (!text.is_empty()).then(|| Event::Text(text.into()))
        }
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => {
            let dest_url = if is_unsafe_url(&dest_url) {
                CowStr::Borrowed("")
            } else {
                dest_url
            };
            Some(Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }))
        }
        other => Some(other),
    }
}

fn strip_tags(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        match rest[open..].find('>') {
            Some(close) => rest = &rest[open + close + 1..],
            None => {
                rest = &rest[open..];
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

fn is_unsafe_url(url: &str) -> bool {
    // Browsers ignore embedded whitespace and control characters in schemes.
    let normalized: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    ["javascript:", "vbscript:", "data:"]
        .iter()
        .any(|scheme| normalized.starts_with(scheme))
}
