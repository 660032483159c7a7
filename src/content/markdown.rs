//! Markdown preview rendering
//!
//! The pipeline is: strip front-matter, parse with pulldown-cmark, rewrite the
//! event stream (image sources, link targets, presentation classes), write
//! HTML, then sanitize with ammonia. Sanitizing runs last so that the rewritten
//! attributes are kept and anything injected through raw HTML is still filtered.

use std::borrow::Cow;
use std::panic::{self, AssertUnwindSafe};

use lazy_static::lazy_static;
use pulldown_cmark::{
    html, Alignment, CodeBlockKind, CowStr, Event, LinkType, Options, Parser, Tag, TagEnd,
};
use regex::{Captures, Regex};

use super::frontmatter::FrontMatter;
use super::image::resolve_image_path;

lazy_static! {
    static ref IMG_TAG_RE: Regex = Regex::new(r"(?i)<img\b([^>]*?)/?>").unwrap();
    static ref ATTR_RE: Regex =
        Regex::new(r#"([^\s"'=<>/]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#).unwrap();

    /// Sanitizer for the preview pane.
    ///
    /// `<iframe>` is allowed because posts are written by the person running
    /// the editor (embedded videos, maps). This is the only trusted construct;
    /// `<script>` and `<style>` are dropped together with their content.
    /// `data:` URLs survive only as inline images.
    static ref SANITIZER: ammonia::Builder<'static> = {
        let mut builder = ammonia::Builder::default();
        builder
            .add_tags(&["iframe", "input"])
            .rm_tags(&["script", "style"])
            .add_generic_attributes(&["class", "id"])
            .add_tag_attributes("a", &["target", "rel"])
            .add_tag_attributes(
                "iframe",
                &["src", "width", "height", "frameborder", "allow", "allowfullscreen", "title"],
            )
            .add_tag_attributes("input", &["type", "checked", "disabled"])
            .add_tag_attributes("th", &["align"])
            .add_tag_attributes("td", &["align"])
            .add_url_schemes(&["data"])
            .attribute_filter(inline_images_only)
            .link_rel(None);
        builder
    };
}

/// CSS classes applied to the rendered elements
#[derive(Debug, Clone)]
pub struct PreviewStyle {
    /// Indexed by heading level - 1
    pub headings: [&'static str; 6],
    pub strong: &'static str,
    pub emphasis: &'static str,
    pub link: &'static str,
    pub blockquote: &'static str,
    pub code_block: &'static str,
    pub inline_code: &'static str,
    pub image: &'static str,
    pub rule: &'static str,
    pub unordered_list: &'static str,
    pub ordered_list: &'static str,
    pub table: &'static str,
    pub table_head: &'static str,
    pub table_cell: &'static str,
}

impl Default for PreviewStyle {
    fn default() -> Self {
        Self {
            headings: [
                "text-3xl font-bold mb-4 text-gray-900 dark:text-slate-100 border-b border-gray-200 dark:border-slate-700 pb-2",
                "text-2xl font-bold mb-3 text-gray-800 dark:text-slate-200 mt-6",
                "text-xl font-bold mb-2 text-gray-800 dark:text-slate-200 mt-4",
                "text-lg font-bold mb-2 text-gray-800 dark:text-slate-200 mt-4",
                "text-base font-bold mb-2 text-gray-800 dark:text-slate-200 mt-3",
                "text-sm font-bold mb-2 text-gray-700 dark:text-slate-300 mt-3",
            ],
            strong: "text-indigo-600 dark:text-indigo-400 font-bold",
            emphasis: "italic text-gray-600 dark:text-slate-300",
            link: "text-indigo-600 dark:text-indigo-400 hover:underline",
            blockquote: "border-l-4 border-indigo-500 pl-4 italic text-gray-500 dark:text-slate-400 my-4 py-1 bg-gray-50 dark:bg-slate-800/50 rounded-r",
            code_block: "bg-gray-900 text-slate-300 p-4 rounded-lg my-4 overflow-x-auto border border-gray-800 font-mono text-sm leading-normal",
            inline_code: "bg-gray-100 dark:bg-slate-800 text-indigo-600 dark:text-indigo-300 px-1.5 py-0.5 rounded text-sm font-mono",
            image: "my-4 rounded-lg border border-gray-200 dark:border-slate-700 shadow-sm max-w-full block mx-auto",
            rule: "my-6 border-gray-200 dark:border-slate-700",
            unordered_list: "list-disc pl-6 my-3",
            ordered_list: "list-decimal pl-6 my-3",
            table: "table-auto border-collapse my-4",
            table_head: "bg-gray-50 dark:bg-slate-800",
            table_cell: "border border-gray-200 dark:border-slate-700 px-3 py-1",
        }
    }
}

/// How the end of a rewritten tag is written
enum Closer {
    /// Let the HTML writer close the tag
    Keep,
    Emit(String),
    TableHead,
    Table,
}

/// Per-render state of the event rewriter
struct Rewriter<'s> {
    style: &'s PreviewStyle,
    line_breaks: bool,
    closers: Vec<Closer>,
    /// Open image: resolved src, title, collected alt text, nesting depth
    image: Option<(String, String, String, usize)>,
    alignments: Vec<Alignment>,
    cell: usize,
    in_table_head: bool,
    in_table_body: bool,
    /// Lines of the HTML block being collected
    html_block: Option<String>,
}

/// Markdown renderer for the preview pane
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    style: PreviewStyle,
    line_breaks: bool,
}

impl MarkdownRenderer {
    /// Create a new markdown renderer
    pub fn new() -> Self {
        Self::with_options(PreviewStyle::default(), true)
    }

    /// Create with custom settings. With `line_breaks` every newline inside a
    /// paragraph becomes `<br />`, as hexo-renderer-marked does by default.
    pub fn with_options(style: PreviewStyle, line_breaks: bool) -> Self {
        Self { style, line_breaks }
    }

    /// Render full post content (front-matter included) to sanitized HTML.
    ///
    /// Never panics: if anything in the pipeline fails the raw content is
    /// returned escaped inside a `<pre>` block.
    pub fn render(&self, content: &str) -> String {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let body = FrontMatter::strip(content);
            sanitize(&self.render_unsanitized(body))
        }));

        match result {
            Ok(html) => html,
            Err(_) => {
                tracing::warn!("Markdown rendering failed, showing escaped source");
                format!("<pre>{}</pre>", html_escape(content))
            }
        }
    }

    /// Markdown body to HTML, before sanitizing
    fn render_unsanitized(&self, markdown: &str) -> String {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_FOOTNOTES;
        let parser = Parser::new_ext(markdown, options);

        let mut rewriter = Rewriter {
            style: &self.style,
            line_breaks: self.line_breaks,
            closers: Vec::new(),
            image: None,
            alignments: Vec::new(),
            cell: 0,
            in_table_head: false,
            in_table_body: false,
            html_block: None,
        };

        let mut events: Vec<Event> = Vec::new();
        for event in parser {
            if let Some(event) = rewriter.rewrite(event) {
                events.push(event);
            }
        }

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());
        html_output
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl<'s> Rewriter<'s> {
    fn rewrite<'a>(&mut self, event: Event<'a>) -> Option<Event<'a>> {
        if self.image.is_some() {
            return self.image_event(event);
        }
        if self.html_block.is_some() {
            return self.html_block_event(event);
        }

        match event {
            Event::Start(Tag::HtmlBlock) => {
                self.html_block = Some(String::new());
                None
            }
            Event::Start(tag) => self.start(tag),
            Event::End(end) => match self.closers.pop() {
                Some(Closer::Emit(html)) => Some(raw(html)),
                Some(Closer::TableHead) => {
                    self.in_table_head = false;
                    Some(raw("</tr></thead>\n".to_string()))
                }
                Some(Closer::Table) => {
                    let body = if self.in_table_body { "</tbody>" } else { "" };
                    self.in_table_body = false;
                    Some(raw(format!("{}</table>\n", body)))
                }
                Some(Closer::Keep) | None => Some(Event::End(end)),
            },
            Event::Code(code) => Some(raw(format!(
                r#"<code class="{}">{}</code>"#,
                self.style.inline_code,
                html_escape(&code)
            ))),
            Event::Html(fragment) => Some(Event::Html(rewrite_img_tags(&fragment, self.style).into())),
            Event::InlineHtml(fragment) => {
                Some(Event::InlineHtml(rewrite_img_tags(&fragment, self.style).into()))
            }
            Event::Rule => Some(raw(format!("<hr class=\"{}\" />\n", self.style.rule))),
            Event::SoftBreak if self.line_breaks => Some(Event::HardBreak),
            other => Some(other),
        }
    }

    fn start<'a>(&mut self, tag: Tag<'a>) -> Option<Event<'a>> {
        let style = self.style;
        let (open, closer) = match tag {
            Tag::Heading { level, id, .. } => {
                let n = level as usize;
                let id_attr = id
                    .map(|id| format!(r#" id="{}""#, html_escape(&id)))
                    .unwrap_or_default();
                (
                    format!(r#"<h{}{} class="{}">"#, n, id_attr, style.headings[n - 1]),
                    Closer::Emit(format!("</h{}>\n", n)),
                )
            }
            Tag::Strong => (
                format!(r#"<strong class="{}">"#, style.strong),
                Closer::Emit("</strong>".to_string()),
            ),
            Tag::Emphasis => (
                format!(r#"<em class="{}">"#, style.emphasis),
                Closer::Emit("</em>".to_string()),
            ),
            Tag::BlockQuote(_) => (
                format!("<blockquote class=\"{}\">\n", style.blockquote),
                Closer::Emit("</blockquote>\n".to_string()),
            ),
            Tag::CodeBlock(kind) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => {
                        info.split_whitespace().next().unwrap_or_default().to_string()
                    }
                    CodeBlockKind::Indented => String::new(),
                };
                let code_class = if lang.is_empty() {
                    String::new()
                } else {
                    format!(r#" class="language-{}""#, html_escape(&lang))
                };
                (
                    format!(r#"<pre class="{}"><code{}>"#, style.code_block, code_class),
                    Closer::Emit("</code></pre>\n".to_string()),
                )
            }
            Tag::List(Some(start)) => {
                let start_attr = if start == 1 {
                    String::new()
                } else {
                    format!(r#" start="{}""#, start)
                };
                (
                    format!("<ol{} class=\"{}\">\n", start_attr, style.ordered_list),
                    Closer::Emit("</ol>\n".to_string()),
                )
            }
            Tag::List(None) => (
                format!("<ul class=\"{}\">\n", style.unordered_list),
                Closer::Emit("</ul>\n".to_string()),
            ),
            Tag::Link {
                link_type,
                dest_url,
                title,
                ..
            } => {
                let href = if link_type == LinkType::Email {
                    format!("mailto:{}", dest_url)
                } else {
                    dest_url.to_string()
                };
                (
                    format!(
                        r#"<a href="{}"{} target="_blank" rel="noopener noreferrer" class="{}">"#,
                        html_escape(&href),
                        title_attr(&title),
                        style.link
                    ),
                    Closer::Emit("</a>".to_string()),
                )
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                self.image = Some((
                    resolve_image_path(&dest_url),
                    title.to_string(),
                    String::new(),
                    1,
                ));
                return None;
            }
            Tag::Table(alignments) => {
                self.alignments = alignments;
                (
                    format!("<table class=\"{}\">", style.table),
                    Closer::Table,
                )
            }
            Tag::TableHead => {
                self.in_table_head = true;
                self.cell = 0;
                (
                    format!(r#"<thead class="{}"><tr>"#, style.table_head),
                    Closer::TableHead,
                )
            }
            Tag::TableRow => {
                self.cell = 0;
                let tbody = if self.in_table_body {
                    ""
                } else {
                    self.in_table_body = true;
                    "<tbody>"
                };
                (format!("{}<tr>", tbody), Closer::Emit("</tr>\n".to_string()))
            }
            Tag::TableCell => {
                let cell_tag = if self.in_table_head { "th" } else { "td" };
                let align = match self.alignments.get(self.cell) {
                    Some(Alignment::Left) => r#" align="left""#,
                    Some(Alignment::Center) => r#" align="center""#,
                    Some(Alignment::Right) => r#" align="right""#,
                    _ => "",
                };
                self.cell += 1;
                (
                    format!(r#"<{}{} class="{}">"#, cell_tag, align, style.table_cell),
                    Closer::Emit(format!("</{}>", cell_tag)),
                )
            }
            other => {
                self.closers.push(Closer::Keep);
                return Some(Event::Start(other));
            }
        };

        self.closers.push(closer);
        Some(raw(open))
    }

    /// An HTML block arrives one line per event; rewrite it as a whole so
    /// that tags spanning lines are matched
    fn html_block_event<'a>(&mut self, event: Event<'a>) -> Option<Event<'a>> {
        match event {
            Event::Html(text) | Event::Text(text) => {
                if let Some(block) = self.html_block.as_mut() {
                    block.push_str(&text);
                }
                None
            }
            Event::End(TagEnd::HtmlBlock) => {
                let block = self.html_block.take()?;
                Some(raw(rewrite_img_tags(&block, self.style)))
            }
            _ => None,
        }
    }

    /// Events inside `![alt](src)`: only the alt text is kept
    fn image_event<'a>(&mut self, event: Event<'a>) -> Option<Event<'a>> {
        let (src, title, alt, depth) = self.image.as_mut()?;
        match event {
            Event::Start(_) => *depth += 1,
            Event::End(_) => {
                *depth -= 1;
                if *depth == 0 {
                    let tag = format!(
                        r#"<img src="{}" alt="{}"{} class="{}" />"#,
                        html_escape(src),
                        html_escape(alt),
                        title_attr(title),
                        self.style.image
                    );
                    self.image = None;
                    return Some(raw(tag));
                }
            }
            Event::Text(text) | Event::Code(text) => alt.push_str(&text),
            Event::SoftBreak | Event::HardBreak => alt.push(' '),
            _ => {}
        }
        None
    }
}

fn raw<'a>(html: String) -> Event<'a> {
    Event::Html(CowStr::from(html))
}

fn title_attr(title: &str) -> String {
    if title.is_empty() {
        String::new()
    } else {
        format!(r#" title="{}""#, html_escape(title))
    }
}

/// Rewrite `src` of every `<img>` tag in a raw HTML fragment and give it the
/// preview image class. Other attributes are kept as written.
fn rewrite_img_tags(fragment: &str, style: &PreviewStyle) -> String {
    if !IMG_TAG_RE.is_match(fragment) {
        return fragment.to_string();
    }

    IMG_TAG_RE
        .replace_all(fragment, |caps: &Captures| {
            let mut tag = String::from("<img");
            for attr in ATTR_RE.captures_iter(&caps[1]) {
                let name = &attr[1];
                let value = attr
                    .get(2)
                    .or_else(|| attr.get(3))
                    .or_else(|| attr.get(4))
                    .map(|m| m.as_str());

                if name.eq_ignore_ascii_case("class") {
                    continue;
                }
                match value {
                    Some(value) if name.eq_ignore_ascii_case("src") => {
                        let resolved = resolve_image_path(value);
                        tag.push_str(&format!(r#" src="{}""#, resolved.replace('"', "&quot;")));
                    }
                    Some(value) => {
                        tag.push_str(&format!(r#" {}="{}""#, name, value.replace('"', "&quot;")));
                    }
                    None => {
                        tag.push(' ');
                        tag.push_str(name);
                    }
                }
            }
            tag.push_str(&format!(r#" class="{}" />"#, style.image));
            tag
        })
        .into_owned()
}

/// Drop `data:` URLs everywhere except `<img src="data:image/...">`
fn inline_images_only<'u>(element: &str, attribute: &str, value: &'u str) -> Option<Cow<'u, str>> {
    let lower = value.trim_start().to_ascii_lowercase();
    if lower.starts_with("data:")
        && !(element == "img" && attribute == "src" && lower.starts_with("data:image/"))
    {
        return None;
    }
    Some(Cow::Borrowed(value))
}

/// Sanitize rendered HTML for display
pub fn sanitize(html: &str) -> String {
    SANITIZER.clean(html).to_string()
}

/// Simple HTML escaping
pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(markdown: &str) -> String {
        MarkdownRenderer::new().render(markdown)
    }

    #[test]
    fn test_render_basic_markdown() {
        let html = render("# Hello World\n\nThis is a **bold** and *em* test.");
        assert!(html.contains("Hello World</h1>"));
        assert!(html.contains("<h1 class=\"text-3xl"));
        assert!(html.contains("<strong class="));
        assert!(html.contains(">bold</strong>"));
        assert!(html.contains(">em</em>"));
    }

    #[test]
    fn test_all_heading_levels() {
        let html = render("# a\n## b\n### c\n#### d\n##### e\n###### f\n");
        for n in 1..=6 {
            assert!(html.contains(&format!("<h{} class=", n)), "missing h{}", n);
        }
    }

    #[test]
    fn test_front_matter_is_not_rendered() {
        let html = render("---\ntitle: Secret\n---\n# Visible\n");
        assert!(!html.contains("Secret"));
        assert!(html.contains("Visible</h1>"));
    }

    #[test]
    fn test_end_to_end_post() {
        let content = "---\ntitle: Hi\ndate: 2024-01-01\n---\n# Hello\n![a](../img/5/1.jpg)\n";
        let html = render(content);
        assert!(html.contains("Hello</h1>"));
        assert!(html.contains(r#"src="/api/image/5/1.jpg""#));
        assert!(html.contains(r#"alt="a""#));
    }

    #[test]
    fn test_markdown_image_alt_and_title() {
        let html = render("![a *nice* pic](18/3.png \"Title\")");
        assert!(html.contains(r#"src="/api/image/18/3.png""#));
        assert!(html.contains(r#"alt="a nice pic""#));
        assert!(html.contains(r#"title="Title""#));
        assert!(html.contains("class=\"my-4 rounded-lg"));
    }

    #[test]
    fn test_external_image_untouched() {
        let html = render("![x](https://example.com/a.png)");
        assert!(html.contains(r#"src="https://example.com/a.png""#));
    }

    #[test]
    fn test_data_uri_image_kept() {
        let html = render("![x](data:image/png;base64,AAA)");
        assert!(html.contains(r#"src="data:image/png;base64,AAA""#));
    }

    #[test]
    fn test_html_img_tag_rewritten() {
        let html = render("<img src='../img/7/a.png' width=\"300\" class=\"old\" alt=\"pic\">\n");
        assert!(html.contains(r#"src="/api/image/7/a.png""#));
        assert!(html.contains(r#"width="300""#));
        assert!(html.contains(r#"alt="pic""#));
        assert!(!html.contains(r#"class="old""#));
        assert!(html.contains("class=\"my-4 rounded-lg"));
    }

    #[test]
    fn test_html_block_img_spanning_lines() {
        let html = render("<div>\n<img\n  src=\"../img/1.jpg\" width=\"3\">\n</div>\n\nafter");
        assert!(html.contains(r#"src="/api/image/1.jpg""#));
        assert!(html.contains(r#"width="3""#));
        assert!(html.contains("class=\"my-4 rounded-lg"));
        assert!(html.contains("<div>"));
        assert!(html.contains("after</p>"));
    }

    #[test]
    fn test_inline_html_img_unquoted_src() {
        let html = render("Look: <img src=img/1.jpg> here");
        assert!(html.contains(r#"src="/api/image/1.jpg""#));
        assert!(html.contains("here"));
    }

    #[test]
    fn test_links_open_in_new_context() {
        let html = render("[site](https://example.com)");
        assert!(html.contains(r#"href="https://example.com""#));
        assert!(html.contains(r#"target="_blank""#));
        assert!(html.contains(r#"rel="noopener noreferrer""#));
    }

    #[test]
    fn test_code_blocks() {
        let html = render("```rust\nfn main() { let a = 1 < 2; }\n```\n\nUse `x < y` inline.");
        assert!(html.contains(r#"<code class="language-rust">"#));
        assert!(html.contains("1 &lt; 2"));
        assert!(html.contains(">x &lt; y</code>"));
        assert!(html.contains("<pre class="));
    }

    #[test]
    fn test_code_block_is_not_rewritten() {
        let html = render("```\n![a](../img/1.jpg)\n# not a heading\n```\n");
        assert!(!html.contains("/api/image/"));
        assert!(!html.contains("<h1"));
    }

    #[test]
    fn test_blockquote_rule_and_lists() {
        let html = render("> quoted\n\n---\n\n- a\n- b\n\n3. x\n4. y\n");
        assert!(html.contains("<blockquote class="));
        assert!(html.contains("<hr class="));
        assert!(html.contains("<ul class="));
        assert!(html.contains("<ol start=\"3\" class="));
        assert!(html.contains("<li>a</li>"));
    }

    #[test]
    fn test_table() {
        let html = render("| a | b |\n|:--|--:|\n| 1 | 2 |\n");
        assert!(html.contains("<table class="));
        assert!(html.contains("<thead"));
        assert!(html.contains("<th align=\"left\""));
        assert!(html.contains("<tbody>"));
        assert!(html.contains("<td align=\"right\""));
        assert!(html.contains(">2</td>"));
    }

    #[test]
    fn test_soft_breaks_become_br() {
        let html = render("line one\nline two");
        assert!(html.contains("<br"));

        let plain = MarkdownRenderer::with_options(PreviewStyle::default(), false);
        assert!(!plain.render("line one\nline two").contains("<br"));
    }

    #[test]
    fn test_script_and_style_removed() {
        let html = render("Hello\n\n<script>alert(1)</script>\n\n<style>body{}</style>\n\n<p onclick=\"x()\">p</p>");
        assert!(!html.contains("<script"));
        assert!(!html.contains("alert(1)"));
        assert!(!html.contains("<style"));
        assert!(!html.contains("onclick"));
        assert!(html.contains("Hello"));
    }

    #[test]
    fn test_iframe_is_trusted() {
        let html = render("<iframe src=\"https://player.example.com/v/1\" width=\"560\"></iframe>\n");
        assert!(html.contains("<iframe"));
        assert!(html.contains(r#"src="https://player.example.com/v/1""#));
    }

    #[test]
    fn test_data_urls_only_for_images() {
        let html = render(
            "<iframe src=\"data:text/html,<script>alert(1)</script>\"></iframe>\n\n\
             <a href=\"data:text/html,hi\">a</a> [b](data:text/html,hi)\n\n\
             <img src=\"data:text/html,x\">\n",
        );
        assert!(html.contains("<iframe"));
        assert!(!html.contains("data:text/html"));
        assert!(!html.contains("alert(1)"));

        let html = render("<img src=\"data:image/gif;base64,R0lG\">\n");
        assert!(html.contains(r#"src="data:image/gif;base64,R0lG""#));
    }

    #[test]
    fn test_javascript_link_neutralized() {
        let html = render("[x](javascript:alert(1))");
        assert!(!html.contains("javascript:"));
    }

    #[test]
    fn test_malformed_input_does_not_panic() {
        let garbage = String::from_utf8_lossy(&[0xff, 0x00, 0x1b, b'<', b'i', b'm', b'g', 0xfe]).to_string();
        let inputs = [
            "```rust\nunterminated fence",
            "<div><span><img src=\"a.png\"",
            "<table><tr><td>unbalanced",
            "![](",
            "---\n---\n---",
            "| a |\n|---|\n| 1 | 2 | 3 |",
            garbage.as_str(),
            "",
        ];
        for input in inputs {
            let _ = render(input);
        }
    }
}
