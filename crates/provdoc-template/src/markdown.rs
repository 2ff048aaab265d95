//! Markdown to plain text.

use pulldown_cmark::{Event, Parser, TagEnd};

/// Strips markdown formatting, keeping only the readable text.
///
/// Emphasis, links, inline code and headings lose their markers; link and
/// image targets are dropped but their text is kept. Block elements are
/// separated by a blank line, list items by a single newline. Raw HTML is
/// removed.
///
/// ```rust
/// use provdoc_template::plain_markdown;
///
/// assert_eq!(
///     plain_markdown("See the **[docs](https://example.com)** for `id`."),
///     "See the docs for id."
/// );
/// ```
pub fn plain_markdown(input: &str) -> String {
    let mut out = String::with_capacity(input.len());

    for event in Parser::new(input) {
        match event {
            Event::Text(text) | Event::Code(text) => out.push_str(&text),
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            Event::End(TagEnd::Item) => end_line(&mut out),
            Event::End(
                TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::CodeBlock | TagEnd::List(_),
            )
            | Event::Rule => end_block(&mut out),
            _ => {}
        }
    }

    let trimmed = out.trim_end_matches('\n').len();
    out.truncate(trimmed);
    out
}

fn end_line(out: &mut String) {
    let trimmed = out.trim_end_matches('\n').len();
    out.truncate(trimmed);
    if !out.is_empty() {
        out.push('\n');
    }
}

fn end_block(out: &mut String) {
    let trimmed = out.trim_end_matches('\n').len();
    out.truncate(trimmed);
    if !out.is_empty() {
        out.push_str("\n\n");
    }
}
