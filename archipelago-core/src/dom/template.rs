//! Templates and patching.
//!
//! A [`Template`] is built from static markup and interpolated values.
//! Static parts must be `&'static str`, so untrusted strings can only enter as
//! interpolations, and interpolations are always escaped when rendered.

use std::fmt::Display;

use super::node::Node;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Static(&'static str),
    Text(String),
}

/// Markup with escaped interpolations.
///
/// ```rust
/// use archipelago_core::dom::Template;
///
/// let name = "<script>";
/// let markup = Template::new().markup("<b>").text(name).markup("</b>").render();
/// assert_eq!(markup, "<b>&lt;script&gt;</b>");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    parts: Vec<Part>,
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append static markup.
    pub fn markup(mut self, markup: &'static str) -> Self {
        self.parts.push(Part::Static(markup));
        self
    }

    /// Append an interpolated value, escaped on render.
    pub fn text(mut self, value: impl Display) -> Self {
        self.parts.push(Part::Text(value.to_string()));
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Static(markup) => out.push_str(markup),
                Part::Text(text) => escape_into(&mut out, text),
            }
        }
        out
    }
}

fn escape_into(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
}

/// Applies a template to a target node.
pub trait Patcher {
    fn patch(&self, target: &Node, template: &Template);
}

/// Writes rendered markup into the node's content slot, skipping writes that
/// would not change it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentPatcher;

impl Patcher for ContentPatcher {
    fn patch(&self, target: &Node, template: &Template) {
        let markup = template.render();
        if target.content().as_deref() == Some(markup.as_str()) {
            return;
        }
        target.set_content(markup);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolations_are_escaped() {
        let markup = Template::new()
            .markup("<a title=\"")
            .text("\"><img onerror='x'>")
            .markup("\">&</a>")
            .render();
        assert_eq!(
            markup,
            "<a title=\"&quot;&gt;&lt;img onerror=&#x27;x&#x27;&gt;\">&</a>"
        );
    }

    #[test]
    fn content_patcher_skips_identical_markup() {
        let node = Node::element("div");
        let template = Template::new().markup("<p>").text(1).markup("</p>");

        ContentPatcher.patch(&node, &template);
        ContentPatcher.patch(&node, &template);
        assert_eq!(node.content().as_deref(), Some("<p>1</p>"));
        assert_eq!(node.patch_count(), 1);

        ContentPatcher.patch(&node, &Template::new().text(2));
        assert_eq!(node.content().as_deref(), Some("2"));
        assert_eq!(node.patch_count(), 2);
    }
}
