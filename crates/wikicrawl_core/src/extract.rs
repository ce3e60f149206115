use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

/// Parse an HTML document and concatenate every text node in document order.
///
/// No separator is inserted between nodes and whitespace is kept as-is.
/// Text inside `<script>` and `<style>` is included like any other text node.
pub fn extract_text(html: &str) -> String {
    let dom = parse_document(RcDom::default(), Default::default()).one(html);
    collect_text(&dom.document)
}

/// Pre-order walk with an explicit stack. Template contents are visited
/// where the `<template>` element sits.
pub fn collect_text(root: &Handle) -> String {
    let mut text = String::new();
    let mut stack = vec![root.clone()];

    while let Some(node) = stack.pop() {
        match &node.data {
            NodeData::Text { contents } => text.push_str(&contents.borrow()),
            NodeData::Element {
                template_contents, ..
            } => {
                if let Some(contents) = template_contents.borrow().as_ref() {
                    stack.push(contents.clone());
                }
            }
            _ => {}
        }
        // Reverse so the first child is popped first.
        for child in node.children.borrow().iter().rev() {
            stack.push(child.clone());
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::extract_text;

    #[test]
    fn extracts_body_text() {
        assert_eq!(extract_text("<html><body>Hello</body></html>"), "Hello");
    }

    #[test]
    fn concatenates_without_separators() {
        let html = "<p>Rapi<b>Red</b><i>Hood</i></p><p>Anis</p>";
        assert_eq!(extract_text(html), "RapiRedHoodAnis");
    }

    #[test]
    fn keeps_whitespace_between_nodes_verbatim() {
        let html = "<ul>\n  <li>One</li>\n  <li>Two</li>\n</ul>";
        assert_eq!(extract_text(html), "\n  One\n  Two\n");
    }

    #[test]
    fn ignores_tags_attributes_and_comments() {
        let html = r#"<!DOCTYPE html><div class="infobox" title="tooltip"><!-- hidden -->Burst<img alt="icon" src="x.png"></div>"#;
        assert_eq!(extract_text(html), "Burst");
    }

    #[test]
    fn includes_script_and_style_text() {
        let html = "<head><title>T</title><style>p{}</style></head><body><script>var x = 1;</script>Body</body>";
        assert_eq!(extract_text(html), "Tp{}var x = 1;Body");
    }

    #[test]
    fn decodes_character_references() {
        assert_eq!(extract_text("<p>Tom &amp; Jerry&nbsp;&lt;3</p>"), "Tom & Jerry\u{a0}<3");
    }

    #[test]
    fn walks_template_contents_in_place() {
        let html = "<body>A<template>B<span>C</span></template>D</body>";
        assert_eq!(extract_text(html), "ABCD");
    }

    #[test]
    fn deep_nesting_does_not_overflow() {
        let depth = 5_000;
        let mut html = String::with_capacity(depth * 11);
        for _ in 0..depth {
            html.push_str("<div>");
        }
        html.push_str("deep");
        for _ in 0..depth {
            html.push_str("</div>");
        }
        assert_eq!(extract_text(&html), "deep");
    }

    #[test]
    fn empty_document_yields_empty_text() {
        assert_eq!(extract_text(""), "");
    }
}
