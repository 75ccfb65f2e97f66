//! HTML serializer for [`Document`].

use std::fmt::Write;

use super::{DocNode, Document, Element, is_raw_text, is_void};

pub(super) fn serialize(doc: &Document) -> String {
    let mut out = String::with_capacity(4096);
    if let Some(doctype) = &doc.doctype {
        let _ = write!(out, "<!DOCTYPE {doctype}>");
    }
    for node in &doc.children {
        serialize_node(node, false, &mut out);
    }
    out
}

fn serialize_node(node: &DocNode, raw_text: bool, out: &mut String) {
    match node {
        DocNode::Element(element) => serialize_element(element, out),
        DocNode::Text(text) if raw_text => out.push_str(text),
        DocNode::Text(text) => escape_into(text, false, out),
        DocNode::Comment(body) => {
            let _ = write!(out, "<!--{body}-->");
        }
    }
}

fn serialize_element(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&element.name);
    for (key, value) in &element.attrs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        escape_into(value, true, out);
        out.push('"');
    }
    out.push('>');

    if is_void(&element.name) {
        return;
    }

    let raw_text = is_raw_text(&element.name);
    for child in &element.children {
        serialize_node(child, raw_text, out);
    }
    let _ = write!(out, "</{}>", element.name);
}

fn escape_into(text: &str, attr: bool, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attr => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_nested() {
        let mut p = Element::new("p");
        let mut strong = Element::new("strong");
        strong.set_text("Bold");
        p.append(DocNode::Element(strong));
        p.append(DocNode::Text(" text".to_owned()));
        let doc = Document {
            doctype: None,
            children: vec![DocNode::Element(p)],
        };
        assert_eq!(serialize(&doc), "<p><strong>Bold</strong> text</p>");
    }

    #[test]
    fn test_serialize_void_without_end_tag() {
        let mut img = Element::new("img");
        img.set_attr("src", "/a.png");
        let doc = Document {
            doctype: Some("html".to_owned()),
            children: vec![DocNode::Element(img)],
        };
        assert_eq!(serialize(&doc), r#"<!DOCTYPE html><img src="/a.png">"#);
    }

    #[test]
    fn test_escape_text_and_attrs() {
        let mut a = Element::new("a");
        a.set_attr("title", r#"say "hi" & go"#);
        a.set_text("a < b");
        let doc = Document {
            doctype: None,
            children: vec![DocNode::Element(a)],
        };
        assert_eq!(
            serialize(&doc),
            r#"<a title="say &quot;hi&quot; &amp; go">a &lt; b</a>"#
        );
    }

    #[test]
    fn test_script_body_verbatim() {
        let mut script = Element::new("script");
        script.set_text("if (a < b) {}");
        let doc = Document {
            doctype: None,
            children: vec![DocNode::Element(script)],
        };
        assert_eq!(serialize(&doc), "<script>if (a < b) {}</script>");
    }

    #[test]
    fn test_round_trip() {
        let html = r#"<!DOCTYPE html><html><head><meta charset="utf-8"></head><body><p class="x">Hi<br>there</p></body></html>"#;
        let doc = Document::parse(html).unwrap();
        assert_eq!(serialize(&doc), html);
    }
}
