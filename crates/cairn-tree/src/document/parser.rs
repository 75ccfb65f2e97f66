//! Lenient HTML tokenizer on top of `quick-xml`.
//!
//! HTML is not XML, so the reader runs with end-name checks disabled and the
//! tree is assembled on an explicit stack:
//! - void elements (`<br>`, `<meta>`, ...) never open a scope
//! - an end tag closes the nearest open element with the same name, closing
//!   anything opened after it
//! - end tags with no open counterpart are dropped
//! - elements still open at end of input are closed implicitly
//! - a block-level start tag closes an open `<p>`
//! - `<script>` and `<style>` bodies are raw text up to their end tag
//! - a `&` that does not start a reference is literal text

use std::borrow::Cow;
use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use super::entities::decode_reference;
use super::{DocNode, Document, DocumentError, Element, is_raw_text, is_void};

pub(super) fn parse(html: &str) -> Result<Document, DocumentError> {
    let mut reader = Reader::from_str(html);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    config.allow_dangling_amp = true;

    let mut doctype = None;
    // stack[0] collects top-level nodes
    let mut stack = vec![Element::default()];
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::DocType(e) => {
                doctype = Some(reader.decoder().decode(&e)?.trim().to_owned());
            }
            Event::Start(e) => {
                let mut element = open_element(&reader, &e);
                if closes_paragraph(&element.name) {
                    close_open_paragraph(&mut stack);
                }
                if is_void(&element.name) {
                    push_node(&mut stack, DocNode::Element(element));
                } else {
                    if is_raw_text(&element.name) {
                        let body = read_raw_text(&mut reader, &element.name)?;
                        if !body.is_empty() {
                            element.children.push(DocNode::Text(body));
                        }
                    }
                    stack.push(element);
                }
            }
            Event::Empty(e) => {
                let element = open_element(&reader, &e);
                if closes_paragraph(&element.name) {
                    close_open_paragraph(&mut stack);
                }
                push_node(&mut stack, DocNode::Element(element));
            }
            Event::End(e) => {
                let name = decode_name(&reader, e.name().as_ref());
                close_element(&mut stack, &name);
            }
            Event::Text(e) => {
                let text = reader.decoder().decode(&e)?;
                push_text(&mut stack, &text);
            }
            Event::GeneralRef(e) => {
                let name = reader.decoder().decode(&e)?;
                push_text(&mut stack, &decode_reference(&name));
            }
            Event::CData(e) => {
                push_text(&mut stack, &String::from_utf8_lossy(&e));
            }
            Event::Comment(e) => {
                let body = reader.decoder().decode(&e)?.into_owned();
                push_node(&mut stack, DocNode::Comment(body));
            }
            Event::Eof => break,
            Event::Decl(_) | Event::PI(_) => {}
        }
        buf.clear();
    }

    while stack.len() > 1 {
        pop_into_parent(&mut stack);
    }
    let root = stack.pop().unwrap_or_default();

    Ok(Document {
        doctype,
        children: root.children,
    })
}

fn open_element(reader: &Reader<&[u8]>, e: &BytesStart) -> Element {
    let name = decode_name(reader, e.name().as_ref());
    let attrs = e
        .html_attributes()
        .flatten()
        .map(|attr| {
            let key = decode_name(reader, attr.key.as_ref());
            let value = attr.unescape_value().map_or_else(
                |_| String::from_utf8_lossy(&attr.value).into_owned(),
                Cow::into_owned,
            );
            (key, value)
        })
        .collect();
    Element {
        name,
        attrs,
        children: Vec::new(),
    }
}

/// Consume everything up to the matching end tag (or end of input) as one
/// text run. The end tag itself is left for the next event.
fn read_raw_text(reader: &mut Reader<&[u8]>, name: &str) -> Result<String, DocumentError> {
    let end_tag = format!("</{name}");
    let mut stream = reader.stream();
    let rest = stream.fill_buf().map_err(quick_xml::Error::from)?;
    let len = rest
        .windows(end_tag.len())
        .position(|window| window.eq_ignore_ascii_case(end_tag.as_bytes()))
        .unwrap_or(rest.len());
    let body = String::from_utf8_lossy(&rest[..len]).into_owned();
    stream.consume(len);
    Ok(body)
}

fn closes_paragraph(name: &str) -> bool {
    matches!(
        name,
        "address"
            | "article"
            | "aside"
            | "blockquote"
            | "details"
            | "dialog"
            | "div"
            | "dl"
            | "fieldset"
            | "figcaption"
            | "figure"
            | "footer"
            | "form"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "header"
            | "hgroup"
            | "hr"
            | "main"
            | "menu"
            | "nav"
            | "ol"
            | "p"
            | "pre"
            | "section"
            | "table"
            | "ul"
    )
}

/// Elements an open `<p>` cannot be closed across.
fn is_paragraph_scope(name: &str) -> bool {
    matches!(
        name,
        "button" | "caption" | "html" | "object" | "table" | "td" | "template" | "th"
    )
}

fn decode_name(reader: &Reader<&[u8]>, name: &[u8]) -> String {
    reader
        .decoder()
        .decode(name)
        .map_or_else(|_| String::from_utf8_lossy(name).into_owned(), Cow::into_owned)
        .to_ascii_lowercase()
}

fn push_node(stack: &mut [Element], node: DocNode) {
    if let Some(top) = stack.last_mut() {
        top.children.push(node);
    }
}

fn push_text(stack: &mut [Element], text: &str) {
    let Some(top) = stack.last_mut() else {
        return;
    };
    if let Some(DocNode::Text(existing)) = top.children.last_mut() {
        existing.push_str(text);
    } else {
        top.children.push(DocNode::Text(text.to_owned()));
    }
}

fn close_element(stack: &mut Vec<Element>, name: &str) {
    let Some(depth) = stack.iter().skip(1).rposition(|open| open.name == name) else {
        return;
    };
    // rposition over the skipped iterator is relative to index 1
    close_to(stack, depth + 1);
}

fn close_open_paragraph(stack: &mut Vec<Element>) {
    let Some(depth) = stack
        .iter()
        .skip(1)
        .rposition(|open| open.name == "p" || is_paragraph_scope(&open.name))
    else {
        return;
    };
    let target = depth + 1;
    if stack[target].name == "p" {
        close_to(stack, target);
    }
}

fn close_to(stack: &mut Vec<Element>, target: usize) {
    while stack.len() > target {
        pop_into_parent(stack);
    }
}

fn pop_into_parent(stack: &mut Vec<Element>) {
    if let Some(element) = stack.pop() {
        push_node(stack, DocNode::Element(element));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn element(doc: &Document, index: usize) -> &Element {
        match &doc.children[index] {
            DocNode::Element(element) => element,
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_simple_element() {
        let doc = parse("<p>Hello</p>").unwrap();
        let p = element(&doc, 0);
        assert_eq!(p.name, "p");
        assert_eq!(p.children, vec![DocNode::Text("Hello".to_owned())]);
    }

    #[test]
    fn test_parse_doctype() {
        let doc = parse("<!DOCTYPE html><html></html>").unwrap();
        assert_eq!(doc.doctype.as_deref(), Some("html"));
        assert_eq!(element(&doc, 0).name, "html");
    }

    #[test]
    fn test_void_elements_do_not_nest() {
        let doc = parse("<p>Before<br>After</p>").unwrap();
        let p = element(&doc, 0);
        assert_eq!(p.children.len(), 3);
        assert_eq!(p.children[2], DocNode::Text("After".to_owned()));
    }

    #[test]
    fn test_unclosed_element_closed_by_parent_end() {
        let doc = parse("<ul><li>one<li>two</ul><p>x</p>").unwrap();
        assert_eq!(doc.children.len(), 2);
        assert_eq!(element(&doc, 1).name, "p");
    }

    #[test]
    fn test_stray_end_tag_ignored() {
        let doc = parse("<p>a</span>b</p>").unwrap();
        assert_eq!(element(&doc, 0).text_content(), "ab");
    }

    #[test]
    fn test_attributes_and_entities() {
        let doc = parse(r#"<a href="/x?a=1&amp;b=2" data-flag>T&nbsp;&#65;</a>"#).unwrap();
        let a = element(&doc, 0);
        assert_eq!(a.attr("href"), Some("/x?a=1&b=2"));
        assert_eq!(a.attr("data-flag"), Some(""));
        assert_eq!(a.text_content(), "T\u{00a0}A");
    }

    #[test]
    fn test_uppercase_tags_lowercased() {
        let doc = parse("<DIV>x</DIV>").unwrap();
        assert_eq!(element(&doc, 0).name, "div");
    }

    #[test]
    fn test_script_body_is_raw_text() {
        let html = "<script>if (a < b && c > 1) { go(); }</script><p>after</p>";
        let doc = parse(html).unwrap();
        let script = element(&doc, 0);
        assert_eq!(
            script.children,
            vec![DocNode::Text("if (a < b && c > 1) { go(); }".to_owned())]
        );
        assert_eq!(element(&doc, 1).text_content(), "after");
        assert_eq!(doc.to_html(), html);
    }

    #[test]
    fn test_style_body_is_raw_text() {
        let html = "<style>a > b::after { content: \"<&>\"; }</STYLE>";
        let doc = parse(html).unwrap();
        assert_eq!(
            element(&doc, 0).children,
            vec![DocNode::Text("a > b::after { content: \"<&>\"; }".to_owned())]
        );
    }

    #[test]
    fn test_unterminated_script_runs_to_end() {
        let doc = parse("<script>let x = 1 < 2;").unwrap();
        assert_eq!(element(&doc, 0).text_content(), "let x = 1 < 2;");
    }

    #[test]
    fn test_bare_ampersand_is_text() {
        let doc = parse("<p>AT&T rocks</p>").unwrap();
        assert_eq!(element(&doc, 0).text_content(), "AT&T rocks");
        assert_eq!(doc.to_html(), "<p>AT&amp;T rocks</p>");
    }

    #[test]
    fn test_unknown_reference_kept_literally() {
        let doc = parse("<p>a &bogus; b & c</p>").unwrap();
        assert_eq!(element(&doc, 0).text_content(), "a &bogus; b & c");
    }

    #[test]
    fn test_block_start_closes_paragraph() {
        let doc = parse("<p>one<p>two").unwrap();
        assert_eq!(doc.to_html(), "<p>one</p><p>two</p>");

        let doc = parse("<p>intro<div>box</div>").unwrap();
        assert_eq!(doc.to_html(), "<p>intro</p><div>box</div>");
    }

    #[test]
    fn test_paragraph_not_closed_across_scope_boundary() {
        let doc = parse("<p><button>x<div>y</div></button></p>").unwrap();
        assert_eq!(doc.to_html(), "<p><button>x<div>y</div></button></p>");
    }

    #[test]
    fn test_comment_preserved() {
        let doc = parse("<!-- note --><p></p>").unwrap();
        assert_eq!(doc.children[0], DocNode::Comment(" note ".to_owned()));
    }
}
