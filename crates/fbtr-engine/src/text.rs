//! Text helpers: visible text, normalization and quoted-string extraction

use fbtr_dom::{DomTree, NodeId};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Elements whose content never renders
const INVISIBLE_TAGS: &[&str] = &["script", "style", "noscript", "template", "head", "title"];

/// Text a reader would see inside `node`, with hidden descendants left out.
///
/// Adjacent text runs are joined without separators so labels split across
/// inline elements (`<span>Spon</span><span>sored</span>`) read as one word.
pub fn visible_text(tree: &DomTree, node: NodeId) -> String {
    let mut out = String::new();
    collect_visible(tree, node, &mut out);
    out
}

fn collect_visible(tree: &DomTree, node: NodeId, out: &mut String) {
    for child in tree.children(node) {
        if let Some(text) = tree.get(child).and_then(|n| n.as_text()) {
            out.push_str(text);
        } else if tree.is_element(child) && !is_hidden(tree, child) {
            collect_visible(tree, child, out);
        }
    }
}

/// Whether an element is excluded from visible text
pub fn is_hidden(tree: &DomTree, node: NodeId) -> bool {
    let Some(el) = tree.element(node) else {
        return false;
    };
    if INVISIBLE_TAGS.contains(&el.tag.as_str()) || el.has_attr("hidden") {
        return true;
    }
    if el.get_attr("aria-hidden").is_some_and(|v| v.eq_ignore_ascii_case("true")) {
        return true;
    }
    el.get_attr("style")
        .and_then(|style| inline_style_property(style, "display"))
        .is_some_and(|display| display.eq_ignore_ascii_case("none"))
}

/// Value of one property in an inline `style` attribute
pub fn inline_style_property<'a>(style: &'a str, property: &str) -> Option<&'a str> {
    style.split(';').rev().find_map(|decl| {
        let (name, value) = decl.split_once(':')?;
        name.trim()
            .eq_ignore_ascii_case(property)
            .then(|| value.trim().trim_end_matches("!important").trim())
    })
}

/// Canonical form for label comparison: decomposed, diacritics dropped,
/// lowercased, whitespace collapsed.
pub fn normalize_string(s: &str) -> String {
    let folded: String = s.nfd().filter(|c| !is_combining_mark(*c)).collect::<String>().to_lowercase();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Content of the first single- or double-quoted string in `s`.
/// Backslash escapes inside the string are kept as written.
pub fn extract_quoted_string(s: &str) -> Option<&str> {
    let (start, quote) = s.char_indices().find(|&(_, c)| c == '"' || c == '\'')?;
    let body = start + 1;
    let mut escaped = false;
    for (i, c) in s[body..].char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            c if c == quote => return Some(&s[body..body + i]),
            _ => {}
        }
    }
    None
}

/// Drop one level of backslash escaping (`https:\/\/x` becomes `https://x`)
pub fn unescape_backslashes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_string() {
        assert_eq!(normalize_string("  Sponsorisé\n "), "sponsorise");
        assert_eq!(normalize_string("Suggested   for\tyou"), "suggested for you");
        assert_eq!(normalize_string("Gesponsert"), "gesponsert");
    }

    #[test]
    fn test_extract_quoted_string() {
        let attr = r#"LinkshimAsyncLink.swap(this, "https:\/\/example.com\/page");"#;
        assert_eq!(extract_quoted_string(attr), Some(r"https:\/\/example.com\/page"));
        assert_eq!(extract_quoted_string("url('a.jpg')"), Some("a.jpg"));
        assert_eq!(extract_quoted_string(r#"f("a\"b")"#), Some(r#"a\"b"#));
        assert_eq!(extract_quoted_string("url(a.jpg)"), None);
        assert_eq!(extract_quoted_string("\"unterminated"), None);
    }

    #[test]
    fn test_unescape_backslashes() {
        assert_eq!(unescape_backslashes(r"https:\/\/example.com\/page"), "https://example.com/page");
        assert_eq!(unescape_backslashes(r"a\\b"), r"a\b");
    }

    #[test]
    fn test_inline_style_property() {
        let style = "color: red; background-image: url(\"x.jpg\"); DISPLAY : none !important";
        assert_eq!(inline_style_property(style, "display"), Some("none"));
        assert_eq!(inline_style_property(style, "background-image"), Some("url(\"x.jpg\")"));
        assert_eq!(inline_style_property(style, "width"), None);
    }

    #[test]
    fn test_visible_text_skips_hidden() {
        let mut tree = DomTree::new();
        let root = tree.create_element("div");
        tree.append_child(NodeId::ROOT, root).unwrap();
        for (tag, attrs, text) in [
            ("span", vec![], "Spon"),
            ("span", vec![("style", "display:none")], "XX"),
            ("span", vec![("aria-hidden", "true")], "YY"),
            ("script", vec![], "var z"),
            ("span", vec![], "sored"),
        ] {
            let el = tree.create_element_with_attrs(tag, &attrs);
            let t = tree.create_text(text);
            tree.append_child(el, t).unwrap();
            tree.append_child(root, el).unwrap();
        }
        assert_eq!(visible_text(&tree, root), "Sponsored");
    }
}
