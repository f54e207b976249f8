//! Edge case tests for fbtr-html

use fbtr_dom::MutationObserverInit;
use fbtr_html::HtmlParser;
use pretty_assertions::assert_eq;

#[test]
fn test_attributes_survive_round_trip() {
    let html = r#"<a href="/l.php?u=https%3A%2F%2Fexample.com&amp;h=AT0" onclick="LinkshimAsyncLink.referrer_log(this, &quot;x&quot;)">go</a>"#;
    let doc = HtmlParser::new().parse(html);
    let body = doc.body().unwrap();
    let a = doc.tree().first_child(body).unwrap();
    assert_eq!(doc.tree().get_attribute(a, "href"), Some("/l.php?u=https%3A%2F%2Fexample.com&h=AT0"));
    assert_eq!(doc.tree().get_attribute(a, "onclick"), Some(r#"LinkshimAsyncLink.referrer_log(this, "x")"#));
}

#[test]
fn test_malformed_markup_does_not_panic() {
    let html = "<div><p>Unclosed paragraph<span>Unclosed span</div><p>Another";
    let doc = HtmlParser::new().parse(html);
    assert!(doc.tree().len() > 4);
}

#[test]
fn test_fragment_insertion_is_one_record_per_top_level_node() {
    let mut doc = HtmlParser::new().parse_with_url("<div id='stream'></div>", "https://www.facebook.com/");
    let stream = doc.get_element_by_id("stream").unwrap();
    let observer = doc.tree.create_observer();
    doc.tree.observe(observer, stream, MutationObserverInit {
        child_list: true,
        subtree: true,
        ..Default::default()
    });

    HtmlParser::new()
        .append_fragment(&mut doc.tree, stream, "<div><div><a href='/x'>deep</a></div></div><p>second</p>")
        .unwrap();
    let records = doc.tree.take_records(observer);
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.target == stream && r.added_nodes.len() == 1));
}

#[test]
fn test_document_url_kept() {
    let doc = HtmlParser::new().parse_with_url("", "https://m.facebook.com/home.php");
    assert_eq!(doc.url(), "https://m.facebook.com/home.php");
    assert_eq!(doc.domain(), "m.facebook.com");
}
