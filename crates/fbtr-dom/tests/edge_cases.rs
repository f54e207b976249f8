//! Edge case tests for fbtr-dom
//!
//! Observer batching and listener behaviour while the tree is restructured.

use fbtr_dom::{Document, DomTree, MutationObserverInit, MutationType, NodeId, listener};

fn observed_body() -> (Document, fbtr_dom::ObserverId, NodeId) {
    let mut doc = Document::new("https://www.facebook.com/");
    let body = doc.body().unwrap();
    let observer = doc.tree.create_observer();
    doc.tree.observe(observer, body, MutationObserverInit {
        child_list: true,
        attributes: true,
        subtree: true,
        attribute_filter: Some(vec!["href".to_string()]),
    });
    (doc, observer, body)
}

#[test]
fn test_move_produces_remove_then_add() {
    let (mut doc, observer, body) = observed_body();
    let a = doc.tree.create_element("div");
    let b = doc.tree.create_element("div");
    doc.tree.append_child(body, a).unwrap();
    doc.tree.append_child(body, b).unwrap();
    doc.tree.take_records(observer);

    doc.tree.append_child(a, b).unwrap();
    let records = doc.tree.take_records(observer);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].target, body);
    assert_eq!(records[0].removed_nodes, vec![b]);
    assert_eq!(records[1].target, a);
    assert_eq!(records[1].added_nodes, vec![b]);
}

#[test]
fn test_replace_is_single_record() {
    let (mut doc, observer, body) = observed_body();
    let old = doc.tree.create_element("div");
    doc.tree.append_child(body, old).unwrap();
    doc.tree.take_records(observer);

    let new = doc.tree.create_element("video");
    doc.tree.replace_with(old, new).unwrap();
    let records = doc.tree.take_records(observer);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].mutation_type, MutationType::ChildList);
    assert_eq!(records[0].added_nodes, vec![new]);
    assert_eq!(records[0].removed_nodes, vec![old]);
}

#[test]
fn test_same_value_attribute_write_is_recorded() {
    let (mut doc, observer, body) = observed_body();
    let a = doc.tree.create_element_with_attrs("a", &[("href", "/x")]);
    doc.tree.append_child(body, a).unwrap();
    doc.tree.take_records(observer);

    doc.tree.set_attribute(a, "href", "/x").unwrap();
    let records = doc.tree.take_records(observer);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].old_value.as_deref(), Some("/x"));
}

#[test]
fn test_disconnect_stops_delivery() {
    let (mut doc, observer, body) = observed_body();
    doc.tree.disconnect(observer);
    let p = doc.tree.create_element("p");
    doc.tree.append_child(body, p).unwrap();
    assert!(!doc.tree.has_pending_records(observer));
}

#[test]
fn test_listener_can_replace_its_target() {
    let mut tree = DomTree::new();
    let parent = tree.create_element("div");
    let placeholder = tree.create_element("div");
    tree.append_child(NodeId::ROOT, parent).unwrap();
    tree.append_child(parent, placeholder).unwrap();

    tree.add_event_listener(
        placeholder,
        "click",
        fbtr_dom::ListenerOptions::capture(),
        listener(|tree, event| {
            event.stop_propagation();
            let video = tree.create_element("video");
            tree.replace_with(event.target, video).unwrap();
            tree.play(video).unwrap();
        }),
    );

    tree.dispatch_event(placeholder, "click");
    let children = tree.children(parent);
    assert_eq!(children.len(), 1);
    assert!(tree.has_tag(children[0], "video"));
    assert!(tree.is_playing(children[0]));
}

#[test]
fn test_set_text_content() {
    let mut tree = DomTree::new();
    let style = tree.create_element("style");
    tree.set_text_content(style, "a { color: red }").unwrap();
    tree.set_text_content(style, "b { color: blue }").unwrap();
    assert_eq!(tree.children(style).len(), 1);
    assert_eq!(tree.text_content(style), "b { color: blue }");
    tree.set_text_content(style, "").unwrap();
    assert!(tree.children(style).is_empty());
}
