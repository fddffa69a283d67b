//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Mu.
//! The Mu project belongs to the Dunimd project team.

use mux::MuConfigElement;

fn item(name: &str, value: &str) -> MuConfigElement {
    let mut element = MuConfigElement::new(name);
    element.push_attribute("value", value);
    element
}

#[test]
fn test_repeated_children_are_preserved_in_order() {
    let mut root = MuConfigElement::new("menu");
    root.push_child(item("entry", "open"));
    root.push_child(item("separator", ""));
    root.push_child(item("entry", "close"));

    let entries: Vec<&str> = root
        .children_named("entry")
        .map(|c| c.attribute("value").unwrap())
        .collect();
    assert_eq!(entries, vec!["open", "close"]);

    let all: Vec<&str> = root.children().iter().map(|c| c.name()).collect();
    assert_eq!(all, vec!["entry", "separator", "entry"]);
}

#[test]
fn test_attribute_reads() {
    let mut element = MuConfigElement::new("service");
    element.push_attribute("uid", "reader");
    element.push_attribute("type", "io::SReader");

    assert_eq!(element.attribute("uid"), Some("reader"));
    assert_eq!(element.attribute("absent"), None);
    assert!(element.has_attribute("type"));

    let keys: Vec<&str> = element.attributes().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["uid", "type"]);
}

#[test]
fn test_first_child_finds_earliest_occurrence() {
    let mut root = MuConfigElement::new("config");
    root.push_child(item("worker", "a"));
    root.push_child(item("worker", "b"));

    let first = root.first_child("worker").unwrap();
    assert_eq!(first.attribute("value"), Some("a"));
    assert!(root.first_child("absent").is_none());
}

#[test]
fn test_to_json_keeps_every_repetition() {
    let mut root = MuConfigElement::new("activate");
    root.push_attribute("id", "vendor::e");
    root.push_child(item("param", "1"));
    root.push_child(item("param", "2"));

    let json = root.to_json();
    assert_eq!(json["@id"], "vendor::e");
    assert_eq!(json["param"][0]["@value"], "1");
    assert_eq!(json["param"][1]["@value"], "2");
}

#[test]
fn test_to_json_text_handling() {
    let mut note = MuConfigElement::new("note");
    note.push_text("hello");
    assert_eq!(note.to_json(), serde_json::json!("hello"));

    let mut mixed = MuConfigElement::new("note");
    mixed.push_attribute("lang", "en");
    mixed.push_text("hello");
    let json = mixed.to_json();
    assert_eq!(json["@lang"], "en");
    assert_eq!(json["_text"], "hello");
}
