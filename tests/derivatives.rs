//! Freezing, copy-on-write derivatives and the latest-derivative query.

mod common;

use std::rc::Rc;

use lineage::Error;

use common::SealedDocument;
use common::manual_forest;
use common::text;
use common::text_of;

// =============================================================================
// get_writable
// =============================================================================

#[test]
fn unfrozen_node_is_its_own_writable() {
    let (forest, _) = manual_forest(0);
    let root = forest.make_list();
    let node = root.make_node(text("a")).unwrap();

    let writable = node.get_writable().unwrap();
    assert_eq!(writable, node);
    assert_eq!(node.ref_count(), 2);
    assert!(node.derived_models().is_empty());
}

#[test]
fn frozen_node_yields_a_fresh_derivative() {
    let (forest, _) = manual_forest(0);
    let root = forest.make_list();
    let node = root.make_node(text("published")).unwrap();
    root.add_model(&node).unwrap();
    node.set_frozen(true);

    let draft = node.get_writable().unwrap();
    assert_ne!(draft, node);
    assert!(!draft.is_frozen());
    assert!(node.is_frozen());
    assert_eq!(draft.parent_list().unwrap(), node.derived_models());
    assert_eq!(draft.parent_list().unwrap().parent_node().unwrap(), node);
    assert_ne!(draft.document().id(), node.document().id());
    assert_eq!(text_of(&draft.document()), "published");

    // Each request on a frozen node makes another derivative.
    let second = node.get_writable().unwrap();
    assert_ne!(second, draft);
    assert_eq!(node.derived_models().len(), 2);
}

#[test]
fn derivative_of_a_derivative() {
    let (forest, _) = manual_forest(0);
    let root = forest.make_list();
    let node = root.make_node(text("v1")).unwrap();
    root.add_model(&node).unwrap();
    node.set_frozen(true);

    let draft = node.get_writable().unwrap();
    draft.set_frozen(true);
    let redraft = draft.get_writable().unwrap();
    assert_eq!(redraft.parent_list().unwrap(), draft.derived_models());
    assert_eq!(root.ref_count(), 4);
}

#[test]
fn sealed_document_cannot_be_derived() {
    let (forest, _) = manual_forest(0);
    let root = forest.make_list();
    let node = root.make_node(Some(Rc::new(SealedDocument::new()))).unwrap();
    node.set_frozen(true);

    assert_eq!(node.get_writable().unwrap_err(), Error::CloneFailed);
    assert!(node.derived_models().is_empty());
    assert_eq!(forest.node_count(), 1);
}

// =============================================================================
// Timestamps
// =============================================================================

#[test]
fn timestamp_is_set_at_creation_and_only_restamped_explicitly() {
    let (forest, clock) = manual_forest(100);
    let root = forest.make_list();
    let node = root.make_node(text("a")).unwrap();
    assert_eq!(node.timestamp(), 100);

    clock.set(200);
    node.rename("renamed");
    node.set_frozen(true);
    assert_eq!(node.timestamp(), 100);

    node.stamp_modified_now();
    assert_eq!(node.timestamp(), 200);
}

#[test]
fn default_name_comes_from_the_configured_format() {
    let (forest, _) = manual_forest(0);
    let node = forest.make_list().make_node(text("a")).unwrap();
    assert_eq!(node.name(), "node");
    node.rename("draft 2");
    assert_eq!(node.name(), "draft 2");
}

// =============================================================================
// latest_derivative
// =============================================================================

#[test]
fn latest_derivative_finds_the_newest_at_any_depth() {
    let (forest, clock) = manual_forest(100);
    let root = forest.make_list();
    let node = root.make_node(text("a")).unwrap();
    root.add_model(&node).unwrap();
    node.set_frozen(true);

    clock.set(200);
    let first = node.get_writable().unwrap();
    first.set_frozen(true);
    clock.set(300);
    let nested = first.get_writable().unwrap();
    clock.set(250);
    let sibling = node.get_writable().unwrap();

    assert_eq!(sibling.timestamp(), 250);
    assert_eq!(node.latest_derivative(), nested);
    assert_eq!(first.latest_derivative(), nested);
    assert_eq!(nested.latest_derivative(), nested);
}

#[test]
fn latest_derivative_tie_goes_to_the_first_found() {
    let (forest, clock) = manual_forest(100);
    let node = forest.make_list().make_node(text("a")).unwrap();
    node.set_frozen(true);

    clock.set(200);
    let first = node.get_writable().unwrap();
    let second = node.get_writable().unwrap();
    assert_eq!(first.timestamp(), second.timestamp());
    assert_eq!(node.latest_derivative(), first);

    second.stamp_modified_now();
    assert_eq!(node.latest_derivative(), first);
    clock.set(201);
    second.stamp_modified_now();
    assert_eq!(node.latest_derivative(), second);
}

#[test]
fn node_wins_a_tie_with_its_derivatives() {
    let (forest, _) = manual_forest(100);
    let node = forest.make_list().make_node(text("a")).unwrap();
    node.set_frozen(true);
    let _derivative = node.get_writable().unwrap();
    assert_eq!(node.latest_derivative(), node);
}

#[test]
fn middle_node_beats_its_older_stamped_child() {
    let (forest, clock) = manual_forest(10);
    let a = forest.make_list().make_node(text("a")).unwrap();
    a.set_frozen(true);

    clock.set(20);
    let b = a.get_writable().unwrap();
    b.set_frozen(true);
    clock.set(15);
    let c = b.get_writable().unwrap();

    assert_eq!((a.timestamp(), b.timestamp(), c.timestamp()), (10, 20, 15));
    assert_eq!(a.latest_derivative(), b);
    assert_eq!(b.latest_derivative(), b);
    assert_eq!(c.latest_derivative(), c);
}
