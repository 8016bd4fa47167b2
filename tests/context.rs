//! The context bundle with its registry and annotations.

mod common;

use std::cell::Cell;
use std::rc::Rc;

use lineage::Context;
use lineage::Error;
use lineage::ListenerError;
use lineage::annotation::AnnotationSet;
use lineage::document::TextDocument;
use lineage::document::UserData;
use lineage::registry::Module;
use lineage::registry::ModuleEvent;

use common::text;

struct Importer;

impl Module for Importer {
    fn name(&self) -> &str {
        return "importer";
    }

    fn version(&self) -> &str {
        return "2.1";
    }
}

#[test]
fn loaded_models_is_a_root_list() {
    common::init_tracing();
    let context = Context::new();
    let loaded = context.loaded_models();
    assert!(loaded.is_root());
    assert!(loaded.parent_node().is_none());

    let node = loaded.make_node(text("a")).unwrap();
    loaded.add_model(&node).unwrap();
    assert!(context.forest().same_forest(node.forest()));
    assert_eq!(context.forest().node_count(), 1);
}

#[test]
fn registry_round_trip() {
    let context = Context::new();
    let registrations = Rc::new(Cell::new(0));
    let counted = registrations.clone();
    context.modules().add_monitor(Rc::new(move |event: &ModuleEvent| -> Result<(), ListenerError> {
        if let ModuleEvent::Registered(_) = event {
            counted.set(counted.get() + 1);
        }
        Ok(())
    }));

    let importer: Rc<dyn Module> = Rc::new(Importer);
    context.modules().register(importer.clone());
    assert_eq!(registrations.get(), 1);
    assert!(context.modules().find("importer", "2.1").is_some());
    assert_eq!(context.modules().iter_modules().count(), 1);

    assert!(matches!(context.modules().request("exporter", "1.0"), Err(Error::NotSupported { .. })));

    context.modules().deregister(&importer);
    assert!(context.modules().find("importer", "2.1").is_none());
}

#[test]
fn type_annotations_are_shared_through_the_context() {
    let context = Context::new();
    context.type_annotations().set_user_data("model", "editor", Some(Rc::new(3usize)));
    let value = context.type_annotations().user_data("model", "editor").unwrap();
    assert_eq!(value.downcast_ref::<usize>(), Some(&3));
}

#[test]
fn annotation_set_on_a_loaded_document() {
    let element = Rc::new(TextDocument::new("body"));
    let target: Rc<dyn UserData> = element.clone();
    let set = AnnotationSet::new();

    set.set_string_annotation(&target, "label", "first draft");
    set.set_object_annotation(&target, "score", Some(Rc::new(0.5f64)));
    assert_eq!(set.string_annotation(&*element, "label"), "first draft");
    assert!(set.object_annotation(&*element, "score").is_some());

    let label_key = format!("{}label", set.prefix());
    drop(set);
    assert!(element.user_data(&label_key).is_none());
}
