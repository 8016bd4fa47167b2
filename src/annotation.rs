//! Annotations: opaque values attached to types or to individual elements.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rand_core::OsRng;
use rand_core::RngCore;
use rustc_hash::FxHashMap;

use crate::document::UserData;

/// Values attached to a (type, key) pair rather than to any one element.
#[derive(Default)]
pub struct TypeAnnotations {
    entries: RefCell<FxHashMap<(String, String), Rc<dyn Any>>>,
}

impl TypeAnnotations {
    pub fn new() -> TypeAnnotations {
        return TypeAnnotations::default();
    }

    /// Store `value`, or clear the entry when `value` is `None`.
    pub fn set_user_data(&self, type_name: &str, key: &str, value: Option<Rc<dyn Any>>) {
        let slot = (type_name.to_string(), key.to_string());
        let previous = match value {
            Some(value) => self.entries.borrow_mut().insert(slot, value),
            None => self.entries.borrow_mut().remove(&slot),
        };
        drop(previous);
    }

    pub fn user_data(&self, type_name: &str, key: &str) -> Option<Rc<dyn Any>> {
        let slot = (type_name.to_string(), key.to_string());
        return self.entries.borrow().get(&slot).cloned();
    }

    pub fn len(&self) -> usize {
        return self.entries.borrow().len();
    }

    pub fn is_empty(&self) -> bool {
        return self.len() == 0;
    }
}

impl fmt::Debug for TypeAnnotations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.debug_struct("TypeAnnotations").field("entries", &self.len()).finish();
    }
}

pub const ANNOTATION_SET_PREFIX: &str = "lineage:annotation-set:";

const PREFIX_ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_.";

/// Random characters appended to [`ANNOTATION_SET_PREFIX`].
const PREFIX_RANDOM_LEN: usize = 50;

fn random_prefix() -> String {
    let mut prefix = String::with_capacity(ANNOTATION_SET_PREFIX.len() + PREFIX_RANDOM_LEN + 1);
    prefix.push_str(ANNOTATION_SET_PREFIX);
    // Five six-bit symbols per 32-bit draw.
    for _ in 0..PREFIX_RANDOM_LEN / 5 {
        let mut bits = OsRng.next_u32();
        for _ in 0..5 {
            prefix.push(PREFIX_ALPHABET[(bits & 0x3f) as usize] as char);
            bits >>= 6;
        }
    }
    prefix.push('/');
    return prefix;
}

/// The stored form of a string annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringAnnotation(pub String);

/// The stored form of an object annotation.
#[derive(Clone)]
pub struct ObjectAnnotation(pub Rc<dyn Any>);

/// A private namespace of annotations on elements.
///
/// Each set writes under its own randomly generated key prefix, so two sets
/// never see each other's annotations. Every annotation a set wrote is
/// cleared from its element when the set is dropped.
pub struct AnnotationSet {
    prefix: String,
    written: RefCell<Vec<(String, Rc<dyn UserData>)>>,
}

impl AnnotationSet {
    pub fn new() -> AnnotationSet {
        return AnnotationSet {
            prefix: random_prefix(),
            written: RefCell::new(Vec::new()),
        };
    }

    pub fn prefix(&self) -> &str {
        return &self.prefix;
    }

    fn full_key(&self, key: &str) -> String {
        return format!("{}{}", self.prefix, key);
    }

    fn remember(&self, element: &Rc<dyn UserData>, key: &str) {
        self.written.borrow_mut().push((key.to_string(), element.clone()));
    }

    /// The string annotation under `key`, or the empty string.
    pub fn string_annotation(&self, element: &dyn UserData, key: &str) -> String {
        return self.string_annotation_or(element, key, "");
    }

    pub fn string_annotation_or(&self, element: &dyn UserData, key: &str, default: &str) -> String {
        let value = element.user_data(&self.full_key(key));
        return match value.as_ref().and_then(|value| value.downcast_ref::<StringAnnotation>()) {
            Some(StringAnnotation(text)) => text.clone(),
            None => default.to_string(),
        };
    }

    pub fn set_string_annotation(&self, element: &Rc<dyn UserData>, key: &str, value: impl Into<String>) {
        self.remember(element, key);
        element.set_user_data(&self.full_key(key), Some(Rc::new(StringAnnotation(value.into()))));
    }

    pub fn object_annotation(&self, element: &dyn UserData, key: &str) -> Option<Rc<dyn Any>> {
        let value = element.user_data(&self.full_key(key))?;
        let ObjectAnnotation(object) = value.downcast_ref::<ObjectAnnotation>()?;
        return Some(object.clone());
    }

    pub fn object_annotation_or(&self, element: &dyn UserData, key: &str, default: Rc<dyn Any>) -> Rc<dyn Any> {
        return self.object_annotation(element, key).unwrap_or(default);
    }

    /// Store an object annotation, or clear the key when `value` is `None`.
    pub fn set_object_annotation(&self, element: &Rc<dyn UserData>, key: &str, value: Option<Rc<dyn Any>>) {
        let Some(value) = value else {
            element.set_user_data(&self.full_key(key), None);
            return;
        };
        self.remember(element, key);
        element.set_user_data(&self.full_key(key), Some(Rc::new(ObjectAnnotation(value))));
    }
}

impl Default for AnnotationSet {
    fn default() -> AnnotationSet {
        return AnnotationSet::new();
    }
}

impl Drop for AnnotationSet {
    fn drop(&mut self) {
        let written = std::mem::take(self.written.get_mut());
        tracing::trace!(prefix = %self.prefix, annotations = written.len(), "clearing annotation set");
        for (key, element) in written {
            element.set_user_data(&self.full_key(&key), None);
        }
    }
}

impl fmt::Debug for AnnotationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f
            .debug_struct("AnnotationSet")
            .field("prefix", &self.prefix)
            .field("written", &self.written.borrow().len())
            .finish();
    }
}
