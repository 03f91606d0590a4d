//! Integration tests for lazy object resolution.
//!
//! Runs resolution against complete files: classic tables, compressed
//! object streams behind a cross-reference stream, and the lenient/strict
//! split for broken references.

mod common;

use pdf_forge::config::ReaderOptions;
use pdf_forge::object::{Object, ObjectRef};
use pdf_forge::{Document, Error};

#[test]
fn test_resolve_direct_objects() {
    let mut doc = Document::open(common::simple_pdf()).unwrap();

    let catalog = doc.resolve(ObjectRef::new(1, 0)).unwrap();
    assert_eq!(
        catalog
            .as_dict()
            .unwrap()
            .get("Type")
            .and_then(Object::as_name),
        Some("Catalog")
    );

    let string = doc.resolve(ObjectRef::new(3, 0)).unwrap();
    assert_eq!(string, Object::string("hello"));
}

#[test]
fn test_catalog_follows_root_reference() {
    let mut doc = Document::open(common::simple_pdf()).unwrap();
    let catalog = doc.catalog().unwrap();
    assert_eq!(
        catalog
            .as_dict()
            .unwrap()
            .get("Pages")
            .and_then(Object::as_reference),
        Some(ObjectRef::new(2, 0))
    );
}

#[test]
fn test_resolve_object_follows_reference_values() {
    let mut doc = Document::open(common::simple_pdf()).unwrap();
    let pages_ref = {
        let catalog = doc.catalog().unwrap();
        catalog.as_dict().unwrap().get("Pages").cloned().unwrap()
    };
    let pages = doc.resolve_object(&pages_ref).unwrap();
    assert_eq!(
        pages
            .as_dict()
            .unwrap()
            .get("Count")
            .and_then(Object::as_integer),
        Some(0)
    );
}

#[test]
fn test_resolve_compressed_objects() {
    let mut doc = Document::open(common::packed_pdf()).unwrap();
    assert_eq!(doc.version(), (1, 5));

    assert_eq!(
        doc.resolve(ObjectRef::new(10, 0)).unwrap().as_integer(),
        Some(42)
    );
    assert_eq!(
        doc.resolve(ObjectRef::new(11, 0)).unwrap().as_name(),
        Some("Test")
    );
}

#[test]
fn test_resolve_through_predicted_xref_stream() {
    // The table itself sits behind FlateDecode plus a PNG Up predictor.
    let mut doc = Document::open(common::packed_pdf_predicted()).unwrap();
    assert_eq!(
        doc.resolve(ObjectRef::new(10, 0)).unwrap().as_integer(),
        Some(42)
    );
    assert_eq!(
        doc.resolve(ObjectRef::new(11, 0)).unwrap().as_name(),
        Some("Test")
    );
}

#[test]
fn test_compressed_object_nonzero_generation_is_dangling() {
    let mut doc = Document::open(common::packed_pdf()).unwrap();
    assert!(doc.resolve(ObjectRef::new(10, 1)).unwrap().is_null());
}

#[test]
fn test_dangling_reference_lenient_vs_strict() {
    common::init_logging();
    let mut lenient = Document::open(common::simple_pdf()).unwrap();
    assert!(lenient.resolve(ObjectRef::new(77, 0)).unwrap().is_null());

    let mut strict =
        Document::open_with_options(common::simple_pdf(), ReaderOptions::strict()).unwrap();
    assert!(matches!(
        strict.resolve(ObjectRef::new(77, 0)).unwrap_err(),
        Error::ObjectNotFound(77, 0)
    ));
}

#[test]
fn test_free_entry_resolves_to_null() {
    let mut doc = Document::open(common::simple_pdf()).unwrap();
    // Object 0 heads the free list.
    assert!(doc.resolve(ObjectRef::new(0, 65535)).unwrap().is_null());
}

#[test]
fn test_reference_chain_cycle_detected() {
    let mut doc = Document::new();
    let a = doc.add_object(Object::Null);
    let b = doc.add_object(Object::Reference(a));
    doc.set_object(a, Object::Reference(b)).unwrap();

    assert!(matches!(
        doc.resolve_object(&Object::Reference(b)).unwrap_err(),
        Error::CircularReference(_)
    ));
}

#[test]
fn test_modified_object_shadows_file_version() {
    let mut doc = Document::open(common::simple_pdf()).unwrap();
    let r = ObjectRef::new(3, 0);
    *doc.object_mut(r).unwrap() = Object::Integer(99);
    assert_eq!(doc.resolve(r).unwrap().as_integer(), Some(99));
}

#[test]
fn test_resolution_mixes_classic_and_compressed() {
    // The container itself is a regular in-use object; its contents are
    // compressed entries. Both resolve through the same call.
    let mut doc = Document::open(common::packed_pdf()).unwrap();
    let container = doc.resolve(ObjectRef::new(2, 0)).unwrap();
    assert_eq!(
        container
            .as_dict()
            .unwrap()
            .get("Type")
            .and_then(Object::as_name),
        Some("ObjStm")
    );
    assert_eq!(
        doc.resolve(ObjectRef::new(10, 0)).unwrap().as_integer(),
        Some(42)
    );
}
