//! Integration tests for the complete objgraph pipeline
//!
//! These tests verify end-to-end functionality across crates:
//! - Descriptors (reflect) → deep merge → registry (context)
//! - Local edits → commit → merge into a second context
//! - Config file → context behavior
//!
//! Run with: cargo test --test integration_tests

use objgraph_context::{
    ChangeSet, ContextConfig, GraphManager, ObjectContext, ObjectStore, SaveOutcome,
};
use objgraph_model::{
    downcast_ref, into_handle, DataObject, Error, HasObjectMeta, ObjectHandle, ObjectId,
    ObjectMeta, PersistenceState, Persistent, Value,
};
use objgraph_reflect::{ArcProperty, ClassDescriptor, EntityResolver, FieldAccessor, Property};
use std::any::Any;
use std::sync::Arc;
use tempfile::tempdir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

fn pid(entity: &str, n: i64) -> ObjectId {
    ObjectId::permanent(entity, "ID", n)
}

fn data_value(handle: &ObjectHandle, name: &str) -> Value {
    let object = handle.read();
    downcast_ref::<DataObject>(&*object)
        .and_then(|d| d.value(name).cloned())
        .unwrap_or_default()
}

// ============================================================================
// Inheritance + to-many, merged into an empty registry
// ============================================================================

fn inheritance_model() -> Arc<EntityResolver> {
    let mut resolver = EntityResolver::new();
    resolver
        .register(
            ClassDescriptor::data_object("Base")
                .with_attribute("name")
                .with_to_many("related", "Item", None),
        )
        .expect("register Base");
    resolver
        .register(
            ClassDescriptor::data_object("Sub")
                .extends("Base")
                .with_attribute("extra"),
        )
        .expect("register Sub");
    resolver
        .register(ClassDescriptor::data_object("Item").with_attribute("label"))
        .expect("register Item");
    Arc::new(resolver)
}

#[test]
fn test_subclass_with_to_many_merges_into_empty_registry() {
    init_tracing();

    let mut source = ObjectStore::new();
    let root = into_handle(
        DataObject::with_id("Sub", pid("Base", 42))
            .with_value("name", "A")
            .with_value("extra", "B")
            .with_value("related", vec![pid("Item", 7)]),
    );
    source.register_node(pid("Base", 42), Arc::clone(&root));
    source.register_node(
        pid("Item", 7),
        into_handle(DataObject::with_id("Item", pid("Item", 7)).with_value("label", "seven")),
    );

    let mut ctx = ObjectContext::with_defaults(inheritance_model()).expect("context");
    let report = ctx.merge(&source, &[root]).expect("merge");
    let target = &report.targets[0];

    assert_eq!(ctx.state_of(&pid("Base", 42)).unwrap(), PersistenceState::Committed);
    assert_eq!(target.read().type_name(), "Sub");
    assert_eq!(data_value(target, "name"), Value::Text("A".into()));
    assert_eq!(data_value(target, "extra"), Value::Text("B".into()));
    assert_eq!(
        data_value(target, "related"),
        Value::Objects(vec![pid("Item", 7)])
    );

    let item = ctx.object(&pid("Item", 7)).expect("related object registered");
    let object = item.read();
    let item = downcast_ref::<DataObject>(&*object).unwrap();
    assert_eq!(item.meta().registry, Some(ctx.token()));
    assert_eq!(item.state(), PersistenceState::Committed);
    assert_eq!(ctx.len(), 2);
}

// ============================================================================
// Typed structs next to map-backed objects
// ============================================================================

#[derive(Debug, Default)]
struct Track {
    meta: ObjectMeta,
    title: String,
    album: Option<ObjectId>,
}

impl Persistent for Track {
    fn type_name(&self) -> &str {
        "Track"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl HasObjectMeta for Track {
    fn meta(&self) -> &ObjectMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.meta
    }
}

fn music_model() -> Arc<EntityResolver> {
    let title = FieldAccessor::new(
        "title",
        |t: &Track| Value::Text(t.title.clone()),
        |t: &mut Track, v| {
            t.title = v.try_into()?;
            Ok(())
        },
    );
    let album = FieldAccessor::new(
        "album",
        |t: &Track| t.album.clone().into(),
        |t: &mut Track, v| {
            t.album = v.try_into()?;
            Ok(())
        },
    );

    let mut resolver = EntityResolver::new();
    resolver
        .register(
            ClassDescriptor::data_object("Album")
                .with_attribute("title")
                .with_to_many("tracks", "Track", Some("album")),
        )
        .expect("register Album");
    resolver
        .register(
            ClassDescriptor::for_type("Track", Track::default)
                .with_property(Property::attribute("title", Arc::new(title)))
                .with_property(Property::to_one(
                    ArcProperty::new("album", Arc::new(album), "Album").with_reverse("tracks"),
                )),
        )
        .expect("register Track");
    Arc::new(resolver)
}

fn track_album(handle: &ObjectHandle) -> Option<ObjectId> {
    let object = handle.read();
    downcast_ref::<Track>(&*object).and_then(|t| t.album.clone())
}

#[test]
fn test_typed_and_map_backed_objects_share_one_graph() {
    init_tracing();

    let mut source = ObjectStore::new();
    let album = into_handle(
        DataObject::with_id("Album", pid("Album", 1))
            .with_value("title", "Kind of Blue")
            .with_value("tracks", vec![pid("Track", 1), pid("Track", 2)]),
    );
    source.register_node(pid("Album", 1), Arc::clone(&album));
    for (n, title) in [(1, "So What"), (2, "Freddie Freeloader")] {
        let mut track = Track {
            title: title.to_string(),
            album: Some(pid("Album", 1)),
            ..Track::default()
        };
        track.meta.object_id = Some(pid("Track", n));
        source.register_node(pid("Track", n), into_handle(track));
    }

    let mut ctx = ObjectContext::with_defaults(music_model()).expect("context");
    ctx.merge(&source, &[album]).expect("merge");

    let so_what = ctx.object(&pid("Track", 1)).expect("track merged");
    {
        let object = so_what.read();
        let track = downcast_ref::<Track>(&*object).expect("typed target");
        assert_eq!(track.title, "So What");
        assert_eq!(track.meta.state, PersistenceState::Committed);
        assert_eq!(track.meta.registry, Some(ctx.token()));
    }
    assert_eq!(track_album(&so_what), Some(pid("Album", 1)));

    // Moving a typed track to another album updates both map-backed albums.
    let second = into_handle(DataObject::with_id("Album", pid("Album", 2)));
    ctx.register_object(&second).expect("register");
    ctx.set_to_one(&pid("Track", 1), "album", Some(&pid("Album", 2)))
        .expect("move track");

    let first_album = ctx.object(&pid("Album", 1)).unwrap();
    assert_eq!(
        data_value(&first_album, "tracks"),
        Value::Objects(vec![pid("Track", 2)])
    );
    assert_eq!(
        data_value(&second, "tracks"),
        Value::Objects(vec![pid("Track", 1)])
    );
    assert_eq!(track_album(&so_what), Some(pid("Album", 2)));
    assert_eq!(
        ctx.state_of(&pid("Track", 1)).unwrap(),
        PersistenceState::Modified
    );
}

// ============================================================================
// Commit in one context, merge into another
// ============================================================================

#[test]
fn test_committed_objects_merge_into_a_second_context() {
    init_tracing();
    let model = music_model();

    let mut authoring = ObjectContext::with_defaults(Arc::clone(&model)).expect("context");
    let album = authoring.new_object("Album").expect("album");
    let track = authoring.new_object("Track").expect("track");
    let album_tmp = authoring.register_object(&album).expect("id");
    let track_tmp = authoring.register_object(&track).expect("id");

    authoring
        .write_property(&album_tmp, "title", "Blue Train".into())
        .expect("title");
    authoring
        .write_property(&track_tmp, "title", "Moment's Notice".into())
        .expect("title");
    authoring
        .add_to_many(&album_tmp, "tracks", &track_tmp)
        .expect("link");
    assert_eq!(track_album(&track), Some(album_tmp.clone()));

    let mut sink = |changes: &ChangeSet| -> Result<SaveOutcome, String> {
        assert_eq!(changes.inserted.len(), 2);
        Ok(SaveOutcome::default()
            .with_generated_key(album_tmp.clone(), "ID", 10)
            .with_generated_key(track_tmp.clone(), "ID", 20))
    };
    let summary = authoring.commit_changes(&mut sink).expect("commit");
    assert_eq!(summary.rekeyed.len(), 2);
    assert_eq!(track_album(&track), Some(pid("Album", 10)));

    let mut reading = ObjectContext::with_defaults(model).expect("context");
    let report = reading
        .merge(&authoring, &[Arc::clone(&album)])
        .expect("merge");
    assert!(!Arc::ptr_eq(&report.targets[0], &album));
    assert_eq!(
        data_value(&report.targets[0], "title"),
        Value::Text("Blue Train".into())
    );
    assert_eq!(
        data_value(&report.targets[0], "tracks"),
        Value::Objects(vec![pid("Track", 20)])
    );
    let copy = reading.object(&pid("Track", 20)).expect("track merged");
    assert_eq!(track_album(&copy), Some(pid("Album", 10)));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_context_config_file_controls_merge_depth() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("objgraph.json");
    std::fs::write(&path, r#"{ "max_merge_depth": 1, "registry_capacity": 8 }"#)
        .expect("write config");
    let config = ContextConfig::load(&path).expect("load config");

    let mut source = ObjectStore::new();
    let root = into_handle(
        DataObject::with_id("Base", pid("Base", 1)).with_value("related", vec![pid("Item", 2)]),
    );
    source.register_node(pid("Base", 1), Arc::clone(&root));
    source.register_node(
        pid("Item", 2),
        into_handle(DataObject::with_id("Item", pid("Item", 2))),
    );

    let mut ctx = ObjectContext::new(inheritance_model(), config).expect("context");
    let err = ctx.merge(&source, &[root]).unwrap_err();
    assert!(matches!(err, Error::DepthLimit { limit: 1, .. }));
}
