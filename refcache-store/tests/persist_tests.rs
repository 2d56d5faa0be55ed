use pretty_assertions::assert_eq;
use refcache_model::{EntityDef, EntitySlot, Schema, SchemaRegistry};
use refcache_normalizr::NormalizeOptions;
use refcache_store::{CacheError, Store, StoreError, persist};
use refcache_types::{Fingerprint, Timestamp};
use serde_json::json;

fn populated() -> Store {
    let registry = SchemaRegistry::from_defs([EntityDef::new("article")]).unwrap();
    let fp = Fingerprint::new("/articles");
    Store::new()
        .ingest(
            &fp,
            &json!([{"id": 1, "title": "a"}, {"id": 2, "title": "b"}]),
            &Schema::array(Schema::entity("article")),
            &registry,
            &NormalizeOptions::default(),
            Timestamp::from_millis(10),
            Timestamp::from_millis(20),
        )
        .unwrap()
        .delete_entity("article", "2")
        .receive_error(
            &Fingerprint::new("/users"),
            CacheError::fetch("forbidden", Some(403)),
            Timestamp::from_millis(30),
        )
}

#[test]
fn save_then_load_restores_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    let store = populated();

    persist::save(&store, &path).unwrap();
    let loaded = persist::load(&path).unwrap();

    assert_eq!(loaded, store);
    assert_eq!(loaded.entities().get("article", "2"), Some(&EntitySlot::Deleted));
}

#[test]
fn deleted_slots_are_written_as_marker() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    persist::save(&populated(), &path).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["entities"]["article"]["2"], json!("$deleted"));
    assert_eq!(raw["version"], json!(3));
}

#[test]
fn save_leaves_no_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    persist::save(&populated(), &path).unwrap();
    persist::save(&populated(), &path).unwrap();

    let names: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(names, vec![std::ffi::OsString::from("store.json")]);
}

#[test]
fn load_accepts_partial_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    std::fs::write(&path, r#"{"results": {"/x": ["1"]}}"#).unwrap();

    let store = persist::load(&path).unwrap();
    assert_eq!(store.version(), 0);
    assert_eq!(store.result("/x"), Some(&json!(["1"])));
    assert!(store.entities().is_empty());
}

#[test]
fn load_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = persist::load(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, StoreError::Io(_)));
}

#[test]
fn load_garbage_is_serialization_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    std::fs::write(&path, "not json").unwrap();
    let err = persist::load(&path).unwrap_err();
    assert!(matches!(err, StoreError::Serialization(_)));
}
