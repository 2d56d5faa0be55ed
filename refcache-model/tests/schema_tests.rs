use pretty_assertions::assert_eq;
use refcache_model::{Schema, UnionSchema};
use serde_json::json;

// ── Constructors ─────────────────────────────────────────────────

#[test]
fn default_schema_is_plain() {
    assert!(Schema::default().is_plain());
}

#[test]
fn shorthand_constructors_build_expected_variants() {
    assert_eq!(Schema::entity("article"), Schema::Entity("article".into()));
    assert_eq!(
        Schema::array(Schema::entity("article")),
        Schema::Array(Box::new(Schema::Entity("article".into())))
    );
    assert_eq!(Schema::values(Schema::Plain).kind(), "values");
    assert_eq!(Schema::object([("a", Schema::Plain)]).kind(), "object");
}

#[test]
fn entity_keys_collects_direct_references() {
    let schema = Schema::object([
        ("results", Schema::array(Schema::entity("article"))),
        ("author", Schema::entity("user")),
        (
            "feed",
            Schema::union("type", [("post", Schema::entity("post")), ("ad", Schema::Plain)]),
        ),
    ]);
    let keys: Vec<&str> = schema.entity_keys().into_iter().collect();
    assert_eq!(keys, vec!["article", "post", "user"]);
}

// ── Union resolution ─────────────────────────────────────────────

fn feed_union() -> UnionSchema {
    match Schema::union(
        "type",
        [
            ("post", Schema::entity("post")),
            ("ad", Schema::entity("ad")),
        ],
    ) {
        Schema::Union(u) => u,
        other => panic!("expected union, got {other:?}"),
    }
}

#[test]
fn union_resolves_by_tag() {
    let union = feed_union();
    let (tag, schema) = union.resolve(&json!({"type": "ad", "id": 1})).unwrap();
    assert_eq!(tag, "ad");
    assert_eq!(schema, &Schema::entity("ad"));
}

#[test]
fn union_unknown_tag_is_none() {
    assert!(feed_union().resolve(&json!({"type": "video"})).is_none());
}

#[test]
fn union_missing_or_non_string_tag_is_none() {
    let union = feed_union();
    assert!(union.resolve(&json!({"id": 1})).is_none());
    assert!(union.resolve(&json!({"type": 3})).is_none());
    assert!(union.resolve(&json!("post")).is_none());
}

// ── Serde ────────────────────────────────────────────────────────

#[test]
fn schema_json_is_externally_tagged_snake_case() {
    let schema = Schema::array(Schema::entity("article"));
    let json = serde_json::to_value(&schema).unwrap();
    assert_eq!(json, json!({"array": {"entity": "article"}}));
    assert_eq!(serde_json::to_value(Schema::Plain).unwrap(), json!("plain"));
}

#[test]
fn schema_deserializes_from_config_shape() {
    let json = json!({
        "object": {
            "results": {"array": {"entity": "article"}},
            "by_id": {"values": {"entity": "article"}},
            "feed": {"union": {"attribute": "kind", "variants": {"a": {"entity": "article"}}}},
            "cursor": "plain"
        }
    });
    let schema: Schema = serde_json::from_value(json).unwrap();
    let Schema::Object(fields) = &schema else {
        panic!("expected object schema");
    };
    assert_eq!(fields.len(), 4);
    assert_eq!(fields["cursor"], Schema::Plain);
    assert_eq!(fields["by_id"], Schema::values(Schema::entity("article")));
}
