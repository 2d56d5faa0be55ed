use clap::Parser;
use pretty_assertions::assert_eq;
use refcache_cli::{Cli, Command, run};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const REGISTRY: &str = r#"{
  "entities": [
    {"key": "article", "schema": {"author": {"entity": "user"}}},
    {"key": "user"}
  ]
}"#;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let fixture = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        fixture.write("registry.json", REGISTRY);
        fixture.write("list.json", r#"{"array": {"entity": "article"}}"#);
        fixture.write("single.json", r#"{"entity": "article"}"#);
        fixture
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn write_json(&self, name: &str, value: &Value) -> PathBuf {
        self.write(name, &value.to_string())
    }
}

fn run_args(args: &[&str]) -> anyhow::Result<Value> {
    let cli = Cli::try_parse_from(std::iter::once("refcache").chain(args.iter().copied()))?;
    run(&cli)
}

fn p(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn articles() -> Value {
    json!([
        {"id": 1, "title": "a", "author": {"id": 9, "name": "ann"}},
        {"id": 2, "title": "b", "author": {"id": 9, "name": "ann"}}
    ])
}

// ── Parsing ──────────────────────────────────────────────────────

#[test]
fn parses_select_with_global_verbose() {
    let cli = Cli::try_parse_from([
        "refcache", "select", "--store", "s.json", "-f", "/a", "-s", "schema.json", "-v",
    ])
    .unwrap();
    assert!(cli.verbose);
    match cli.command {
        Command::Select {
            fingerprint,
            params,
            ..
        } => {
            assert_eq!(fingerprint, "/a");
            assert!(params.is_none());
        }
        other => panic!("expected select, got {other:?}"),
    }
}

#[test]
fn normalize_requires_schema() {
    assert!(Cli::try_parse_from(["refcache", "normalize", "input.json"]).is_err());
}

// ── normalize / denormalize ──────────────────────────────────────

#[test]
fn normalize_prints_result_and_entities() {
    let fx = Fixture::new();
    let input = fx.write_json("input.json", &articles());

    let out = run_args(&[
        "normalize",
        "-s",
        p(&fx.path("list.json")),
        "-r",
        p(&fx.path("registry.json")),
        p(&input),
    ])
    .unwrap();

    assert_eq!(out["result"], json!(["1", "2"]));
    assert_eq!(out["entities"]["article"]["1"]["author"], json!("9"));
    assert_eq!(out["entities"]["user"]["9"]["name"], json!("ann"));
}

#[test]
fn normalize_honors_options_file() {
    let fx = Fixture::new();
    let input = fx.write_json("input.json", &json!([{"id": 1}, {"title": "no id"}]));
    let options = fx.write("options.json", r#"{"missing_pk": "skip"}"#);

    let strict = run_args(&[
        "normalize",
        "-s",
        p(&fx.path("list.json")),
        "-r",
        p(&fx.path("registry.json")),
        p(&input),
    ]);
    assert!(strict.is_err());

    let lenient = run_args(&[
        "normalize",
        "-s",
        p(&fx.path("list.json")),
        "-r",
        p(&fx.path("registry.json")),
        "--options",
        p(&options),
        p(&input),
    ])
    .unwrap();
    assert_eq!(lenient["result"], json!(["1", null]));
}

#[test]
fn unregistered_entity_is_rejected_before_reading_input() {
    let fx = Fixture::new();
    let err = run_args(&["normalize", "-s", p(&fx.path("list.json")), "missing.json"]).unwrap_err();
    assert!(err.to_string().contains("registry"), "{err:#}");
}

#[test]
fn denormalize_reports_missing_entities() {
    let fx = Fixture::new();
    let entities = fx.write_json(
        "entities.json",
        &json!({"article": {"1": {"id": 1, "author": "9"}}}),
    );
    let skeleton = fx.write_json("skeleton.json", &json!(["1"]));

    let out = run_args(&[
        "denormalize",
        "-s",
        p(&fx.path("list.json")),
        "-r",
        p(&fx.path("registry.json")),
        "-e",
        p(&entities),
        p(&skeleton),
    ])
    .unwrap();

    assert_eq!(out["value"], json!([{"id": 1, "author": null}]));
    assert_eq!(out["complete"], json!(false));
    assert_eq!(out["missing"], json!([{"entity_type": "user", "pk": "9"}]));
}

// ── ingest / select ──────────────────────────────────────────────

#[test]
fn ingest_then_select_round_trips() {
    let fx = Fixture::new();
    let input = fx.write_json("input.json", &articles());
    let store = fx.path("store.json");
    let schema = fx.path("list.json");
    let registry = fx.path("registry.json");

    let ingested = run_args(&[
        "ingest",
        "--store",
        p(&store),
        "-f",
        "/articles",
        "-s",
        p(&schema),
        "-r",
        p(&registry),
        p(&input),
    ])
    .unwrap();
    assert_eq!(ingested, json!({"version": 1, "result": ["1", "2"]}));
    assert!(store.exists());

    let selected = run_args(&[
        "select",
        "--store",
        p(&store),
        "-f",
        "/articles",
        "-s",
        p(&schema),
        "-r",
        p(&registry),
    ])
    .unwrap();
    assert_eq!(selected, json!({"status": "found", "value": articles()}));
}

#[test]
fn select_unknown_fingerprint_is_not_found() {
    let fx = Fixture::new();
    let store = fx.write("store.json", "{}");

    let out = run_args(&[
        "select",
        "--store",
        p(&store),
        "-f",
        "/nothing",
        "-s",
        p(&fx.path("list.json")),
        "-r",
        p(&fx.path("registry.json")),
    ])
    .unwrap();
    assert_eq!(out, json!({"status": "not_found"}));
}

#[test]
fn select_by_params_uses_primary_key() {
    let fx = Fixture::new();
    let store = fx.write_json(
        "store.json",
        &json!({"entities": {"article": {"5": {"id": 5, "title": "bob"}}}}),
    );

    let out = run_args(&[
        "select",
        "--store",
        p(&store),
        "-f",
        "/articles/5",
        "-s",
        p(&fx.path("single.json")),
        "-r",
        p(&fx.path("registry.json")),
        "-p",
        r#"{"id": 5}"#,
    ])
    .unwrap();
    assert_eq!(out, json!({"status": "found", "value": {"id": 5, "title": "bob"}}));
}

#[test]
fn select_shape_mismatch_is_an_error() {
    let fx = Fixture::new();
    let store = fx.write_json("store.json", &json!({"results": {"/articles": [5, 6]}}));

    let err = run_args(&[
        "select",
        "--store",
        p(&store),
        "-f",
        "/articles",
        "-s",
        p(&fx.path("single.json")),
        "-r",
        p(&fx.path("registry.json")),
    ])
    .unwrap_err();
    assert!(err.to_string().contains("shape mismatch"), "{err:#}");
}

#[test]
fn select_missing_store_fails() {
    let fx = Fixture::new();
    let err = run_args(&[
        "select",
        "--store",
        p(&fx.path("absent.json")),
        "-f",
        "/a",
        "-s",
        p(&fx.path("list.json")),
        "-r",
        p(&fx.path("registry.json")),
    ])
    .unwrap_err();
    assert!(err.to_string().contains("does not exist"));
}
