//! Loading catalogs from files in each supported format.

use rosetta_catalog::{CatalogLoadError, CatalogLoader, Matcher, Segment, Stability};
use std::fs;
use tempfile::TempDir;

const TOML_DOC: &str = r#"
[[patterns]]
id = "lock-pair"
category = "manual-resource-lifecycle"
stability = "preserve"

[patterns.matcher]
type = "pair"
key = "lock"

[patterns.matcher.first]
kind = "call"
name = "pthread_mutex_lock"

[[patterns.matcher.first.children]]
index = 0
bind_name = "lock"

[patterns.matcher.second]
kind = "call"
name = "pthread_mutex_unlock"

[[patterns.matcher.second.children]]
index = 0
bind_name = "lock"

[[mappings]]
source_category = "manual-resource-lifecycle"
target_ecosystem = "python-stdlib"
template = "with {{lock}}:\n    {{body|pass}}"
priority = 5
behavior_preserving = true
"#;

const YAML_DOC: &str = r#"
patterns:
  - id: signal
    category: reactive-state
    matcher:
      type: node
      shape:
        kind: library_call
        library: solid-js
        pattern: createSignal
mappings:
  - source_category: reactive-state
    target_ecosystem: vue
    template: "shallowRef({{initial}})"
    priority: 1
"#;

const JSON_DOC: &str = r#"{
  "mappings": [
    {
      "source_category": "reactive-state",
      "target_ecosystem": "lua",
      "template": "{ value = {{initial|nil}} }"
    }
  ]
}"#;

fn write(dir: &TempDir, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, text).unwrap();
    path
}

#[test]
fn loads_every_format_in_order() {
    let dir = TempDir::new().unwrap();
    let toml = write(&dir, "locks.toml", TOML_DOC);
    let yaml = write(&dir, "solid.yml", YAML_DOC);
    let json = write(&dir, "lua.json", JSON_DOC);

    let catalog = CatalogLoader::new()
        .builtin(false)
        .files([toml, yaml, json])
        .load()
        .unwrap();

    let ids: Vec<_> = catalog.patterns().iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["lock-pair", "signal"]);

    let lock = catalog.pattern("lock-pair").unwrap();
    assert_eq!(lock.stability, Stability::Preserve);
    match &lock.matcher {
        Matcher::Pair { key, body, .. } => {
            assert_eq!(key, "lock");
            assert!(body.is_none());
        }
        Matcher::Node(_) => panic!("expected a pair matcher"),
    }

    assert_eq!(
        catalog.categories(),
        ["manual-resource-lifecycle", "reactive-state"]
    );
    assert_eq!(catalog.targets_for("reactive-state"), ["vue", "lua"]);

    let lua = catalog.candidates("reactive-state", "lua").next().unwrap();
    assert_eq!(lua.priority, 0);
    assert!(!lua.behavior_preserving);
    assert!(lua.template.segments().contains(&Segment::Placeholder {
        name: "initial".into(),
        default: Some("nil".into()),
    }));
}

#[test]
fn builtin_comes_first() {
    let dir = TempDir::new().unwrap();
    let yaml = write(&dir, "solid.yaml", YAML_DOC);
    let catalog = CatalogLoader::new().file(yaml).load().unwrap();

    let vue: Vec<_> = catalog
        .candidates("reactive-state", "vue")
        .map(|m| m.template.source())
        .collect();
    assert_eq!(vue, ["ref({{initial|undefined}})", "shallowRef({{initial}})"]);
    assert_eq!(catalog.patterns().last().unwrap().id, "signal");
}

#[test]
fn unknown_extension_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "catalog.ini", "");
    let err = CatalogLoader::new().file(path).load().unwrap_err();
    assert!(matches!(err, CatalogLoadError::UnknownFormat(_)));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let err = CatalogLoader::new()
        .file(dir.path().join("absent.toml"))
        .load()
        .unwrap_err();
    match err {
        CatalogLoadError::Io { path, .. } => assert!(path.ends_with("absent.toml")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn parse_errors_name_the_file() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "broken.toml", "[[patterns]\nid = ");
    let err = CatalogLoader::new().file(path).load().unwrap_err();
    match err {
        CatalogLoadError::Parse { name, .. } => assert!(name.ends_with("broken.toml")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unknown_node_kind_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    let doc = r#"
[[patterns]]
id = "odd"
category = "x"
[patterns.matcher]
type = "node"
[patterns.matcher.shape]
kind = "lambda"
"#;
    let path = write(&dir, "odd.toml", doc);
    let err = CatalogLoader::new().builtin(false).file(path).load().unwrap_err();
    assert!(matches!(err, CatalogLoadError::Parse { .. }));
}
