//! Store workflows against a real directory tree.

use super::{http, id, temp_store};
use chrono::Utc;
use impulse::config::load_config;
use impulse::models::{HistoryEntry, HttpResponse, MarkdownRequest, RequestData, SqlRequest};
use impulse::{Kind, Store, Tree};
use serde_json::{json, Value};
use std::fs;
use std::sync::Arc;

fn entry(request: &RequestData, code: u16) -> HistoryEntry {
    HistoryEntry {
        sent_at: Utc::now(),
        received_at: Utc::now(),
        request: request.clone(),
        response: HttpResponse {
            code,
            body: String::new(),
            headers: vec![],
        }
        .into(),
    }
}

#[test]
fn test_files_on_disk() {
    let (dir, store) = temp_store();
    store.create(&id("users/list"), &http("http://localhost/users")).unwrap();

    let def = dir.path().join("users/list.request.json");
    let hist = dir.path().join("users/list.history.jsonl");
    assert!(hist.is_file());
    assert_eq!(fs::read(&hist).unwrap().len(), 0);

    let text = fs::read_to_string(&def).unwrap();
    assert!(text.starts_with("{\n  \""));
    let value: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(
        value,
        json!({
            "kind": "http",
            "url": "http://localhost/users",
            "method": "GET",
            "body": "",
            "headers": []
        })
    );
}

#[test]
fn test_history_lines_inherit_kind() {
    let (dir, store) = temp_store();
    let req = http("http://x");
    store.create(&id("a"), &req).unwrap();
    store.append_history(&id("a"), &entry(&req, 200)).unwrap();
    store.append_history(&id("a"), &entry(&req, 500)).unwrap();

    let log = fs::read_to_string(dir.path().join("a.history.jsonl")).unwrap();
    let lines: Vec<Value> = log
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    for line in &lines {
        assert!(line["sent_at"].is_string());
        assert!(line["received_at"].is_string());
        assert!(line["request"].get("kind").is_none());
        assert!(line["response"].get("kind").is_none());
    }
    assert_eq!(lines[1]["response"]["code"], 500);
}

#[test]
fn test_reads_hand_written_files() {
    let (dir, store) = temp_store();
    fs::create_dir_all(dir.path().join("db")).unwrap();
    fs::write(
        dir.path().join("db/users.request.json"),
        r#"{"kind": "sql", "dsn": "postgres://localhost/app", "query": "select 1", "database": "sqlite"}"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("db/users.history.jsonl"),
        concat!(
            r#"{"sent_at":"2024-05-01T10:00:00Z","received_at":"2024-05-01T10:00:01Z","#,
            r#""request":{"dsn":"","query":"select 1"},"#,
            r#""response":{"columns":["n"],"types":["number"],"rows":[[1]]}}"#,
            "\n\n"
        ),
    )
    .unwrap();

    let request = store.get(&id("db/users")).unwrap();
    assert_eq!(request.data.kind(), Kind::SQL);
    match &request.data {
        RequestData::Sql(sql) => {
            assert_eq!(sql.database.as_str(), "sqlite");
            assert_eq!(sql.query, "select 1");
        }
        other => panic!("unexpected request {other:?}"),
    }
    assert_eq!(request.history.len(), 1);
    assert_eq!(
        request.history[0].request,
        SqlRequest {
            query: "select 1".to_string(),
            ..SqlRequest::default()
        }
        .into()
    );
}

#[test]
fn test_mixed_kind_history_is_rejected() {
    let (dir, store) = temp_store();
    store
        .create(
            &id("doc"),
            &MarkdownRequest {
                data: "# hi".to_string(),
            }
            .into(),
        )
        .unwrap();
    fs::write(
        dir.path().join("doc.history.jsonl"),
        concat!(
            r#"{"sent_at":"2024-05-01T10:00:00Z","received_at":"2024-05-01T10:00:01Z","#,
            r#""request":{"url":"http://x","method":"GET","body":"","headers":[]},"#,
            r#""response":{"code":200,"body":"","headers":[]}}"#,
            "\n"
        ),
    )
    .unwrap();

    let err = store.get(&id("doc")).unwrap_err();
    assert!(err.is_decode(), "{err}");
}

#[test]
fn test_listing_tolerates_orphans() {
    let (dir, store) = temp_store();
    store.create(&id("keep"), &http("")).unwrap();
    fs::write(dir.path().join("lost.history.jsonl"), "").unwrap();
    fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let tree = store.list().unwrap();
    assert_eq!(tree.all_request_ids(), vec![id("keep")]);

    store.delete(&id("lost")).unwrap();
    assert!(!dir.path().join("lost.history.jsonl").exists());
    assert!(dir.path().join("notes.txt").exists());
}

fn dir_paths(tree: &Tree, prefix: &str, out: &mut Vec<String>) {
    for (name, sub) in &tree.dirs {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", prefix, name)
        };
        dir_paths(sub, &path, out);
        out.push(path);
    }
}

#[test]
fn test_every_listed_request_is_readable() {
    let (dir, store) = temp_store();
    let req = http("http://localhost");
    for name in ["api/users/list", "api/users/get", "api/health", "top"] {
        store.create(&id(name), &req).unwrap();
    }
    store.append_history(&id("api/users/list"), &entry(&req, 200)).unwrap();

    fs::write(dir.path().join("api/lost.history.jsonl"), "").unwrap();
    fs::write(dir.path().join("api/users/notes.txt"), "ignored").unwrap();
    fs::create_dir_all(dir.path().join("empty/nested")).unwrap();

    assert_eq!(store.duplicate(&id("api")).unwrap(), id("api (1)"));
    store.rename(&id("top"), &id("api/users/top")).unwrap();
    store.rename(&id("api (1)/health"), &id("status")).unwrap();

    // Hand-made definition sitting on a directory path.
    fs::write(dir.path().join("api.request.json"), r#"{"kind":"http"}"#).unwrap();

    let tree = store.list().unwrap();
    let mut ids = tree.all_request_ids();
    ids.sort();
    let listed: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
    assert_eq!(
        listed,
        vec![
            "api (1)/users/get",
            "api (1)/users/list",
            "api/health",
            "api/users/get",
            "api/users/list",
            "api/users/top",
            "status",
        ]
    );

    for id in &ids {
        store.get(id).unwrap_or_else(|e| panic!("{id} is listed but not readable: {e}"));
    }
    assert_eq!(store.get(&id("api (1)/users/list")).unwrap().history.len(), 1);

    let mut dirs = Vec::new();
    dir_paths(&tree, "", &mut dirs);
    assert!(dirs.contains(&"empty/nested".to_string()));
    for id in &ids {
        assert!(!dirs.contains(&id.to_string()), "{id} is also a directory");
    }
}

#[test]
fn test_rename_and_duplicate_workflow() {
    let (dir, store) = temp_store();
    let req = http("http://x");
    store.create(&id("draft"), &req).unwrap();
    store.append_history(&id("draft"), &entry(&req, 200)).unwrap();

    store.rename(&id("draft"), &id("api/v1/final")).unwrap();
    assert!(!dir.path().join("draft.request.json").exists());
    assert!(!dir.path().join("draft.history.jsonl").exists());

    let copy = store.duplicate(&id("api")).unwrap();
    assert_eq!(copy, id("api (1)"));
    assert_eq!(store.get(&id("api (1)/v1/final")).unwrap().history.len(), 1);

    let single = store.duplicate(&id("api/v1/final")).unwrap();
    assert_eq!(single, id("api/v1/final (1)"));
    assert!(store.get(&single).unwrap().history.is_empty());

    store.delete(&id("api (1)")).unwrap();
    assert!(!dir.path().join("api (1)").exists());
}

#[test]
fn test_rename_onto_existing_leaves_both() {
    let (_dir, store) = temp_store();
    store.create(&id("a"), &http("a")).unwrap();
    store.create(&id("b"), &http("b")).unwrap();

    let err = store.rename(&id("a"), &id("b")).unwrap_err();
    assert!(err.is_target_exists());
    assert_eq!(store.get(&id("a")).unwrap().data, http("a"));
    assert_eq!(store.get(&id("b")).unwrap().data, http("b"));
}

#[test]
fn test_update_keeps_history() {
    let (dir, store) = temp_store();
    let req = http("v1");
    store.create(&id("a"), &req).unwrap();
    store.append_history(&id("a"), &entry(&req, 200)).unwrap();

    store.update(&id("a"), &Kind::HTTP, &http("v2")).unwrap();
    let request = store.get(&id("a")).unwrap();
    assert_eq!(request.data, http("v2"));
    assert_eq!(request.history[0].request, http("v1"));

    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .filter(|name| name.ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_open_from_config() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path().join("nested/requests");
    let settings = json!({
        "impulse": {
            "storeRoot": root.to_str().unwrap(),
            "prettyDefinitions": false
        }
    });
    let config = load_config(Some(settings)).unwrap();

    let store = Store::open(&config).unwrap();
    assert!(root.is_dir());
    store.create(&id("x"), &http("")).unwrap();
    let text = fs::read_to_string(root.join("x.request.json")).unwrap();
    assert!(!text.contains('\n'));
}

#[test]
fn test_open_missing_root_without_create() {
    let dir = tempfile::TempDir::new().unwrap();
    let settings = json!({
        "impulse": {
            "storeRoot": dir.path().join("absent").to_str().unwrap(),
            "createRootIfMissing": false
        }
    });
    let config = load_config(Some(settings)).unwrap();
    assert!(Store::open(&config).unwrap_err().is_not_found());
}

#[test]
fn test_concurrent_appends_are_serialized() {
    let (_dir, store) = temp_store();
    let store = Arc::new(store);
    let req = http("");
    for name in ["a", "b"] {
        store.create(&id(name), &req).unwrap();
    }

    std::thread::scope(|scope| {
        for t in 0..4 {
            let store = Arc::clone(&store);
            let req = req.clone();
            scope.spawn(move || {
                let target = if t % 2 == 0 { id("a") } else { id("b") };
                for code in 0..25 {
                    store.append_history(&target, &entry(&req, code)).unwrap();
                }
            });
        }
    });

    assert_eq!(store.get(&id("a")).unwrap().history.len(), 50);
    assert_eq!(store.get(&id("b")).unwrap().history.len(), 50);
}
