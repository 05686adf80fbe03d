//! Property tests for the tree store: listings stay consistent under any
//! sequence of store operations.

use chrono::{TimeZone, Utc};
use impulse::fs::MemoryFileSystem;
use impulse::models::{HistoryEntry, HttpRequest, HttpResponse, RequestData, RequestId};
use impulse::{KindRegistry, Store, Tree};
use proptest::prelude::*;

const IDS: [&str; 7] = ["a", "b", "a/b", "a/c", "b/a", "a/b/c", "c (1)"];

#[derive(Debug, Clone)]
enum Op {
    Create(usize),
    Append(usize),
    Rename(usize, usize),
    Duplicate(usize),
    Delete(usize),
}

fn op() -> impl Strategy<Value = Op> {
    let slot = 0..IDS.len();
    prop_oneof![
        3 => slot.clone().prop_map(Op::Create),
        1 => slot.clone().prop_map(Op::Append),
        2 => (slot.clone(), slot.clone()).prop_map(|(from, to)| Op::Rename(from, to)),
        1 => slot.clone().prop_map(Op::Duplicate),
        1 => slot.prop_map(Op::Delete),
    ]
}

fn id(slot: usize) -> RequestId {
    RequestId::parse(IDS[slot]).unwrap()
}

fn http(url: &str) -> RequestData {
    HttpRequest {
        url: url.to_string(),
        ..HttpRequest::default()
    }
    .into()
}

fn entry(data: RequestData) -> HistoryEntry {
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    HistoryEntry {
        sent_at: at,
        received_at: at,
        request: data,
        response: HttpResponse {
            code: 200,
            body: String::new(),
            headers: vec![],
        }
        .into(),
    }
}

fn apply(store: &Store<MemoryFileSystem>, op: &Op) {
    // Refusals are expected; only the resulting state is checked.
    let _ = match op {
        Op::Create(slot) => store.create(&id(*slot), &http(IDS[*slot])),
        Op::Append(slot) => store.append_history(&id(*slot), &entry(http(IDS[*slot]))),
        Op::Rename(from, to) => store.rename(&id(*from), &id(*to)),
        Op::Duplicate(slot) => store.duplicate(&id(*slot)).map(|_| ()),
        Op::Delete(slot) => store.delete(&id(*slot)),
    };
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

proptest! {
    #[test]
    fn listed_requests_are_readable_and_never_directories(
        ops in prop::collection::vec(op(), 0..24),
    ) {
        let store = Store::new(MemoryFileSystem::new(), KindRegistry::shared());
        for op in &ops {
            apply(&store, op);
        }

        let tree = store.list().unwrap();
        let mut dirs = Vec::new();
        dir_paths(&tree, "", &mut dirs);

        let mut ids = tree.all_request_ids();
        let count = ids.len();
        ids.sort();
        ids.dedup();
        prop_assert_eq!(ids.len(), count);

        for request_id in &ids {
            let request = store.get(request_id);
            prop_assert!(
                request.is_ok(),
                "{} is listed but get failed: {:?}",
                request_id,
                request.err()
            );
            prop_assert!(
                !dirs.contains(&request_id.to_string()),
                "{} is also a directory",
                request_id
            );
        }
    }
}
