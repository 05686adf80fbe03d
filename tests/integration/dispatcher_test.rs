//! Executing stored requests end to end.

use super::{http, id, temp_store};
use impulse::dispatcher::{Dispatcher, SendError, Senders};
use impulse::models::{
    CacheRequest, CacheResponse, HttpRequest, HttpResponse, QueryRequest, QueryResponse,
    ResponseData,
};
use std::sync::{Arc, Barrier};

fn ok_http(_: &HttpRequest) -> Result<HttpResponse, SendError> {
    Ok(HttpResponse {
        code: 200,
        body: "ok".to_string(),
        headers: vec![],
    })
}

#[test]
fn test_create_perform_get() {
    let (_dir, store) = temp_store();
    let store = Arc::new(store);
    let req = http("");
    store.create(&id("a/b"), &req).unwrap();

    let dispatcher = Dispatcher::new(Arc::clone(&store), Senders::default().with_http(ok_http));
    dispatcher.perform(&id("a/b")).unwrap();

    let history = store.get(&id("a/b")).unwrap().history;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].request, req);
    assert_eq!(
        history[0].response,
        ResponseData::Http(HttpResponse {
            code: 200,
            body: "ok".to_string(),
            headers: vec![],
        })
    );
    assert!(history[0].sent_at <= history[0].received_at);
}

#[test]
fn test_history_counts_only_successes() {
    let (_dir, store) = temp_store();
    let store = Arc::new(store);
    store.create(&id("flaky"), &http("")).unwrap();

    let calls = std::sync::atomic::AtomicUsize::new(0);
    let senders = Senders::empty().with_http(move |_: &HttpRequest| {
        let n = calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if n % 2 == 1 {
            Err(SendError::new("timeout"))
        } else {
            ok_http(&HttpRequest::default())
        }
    });
    let dispatcher = Dispatcher::new(Arc::clone(&store), senders);

    let outcomes: Vec<bool> = (0..5)
        .map(|_| dispatcher.perform(&id("flaky")).is_ok())
        .collect();
    assert_eq!(outcomes, vec![true, false, true, false, true]);
    assert_eq!(store.get(&id("flaky")).unwrap().history.len(), 3);
}

#[test]
fn test_sends_run_outside_the_store_lock() {
    let (_dir, store) = temp_store();
    let store = Arc::new(store);
    store
        .create(
            &id("one"),
            &CacheRequest {
                dsn: String::new(),
                query: "GET one".to_string(),
            }
            .into(),
        )
        .unwrap();
    store
        .create(
            &id("two"),
            &CacheRequest {
                dsn: String::new(),
                query: "GET two".to_string(),
            }
            .into(),
        )
        .unwrap();

    // Both sends must be in flight at once for the barrier to release.
    let barrier = Arc::new(Barrier::new(2));
    let senders = Senders::empty().with_cache(move |req: &CacheRequest| {
        barrier.wait();
        Ok(CacheResponse {
            response: req.query.clone(),
        })
    });
    let dispatcher = Dispatcher::new(Arc::clone(&store), senders);

    std::thread::scope(|scope| {
        scope.spawn(|| dispatcher.perform(&id("one")).unwrap());
        scope.spawn(|| dispatcher.perform(&id("two")).unwrap());
    });

    assert_eq!(store.get(&id("one")).unwrap().history.len(), 1);
    assert_eq!(store.get(&id("two")).unwrap().history.len(), 1);
}

#[test]
fn test_query_request_end_to_end() {
    let (_dir, store) = temp_store();
    let store = Arc::new(store);
    store
        .create(
            &id("transform"),
            &QueryRequest {
                query: ".users[].name".to_string(),
                json: r#"{"users": [{"name": "ada"}, {"name": "linus"}]}"#.to_string(),
            }
            .into(),
        )
        .unwrap();

    let dispatcher = Dispatcher::new(Arc::clone(&store), Senders::default());
    let tagged = dispatcher.perform_tagged(&id("transform")).unwrap();
    assert_eq!(tagged["kind"], "query");
    assert_eq!(tagged["response"], serde_json::json!(["\"ada\"", "\"linus\""]));

    let history = store.get(&id("transform")).unwrap().history;
    assert_eq!(
        history[0].response,
        QueryResponse {
            response: vec!["\"ada\"".to_string(), "\"linus\"".to_string()]
        }
        .into()
    );
}

#[test]
fn test_unsupported_kind_writes_nothing() {
    let (_dir, store) = temp_store();
    let store = Arc::new(store);
    store.create(&id("h"), &http("")).unwrap();

    let dispatcher = Dispatcher::new(Arc::clone(&store), Senders::default());
    let err = dispatcher.perform(&id("h")).unwrap_err();
    assert!(matches!(err, impulse::Error::UnsupportedKind { .. }));
    assert_eq!(store.history_len(&id("h")).unwrap(), 0);
}

#[cfg(feature = "native")]
#[test]
fn test_native_http_sender_records_history() {
    use httpmock::prelude::*;
    use impulse::senders::NativeHttpSender;
    use std::time::Duration;

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/status");
        then.status(204).header("x-trace", "abc");
    });

    let (_dir, store) = temp_store();
    let store = Arc::new(store);
    store
        .create(&id("status"), &http(&server.url("/status")))
        .unwrap();

    let sender = NativeHttpSender::new(Duration::from_secs(5)).unwrap();
    let dispatcher = Dispatcher::new(Arc::clone(&store), Senders::default().with_http(sender));
    let entry = dispatcher.perform(&id("status")).unwrap();

    mock.assert();
    match entry.response {
        ResponseData::Http(response) => {
            assert_eq!(response.code, 204);
            assert!(response.headers.iter().any(|h| h.key == "x-trace" && h.value == "abc"));
        }
        other => panic!("unexpected response {other:?}"),
    }
    assert_eq!(store.get(&id("status")).unwrap().history.len(), 1);
}
