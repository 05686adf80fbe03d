//! Shared setup for integration tests.

pub mod dispatcher_test;
pub mod store_test;

use impulse::fs::OsFileSystem;
use impulse::models::{HttpRequest, RequestData, RequestId};
use impulse::{KindRegistry, Store};
use std::sync::Once;
use tempfile::TempDir;

static INIT: Once = Once::new();

/// Initialize test environment (run once)
pub fn init_test_env() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// A store rooted in a fresh temporary directory.
///
/// The directory lives as long as the returned `TempDir`.
pub fn temp_store() -> (TempDir, Store<OsFileSystem>) {
    init_test_env();
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = Store::new(OsFileSystem::new(dir.path()), KindRegistry::shared());
    (dir, store)
}

pub fn id(s: &str) -> RequestId {
    RequestId::parse(s).expect("valid request id")
}

pub fn http(url: &str) -> RequestData {
    HttpRequest {
        url: url.to_string(),
        ..HttpRequest::default()
    }
    .into()
}
