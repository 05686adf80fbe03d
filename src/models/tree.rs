//! Hierarchical listing of stored requests.

use super::RequestId;
use serde::Serialize;
use std::collections::BTreeMap;

/// One directory level of the store.
///
/// `request_ids` holds the full ids of requests directly in this directory;
/// `dirs` maps each child directory's name to its own listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tree {
    pub request_ids: Vec<RequestId>,
    pub dirs: BTreeMap<String, Tree>,
}

impl Tree {
    /// Returns `true` if there are no requests and no directories.
    pub fn is_empty(&self) -> bool {
        self.request_ids.is_empty() && self.dirs.is_empty()
    }

    /// Returns every request id in this tree and all subtrees.
    pub fn all_request_ids(&self) -> Vec<RequestId> {
        let mut ids = self.request_ids.clone();
        for dir in self.dirs.values() {
            ids.extend(dir.all_request_ids());
        }
        ids
    }

    /// Looks up a nested directory by its `/`-separated path.
    pub fn dir(&self, path: &str) -> Option<&Tree> {
        path.split('/')
            .try_fold(self, |tree, name| tree.dirs.get(name))
    }
}
