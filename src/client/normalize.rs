//! Remote-to-local book normalization
//!
//! A single total mapping from the remote book shape into the canonical
//! local record; every local field gets exactly one source or an explicit
//! default. Pure, so the current time is a parameter.

use super::api::RemoteBook;
use super::cache::LocalBook;

/// Map a remote book into a fresh local cache record
pub fn normalize_remote(remote: &RemoteBook, now_ms: i64) -> LocalBook {
    LocalBook {
        id: remote.id.to_string(),
        name: if remote.title.is_empty() {
            "Untitled".to_string()
        } else {
            remote.title.clone()
        },
        file_url: Some(remote.cloudinary_url.clone()),
        file: None,
        bookmarks: Vec::new(),
        last_page: 1,
        page_count: 0,
        thumbnail: None,
        added_at: now_ms,
        last_opened: 0,
        synced: true,
    }
}
