//! Library synchronizer
//!
//! The single source of truth for "what books does this user have". On load
//! it reconciles the remote book list with the local cache, hydrating
//! missing binaries and generating thumbnails; every mutation (upload,
//! rename, delete) goes through both the remote service and the cache.

use std::sync::Arc;

use chrono::Utc;

use crate::error::Result;

use super::api::{RemoteLibrary, Session};
use super::cache::{LibraryCache, LocalBook};
use super::normalize::normalize_remote;
use super::thumbnail::ThumbnailGenerator;

/// Library sort orders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Alphabetical,
    ReverseAlphabetical,
    RecentlyAdded,
    LastOpened,
}

/// The published library view
#[derive(Debug, Clone)]
pub struct LibraryView {
    pub books: Vec<LocalBook>,
    /// True when the remote list could not be fetched and the view was
    /// served from the local cache alone
    pub degraded: bool,
}

/// Reconciles the remote library with the local cache
pub struct LibrarySynchronizer {
    remote: Arc<dyn RemoteLibrary>,
    cache: LibraryCache,
    thumbnails: ThumbnailGenerator,
}

impl LibrarySynchronizer {
    pub fn new(remote: Arc<dyn RemoteLibrary>, cache: LibraryCache) -> Self {
        let thumbnails = ThumbnailGenerator::new(cache.clone(), remote.clone());
        Self {
            remote,
            cache,
            thumbnails,
        }
    }

    /// Load the library, reconciling remote and local state
    ///
    /// A remote failure is not fatal: the cached records are served with the
    /// degraded flag set. A failed binary fetch for one book never aborts
    /// the load; the record is persisted without its binary and the failure
    /// is logged.
    pub async fn load(&self, session: &Session, order: SortOrder) -> Result<LibraryView> {
        let remote_books = match self.remote.list_books(session).await {
            Ok(books) => books,
            Err(e) => {
                tracing::warn!("Remote list failed, serving cached library: {}", e);
                let mut books = self.cache.get_all().await?;
                sort_books(&mut books, order);
                return Ok(LibraryView {
                    books,
                    degraded: true,
                });
            }
        };

        let now_ms = Utc::now().timestamp_millis();
        let mut books = Vec::with_capacity(remote_books.len());

        for remote_book in &remote_books {
            let incoming = normalize_remote(remote_book, now_ms);
            let cached = self.cache.get(&incoming.id).await?;

            let record = match cached {
                // A hydrated cache record may carry reader state newer than
                // anything remote tracks; keep it as-is.
                Some(existing) if existing.file.is_some() => existing,
                existing => {
                    let mut record = incoming;
                    if let Some(previous) = existing {
                        record.bookmarks = previous.bookmarks;
                        record.last_page = previous.last_page;
                        record.page_count = previous.page_count;
                        record.thumbnail = previous.thumbnail;
                        record.added_at = previous.added_at;
                        record.last_opened = previous.last_opened;
                    }
                    if let Some(url) = &record.file_url {
                        match self.remote.fetch_binary(url).await {
                            Ok(data) => record.file = Some(data),
                            Err(e) => {
                                tracing::warn!("Hydration failed for '{}': {}", record.name, e);
                            }
                        }
                    }
                    self.cache.put(&record).await?;
                    record
                }
            };

            books.push(record);
        }

        // The remote list is authoritative for synced records: anything
        // synced that it no longer mentions was deleted elsewhere. Local-only
        // records stay in the view.
        for cached in self.cache.get_all().await? {
            if books.iter().any(|b| b.id == cached.id) {
                continue;
            }
            if cached.synced {
                self.cache.remove(&cached.id).await?;
            } else {
                books.push(cached);
            }
        }

        for book in books.iter_mut() {
            if book.thumbnail.is_none() {
                *book = self.thumbnails.generate(book.clone()).await;
            }
        }

        sort_books(&mut books, order);
        Ok(LibraryView {
            books,
            degraded: false,
        })
    }

    /// Upload a PDF and register it locally
    ///
    /// Remote first: if the upload fails no local record is created.
    pub async fn upload(
        &self,
        session: &Session,
        file_name: &str,
        data: Vec<u8>,
    ) -> Result<LocalBook> {
        let receipt = self.remote.upload(session, file_name, data.clone()).await?;

        let book = LocalBook {
            id: receipt.book_id.to_string(),
            name: receipt.title,
            file_url: Some(receipt.url),
            file: Some(data),
            bookmarks: Vec::new(),
            last_page: 1,
            page_count: 0,
            thumbnail: None,
            added_at: Utc::now().timestamp_millis(),
            last_opened: 0,
            synced: true,
        };

        self.cache.put(&book).await?;
        tracing::info!("Uploaded '{}' as book {}", book.name, book.id);

        Ok(self.thumbnails.generate(book).await)
    }

    /// Rename a book locally and remotely
    ///
    /// The local write always applies; a remote failure afterwards is
    /// surfaced to the caller and reconciled on the next load.
    pub async fn rename(&self, session: &Session, id: &str, new_name: &str) -> Result<LocalBook> {
        let updated = self.cache.update_name(id, new_name.to_string()).await?;
        self.remote.rename(session, id, new_name).await?;
        Ok(updated)
    }

    /// Delete a book locally and remotely
    ///
    /// Both deletions are attempted; a remote failure after the local
    /// removal is logged, and the remote list is authoritative again on the
    /// next load.
    pub async fn delete(&self, session: &Session, id: &str) -> Result<()> {
        self.cache.remove(id).await?;

        if let Err(e) = self.remote.delete(session, id).await {
            tracing::warn!("Remote delete of book {} failed: {}", id, e);
        }

        Ok(())
    }
}

/// Sort books in place; ties keep their input order
pub fn sort_books(books: &mut [LocalBook], order: SortOrder) {
    match order {
        SortOrder::Alphabetical => {
            books.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        }
        SortOrder::ReverseAlphabetical => {
            books.sort_by(|a, b| b.name.to_lowercase().cmp(&a.name.to_lowercase()));
        }
        SortOrder::RecentlyAdded => {
            books.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        }
        SortOrder::LastOpened => {
            books.sort_by(|a, b| b.last_opened.cmp(&a.last_opened));
        }
    }
}

/// Case-insensitive substring filter over display names
pub fn filter_books(books: &[LocalBook], term: &str) -> Vec<LocalBook> {
    let term = term.to_lowercase();
    books
        .iter()
        .filter(|b| b.name.to_lowercase().contains(&term))
        .cloned()
        .collect()
}
