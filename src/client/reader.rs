//! Reading session state machine
//!
//! One open book at a time. Opening hydrates the binary if needed, counts
//! pages when the count is still unknown and resumes at the last-read page;
//! page turns and bookmark edits apply in memory first and persist through
//! the cache.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{AppError, Result};

use super::api::RemoteLibrary;
use super::cache::{Bookmark, LibraryCache, LocalBook};
use super::thumbnail;

const MIN_ZOOM: f32 = 0.25;
const MAX_ZOOM: f32 = 4.0;

#[derive(Debug, Clone, PartialEq)]
pub enum ReaderState {
    Closed,
    Loading { id: String },
    Ready { book: LocalBook },
}

/// Result of a bookmark-add request
#[derive(Debug, Clone, PartialEq)]
pub enum BookmarkOutcome {
    Added(Bookmark),
    /// The current page already has a bookmark; nothing was written
    AlreadyBookmarked,
}

pub struct ReaderSession {
    cache: LibraryCache,
    remote: Arc<dyn RemoteLibrary>,
    state: ReaderState,
    page: i64,
    zoom: f32,
    sidebar_open: bool,
}

impl ReaderSession {
    pub fn new(cache: LibraryCache, remote: Arc<dyn RemoteLibrary>) -> Self {
        Self {
            cache,
            remote,
            state: ReaderState::Closed,
            page: 1,
            zoom: 1.0,
            sidebar_open: false,
        }
    }

    pub fn state(&self) -> &ReaderState {
        &self.state
    }

    pub fn book(&self) -> Option<&LocalBook> {
        match &self.state {
            ReaderState::Ready { book } => Some(book),
            _ => None,
        }
    }

    pub fn current_page(&self) -> i64 {
        self.page
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn sidebar_open(&self) -> bool {
        self.sidebar_open
    }

    /// Open a cached book and resume at its last-read page
    pub async fn open(&mut self, id: &str) -> Result<()> {
        self.state = ReaderState::Loading { id: id.to_string() };

        match self.load_book(id).await {
            Ok((book, page)) => {
                self.page = page;
                self.state = ReaderState::Ready { book };
                Ok(())
            }
            Err(e) => {
                self.state = ReaderState::Closed;
                Err(e)
            }
        }
    }

    async fn load_book(&self, id: &str) -> Result<(LocalBook, i64)> {
        let book = self
            .cache
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book not found: {}", id)))?;

        let mut book = if book.file.is_some() {
            book
        } else {
            let url = book.file_url.clone().ok_or_else(|| {
                AppError::BadRequest(format!("'{}' has no local file or remote URL", book.name))
            })?;
            let data = self.remote.fetch_binary(&url).await?;

            let mut hydrated = book;
            hydrated.file = Some(data);
            self.cache.put(&hydrated).await?;
            hydrated
        };

        if book.page_count == 0 {
            if let Some(data) = book.file.clone() {
                match thumbnail::count_pages(data).await {
                    Ok(count) => book = self.cache.update_page_count(&book.id, count).await?,
                    Err(e) => {
                        tracing::warn!("Could not count pages of '{}': {}", book.name, e);
                    }
                }
            }
        }

        book = self
            .cache
            .touch_last_opened(&book.id, Utc::now().timestamp_millis())
            .await?;

        let page = book.last_page.max(1);
        Ok((book, page))
    }

    /// Turn to a page; out-of-range requests are ignored
    ///
    /// Returns whether the page changed. The in-memory page updates before
    /// the write so the UI never waits on the cache.
    pub async fn set_page(&mut self, page: i64) -> Result<bool> {
        let ReaderState::Ready { book } = &mut self.state else {
            return Ok(false);
        };
        if book.page_count <= 0 || page < 1 || page > book.page_count {
            return Ok(false);
        }

        self.page = page;
        if page != book.last_page {
            *book = self.cache.update_last_page(&book.id, page).await?;
        }
        Ok(true)
    }

    /// Bookmark the current page
    pub async fn add_bookmark(&mut self) -> Result<BookmarkOutcome> {
        let page = self.page;
        let ReaderState::Ready { book } = &mut self.state else {
            return Err(AppError::BadRequest("No book is open".to_string()));
        };

        if book.bookmarks.iter().any(|b| b.page == page) {
            return Ok(BookmarkOutcome::AlreadyBookmarked);
        }

        let bookmark = Bookmark {
            id: Uuid::new_v4().to_string(),
            page,
            label: String::new(),
        };
        let mut bookmarks = book.bookmarks.clone();
        bookmarks.push(bookmark.clone());

        *book = self.cache.update_bookmarks(&book.id, bookmarks).await?;
        Ok(BookmarkOutcome::Added(bookmark))
    }

    /// Remove a bookmark by id; unknown ids are a no-op
    ///
    /// The current page never changes, even when the removed bookmark points
    /// at it.
    pub async fn remove_bookmark(&mut self, bookmark_id: &str) -> Result<()> {
        let ReaderState::Ready { book } = &mut self.state else {
            return Err(AppError::BadRequest("No book is open".to_string()));
        };

        if !book.bookmarks.iter().any(|b| b.id == bookmark_id) {
            return Ok(());
        }

        let bookmarks = book
            .bookmarks
            .iter()
            .filter(|b| b.id != bookmark_id)
            .cloned()
            .collect();
        *book = self.cache.update_bookmarks(&book.id, bookmarks).await?;
        Ok(())
    }

    /// Relabel a bookmark; unknown ids are a no-op
    pub async fn set_bookmark_label(&mut self, bookmark_id: &str, label: &str) -> Result<()> {
        let ReaderState::Ready { book } = &mut self.state else {
            return Err(AppError::BadRequest("No book is open".to_string()));
        };

        if !book.bookmarks.iter().any(|b| b.id == bookmark_id) {
            return Ok(());
        }

        let bookmarks = book
            .bookmarks
            .iter()
            .cloned()
            .map(|mut b| {
                if b.id == bookmark_id {
                    b.label = label.to_string();
                }
                b
            })
            .collect();
        *book = self.cache.update_bookmarks(&book.id, bookmarks).await?;
        Ok(())
    }

    /// Jump to a bookmark's page
    pub async fn goto_bookmark(&mut self, bookmark_id: &str) -> Result<bool> {
        let page = match self.book() {
            Some(book) => book
                .bookmarks
                .iter()
                .find(|b| b.id == bookmark_id)
                .map(|b| b.page),
            None => None,
        };

        match page {
            Some(page) => self.set_page(page).await,
            None => Ok(false),
        }
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn toggle_sidebar(&mut self) {
        self.sidebar_open = !self.sidebar_open;
    }

    pub fn close(&mut self) {
        self.state = ReaderState::Closed;
        self.page = 1;
        self.zoom = 1.0;
        self.sidebar_open = false;
    }
}
