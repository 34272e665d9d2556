//! In-memory fake of the remote library service for tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AppError, Result};

use super::api::{RemoteBook, RemoteLibrary, Session, UploadReceipt};

pub(crate) struct FakeRemote {
    books: Mutex<Vec<RemoteBook>>,
    binaries: Mutex<HashMap<String, Vec<u8>>>,
    next_id: AtomicI64,
    deleted: Mutex<Vec<String>>,
    renames: Mutex<Vec<(String, String)>>,
    fail_list: AtomicBool,
    fail_upload: AtomicBool,
    fail_rename: AtomicBool,
    fail_delete: AtomicBool,
    fail_fetch: AtomicBool,
}

impl FakeRemote {
    pub(crate) fn new() -> Self {
        Self {
            books: Mutex::new(Vec::new()),
            binaries: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
            deleted: Mutex::new(Vec::new()),
            renames: Mutex::new(Vec::new()),
            fail_list: AtomicBool::new(false),
            fail_upload: AtomicBool::new(false),
            fail_rename: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            fail_fetch: AtomicBool::new(false),
        }
    }

    pub(crate) fn add_book(&self, title: &str, data: Vec<u8>) -> RemoteBook {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let url = format!("https://files.test/{}/{}", id, title);
        let book = RemoteBook {
            id,
            title: title.to_string(),
            cloudinary_url: url.clone(),
            uploaded_at: "2026-01-01 00:00:00".to_string(),
        };
        self.books.lock().unwrap().push(book.clone());
        self.binaries.lock().unwrap().insert(url, data);
        book
    }

    pub(crate) fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub(crate) fn renames(&self) -> Vec<(String, String)> {
        self.renames.lock().unwrap().clone()
    }

    pub(crate) fn set_fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn set_fail_upload(&self, fail: bool) {
        self.fail_upload.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn set_fail_rename(&self, fail: bool) {
        self.fail_rename.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn set_fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteLibrary for FakeRemote {
    async fn list_books(&self, _session: &Session) -> Result<Vec<RemoteBook>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(AppError::Remote("list unavailable".to_string()));
        }
        Ok(self.books.lock().unwrap().clone())
    }

    async fn upload(
        &self,
        _session: &Session,
        file_name: &str,
        data: Vec<u8>,
    ) -> Result<UploadReceipt> {
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(AppError::Remote("upload rejected".to_string()));
        }
        let book = self.add_book(file_name, data);
        Ok(UploadReceipt {
            book_id: book.id,
            title: book.title,
            url: book.cloudinary_url,
        })
    }

    async fn rename(&self, _session: &Session, book_id: &str, new_name: &str) -> Result<()> {
        if self.fail_rename.load(Ordering::SeqCst) {
            return Err(AppError::Remote("rename rejected".to_string()));
        }
        self.renames
            .lock()
            .unwrap()
            .push((book_id.to_string(), new_name.to_string()));
        let mut books = self.books.lock().unwrap();
        for book in books.iter_mut() {
            if book.id.to_string() == book_id {
                book.title = new_name.to_string();
            }
        }
        Ok(())
    }

    async fn delete(&self, _session: &Session, book_id: &str) -> Result<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(AppError::Remote("delete rejected".to_string()));
        }
        self.deleted.lock().unwrap().push(book_id.to_string());
        self.books
            .lock()
            .unwrap()
            .retain(|b| b.id.to_string() != book_id);
        Ok(())
    }

    async fn fetch_binary(&self, url: &str) -> Result<Vec<u8>> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(AppError::Remote("fetch unavailable".to_string()));
        }
        self.binaries
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::Remote(format!("no binary at {}", url)))
    }
}
